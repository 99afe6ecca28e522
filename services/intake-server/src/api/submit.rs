//! Work-order submission: multipart form in, PDF download out.
//!
//! The PDF is mailed when a transport, a sender and at least one recipient are
//! available. Mail problems never fail the request; the outcome is reported in
//! the `x-mail-status` response header.

use std::collections::HashMap;

use axum::{
    extract::{Multipart, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap, HeaderName, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::api::error::ApiError;
use crate::api::request_context::{RequestContext, REQUEST_ID_HEADER};
use crate::pdf::{render_work_order, PdfPhoto};
use crate::photos::prepare_for_pdf;
use crate::state::AppState;
use crate::workorder::{photo_label, PhotoUpload, WorkOrder};

pub const MAIL_STATUS_HEADER: &str = "x-mail-status";
pub const WORK_ORDER_ID_HEADER: &str = "x-work-order-id";

const MAX_HEADER_STATUS_CHARS: usize = 200;

/// Create submission routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/submit", post(submit))
}

/// Header-safe rendering of a free-form status: visible ASCII only, capped.
fn header_value(value: &str) -> HeaderValue {
    let sanitized: String = value
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '?' })
        .take(MAX_HEADER_STATUS_CHARS)
        .collect();
    HeaderValue::from_str(&sanitized).unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}

async fn read_form(
    multipart: &mut Multipart,
    request_id: &str,
) -> Result<(HashMap<String, String>, Vec<PhotoUpload>), ApiError> {
    let mut fields = HashMap::new();
    let mut photos = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if photo_label(&name).is_some() {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::from(e).with_request_id(request_id))?;
            if bytes.is_empty() {
                continue;
            }
            photos.push(PhotoUpload {
                field: name,
                filename,
                bytes: bytes.to_vec(),
            });
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::from(e).with_request_id(request_id))?;
            fields.insert(name, text);
        }
    }

    Ok((fields, photos))
}

/// Sends the work-order mail and returns the status for the response header.
async fn deliver(state: &AppState, order: &WorkOrder, pdf: Vec<u8>, request_id: &str) -> String {
    let Some(transport) = state.mailer() else {
        return "disabled".to_string();
    };
    let Some(mail) = order.mail(state.mail_config(), pdf) else {
        info!(request_id = %request_id, work_order_id = %order.id, "No sender or recipient; mail skipped");
        return "skipped: no sender or recipient".to_string();
    };

    match transport.send(&mail).await {
        Ok(status) => {
            info!(
                request_id = %request_id,
                work_order_id = %order.id,
                recipients = mail.to.len(),
                status = %status,
                "Work order mailed"
            );
            status
        }
        Err(e) => {
            warn!(
                request_id = %request_id,
                work_order_id = %order.id,
                error = %e,
                "Failed to mail work order"
            );
            format!("failed: {e}")
        }
    }
}

async fn submit(
    State(state): State<AppState>,
    ctx: RequestContext,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let (fields, photos) = read_form(&mut multipart, &ctx.request_id).await?;
    let order = WorkOrder::from_form(&fields, photos);
    info!(
        request_id = %ctx.request_id,
        work_order_id = %order.id,
        plate = %order.plate,
        photos = order.photos.len(),
        vin_valid = order.vin_valid,
        imei_valid = order.imei_valid,
        "Work order received"
    );

    let generated_at = Local::now().format("%d-%m-%Y %H:%M").to_string();
    let branding = state.branding().clone();
    let (order, rendered) = tokio::task::spawn_blocking(move || {
        let photos: Vec<PdfPhoto> = order
            .photos
            .iter()
            .map(|photo| {
                let image = prepare_for_pdf(&photo.bytes);
                if image.is_none() {
                    debug!(field = %photo.field, "Photo cannot be embedded; drawing frame only");
                }
                PdfPhoto {
                    caption: photo.caption(),
                    image,
                }
            })
            .collect();
        let rendered = render_work_order(&order, &photos, &branding, &generated_at);
        (order, rendered)
    })
    .await
    .map_err(|e| {
        error!(request_id = %ctx.request_id, error = %e, "PDF render task failed");
        ApiError::internal("render_failed", "Failed to render the work order")
            .with_request_id(ctx.request_id.clone())
    })?;

    let pdf = rendered.map_err(|e| {
        error!(request_id = %ctx.request_id, work_order_id = %order.id, error = %e, "Failed to render PDF");
        ApiError::from(e).with_request_id(ctx.request_id.clone())
    })?;

    let mail_status = deliver(&state, &order, pdf.clone(), &ctx.request_id).await;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    headers.insert(
        CONTENT_DISPOSITION,
        header_value(&format!("attachment; filename=\"{}\"", order.pdf_filename())),
    );
    headers.insert(
        HeaderName::from_static(MAIL_STATUS_HEADER),
        header_value(&mail_status),
    );
    headers.insert(
        HeaderName::from_static(WORK_ORDER_ID_HEADER),
        header_value(&order.id.to_string()),
    );
    headers.insert(
        HeaderName::from_static(REQUEST_ID_HEADER),
        header_value(&ctx.request_id),
    );

    Ok((StatusCode::OK, headers, pdf).into_response())
}
