//! Work orders assembled from a submitted intake form.

use std::collections::{HashMap, HashSet};

use intake_ident::{is_valid_vin, normalize_plate, reconcile_imei, sanitize_vin, WorkOrderId};
use tracing::warn;

use crate::mail::{Attachment, MailConfig, OutgoingMail};

/// Photo upload fields in display order, with their labels.
pub const PHOTO_FIELDS: [(&str, &str); 5] = [
    ("foto_kenteken", "Kenteken"),
    ("foto_imei", "IMEI"),
    ("foto_chassis", "Chassis"),
    ("foto_extra1", "Extra 1"),
    ("foto_extra2", "Extra 2"),
];

/// Returns the display label for a photo field, or `None` for other fields.
pub fn photo_label(field: &str) -> Option<&'static str> {
    PHOTO_FIELDS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, label)| *label)
}

/// An uploaded photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    /// Form field the photo arrived in.
    pub field: String,
    /// Original file name as sent by the browser.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn label(&self) -> &str {
        match photo_label(&self.field) {
            Some(label) => label,
            None => &self.field,
        }
    }

    /// Caption drawn under the photo: `<label> · <file name>`.
    pub fn caption(&self) -> String {
        let mut caption = self.label().to_string();
        if !self.filename.is_empty() {
            caption.push_str(" · ");
            caption.push_str(&self.filename);
        }
        caption.chars().take(70).collect()
    }

    fn order(&self) -> usize {
        PHOTO_FIELDS
            .iter()
            .position(|(name, _)| *name == self.field)
            .unwrap_or(PHOTO_FIELDS.len())
    }
}

/// A work order built from the form fields.
#[derive(Debug, Clone)]
pub struct WorkOrder {
    pub id: WorkOrderId,
    pub customer_name: String,
    pub customer_email: String,
    /// Run-normalized plate.
    pub plate: String,
    pub make: String,
    pub model: String,
    pub build_year: String,
    /// Reconciled IMEI when valid, the trimmed input otherwise.
    pub imei: String,
    pub imei_valid: bool,
    /// Sanitized VIN.
    pub vin: String,
    pub vin_valid: bool,
    pub work_type: String,
    pub notes: String,
    /// Sender from the form, overriding `SENDER_EMAIL`.
    pub sender_override: Option<String>,
    /// Recipients from the form, overriding `RECEIVER_EMAIL`.
    pub receiver_override: Option<String>,
    pub photos: Vec<PhotoUpload>,
}

fn field(fields: &HashMap<String, String>, name: &str) -> String {
    fields
        .get(name)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

impl WorkOrder {
    /// Builds a work order from form fields and uploaded photos.
    ///
    /// Identifiers are normalized here; an invalid VIN or IMEI is kept as typed
    /// and only flagged.
    pub fn from_form(fields: &HashMap<String, String>, mut photos: Vec<PhotoUpload>) -> Self {
        let id = WorkOrderId::new();

        let raw_imei = field(fields, "imei");
        let imei_digits: String = raw_imei.chars().filter(char::is_ascii_digit).collect();
        let (imei, imei_valid) = match reconcile_imei(&imei_digits) {
            Some(imei) => (imei, true),
            None => (raw_imei, false),
        };

        let vin = sanitize_vin(&field(fields, "vin"));
        let vin_valid = is_valid_vin(&vin);

        if !imei.is_empty() && !imei_valid {
            warn!(work_order_id = %id, imei = %imei, "IMEI failed check digit validation");
        }
        if !vin.is_empty() && !vin_valid {
            warn!(work_order_id = %id, vin = %vin, "VIN failed check digit validation");
        }

        photos.retain(|p| !p.bytes.is_empty());
        photos.sort_by_key(PhotoUpload::order);
        photos.truncate(PHOTO_FIELDS.len());

        Self {
            id,
            customer_name: field(fields, "klantnaam"),
            customer_email: field(fields, "klantemail"),
            plate: normalize_plate(&field(fields, "kenteken")),
            make: field(fields, "merk"),
            model: field(fields, "type"),
            build_year: field(fields, "bouwjaar"),
            imei,
            imei_valid,
            vin,
            vin_valid,
            work_type: field(fields, "werkzaamheden"),
            notes: fields.get("opmerkingen").cloned().unwrap_or_default(),
            sender_override: non_empty(field(fields, "senderemail")),
            receiver_override: non_empty(field(fields, "receiveremail")),
            photos,
        }
    }

    /// `Merk/Type` value: make and model separated by a space.
    pub fn make_and_model(&self) -> String {
        if self.model.is_empty() {
            self.make.clone()
        } else {
            format!("{} {}", self.make, self.model).trim_start().to_string()
        }
    }

    /// File name of the rendered PDF.
    pub fn pdf_filename(&self) -> String {
        format!("opdrachtbon_{}.pdf", self.id)
    }

    /// Default mail subject.
    pub fn default_subject(&self) -> String {
        format!("Opdrachtbon – {} (#{})", self.plate, self.id)
    }

    /// Builds the notification mail carrying `pdf`.
    ///
    /// Returns `None` when there is no sender or no recipient.
    pub fn mail(&self, config: &MailConfig, pdf: Vec<u8>) -> Option<OutgoingMail> {
        let sender = self
            .sender_override
            .clone()
            .or_else(|| config.sender.clone())
            .filter(|s| !s.trim().is_empty())?;

        let admin = self
            .receiver_override
            .as_deref()
            .or(config.receivers.as_deref())
            .unwrap_or_default();
        let recipients = collect_recipients(admin, &self.customer_email);
        if recipients.is_empty() {
            return None;
        }

        let subject = config
            .subject
            .clone()
            .unwrap_or_else(|| self.default_subject());

        let mut mail = OutgoingMail::new(subject, config.body.clone(), sender, recipients)
            .with_attachment(Attachment::new(pdf, self.pdf_filename(), "application/pdf"));
        if self.customer_email.contains('@') {
            mail = mail.with_reply_to(self.customer_email.clone());
        }
        Some(mail)
    }
}

/// Splits a `,`/`;` separated address list, trimming and dropping empties.
pub fn split_emails(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

/// Admin addresses followed by the customer address, keeping only entries
/// with an `@`, de-duplicated in first-seen order.
pub fn collect_recipients(admin: &str, customer: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    split_emails(admin)
        .into_iter()
        .chain(std::iter::once(customer.trim().to_string()))
        .filter(|e| e.contains('@'))
        .filter(|e| seen.insert(e.clone()))
        .collect()
}
