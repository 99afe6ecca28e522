//! The intake form page.

use axum::{extract::State, response::Html, routing::get, Router};
use chrono::Local;

use crate::state::AppState;

const FORM_TEMPLATE: &str = include_str!("../../assets/form.html");

/// Create form routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(form_page))
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Fills the form template placeholders.
pub fn render_form(now: &str, company: &str, sender: &str) -> String {
    FORM_TEMPLATE
        .replace("{{now}}", &escape_html(now))
        .replace("{{company}}", &escape_html(company))
        .replace("{{sender}}", &escape_html(sender))
}

async fn form_page(State(state): State<AppState>) -> Html<String> {
    let now = Local::now().format("%d-%m-%Y %H:%M").to_string();
    let sender = state.mail_config().sender.as_deref().unwrap_or_default();
    Html(render_form(&now, state.company_name(), sender))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_placeholders() {
        let page = render_form("18-10-2026 09:30", "Garage & Zn", "balie@garage.nl");
        assert!(page.contains("<strong>18-10-2026 09:30</strong>"));
        assert!(page.contains("Garage &amp; Zn · Opdrachtbon"));
        assert!(page.contains(r#"value="balie@garage.nl""#));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn test_plate_formatter_ignores_stale_replies() {
        let page = render_form("", "", "");
        assert!(page.contains("const seq = ++kentekenSeq;"));
        assert!(page.contains("if (seq !== kentekenSeq || kentekenEl.value !== raw) return;"));
        assert_eq!(page.matches("kentekenEl.value = d.formatted").count(), 1);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }
}
