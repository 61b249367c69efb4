// HTML document around the rendered shell
use crate::application::app_shell::ShellView;
use askama::Template;

const BASE_STYLES: &str = r#"
.wrapper { display: flex; min-height: 100vh; }
.sidebar { width: 240px; background: #4e73df; color: #fff; transition: width .2s; }
.sidebar-collapsed .sidebar { width: 70px; }
.sidebar-collapsed .sidebar .nav-label { display: none; }
.sidebar .nav-link { color: rgba(255, 255, 255, .85); }
.sidebar .nav-link.active { color: #fff; font-weight: 700; }
.sidebar .nav-link.disabled { opacity: .5; cursor: not-allowed; }
.main-content { flex: 1; padding: 1.5rem; background: #f8f9fc; }
.top-bar { display: flex; align-items: center; gap: 1rem; margin-bottom: 1.5rem; }
.chart-container { min-height: 320px; }
.notification-container { position: fixed; top: 1rem; right: 1rem; z-index: 1080; }
.notification { display: flex; gap: .75rem; min-width: 280px; margin-bottom: .5rem; padding: .75rem 1rem; border-radius: .35rem; background: #fff; box-shadow: 0 .15rem 1.75rem rgba(58, 59, 69, .15); }
.notification-success { border-left: 4px solid #1cc88a; }
.notification-error { border-left: 4px solid #e74a3b; }
.notification-warning { border-left: 4px solid #f6c23e; }
.notification-info { border-left: 4px solid #36b9cc; }
.login-container { max-width: 380px; margin: 10vh auto; }
"#;

const DARK_STYLES: &str = r#"
body, .main-content { background: #1e1e2d; color: #e1e1e6; }
.card { background: #2b2b40; color: #e1e1e6; border-color: #3a3a52; }
.sidebar { background: #151521; }
.table { color: #e1e1e6; }
.form-control, .form-select { background: #2b2b40; color: #e1e1e6; border-color: #3a3a52; }
"#;

/// Stylesheet served under `/assets/css/{name}`
pub fn stylesheet(name: &str) -> Option<&'static str> {
    match name {
        "styles.css" => Some(BASE_STYLES),
        "dark-mode.css" => Some(DARK_STYLES),
        _ => None,
    }
}

#[derive(Template)]
#[template(path = "document.html")]
struct DocumentTemplate<'a> {
    theme: &'a str,
    title: &'a str,
    dark: bool,
    body: String,
    /// JSON string literal, safe inside a script element
    alert: Option<String>,
}

fn alert_literal(message: &str) -> String {
    let literal = serde_json::to_string(message).unwrap_or_else(|_| "\"\"".to_string());
    literal.replace("</", "<\\/")
}

/// Full page for `view`; `alert` becomes a blocking browser alert
pub fn render_document(view: &ShellView, alert: Option<&str>) -> Result<String, askama::Error> {
    DocumentTemplate {
        theme: if view.dark { "dark" } else { "light" },
        title: view.title,
        dark: view.dark,
        body: view.body.render(),
        alert: alert.map(alert_literal),
    }
    .render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::view::el;

    fn view(dark: bool) -> ShellView {
        ShellView {
            title: "Gestión de Inventario",
            dark,
            sidebar_collapsed: false,
            body: el("p").text("hola").into(),
        }
    }

    #[test]
    fn test_dark_stylesheet_toggled() {
        let light = render_document(&view(false), None).unwrap();
        assert!(light.contains(r#"id="dark-mode-styles" disabled>"#));
        assert!(light.contains(r#"data-theme="light""#));
        assert!(light.contains("<title>Gestión de Inventario | E-commerce Analytics</title>"));
        assert!(!light.contains("alert("));

        let dark = render_document(&view(true), None).unwrap();
        assert!(dark.contains(r#"id="dark-mode-styles">"#));
        assert!(dark.contains("<p>hola</p>"));
    }

    #[test]
    fn test_alert_is_escaped() {
        let html = render_document(&view(false), Some("La fecha </script> \"mala\"")).unwrap();
        assert!(html.contains(r#"<script>alert("La fecha <\/script> \"mala\"");</script>"#));
    }

    #[test]
    fn test_stylesheets_by_name() {
        assert!(stylesheet("dark-mode.css").unwrap().contains(".card"));
        assert!(stylesheet("styles.css").is_some());
        assert!(stylesheet("../secrets").is_none());
    }
}
