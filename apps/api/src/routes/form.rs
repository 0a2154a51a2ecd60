use axum::response::Html;

const FORM_PAGE: &str = include_str!("form.html");

/// GET /
/// Static upload form posting to `/api/v1/enhance`.
pub async fn form_handler() -> Html<&'static str> {
    Html(FORM_PAGE)
}
