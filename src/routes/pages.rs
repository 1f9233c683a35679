//! HTML pages
//!
//! Every page is `header.html`, the page body and `footer.html` from the
//! templates directory, concatenated. `GET /` is `index.html`; `GET /:page`
//! is `<page>.html`.

use std::io;
use std::path::Path as FsPath;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

use crate::error::Result;
use crate::state::AppState;

/// Create the pages router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index_page))
        .route("/:page_name", get(named_page))
}

async fn index_page(State(state): State<AppState>) -> Result<Response> {
    render_page(&state.config().web.templates_dir, "index").await
}

async fn named_page(
    State(state): State<AppState>,
    Path(page_name): Path<String>,
) -> Result<Response> {
    if !is_valid_page_name(&page_name) {
        return Ok(page_not_found());
    }
    render_page(&state.config().web.templates_dir, &page_name).await
}

async fn render_page(templates_dir: &FsPath, page_name: &str) -> Result<Response> {
    let content = match tokio::fs::read_to_string(templates_dir.join(format!("{page_name}.html"))).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(page = %page_name, "Page template not found");
            return Ok(page_not_found());
        }
        Err(e) => return Err(e.into()),
    };

    let header = tokio::fs::read_to_string(templates_dir.join("header.html")).await?;
    let footer = tokio::fs::read_to_string(templates_dir.join("footer.html")).await?;

    Ok(Html(header + &content + &footer).into_response())
}

fn page_not_found() -> Response {
    (StatusCode::NOT_FOUND, Html("Page not found")).into_response()
}

/// Page names map straight to template files, so keep them to a safe alphabet
fn is_valid_page_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
