use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use minijinja::{Environment, context};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use taskview_metadata::{ContainerSummary, MetadataClient, MetadataError};

/// Shared state handed to the page handler: the metadata client and the
/// template registry, both immutable after startup.
pub struct AppState {
    pub client: MetadataClient,
    pub templates: Environment<'static>,
}

/// Builds the template registry used by the page handler.
pub fn templates() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("index", include_str!("../templates/index.jinja"))?;
    Ok(env)
}

/// `GET /`: fetch the task metadata and render the status page.
///
/// Each request is independent; the only suspension point is the outbound
/// fetch. Failures render as a JSON `{code, message}` body via [`PageError`].
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, PageError> {
    let document = state.client.fetch().await?;
    let summary = ContainerSummary::from_document(&document)?;
    let data = pretty_document(&document)?;

    let template = state.templates.get_template("index")?;
    let rendered = template.render(context! {
        data,
        image => summary.image,
        network => summary.network_mode,
        address => summary.ipv4_address,
        version => env!("CARGO_PKG_VERSION"),
    })?;

    Ok(Html(rendered))
}

fn pretty_document(document: &Value) -> Result<String, PageError> {
    serde_json::to_string_pretty(document).map_err(PageError::Serialize)
}

/// Failures surfaced by the page handler.
///
/// Upstream and response-shape failures map to 502, rendering failures to 500;
/// every variant renders the same `{code, message}` body shape.
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("template rendering failed: {0}")]
    Render(#[from] minijinja::Error),
    #[error("failed to serialize metadata document: {0}")]
    Serialize(serde_json::Error),
}

impl PageError {
    fn code(&self) -> &'static str {
        match self {
            PageError::Metadata(err) => err.code(),
            PageError::Render(_) => "render_failed",
            PageError::Serialize(_) => "serialize_failed",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            PageError::Metadata(_) => StatusCode::BAD_GATEWAY,
            PageError::Render(_) | PageError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(code = self.code(), error = %self, "page request failed");

        let body = ErrorBody {
            code: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pretty_document_round_trips() {
        let document = json!({
            "Cluster": "default",
            "Containers": [{"Image": "app:1", "Networks": []}]
        });

        let data = pretty_document(&document).expect("pretty");
        let reparsed: Value = serde_json::from_str(&data).expect("reparse");
        assert_eq!(reparsed, document);
    }

    #[test]
    fn index_template_renders_all_fields() {
        let env = templates().expect("templates");
        let template = env.get_template("index").expect("index");

        let rendered = template
            .render(context! {
                data => "{}",
                image => "amazon/amazon-ecs-sample:latest",
                network => "awsvpc",
                address => "10.0.2.106",
                version => "0.0.0",
            })
            .expect("render");

        assert!(rendered.contains("amazon/amazon-ecs-sample:latest"));
        assert!(rendered.contains("awsvpc"));
        assert!(rendered.contains("10.0.2.106"));
        assert!(rendered.contains("0.0.0"));
    }
}
