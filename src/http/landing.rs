//! Landing page served at `/`.
//!
//! The template is read and rendered once at startup; handlers only clone
//! the finished HTML.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::response::{Html, IntoResponse, Response};
use html_escape::encode_double_quoted_attribute;

const DEFAULT_TEMPLATE: &str = include_str!("../../assets/view.html");
const HOST_PLACEHOLDER: &str = "{{host}}";

#[derive(Debug, thiserror::Error)]
pub enum LandingError {
    #[error("failed to read landing template {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pre-rendered landing page.
#[derive(Debug, Clone)]
pub struct LandingPage {
    html: Arc<str>,
}

impl LandingPage {
    /// Render `template`, substituting the proxy's public base URL.
    pub fn render(template: &str, base_url: &str) -> Self {
        Self {
            html: template
                .replace(HOST_PLACEHOLDER, &encode_double_quoted_attribute(base_url))
                .into(),
        }
    }

    /// Load the template at `path` (or the built-in one) and render it.
    pub fn load(path: Option<&Path>, base_url: &str) -> Result<Self, LandingError> {
        let Some(path) = path else {
            return Ok(Self::render(DEFAULT_TEMPLATE, base_url));
        };

        let template = fs::read_to_string(path).map_err(|source| LandingError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::render(&template, base_url))
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

impl IntoResponse for LandingPage {
    fn into_response(self) -> Response {
        Html(self.html.to_string()).into_response()
    }
}
