//! Download a single category file from a single mirror.

use serde_json::Value;

use crate::bundle::{write_json_pretty, Bundle};
use crate::error::{BundleError, FetchError};
use crate::http::HttpClient;
use crate::models::Category;
use crate::sources::Mirror;

/// URL of a category file on a mirror: `{base}sentences/{category}.json`.
pub fn category_url(mirror: Mirror, category: Category) -> String {
    format!("{}sentences/{}", mirror.base_url(), category.file_name())
}

/// Fetches category files and stores them in a bundle.
pub struct Fetcher<'a> {
    client: &'a dyn HttpClient,
    bundle: &'a Bundle,
}

impl<'a> Fetcher<'a> {
    pub fn new(client: &'a dyn HttpClient, bundle: &'a Bundle) -> Self {
        Self { client, bundle }
    }

    /// Download `category` from `mirror`, validate that it is a JSON array,
    /// overwrite the local category file with it, and return its length.
    ///
    /// Nothing is written unless the payload validates.
    pub fn fetch(&self, mirror: Mirror, category: Category) -> Result<usize, FetchError> {
        let url = category_url(mirror, category);
        tracing::debug!("GET {}", url);

        let body = self
            .client
            .get(&url)
            .map_err(|e| FetchError::from_http(&url, e))?;

        let value: Value = serde_json::from_slice(&body).map_err(|e| FetchError::Format {
            url: url.clone(),
            reason: format!("invalid JSON: {}", e),
        })?;

        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(FetchError::Format {
                    url,
                    reason: format!("expected a JSON array, got {}", json_kind(&other)),
                })
            }
        };

        let path = self.bundle.category_path(category);
        write_json_pretty(&path, &items).map_err(|e| match e {
            BundleError::Write { path, source } => FetchError::Io { path, source },
            other => FetchError::Format {
                url: url.clone(),
                reason: other.to_string(),
            },
        })?;

        tracing::info!(
            "stored {} ({} quotes) from {}",
            category.file_name(),
            items.len(),
            mirror
        );
        Ok(items.len())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
