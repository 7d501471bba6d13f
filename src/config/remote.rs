//! Initialize a layer from a JSON document served over HTTP(S).

use crate::config::{ConfigTree, Configuration};
use crate::error::ApiError;
use serde_json::Value;

/// Parse a downloaded body into a normalized tree.
pub fn parse_config(url: &str, body: &str) -> Result<ConfigTree, ApiError> {
    let value: Value = serde_json::from_str(body).map_err(|e| ApiError::Download {
        url: url.to_string(),
        message: format!("unable to parse config: {}", e),
    })?;
    if !value.is_object() {
        return Err(ApiError::Download {
            url: url.to_string(),
            message: "unable to parse config: document is not a JSON object".to_string(),
        });
    }
    Ok(ConfigTree::from_value(value))
}

/// Download a configuration document.
pub async fn fetch_config(url: &str) -> Result<ConfigTree, ApiError> {
    let download_err = |message: String| ApiError::Download {
        url: url.to_string(),
        message,
    };

    let response = reqwest::get(url)
        .await
        .map_err(|e| download_err(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(download_err(format!("server responded with {}", status)));
    }
    let body = response
        .text()
        .await
        .map_err(|e| download_err(e.to_string()))?;

    tracing::debug!(url, bytes = body.len(), "downloaded config");
    parse_config(url, &body)
}

impl Configuration {
    /// Replace the active layer with a downloaded document.
    pub async fn init_from_url(&mut self, url: &str) -> Result<(), ApiError> {
        let tree = fetch_config(url).await?;
        self.layer_set(tree)
    }
}
