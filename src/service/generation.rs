/// HTTP client for the image generation service
///
/// The response is only read as succeeded / failed. A successful run is
/// followed by a product reload; failures are reported and never retried.

use serde::Deserialize;
use tracing::{error, info, instrument};

use crate::config::GenerationConfig;
use crate::error::{Result, WorkbenchError};
use crate::state::generation::GenerationRequest;

/// Reply body; services may omit `success` and rely on the status code
#[derive(Debug, Deserialize)]
struct GenerationReply {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Cloning shares the underlying connection pool
#[derive(Debug, Clone)]
pub struct GenerationClient {
    endpoint: String,
    http: reqwest::Client,
}

impl GenerationClient {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post the request and wait for the run to finish
    #[instrument(skip(self, request), fields(product = %request.product_id, sources = request.selected_source_images.len()))]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<()> {
        info!(endpoint = %self.endpoint, "🎨 generation requested");

        let response = self.http.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        interpret_reply(status, &body).inspect_err(|e| error!(error = %e, "generation failed"))?;
        info!("✅ generation finished");
        Ok(())
    }
}

fn interpret_reply(status: reqwest::StatusCode, body: &str) -> Result<()> {
    let reply: Option<GenerationReply> = serde_json::from_str(body).ok();

    if !status.is_success() {
        let detail = reply
            .and_then(|r| r.error)
            .unwrap_or_else(|| format!("service returned {status}"));
        return Err(WorkbenchError::Generation(detail));
    }

    match reply {
        Some(GenerationReply { success: false, error }) => Err(WorkbenchError::Generation(
            error.unwrap_or_else(|| "service reported failure".to_string()),
        )),
        _ => Ok(()),
    }
}

/// Async wrapper for `Task::perform`
pub async fn generate_async(client: GenerationClient, request: GenerationRequest) -> std::result::Result<String, String> {
    client
        .generate(&request)
        .await
        .map(|()| request.product_id)
        .map_err(|e| e.to_string())
}
