/// Generation request bookkeeping
///
/// Only one request may be outstanding at a time. The flag lives with the
/// application, not with the comparison session, so closing and reopening
/// the viewer never observes it.

use serde::Serialize;
use thiserror::Error;

use super::data::ImageRef;

/// Body sent to the generation service
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub product_id: String,
    pub selected_source_images: Vec<ImageRef>,
    /// Engine tag from config, e.g. "v1"
    pub engine: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("a generation request for {0} is already running")]
    InFlight(String),
    #[error("select at least one source image before generating")]
    EmptySelection,
}

/// Tracks the single in-flight generation request
#[derive(Debug, Clone, Default)]
pub struct GenerationTracker {
    in_flight: Option<String>,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a request for `product_id` as running
    pub fn begin(&mut self, product_id: &str) -> Result<(), SubmitError> {
        if let Some(running) = &self.in_flight {
            return Err(SubmitError::InFlight(running.clone()));
        }
        self.in_flight = Some(product_id.to_string());
        Ok(())
    }

    /// Build and register a request; refuses empty selections and re-entrant submits
    pub fn submit(
        &mut self,
        product_id: &str,
        selected: &[ImageRef],
        engine: &str,
    ) -> Result<GenerationRequest, SubmitError> {
        if selected.is_empty() {
            return Err(SubmitError::EmptySelection);
        }
        self.begin(product_id)?;
        Ok(GenerationRequest {
            product_id: product_id.to_string(),
            selected_source_images: selected.to_vec(),
            engine: engine.to_string(),
        })
    }

    /// Clear the flag; called for both success and failure
    pub fn finish(&mut self) -> Option<String> {
        self.in_flight.take()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether the Generate action is enabled for a selection
    pub fn can_submit(&self, selected: &[ImageRef]) -> bool {
        !self.is_in_flight() && !selected.is_empty()
    }
}
