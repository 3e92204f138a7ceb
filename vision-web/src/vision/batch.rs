//! Scoped batch annotator session
//!
//! A [`BatchSession`] holds one of a bounded number of batch slots for as
//! long as it lives. Dropping it returns the slot, so the slot is released
//! on every exit path of the code that opened it, including `?` returns.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::SemaphorePermit;
use tracing::debug;

use super::client::CloudVisionClient;
use super::wire::{AnnotateImageRequest, AnnotateImageResponse};
use super::VisionError;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

pub struct BatchSession<'a> {
    id: u64,
    client: &'a CloudVisionClient,
    _permit: SemaphorePermit<'a>,
}

impl<'a> BatchSession<'a> {
    pub(super) fn new(client: &'a CloudVisionClient, permit: SemaphorePermit<'a>) -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(session_id = id, "Batch annotator session opened");
        Self {
            id,
            client,
            _permit: permit,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Annotate several images in one call
    ///
    /// Responses are returned in request order. Per-image errors are left in
    /// the individual responses for the caller to inspect.
    pub async fn annotate(
        &self,
        requests: Vec<AnnotateImageRequest>,
    ) -> Result<Vec<AnnotateImageResponse>, VisionError> {
        let expected = requests.len();
        debug!(session_id = self.id, images = expected, "Batch annotate");

        let responses = self.client.send_batch(requests).await?;
        if responses.len() < expected {
            return Err(VisionError::EmptyResponse);
        }
        Ok(responses)
    }
}

impl Drop for BatchSession<'_> {
    fn drop(&mut self) {
        debug!(session_id = self.id, "Batch annotator session released");
    }
}
