//! Cloud Vision REST client
//!
//! Calls `POST {endpoint}/images:annotate?key=...` with one feature per
//! image. Remote and local images are loaded by [`ImageLoader`] and sent as
//! base64 content; `gs://` images are sent by reference.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::sync::Semaphore;
use tracing::{debug, info};
use vision_common::config::ServiceConfig;
use vision_common::{LabelAnnotation, LocalizedObjectAnnotation};

use super::batch::BatchSession;
use super::image_source::{ImageLoader, ImagePayload, ImageRef};
use super::wire::{
    AnnotateImageRequest, AnnotateImageResponse, BatchAnnotateImagesRequest,
    BatchAnnotateImagesResponse, ErrorEnvelope, Feature, FeatureType, Image, ImageSource,
};
use super::{ImageAnalyzer, VisionError};

const USER_AGENT: &str = concat!("vision-gateway/", env!("CARGO_PKG_VERSION"));

/// Cloud Vision API client
pub struct CloudVisionClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    loader: ImageLoader,
    batch_slots: Semaphore,
}

impl CloudVisionClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, VisionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| VisionError::Network(e.to_string()))?;

        Ok(Self {
            loader: ImageLoader::new(http_client.clone(), config.max_image_bytes),
            http_client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            batch_slots: Semaphore::new(config.max_concurrent_batches),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Batch slots not currently held by an open session
    pub fn available_batch_slots(&self) -> usize {
        self.batch_slots.available_permits()
    }

    /// Refuse new batch sessions; sessions already open run to completion
    pub fn close_batches(&self) {
        if !self.batch_slots.is_closed() {
            info!("Batch annotator closed to new sessions");
            self.batch_slots.close();
        }
    }

    /// Open a scoped batch session, waiting for a free slot
    ///
    /// Fails with [`VisionError::Closed`] after [`close_batches`](Self::close_batches).
    pub async fn open_batch(&self) -> Result<BatchSession<'_>, VisionError> {
        let permit = self
            .batch_slots
            .acquire()
            .await
            .map_err(|_| VisionError::Closed)?;
        Ok(BatchSession::new(self, permit))
    }

    /// Load the image and wrap it in a single-feature request
    pub async fn build_request(
        &self,
        image: &ImageRef,
        feature: FeatureType,
    ) -> Result<AnnotateImageRequest, VisionError> {
        let image = match self.loader.load(image).await? {
            ImagePayload::Inline(bytes) => Image {
                content: Some(STANDARD.encode(bytes)),
                source: None,
            },
            ImagePayload::GcsUri(uri) => Image {
                content: None,
                source: Some(ImageSource { gcs_image_uri: uri }),
            },
        };

        Ok(AnnotateImageRequest {
            image,
            features: vec![Feature {
                feature_type: feature,
            }],
        })
    }

    pub(super) async fn send_batch(
        &self,
        requests: Vec<AnnotateImageRequest>,
    ) -> Result<Vec<AnnotateImageResponse>, VisionError> {
        let api_key = self.require_api_key()?;
        let url = format!("{}/images:annotate", self.endpoint);

        debug!(url = %url, images = requests.len(), "Calling Vision API");

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&BatchAnnotateImagesRequest { requests })
            .send()
            .await
            .map_err(|e| VisionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(VisionError::Http {
                status: status.as_u16(),
                body: message,
            });
        }

        let batch: BatchAnnotateImagesResponse = response
            .json()
            .await
            .map_err(|e| VisionError::Parse(e.to_string()))?;

        Ok(batch.responses)
    }

    fn require_api_key(&self) -> Result<&str, VisionError> {
        self.api_key.as_deref().ok_or(VisionError::MissingApiKey)
    }

    async fn annotate_one(
        &self,
        image: &ImageRef,
        feature: FeatureType,
    ) -> Result<AnnotateImageResponse, VisionError> {
        // Fail before downloading anything
        self.require_api_key()?;

        let request = self.build_request(image, feature).await?;
        let response = self
            .send_batch(vec![request])
            .await?
            .into_iter()
            .next()
            .ok_or(VisionError::EmptyResponse)?;

        check_status(response)
    }
}

/// Turn a per-image error status into an error
fn check_status(response: AnnotateImageResponse) -> Result<AnnotateImageResponse, VisionError> {
    match &response.error {
        Some(status) if status.code != 0 => Err(VisionError::Api {
            code: status.code,
            message: status.message.clone(),
        }),
        _ => Ok(response),
    }
}

#[async_trait]
impl ImageAnalyzer for CloudVisionClient {
    async fn analyze_labels(&self, image: &ImageRef) -> Result<Vec<LabelAnnotation>, VisionError> {
        let response = self.annotate_one(image, FeatureType::LabelDetection).await?;
        let labels: Vec<LabelAnnotation> = response
            .label_annotations
            .into_iter()
            .map(LabelAnnotation::from)
            .collect();

        info!(image = %image, labels = labels.len(), "Label detection complete");
        Ok(labels)
    }

    async fn extract_text(&self, image: &ImageRef) -> Result<String, VisionError> {
        let response = self.annotate_one(image, FeatureType::TextDetection).await?;
        let text = response.full_text();

        info!(image = %image, chars = text.chars().count(), "Text detection complete");
        Ok(text)
    }

    async fn localize_objects(
        &self,
        image: &ImageRef,
    ) -> Result<Vec<LocalizedObjectAnnotation>, VisionError> {
        self.require_api_key()?;
        let request = self
            .build_request(image, FeatureType::ObjectLocalization)
            .await?;

        let responses = {
            let session = self.open_batch().await?;
            session.annotate(vec![request]).await?
        };

        let mut objects = Vec::new();
        for response in responses {
            let response = check_status(response)?;
            objects.extend(
                response
                    .localized_object_annotations
                    .into_iter()
                    .map(LocalizedObjectAnnotation::from),
            );
        }

        for object in &objects {
            let vertices: Vec<String> = object
                .vertices
                .iter()
                .map(|v| format!("({}, {})", v.x, v.y))
                .collect();
            info!(
                image = %image,
                name = %object.name,
                confidence = object.score,
                vertices = %vertices.join(" "),
                "Localized object"
            );
        }

        Ok(objects)
    }
}
