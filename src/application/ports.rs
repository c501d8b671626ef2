use async_trait::async_trait;
use image::Rgb;

use crate::application::dto::ConfigFile;
use crate::application::notifier::Alert;
use crate::domain::{
    camera::SourceInfo,
    detection::{BoundingBox, Detection, RawDetection},
    errors::DomainResult,
    model::ModelId,
    stream::Frame,
};

#[async_trait]
pub trait SourceCatalogPort: Send + Sync {
    async fn list_sources(&self) -> DomainResult<Vec<SourceInfo>>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}

/// Sequential frame provider owned by the session loop. An error from
/// `next_frame` ends the session.
pub trait FrameSourcePort {
    fn next_frame(&mut self) -> DomainResult<Frame>;
    fn close(&mut self);
}

pub trait DetectorPort {
    fn detect(&mut self, frame: &Frame) -> DomainResult<Vec<RawDetection>>;
    /// Class labels indexed by class id.
    fn labels(&self) -> &[String];
}

/// Video window plus the keyboard attached to it.
pub trait DisplayPort {
    fn show(&mut self, frame: &Frame) -> DomainResult<()>;
    /// At most one pending key per call.
    fn poll_key(&mut self) -> Option<char>;
    fn is_open(&self) -> bool;
    fn close(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptReply {
    Text(String),
    Cancelled,
}

/// Blocking operator prompt on a channel separate from the video window.
pub trait PromptPort {
    fn ask(&mut self, context: &[String], question: &str) -> PromptReply;
    fn notice(&mut self, message: &str);
}

#[async_trait]
pub trait AlertPort: Send + Sync {
    async fn present(&self, alert: &Alert) -> DomainResult<()>;
}

pub trait ConfigStorePort {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> DomainResult<Option<ConfigFile>>;
    fn save(&self, file: &ConfigFile) -> DomainResult<()>;
}

pub trait DetectionLogPort {
    fn append(&mut self, detections: &[Detection]) -> DomainResult<()>;
}

/// Raster primitives the overlay is drawn with.
pub trait Canvas {
    fn dimensions(&self) -> (u32, u32);
    fn stroke_rect(&mut self, rect: BoundingBox, color: Rgb<u8>, thickness: u32);
    /// Blends `color` over the area with the given opacity.
    fn shade_rect(&mut self, rect: BoundingBox, color: Rgb<u8>, alpha: f32);
    fn text(&mut self, x: i32, y: i32, text: &str, color: Rgb<u8>, scale: u32);
    /// Rendered extent of `text` as (width, height).
    fn text_size(&self, text: &str, scale: u32) -> (u32, u32);
}
