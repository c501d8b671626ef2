use image::RgbImage;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use super::detection::ClassifiedDetection;

/// One captured frame. The overlay is drawn in place on `image`.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// Seconds since the UNIX epoch.
    pub captured_at: f64,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image, captured_at: unix_now() }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// "2 person, 1 dog" style summary for debug logs.
pub fn summarize_detections(detections: &[ClassifiedDetection]) -> String {
    let mut counts = BTreeMap::new();
    for det in detections {
        *counts.entry(det.label()).or_insert(0) += 1;
    }
    counts
        .iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}
