//! Thresholding and target classification of raw model output.
//!
//! The outcome of one call is what stats, alerts and the overlay all read for
//! a tick, so they cannot disagree about what counted as a target.

use crate::domain::{
    config::DetectorConfig,
    detection::{BoundingBox, ClassifiedDetection, Detection, RawDetection},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    accepted: Vec<ClassifiedDetection>,
}

impl FilterOutcome {
    /// Every detection at or above the threshold, in model order.
    pub fn accepted(&self) -> &[ClassifiedDetection] {
        &self.accepted
    }

    pub fn targets(&self) -> impl Iterator<Item = &ClassifiedDetection> {
        self.accepted.iter().filter(|d| d.is_target)
    }

    pub fn visible(&self) -> impl Iterator<Item = &ClassifiedDetection> {
        self.accepted.iter().filter(|d| d.visible)
    }

    pub fn total_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn target_count(&self) -> usize {
        self.targets().count()
    }

    pub fn detections(&self) -> Vec<Detection> {
        self.accepted.iter().map(|d| d.detection.clone()).collect()
    }
}

/// `labels` is indexed by class id. Ids without a label are dropped.
pub fn filter_detections(
    raw: &[RawDetection],
    labels: &[String],
    config: &DetectorConfig,
    captured_at: f64,
) -> FilterOutcome {
    let threshold = config.confidence_threshold();
    let accepted = raw
        .iter()
        .filter(|r| r.confidence >= threshold)
        .filter_map(|r| {
            let label = labels.get(r.class_id)?.to_lowercase();
            let is_target = config.is_target(&label);
            Some(ClassifiedDetection {
                visible: is_target || config.show_all_detections,
                is_target,
                detection: Detection {
                    label,
                    confidence: r.confidence,
                    bbox: BoundingBox::from_corners(r.bbox),
                    timestamp: captured_at,
                },
            })
        })
        .collect();
    FilterOutcome { accepted }
}
