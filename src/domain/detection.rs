use serde::{Deserialize, Serialize};

/// Raw model output before thresholding or label resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub class_id: usize,
    pub confidence: f32,
    /// x1, y1, x2, y2 in frame pixels.
    pub bbox: [f32; 4],
}

/// Integer pixel box with `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn from_corners(bbox: [f32; 4]) -> Self {
        let [x1, y1, x2, y2] = bbox.map(|v| v.round() as i32);
        Self::new(x1, y1, x2, y2)
    }

    pub fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1)
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from(v: [i32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// A detection that passed the confidence threshold. This is also the shape of
/// one line in the detections log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    /// Seconds since the UNIX epoch at capture time.
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedDetection {
    pub detection: Detection,
    pub is_target: bool,
    /// Drawn on the overlay: targets always, others only under show-all.
    pub visible: bool,
}

impl ClassifiedDetection {
    pub fn label(&self) -> &str {
        &self.detection.label
    }

    pub fn confidence(&self) -> f32 {
        self.detection.confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_orders_corners() {
        let b = BoundingBox::from_corners([40.4, 90.6, 10.0, 20.0]);
        assert_eq!(b, BoundingBox { x1: 10, y1: 20, x2: 40, y2: 91 });
        assert_eq!(b.width(), 30);
    }

    #[test]
    fn huge_model_coordinates_saturate() {
        let b = BoundingBox::from_corners([-1e12, f32::NEG_INFINITY, 1e12, 1e30]);
        assert_eq!(b.x1, i32::MIN);
        assert_eq!(b.x2, i32::MAX);
        assert_eq!(b.width(), i32::MAX);
        assert_eq!(b.height(), i32::MAX);
    }

    #[test]
    fn detection_serializes_as_log_record() {
        let det = Detection {
            label: "person".into(),
            confidence: 0.5,
            bbox: BoundingBox::new(1, 2, 3, 4),
            timestamp: 1700000000.25,
        };
        let v = serde_json::to_value(&det).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "class": "person",
                "confidence": 0.5,
                "bbox": [1, 2, 3, 4],
                "timestamp": 1700000000.25
            })
        );
    }
}
