use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelId {
    pub name: String,       // logical name, e.g. "yolov8n"
    pub onnx_path: String,  // filesystem path
}

impl ModelId {
    pub fn from_path(path: &str) -> Self {
        let name = std::path::Path::new(path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string());
        Self { name, onnx_path: path.to_string() }
    }
}

/// Decoder settings for the engine. `conf_floor` only prunes obvious noise;
/// the operator threshold is applied later by the detection filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoloParams {
    pub input_size: u32,        // 640 typical
    pub conf_floor: f32,        // 0..1
    pub iou_threshold: f32,     // 0..1
    pub max_detections: usize,  // e.g. 300
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_floor: 0.05,
            iou_threshold: 0.45,
            max_detections: 100,
        }
    }
}
