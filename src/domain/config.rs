use super::errors::{DomainError, DomainResult};

pub const DEFAULT_MODEL_PATH: &str = "yolov8n.onnx";
pub const DEFAULT_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_OUTPUT_FILE: &str = "detections.json";
/// `video_source` value that asks for interactive selection.
pub const AUTO_SOURCE: i32 = -1;

/// Session configuration. Fields that carry invariants are private and only
/// change through validating setters.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    pub model_path: String,
    confidence_threshold: f32,
    target_classes: Vec<String>,
    pub video_source: i32,
    pub ndi_sources: Vec<String>,
    pub display_size: (u32, u32),
    pub show_all_detections: bool,
    pub save_detections: bool,
    pub output_file: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: DEFAULT_MODEL_PATH.to_string(),
            confidence_threshold: DEFAULT_CONFIDENCE,
            target_classes: vec!["person".to_string()],
            video_source: AUTO_SOURCE,
            ndi_sources: Vec::new(),
            display_size: (1280, 720),
            show_all_detections: false,
            save_detections: false,
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
        }
    }
}

impl DetectorConfig {
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Rejects values outside [0, 1]; the current threshold is kept on error.
    pub fn set_confidence_threshold(&mut self, value: f32) -> DomainResult<()> {
        validate_threshold(value)?;
        self.confidence_threshold = value;
        Ok(())
    }

    pub fn target_classes(&self) -> &[String] {
        &self.target_classes
    }

    /// Stores the normalized set and returns it. Entries that are blank after
    /// trimming are dropped.
    pub fn set_target_classes<I, S>(&mut self, classes: I) -> &[String]
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.target_classes = normalize_classes(classes);
        &self.target_classes
    }

    /// Comparison against an already-lowercased label.
    pub fn is_target(&self, label: &str) -> bool {
        self.target_classes.iter().any(|t| t == label)
    }

    pub fn auto_select_source(&self) -> bool {
        self.video_source < 0
    }
}

pub fn validate_threshold(value: f32) -> DomainResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DomainError::InvalidInput(format!(
            "confidence threshold {value} outside 0.0..=1.0"
        )))
    }
}

/// Trim, lowercase, drop blanks, dedupe keeping first occurrence.
pub fn normalize_classes<I, S>(classes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for class in classes {
        let c = class.as_ref().trim().to_lowercase();
        if !c.is_empty() && !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

/// Parses operator text such as `"Cat, DOG"`.
pub fn parse_class_list(input: &str) -> Vec<String> {
    normalize_classes(input.split(','))
}
