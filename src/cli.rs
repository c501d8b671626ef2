use std::path::PathBuf;

use clap::Parser;

use crate::application::services::ConfigOverrides;

/// Live camera object detection with target alerts.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Cli {
    /// Configuration file; created with defaults when missing.
    #[arg(long, default_value = "detector_config.json")]
    pub config: PathBuf,
    /// ONNX model path.
    #[arg(long)]
    pub model: Option<String>,
    /// Video device index (-1 to choose interactively).
    #[arg(long, allow_negative_numbers = true)]
    pub source: Option<i32>,
    /// Confidence threshold in [0, 1].
    #[arg(long)]
    pub confidence: Option<f32>,
    /// Comma-separated target classes, e.g. "person,car".
    #[arg(long)]
    pub targets: Option<String>,
    /// Print available video sources and exit.
    #[arg(long, default_value_t = false)]
    pub list_sources: bool,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            model_path: self.model.clone(),
            video_source: self.source,
            confidence_threshold: self.confidence,
            target_classes: self.targets.clone(),
        }
    }
}
