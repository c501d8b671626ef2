use serde::{Deserialize, Serialize};

use crate::domain::config::DetectorConfig;

/// On-disk configuration. Every key is optional on read and backfilled from
/// the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub model_path: String,
    pub confidence_threshold: f32,
    pub target_classes: Vec<String>,
    pub video_source: i32,
    pub ndi_sources: Vec<String>,
    pub display_size: (u32, u32),
    pub show_all_detections: bool,
    pub save_detections: bool,
    pub output_file: String,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::from(&DetectorConfig::default())
    }
}

impl From<&DetectorConfig> for ConfigFile {
    fn from(c: &DetectorConfig) -> Self {
        Self {
            model_path: c.model_path.clone(),
            confidence_threshold: c.confidence_threshold(),
            target_classes: c.target_classes().to_vec(),
            video_source: c.video_source,
            ndi_sources: c.ndi_sources.clone(),
            display_size: c.display_size,
            show_all_detections: c.show_all_detections,
            save_detections: c.save_detections,
            output_file: c.output_file.clone(),
        }
    }
}

/// Result of turning a file into a session config: values that broke an
/// invariant are replaced and reported.
#[derive(Debug)]
pub struct MergedConfig {
    pub config: DetectorConfig,
    pub warnings: Vec<String>,
}

impl ConfigFile {
    pub fn into_config(self) -> MergedConfig {
        let mut config = DetectorConfig::default();
        let mut warnings = Vec::new();

        config.model_path = self.model_path;
        if let Err(e) = config.set_confidence_threshold(self.confidence_threshold) {
            warnings.push(format!("{e}; using {}", config.confidence_threshold()));
        }
        let raw_count = self.target_classes.len();
        let kept = config.set_target_classes(&self.target_classes).len();
        if kept != raw_count {
            warnings.push(format!(
                "target_classes normalized: {raw_count} entries in file, {kept} kept"
            ));
        }
        config.video_source = self.video_source;
        config.ndi_sources = self.ndi_sources;
        config.display_size = self.display_size;
        config.show_all_detections = self.show_all_detections;
        config.save_detections = self.save_detections;
        config.output_file = self.output_file;

        MergedConfig { config, warnings }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }
}
