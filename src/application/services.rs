use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    application::{
        dto::ConfigFile,
        ports::{ConfigStorePort, ModelCatalogPort, PromptPort, PromptReply, SourceCatalogPort},
    },
    domain::{
        camera::SourceInfo,
        config::{parse_class_list, DetectorConfig},
        errors::DomainResult,
        model::ModelId,
    },
};

/// Index used when enumeration finds nothing or the operator skips the choice.
pub const DEFAULT_SOURCE_INDEX: usize = 0;

/// Startup checks and selection for capture devices and models.
#[derive(Clone)]
pub struct StartupService {
    sources: Arc<dyn SourceCatalogPort>,
    models: Arc<dyn ModelCatalogPort>,
}

impl StartupService {
    pub fn new(sources: Arc<dyn SourceCatalogPort>, models: Arc<dyn ModelCatalogPort>) -> Self {
        Self { sources, models }
    }

    pub async fn list_sources(&self) -> DomainResult<Vec<SourceInfo>> {
        self.sources.list_sources().await
    }

    /// Fails when the model cannot be used; the session must not start.
    pub async fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        self.models.validate_model(model).await
    }

    /// Device index to open. A configured index is used as-is; `-1` asks the
    /// operator to pick from the enumerated devices.
    pub async fn resolve_source(&self, config: &DetectorConfig, console: &mut dyn PromptPort) -> usize {
        if !config.auto_select_source() {
            return config.video_source as usize;
        }
        console.notice("Scanning for available video sources...");
        let sources = match self.list_sources().await {
            Ok(s) => s,
            Err(e) => {
                warn!("Source enumeration failed: {}", e);
                Vec::new()
            }
        };
        choose_source(&sources, console)
    }
}

pub fn choose_source(sources: &[SourceInfo], console: &mut dyn PromptPort) -> usize {
    if sources.is_empty() {
        warn!("No video sources found, falling back to index {}", DEFAULT_SOURCE_INDEX);
        for line in [
            "No video sources found. You may need to:",
            "1. Connect the camera or start the virtual camera",
            "2. Check permissions on /dev/video*",
            "3. Try different source indices manually with --source",
        ] {
            console.notice(line);
        }
        console.notice(&format!("Using default ({DEFAULT_SOURCE_INDEX})"));
        return DEFAULT_SOURCE_INDEX;
    }

    let mut context = vec![String::new(), "Available video sources:".to_string()];
    context.extend(sources.iter().enumerate().map(|(i, s)| format!("{}: {}", i, s.describe())));
    let question = format!(
        "Select source (0-{}) or press Enter for default: ",
        sources.len() - 1
    );

    loop {
        let text = match console.ask(&context, &question) {
            PromptReply::Cancelled => return sources[0].index,
            PromptReply::Text(t) => t,
        };
        let text = text.trim();
        if text.is_empty() {
            return sources[0].index;
        }
        match text.parse::<usize>() {
            Ok(choice) if choice < sources.len() => {
                info!("Selected {}", sources[choice].describe());
                return sources[choice].index;
            }
            Ok(_) => console.notice("Invalid choice. Please try again."),
            Err(_) => console.notice("Please enter a valid number."),
        }
        // the list is only printed once
        context.clear();
    }
}

/// Loads the persisted config merged with defaults. Never fails: a corrupt or
/// unreadable file yields defaults in memory and is left untouched; a missing
/// file is created from the defaults.
pub fn load_config(store: &dyn ConfigStorePort) -> DetectorConfig {
    match store.load() {
        Ok(Some(file)) => {
            let merged = file.into_config();
            for w in &merged.warnings {
                warn!("Config: {}", w);
            }
            merged.config
        }
        Ok(None) => {
            let config = DetectorConfig::default();
            if let Err(e) = store.save(&ConfigFile::from(&config)) {
                warn!("Could not write default config: {}", e);
            }
            config
        }
        Err(e) => {
            warn!("Error loading config: {}. Using defaults.", e);
            DetectorConfig::default()
        }
    }
}

/// Command-line values that take precedence over the file, field by field.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model_path: Option<String>,
    pub video_source: Option<i32>,
    pub confidence_threshold: Option<f32>,
    pub target_classes: Option<String>,
}

impl ConfigOverrides {
    /// Invalid values are reported and skipped; the file value stays.
    pub fn apply(self, config: &mut DetectorConfig) -> Vec<String> {
        let mut rejected = Vec::new();
        if let Some(model) = self.model_path {
            config.model_path = model;
        }
        if let Some(source) = self.video_source {
            config.video_source = source;
        }
        if let Some(conf) = self.confidence_threshold {
            if let Err(e) = config.set_confidence_threshold(conf) {
                rejected.push(format!("--confidence ignored: {e}"));
            }
        }
        if let Some(targets) = self.target_classes {
            let classes = parse_class_list(&targets);
            if classes.is_empty() {
                rejected.push("--targets ignored: no class names given".to_string());
            } else {
                config.set_target_classes(classes);
            }
        }
        rejected
    }
}
