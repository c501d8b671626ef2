use async_trait::async_trait;
use std::path::Path;

use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ModelId;

#[derive(Default)]
pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelCatalogPort for OnnxModelCatalog {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.onnx_path.trim().is_empty() {
            return Err(DomainError::InvalidInput("model path is empty".into()));
        }
        let path = Path::new(&model.onnx_path);
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|_| DomainError::NotFound(format!("model file not found: {}", model.onnx_path)))?;
        if !meta.is_file() {
            return Err(DomainError::InvalidInput(format!("not a file: {}", model.onnx_path)));
        }
        if path.extension().and_then(|e| e.to_str()) != Some("onnx") {
            tracing::warn!("Model {} does not have an .onnx extension", model.onnx_path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_and_empty_paths_are_rejected() {
        let catalog = OnnxModelCatalog::new();
        let missing = ModelId::from_path("/nonexistent/yolov8n.onnx");
        assert!(matches!(catalog.validate_model(&missing).await, Err(DomainError::NotFound(_))));
        let empty = ModelId::from_path(" ");
        assert!(matches!(catalog.validate_model(&empty).await, Err(DomainError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn existing_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.onnx");
        std::fs::write(&path, b"onnx").unwrap();
        let model = ModelId::from_path(path.to_str().unwrap());
        assert!(catalog_ok(&model).await);
        assert!(matches!(
            OnnxModelCatalog::new()
                .validate_model(&ModelId::from_path(dir.path().to_str().unwrap()))
                .await,
            Err(DomainError::InvalidInput(_))
        ));
    }

    async fn catalog_ok(model: &ModelId) -> bool {
        OnnxModelCatalog::new().validate_model(model).await.is_ok()
    }
}
