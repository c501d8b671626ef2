use async_trait::async_trait;
use v4l::video::Capture;
use v4l::Device;

use crate::application::ports::SourceCatalogPort;
use crate::domain::camera::{FrameSize, SourceInfo};
use crate::domain::errors::DomainResult;

/// Enumerates `/dev/video*` nodes that answer as capture devices.
#[derive(Default)]
pub struct V4l2SourceCatalog;

impl V4l2SourceCatalog {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceCatalogPort for V4l2SourceCatalog {
    async fn list_sources(&self) -> DomainResult<Vec<SourceInfo>> {
        let mut nodes = v4l::context::enum_devices();
        nodes.sort_by_key(|n| n.index());

        let mut out = Vec::new();
        for node in nodes {
            let path = node.path().to_string_lossy().to_string();
            let Ok(dev) = Device::with_path(&path) else {
                tracing::debug!("Skipping {}: cannot open", path);
                continue;
            };
            let caps = match dev.query_caps() {
                Ok(c) => c,
                Err(_) => continue,
            };
            if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                continue;
            }

            let size = dev
                .format()
                .ok()
                .map(|f| FrameSize { width: f.width, height: f.height });
            let fps = dev.params().ok().and_then(|p| {
                let (num, den) = (p.interval.numerator, p.interval.denominator);
                (num > 0).then(|| den as f32 / num as f32)
            });

            out.push(SourceInfo {
                index: node.index(),
                path,
                name: node.name().unwrap_or(caps.card),
                size,
                fps,
            });
        }
        Ok(out)
    }
}
