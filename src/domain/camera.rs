use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// A capture device found during enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub index: usize,
    pub path: String,
    pub name: String,
    pub size: Option<FrameSize>,
    pub fps: Option<f32>,
}

impl SourceInfo {
    pub fn describe(&self) -> String {
        match (&self.size, self.fps) {
            (Some(size), Some(fps)) => format!(
                "Source {} ({}x{} @ {:.1}fps) {}",
                self.index, size.width, size.height, fps, self.name
            ),
            (Some(size), None) => {
                format!("Source {} ({}x{}) {}", self.index, size.width, size.height, self.name)
            }
            _ => format!("Source {} {}", self.index, self.name),
        }
    }
}

/// Which device to open, resolved before the session starts.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub index: usize,
    pub size: FrameSize,
    pub fps: u32,
}

impl CaptureRequest {
    pub fn device_path(&self) -> String {
        format!("/dev/video{}", self.index)
    }
}
