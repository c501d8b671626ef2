use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::application::ports::DetectionLogPort;
use crate::domain::detection::Detection;
use crate::domain::errors::DomainResult;

/// Appends detections as JSON lines. The file is opened on first use.
pub struct JsonlDetectionLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl JsonlDetectionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), writer: None }
    }

    fn writer(&mut self) -> DomainResult<&mut BufWriter<File>> {
        let writer = match self.writer.take() {
            Some(w) => w,
            None => {
                let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
                tracing::info!("Logging detections to {}", self.path.display());
                BufWriter::new(file)
            }
        };
        Ok(self.writer.insert(writer))
    }
}

impl DetectionLogPort for JsonlDetectionLog {
    fn append(&mut self, detections: &[Detection]) -> DomainResult<()> {
        let writer = self.writer()?;
        for det in detections {
            serde_json::to_writer(&mut *writer, det)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}
