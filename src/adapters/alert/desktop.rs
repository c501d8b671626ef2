use async_trait::async_trait;
use tokio::process::Command;

use crate::application::notifier::Alert;
use crate::application::ports::AlertPort;
use crate::domain::errors::{DomainError, DomainResult};

/// Desktop notification through an external `notify-send`-compatible program.
pub struct DesktopAlert {
    program: String,
    app_name: String,
}

impl DesktopAlert {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self::with_program("notify-send", app_name)
    }

    pub fn with_program(program: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self { program: program.into(), app_name: app_name.into() }
    }

    fn args(&self, alert: &Alert) -> Vec<String> {
        vec![
            "--app-name".to_string(),
            self.app_name.clone(),
            "--urgency".to_string(),
            "critical".to_string(),
            alert.title.clone(),
            alert.body.clone(),
        ]
    }
}

#[async_trait]
impl AlertPort for DesktopAlert {
    async fn present(&self, alert: &Alert) -> DomainResult<()> {
        tracing::info!("🔔 {}: {}", alert.title, alert.body.replace('\n', " | "));

        let status = Command::new(&self.program)
            .args(self.args(alert))
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| DomainError::OperationFailed(format!("cannot run {}: {e}", self.program)))?;

        if !status.success() {
            return Err(DomainError::OperationFailed(format!("{} exited with {status}", self.program)));
        }
        Ok(())
    }
}
