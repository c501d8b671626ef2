use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use crate::application::ports::AlertPort;
use crate::domain::{detection::ClassifiedDetection, throttle::NotificationThrottle};

/// Label that may raise an alert. Other target classes only get overlay emphasis.
pub const ALERT_LABEL: &str = "person";

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub title: String,
    pub body: String,
}

impl Alert {
    pub fn person_detected(confidence: f32) -> Self {
        Self {
            title: "Person Detected!".to_string(),
            body: format!(
                "Person detected with confidence: {:.2}\nTime: {}",
                confidence,
                chrono::Local::now().format("%H:%M:%S")
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Not a target person detection.
    Ineligible,
    /// Inside the cooldown window.
    Throttled,
    /// Handed to the dispatcher.
    Fired,
    /// The throttle fired but the dispatch slot was busy or closed.
    Dropped,
}

/// Upper bound on one presentation; a hung presenter frees the dispatcher after this.
pub const PRESENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Rate-limited alert trigger. The dispatcher presents one alert at a time and
/// the channel holds at most one more, so a slow presenter makes later alerts
/// drop instead of piling up. The caller never waits on either.
pub struct Notifier {
    throttle: NotificationThrottle,
    tx: Option<mpsc::Sender<Alert>>,
}

impl Notifier {
    pub fn spawn(
        presenter: Arc<dyn AlertPort>,
        cooldown: Duration,
        tokio_handle: &tokio::runtime::Handle,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<Alert>(1);

        tokio_handle.spawn(async move {
            while let Some(alert) = rx.recv().await {
                match tokio::time::timeout(PRESENT_TIMEOUT, presenter.present(&alert)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!("Alert presentation failed: {}", e),
                    Err(_) => error!("Alert presentation timed out after {:?}", PRESENT_TIMEOUT),
                }
            }
            debug!("Alert dispatcher stopped");
        });

        let throttle = NotificationThrottle::new(cooldown);
        info!("Alerts enabled for '{}' with {:?} cooldown", ALERT_LABEL, throttle.cooldown());
        Self { throttle, tx: Some(tx) }
    }

    pub fn throttle(&self) -> &NotificationThrottle {
        &self.throttle
    }

    pub fn maybe_notify(&mut self, hit: &ClassifiedDetection, now: Instant) -> NotifyOutcome {
        if !hit.is_target || hit.label() != ALERT_LABEL {
            return NotifyOutcome::Ineligible;
        }
        // The timestamp moves before dispatch and is never rolled back.
        if !self.throttle.try_acquire(now) {
            return NotifyOutcome::Throttled;
        }

        let alert = Alert::person_detected(hit.confidence());
        let Some(tx) = self.tx.as_ref() else {
            warn!("Alert dropped: dispatcher shut down");
            return NotifyOutcome::Dropped;
        };
        match tx.try_send(alert) {
            Ok(()) => {
                info!("🔔 Person alert (confidence {:.2})", hit.confidence());
                NotifyOutcome::Fired
            }
            Err(TrySendError::Full(_)) => {
                warn!("Alert dropped: previous alert still being dispatched");
                NotifyOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Alert dropped: dispatcher closed");
                NotifyOutcome::Dropped
            }
        }
    }

    /// Closes the dispatch channel. Alerts already handed off may still finish.
    pub fn shutdown(&mut self) {
        self.tx.take();
    }
}
