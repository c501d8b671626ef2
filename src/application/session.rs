use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::application::{
    controller::{ControllerIo, InteractionController, Transition},
    filter::{filter_detections, FilterOutcome},
    notifier::Notifier,
    overlay::{OverlayRenderer, OverlayView},
    ports::{ConfigStorePort, DetectionLogPort, DetectorPort, DisplayPort, FrameSourcePort, PromptPort},
};
use crate::domain::{
    config::DetectorConfig,
    stats::SessionStats,
    stream::{summarize_detections, Frame},
};

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Quit,
    Interrupted,
    WindowClosed,
    SourceFailed(String),
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, SessionOutcome::SourceFailed(_))
    }
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub stats: SessionStats,
    pub config: DetectorConfig,
}

/// Mutable session state, owned by the loop and lent to components per tick.
pub struct SessionContext {
    pub config: DetectorConfig,
    pub stats: SessionStats,
}

/// Frame source and display, closed exactly once on every exit path.
struct Resources {
    source: Box<dyn FrameSourcePort>,
    display: Box<dyn DisplayPort>,
    released: bool,
}

impl Resources {
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.source.close();
        self.display.close();
        info!("Frame source and display released");
    }
}

impl Drop for Resources {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct SessionPorts {
    pub source: Box<dyn FrameSourcePort>,
    pub detector: Box<dyn DetectorPort>,
    pub display: Box<dyn DisplayPort>,
    pub console: Box<dyn PromptPort>,
    pub store: Box<dyn ConfigStorePort>,
    pub detection_log: Box<dyn DetectionLogPort>,
}

pub struct SessionLoop {
    ctx: SessionContext,
    controller: InteractionController,
    notifier: Notifier,
    renderer: OverlayRenderer,
    resources: Resources,
    detector: Box<dyn DetectorPort>,
    console: Box<dyn PromptPort>,
    store: Box<dyn ConfigStorePort>,
    detection_log: Box<dyn DetectionLogPort>,
    interrupted: Arc<AtomicBool>,
    clock: Box<dyn Fn() -> Instant>,
}

impl SessionLoop {
    pub fn new(
        config: DetectorConfig,
        ports: SessionPorts,
        notifier: Notifier,
        interrupted: Arc<AtomicBool>,
    ) -> Self {
        Self {
            ctx: SessionContext { config, stats: SessionStats::default() },
            controller: InteractionController::new(),
            notifier,
            renderer: OverlayRenderer,
            resources: Resources { source: ports.source, display: ports.display, released: false },
            detector: ports.detector,
            console: ports.console,
            store: ports.store,
            detection_log: ports.detection_log,
            interrupted,
            clock: Box::new(Instant::now),
        }
    }

    /// Replaces the time source used for alert throttling.
    pub fn with_clock(mut self, clock: impl Fn() -> Instant + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Runs ticks until quit, interrupt, window close or a frame-read failure.
    /// Blocks the calling thread. There is no timeout on frame reads or
    /// inference: a hang in either stalls the loop.
    pub fn run(mut self) -> SessionReport {
        info!("Starting detection...");
        self.console.notice("Press 'h' for help, 'q' to quit");

        let outcome = loop {
            if let Some(outcome) = self.tick() {
                break outcome;
            }
        };

        match &outcome {
            SessionOutcome::SourceFailed(reason) => error!("Session ended: {}", reason),
            other => info!("Session ended: {:?}", other),
        }
        self.resources.release();
        self.notifier.shutdown();
        if let Some(last) = self.notifier.throttle().last_fired() {
            debug!("Last alert fired {:.1}s ago", last.elapsed().as_secs_f32());
        }

        let stats = self.ctx.stats;
        info!("Detection stats: {}", stats);
        self.console.notice(&format!("Detection stats: {stats}"));

        SessionReport { outcome, stats, config: self.ctx.config.clone() }
    }

    /// One iteration: read, process when running, render, display, then at
    /// most one key.
    fn tick(&mut self) -> Option<SessionOutcome> {
        if self.interrupted.load(Ordering::SeqCst) {
            self.console.notice("Interrupted by user");
            return Some(SessionOutcome::Interrupted);
        }
        if !self.resources.display.is_open() {
            return Some(SessionOutcome::WindowClosed);
        }

        // Paused ticks still drain one frame so the source never backs up.
        let mut frame = match self.resources.source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                self.console.notice("Failed to read frame");
                return Some(SessionOutcome::SourceFailed(e.to_string()));
            }
        };

        let state = self.controller.state();
        let outcome = (!state.paused).then(|| self.process(&frame));

        self.renderer.render(
            &mut frame,
            &OverlayView {
                detections: outcome.as_ref(),
                state,
                config: &self.ctx.config,
                stats: &self.ctx.stats,
            },
        );
        if let Err(e) = self.resources.display.show(&frame) {
            warn!("Display update failed: {}", e);
        }

        let key = self.resources.display.poll_key()?;
        self.handle_key(key)
    }

    fn process(&mut self, frame: &Frame) -> FilterOutcome {
        let raw = self.detector.detect(frame).unwrap_or_else(|e| {
            warn!("Inference failed, skipping frame: {}", e);
            Vec::new()
        });
        let outcome = filter_detections(&raw, self.detector.labels(), &self.ctx.config, frame.captured_at);

        self.ctx.stats.record(outcome.total_count(), outcome.target_count());

        if self.ctx.config.save_detections && outcome.total_count() > 0 {
            if let Err(e) = self.detection_log.append(&outcome.detections()) {
                warn!("Error saving detections: {}", e);
            }
        }

        // The throttle updates on the first fire, so later hits in the same
        // tick are throttled.
        let now = (self.clock)();
        for hit in outcome.targets() {
            self.notifier.maybe_notify(hit, now);
        }

        if outcome.total_count() > 0 {
            debug!("Detections: {}", summarize_detections(outcome.accepted()));
        }
        outcome
    }

    fn handle_key(&mut self, key: char) -> Option<SessionOutcome> {
        let transition = self.controller.handle_key(
            key,
            &self.ctx.config,
            &mut ControllerIo { store: self.store.as_ref(), console: self.console.as_mut() },
        );
        match transition {
            Transition::Continue => None,
            Transition::Quit => Some(SessionOutcome::Quit),
            Transition::Prompt(_) => {
                debug!("Awaiting operator input: {:?}", self.controller.mode());
                // Blocking: no frames are consumed until the prompt completes.
                self.controller.run_prompt(
                    &mut self.ctx.config,
                    self.detector.labels(),
                    self.console.as_mut(),
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::ConfigFile;
    use crate::application::notifier::Alert;
    use crate::application::ports::{AlertPort, PromptReply};
    use crate::domain::detection::{Detection, RawDetection};
    use crate::domain::errors::{DomainError, DomainResult};
    use async_trait::async_trait;
    use image::RgbImage;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Tally {
        frames_read: Cell<usize>,
        frames_shown: Cell<usize>,
        source_closed: Cell<usize>,
        display_closed: Cell<usize>,
        prompts: Cell<usize>,
        notices: RefCell<Vec<String>>,
        logged: RefCell<Vec<Detection>>,
        saved: RefCell<Vec<ConfigFile>>,
    }

    struct FakeSource {
        remaining: usize,
        tally: Rc<Tally>,
    }

    impl FrameSourcePort for FakeSource {
        fn next_frame(&mut self) -> DomainResult<Frame> {
            if self.remaining == 0 {
                return Err(DomainError::SourceExhausted("end of stream".into()));
            }
            self.remaining -= 1;
            self.tally.frames_read.set(self.tally.frames_read.get() + 1);
            Ok(Frame { image: RgbImage::new(320, 240), captured_at: 1.0 })
        }

        fn close(&mut self) {
            self.tally.source_closed.set(self.tally.source_closed.get() + 1);
        }
    }

    struct FakeDetector {
        labels: Vec<String>,
        per_frame: Vec<RawDetection>,
        calls: Rc<Cell<usize>>,
        fail: bool,
    }

    impl DetectorPort for FakeDetector {
        fn detect(&mut self, _frame: &Frame) -> DomainResult<Vec<RawDetection>> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(DomainError::OperationFailed("inference backend lost".into()));
            }
            Ok(self.per_frame.clone())
        }

        fn labels(&self) -> &[String] {
            &self.labels
        }
    }

    /// Keys are delivered one per tick, `None` entries mean no key that tick.
    /// With `open_ticks` set, the window reports closed after that many frames.
    struct FakeDisplay {
        keys: VecDeque<Option<char>>,
        open_ticks: Option<usize>,
        tally: Rc<Tally>,
    }

    impl DisplayPort for FakeDisplay {
        fn show(&mut self, _frame: &Frame) -> DomainResult<()> {
            self.tally.frames_shown.set(self.tally.frames_shown.get() + 1);
            Ok(())
        }

        fn poll_key(&mut self) -> Option<char> {
            self.keys.pop_front().flatten()
        }

        fn is_open(&self) -> bool {
            self.open_ticks.map_or(true, |n| self.tally.frames_shown.get() < n)
        }

        fn close(&mut self) {
            self.tally.display_closed.set(self.tally.display_closed.get() + 1);
        }
    }

    struct FakeConsole {
        replies: VecDeque<PromptReply>,
        tally: Rc<Tally>,
    }

    impl PromptPort for FakeConsole {
        fn ask(&mut self, _context: &[String], _question: &str) -> PromptReply {
            self.tally.prompts.set(self.tally.prompts.get() + 1);
            self.replies.pop_front().unwrap_or(PromptReply::Cancelled)
        }

        fn notice(&mut self, message: &str) {
            self.tally.notices.borrow_mut().push(message.to_string());
        }
    }

    struct FakeStore(Rc<Tally>);

    impl ConfigStorePort for FakeStore {
        fn load(&self) -> DomainResult<Option<ConfigFile>> {
            Ok(None)
        }

        fn save(&self, file: &ConfigFile) -> DomainResult<()> {
            self.0.saved.borrow_mut().push(file.clone());
            Ok(())
        }
    }

    struct FakeLog {
        tally: Rc<Tally>,
        fail: bool,
    }

    impl DetectionLogPort for FakeLog {
        fn append(&mut self, detections: &[Detection]) -> DomainResult<()> {
            if self.fail {
                return Err(DomainError::OperationFailed("disk full".into()));
            }
            self.tally.logged.borrow_mut().extend_from_slice(detections);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingAlerts {
        seen: Mutex<Vec<Alert>>,
    }

    #[async_trait]
    impl AlertPort for CountingAlerts {
        async fn present(&self, alert: &Alert) -> DomainResult<()> {
            self.seen.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    struct Harness {
        tally: Rc<Tally>,
        detect_calls: Rc<Cell<usize>>,
        alerts: Arc<CountingAlerts>,
        interrupted: Arc<AtomicBool>,
        detector_fails: Cell<bool>,
        display_open_ticks: Cell<Option<usize>>,
        runtime: tokio::runtime::Runtime,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                tally: Rc::new(Tally::default()),
                detect_calls: Rc::new(Cell::new(0)),
                alerts: Arc::new(CountingAlerts::default()),
                interrupted: Arc::new(AtomicBool::new(false)),
                detector_fails: Cell::new(false),
                display_open_ticks: Cell::new(None),
                runtime: tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(1)
                    .enable_all()
                    .build()
                    .unwrap(),
            }
        }

        fn session(
            &self,
            config: DetectorConfig,
            frames: usize,
            keys: Vec<Option<char>>,
            replies: Vec<PromptReply>,
            detections: Vec<RawDetection>,
            log_fails: bool,
        ) -> SessionLoop {
            let ports = SessionPorts {
                source: Box::new(FakeSource { remaining: frames, tally: self.tally.clone() }),
                detector: Box::new(FakeDetector {
                    labels: vec!["person".into(), "dog".into()],
                    per_frame: detections,
                    calls: self.detect_calls.clone(),
                    fail: self.detector_fails.get(),
                }),
                display: Box::new(FakeDisplay {
                    keys: keys.into(),
                    open_ticks: self.display_open_ticks.get(),
                    tally: self.tally.clone(),
                }),
                console: Box::new(FakeConsole { replies: replies.into(), tally: self.tally.clone() }),
                store: Box::new(FakeStore(self.tally.clone())),
                detection_log: Box::new(FakeLog { tally: self.tally.clone(), fail: log_fails }),
            };
            let notifier =
                Notifier::spawn(self.alerts.clone(), Duration::from_secs(5), self.runtime.handle());
            SessionLoop::new(config, ports, notifier, self.interrupted.clone())
        }

        fn alert_count(&self) -> usize {
            std::thread::sleep(Duration::from_millis(50));
            self.alerts.seen.lock().unwrap().len()
        }
    }

    fn person(conf: f32) -> RawDetection {
        RawDetection { class_id: 0, confidence: conf, bbox: [5.0, 5.0, 50.0, 100.0] }
    }

    fn dog(conf: f32) -> RawDetection {
        RawDetection { class_id: 1, confidence: conf, bbox: [60.0, 5.0, 120.0, 100.0] }
    }

    #[test]
    fn single_tick_scenario_updates_stats() {
        let h = Harness::new();
        let session = h.session(
            DetectorConfig::default(),
            1,
            vec![Some('q')],
            vec![],
            vec![person(0.6), dog(0.9)],
            false,
        );
        let report = session.run();

        assert_eq!(report.outcome, SessionOutcome::Quit);
        assert_eq!(report.stats.total(), 2);
        assert_eq!(report.stats.target(), 1);
        assert_eq!(h.alert_count(), 1);
    }

    #[test]
    fn source_exhaustion_releases_resources_once() {
        let h = Harness::new();
        let report = h.session(DetectorConfig::default(), 3, vec![], vec![], vec![], false).run();

        assert!(matches!(report.outcome, SessionOutcome::SourceFailed(_)));
        assert!(!report.outcome.is_success());
        assert_eq!(h.tally.frames_read.get(), 3);
        assert_eq!(h.tally.frames_shown.get(), 3);
        assert_eq!(h.tally.source_closed.get(), 1);
        assert_eq!(h.tally.display_closed.get(), 1);
        assert!(h.tally.notices.borrow().iter().any(|n| n.starts_with("Detection stats:")));
    }

    #[test]
    fn paused_ticks_drain_frames_without_inference() {
        let h = Harness::new();
        // pause on the first tick, stay paused for two more, then quit
        let report = h
            .session(
                DetectorConfig::default(),
                10,
                vec![Some(' '), None, None, Some('q')],
                vec![],
                vec![person(0.9)],
                false,
            )
            .run();

        assert_eq!(report.outcome, SessionOutcome::Quit);
        assert_eq!(h.tally.frames_read.get(), 4);
        assert_eq!(h.detect_calls.get(), 1);
        assert_eq!(report.stats.total(), 1);
    }

    #[test]
    fn person_every_tick_alerts_once_per_cooldown() {
        let h = Harness::new();
        let start = Instant::now();
        let tick = Rc::new(Cell::new(0u64));
        let clock_tick = tick.clone();
        // each call advances 2 seconds: fires at 0s, 6s, 12s over 7 ticks
        let clock = move || {
            // real time for the dispatcher to drain its single slot
            std::thread::sleep(Duration::from_millis(20));
            let n = clock_tick.get();
            clock_tick.set(n + 1);
            start + Duration::from_secs(2 * n)
        };

        let report = h
            .session(DetectorConfig::default(), 7, vec![], vec![], vec![person(0.9), person(0.8)], false)
            .with_clock(clock)
            .run();

        assert_eq!(tick.get(), 7);
        assert_eq!(report.stats.target(), 14);
        assert_eq!(h.alert_count(), 3);
    }

    #[test]
    fn prompts_edit_config_between_ticks() {
        let h = Harness::new();
        let report = h
            .session(
                DetectorConfig::default(),
                10,
                vec![Some('c'), Some('t'), Some('q')],
                vec![PromptReply::Text("1.5".into()), PromptReply::Text("Cat, DOG".into())],
                vec![],
                false,
            )
            .run();

        assert_eq!(h.tally.prompts.get(), 2);
        assert_eq!(h.tally.frames_read.get(), 3);
        assert_eq!(report.config.confidence_threshold(), 0.5);
        assert_eq!(report.config.target_classes(), ["cat", "dog"]);
        let notices = h.tally.notices.borrow();
        assert!(notices.iter().any(|n| n == "Confidence must be between 0.0 and 1.0"));
    }

    #[test]
    fn detections_are_logged_when_enabled() {
        let h = Harness::new();
        let mut config = DetectorConfig::default();
        config.save_detections = true;
        h.session(config, 2, vec![], vec![], vec![person(0.9), dog(0.7), dog(0.1)], false).run();

        let logged = h.tally.logged.borrow();
        assert_eq!(logged.len(), 4);
        assert_eq!(logged[1].label, "dog");
    }

    #[test]
    fn log_failures_do_not_stop_the_session() {
        let h = Harness::new();
        let mut config = DetectorConfig::default();
        config.save_detections = true;
        let report = h
            .session(config, 3, vec![None, None, Some('q')], vec![], vec![person(0.9)], true)
            .run();
        assert_eq!(report.outcome, SessionOutcome::Quit);
        assert_eq!(report.stats.total(), 3);
    }

    #[test]
    fn save_key_persists_config() {
        let h = Harness::new();
        h.session(DetectorConfig::default(), 5, vec![Some('s'), Some('q')], vec![], vec![], false)
            .run();
        assert_eq!(h.tally.saved.borrow().len(), 1);
    }

    #[test]
    fn interrupt_takes_the_clean_shutdown_path() {
        let h = Harness::new();
        h.interrupted.store(true, Ordering::SeqCst);
        let report = h.session(DetectorConfig::default(), 5, vec![], vec![], vec![], false).run();

        assert_eq!(report.outcome, SessionOutcome::Interrupted);
        assert!(report.outcome.is_success());
        assert_eq!(h.tally.frames_read.get(), 0);
        assert_eq!(h.tally.source_closed.get(), 1);
        assert_eq!(h.tally.display_closed.get(), 1);
    }

    #[test]
    fn inference_errors_count_as_empty_ticks() {
        let h = Harness::new();
        h.detector_fails.set(true);
        let mut config = DetectorConfig::default();
        config.save_detections = true;
        let report = h
            .session(config, 5, vec![None, None, Some('q')], vec![], vec![person(0.9)], false)
            .run();

        assert_eq!(report.outcome, SessionOutcome::Quit);
        assert_eq!(h.detect_calls.get(), 3);
        assert_eq!(h.tally.frames_shown.get(), 3);
        assert_eq!(report.stats.total(), 0);
        assert_eq!(report.stats.target(), 0);
        assert!(h.tally.logged.borrow().is_empty());
        assert_eq!(h.alert_count(), 0);
    }

    #[test]
    fn closed_window_ends_session_successfully() {
        let h = Harness::new();
        h.display_open_ticks.set(Some(2));
        let report = h.session(DetectorConfig::default(), 10, vec![], vec![], vec![], false).run();

        assert_eq!(report.outcome, SessionOutcome::WindowClosed);
        assert!(report.outcome.is_success());
        assert_eq!(h.tally.frames_read.get(), 2);
        assert_eq!(h.tally.source_closed.get(), 1);
        assert_eq!(h.tally.display_closed.get(), 1);
    }
}
