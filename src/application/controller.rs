use tracing::{info, warn};

use crate::application::dto::ConfigFile;
use crate::application::ports::{ConfigStorePort, PromptPort, PromptReply};
use crate::domain::{
    config::{parse_class_list, DetectorConfig},
    interaction::{control_for_key, Control, InteractionState, Mode, PromptKind},
};

/// What the session loop must do after a key was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Continue,
    Quit,
    /// The controller entered `Mode::AwaitingInput`; the loop must complete
    /// the prompt before consuming another frame.
    Prompt(PromptKind),
}

/// Diagnostic produced when a prompt completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptResult {
    pub changed: bool,
    pub message: String,
}

impl PromptResult {
    fn kept(message: impl Into<String>) -> Self {
        Self { changed: false, message: message.into() }
    }

    fn changed(message: impl Into<String>) -> Self {
        Self { changed: true, message: message.into() }
    }
}

/// Ports the controller talks to while handling a key.
pub struct ControllerIo<'a> {
    pub store: &'a dyn ConfigStorePort,
    pub console: &'a mut dyn PromptPort,
}

pub struct InteractionController {
    state: InteractionState,
    mode: Mode,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self { state: InteractionState::default(), mode: Mode::Live }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn handle_key(
        &mut self,
        key: char,
        config: &DetectorConfig,
        io: &mut ControllerIo<'_>,
    ) -> Transition {
        if let Mode::AwaitingInput(kind) = self.mode {
            // keys typed into the video window while a prompt is open are ignored
            return Transition::Prompt(kind);
        }
        let Some(control) = control_for_key(key) else {
            return Transition::Continue;
        };

        match control {
            Control::Quit => Transition::Quit,
            Control::TogglePause => {
                self.state.paused = !self.state.paused;
                let msg = if self.state.paused { "Paused" } else { "Resumed" };
                info!("{}", msg);
                io.console.notice(msg);
                Transition::Continue
            }
            Control::ToggleHelp => {
                self.state.help_visible = !self.state.help_visible;
                Transition::Continue
            }
            Control::EditConfidence => self.enter_prompt(PromptKind::Confidence),
            Control::EditTargets => self.enter_prompt(PromptKind::Targets),
            Control::SaveConfig => {
                match io.store.save(&ConfigFile::from(config)) {
                    Ok(()) => {
                        info!("Configuration saved");
                        io.console.notice("Configuration saved!");
                    }
                    Err(e) => {
                        warn!("Error saving config: {}", e);
                        io.console.notice(&format!("Error saving config: {e}"));
                    }
                }
                Transition::Continue
            }
        }
    }

    fn enter_prompt(&mut self, kind: PromptKind) -> Transition {
        self.mode = Mode::AwaitingInput(kind);
        Transition::Prompt(kind)
    }

    /// Context lines and question shown for the pending prompt.
    pub fn prompt_text(
        &self,
        kind: PromptKind,
        config: &DetectorConfig,
        labels: &[String],
    ) -> (Vec<String>, &'static str) {
        let hint = "(Type in the console window, not the video window)".to_string();
        match kind {
            PromptKind::Confidence => (
                vec![
                    String::new(),
                    format!("Current confidence threshold: {}", config.confidence_threshold()),
                    "Enter new confidence threshold (0.0-1.0) or press Enter to keep current:".into(),
                    hint,
                ],
                "Confidence (0.0-1.0): ",
            ),
            PromptKind::Targets => (
                vec![
                    String::new(),
                    format!("Current targets: {:?}", config.target_classes()),
                    format!(
                        "Available classes: {:?} ...",
                        labels.iter().take(10).collect::<Vec<_>>()
                    ),
                    "Enter new target classes (comma-separated) or press Enter to keep current:"
                        .into(),
                    hint,
                ],
                "Target classes: ",
            ),
        }
    }

    /// Applies the operator's reply and returns to `Mode::Live`. Invalid or
    /// cancelled input keeps the previous value.
    pub fn complete_prompt(&mut self, reply: PromptReply, config: &mut DetectorConfig) -> PromptResult {
        let Mode::AwaitingInput(kind) = self.mode else {
            return PromptResult::kept("No prompt pending");
        };
        self.mode = Mode::Live;

        let result = match kind {
            PromptKind::Confidence => apply_confidence(reply, config),
            PromptKind::Targets => apply_targets(reply, config),
        };
        if result.changed {
            info!("{}", result.message);
        } else {
            warn!("{}", result.message);
        }
        result
    }

    /// Runs the pending prompt to completion on the console side channel.
    pub fn run_prompt(
        &mut self,
        config: &mut DetectorConfig,
        labels: &[String],
        console: &mut dyn PromptPort,
    ) -> PromptResult {
        let Mode::AwaitingInput(kind) = self.mode else {
            return PromptResult::kept("No prompt pending");
        };
        let (context, question) = self.prompt_text(kind, config, labels);
        let reply = console.ask(&context, question);
        let result = self.complete_prompt(reply, config);
        console.notice(&result.message);
        console.notice("Settings updated! Video continues...");
        result
    }
}

fn apply_confidence(reply: PromptReply, config: &mut DetectorConfig) -> PromptResult {
    let text = match reply {
        PromptReply::Cancelled => {
            return PromptResult::kept("Input cancelled, keeping current confidence threshold")
        }
        PromptReply::Text(t) => t,
    };
    let text = text.trim();
    if text.is_empty() {
        return PromptResult::kept("Keeping current confidence threshold");
    }
    let Ok(value) = text.parse::<f32>() else {
        return PromptResult::kept("Invalid input, keeping current confidence threshold");
    };
    match config.set_confidence_threshold(value) {
        Ok(()) => PromptResult::changed(format!("Confidence threshold set to {value}")),
        Err(_) => PromptResult::kept("Confidence must be between 0.0 and 1.0"),
    }
}

fn apply_targets(reply: PromptReply, config: &mut DetectorConfig) -> PromptResult {
    let text = match reply {
        PromptReply::Cancelled => return PromptResult::kept("Input cancelled, keeping current targets"),
        PromptReply::Text(t) => t,
    };
    let classes = parse_class_list(&text);
    if classes.is_empty() {
        return PromptResult::kept("Keeping current targets");
    }
    let set = config.set_target_classes(classes);
    PromptResult::changed(format!("Target classes set to: {:?}", set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{DomainError, DomainResult};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct MemoryStore {
        saved: RefCell<Vec<ConfigFile>>,
        fail: bool,
    }

    impl ConfigStorePort for MemoryStore {
        fn load(&self) -> DomainResult<Option<ConfigFile>> {
            Ok(self.saved.borrow().last().cloned())
        }

        fn save(&self, file: &ConfigFile) -> DomainResult<()> {
            if self.fail {
                return Err(DomainError::OperationFailed("read-only".into()));
            }
            self.saved.borrow_mut().push(file.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct ScriptedConsole {
        replies: VecDeque<PromptReply>,
        notices: Vec<String>,
        questions: Vec<String>,
    }

    impl PromptPort for ScriptedConsole {
        fn ask(&mut self, _context: &[String], question: &str) -> PromptReply {
            self.questions.push(question.to_string());
            self.replies.pop_front().unwrap_or(PromptReply::Cancelled)
        }

        fn notice(&mut self, message: &str) {
            self.notices.push(message.to_string());
        }
    }

    fn edit(key: char, reply: PromptReply, config: &mut DetectorConfig) -> (PromptResult, ScriptedConsole) {
        let store = MemoryStore::default();
        let mut console = ScriptedConsole { replies: VecDeque::from([reply]), ..Default::default() };
        let mut ctl = InteractionController::new();
        let t = ctl.handle_key(key, config, &mut ControllerIo { store: &store, console: &mut console });
        assert!(matches!(t, Transition::Prompt(_)));
        assert!(matches!(ctl.mode(), Mode::AwaitingInput(_)));
        let labels = vec!["person".to_string(), "car".to_string()];
        let result = ctl.run_prompt(config, &labels, &mut console);
        assert_eq!(ctl.mode(), Mode::Live);
        (result, console)
    }

    #[test]
    fn toggles_flip_independently() {
        let store = MemoryStore::default();
        let mut console = ScriptedConsole::default();
        let cfg = DetectorConfig::default();
        let mut ctl = InteractionController::new();
        let mut io = ControllerIo { store: &store, console: &mut console };

        assert_eq!(ctl.handle_key(' ', &cfg, &mut io), Transition::Continue);
        assert!(ctl.state().paused && ctl.state().help_visible);
        assert_eq!(ctl.handle_key('h', &cfg, &mut io), Transition::Continue);
        assert!(ctl.state().paused && !ctl.state().help_visible);
        ctl.handle_key(' ', &cfg, &mut io);
        assert!(!ctl.state().paused && !ctl.state().help_visible);
        assert_eq!(console.notices, vec!["Paused", "Resumed"]);
    }

    #[test]
    fn quit_and_unknown_keys() {
        let store = MemoryStore::default();
        let mut console = ScriptedConsole::default();
        let cfg = DetectorConfig::default();
        let mut ctl = InteractionController::new();
        let mut io = ControllerIo { store: &store, console: &mut console };

        assert_eq!(ctl.handle_key('z', &cfg, &mut io), Transition::Continue);
        assert_eq!(ctl.state(), InteractionState::default());
        assert_eq!(ctl.handle_key('Q', &cfg, &mut io), Transition::Quit);
    }

    #[test]
    fn edit_targets_normalizes_input() {
        let mut cfg = DetectorConfig::default();
        let (result, console) = edit('t', PromptReply::Text("Cat, DOG".into()), &mut cfg);
        assert!(result.changed);
        assert_eq!(cfg.target_classes(), ["cat", "dog"]);
        assert_eq!(console.questions, vec!["Target classes: "]);
    }

    #[test]
    fn empty_target_input_keeps_set() {
        let mut cfg = DetectorConfig::default();
        let (result, _) = edit('t', PromptReply::Text("  , ".into()), &mut cfg);
        assert!(!result.changed);
        assert_eq!(cfg.target_classes(), ["person"]);

        let (result, _) = edit('t', PromptReply::Cancelled, &mut cfg);
        assert!(!result.changed);
        assert_eq!(cfg.target_classes(), ["person"]);
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let mut cfg = DetectorConfig::default();
        let (result, console) = edit('c', PromptReply::Text("1.5".into()), &mut cfg);
        assert!(!result.changed);
        assert_eq!(result.message, "Confidence must be between 0.0 and 1.0");
        assert_eq!(cfg.confidence_threshold(), 0.5);
        assert!(console.notices.contains(&"Confidence must be between 0.0 and 1.0".to_string()));
    }

    #[test]
    fn confidence_edits() {
        let mut cfg = DetectorConfig::default();
        let (r, _) = edit('c', PromptReply::Text("abc".into()), &mut cfg);
        assert!(!r.changed);
        let (r, _) = edit('c', PromptReply::Text("".into()), &mut cfg);
        assert!(!r.changed);
        let (r, _) = edit('c', PromptReply::Cancelled, &mut cfg);
        assert!(!r.changed);
        assert_eq!(cfg.confidence_threshold(), 0.5);

        let (r, _) = edit('c', PromptReply::Text(" 0.75 ".into()), &mut cfg);
        assert!(r.changed);
        assert_eq!(cfg.confidence_threshold(), 0.75);
    }

    #[test]
    fn keys_are_ignored_while_awaiting_input() {
        let store = MemoryStore::default();
        let mut console = ScriptedConsole::default();
        let cfg = DetectorConfig::default();
        let mut ctl = InteractionController::new();
        let mut io = ControllerIo { store: &store, console: &mut console };

        assert_eq!(ctl.handle_key('c', &cfg, &mut io), Transition::Prompt(PromptKind::Confidence));
        assert_eq!(ctl.handle_key('q', &cfg, &mut io), Transition::Prompt(PromptKind::Confidence));
        assert_eq!(ctl.handle_key(' ', &cfg, &mut io), Transition::Prompt(PromptKind::Confidence));
        assert!(!ctl.state().paused);
    }

    #[test]
    fn save_persists_current_config() {
        let store = MemoryStore::default();
        let mut console = ScriptedConsole::default();
        let mut cfg = DetectorConfig::default();
        cfg.set_target_classes(["car"]);
        let mut ctl = InteractionController::new();

        ctl.handle_key('s', &cfg, &mut ControllerIo { store: &store, console: &mut console });
        assert_eq!(store.saved.borrow().len(), 1);
        assert_eq!(store.saved.borrow()[0].target_classes, vec!["car"]);
        assert_eq!(console.notices, vec!["Configuration saved!"]);
    }

    #[test]
    fn save_failure_is_reported_not_fatal() {
        let store = MemoryStore { fail: true, ..Default::default() };
        let mut console = ScriptedConsole::default();
        let cfg = DetectorConfig::default();
        let mut ctl = InteractionController::new();

        let t = ctl.handle_key('s', &cfg, &mut ControllerIo { store: &store, console: &mut console });
        assert_eq!(t, Transition::Continue);
        assert!(console.notices[0].starts_with("Error saving config"));
    }
}
