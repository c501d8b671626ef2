/// Operator-visible toggles. Paused and help are independent of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionState {
    pub paused: bool,
    pub help_visible: bool,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self { paused: false, help_visible: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Quit,
    TogglePause,
    ToggleHelp,
    EditConfidence,
    EditTargets,
    SaveConfig,
}

/// Which value a pending side-channel prompt is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Confidence,
    Targets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Live,
    /// Frame consumption is suspended until the prompt completes.
    AwaitingInput(PromptKind),
}

pub struct KeyBinding {
    pub key: char,
    pub key_label: &'static str,
    pub control: Control,
    pub description: &'static str,
}

/// Single source for both key dispatch and the help panel text.
pub const KEY_BINDINGS: &[KeyBinding] = &[
    KeyBinding { key: ' ', key_label: "SPACE", control: Control::TogglePause, description: "Pause/Resume" },
    KeyBinding { key: 'h', key_label: "H", control: Control::ToggleHelp, description: "Toggle Help" },
    KeyBinding { key: 'c', key_label: "C", control: Control::EditConfidence, description: "Change Confidence" },
    KeyBinding { key: 't', key_label: "T", control: Control::EditTargets, description: "Change Target" },
    KeyBinding { key: 's', key_label: "S", control: Control::SaveConfig, description: "Save Config" },
    KeyBinding { key: 'q', key_label: "Q", control: Control::Quit, description: "Quit" },
];

impl KeyBinding {
    pub fn help_line(&self) -> String {
        format!("{}: {}", self.key_label, self.description)
    }
}

pub fn control_for_key(key: char) -> Option<Control> {
    let key = key.to_ascii_lowercase();
    KEY_BINDINGS.iter().find(|b| b.key == key).map(|b| b.control)
}

pub fn help_lines() -> Vec<String> {
    KEY_BINDINGS.iter().map(KeyBinding::help_line).collect()
}
