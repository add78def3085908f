use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub exit: KeyEvent,
    pub submit: KeyEvent,
    pub next_view: KeyEvent,
    pub prev_view: KeyEvent,
    pub suggestion_up: KeyEvent,
    pub suggestion_down: KeyEvent,
    pub use_suggestion: KeyEvent,
    pub reset: KeyEvent,
    pub clear_input: KeyEvent,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct KeyBindingsFile {
    exit: Option<String>,
    submit: Option<String>,
    next_view: Option<String>,
    prev_view: Option<String>,
    suggestion_up: Option<String>,
    suggestion_down: Option<String>,
    use_suggestion: Option<String>,
    reset: Option<String>,
    clear_input: Option<String>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            exit: KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            submit: KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE),
            next_view: KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE),
            prev_view: KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT),
            suggestion_up: KeyEvent::new(KeyCode::Up, KeyModifiers::NONE),
            suggestion_down: KeyEvent::new(KeyCode::Down, KeyModifiers::NONE),
            use_suggestion: KeyEvent::new(KeyCode::Char('o'), KeyModifiers::CONTROL),
            reset: KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL),
            clear_input: KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE),
        }
    }
}

impl KeyBindings {
    fn apply_overrides(mut self, raw: KeyBindingsFile) -> Result<Self> {
        let slots = [
            (raw.exit, &mut self.exit),
            (raw.submit, &mut self.submit),
            (raw.next_view, &mut self.next_view),
            (raw.prev_view, &mut self.prev_view),
            (raw.suggestion_up, &mut self.suggestion_up),
            (raw.suggestion_down, &mut self.suggestion_down),
            (raw.use_suggestion, &mut self.use_suggestion),
            (raw.reset, &mut self.reset),
            (raw.clear_input, &mut self.clear_input),
        ];
        for (value, slot) in slots {
            if let Some(value) = value {
                *slot = parse_key_event(&value)?;
            }
        }
        Ok(self)
    }
}

pub fn load_keybindings(path: &Path) -> Result<KeyBindings> {
    let raw = fs::read_to_string(path)?;
    let parsed: KeyBindingsFile = serde_json::from_str(&raw)?;
    KeyBindings::default().apply_overrides(parsed)
}

/// Parses bindings such as `ctrl+o`, `shift+backtab` or `enter`.
pub fn parse_key_event(value: &str) -> Result<KeyEvent> {
    let mut modifiers = KeyModifiers::NONE;
    let mut key_code: Option<KeyCode> = None;
    for token in value
        .split('+')
        .map(str::trim)
        .filter(|part| !part.is_empty())
    {
        let normalized = token.to_ascii_lowercase();
        match normalized.as_str() {
            "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
            "shift" => modifiers |= KeyModifiers::SHIFT,
            "alt" | "option" => modifiers |= KeyModifiers::ALT,
            other => {
                key_code = Some(
                    parse_key_code(other)
                        .ok_or_else(|| anyhow::anyhow!("unsupported keybinding token: {token}"))?,
                );
            }
        }
    }
    let code = key_code.ok_or_else(|| anyhow::anyhow!("missing key code in keybinding"))?;
    Ok(KeyEvent::new(code, modifiers))
}

fn parse_key_code(value: &str) -> Option<KeyCode> {
    match value {
        "enter" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "backtab" => Some(KeyCode::BackTab),
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "backspace" => Some(KeyCode::Backspace),
        "space" => Some(KeyCode::Char(' ')),
        value if value.chars().count() == 1 => value.chars().next().map(KeyCode::Char),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_documented_keys() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.submit.code, KeyCode::Enter);
        assert_eq!(bindings.next_view.code, KeyCode::Tab);
        assert_eq!(bindings.use_suggestion.code, KeyCode::Char('o'));
        assert_eq!(bindings.use_suggestion.modifiers, KeyModifiers::CONTROL);
        assert_eq!(bindings.reset.code, KeyCode::Char('l'));
        assert_eq!(bindings.exit.modifiers, KeyModifiers::CONTROL);
    }

    #[test]
    fn parses_modifier_combinations() {
        let key = parse_key_event("Ctrl+Alt+k").expect("parse");
        assert_eq!(key.code, KeyCode::Char('k'));
        assert_eq!(key.modifiers, KeyModifiers::CONTROL | KeyModifiers::ALT);
        assert_eq!(parse_key_event("enter").expect("parse").code, KeyCode::Enter);
        assert!(parse_key_event("ctrl+").is_err());
        assert!(parse_key_event("hyper+x").is_err());
    }

    #[test]
    fn overrides_only_named_bindings() {
        let raw = KeyBindingsFile {
            use_suggestion: Some("ctrl+u".to_string()),
            ..Default::default()
        };
        let bindings = KeyBindings::default()
            .apply_overrides(raw)
            .expect("overrides");
        assert_eq!(bindings.use_suggestion.code, KeyCode::Char('u'));
        assert_eq!(bindings.submit.code, KeyCode::Enter);
    }

    #[test]
    fn loads_overrides_from_json_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("keybindings.json");
        fs::write(&path, r#"{"reset":"ctrl+r","next_view":"right"}"#).expect("write");
        let bindings = load_keybindings(&path).expect("load");
        assert_eq!(bindings.reset.code, KeyCode::Char('r'));
        assert_eq!(bindings.next_view.code, KeyCode::Right);
    }
}
