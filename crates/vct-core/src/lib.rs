use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub type Result<T> = anyhow::Result<T>;

pub const APP_DIR_NAME: &str = ".vct-composer";
pub const DEFAULT_ENDPOINT_URL: &str = "http://localhost:5000/generate_team";
pub const ENDPOINT_ENV: &str = "VCT_COMPOSER_ENDPOINT";

pub fn runtime_dir(workspace: &Path) -> PathBuf {
    workspace.join(APP_DIR_NAME)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())
        .map(PathBuf::from)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transcript message. Turns are only ever handed out by shared
/// reference once they are in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterEntry {
    pub name: String,
    pub role: String,
    pub agent: String,
    pub region: String,
    pub league: String,
}

/// Structured roster-and-strategy snapshot produced by the generation service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamResult {
    pub team: Vec<RosterEntry>,
    pub strategy: String,
    pub strengths: String,
    pub weaknesses: String,
    pub igl: String,
}

impl TeamResult {
    /// Compact JSON used as the assistant turn in the transcript.
    pub fn transcript_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{} players", self.team.len()))
    }

    /// Paths of required text fields that are empty or whitespace-only.
    pub fn blank_fields(&self) -> Vec<String> {
        let mut blank = Vec::new();
        for (idx, entry) in self.team.iter().enumerate() {
            for (field, value) in [
                ("name", &entry.name),
                ("role", &entry.role),
                ("agent", &entry.agent),
                ("region", &entry.region),
                ("league", &entry.league),
            ] {
                if value.trim().is_empty() {
                    blank.push(format!("team[{idx}].{field}"));
                }
            }
        }
        for (field, value) in [
            ("strategy", &self.strategy),
            ("strengths", &self.strengths),
            ("weaknesses", &self.weaknesses),
            ("igl", &self.igl),
        ] {
            if value.trim().is_empty() {
                blank.push(field.to_string());
            }
        }
        blank
    }
}

/// Result sub-view shown in the tabbed result panel.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Players,
    Strategy,
}

impl View {
    pub const ALL: &'static [View] = &[View::Players, View::Strategy];

    pub fn label(self) -> &'static str {
        match self {
            Self::Players => "Players",
            Self::Strategy => "Strategy",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Players => 0,
            Self::Strategy => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn next(self) -> Self {
        match self {
            Self::Players => Self::Strategy,
            Self::Strategy => Self::Players,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    Pending,
}

pub fn is_valid_request_state_transition(from: RequestState, to: RequestState) -> bool {
    matches!(
        (from, to),
        (RequestState::Idle, RequestState::Pending) | (RequestState::Pending, RequestState::Idle)
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub seq_no: u64,
    pub at: DateTime<Utc>,
    pub session_id: Uuid,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum EventKind {
    TurnAppended {
        role: Role,
        chars: usize,
    },
    RequestStarted {
        ticket: u64,
        prompt: String,
    },
    RequestSettled {
        ticket: u64,
        success: bool,
        roster_size: Option<usize>,
        elapsed_ms: u64,
    },
    /// `kind` is `transport`, `decode` or `empty_prompt`.
    GatewayFailed {
        ticket: u64,
        kind: String,
        detail: String,
    },
    SubmitRejected {
        reason: String,
    },
    ViewSelected {
        view: View,
    },
    SessionReset {
        turns_cleared: usize,
    },
}

impl EventKind {
    pub fn category(&self) -> &'static str {
        match self {
            Self::TurnAppended { .. } => "conversation",
            Self::RequestStarted { .. }
            | Self::RequestSettled { .. }
            | Self::SubmitRejected { .. } => "request",
            Self::GatewayFailed { .. } => "gateway",
            Self::ViewSelected { .. } => "view",
            Self::SessionReset { .. } => "session",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::GatewayFailed { .. } | Self::RequestSettled { success: false, .. }
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub ui: UiConfig,
    pub theme: ThemeConfig,
}

impl AppConfig {
    pub fn user_settings_path() -> Option<PathBuf> {
        Some(home_dir()?.join(APP_DIR_NAME).join("settings.json"))
    }

    pub fn project_settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.json")
    }

    pub fn project_local_settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.local.json")
    }

    pub fn legacy_toml_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("config.toml")
    }

    pub fn keybindings_path() -> Option<PathBuf> {
        Some(home_dir()?.join(APP_DIR_NAME).join("keybindings.json"))
    }

    pub fn load(workspace: &Path) -> Result<Self> {
        let mut paths = Vec::new();
        if let Some(user) = Self::user_settings_path() {
            paths.push(user);
        }
        paths.push(Self::project_settings_path(workspace));
        paths.push(Self::project_local_settings_path(workspace));
        Self::load_layers(Some(&Self::legacy_toml_path(workspace)), &paths)
    }

    /// Merges the optional legacy TOML file and then each JSON layer, in
    /// order, over the defaults. Missing files are skipped.
    pub fn load_layers(legacy_toml: Option<&Path>, json_layers: &[PathBuf]) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;

        if let Some(legacy) = legacy_toml
            && legacy.exists()
        {
            let raw = fs::read_to_string(legacy)?;
            let legacy_cfg: AppConfig = toml::from_str(&raw)?;
            merge_json_value(&mut merged, &serde_json::to_value(legacy_cfg)?);
        }

        for path in json_layers {
            if !path.exists() {
                continue;
            }
            let raw = fs::read_to_string(path)?;
            let value: serde_json::Value = serde_json::from_str(&raw)?;
            merge_json_value(&mut merged, &value);
        }

        Ok(serde_json::from_value(merged)?)
    }

    pub fn save(&self, workspace: &Path) -> Result<()> {
        let path = Self::project_settings_path(workspace);
        fs::create_dir_all(
            path.parent()
                .ok_or_else(|| anyhow::anyhow!("invalid config path"))?,
        )?;
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

fn merge_json_value(base: &mut serde_json::Value, overlay: &serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_obj), serde_json::Value::Object(overlay_obj)) => {
            for (key, overlay_value) in overlay_obj {
                if let Some(base_value) = base_obj.get_mut(key) {
                    merge_json_value(base_value, overlay_value);
                } else {
                    base_obj.insert(key.clone(), overlay_value.clone());
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub endpoint_url: String,
    /// Environment variable that overrides `endpoint_url` when set.
    pub endpoint_env: String,
    pub timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            endpoint_env: ENDPOINT_ENV.to_string(),
            timeout_seconds: 30,
        }
    }
}

impl GatewayConfig {
    pub fn resolved_endpoint(&self) -> String {
        if !self.endpoint_env.trim().is_empty()
            && let Ok(value) = std::env::var(&self.endpoint_env)
            && !value.trim().is_empty()
        {
            return value.trim().to_string();
        }
        self.endpoint_url.clone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub reduced_motion: bool,
    /// Event-loop poll interval in milliseconds.
    pub tick_ms: u64,
    pub keybindings_path: Option<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            reduced_motion: false,
            tick_ms: 50,
            keybindings_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub primary: String,
    pub secondary: String,
    pub error: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            primary: "Cyan".to_string(),
            secondary: "Yellow".to_string(),
            error: "Red".to_string(),
        }
    }
}
