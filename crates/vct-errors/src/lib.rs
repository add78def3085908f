//! Error taxonomy for the generation gateway and user-facing error reports.
//!
//! Gateway failures are typed so the log can tell transport problems from
//! decode problems; the transcript only ever shows [`FAILURE_MESSAGE`].

use anyhow::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The single assistant-visible text used for every failed request.
pub const FAILURE_MESSAGE: &str = "Sorry, an error occurred.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "reason", content = "status")]
pub enum TransportReason {
    Timeout,
    Dns,
    Connect,
    /// Non-2xx HTTP status.
    Status(u16),
    Other,
}

impl fmt::Display for TransportReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("request timed out"),
            Self::Dns => f.write_str("DNS resolution failed"),
            Self::Connect => f.write_str("connection refused"),
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::Other => f.write_str("network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("transport failure ({reason}): {detail}")]
    Transport {
        reason: TransportReason,
        detail: String,
    },
    #[error("decode failure: {detail}")]
    Decode { detail: String },
}

impl GatewayError {
    pub fn transport(reason: TransportReason, detail: impl Into<String>) -> Self {
        Self::Transport {
            reason,
            detail: detail.into(),
        }
    }

    pub fn decode(detail: impl Into<String>) -> Self {
        Self::Decode {
            detail: detail.into(),
        }
    }

    /// Short machine-readable label used in log records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyPrompt => "empty_prompt",
            Self::Transport { .. } => "transport",
            Self::Decode { .. } => "decode",
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    pub fn to_enhanced(&self, endpoint: &str) -> EnhancedError {
        match self {
            Self::EmptyPrompt => EnhancedError::new(
                "Empty Prompt",
                "Type a request or pick one of the predefined prompts.",
                ErrorType::Validation,
            ),
            Self::Transport { reason, detail } => {
                let mut enhanced =
                    EnhancedError::new("Generation Service Unreachable", detail, ErrorType::Network)
                        .with_context(format!("endpoint: {endpoint} ({reason})"));
                enhanced = match reason {
                    TransportReason::Timeout => enhanced.with_suggestions(vec![
                        "The service did not answer in time; try again".to_string(),
                        "Raise gateway.timeout_seconds or pass --timeout".to_string(),
                    ]),
                    TransportReason::Status(code) if *code >= 500 => {
                        enhanced.with_suggestion("The service failed internally; check its logs")
                    }
                    TransportReason::Status(_) => enhanced
                        .with_suggestion("Check that the endpoint accepts POST {\"prompt\": ...}"),
                    _ => enhanced.with_suggestions(vec![
                        "Start the team generation service".to_string(),
                        "Set gateway.endpoint_url or VCT_COMPOSER_ENDPOINT".to_string(),
                    ]),
                };
                enhanced
            }
            Self::Decode { detail } => {
                EnhancedError::new("Unexpected Service Response", detail, ErrorType::Runtime)
                    .with_context(format!("endpoint: {endpoint}"))
                    .with_suggestion(
                        "The response must carry team, strategy, strengths, weaknesses and igl",
                    )
            }
        }
    }
}

/// Error with a user-friendly message and recovery suggestions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedError {
    pub title: String,
    pub message: String,
    pub suggestions: Vec<String>,
    pub error_type: ErrorType,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorType {
    /// Missing or invalid settings.
    Configuration,
    /// Timeout, connection, non-2xx.
    Network,
    /// Response decoding, terminal failures.
    Runtime,
    /// Invalid input.
    Validation,
    Unknown,
}

impl EnhancedError {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        error_type: ErrorType,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            suggestions: Vec::new(),
            error_type,
            context: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions.extend(suggestions);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn into_error(self) -> Error {
        Error::new(self)
    }

    pub fn format(&self, verbose: bool) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}: {}\n", self.error_type.label(), self.title));
        output.push_str(&format!("  {}\n", self.message));

        if verbose && let Some(context) = &self.context {
            output.push_str(&format!("\n  Context: {context}\n"));
        }

        if !self.suggestions.is_empty() {
            output.push_str("\n  Suggestions:\n");
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("    {}. {}\n", i + 1, suggestion));
            }
        }
        output
    }
}

impl ErrorType {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorType::Configuration => "config",
            ErrorType::Network => "network",
            ErrorType::Runtime => "runtime",
            ErrorType::Validation => "input",
            ErrorType::Unknown => "error",
        }
    }
}

impl fmt::Display for EnhancedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

impl std::error::Error for EnhancedError {}

/// Turns any top-level `anyhow::Error` into a printable report.
pub struct ErrorHandler {
    verbose: bool,
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorHandler {
    pub fn new() -> Self {
        Self { verbose: false }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn handle(&self, error: &Error) -> String {
        if let Some(enhanced) = error.downcast_ref::<EnhancedError>() {
            return enhanced.format(self.verbose);
        }
        let mut enhanced = self.classify_error(&error.to_string());
        if self.verbose {
            let chain = error
                .chain()
                .skip(1)
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            if !chain.is_empty() {
                enhanced = enhanced.with_context(chain.join(": "));
            }
        }
        enhanced.format(self.verbose)
    }

    fn classify_error(&self, error_message: &str) -> EnhancedError {
        let lower = error_message.to_lowercase();

        if lower.contains("settings") || lower.contains("config") || lower.contains("toml") {
            return EnhancedError::new(
                "Configuration Error",
                error_message,
                ErrorType::Configuration,
            )
            .with_suggestions(vec![
                "Check .vct-composer/settings.json".to_string(),
                "Run `vct-composer config init` to write defaults".to_string(),
            ]);
        }

        if lower.contains("terminal") || lower.contains("tty") {
            return EnhancedError::new("Terminal Error", error_message, ErrorType::Runtime)
                .with_suggestion("Use `vct-composer ask <PROMPT>` outside an interactive terminal");
        }

        EnhancedError::new("Error", error_message, ErrorType::Unknown)
    }
}
