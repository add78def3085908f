use anyhow::Result;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use std::error::Error as StdError;
use std::thread;
use std::time::Duration;
use vct_core::{GatewayConfig, RosterEntry, TeamResult};
use vct_errors::{GatewayError, TransportReason};

/// Boundary to the team generation service: one prompt in, one snapshot out.
///
/// Implementations never panic on bad input or bad responses; every problem
/// becomes a [`GatewayError`].
pub trait TeamGateway: Send + Sync {
    fn generate(&self, prompt: &str) -> std::result::Result<TeamResult, GatewayError>;

    /// Human-readable target, used in status lines and error context.
    fn describe(&self) -> String;
}

/// `POST {endpoint}` with `{"prompt": ...}`, expecting a full team result.
#[derive(Debug, Clone)]
pub struct HttpTeamGateway {
    endpoint: String,
    client: Client,
}

impl HttpTeamGateway {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn from_config(cfg: &GatewayConfig) -> Result<Self> {
        Self::new(
            cfg.resolved_endpoint(),
            Duration::from_secs(cfg.timeout_seconds.max(1)),
        )
    }
}

impl TeamGateway for HttpTeamGateway {
    fn generate(&self, prompt: &str) -> std::result::Result<TeamResult, GatewayError> {
        if prompt.trim().is_empty() {
            return Err(GatewayError::EmptyPrompt);
        }
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&build_payload(prompt))
            .send()
            .map_err(|e| format_transport_error(&e))?;

        let status = resp.status();
        let body = resp.text().map_err(|e| format_transport_error(&e))?;
        if !status.is_success() {
            return Err(format_status_error(status.as_u16(), &body));
        }
        parse_team_payload(&body)
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}

pub fn build_payload(prompt: &str) -> Value {
    json!({ "prompt": prompt })
}

/// Decodes a 2xx body into a team result, rejecting missing or blank fields.
pub fn parse_team_payload(body: &str) -> std::result::Result<TeamResult, GatewayError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| GatewayError::decode(format!("response is not JSON: {e}")))?;
    let result: TeamResult = serde_json::from_value(value)
        .map_err(|e| GatewayError::decode(format!("response does not match team schema: {e}")))?;
    let blank = result.blank_fields();
    if !blank.is_empty() {
        return Err(GatewayError::decode(format!(
            "response has empty required fields: {}",
            blank.join(", ")
        )));
    }
    Ok(result)
}

fn format_status_error(status: u16, body: &str) -> GatewayError {
    // Flask/FastAPI services report failures as {"error": ...} or {"detail": ...}.
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("detail"))
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str().map(ToString::to_string))
        })
        .unwrap_or_else(|| body.chars().take(200).collect());
    GatewayError::transport(
        TransportReason::Status(status),
        format!("generation service returned HTTP {status}: {detail}"),
    )
}

fn format_transport_error(err: &reqwest::Error) -> GatewayError {
    let inner_msg = err
        .source()
        .map(|e| e.to_string())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let is_dns = inner_msg.contains("dns")
        || inner_msg.contains("resolve")
        || inner_msg.contains("name or service not known")
        || inner_msg.contains("no such host")
        || inner_msg.contains("getaddrinfo");

    if err.is_timeout() {
        GatewayError::transport(
            TransportReason::Timeout,
            "the generation service did not respond in time",
        )
    } else if is_dns {
        GatewayError::transport(
            TransportReason::Dns,
            "could not resolve the generation service hostname",
        )
    } else if err.is_connect() {
        GatewayError::transport(
            TransportReason::Connect,
            "could not connect to the generation service",
        )
    } else {
        GatewayError::transport(TransportReason::Other, format!("network error: {err}"))
    }
}

/// Offline stand-in for the service: waits, then returns a fixed roster.
#[derive(Debug, Clone)]
pub struct DemoGateway {
    delay: Duration,
}

impl Default for DemoGateway {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

impl DemoGateway {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl TeamGateway for DemoGateway {
    fn generate(&self, prompt: &str) -> std::result::Result<TeamResult, GatewayError> {
        if prompt.trim().is_empty() {
            return Err(GatewayError::EmptyPrompt);
        }
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Ok(demo_team())
    }

    fn describe(&self) -> String {
        format!("demo ({}ms delay)", self.delay.as_millis())
    }
}

fn player(name: &str, role: &str, agent: &str) -> RosterEntry {
    RosterEntry {
        name: name.to_string(),
        role: role.to_string(),
        agent: agent.to_string(),
        region: "North America".to_string(),
        league: "VCT International".to_string(),
    }
}

pub fn demo_team() -> TeamResult {
    TeamResult {
        team: vec![
            player("TenZ", "Duelist", "Jett"),
            player("ShahZaM", "Initiator", "Sova"),
            player("dapr", "Sentinel", "Cypher"),
            player("SicK", "Flex", "Sage"),
            player("zombs", "Controller", "Omen"),
        ],
        strategy: "This team composition balances aggressive play with strong defensive \
                   capabilities. TenZ as the main duelist can create space and get early picks, \
                   while ShahZaM provides crucial information with Sova's recon abilities. \
                   dapr's Cypher setups will be key for map control, SicK's flexible Sage allows \
                   adaptable strategies, and zombs' Omen smokes enable site executes and retakes."
            .to_string(),
        strengths: "Strong fragging power, excellent information gathering, and versatile agent \
                    composition."
            .to_string(),
        weaknesses: "May struggle against teams with multiple aggressive duelists or those who \
                     can quickly break through Cypher's setups."
            .to_string(),
        igl: "ShahZaM".to_string(),
    }
}
