//! Test doubles shared by the gateway, session and CLI tests.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;
use vct_core::{RosterEntry, TeamResult};
use vct_errors::GatewayError;
use vct_gateway::TeamGateway;

pub const THREE_REGIONS_PROMPT: &str =
    "Build a team with players from at least three different regions";

pub fn roster_entry(name: &str, role: &str, agent: &str, region: &str) -> RosterEntry {
    RosterEntry {
        name: name.to_string(),
        role: role.to_string(),
        agent: agent.to_string(),
        region: region.to_string(),
        league: "VCT International".to_string(),
    }
}

/// Five players spread over three regions.
pub fn three_region_team() -> TeamResult {
    TeamResult {
        team: vec![
            roster_entry("aspas", "Duelist", "Jett", "Brazil"),
            roster_entry("Less", "Sentinel", "Viper", "Brazil"),
            roster_entry("Boaster", "Controller", "Astra", "EMEA"),
            roster_entry("Derke", "Duelist", "Raze", "EMEA"),
            roster_entry("something", "Initiator", "Fade", "Pacific"),
        ],
        strategy: "Default into late mid control, then fast executes.".to_string(),
        strengths: "Two proven duelists and a veteran caller.".to_string(),
        weaknesses: "Limited shared practice across regions.".to_string(),
        igl: "Boaster".to_string(),
    }
}

pub fn single_player_team(name: &str) -> TeamResult {
    TeamResult {
        team: vec![roster_entry(name, "Flex", "Skye", "Pacific")],
        strategy: "Solo queue.".to_string(),
        strengths: "Adaptable.".to_string(),
        weaknesses: "Only one player.".to_string(),
        igl: name.to_string(),
    }
}

type Outcome = Result<TeamResult, GatewayError>;

/// Returns queued outcomes in order; the last one repeats once the queue
/// is drained.
pub struct ScriptedGateway {
    outcomes: Mutex<VecDeque<Outcome>>,
    last: Mutex<Option<Outcome>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    gate: Option<Gate>,
}

struct Gate {
    entered_tx: Mutex<mpsc::Sender<()>>,
    release_rx: Mutex<mpsc::Receiver<()>>,
}

/// Controls a gated [`ScriptedGateway`] from the test thread.
pub struct GateHandle {
    entered_rx: mpsc::Receiver<()>,
    release_tx: mpsc::Sender<()>,
}

impl GateHandle {
    /// Blocks until a `generate` call is in flight.
    pub fn wait_entered(&self, timeout: Duration) -> bool {
        self.entered_rx.recv_timeout(timeout).is_ok()
    }

    /// Lets one in-flight `generate` call return.
    pub fn release(&self) {
        let _ = self.release_tx.send(());
    }
}

impl ScriptedGateway {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn succeeding(team: TeamResult) -> Self {
        Self::new(vec![Ok(team)])
    }

    pub fn failing(error: GatewayError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Each `generate` call blocks until [`GateHandle::release`] is called.
    pub fn gated(outcomes: Vec<Outcome>) -> (Self, GateHandle) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let mut gateway = Self::new(outcomes);
        gateway.gate = Some(Gate {
            entered_tx: Mutex::new(entered_tx),
            release_rx: Mutex::new(release_rx),
        });
        (
            gateway,
            GateHandle {
                entered_rx,
                release_tx,
            },
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

impl TeamGateway for ScriptedGateway {
    fn generate(&self, prompt: &str) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(prompt.to_string());
        if let Some(gate) = &self.gate {
            let _ = gate.entered_tx.lock().expect("gate lock").send(());
            let _ = gate.release_rx.lock().expect("gate lock").recv();
        }
        let next = self.outcomes.lock().expect("outcomes lock").pop_front();
        let mut last = self.last.lock().expect("last lock");
        match next {
            Some(outcome) => {
                *last = Some(outcome.clone());
                outcome
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(GatewayError::decode("script exhausted"))),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// Gateway that panics, for exercising the settle-on-drop path.
pub struct PanickingGateway;

impl TeamGateway for PanickingGateway {
    fn generate(&self, _prompt: &str) -> Outcome {
        panic!("gateway exploded");
    }

    fn describe(&self) -> String {
        "panicking".to_string()
    }
}

#[derive(Clone)]
pub struct MockHttpResponse {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl MockHttpResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn team(team: &TeamResult) -> Self {
        Self::json(200, serde_json::to_string(team).expect("serialize team"))
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Local HTTP/1.1 server answering each connection with the next scripted
/// response and recording the request bodies it received.
pub struct MockHttpServer {
    endpoint: String,
    request_count: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<String>>>,
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockHttpServer {
    pub fn start(responses: Vec<MockHttpResponse>) -> Self {
        let scripted = if responses.is_empty() {
            vec![MockHttpResponse::json(500, r#"{"error":"empty_script"}"#)]
        } else {
            responses
        };
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        listener
            .set_nonblocking(true)
            .expect("set nonblocking listener");
        let addr = listener.local_addr().expect("addr");
        let request_count = Arc::new(AtomicUsize::new(0));
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let request_count_thread = Arc::clone(&request_count);
        let bodies_thread = Arc::clone(&bodies);
        let (tx, rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            loop {
                if rx.try_recv().is_ok() {
                    break;
                }
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        let _ = stream.set_nonblocking(false);
                        let body = read_http_body(&mut stream).unwrap_or_default();
                        bodies_thread.lock().expect("bodies lock").push(body);
                        let idx = request_count_thread.fetch_add(1, Ordering::SeqCst);
                        let selected = scripted
                            .get(idx)
                            .cloned()
                            .or_else(|| scripted.last().cloned())
                            .expect("scripted response");
                        if !selected.delay.is_zero() {
                            thread::sleep(selected.delay);
                        }
                        let status_text = match selected.status {
                            200 => "OK",
                            400 => "Bad Request",
                            404 => "Not Found",
                            500 => "Internal Server Error",
                            503 => "Service Unavailable",
                            _ => "Error",
                        };
                        let response = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            selected.status,
                            status_text,
                            selected.body.len(),
                            selected.body
                        );
                        let _ = stream.write_all(response.as_bytes());
                        let _ = stream.flush();
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(2));
                    }
                    Err(_) => break,
                }
            }
        });
        Self {
            endpoint: format!("http://{addr}/generate_team"),
            request_count,
            bodies,
            stop_tx: Some(tx),
            handle: Some(handle),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn request_bodies(&self) -> Vec<String> {
        self.bodies.lock().expect("bodies lock").clone()
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Address nothing listens on, for connection-refused tests.
pub fn unreachable_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind unused port");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}/generate_team")
}

fn read_http_body(stream: &mut std::net::TcpStream) -> std::io::Result<String> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    let mut header_end = None;
    while header_end.is_none() {
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
        header_end = find_subsequence(&buffer, b"\r\n\r\n").map(|idx| idx + 4);
        if buffer.len() > 1_048_576 {
            break;
        }
    }
    let header_len = header_end.unwrap_or(buffer.len());
    let content_length = parse_content_length(&buffer[..header_len]);
    let mut body = buffer[header_len..].to_vec();
    while body.len() < content_length {
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..read]);
    }
    Ok(String::from_utf8_lossy(&body).to_string())
}

fn parse_content_length(headers: &[u8]) -> usize {
    let raw = String::from_utf8_lossy(headers);
    for line in raw.lines() {
        let mut parts = line.splitn(2, ':');
        let key = parts.next().unwrap_or_default().trim();
        if key.eq_ignore_ascii_case("content-length")
            && let Some(value) = parts.next()
            && let Ok(parsed) = value.trim().parse::<usize>()
        {
            return parsed;
        }
    }
    0
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
