use crate::session::{PendingTicket, Session, Settlement, SubmitRejection};
use crate::suggestions::suggestion;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, mpsc};
use std::thread;
use std::time::{Duration, Instant};
use vct_core::{EventKind, RequestState, Role, TeamResult, Turn, View};
use vct_errors::{GatewayError, TransportReason};
use vct_gateway::TeamGateway;
use vct_observe::Observer;

/// Notifications for the UI loop; it redraws from a fresh snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started { ticket: u64 },
    /// `error` is `None` when the request succeeded.
    Settled {
        ticket: u64,
        error: Option<GatewayError>,
    },
}

/// Cloned read model for one render pass.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub turns: Vec<Turn>,
    pub result: Option<Arc<TeamResult>>,
    pub view: View,
    pub state: RequestState,
    pub input: String,
    pub pending_prompt: Option<String>,
}

impl SessionSnapshot {
    pub fn is_busy(&self) -> bool {
        self.state == RequestState::Pending
    }
}

struct Shared {
    session: Mutex<Session>,
    settled: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        // Every mutation is a single step under the lock, so a poisoned
        // session is still consistent.
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Drives one request at a time from submission to settlement.
///
/// All submission paths (typed input, suggestions, one-shot `ask`) go
/// through [`RequestController::submit`], which holds the session lock
/// across the busy check and the transition to `Pending`.
#[derive(Clone)]
pub struct RequestController {
    shared: Arc<Shared>,
    gateway: Arc<dyn TeamGateway>,
    observer: Option<Arc<Observer>>,
    events: Option<mpsc::Sender<SessionEvent>>,
}

impl RequestController {
    pub fn new(gateway: Arc<dyn TeamGateway>) -> Self {
        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(Session::new()),
                settled: Condvar::new(),
            }),
            gateway,
            observer: None,
            events: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_events(mut self, events: mpsc::Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn gateway_label(&self) -> String {
        self.gateway.describe()
    }

    /// Submits `prompt`. Returns the worker handle, or `None` when the
    /// prompt is blank or a request is already pending.
    pub fn submit(&self, prompt: &str) -> Option<thread::JoinHandle<()>> {
        let ticket = {
            let mut session = self.shared.lock();
            match session.begin(prompt) {
                Ok(ticket) => ticket,
                Err(rejection) => {
                    drop(session);
                    self.log_rejection(rejection);
                    return None;
                }
            }
        };
        self.record(EventKind::TurnAppended {
            role: Role::User,
            chars: ticket.prompt.chars().count(),
        });
        self.record(EventKind::RequestStarted {
            ticket: ticket.id,
            prompt: ticket.prompt.clone(),
        });
        self.notify(SessionEvent::Started { ticket: ticket.id });
        self.spawn_worker(ticket)
    }

    /// Submits whatever is in the input buffer.
    pub fn submit_input(&self) -> Option<thread::JoinHandle<()>> {
        let prompt = self.shared.lock().input().to_string();
        self.submit(&prompt)
    }

    /// Copies a predefined prompt into the input buffer without submitting.
    pub fn use_suggestion(&self, index: usize) -> Option<&'static str> {
        let prompt = suggestion(index)?;
        self.shared.lock().set_input(prompt);
        Some(prompt)
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.shared.lock().set_input(text);
    }

    pub fn edit_input<R>(&self, edit: impl FnOnce(&mut String) -> R) -> R {
        edit(self.shared.lock().input_mut())
    }

    pub fn input(&self) -> String {
        self.shared.lock().input().to_string()
    }

    pub fn is_busy(&self) -> bool {
        self.shared.lock().is_busy()
    }

    pub fn select_view(&self, view: View) {
        self.shared.lock().select_view(view);
        self.record(EventKind::ViewSelected { view });
    }

    pub fn next_view(&self) -> View {
        let view = self.shared.lock().next_view();
        self.record(EventKind::ViewSelected { view });
        view
    }

    /// Clears transcript and result; `None` while a request is pending.
    pub fn reset(&self) -> Option<usize> {
        let cleared = self.shared.lock().reset();
        match cleared {
            Some(turns_cleared) => self.record(EventKind::SessionReset { turns_cleared }),
            None => self.log_rejection(SubmitRejection::Busy),
        }
        cleared
    }

    pub fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&self.shared.lock())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.read(|session| SessionSnapshot {
            turns: session.conversation().all().to_vec(),
            result: session.projector().current(),
            view: session.view(),
            state: session.state(),
            input: session.input().to_string(),
            pending_prompt: session.pending().map(|p| p.prompt.clone()),
        })
    }

    /// Blocks until no request is pending. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut session = self.shared.lock();
        while session.is_busy() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            session = match self.shared.settled.wait_timeout(session, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }

    fn spawn_worker(&self, ticket: PendingTicket) -> Option<thread::JoinHandle<()>> {
        let guard = SettleGuard {
            controller: self.clone(),
            ticket: ticket.id,
            outcome: None,
        };
        let gateway = Arc::clone(&self.gateway);
        let prompt = ticket.prompt;
        let spawned = thread::Builder::new()
            .name(format!("vct-request-{}", ticket.id))
            .spawn(move || {
                let mut guard = guard;
                guard.outcome = Some(gateway.generate(&prompt));
            });
        match spawned {
            Ok(handle) => Some(handle),
            // The closure, and with it the guard, is dropped on spawn
            // failure, which settles the ticket as failed.
            Err(err) => {
                self.warn(&format!("failed to start request worker: {err}"));
                None
            }
        }
    }

    fn settle(&self, ticket: u64, outcome: Result<TeamResult, GatewayError>) {
        let failure = outcome.as_ref().err().cloned();
        let settlement = self.shared.lock().settle(ticket, outcome);
        self.shared.settled.notify_all();
        let Some(settlement) = settlement else {
            return;
        };
        if let Some(err) = &failure {
            self.record(EventKind::GatewayFailed {
                ticket,
                kind: err.kind().to_string(),
                detail: err.to_string(),
            });
            self.warn(&format!("request {ticket} failed ({}): {err}", err.kind()));
        }
        self.log_settlement(&settlement);
        self.notify(SessionEvent::Settled {
            ticket,
            error: failure,
        });
    }

    fn log_settlement(&self, settlement: &Settlement) {
        self.record(EventKind::TurnAppended {
            role: Role::Assistant,
            chars: settlement.reply_chars,
        });
        self.record(EventKind::RequestSettled {
            ticket: settlement.ticket,
            success: settlement.success,
            roster_size: settlement.roster_size,
            elapsed_ms: settlement.elapsed.as_millis() as u64,
        });
    }

    fn log_rejection(&self, rejection: SubmitRejection) {
        self.record(EventKind::SubmitRejected {
            reason: rejection.as_str().to_string(),
        });
    }

    fn record(&self, kind: EventKind) {
        if let Some(observer) = &self.observer {
            observer.record_or_warn(kind);
        }
    }

    fn warn(&self, msg: &str) {
        if let Some(observer) = &self.observer {
            observer.warn_log(msg);
        }
    }

    fn notify(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

/// Settles its ticket exactly once, when dropped. A worker that unwinds or
/// never produces an outcome still returns the session to `Idle`.
struct SettleGuard {
    controller: RequestController,
    ticket: u64,
    outcome: Option<Result<TeamResult, GatewayError>>,
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or_else(|| {
            Err(GatewayError::transport(
                TransportReason::Other,
                "request worker ended without a result",
            ))
        });
        self.controller.settle(self.ticket, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vct_errors::FAILURE_MESSAGE;
    use vct_testkit::{ScriptedGateway, three_region_team};

    #[test]
    fn events_report_start_and_settlement() {
        let (tx, rx) = mpsc::channel();
        let controller =
            RequestController::new(Arc::new(ScriptedGateway::succeeding(three_region_team())))
                .with_events(tx);
        let handle = controller.submit("Build a team").expect("worker");
        handle.join().expect("join");

        assert_eq!(rx.recv().expect("started"), SessionEvent::Started { ticket: 1 });
        assert_eq!(
            rx.recv().expect("settled"),
            SessionEvent::Settled {
                ticket: 1,
                error: None
            }
        );
    }

    #[test]
    fn use_suggestion_fills_input_without_submitting() {
        let gateway = Arc::new(ScriptedGateway::succeeding(three_region_team()));
        let controller = RequestController::new(gateway.clone());
        let prompt = controller.use_suggestion(2).expect("suggestion");
        assert_eq!(controller.input(), prompt);
        assert!(controller.snapshot().turns.is_empty());
        assert_eq!(gateway.calls(), 0);
        assert!(controller.use_suggestion(99).is_none());
    }

    #[test]
    fn submit_input_uses_and_clears_buffer() {
        let controller =
            RequestController::new(Arc::new(ScriptedGateway::failing(GatewayError::decode("x"))));
        controller.edit_input(|buf| buf.push_str("Build a team"));
        controller.submit_input().expect("worker").join().expect("join");
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.input, "");
        assert_eq!(snapshot.turns[0], Turn::user("Build a team"));
        assert_eq!(snapshot.turns[1], Turn::assistant(FAILURE_MESSAGE));
    }

    #[test]
    fn wait_idle_returns_immediately_when_idle() {
        let controller =
            RequestController::new(Arc::new(ScriptedGateway::succeeding(three_region_team())));
        assert!(controller.wait_idle(Duration::from_millis(1)));
    }
}
