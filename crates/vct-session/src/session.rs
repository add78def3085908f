use crate::conversation::Conversation;
use crate::projector::ResultProjector;
use crate::view::ViewSelector;
use std::time::{Duration, Instant};
use vct_core::{RequestState, TeamResult, Turn, View, is_valid_request_state_transition};
use vct_errors::{FAILURE_MESSAGE, GatewayError};

/// Identifies the one request that may be in flight.
#[derive(Debug, Clone)]
pub struct PendingTicket {
    pub id: u64,
    pub prompt: String,
    pub started_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    EmptyPrompt,
    Busy,
}

impl SubmitRejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyPrompt => "empty_prompt",
            Self::Busy => "busy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub ticket: u64,
    pub success: bool,
    pub roster_size: Option<usize>,
    /// Length of the assistant turn appended by this settlement.
    pub reply_chars: usize,
    pub elapsed: Duration,
}

/// Everything one user session owns: transcript, request lifecycle,
/// latest result, selected tab and the input buffer.
#[derive(Debug, Default)]
pub struct Session {
    conversation: Conversation,
    projector: ResultProjector,
    view: ViewSelector,
    state: RequestState,
    pending: Option<PendingTicket>,
    input: String,
    next_ticket: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn projector(&self) -> &ResultProjector {
        &self.projector
    }

    pub fn view(&self) -> View {
        self.view.current()
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == RequestState::Pending
    }

    pub fn pending(&self) -> Option<&PendingTicket> {
        self.pending.as_ref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn select_view(&mut self, view: View) {
        self.view.select(view);
    }

    pub fn next_view(&mut self) -> View {
        self.view.next()
    }

    /// Guarded entry point: appends the user turn, clears the input buffer
    /// and enters `Pending`. Rejections leave the session untouched.
    pub fn begin(&mut self, prompt: &str) -> Result<PendingTicket, SubmitRejection> {
        if prompt.trim().is_empty() {
            return Err(SubmitRejection::EmptyPrompt);
        }
        if self.is_busy() {
            return Err(SubmitRejection::Busy);
        }
        self.conversation.append(Turn::user(prompt));
        self.input.clear();
        self.transition(RequestState::Pending);
        self.next_ticket += 1;
        let ticket = PendingTicket {
            id: self.next_ticket,
            prompt: prompt.to_string(),
            started_at: Instant::now(),
        };
        self.pending = Some(ticket.clone());
        Ok(ticket)
    }

    /// Applies the outcome of the pending request. Outcomes for any other
    /// ticket are dropped and `None` is returned.
    pub fn settle(
        &mut self,
        ticket: u64,
        outcome: Result<TeamResult, GatewayError>,
    ) -> Option<Settlement> {
        let pending = self.pending.take_if(|p| p.id == ticket)?;
        let (reply, roster_size) = match outcome {
            Ok(result) => {
                let reply = Turn::assistant(result.transcript_text());
                let roster_size = result.team.len();
                self.projector.replace(result);
                (reply, Some(roster_size))
            }
            Err(_) => (Turn::assistant(FAILURE_MESSAGE), None),
        };
        let settlement = Settlement {
            ticket,
            success: roster_size.is_some(),
            roster_size,
            reply_chars: reply.content.chars().count(),
            elapsed: pending.started_at.elapsed(),
        };
        self.conversation.append(reply);
        self.transition(RequestState::Idle);
        Some(settlement)
    }

    /// Clears transcript and result. Refused while a request is pending.
    pub fn reset(&mut self) -> Option<usize> {
        if self.is_busy() {
            return None;
        }
        let dropped = self.conversation.clear();
        self.projector.clear();
        self.input.clear();
        Some(dropped)
    }

    fn transition(&mut self, to: RequestState) {
        debug_assert!(is_valid_request_state_transition(self.state, to));
        self.state = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vct_core::Role;
    use vct_testkit::{THREE_REGIONS_PROMPT, single_player_team, three_region_team};

    #[test]
    fn begin_appends_user_turn_and_clears_input() {
        let mut session = Session::new();
        session.set_input(THREE_REGIONS_PROMPT);
        let ticket = session.begin(THREE_REGIONS_PROMPT).expect("accepted");
        assert_eq!(ticket.prompt, THREE_REGIONS_PROMPT);
        assert_eq!(session.conversation().len(), 1);
        assert_eq!(
            session.conversation().all()[0],
            Turn::user(THREE_REGIONS_PROMPT)
        );
        assert_eq!(session.input(), "");
        assert_eq!(session.state(), RequestState::Pending);
    }

    #[test]
    fn whitespace_prompt_is_rejected_without_effect() {
        let mut session = Session::new();
        session.set_input("  \t");
        assert_eq!(session.begin("  \t").unwrap_err(), SubmitRejection::EmptyPrompt);
        assert!(session.conversation().is_empty());
        assert_eq!(session.input(), "  \t");
        assert_eq!(session.state(), RequestState::Idle);
    }

    #[test]
    fn begin_while_pending_is_rejected_without_effect() {
        let mut session = Session::new();
        session.begin("first").expect("accepted");
        session.set_input("second");
        assert_eq!(session.begin("second").unwrap_err(), SubmitRejection::Busy);
        assert_eq!(session.conversation().len(), 1);
        assert_eq!(session.input(), "second");
    }

    #[test]
    fn success_replaces_result_and_appends_json_turn() {
        let mut session = Session::new();
        let ticket = session.begin(THREE_REGIONS_PROMPT).expect("accepted");
        let settlement = session
            .settle(ticket.id, Ok(three_region_team()))
            .expect("settled");
        assert!(settlement.success);
        assert_eq!(settlement.roster_size, Some(5));
        assert_eq!(
            settlement.reply_chars,
            three_region_team().transcript_text().chars().count()
        );
        assert_eq!(session.projector().get(), Some(&three_region_team()));
        assert_eq!(session.conversation().len(), 2);
        let reply = &session.conversation().all()[1];
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, three_region_team().transcript_text());
        assert_eq!(session.view(), View::Players);
        assert!(!session.is_busy());
    }

    #[test]
    fn failure_keeps_previous_result() {
        let mut session = Session::new();
        let first = session.begin("first").expect("accepted");
        session.settle(first.id, Ok(single_player_team("keep")));

        let second = session.begin("second").expect("accepted");
        let settlement = session
            .settle(second.id, Err(GatewayError::decode("bad body")))
            .expect("settled");
        assert!(!settlement.success);
        assert_eq!(settlement.reply_chars, FAILURE_MESSAGE.chars().count());
        assert_eq!(session.projector().get(), Some(&single_player_team("keep")));
        assert_eq!(
            session.conversation().all().last(),
            Some(&Turn::assistant(FAILURE_MESSAGE))
        );
        assert_eq!(session.conversation().len(), 4);
    }

    #[test]
    fn failure_with_no_prior_result_leaves_projector_empty() {
        let mut session = Session::new();
        let ticket = session.begin("first").expect("accepted");
        session.settle(ticket.id, Err(GatewayError::EmptyPrompt));
        assert!(session.projector().is_empty());
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let mut session = Session::new();
        let first = session.begin("first").expect("accepted");
        session.settle(first.id, Ok(single_player_team("a")));
        let second = session.begin("second").expect("accepted");

        assert!(session.settle(first.id, Ok(three_region_team())).is_none());
        assert!(session.is_busy());
        assert_eq!(session.conversation().len(), 3);
        assert!(session.settle(second.id, Ok(three_region_team())).is_some());
    }

    #[test]
    fn view_selection_survives_result_replacement() {
        let mut session = Session::new();
        let first = session.begin("first").expect("accepted");
        session.settle(first.id, Ok(single_player_team("a")));
        session.select_view(View::Strategy);
        let second = session.begin("second").expect("accepted");
        session.settle(second.id, Ok(three_region_team()));
        assert_eq!(session.view(), View::Strategy);
    }

    #[test]
    fn reset_is_refused_while_pending() {
        let mut session = Session::new();
        let ticket = session.begin("first").expect("accepted");
        assert_eq!(session.reset(), None);
        session.settle(ticket.id, Ok(three_region_team()));
        assert_eq!(session.reset(), Some(2));
        assert!(session.conversation().is_empty());
        assert!(session.projector().is_empty());
    }
}
