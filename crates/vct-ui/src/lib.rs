mod keys;
mod render;

pub use keys::{KeyBindings, load_keybindings, parse_key_event};
pub use render::{draw, roster_lines, strategy_lines, transcript_lines};

use anyhow::Result;
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::style::Color;
use std::io;
use std::panic::PanicHookInfo;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;
use vct_core::{ThemeConfig, View};
use vct_session::{PREDEFINED_PROMPTS, RequestController, SessionEvent};

/// Typed as a prompt, resets the session instead of submitting.
pub const CLEAR_COMMAND: &str = "/clear";

/// RAII guard that restores the terminal on drop (including panics).
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = crossterm::execute!(
        io::stdout(),
        DisableBracketedPaste,
        LeaveAlternateScreen,
        crossterm::cursor::Show
    );
}

type PanicHook = dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static;

/// Chains a terminal-restoring panic hook in front of the current one and
/// puts the current one back on drop.
struct PanicHookGuard {
    previous: Arc<PanicHook>,
}

impl PanicHookGuard {
    fn install() -> Self {
        let previous: Arc<PanicHook> = Arc::from(std::panic::take_hook());
        let chained = Arc::clone(&previous);
        // Worker panics are settled by the controller; only a panic on the UI
        // thread needs the terminal back.
        std::panic::set_hook(Box::new(move |info| {
            if std::thread::current().name() == Some("main") {
                restore_terminal();
            }
            chained(info);
        }));
        Self { previous }
    }
}

impl Drop for PanicHookGuard {
    fn drop(&mut self) {
        // set_hook panics on a panicking thread.
        if std::thread::panicking() {
            return;
        }
        let previous = Arc::clone(&self.previous);
        drop(std::panic::take_hook());
        std::panic::set_hook(Box::new(move |info| previous(info)));
    }
}

fn parse_theme_color(name: &str) -> Color {
    match name.to_ascii_lowercase().as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        _ => Color::Cyan,
    }
}

#[derive(Debug, Clone)]
pub struct TuiTheme {
    pub primary: Color,
    pub secondary: Color,
    pub error: Color,
}

impl Default for TuiTheme {
    fn default() -> Self {
        Self {
            primary: Color::Cyan,
            secondary: Color::Yellow,
            error: Color::Red,
        }
    }
}

impl TuiTheme {
    pub fn from_config(cfg: &ThemeConfig) -> Self {
        Self {
            primary: parse_theme_color(&cfg.primary),
            secondary: parse_theme_color(&cfg.secondary),
            error: parse_theme_color(&cfg.error),
        }
    }
}

/// Presentation state owned by the event loop. Session data is read from
/// snapshots, never stored here.
#[derive(Debug, Clone)]
pub struct UiState {
    pub highlighted: usize,
    pub status: String,
    pub gateway_label: String,
    pub reduced_motion: bool,
    pub tick: usize,
}

impl UiState {
    pub fn new(gateway_label: impl Into<String>, reduced_motion: bool) -> Self {
        Self {
            highlighted: 0,
            status: "ready".to_string(),
            gateway_label: gateway_label.into(),
            reduced_motion,
            tick: 0,
        }
    }

    pub fn apply_event(&mut self, event: &SessionEvent) {
        self.status = match event {
            SessionEvent::Started { ticket } => format!("request #{ticket} sent"),
            SessionEvent::Settled {
                ticket,
                error: None,
            } => format!("request #{ticket}: team ready"),
            SessionEvent::Settled {
                ticket,
                error: Some(err),
            } => format!("request #{ticket} failed: {}", err.kind()),
        };
    }

    fn move_highlight(&mut self, down: bool) {
        let len = PREDEFINED_PROMPTS.len();
        self.highlighted = if down {
            (self.highlighted + 1) % len
        } else {
            (self.highlighted + len - 1) % len
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Exit,
}

/// Applies one key press to the UI and session.
pub fn handle_key(
    ui: &mut UiState,
    controller: &RequestController,
    bindings: &KeyBindings,
    key: KeyEvent,
) -> KeyOutcome {
    if key == bindings.exit {
        return KeyOutcome::Exit;
    }
    if key == bindings.submit {
        submit(ui, controller);
    } else if key == bindings.next_view {
        controller.next_view();
    } else if key == bindings.prev_view {
        let current = controller.snapshot().view;
        let len = View::ALL.len();
        if let Some(view) = View::from_index((current.index() + len - 1) % len) {
            controller.select_view(view);
        }
    } else if key == bindings.suggestion_up {
        ui.move_highlight(false);
    } else if key == bindings.suggestion_down {
        ui.move_highlight(true);
    } else if key == bindings.use_suggestion {
        if controller.is_busy() {
            ui.status = "wait for the current request".to_string();
        } else {
            controller.use_suggestion(ui.highlighted);
        }
    } else if key == bindings.reset {
        reset(ui, controller);
    } else if key == bindings.clear_input {
        if !controller.is_busy() {
            controller.set_input("");
        }
    } else {
        edit_input(controller, key);
    }
    KeyOutcome::Continue
}

fn submit(ui: &mut UiState, controller: &RequestController) {
    if controller.input().trim() == CLEAR_COMMAND {
        reset(ui, controller);
        return;
    }
    if controller.submit_input().is_none() && controller.is_busy() {
        ui.status = "wait for the current request".to_string();
    }
}

fn reset(ui: &mut UiState, controller: &RequestController) {
    ui.status = match controller.reset() {
        Some(_) => "session cleared".to_string(),
        None => "cannot clear while a request is pending".to_string(),
    };
}

/// Inserts pasted text into the prompt as one line. Ignored while a request
/// is pending.
pub fn handle_paste(controller: &RequestController, text: &str) {
    if controller.is_busy() {
        return;
    }
    let flattened = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    controller.edit_input(|buf| buf.push_str(&flattened));
}

fn edit_input(controller: &RequestController, key: KeyEvent) {
    if controller.is_busy() {
        return;
    }
    match key.code {
        KeyCode::Backspace => {
            controller.edit_input(|buf| {
                buf.pop();
            });
        }
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            controller.edit_input(|buf| buf.push(c));
        }
        _ => {}
    }
}

pub struct TuiOptions {
    pub bindings: KeyBindings,
    pub theme: TuiTheme,
    pub tick: Duration,
    pub reduced_motion: bool,
}

/// Runs the full-screen composer until the exit key or SIGINT.
pub fn run_tui(
    controller: &RequestController,
    events: mpsc::Receiver<SessionEvent>,
    options: TuiOptions,
) -> Result<()> {
    let sigint_flag = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    {
        let flag = Arc::clone(&sigint_flag);
        signal_hook::flag::register(signal_hook::consts::SIGINT, flag)?;
    }

    let hook_guard = PanicHookGuard::install();
    enable_raw_mode()?;
    let _guard = TerminalGuard;
    crossterm::execute!(io::stdout(), EnterAlternateScreen, EnableBracketedPaste)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;

    let mut ui = UiState::new(controller.gateway_label(), options.reduced_motion);
    loop {
        if sigint_flag.swap(false, Ordering::Relaxed) {
            break;
        }
        while let Ok(event) = events.try_recv() {
            ui.apply_event(&event);
        }
        ui.tick = ui.tick.wrapping_add(1);

        let snapshot = controller.snapshot();
        terminal.draw(|frame| draw(frame, &snapshot, &ui, &options.theme))?;

        if !event::poll(options.tick)? {
            continue;
        }
        let key = match event::read()? {
            Event::Key(key) => key,
            Event::Paste(pasted) => {
                handle_paste(controller, &pasted);
                continue;
            }
            _ => continue,
        };
        // Only handle key press events (ignore release/repeat on platforms that send them)
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if handle_key(&mut ui, controller, &options.bindings, key) == KeyOutcome::Exit {
            break;
        }
    }

    terminal.show_cursor()?;
    drop(_guard);
    drop(hook_guard);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use vct_testkit::{ScriptedGateway, single_player_team, three_region_team};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(ui: &mut UiState, controller: &RequestController, text: &str) {
        let bindings = KeyBindings::default();
        for c in text.chars() {
            handle_key(ui, controller, &bindings, press(KeyCode::Char(c)));
        }
    }

    fn controller_with(gateway: ScriptedGateway) -> (RequestController, Arc<ScriptedGateway>) {
        let gateway = Arc::new(gateway);
        (RequestController::new(gateway.clone()), gateway)
    }

    #[test]
    fn theme_from_config_falls_back_to_cyan() {
        let theme = TuiTheme::from_config(&ThemeConfig {
            primary: "Magenta".to_string(),
            secondary: "not-a-color".to_string(),
            error: "lightred".to_string(),
        });
        assert_eq!(theme.primary, Color::Magenta);
        assert_eq!(theme.secondary, Color::Cyan);
        assert_eq!(theme.error, Color::LightRed);
    }

    #[test]
    fn typing_then_enter_submits() {
        let (controller, gateway) = controller_with(ScriptedGateway::succeeding(three_region_team()));
        let mut ui = UiState::new("scripted", true);
        let bindings = KeyBindings::default();
        type_text(&mut ui, &controller, "Build a team");
        handle_key(&mut ui, &controller, &bindings, press(KeyCode::Backspace));
        assert_eq!(controller.input(), "Build a tea");

        handle_key(&mut ui, &controller, &bindings, bindings.submit);
        assert!(controller.wait_idle(Duration::from_secs(5)));
        assert_eq!(gateway.prompts(), vec!["Build a tea"]);
        assert_eq!(controller.snapshot().turns.len(), 2);
    }

    #[test]
    fn arrows_and_ctrl_o_load_a_suggestion_without_sending() {
        let (controller, gateway) = controller_with(ScriptedGateway::succeeding(three_region_team()));
        let mut ui = UiState::new("scripted", true);
        let bindings = KeyBindings::default();
        handle_key(&mut ui, &controller, &bindings, bindings.suggestion_up);
        assert_eq!(ui.highlighted, PREDEFINED_PROMPTS.len() - 1);
        handle_key(&mut ui, &controller, &bindings, bindings.suggestion_down);
        handle_key(&mut ui, &controller, &bindings, bindings.suggestion_down);
        assert_eq!(ui.highlighted, 1);

        handle_key(&mut ui, &controller, &bindings, bindings.use_suggestion);
        assert_eq!(controller.input(), PREDEFINED_PROMPTS[1]);
        assert_eq!(gateway.calls(), 0);
    }

    #[test]
    fn tab_keys_cycle_views() {
        let (controller, _) = controller_with(ScriptedGateway::succeeding(three_region_team()));
        let mut ui = UiState::new("scripted", true);
        let bindings = KeyBindings::default();
        handle_key(&mut ui, &controller, &bindings, bindings.next_view);
        assert_eq!(controller.snapshot().view, View::Strategy);
        handle_key(&mut ui, &controller, &bindings, bindings.prev_view);
        assert_eq!(controller.snapshot().view, View::Players);
    }

    #[test]
    fn clear_command_resets_instead_of_submitting() {
        let (controller, gateway) = controller_with(ScriptedGateway::succeeding(single_player_team("a")));
        let mut ui = UiState::new("scripted", true);
        let bindings = KeyBindings::default();
        controller.submit("first").expect("worker").join().expect("join");

        type_text(&mut ui, &controller, CLEAR_COMMAND);
        handle_key(&mut ui, &controller, &bindings, bindings.submit);
        assert_eq!(gateway.calls(), 1);
        let snapshot = controller.snapshot();
        assert!(snapshot.turns.is_empty());
        assert!(snapshot.result.is_none());
        assert_eq!(ui.status, "session cleared");
    }

    #[test]
    fn control_chords_do_not_type() {
        let (controller, _) = controller_with(ScriptedGateway::succeeding(three_region_team()));
        let mut ui = UiState::new("scripted", true);
        let bindings = KeyBindings::default();
        handle_key(
            &mut ui,
            &controller,
            &bindings,
            KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL),
        );
        assert_eq!(controller.input(), "");
        assert_eq!(
            handle_key(&mut ui, &controller, &bindings, bindings.exit),
            KeyOutcome::Exit
        );
    }

    #[test]
    fn paste_flattens_lines_into_the_prompt() {
        let (controller, gateway) = controller_with(ScriptedGateway::succeeding(three_region_team()));
        controller.set_input("Build ");
        handle_paste(&controller, "a team with\r\n\nthree regions\n");
        assert_eq!(controller.input(), "Build a team with three regions");
        assert_eq!(gateway.calls(), 0);
    }

    #[test]
    fn paste_is_ignored_while_pending() {
        let (gateway, gate) = ScriptedGateway::gated(vec![Ok(three_region_team())]);
        let (controller, _) = controller_with(gateway);
        let worker = controller.submit("first").expect("worker");
        assert!(gate.wait_entered(Duration::from_secs(5)));
        handle_paste(&controller, "second");
        assert_eq!(controller.input(), "");
        gate.release();
        worker.join().expect("join");
    }

    #[test]
    fn esc_clears_the_draft_only() {
        let (controller, gateway) = controller_with(ScriptedGateway::succeeding(three_region_team()));
        let mut ui = UiState::new("scripted", true);
        let bindings = KeyBindings::default();
        type_text(&mut ui, &controller, "half a prompt");
        handle_key(&mut ui, &controller, &bindings, bindings.clear_input);
        assert_eq!(controller.input(), "");
        assert_eq!(gateway.calls(), 0);
    }

    #[test]
    fn panic_hook_guard_hands_back_the_previous_hook() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {
            CALLS.fetch_add(1, Ordering::SeqCst);
        }));
        drop(PanicHookGuard::install());
        let joined = std::thread::Builder::new()
            .name("worker".to_string())
            .spawn(|| panic!("after the composer exits"))
            .expect("spawn")
            .join();
        let calls = CALLS.load(Ordering::SeqCst);
        std::panic::set_hook(original);
        assert!(joined.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn settlement_events_update_status() {
        let mut ui = UiState::new("scripted", false);
        ui.apply_event(&SessionEvent::Started { ticket: 3 });
        assert_eq!(ui.status, "request #3 sent");
        ui.apply_event(&SessionEvent::Settled {
            ticket: 3,
            error: Some(vct_errors::GatewayError::decode("bad")),
        });
        assert_eq!(ui.status, "request #3 failed: decode");
    }
}
