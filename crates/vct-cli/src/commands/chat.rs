use anyhow::{Result, anyhow};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use vct_core::AppConfig;
use vct_session::RequestController;
use vct_ui::{KeyBindings, TuiOptions, TuiTheme, load_keybindings, run_tui};

use crate::Cli;
use crate::context::{build_gateway, build_observer, load_config};

pub(crate) fn run_chat(cwd: &Path, cli: &Cli) -> Result<()> {
    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        return Err(anyhow!(
            "interactive composer needs a terminal; use `ask <PROMPT>` instead"
        ));
    }
    let cfg = load_config(cwd, cli)?;
    let gateway = build_gateway(&cfg, cli)?;
    let observer = build_observer(cwd, cli)?;

    let bindings = match keybindings_file(&cfg) {
        Some(path) if path.exists() => load_keybindings(&path).unwrap_or_else(|err| {
            observer.warn_log(&format!(
                "ignoring keybindings in {}: {err}",
                path.display()
            ));
            KeyBindings::default()
        }),
        _ => KeyBindings::default(),
    };

    let (tx, rx) = mpsc::channel();
    let controller = RequestController::new(gateway)
        .with_observer(observer.clone())
        .with_events(tx);
    observer.verbose_log(&format!("gateway: {}", controller.gateway_label()));

    observer.mute_stderr(true);
    let result = run_tui(
        &controller,
        rx,
        TuiOptions {
            bindings,
            theme: TuiTheme::from_config(&cfg.theme),
            tick: Duration::from_millis(cfg.ui.tick_ms.max(10)),
            reduced_motion: cfg.ui.reduced_motion,
        },
    );
    observer.mute_stderr(false);
    result
}

fn keybindings_file(cfg: &AppConfig) -> Option<PathBuf> {
    cfg.ui
        .keybindings_path
        .as_ref()
        .map(PathBuf::from)
        .or_else(AppConfig::keybindings_path)
}
