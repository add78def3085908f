use anyhow::Result;
use serde_json::json;
use std::path::Path;
use vct_core::AppConfig;

use crate::context::load_config;
use crate::output::print_json;
use crate::{Cli, ConfigCmd};

/// `show` prints the configuration the other commands would run with,
/// command-line overrides included.
pub(crate) fn run_config(cwd: &Path, cli: &Cli, cmd: ConfigCmd) -> Result<()> {
    let json_mode = cli.json;
    match cmd {
        ConfigCmd::Show => {
            let cfg = load_config(cwd, cli)?;
            let mut value = serde_json::to_value(&cfg)?;
            value["gateway"]["resolved_endpoint"] = json!(cfg.gateway.resolved_endpoint());
            if json_mode {
                print_json(&value)?;
            } else {
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
        }
        ConfigCmd::Init => {
            let path = AppConfig::project_settings_path(cwd);
            let created = !path.exists();
            if created {
                AppConfig::default().save(cwd)?;
            }
            if json_mode {
                print_json(&json!({"path": path, "created": created}))?;
            } else if created {
                println!("wrote {}", path.display());
            } else {
                println!("{} already exists", path.display());
            }
        }
    }
    Ok(())
}
