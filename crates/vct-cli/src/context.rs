use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use vct_core::AppConfig;
use vct_gateway::{DemoGateway, HttpTeamGateway, TeamGateway};
use vct_observe::Observer;

use crate::Cli;

/// Settings layers with command-line overrides on top. An explicit
/// `--endpoint` also wins over the environment variable.
pub(crate) fn load_config(cwd: &Path, cli: &Cli) -> Result<AppConfig> {
    let mut cfg = AppConfig::load(cwd)?;
    if let Some(endpoint) = &cli.endpoint {
        cfg.gateway.endpoint_url = endpoint.clone();
        cfg.gateway.endpoint_env.clear();
    }
    if let Some(timeout) = cli.timeout {
        cfg.gateway.timeout_seconds = timeout;
    }
    Ok(cfg)
}

pub(crate) fn build_gateway(cfg: &AppConfig, cli: &Cli) -> Result<Arc<dyn TeamGateway>> {
    if cli.demo {
        return Ok(Arc::new(DemoGateway::default()));
    }
    Ok(Arc::new(HttpTeamGateway::from_config(&cfg.gateway)?))
}

pub(crate) fn build_observer(cwd: &Path, cli: &Cli) -> Result<Arc<Observer>> {
    let observer = Observer::new(cwd)?;
    observer.set_verbose(cli.verbose);
    Ok(Arc::new(observer))
}
