//! # CLI Commands / 命令行命令
//!
//! One module per subcommand, plus the session bootstrap they share.
//!
//! 每个子命令一个模块，以及它们共享的会话初始化逻辑。

pub mod command;
pub mod debug;
pub mod discover;
pub mod init;
pub mod run;

use anyhow::{Context, Result};
use colored::*;
use std::env;
use std::path::{Path, PathBuf};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::core::session::{Collaborators, TestSession};
use crate::infra::t;

/// Arguments shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub config: PathBuf,
    /// `--lang` from the command line; wins over the configured language.
    pub lang: Option<String>,
}

/// Loads the configuration. A missing default file falls back to the
/// defaults with the current directory as the only workspace.
pub(crate) fn load_config(options: &GlobalOptions) -> Result<(Config, PathBuf)> {
    if !options.config.exists() && options.config == Path::new(DEFAULT_CONFIG_FILE) {
        let base_dir = env::current_dir().context(t!("config.cwd_failed").to_string())?;
        eprintln!("{}", t!("config.using_defaults").dimmed());
        return Ok((Config::default(), base_dir));
    }

    let (config, config_path) = Config::load(&options.config)?;
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((config, base_dir))
}

/// Builds a session from the configuration and runs initial discovery.
pub(crate) async fn open_session(options: &GlobalOptions) -> Result<TestSession> {
    let (config, base_dir) = load_config(options)?;
    if options.lang.is_none() {
        crate::set_language(&config.language);
    }

    let workspaces = config
        .workspaces(&base_dir)
        .context(t!("config.workspaces_failed").to_string())?;
    let collaborators = Collaborators::from_config(&config, &workspaces);
    let mut session = TestSession::new(&config, workspaces, collaborators)
        .context(t!("discover.session_failed").to_string())?;
    session
        .init()
        .await
        .context(t!("discover.failed").to_string())?;
    Ok(session)
}

/// Cancels the returned token on Ctrl-C.
pub(crate) fn setup_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            return;
        }
        println!("\n{}", t!("run.shutdown_signal").yellow());
        token_clone.cancel();
    });

    token
}
