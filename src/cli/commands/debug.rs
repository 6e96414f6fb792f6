//! `debug`: launches one node under the debug launcher, with no timeout.

use anyhow::{bail, Result};
use colored::*;

use crate::core::discovery::DiscoveryMode;
use crate::core::models::{NodeId, RunStatus};
use crate::infra::t;

use super::{open_session, GlobalOptions};

pub async fn execute(options: &GlobalOptions, id: &NodeId) -> Result<()> {
    let mut session = open_session(options).await?;
    if session.mode() == DiscoveryMode::Indexed && !session.tree().contains(id) {
        session.expand_all().await?;
    }

    println!("{}", t!("debug.launching", id = id).cyan());
    let result = session.debug(id).await;

    match result.status {
        RunStatus::Passed => {
            println!("{}", t!("debug.finished").green());
            Ok(())
        }
        _ => {
            for message in &result.messages {
                eprintln!("{}", message.red());
            }
            bail!(t!("debug.failed", id = id).to_string())
        }
    }
}
