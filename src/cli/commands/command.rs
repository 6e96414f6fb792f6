//! `command`: prints the command that runs the test at a file and line.
//!
//! With `--lenses`, a JSON array of code lenses for the file is ingested
//! first, the way an editor pushes them after opening the file.

use anyhow::{bail, Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

use crate::core::discovery::lens::CodeLens;
use crate::core::discovery::DiscoveryMode;
use crate::infra::t;

use super::{open_session, GlobalOptions};

pub async fn execute(
    options: &GlobalOptions,
    file: &Path,
    line: u32,
    lenses: Option<&Path>,
) -> Result<()> {
    let mut session = open_session(options).await?;
    let file = fs::canonicalize(file)
        .with_context(|| t!("command.file_not_found", path = file.display()).to_string())?;

    if let Some(lenses_path) = lenses {
        let content = fs::read_to_string(lenses_path)
            .with_context(|| t!("command.lenses_read_failed", path = lenses_path.display()).to_string())?;
        let lenses: Vec<CodeLens> = serde_json::from_str(&content)
            .with_context(|| t!("command.lenses_parse_failed", path = lenses_path.display()).to_string())?;
        let ingest = session.ingest_code_lenses(&file, &lenses)?;
        for orphan in &ingest.orphans {
            eprintln!("{}", t!("command.orphan_lens", name = orphan).yellow());
        }
        for skipped in &ingest.skipped {
            eprintln!("{}", t!("command.skipped_lens", name = skipped).yellow());
        }
    }

    if session.mode() == DiscoveryMode::Indexed {
        if let Some(id) = session.tree().find_file(&file).map(|n| n.id.clone()) {
            session.expand(&id).await?;
        }
    }

    match session.command_at(&file, line - 1) {
        Some(command) => {
            println!("{command}");
            Ok(())
        }
        None => bail!(t!("command.none", path = file.display(), line = line).to_string()),
    }
}
