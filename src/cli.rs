// src/cli.rs
pub mod commands;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf};

use crate::config::DEFAULT_CONFIG_FILE;
use crate::core::models::NodeId;
use crate::infra::t;

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    let pos = args.iter().position(|arg| arg == "--lang")?;
    args.get(pos + 1).cloned()
}

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help(t!("cli.arg_config").to_string())
        .value_name("CONFIG")
        .default_value(DEFAULT_CONFIG_FILE)
        .value_parser(clap::value_parser!(PathBuf))
        .global(true)
        .action(ArgAction::Set)
}

pub fn build_cli() -> Command {
    Command::new("testree")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about").to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.arg_lang").to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(config_arg())
        .subcommand(
            Command::new("init")
                .about(t!("cli.cmd_init_about").to_string())
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("cli.arg_non_interactive").to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .help(t!("cli.arg_force").to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("discover")
                .about(t!("cli.cmd_discover_about").to_string())
                .arg(
                    Arg::new("expand-all")
                        .long("expand-all")
                        .help(t!("cli.arg_expand_all").to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help(t!("cli.arg_json").to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cli.cmd_run_about").to_string())
                .arg(
                    Arg::new("include")
                        .short('i')
                        .long("include")
                        .help(t!("cli.arg_include").to_string())
                        .value_name("ID")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("exclude")
                        .short('x')
                        .long("exclude")
                        .help(t!("cli.arg_exclude").to_string())
                        .value_name("ID")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("at")
                        .long("at")
                        .help(t!("cli.arg_at").to_string())
                        .value_name("FILE:LINE")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("cli.arg_html").to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .help(t!("cli.arg_verbose").to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("debug")
                .about(t!("cli.cmd_debug_about").to_string())
                .arg(
                    Arg::new("id")
                        .help(t!("cli.arg_debug_id").to_string())
                        .value_name("ID")
                        .required(true)
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("command")
                .about(t!("cli.cmd_command_about").to_string())
                .arg(
                    Arg::new("file")
                        .long("file")
                        .help(t!("cli.arg_file").to_string())
                        .value_name("FILE")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("line")
                        .long("line")
                        .help(t!("cli.arg_line").to_string())
                        .value_name("LINE")
                        .required(true)
                        .value_parser(clap::value_parser!(u32).range(1..))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("lenses")
                        .long("lenses")
                        .help(t!("cli.arg_lenses").to_string())
                        .value_name("JSON")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
}

/// Global arguments are read from the subcommand's matches, where clap
/// propagates them regardless of their position on the command line.
fn global_options(matches: &ArgMatches, lang: Option<String>) -> commands::GlobalOptions {
    commands::GlobalOptions {
        config: matches
            .get_one::<PathBuf>("config")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        lang,
    }
}

fn ids(matches: &ArgMatches, name: &str) -> Vec<NodeId> {
    matches
        .get_many::<String>(name)
        .map(|values| values.map(|v| NodeId::new(v.as_str())).collect())
        .unwrap_or_default()
}

pub async fn run() -> Result<()> {
    // Pre-parse language so that help texts are translated.
    let lang = pre_parse_language();
    if let Some(lang) = &lang {
        crate::set_language(lang);
    }

    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("init", sub)) => {
            let options = global_options(sub, lang);
            commands::init::execute(
                &options.config,
                sub.get_flag("non-interactive"),
                sub.get_flag("force"),
            )?;
        }
        Some(("discover", sub)) => {
            let options = global_options(sub, lang);
            commands::discover::execute(&options, sub.get_flag("expand-all"), sub.get_flag("json"))
                .await?;
        }
        Some(("run", sub)) => {
            let options = global_options(sub, lang);
            let args = commands::run::RunArgs {
                include: ids(sub, "include"),
                exclude: ids(sub, "exclude"),
                at: sub.get_one::<String>("at").cloned(),
                html: sub.get_one::<PathBuf>("html").cloned(),
                verbose: sub.get_flag("verbose"),
            };
            commands::run::execute(&options, args).await?;
        }
        Some(("debug", sub)) => {
            let options = global_options(sub, lang);
            let id = sub
                .get_one::<String>("id")
                .map(|v| NodeId::new(v.as_str()))
                .unwrap_or_default();
            commands::debug::execute(&options, &id).await?;
        }
        Some(("command", sub)) => {
            let options = global_options(sub, lang);
            let file = sub.get_one::<PathBuf>("file").cloned().unwrap_or_default();
            let line = sub.get_one::<u32>("line").copied().unwrap_or(1);
            let lenses = sub.get_one::<PathBuf>("lenses").cloned();
            commands::command::execute(&options, &file, line, lenses.as_deref()).await?;
        }
        _ => {
            // Clap has already printed help.
        }
    }
    Ok(())
}
