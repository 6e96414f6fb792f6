//! # Init Command Module / 初始化命令模块
//!
//! Writes a `TestTree.toml`, either from the built-in template or through a
//! short interactive wizard.
//!
//! 写入 `TestTree.toml`，可以使用内置模板，也可以通过简短的交互式向导生成。

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::infra::t;

const DEFAULT_CONFIG: &str = r#"# Testree Configuration / Testree 配置

# Language for output messages / 输出消息的语言
language = "en"

# Ask the indexer for the examples of each file instead of walking the
# filesystem only / 使用索引器发现每个文件中的测试，而不仅仅遍历文件系统
full_discovery = false

# Seconds before a test process is terminated / 测试进程被终止前的秒数
test_timeout_secs = 30

# Directory names that root a test hierarchy, in priority order
# 作为测试层级根的目录名，按优先级排序
test_roots = ["test", "spec", "features"]
extension = "rb"
helper_file = "test_helper.rb"
excluded_segment = "fixtures"

# Commands. {file} is replaced with the quoted path, {line} with the 1-based line.
# 命令。{file} 替换为带引号的路径，{line} 替换为从 1 开始的行号。
file_command = "bin/rails test {file}"
example_command = "bin/rails test {file}:{line}"

# Indexing service used by full discovery / 完整发现模式使用的索引服务
# [indexer]
# command = "bin/discover-tests"
# ready_command = "bin/wait-for-index"

# Workspace roots. Without any, the directory of this file is used.
# 工作区根目录。未配置时使用此文件所在目录。
# [[workspaces]]
# name = "app"
# root = "."
# env = { RAILS_ENV = "test" }

# Extra environment for debug launches / 调试启动的额外环境变量
[debug_env]
DISABLE_SPRING = "1"
"#;

/// Creates the configuration file at `path`.
pub fn execute(path: &Path, non_interactive: bool, force: bool) -> Result<()> {
    let content = if non_interactive {
        if path.exists() && !force {
            println!("{}", t!("init.file_exists", path = path.display()).red());
            println!("{}", t!("init.use_force").yellow());
            return Ok(());
        }
        DEFAULT_CONFIG.to_string()
    } else {
        match run_wizard(path, force)? {
            Some(content) => content,
            None => {
                println!("{}", t!("init.aborted"));
                return Ok(());
            }
        }
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| t!("init.create_parent_dir_failed", path = parent.display()).to_string())?;
    }
    fs::write(path, content)
        .with_context(|| t!("init.write_failed", path = path.display()).to_string())?;

    println!("{}", t!("init.success", path = path.display()).green());
    println!("{}", t!("init.next_steps"));
    Ok(())
}

/// Asks for the settings that differ most between projects. Returns `None`
/// when the user declines to overwrite an existing file.
fn run_wizard(path: &Path, force: bool) -> Result<Option<String>> {
    let theme = ColorfulTheme::default();
    println!("\n{}", t!("init.wizard_welcome").cyan().bold());

    if path.exists() && !force {
        let overwrite = Confirm::with_theme(&theme)
            .with_prompt(t!("init.overwrite_prompt", path = path.display()).to_string())
            .default(false)
            .interact()
            .context(t!("init.prompt_failed").to_string())?;
        if !overwrite {
            return Ok(None);
        }
    }

    let full_discovery = Confirm::with_theme(&theme)
        .with_prompt(t!("init.full_discovery_prompt").to_string())
        .default(false)
        .interact()
        .context(t!("init.prompt_failed").to_string())?;

    let timeout: u64 = Input::with_theme(&theme)
        .with_prompt(t!("init.timeout_prompt").to_string())
        .default(30)
        .validate_with(|value: &u64| {
            if *value > 0 {
                Ok(())
            } else {
                Err(t!("init.timeout_invalid").to_string())
            }
        })
        .interact_text()
        .context(t!("init.prompt_failed").to_string())?;

    let file_command: String = Input::with_theme(&theme)
        .with_prompt(t!("init.file_command_prompt").to_string())
        .default("bin/rails test {file}".to_string())
        .interact_text()
        .context(t!("init.prompt_failed").to_string())?;

    Ok(Some(render_config(full_discovery, timeout, &file_command)?))
}

/// The template with the wizard's answers substituted in.
fn render_config(full_discovery: bool, timeout: u64, file_command: &str) -> Result<String> {
    let mut config: toml::Table = toml::from_str(DEFAULT_CONFIG)?;
    config.insert("full_discovery".into(), full_discovery.into());
    config.insert("test_timeout_secs".into(), i64::try_from(timeout)?.into());
    config.insert("file_command".into(), file_command.into());
    let rendered = toml::to_string_pretty(&config)?;

    // Never write a file the loader would reject.
    Config::from_toml_str(&rendered)?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_is_a_valid_config() {
        let config = Config::from_toml_str(DEFAULT_CONFIG).unwrap();
        assert!(!config.full_discovery);
        assert_eq!(config.test_timeout_secs, 30);
        assert_eq!(config.debug_env.get("DISABLE_SPRING").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_wizard_answers_are_rendered() {
        let rendered = render_config(true, 90, "bundle exec rspec {file}").unwrap();
        let config = Config::from_toml_str(&rendered).unwrap();
        assert!(config.full_discovery);
        assert_eq!(config.test_timeout_secs, 90);
        assert_eq!(config.file_command.as_deref(), Some("bundle exec rspec {file}"));
    }
}
