//! # Configuration Module / 配置模块
//!
//! `TestTree.toml` parsing. The file selects the discovery strategy, the test
//! timeout, the layout of test directories and the workspaces to scan.
//!
//! `TestTree.toml` 解析。该文件选择发现策略、测试超时、测试目录布局以及要扫描的工作区。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::discovery::TestLayout;
use crate::core::error::ConfigError;
use crate::core::models::{Workspace, Workspaces};
use crate::infra::t;

/// Default name of the configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "TestTree.toml";

/// A workspace root as written in the configuration file.
/// 配置文件中声明的工作区根目录。
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct WorkspaceConfig {
    /// Display name. Defaults to the root's directory name.
    #[serde(default)]
    pub name: Option<String>,
    /// Root directory. `~` and environment variables are expanded; relative
    /// paths are resolved against the configuration file's directory.
    pub root: String,
    /// Environment for processes spawned in this workspace.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// The external indexing service used by full discovery.
/// 完整发现模式所使用的外部索引服务。
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct IndexerConfig {
    /// Prints the discovered items of one file as JSON. The file path is appended as the last argument.
    pub command: String,
    /// Blocks until the index is ready. Run once per session.
    #[serde(default)]
    pub ready_command: Option<String>,
}

/// Represents the whole configuration, loaded from a TOML file.
/// 代表从 TOML 文件加载的整个配置。
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    /// The language for output messages (e.g., "en", "zh-CN").
    /// 输出消息的语言（例如 "en", "zh-CN"）。
    #[serde(default = "default_language")]
    pub language: String,

    /// Use lazy, indexer-backed discovery instead of the filesystem glob.
    /// 使用基于索引器的延迟发现，而不是文件系统通配。
    #[serde(default)]
    pub full_discovery: bool,

    /// Seconds a test process may run before it is terminated.
    /// 测试进程被终止前允许运行的秒数。
    #[serde(default = "default_timeout_secs")]
    pub test_timeout_secs: u64,

    /// Directory names that root a test hierarchy, in priority order.
    #[serde(default = "default_test_roots")]
    pub test_roots: Vec<String>,

    /// Extension of test source files, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Shared helper file that is never treated as a test.
    #[serde(default = "default_helper_file")]
    pub helper_file: String,

    /// Any path containing this segment is ignored.
    #[serde(default = "default_excluded_segment")]
    pub excluded_segment: String,

    /// Command stored for every discovered file. `{file}` is replaced with the quoted path.
    #[serde(default)]
    pub file_command: Option<String>,

    /// Command for indexed examples that do not carry their own.
    /// Supports `{file}`, `{line}` (1-based), `{label}` and `{id}`.
    #[serde(default)]
    pub example_command: Option<String>,

    #[serde(default)]
    pub indexer: Option<IndexerConfig>,

    #[serde(default)]
    pub workspaces: Vec<WorkspaceConfig>,

    /// Extra environment for debug launches.
    #[serde(default = "default_debug_env")]
    pub debug_env: HashMap<String, String>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_test_roots() -> Vec<String> {
    vec!["test".to_string(), "spec".to_string(), "features".to_string()]
}

fn default_extension() -> String {
    "rb".to_string()
}

fn default_helper_file() -> String {
    "test_helper.rb".to_string()
}

fn default_excluded_segment() -> String {
    "fixtures".to_string()
}

fn default_debug_env() -> HashMap<String, String> {
    HashMap::from([("DISABLE_SPRING".to_string(), "1".to_string())])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: default_language(),
            full_discovery: false,
            test_timeout_secs: default_timeout_secs(),
            test_roots: default_test_roots(),
            extension: default_extension(),
            helper_file: default_helper_file(),
            excluded_segment: default_excluded_segment(),
            file_command: None,
            example_command: None,
            indexer: None,
            workspaces: Vec::new(),
            debug_env: default_debug_env(),
        }
    }
}

impl Config {
    /// Reads and validates a configuration file, returning it with its canonical path.
    pub fn load(path: &Path) -> Result<(Self, PathBuf)> {
        let config_path = fs::canonicalize(path)
            .with_context(|| t!("config.read_failed", path = path.display()).to_string())?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| t!("config.read_failed", path = config_path.display()).to_string())?;
        let config = Self::from_toml_str(&content)
            .with_context(|| t!("config.parse_failed", path = config_path.display()).to_string())?;
        Ok((config, config_path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.test_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "test_timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.test_roots.is_empty() || self.test_roots.iter().any(|r| r.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                message: "test_roots must list at least one non-empty directory name".to_string(),
            });
        }
        if self.extension.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "extension must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs)
    }

    pub fn layout(&self) -> TestLayout {
        TestLayout {
            test_roots: self.test_roots.clone(),
            extension: self.extension.clone(),
            helper_file: self.helper_file.clone(),
            excluded_segment: self.excluded_segment.clone(),
            file_command: self.file_command.clone(),
            example_command: self.example_command.clone(),
        }
    }

    /// Resolves the configured workspaces against `base_dir`. With none
    /// configured, `base_dir` itself is the only workspace.
    pub fn workspaces(&self, base_dir: &Path) -> Result<Workspaces, ConfigError> {
        if self.workspaces.is_empty() {
            let root = canonical_root(base_dir)?;
            return Ok(Workspaces::new(vec![Workspace::new(dir_name(&root), root)]));
        }

        let mut resolved = Vec::with_capacity(self.workspaces.len());
        for ws in &self.workspaces {
            let expanded = shellexpand::full(&ws.root).map_err(|e| ConfigError::Expand {
                path: ws.root.clone(),
                message: e.to_string(),
            })?;
            let root = canonical_root(&base_dir.join(expanded.as_ref()))?;
            let name = ws.name.clone().unwrap_or_else(|| dir_name(&root));
            resolved.push(Workspace {
                name,
                root,
                env: ws.env.clone(),
            });
        }
        Ok(Workspaces::new(resolved))
    }
}

fn canonical_root(path: &Path) -> Result<PathBuf, ConfigError> {
    fs::canonicalize(path).map_err(|_| ConfigError::MissingWorkspace {
        path: path.to_path_buf(),
    })
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
