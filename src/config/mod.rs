//! Configuration for the session controller
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/hive/config.toml)
//! 3. Built-in defaults (lowest priority)

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod integrations;
mod observability;
mod serialization;
mod timing;

#[cfg(test)]
mod tests;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports
// ─────────────────────────────────────────────────────────────────────────────

pub use integrations::Integration;
pub use observability::{FileLogging, LogRotation, LoggingConfig};
pub use timing::{FileTiming, TimingConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_PROGRAM: &str = "claude";
const DEFAULT_INSTANCE_LIMIT: usize = 10;
const DEFAULT_BRANCH_PREFIX: &str = "session/";
const FALLBACK_SHELL: &str = "/bin/bash";

/// ~/.config/hive, falling back to the working directory without a home
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".config").join("hive"))
        .unwrap_or_else(|| PathBuf::from(".hive"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Agent command new sessions run
    pub default_program: String,

    /// Auto-accept agent prompts for every session
    pub auto_yes: bool,

    /// Ceiling on sessions across all repositories
    pub instance_limit: usize,

    /// Prefix for per-session branches
    pub branch_prefix: String,

    /// Shell launched in the shell pane
    pub console_shell: String,

    /// Where instances.json, topics.json and state.json live
    pub data_dir: PathBuf,

    /// Background timer periods
    pub timing: TimingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// External tools listed in the integrations overlay
    pub integrations: HashMap<String, Integration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_program: DEFAULT_PROGRAM.to_string(),
            auto_yes: false,
            instance_limit: DEFAULT_INSTANCE_LIMIT,
            branch_prefix: DEFAULT_BRANCH_PREFIX.to_string(),
            console_shell: FALLBACK_SHELL.to_string(),
            data_dir: config_dir(),
            timing: TimingConfig::default(),
            logging: LoggingConfig::default(),
            integrations: HashMap::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub default_program: Option<String>,
    pub auto_yes: Option<bool>,
    pub instance_limit: Option<usize>,
    pub branch_prefix: Option<String>,
    pub console_shell: Option<String>,
    pub data_dir: Option<String>,

    /// Optional [timing] section
    pub timing: Option<FileTiming>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,

    /// Optional [integrations.X] sections
    #[serde(default)]
    pub integrations: HashMap<String, Integration>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/hive/config.toml
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("hive").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Config is optional
            }
        }

        let template = Self::default().to_toml();
        let _ = std::fs::write(&path, template);
    }

    /// Load file config if it exists
    ///
    /// A config file that exists but does not parse is fatal: the process
    /// prints what went wrong and exits with status 1.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                    eprintln!("║  CONFIG ERROR - Failed to parse configuration file          ║");
                    eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                    eprintln!("  File: {}\n", path.display());
                    eprintln!("  Error: {}\n", e);
                    eprintln!("  Tip: Check for:\n");
                    eprintln!("    - Missing quotes around string values");
                    eprintln!("    - Invalid boolean values (use true/false)");
                    eprintln!("    - Integration tables written as [integrations] instead of [integrations.name]\n");
                    eprintln!("  To reset, run `hive config --reset`.\n");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                eprintln!("║  CONFIG ERROR - Cannot read configuration file              ║");
                eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                eprintln!("  File: {}\n", path.display());
                eprintln!("  Error: {}\n", e);
                std::process::exit(1);
            }
        }
    }

    /// Load configuration: env vars > file > defaults
    pub fn from_env() -> Self {
        Self::from_file_config(Self::load_file_config())
    }

    pub(crate) fn from_file_config(file: FileConfig) -> Self {
        // Program: env > file > default
        let default_program = std::env::var("HIVE_PROGRAM")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or(file.default_program)
            .unwrap_or_else(|| DEFAULT_PROGRAM.to_string());

        let auto_yes = file.auto_yes.unwrap_or(false);

        // Zero would make every create fail; treat it as unset
        let instance_limit = file
            .instance_limit
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_INSTANCE_LIMIT);

        let branch_prefix = file
            .branch_prefix
            .unwrap_or_else(|| DEFAULT_BRANCH_PREFIX.to_string());

        // Shell: file > $SHELL > fallback
        let console_shell = file
            .console_shell
            .or_else(|| std::env::var("SHELL").ok())
            .unwrap_or_else(|| FALLBACK_SHELL.to_string());

        // Data directory: env > file > default
        let data_dir = std::env::var("HIVE_DATA_DIR")
            .ok()
            .or(file.data_dir)
            .map(PathBuf::from)
            .unwrap_or_else(config_dir);

        Self {
            default_program,
            auto_yes,
            instance_limit,
            branch_prefix,
            console_shell,
            data_dir,
            timing: TimingConfig::from_file(file.timing),
            logging: LoggingConfig::from_file(file.logging),
            integrations: file.integrations,
        }
    }

    /// Integration names in display order
    pub fn integration_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.integrations.keys().cloned().collect();
        names.sort();
        names
    }
}
