// CLI module - command-line argument parsing and handlers
//
// `hive` with no subcommand runs the TUI. Config management subcommands:
// - config --show: Display effective configuration
// - config --reset: Regenerate config file with defaults
// - config --edit: Open config file in $EDITOR
// - config --update: Rewrite config with the current layout, keeping values

use crate::config::{Config, VERSION};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

/// hive - supervise many coding agents from one terminal
#[derive(Parser)]
#[command(name = "hive")]
#[command(version = VERSION)]
#[command(about = "Supervise concurrent coding agents from one terminal", long_about = None)]
pub struct Cli {
    /// Agent command for new sessions (overrides config)
    #[arg(long)]
    pub program: Option<String>,

    /// Auto-accept agent prompts for every session
    #[arg(long)]
    pub auto_yes: bool,

    /// Repository to open; repeat for a multi-repo view
    #[arg(long = "repo", value_name = "PATH")]
    pub repos: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Open config file in $EDITOR
        #[arg(long)]
        edit: bool,

        /// Update config with new defaults (preserves user values)
        #[arg(long)]
        update: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

/// Options that shape a TUI run
#[derive(Debug, Default)]
pub struct RunArgs {
    pub program: Option<String>,
    pub auto_yes: bool,
    pub repos: Vec<PathBuf>,
}

impl RunArgs {
    /// Fold command-line overrides into the loaded config
    pub fn apply(&self, config: &mut Config) {
        if let Some(program) = &self.program {
            config.default_program = program.clone();
        }
        if self.auto_yes {
            config.auto_yes = true;
        }
    }
}

/// Handle CLI commands. Returns the run options when the TUI should start,
/// or None when a subcommand was handled and the process should exit.
pub fn handle_cli() -> Option<RunArgs> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config {
            show,
            reset,
            edit,
            update,
            path,
        }) => {
            if path {
                handle_config_path();
            } else if show {
                handle_config_show();
            } else if reset {
                handle_config_reset();
            } else if edit {
                handle_config_edit();
            } else if update {
                handle_config_update();
            } else {
                println!("Usage: hive config [--show|--reset|--edit|--update|--path]");
                println!();
                println!("Options:");
                println!("  --show    Display effective configuration");
                println!("  --reset   Reset config file to defaults");
                println!("  --edit    Open config file in $EDITOR");
                println!("  --update  Update config with new defaults (preserves user values)");
                println!("  --path    Show config file path");
            }
            None
        }
        None => Some(RunArgs {
            program: cli.program,
            auto_yes: cli.auto_yes,
            repos: cli.repos,
        }),
    }
}

fn config_path_or_exit() -> PathBuf {
    match Config::config_path() {
        Some(path) => path,
        None => {
            eprintln!("Error: Could not determine config path");
            std::process::exit(1);
        }
    }
}

fn handle_config_path() {
    println!("{}", config_path_or_exit().display());
}

fn handle_config_show() {
    let config = Config::from_env();

    println!("# Effective configuration (env > file > defaults)");
    println!();
    println!("default_program = {:?}", config.default_program);
    println!("auto_yes = {}", config.auto_yes);
    println!("instance_limit = {}", config.instance_limit);
    println!("branch_prefix = {:?}", config.branch_prefix);
    println!("console_shell = {:?}", config.console_shell);
    println!("data_dir = {:?}", config.data_dir.display().to_string());
    println!();
    println!("[timing]");
    println!("preview_tick_ms = {}", config.timing.preview_tick_ms);
    println!("metadata_tick_ms = {}", config.timing.metadata_tick_ms);
    println!("keyup_ms = {}", config.timing.keyup_ms);
    println!("error_clear_ms = {}", config.timing.error_clear_ms);
    println!("prompt_delay_ms = {}", config.timing.prompt_delay_ms);
    println!();
    println!("[logging]");
    println!("level = {:?}", config.logging.level);
    println!("file_enabled = {}", config.logging.file_enabled);
    for name in config.integration_names() {
        let integration = &config.integrations[&name];
        println!();
        println!("[integrations.{}]", name);
        println!("command = {:?}", integration.command);
        println!("enabled = {}", integration.enabled);
    }

    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
}

fn handle_config_reset() {
    let path = config_path_or_exit();

    if path.exists() {
        eprint!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        );
        let _ = std::io::stderr().flush();

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input).is_err()
            || !input.trim().eq_ignore_ascii_case("y")
        {
            println!("Aborted.");
            return;
        }
    }

    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Error creating directory: {}", e);
            std::process::exit(1);
        }
    }

    if let Err(e) = std::fs::write(&path, Config::default().to_toml()) {
        eprintln!("Error writing config: {}", e);
        std::process::exit(1);
    }

    println!("Config reset to defaults: {}", path.display());
}

fn handle_config_edit() {
    let path = config_path_or_exit();

    if !path.exists() {
        Config::ensure_config_exists();
        println!("Created new config file: {}", path.display());
    }

    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| "vi".to_string());

    println!("Opening {} with {}", path.display(), editor);

    match Command::new(&editor).arg(&path).status() {
        Ok(s) if s.success() => {}
        Ok(s) => {
            eprintln!("Editor exited with status: {}", s);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed to launch editor '{}': {}", editor, e);
            eprintln!("Set $EDITOR environment variable to your preferred editor");
            std::process::exit(1);
        }
    }
}

fn handle_config_update() {
    let path = config_path_or_exit();

    if !path.exists() {
        Config::ensure_config_exists();
        println!("Created new config file: {}", path.display());
        return;
    }

    let updated = Config::from_env().to_toml();

    let backup_path = path.with_extension("toml.bak");
    if let Err(e) = std::fs::copy(&path, &backup_path) {
        eprintln!("Warning: Could not create backup: {}", e);
    } else {
        println!("Backup created: {}", backup_path.display());
    }

    if let Err(e) = std::fs::write(&path, updated) {
        eprintln!("Error writing config: {}", e);
        std::process::exit(1);
    }

    println!("Config updated with latest structure: {}", path.display());
    println!("Your values have been preserved.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_repo_flags_collect() {
        let cli = Cli::try_parse_from(["hive", "--repo", "/a", "--repo", "/b", "--auto-yes"]).unwrap();
        assert_eq!(cli.repos, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert!(cli.auto_yes);
        assert!(cli.command.is_none());
    }

    #[test]
    fn run_args_override_config() {
        let mut config = Config::default();
        RunArgs {
            program: Some("aider".to_string()),
            auto_yes: true,
            repos: vec![],
        }
        .apply(&mut config);
        assert_eq!(config.default_program, "aider");
        assert!(config.auto_yes);
    }
}
