//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Serialize integrations HashMap to TOML sections
    pub(super) fn integrations_to_toml(&self) -> String {
        if self.integrations.is_empty() {
            // Show example comments when nothing is configured
            return r#"
# [integrations.lazygit]
# command = "lazygit"
# enabled = true
"#
            .to_string();
        }

        let mut output = String::from("\n");
        for name in self.integration_names() {
            let integration = &self.integrations[&name];
            output.push_str(&format!("[integrations.{}]\n", name));
            output.push_str(&format!("command = {:?}\n", integration.command));
            output.push_str(&format!("enabled = {}\n", integration.enabled));
            output.push('\n');
        }
        output
    }

    /// Render the full config file
    pub fn to_toml(&self) -> String {
        format!(
            r#"# hive configuration

# Agent command new sessions run (HIVE_PROGRAM overrides)
default_program = {program:?}

# Auto-accept agent prompts for every session
auto_yes = {auto_yes}

# Maximum number of sessions across all repositories
instance_limit = {limit}

# Prefix for per-session branches
branch_prefix = {prefix:?}

# Shell launched in the shell pane
console_shell = {shell:?}

# Where sessions, topics and recent repositories are stored (HIVE_DATA_DIR overrides)
data_dir = {data_dir:?}

# Background timers, in milliseconds
[timing]
preview_tick_ms = {preview}
metadata_tick_ms = {metadata}
keyup_ms = {keyup}
error_clear_ms = {error_clear}
prompt_delay_ms = {prompt_delay}

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = "{log_level}"
# JSON file logging (in addition to the TUI log buffer)
file_enabled = {log_file_enabled}
file_dir = {log_file_dir:?}
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = "{log_file_prefix}"

# ─────────────────────────────────────────────────────────────────────────────
# INTEGRATIONS
# ─────────────────────────────────────────────────────────────────────────────
# External tools shown in the integrations overlay (press 'I').
{integrations}"#,
            program = self.default_program,
            auto_yes = self.auto_yes,
            limit = self.instance_limit,
            prefix = self.branch_prefix,
            shell = self.console_shell,
            data_dir = self.data_dir.display().to_string(),
            preview = self.timing.preview_tick_ms,
            metadata = self.timing.metadata_tick_ms,
            keyup = self.timing.keyup_ms,
            error_clear = self.timing.error_clear_ms,
            prompt_delay = self.timing.prompt_delay_ms,
            log_level = self.logging.level,
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = self.logging.file_dir.display().to_string(),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = self.logging.file_prefix,
            integrations = self.integrations_to_toml(),
        )
    }
}
