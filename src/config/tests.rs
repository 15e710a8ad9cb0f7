//! Configuration tests
//!
//! Guards that the template written by `to_toml` parses back into the same
//! values, so adding a field without serializing it fails here.

use super::*;

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip tests
// ─────────────────────────────────────────────────────────────────────────────

fn parse(toml_str: &str) -> FileConfig {
    match toml::from_str(toml_str) {
        Ok(parsed) => parsed,
        Err(e) => panic!("Config should round-trip.\nTOML:\n{}\nError: {:?}", toml_str, e),
    }
}

#[test]
fn test_config_roundtrip_default() {
    let config = Config::default();
    let file = parse(&config.to_toml());

    assert_eq!(file.default_program.as_deref(), Some("claude"));
    assert_eq!(file.instance_limit, Some(10));
    assert_eq!(file.branch_prefix.as_deref(), Some("session/"));
    assert!(file.integrations.is_empty());
}

#[test]
fn test_config_roundtrip_preserves_every_field() {
    let mut config = Config::default();
    config.default_program = "aider --yes".to_string();
    config.auto_yes = true;
    config.instance_limit = 4;
    config.branch_prefix = "agents/".to_string();
    config.console_shell = "/usr/bin/zsh".to_string();
    config.data_dir = PathBuf::from("/tmp/hive data");
    config.timing.preview_tick_ms = 250;
    config.timing.prompt_delay_ms = 0;
    config.logging.level = "debug".to_string();
    config.logging.file_enabled = true;
    config.logging.file_rotation = LogRotation::Hourly;
    config.integrations.insert(
        "lazygit".to_string(),
        Integration {
            command: "lazygit".to_string(),
            enabled: true,
        },
    );
    config.integrations.insert(
        "gh-dash".to_string(),
        Integration {
            command: "gh dash".to_string(),
            enabled: false,
        },
    );

    let back = Config::from_file_config(parse(&config.to_toml()));

    // default_program is env-overridable; only compare when the env is clean
    if std::env::var("HIVE_PROGRAM").is_err() {
        assert_eq!(back.default_program, config.default_program);
    }
    if std::env::var("HIVE_DATA_DIR").is_err() {
        assert_eq!(back.data_dir, config.data_dir);
    }
    assert!(back.auto_yes);
    assert_eq!(back.instance_limit, 4);
    assert_eq!(back.branch_prefix, "agents/");
    assert_eq!(back.console_shell, "/usr/bin/zsh");
    assert_eq!(back.timing, config.timing);
    assert_eq!(back.logging.level, "debug");
    assert!(back.logging.file_enabled);
    assert_eq!(back.logging.file_rotation, LogRotation::Hourly);
    assert_eq!(back.integrations, config.integrations);
}

#[test]
fn test_integrations_serialize_sorted() {
    let mut config = Config::default();
    for name in ["zeta", "alpha"] {
        config.integrations.insert(
            name.to_string(),
            Integration {
                command: name.to_string(),
                enabled: true,
            },
        );
    }
    let toml_str = config.integrations_to_toml();
    let alpha = toml_str.find("[integrations.alpha]").unwrap();
    let zeta = toml_str.find("[integrations.zeta]").unwrap();
    assert!(alpha < zeta);
}

// ─────────────────────────────────────────────────────────────────────────────
// Defaults and sanitizing
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_zero_values_fall_back_to_defaults() {
    let file = parse(
        r#"
instance_limit = 0

[timing]
preview_tick_ms = 0
metadata_tick_ms = 0
prompt_delay_ms = 0
"#,
    );
    let config = Config::from_file_config(file);
    assert_eq!(config.instance_limit, 10);
    assert_eq!(config.timing.preview_tick_ms, 100);
    assert_eq!(config.timing.metadata_tick_ms, 500);
    // A zero prompt delay is allowed: send immediately
    assert_eq!(config.timing.prompt_delay_ms, 0);
}

#[test]
fn test_unknown_rotation_defaults_to_daily() {
    assert_eq!(LogRotation::from_str("weekly"), LogRotation::Daily);
    assert_eq!(LogRotation::from_str("HOURLY"), LogRotation::Hourly);
}

#[test]
fn test_empty_file_uses_defaults() {
    let config = Config::from_file_config(parse(""));
    assert_eq!(config.instance_limit, 10);
    assert_eq!(config.timing, TimingConfig::default());
    assert_eq!(config.logging.file_prefix, "hive");
}
