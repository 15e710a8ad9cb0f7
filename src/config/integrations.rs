//! External tool integrations
//!
//! Each `[integrations.<name>]` table names a command the operator can
//! enable per run from the integrations overlay.

use serde::Deserialize;

/// One configured integration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Integration {
    /// Command line to run
    pub command: String,

    /// Enabled at startup
    #[serde(default)]
    pub enabled: bool,
}
