//! System clipboard access for the "Copy worktree path" and "Copy branch
//! name" menu entries.

use anyhow::{Context, Result};
use arboard::Clipboard;

/// Copy text to the system clipboard.
///
/// Fails without a display server (headless Linux, plain SSH sessions).
/// A fresh handle is opened per call; nothing is held between copies.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = Clipboard::new().context("clipboard unavailable")?;
    clipboard
        .set_text(text)
        .context("failed to write to clipboard")?;
    Ok(())
}
