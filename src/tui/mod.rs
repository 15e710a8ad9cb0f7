// TUI module - Terminal User Interface
//
// This module manages the terminal and the event loop. It handles:
// - Terminal initialization and cleanup
// - Reading keyboard, mouse and resize events
// - Feeding messages to the controller and running the tasks it returns
// - Handing the whole terminal to a session for zen mode

pub mod app;
pub mod clipboard;
pub mod components;
pub mod focus;
pub mod layout;
pub mod list;
pub mod modal;
pub mod msg;
pub mod state;
pub mod task;
pub mod theme;
pub mod views;

use crate::brain::ActionIntake;
use anyhow::{Context, Result};
use app::{App, TerminalRequest};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use msg::Msg;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;
use task::TaskRunner;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// How long one wait for terminal input may block the loop
const INPUT_POLL: Duration = Duration::from_millis(50);

/// Run the TUI
///
/// Sets up the terminal, runs the event loop until the controller asks to
/// quit, and restores the terminal even when the loop fails.
pub async fn run_tui(mut app: App, intake: ActionIntake, cancel: CancellationToken) -> Result<()> {
    let mut terminal = setup_terminal()?;

    let result = run_event_loop(&mut terminal, &mut app, intake, cancel.clone()).await;

    // Background tasks stop delivering once the token is cancelled
    cancel.cancel();
    restore_terminal(&mut terminal)?;

    result
}

fn setup_terminal() -> Result<Term> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to setup terminal")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Main event loop
///
/// Every message, whatever its source, goes through `App::update` one at a
/// time. Messages the controller marks as ready are handled before the next
/// terminal event; everything else arrives on the channel fed by background
/// tasks.
async fn run_event_loop(
    terminal: &mut Term,
    app: &mut App,
    intake: ActionIntake,
    cancel: CancellationToken,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let runner = TaskRunner::new(tx, cancel);
    let mut ready = VecDeque::new();

    let size = terminal.size().context("Failed to read terminal size")?;
    ready.push_back(Msg::Resize(size.width, size.height));
    runner.run(app.initial_tasks(intake), &mut ready);

    loop {
        while let Some(msg) = ready.pop_front() {
            let tasks = app.update(msg);
            runner.run(tasks, &mut ready);
        }
        if app.should_quit {
            break;
        }

        if let Some(TerminalRequest::Zen { id }) = app.take_terminal_request() {
            let result = zen(terminal, app, &id).await;
            ready.push_back(Msg::ZenFinished(result));
            continue;
        }

        terminal
            .draw(|f| views::draw(f, app))
            .context("Failed to draw terminal")?;

        tokio::select! {
            // Keyboard, mouse and resize input
            input = async {
                if event::poll(INPUT_POLL).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            } => {
                if let Some(msg) = input.and_then(input_msg) {
                    ready.push_back(msg);
                }
            }

            // Timers, background results, brain actions
            Some(msg) = rx.recv() => ready.push_back(msg),
        }
    }

    Ok(())
}

/// Translate a terminal event; key releases and repeats are dropped
fn input_msg(event: Event) -> Option<Msg> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(Msg::Key(key)),
        Event::Mouse(mouse) => Some(Msg::Mouse(mouse)),
        Event::Resize(width, height) => Some(Msg::Resize(width, height)),
        _ => None,
    }
}

/// Leave the alternate screen while a session owns the terminal
async fn zen(terminal: &mut Term, app: &App, id: &str) -> Result<()> {
    tracing::info!("Entering zen mode for {}", id);
    restore_terminal(terminal)?;

    let result = app.backend().zen(id).await;

    enable_raw_mode().context("Failed to enable raw mode")?;
    execute!(
        terminal.backend_mut(),
        EnterAlternateScreen,
        EnableMouseCapture
    )
    .context("Failed to setup terminal")?;
    terminal.clear().context("Failed to clear terminal")?;
    tracing::info!("Left zen mode for {}", id);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyEventState, KeyModifiers};

    #[test]
    fn key_releases_are_dropped() {
        let mut key = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::NONE);
        assert!(matches!(input_msg(Event::Key(key)), Some(Msg::Key(_))));

        key.kind = KeyEventKind::Release;
        key.state = KeyEventState::NONE;
        assert!(input_msg(Event::Key(key)).is_none());
    }

    #[test]
    fn resize_becomes_a_message() {
        assert!(matches!(
            input_msg(Event::Resize(100, 30)),
            Some(Msg::Resize(100, 30))
        ));
        assert!(input_msg(Event::FocusGained).is_none());
    }
}
