use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use log::warn;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::utils::shutdown::CancellationToken;
use crate::visualization::presenter::DisplayModel;
use crate::visualization::widgets::draw_dashboard;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Whatever paints a [`DisplayModel`] once per tick.
pub trait RenderBackend {
    fn render(&mut self, model: &DisplayModel) -> Result<(), RenderError>;

    /// Waits out the rest of a tick. Backends that read input do it here.
    fn idle(&mut self, timeout: Duration) -> Result<(), RenderError> {
        std::thread::sleep(timeout);
        Ok(())
    }
}

/// Full-screen crossterm terminal. The terminal is put back into cooked mode
/// when this value drops, on every exit path.
pub struct TerminalBackend {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    token: CancellationToken,
}

impl TerminalBackend {
    pub fn new(token: CancellationToken) -> Result<Self, RenderError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        or_restore(stdout.execute(EnterAlternateScreen).map(|_| ()), || {
            let _ = disable_raw_mode();
        })?;

        // Until `Self` exists there is no Drop to fall back on.
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = or_restore(Terminal::new(backend), restore_terminal)?;
        or_restore(terminal.hide_cursor(), restore_terminal)?;

        Ok(Self { terminal, token })
    }

    fn handle_key(&self, code: KeyCode, modifiers: KeyModifiers) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.token.cancel(),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => self.token.cancel(),
            _ => {}
        }
    }
}

impl RenderBackend for TerminalBackend {
    fn render(&mut self, model: &DisplayModel) -> Result<(), RenderError> {
        self.terminal.draw(|f| draw_dashboard(f, model))?;
        Ok(())
    }

    fn idle(&mut self, timeout: Duration) -> Result<(), RenderError> {
        // Raw mode swallows SIGINT, so ctrl-c arrives here as a key event.
        let token = self.token.clone();
        let next_event = |wait: Duration| -> io::Result<Option<Event>> {
            if event::poll(wait)? {
                event::read().map(Some)
            } else {
                Ok(None)
            }
        };

        wait_for_input(timeout, &token, next_event, |event| {
            if let Event::Key(key) = event {
                if key.kind == KeyEventKind::Press {
                    self.handle_key(key.code, key.modifiers);
                }
            }
        })?;
        Ok(())
    }
}

impl Drop for TerminalBackend {
    fn drop(&mut self) {
        restore_terminal();
        if let Err(e) = self.terminal.show_cursor() {
            warn!("Failed to restore cursor: {}", e);
        }
    }
}

/// Runs `restore` when a setup step fails.
fn or_restore<T>(result: io::Result<T>, restore: impl FnOnce()) -> Result<T, RenderError> {
    result.map_err(|e| {
        restore();
        RenderError::from(e)
    })
}

/// Feeds input events to `on_event` until `timeout` has fully elapsed, so a burst
/// of input cannot shorten the tick. Returns early once the token is cancelled.
fn wait_for_input(
    timeout: Duration,
    token: &CancellationToken,
    mut next_event: impl FnMut(Duration) -> io::Result<Option<Event>>,
    mut on_event: impl FnMut(Event),
) -> io::Result<()> {
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() || token.is_cancelled() {
            return Ok(());
        }
        if let Some(event) = next_event(remaining)? {
            on_event(event);
        }
    }
}

fn restore_terminal() {
    if let Err(e) = disable_raw_mode() {
        warn!("Failed to leave raw mode: {}", e);
    }
    if let Err(e) = io::stdout().execute(LeaveAlternateScreen) {
        warn!("Failed to leave alternate screen: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;
    use std::cell::Cell;

    #[test]
    fn test_failed_setup_step_restores() {
        let restored = Cell::new(false);
        let result: Result<(), RenderError> = or_restore(
            Err(io::Error::new(io::ErrorKind::Other, "cursor write failed")),
            || restored.set(true),
        );
        assert!(matches!(result, Err(RenderError::Io(_))));
        assert!(restored.get());

        let restored = Cell::new(false);
        assert_eq!(or_restore(Ok(7), || restored.set(true)).unwrap(), 7);
        assert!(!restored.get());
    }

    #[test]
    fn test_input_burst_does_not_shorten_wait() {
        let token = CancellationToken::new();
        let timeout = Duration::from_millis(40);
        let mut seen = 0;

        let start = Instant::now();
        wait_for_input(
            timeout,
            &token,
            |_| Ok(Some(Event::Resize(80, 24))),
            |_| seen += 1,
        )
        .unwrap();

        assert!(start.elapsed() >= timeout);
        assert!(seen > 1);
    }

    #[test]
    fn test_wait_stops_once_cancelled() {
        let token = CancellationToken::new();
        let handle = token.clone();
        let mut seen = 0;

        let start = Instant::now();
        wait_for_input(
            Duration::from_secs(5),
            &token,
            |_| Ok(Some(Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)))),
            |_| {
                seen += 1;
                handle.cancel();
            },
        )
        .unwrap();

        assert_eq!(seen, 1);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_input_errors_propagate() {
        let token = CancellationToken::new();
        let result = wait_for_input(
            Duration::from_secs(1),
            &token,
            |_| Err(io::Error::new(io::ErrorKind::Other, "tty gone")),
            |_| {},
        );
        assert!(result.is_err());
    }
}
