//! Full-screen terminal surface.
//!
//! The render loop drives this surface: `present` stores the newest frame and
//! redraws, `idle` polls the keyboard for at most the given timeout. Pausing
//! freezes the displayed frame while ingestion keeps running underneath.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;

use sensorscope_core::SensorVariant;
use sensorscope_core::render::{Control, RenderFrame, RenderTickError, Surface};

/// Redraw interval bounds for the `+`/`-` keys.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);
pub const MAX_INTERVAL: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

/// Everything the drawing code reads. Independent of the terminal so it can
/// be rendered onto a test backend.
#[derive(Debug, Clone)]
pub struct View {
    pub variant: SensorVariant,
    pub topic: String,
    pub interval: Duration,
    pub paused: bool,
    pub frame: Option<RenderFrame>,
}

impl View {
    pub fn new(variant: SensorVariant, topic: &str, interval: Duration) -> Self {
        Self {
            variant,
            topic: topic.to_string(),
            interval,
            paused: false,
            frame: None,
        }
    }

    /// Apply a key press. Returns what the render loop should do.
    pub fn handle_key(&mut self, key: KeyEvent) -> Control {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Control::Stop,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Control::Stop,
            KeyCode::Char('p') | KeyCode::Char(' ') => {
                self.paused = !self.paused;
                Control::Continue
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.set_interval(self.interval / 2),
            KeyCode::Char('-') | KeyCode::Char('_') => self.set_interval(self.interval * 2),
            _ => Control::Continue,
        }
    }

    fn set_interval(&mut self, interval: Duration) -> Control {
        let interval = interval.clamp(MIN_INTERVAL, MAX_INTERVAL);
        if interval == self.interval {
            return Control::Continue;
        }
        self.interval = interval;
        Control::SetInterval(interval)
    }
}

// ---------------------------------------------------------------------------
// Terminal surface
// ---------------------------------------------------------------------------

pub struct TerminalSurface {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    view: View,
    active: bool,
}

impl TerminalSurface {
    /// Switch to the alternate screen in raw mode.
    pub fn enter(variant: SensorVariant, topic: &str, interval: Duration) -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        // Install panic hook that restores terminal before printing the panic.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let mut surface = Self {
            terminal,
            view: View::new(variant, topic, interval),
            active: true,
        };
        surface.redraw()?;
        Ok(surface)
    }

    /// Restore the terminal. Idempotent.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        let _ = std::panic::take_hook(); // remove our hook
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;
        Ok(())
    }

    fn redraw(&mut self) -> io::Result<()> {
        let view = &self.view;
        self.terminal.draw(|f| super::ui::draw(f, view))?;
        Ok(())
    }
}

impl Surface for TerminalSurface {
    fn present(&mut self, frame: &RenderFrame) -> Result<(), RenderTickError> {
        if self.view.paused {
            // Keep the frozen window, but let the title follow the session.
            if let Some(shown) = &mut self.view.frame {
                shown.status = frame.status.clone();
            }
        } else {
            self.view.frame = Some(frame.clone());
        }
        self.redraw()?;
        Ok(())
    }

    fn idle(&mut self, timeout: Duration) -> Result<Control, RenderTickError> {
        if !event::poll(timeout)? {
            return Ok(Control::Continue);
        }
        let control = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.view.handle_key(key),
            Event::Resize(_, _) => Control::Continue,
            _ => return Ok(Control::Continue),
        };
        if control != Control::Stop {
            self.redraw()?;
        }
        Ok(control)
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn view() -> View {
        View::new(SensorVariant::Climate, "esp32/0ad3/tx", Duration::from_secs(1))
    }

    #[test]
    fn quit_keys_stop() {
        let mut v = view();
        assert_eq!(v.handle_key(key(KeyCode::Char('q'))), Control::Stop);
        assert_eq!(v.handle_key(key(KeyCode::Esc)), Control::Stop);
        assert_eq!(
            v.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Control::Stop
        );
        assert_eq!(v.handle_key(key(KeyCode::Char('c'))), Control::Continue);
    }

    #[test]
    fn p_toggles_pause() {
        let mut v = view();
        v.handle_key(key(KeyCode::Char('p')));
        assert!(v.paused);
        v.handle_key(key(KeyCode::Char('p')));
        assert!(!v.paused);
    }

    #[test]
    fn interval_keys_halve_and_double_within_bounds() {
        let mut v = view();
        assert_eq!(
            v.handle_key(key(KeyCode::Char('+'))),
            Control::SetInterval(Duration::from_millis(500))
        );
        assert_eq!(
            v.handle_key(key(KeyCode::Char('-'))),
            Control::SetInterval(Duration::from_secs(1))
        );

        for _ in 0..10 {
            v.handle_key(key(KeyCode::Char('+')));
        }
        assert_eq!(v.interval, MIN_INTERVAL);
        assert_eq!(v.handle_key(key(KeyCode::Char('+'))), Control::Continue);

        for _ in 0..20 {
            v.handle_key(key(KeyCode::Char('-')));
        }
        assert_eq!(v.interval, MAX_INTERVAL);
    }
}
