use std::io::{self, Write};

use crossterm::cursor::MoveToColumn;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};

/// Marker shown while the console is capturing a command line.
pub const PROMPT: &str = ">>> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleMode {
    /// Keystrokes are ignored, the child owns the terminal output.
    #[default]
    Passthrough,
    /// Keystrokes build a command line for the child.
    CommandEntry,
}

/// Effect of a key event, applied by the supervisor loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleAction {
    /// Forward the entered line to the child as a command.
    Submit(String),
    /// The prompt line needs redrawing (mode change, echo, empty submit).
    Redraw,
    /// Ctrl-C: tear the supervisor down.
    /// In raw mode Ctrl+C arrives as a keyboard event, not a signal.
    Interrupt,
    /// Nothing to do.
    Ignored,
}

/// Interactive command console multiplexed into the server process.
/// Only active when both debug and logging are enabled and stdin is a
/// terminal.
#[derive(Debug, Default)]
pub struct Console {
    mode: ConsoleMode,
    buffer: String,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ConsoleMode {
        self.mode
    }

    /// Mode transitions are edge-triggered by Tab and Escape; every
    /// other key leaves the mode unchanged.
    pub fn handle_key(&mut self, key: KeyEvent) -> ConsoleAction {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return ConsoleAction::Interrupt;
        }

        match self.mode {
            ConsoleMode::Passthrough => match key.code {
                KeyCode::Tab => {
                    self.mode = ConsoleMode::CommandEntry;
                    self.buffer.clear();
                    ConsoleAction::Redraw
                }
                _ => ConsoleAction::Ignored,
            },
            ConsoleMode::CommandEntry => match key.code {
                KeyCode::Esc => {
                    self.mode = ConsoleMode::Passthrough;
                    self.buffer.clear();
                    ConsoleAction::Redraw
                }
                KeyCode::Enter => {
                    let line = std::mem::take(&mut self.buffer);
                    if line.is_empty() {
                        ConsoleAction::Redraw
                    } else {
                        ConsoleAction::Submit(line)
                    }
                }
                KeyCode::Backspace => {
                    self.buffer.pop();
                    ConsoleAction::Redraw
                }
                KeyCode::Char(c) => {
                    self.buffer.push(c);
                    ConsoleAction::Redraw
                }
                _ => ConsoleAction::Ignored,
            },
        }
    }

    /// Redraw the prompt line for the current mode. Passthrough shows no
    /// marker, command entry shows the active marker plus the buffer.
    pub fn draw_prompt(&self) {
        let mut out = io::stdout();
        let _ = execute!(out, Clear(ClearType::CurrentLine), MoveToColumn(0));
        if self.mode == ConsoleMode::CommandEntry {
            let _ = write!(out, "{}{}", PROMPT, self.buffer);
        }
        let _ = out.flush();
    }
}
