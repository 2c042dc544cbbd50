//! Interactive yes/no gate in front of bulk operations

use crate::item::Item;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal;
use std::io::Write;
use tracing::warn;

/// Asks whether an operation on `items` may proceed
pub trait Confirmation: Send + Sync {
    fn confirm(&self, items: &[Item], description: &str) -> bool;
}

/// Fixed answer, for headless runs (`--yes`) and tests
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirmation for AutoConfirm {
    fn confirm(&self, _items: &[Item], _description: &str) -> bool {
        self.0
    }
}

/// Lists the items and reads a single keypress from the terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirmation;

impl Confirmation for TerminalConfirmation {
    fn confirm(&self, items: &[Item], description: &str) -> bool {
        if items.is_empty() {
            return false;
        }

        println!("\n{}:", description);
        println!("{}", "-".repeat(60));
        for item in items {
            println!(
                "{} - {}/{}/{}",
                item.display_name(),
                item.cloud.to_uppercase(),
                item.account(),
                item.location()
            );
        }
        println!("{}", "-".repeat(60));
        println!("Total: {} item(s)", items.len());

        print!("\nContinue? (y/n): ");
        let _ = std::io::stdout().flush();

        let key = match read_key() {
            Ok(key) => key,
            Err(e) => {
                warn!("Could not read confirmation from terminal: {}", e);
                None
            }
        };
        println!("{}", key.map(String::from).unwrap_or_default());

        matches!(key, Some('y' | 'Y'))
    }
}

/// Restores cooked mode when dropped
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn read_key() -> std::io::Result<Option<char>> {
    let _guard = RawModeGuard::enable()?;
    loop {
        if let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        {
            return Ok(match code {
                KeyCode::Char(c) => Some(c),
                _ => None,
            });
        }
    }
}
