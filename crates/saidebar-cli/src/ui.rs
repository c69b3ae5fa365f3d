//! Console rendering of session events

use parking_lot::Mutex;
use saidebar_core::{Presenter, SidebarEvent};
use std::io::{self, IsTerminal, Write};

/// Prints session events to stdout/stderr as they arrive.
///
/// Draft updates carry the full text so far; only the part not yet printed
/// is written, so a streamed reply appears incrementally.
pub struct ConsolePresenter {
    /// Chars of the current draft already on screen
    shown: Mutex<usize>,
    show_status: bool,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self {
            shown: Mutex::new(0),
            show_status: io::stderr().is_terminal(),
        }
    }
}

impl Default for ConsolePresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter for ConsolePresenter {
    fn present(&self, event: SidebarEvent) {
        let mut stdout = io::stdout();
        match event {
            SidebarEvent::UserMessage { .. } => {}
            SidebarEvent::LoadingStarted => {
                if self.show_status {
                    eprint!("...");
                    io::stderr().flush().ok();
                }
            }
            SidebarEvent::LoadingFinished => {
                if self.show_status {
                    eprint!("\r   \r");
                    io::stderr().flush().ok();
                }
            }
            SidebarEvent::DraftStarted => {
                *self.shown.lock() = 0;
            }
            SidebarEvent::DraftUpdated { text } => {
                let mut shown = self.shown.lock();
                if let Some(suffix) = unseen_suffix(&text, &mut shown) {
                    print!("{}", suffix);
                    stdout.flush().ok();
                }
            }
            SidebarEvent::DraftFinalized => {
                println!();
                *self.shown.lock() = 0;
            }
            SidebarEvent::DraftDiscarded => {
                let mut shown = self.shown.lock();
                if *shown > 0 {
                    println!(" [discarded]");
                }
                *shown = 0;
            }
            SidebarEvent::Error { message } => {
                eprintln!("{}", message);
            }
            SidebarEvent::ConversationReset => {
                println!("[new conversation]");
                *self.shown.lock() = 0;
            }
        }
    }
}

/// The part of `text` past the first `shown` chars, advancing `shown`.
///
/// `None` when nothing new arrived.
fn unseen_suffix<'a>(text: &'a str, shown: &mut usize) -> Option<&'a str> {
    let (start, _) = text.char_indices().nth(*shown)?;
    *shown = text.chars().count();
    Some(&text[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unseen_suffix() {
        let mut shown = 0;
        assert_eq!(unseen_suffix("Hel", &mut shown), Some("Hel"));
        assert_eq!(unseen_suffix("Hello", &mut shown), Some("lo"));
        assert_eq!(unseen_suffix("Hello", &mut shown), None);
        assert_eq!(shown, 5);
    }

    #[test]
    fn test_unseen_suffix_counts_chars() {
        let mut shown = 0;
        assert_eq!(unseen_suffix("caf", &mut shown), Some("caf"));
        assert_eq!(unseen_suffix("café ☕", &mut shown), Some("é ☕"));
        assert_eq!(shown, 6);
    }
}
