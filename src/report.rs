//! Human output decorations.
//!
//! Emoji markers are suppressed when stdout is not a terminal or when
//! `GANTRY_NO_COLOR` is set, so piped output stays plain ASCII.

use std::io::IsTerminal;

pub struct Style {
    decorated: bool,
}

impl Style {
    pub fn detect() -> Self {
        let decorated =
            std::env::var_os("GANTRY_NO_COLOR").is_none() && std::io::stdout().is_terminal();
        Self { decorated }
    }

    pub fn plain() -> Self {
        Self { decorated: false }
    }

    pub fn header(&self, emoji: &str, title: &str) -> String {
        if self.decorated {
            format!("{emoji} {title}")
        } else {
            title.to_string()
        }
    }

    pub fn ok(&self) -> &'static str {
        if self.decorated {
            "✓"
        } else {
            "+"
        }
    }

    pub fn warn(&self) -> &'static str {
        if self.decorated {
            "⚠"
        } else {
            "!"
        }
    }

    pub fn fail(&self) -> &'static str {
        if self.decorated {
            "✗"
        } else {
            "x"
        }
    }
}
