//! Program sources for the Vole machine.
//!
//! A program file is plain text:
//! - One four-hex-digit word per line
//! - Lines starting with `;` are comments
//! - Blank lines are ignored
//!
//! Interactive entry reads the same words one line at a time and stops at
//! the `C000` halt word.

use std::path::Path;
use std::io::Write;
use thiserror::Error;

/// The conventional HALT word that ends interactive entry.
pub const HALT_WORD: &str = "C000";

/// The word interactive entry refuses.
pub const ZERO_WORD: &str = "0000";

/// Check that `word` is exactly four hexadecimal digits.
pub fn is_hex_word(word: &str) -> bool {
    word.len() == 4 && word.chars().all(|c| c.is_ascii_hexdigit())
}

/// Split program text into words.
///
/// Words are taken verbatim (after trimming); checking them is left to the
/// machine when it fetches them.
pub fn parse_program(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';'))
        .map(str::to_string)
        .collect()
}

/// Load a program file from disk.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<Vec<String>, ProgramError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;
    Ok(parse_program(&text))
}

/// Save program words to disk, one per line.
pub fn save_program<P: AsRef<Path>, S: AsRef<str>>(path: P, words: &[S]) -> Result<(), ProgramError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;

    writeln!(file, "; Vole program")
        .map_err(|e| ProgramError::IoError(e.to_string()))?;
    writeln!(file, "; {} words", words.len())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;

    for word in words {
        writeln!(file, "{}", word.as_ref())
            .map_err(|e| ProgramError::IoError(e.to_string()))?;
    }

    Ok(())
}

/// Outcome of feeding one line to an [`EntrySession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// The word was added; keep reading.
    Accepted,
    /// The halt word was added and entry is over.
    Finished,
}

/// Line-by-line program entry.
///
/// `C000` (any case) closes the session and is kept as the final word so
/// the program halts. `0000` and anything that is not four hex digits is
/// refused without ending the session.
#[derive(Debug, Clone, Default)]
pub struct EntrySession {
    words: Vec<String>,
    finished: bool,
}

impl EntrySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer one line of input.
    pub fn push(&mut self, line: &str) -> Result<Entry, ProgramError> {
        if self.finished {
            return Err(ProgramError::EntryClosed);
        }

        let word = line.trim().to_uppercase();
        if !is_hex_word(&word) {
            return Err(ProgramError::Rejected {
                word,
                reason: "expected four hexadecimal digits",
            });
        }
        if word == ZERO_WORD {
            return Err(ProgramError::Rejected {
                word,
                reason: "0000 is not allowed",
            });
        }

        let finished = word == HALT_WORD;
        self.words.push(word);

        if finished {
            self.finished = true;
            Ok(Entry::Finished)
        } else {
            Ok(Entry::Accepted)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn into_words(self) -> Vec<String> {
        self.words
    }
}

/// Errors that can occur while reading a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("invalid instruction {word:?}: {reason}")]
    Rejected { word: String, reason: &'static str },

    #[error("entry already finished")]
    EntryClosed,
}
