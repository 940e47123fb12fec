//! # Command-File Parsing
//!
//! One command per line, whitespace separated:
//!
//! | Command  | Arguments             | Effect                          |
//! |----------|-----------------------|---------------------------------|
//! | `insert` | `<sequence>`          | store a sequence                |
//! | `remove` | `<sequence>`          | delete an exact-match sequence  |
//! | `search` | `<sequence>[$]`       | exact when `$`-terminated, else prefix |
//! | `print`  | none, `lengths`, `stats` | structural print             |
//!
//! Blank lines are skipped silently; unknown commands and malformed
//! arguments produce a report line and are skipped.

use crate::sequence::DnaSequence;
use crate::trie::PrintMode;

/// A fully validated command ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Insert(DnaSequence),
    Remove(DnaSequence),
    Search {
        query: DnaSequence,
        exact: bool,
        /// The sequence token as the user wrote it, for report lines.
        display: String,
    },
    Print(PrintMode),
}

/// Result of parsing one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Blank line; nothing to do.
    Empty,
    Command(Command),
    /// Malformed input; the payload is the report text.
    Invalid(String),
}

/// Parses `line` (1-based `line_no` is used in report text only).
pub fn parse_line(line: &str, line_no: usize) -> ParsedLine {
    let mut words = line.split_whitespace();
    let keyword = match words.next() {
        Some(word) => word,
        None => return ParsedLine::Empty,
    };

    match keyword {
        "insert" => match words.next() {
            Some(token) => match DnaSequence::new(token) {
                Ok(seq) => ParsedLine::Command(Command::Insert(seq)),
                Err(_) => ParsedLine::Invalid(format!(
                    "INSERT, line {line_no}: invalid sequence \"{token}\"; \
                     expecting characters A, C, G, T."
                )),
            },
            None => ParsedLine::Invalid(format!(
                "INSERT, line {line_no}: no DNA sequence specified; expecting String. \
                 Command usage: insert <DNAString>."
            )),
        },
        "remove" => match words.next() {
            Some(token) => match DnaSequence::new(token) {
                Ok(seq) => ParsedLine::Command(Command::Remove(seq)),
                Err(_) => ParsedLine::Invalid(format!(
                    "REMOVE, line {line_no}: invalid sequence \"{token}\"; \
                     expecting characters A, C, G, T."
                )),
            },
            None => ParsedLine::Invalid(format!(
                "REMOVE, line {line_no}: no DNA sequence specified; expecting String. \
                 Command usage: remove <DNAString>."
            )),
        },
        "search" => match words.next() {
            Some(token) => {
                let (bases, exact) = match token.strip_suffix('$') {
                    Some(prefix) => (prefix, true),
                    None => (token, false),
                };
                match DnaSequence::new(bases) {
                    Ok(query) => ParsedLine::Command(Command::Search {
                        query,
                        exact,
                        display: token.to_owned(),
                    }),
                    Err(_) => ParsedLine::Invalid(format!(
                        "SEARCH, line {line_no}: invalid sequence \"{token}\"; \
                         expecting characters A, C, G, T with an optional trailing $."
                    )),
                }
            }
            None => ParsedLine::Invalid(format!(
                "SEARCH, line {line_no}: no DNA sequence specified; expecting String. \
                 Command usage: search <sequenceDescriptor>."
            )),
        },
        "print" => match words.next() {
            None => ParsedLine::Command(Command::Print(PrintMode::Plain)),
            Some("lengths") => ParsedLine::Command(Command::Print(PrintMode::Lengths)),
            Some("stats") => ParsedLine::Command(Command::Print(PrintMode::Stats)),
            Some(request) => ParsedLine::Invalid(format!(
                "Print request \"{request}\" not recognized. Call with no request, \
                 \"stats\", or \"lengths\"."
            )),
        },
        _ => ParsedLine::Invalid(format!(
            "Command \"{keyword}\" not recognized on line {line_no}"
        )),
    }
}
