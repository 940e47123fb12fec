//! # Controller
//!
//! Thin dispatcher from parsed commands to trie operations. Every insert
//! and remove produces a one-line outcome; searches report the visit count
//! and each match; prints emit the trie rendering followed by the
//! free-block list and the buffer-pool block IDs. All output goes to a
//! caller-supplied writer so the binary can point it at stdout and tests
//! can capture it.

use std::io::{BufRead, Write};

use eyre::{Result, WrapErr};

use crate::command::{parse_line, Command, ParsedLine};
use crate::config::SEQUENCE_CROP_LENGTH;
use crate::sequence::DnaSequence;
use crate::trie::{DnaTrie, InsertOutcome, RemoveOutcome};

pub struct Controller {
    trie: DnaTrie,
}

impl Controller {
    pub fn new(trie: DnaTrie) -> Self {
        Self { trie }
    }

    pub fn trie(&self) -> &DnaTrie {
        &self.trie
    }

    pub fn trie_mut(&mut self) -> &mut DnaTrie {
        &mut self.trie
    }

    /// Cleanly closes the underlying store, flushing all dirty buffers.
    pub fn close(self) -> Result<()> {
        self.trie.close()
    }

    /// Reads commands from `input` line by line, executing each and
    /// reporting malformed lines, until end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        for (i, line) in input.lines().enumerate() {
            let line = line.wrap_err("failed to read command file")?;
            match parse_line(&line, i + 1) {
                ParsedLine::Empty => {}
                ParsedLine::Invalid(report) => {
                    writeln!(out, "{report}")?;
                }
                ParsedLine::Command(command) => self.execute(command, out)?,
            }
        }
        Ok(())
    }

    /// Executes one command, writing its report to `out`.
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        match command {
            Command::Insert(seq) => self.insert(&seq, out),
            Command::Remove(seq) => self.remove(&seq, out),
            Command::Search {
                query,
                exact,
                display,
            } => self.search(&query, exact, &display, out),
            Command::Print(mode) => {
                let rendered = self.trie.render(mode)?;
                write!(out, "{rendered}")?;
                writeln!(out, "Free Blocks:")?;
                writeln!(out, "{}", self.trie.manager().free_blocks_render())?;
                writeln!(out, "BufferPool IDs:")?;
                let ids: Vec<String> = self
                    .trie
                    .manager()
                    .block_ids()
                    .iter()
                    .map(u64::to_string)
                    .collect();
                writeln!(out, "{}", ids.join(", "))?;
                Ok(())
            }
        }
    }

    fn insert<W: Write>(&mut self, seq: &DnaSequence, out: &mut W) -> Result<()> {
        match self.trie.insert(seq)? {
            InsertOutcome::Inserted {
                stored_bytes,
                chars,
                address,
            } => writeln!(
                out,
                "Successfully inserted new record \"{seq}\" of {stored_bytes} bytes \
                 ({chars} characters) starting at position {address}"
            )?,
            InsertOutcome::Duplicate => {
                writeln!(out, "INSERT: Cannot insert duplicate record \"{seq}\".")?
            }
            InsertOutcome::InvalidSequence => writeln!(
                out,
                "Unable to insert record \"{}\" (sequence does not contain any \
                 valid DNA characters)",
                crop(seq.as_str())
            )?,
            InsertOutcome::OutOfSpace => writeln!(
                out,
                "Unable to insert record \"{}\" (insufficient free space)",
                crop(seq.as_str())
            )?,
        }
        Ok(())
    }

    fn remove<W: Write>(&mut self, seq: &DnaSequence, out: &mut W) -> Result<()> {
        match self.trie.remove(seq)? {
            RemoveOutcome::Removed {
                stored_bytes,
                chars,
                address,
            } => writeln!(
                out,
                "Deleted old record \"{seq}\" of {stored_bytes} bytes \
                 ({chars} characters) from position {address}"
            )?,
            RemoveOutcome::NotFound => writeln!(
                out,
                "Unable to delete record \"{}\" (no such sequence)",
                crop(seq.as_str())
            )?,
        }
        Ok(())
    }

    fn search<W: Write>(
        &mut self,
        query: &DnaSequence,
        exact: bool,
        display: &str,
        out: &mut W,
    ) -> Result<()> {
        let outcome = self.trie.search(query, exact)?;
        writeln!(out, "Nodes visited: {}", outcome.nodes_visited)?;
        if outcome.matches.is_empty() {
            writeln!(out, "sequence \"{display}\" not found")?;
        } else {
            for matched in &outcome.matches {
                writeln!(out, "sequence: {matched}")?;
            }
        }
        Ok(())
    }
}

/// Crops overlong sequences in report lines to keep output readable.
fn crop(seq: &str) -> String {
    if seq.len() > SEQUENCE_CROP_LENGTH {
        format!(
            "{}... ({} characters)",
            &seq[..SEQUENCE_CROP_LENGTH],
            seq.len()
        )
    } else {
        seq.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::storage::MemManager;

    fn controller_in(dir: &tempfile::TempDir) -> Controller {
        let config = StoreConfig {
            pool_size: 256,
            block_size: 64,
            buffers: 4,
            ..StoreConfig::default()
        };
        let (manager, resume) = MemManager::open(&dir.path().join("c.pool"), &config).unwrap();
        Controller::new(DnaTrie::open(manager, resume).unwrap())
    }

    fn run_script(controller: &mut Controller, script: &str) -> String {
        let mut out = Vec::new();
        controller.run(script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn insert_reports_bytes_characters_and_position() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_in(&dir);

        let out = run_script(&mut controller, "insert AAAA\n");

        assert!(
            out.contains("Successfully inserted new record \"AAAA\" of 3 bytes (4 characters)"),
            "{out}"
        );
        assert!(out.contains("starting at position"), "{out}");
    }

    #[test]
    fn duplicate_insert_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_in(&dir);

        let out = run_script(&mut controller, "insert AAAA\ninsert AAAA\n");

        assert!(
            out.contains("INSERT: Cannot insert duplicate record \"AAAA\"."),
            "{out}"
        );
    }

    #[test]
    fn remove_reports_symmetrically_with_insert() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_in(&dir);

        let out = run_script(&mut controller, "insert CGCG\nremove CGCG\nremove CGCG\n");

        assert!(out.contains("Deleted old record \"CGCG\""), "{out}");
        assert!(
            out.contains("Unable to delete record \"CGCG\" (no such sequence)"),
            "{out}"
        );
    }

    #[test]
    fn search_reports_visits_and_matches() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_in(&dir);

        let out = run_script(
            &mut controller,
            "insert AAAA\ninsert AACG\nsearch AA\nsearch TTTT$\n",
        );

        assert!(out.contains("Nodes visited:"), "{out}");
        assert!(out.contains("sequence: AAAA"), "{out}");
        assert!(out.contains("sequence: AACG"), "{out}");
        assert!(out.contains("sequence \"TTTT$\" not found"), "{out}");
    }

    #[test]
    fn print_emits_tree_free_blocks_and_buffer_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_in(&dir);

        let out = run_script(&mut controller, "insert AAAA\nprint\n");

        assert!(out.contains("AAAA\n"), "{out}");
        assert!(out.contains("Free Blocks:"), "{out}");
        assert!(out.contains("BufferPool IDs:"), "{out}");
    }

    #[test]
    fn malformed_lines_are_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_in(&dir);

        let out = run_script(
            &mut controller,
            "frobnicate\ninsert\ninsert AXGT\n\ninsert ACGT\n",
        );

        assert!(out.contains("Command \"frobnicate\" not recognized"), "{out}");
        assert!(out.contains("INSERT, line 2"), "{out}");
        assert!(out.contains("invalid sequence \"AXGT\""), "{out}");
        assert!(
            out.contains("Successfully inserted new record \"ACGT\""),
            "{out}"
        );
    }

    #[test]
    fn overlong_sequences_are_cropped_in_failure_reports() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller_in(&dir);

        let long_seq = "A".repeat(80);
        let out = run_script(&mut controller, &format!("remove {long_seq}\n"));

        assert!(out.contains("... (80 characters)"), "{out}");
        assert!(!out.contains(&long_seq), "{out}");
    }
}
