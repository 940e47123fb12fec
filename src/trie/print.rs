//! Structural rendering of the trie.
//!
//! All three modes walk the tree depth-first in the fixed child order
//! A, C, G, T, `$`, indenting two spaces per depth level. Flyweights print
//! as `E`, internal nodes as `I`, and leaves as their sequence: plain, or
//! annotated with the literal length or base-frequency statistics.

use eyre::Result;

use super::{DnaTrie, TrieNode};
use crate::storage::Handle;

/// What to append after each leaf's sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    Plain,
    Lengths,
    Stats,
}

impl DnaTrie {
    /// Renders the whole tree in the given mode. Rendering is read-only:
    /// two consecutive renders with no intervening mutation are identical.
    pub fn render(&mut self, mode: PrintMode) -> Result<String> {
        let mut out = String::new();
        self.render_at(self.root(), 0, mode, &mut out)?;
        Ok(out)
    }

    fn render_at(
        &mut self,
        handle: Handle,
        depth: usize,
        mode: PrintMode,
        out: &mut String,
    ) -> Result<()> {
        for _ in 0..depth {
            out.push_str("  ");
        }
        match self.load(handle)? {
            TrieNode::Empty => out.push_str("E\n"),
            TrieNode::Leaf {
                payload,
                literal_len,
            } => {
                let seq = self.materialize(payload, literal_len)?;
                match mode {
                    PrintMode::Plain => out.push_str(&format!("{}\n", seq)),
                    PrintMode::Lengths => {
                        out.push_str(&format!("{}: length {}\n", seq, literal_len))
                    }
                    PrintMode::Stats => out.push_str(&format!("{} {}\n", seq, seq.stats())),
                }
            }
            TrieNode::Internal { children } => {
                out.push_str("I\n");
                for child in children {
                    self.render_at(child, depth + 1, mode, out)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::sequence::DnaSequence;
    use crate::storage::MemManager;

    fn trie_in(dir: &tempfile::TempDir) -> DnaTrie {
        let config = StoreConfig {
            pool_size: 256,
            block_size: 64,
            buffers: 4,
            ..StoreConfig::default()
        };
        let (manager, resume) = MemManager::open(&dir.path().join("p.pool"), &config).unwrap();
        DnaTrie::open(manager, resume).unwrap()
    }

    fn insert(trie: &mut DnaTrie, s: &str) {
        trie.insert(&DnaSequence::new(s).unwrap()).unwrap();
    }

    #[test]
    fn empty_tree_renders_as_single_e() {
        let dir = tempfile::tempdir().unwrap();
        let mut trie = trie_in(&dir);

        assert_eq!(trie.render(PrintMode::Plain).unwrap(), "E\n");
    }

    #[test]
    fn single_sequence_renders_as_root_leaf() {
        let dir = tempfile::tempdir().unwrap();
        let mut trie = trie_in(&dir);
        insert(&mut trie, "AAAA");

        assert_eq!(trie.render(PrintMode::Plain).unwrap(), "AAAA\n");
    }

    #[test]
    fn split_tree_renders_depth_first_with_indentation() {
        let dir = tempfile::tempdir().unwrap();
        let mut trie = trie_in(&dir);
        insert(&mut trie, "AAAA");
        insert(&mut trie, "AACG");

        // Shared prefix AA: internals at depths 0 and 1, leaves under the
        // A and C slots of the depth-2 branch.
        let expected = "\
I
  I
    I
      AAAA
      AACG
      E
      E
      E
    E
    E
    E
    E
  E
  E
  E
  E
";
        assert_eq!(trie.render(PrintMode::Plain).unwrap(), expected);
    }

    #[test]
    fn lengths_mode_appends_literal_length() {
        let dir = tempfile::tempdir().unwrap();
        let mut trie = trie_in(&dir);
        insert(&mut trie, "GATTACA");

        assert_eq!(
            trie.render(PrintMode::Lengths).unwrap(),
            "GATTACA: length 7\n"
        );
    }

    #[test]
    fn stats_mode_appends_base_frequencies() {
        let dir = tempfile::tempdir().unwrap();
        let mut trie = trie_in(&dir);
        insert(&mut trie, "AAAAGGTC");

        assert_eq!(
            trie.render(PrintMode::Stats).unwrap(),
            "AAAAGGTC A(50.00), C(12.50), G(25.00), T(12.50)\n"
        );
    }

    #[test]
    fn render_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut trie = trie_in(&dir);
        insert(&mut trie, "ACGT");
        insert(&mut trie, "ACCT");
        insert(&mut trie, "TTTT");

        let first = trie.render(PrintMode::Plain).unwrap();
        let second = trie.render(PrintMode::Plain).unwrap();
        assert_eq!(first, second);
    }
}
