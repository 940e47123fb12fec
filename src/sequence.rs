//! # DNA Sequences and Their Packed Encoding
//!
//! A [`DnaSequence`] wraps a validated string over the alphabet {A, C, G, T}.
//! Sequences are stored on disk in a packed 2-bit-per-base big-endian
//! encoding:
//!
//! | Base | Bits |
//! |------|------|
//! | A    | `00` |
//! | C    | `01` |
//! | G    | `10` |
//! | T    | `11` |
//!
//! The packed bits are treated as one big-endian integer and leading zero
//! bytes are elided, so a run of leading `A` bases occupies no storage at
//! all. Decoding therefore needs the sequence's literal character count to
//! know how many leading zero bits to restore; that count is persisted in
//! the trie leaf that owns the payload.
//!
//! The `$` terminator that drives trie navigation is purely a convention of
//! the tree; it is never encoded into payload bits.

use eyre::{ensure, Result};

/// Branch characters in fixed child order: A, C, G, T, `$`.
pub const BASE_A: u8 = b'A';
pub const BASE_C: u8 = b'C';
pub const BASE_G: u8 = b'G';
pub const BASE_T: u8 = b'T';
pub const TERMINATOR: u8 = b'$';

/// A validated DNA sequence over {A, C, G, T}.
///
/// The wrapped string never contains the terminator; operations that need a
/// `$`-terminated key for trie navigation call [`DnaSequence::terminated`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnaSequence {
    bases: String,
}

impl DnaSequence {
    /// Wraps `input` as a sequence, rejecting any character outside
    /// {A, C, G, T}. The empty sequence is representable; whether it is
    /// storable is the trie's decision.
    pub fn new(input: &str) -> Result<Self> {
        for (i, b) in input.bytes().enumerate() {
            ensure!(
                matches!(b, BASE_A | BASE_C | BASE_G | BASE_T),
                "invalid DNA character {:?} at position {}",
                b as char,
                i
            );
        }
        Ok(Self {
            bases: input.to_owned(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.bases
    }

    pub fn into_string(self) -> String {
        self.bases
    }

    /// Number of base characters, excluding any terminator.
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// The `$`-terminated key used for trie navigation.
    pub fn terminated(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.bases.len() + 1);
        key.extend_from_slice(self.bases.as_bytes());
        key.push(TERMINATOR);
        key
    }

    /// Packs the sequence into its big-endian 2-bit encoding with leading
    /// zero bytes elided. Returns `None` for the empty sequence, which has
    /// no encodable content.
    pub fn encode(&self) -> Option<Vec<u8>> {
        let n = self.bases.len();
        if n == 0 {
            return None;
        }
        let total_bits = 2 * n;
        let len = total_bits.div_ceil(8);
        let mut buf = vec![0u8; len];
        // Left-pad so the packed value is right-aligned; the pad is always
        // an even number of bits, so a 2-bit group never straddles a byte.
        let mut bit = len * 8 - total_bits;
        for &b in self.bases.as_bytes() {
            let code = match b {
                BASE_A => 0u8,
                BASE_C => 1,
                BASE_G => 2,
                BASE_T => 3,
                _ => unreachable!("sequence validated at construction"),
            };
            buf[bit / 8] |= code << (6 - (bit % 8));
            bit += 2;
        }
        let lead = buf
            .iter()
            .position(|&x| x != 0)
            .unwrap_or(buf.len() - 1);
        buf.drain(..lead);
        Some(buf)
    }

    /// Reconstructs a sequence of `literal_len` bases from its packed
    /// encoding, restoring elided leading zeros (leading `A` runs).
    ///
    /// Extra leading zero bytes in `bytes` are tolerated; bits beyond what
    /// `literal_len` accounts for are ignored.
    pub fn decode(bytes: &[u8], literal_len: usize) -> Self {
        let avail_bits = bytes.len() * 8;
        let mut bases = String::with_capacity(literal_len);
        for i in 0..literal_len {
            // Bit offset of this base's pair, counted from the value's
            // least significant bit: the final base occupies bits 1..=0.
            let off = 2 * (literal_len - 1 - i);
            let pair = if off + 2 <= avail_bits {
                let byte = bytes[bytes.len() - 1 - off / 8];
                (byte >> (off % 8)) & 0b11
            } else {
                0
            };
            bases.push(match pair {
                0 => 'A',
                1 => 'C',
                2 => 'G',
                _ => 'T',
            });
        }
        Self { bases }
    }

    /// Base-occurrence statistics as percentages with two decimal places,
    /// e.g. `A(50.00), C(12.50), G(25.00), T(12.50)`.
    pub fn stats(&self) -> String {
        let total = self.bases.len() as f64;
        let mut counts = [0usize; 4];
        for b in self.bases.bytes() {
            match b {
                BASE_A => counts[0] += 1,
                BASE_C => counts[1] += 1,
                BASE_G => counts[2] += 1,
                _ => counts[3] += 1,
            }
        }
        let pct = |c: usize| {
            if total == 0.0 {
                0.0
            } else {
                c as f64 / total * 100.0
            }
        };
        format!(
            "A({:.2}), C({:.2}), G({:.2}), T({:.2})",
            pct(counts[0]),
            pct(counts[1]),
            pct(counts[2]),
            pct(counts[3])
        )
    }
}

impl std::fmt::Display for DnaSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.bases)
    }
}

/// Child-slot index for a navigation character, in the fixed order
/// A, C, G, T, `$`. Returns `None` for any other byte.
pub fn branch_index(ch: u8) -> Option<usize> {
    match ch {
        BASE_A => Some(0),
        BASE_C => Some(1),
        BASE_G => Some(2),
        BASE_T => Some(3),
        TERMINATOR => Some(4),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_characters() {
        assert!(DnaSequence::new("ACGT").is_ok());
        assert!(DnaSequence::new("ACXT").is_err());
        assert!(DnaSequence::new("acgt").is_err());
        assert!(DnaSequence::new("ACGT$").is_err());
    }

    #[test]
    fn empty_sequence_has_no_encoding() {
        let seq = DnaSequence::new("").unwrap();
        assert!(seq.encode().is_none());
    }

    #[test]
    fn encodes_two_bits_per_base() {
        let seq = DnaSequence::new("ACGT").unwrap();
        assert_eq!(seq.encode().unwrap(), vec![0b0001_1011]);

        let seq = DnaSequence::new("TTTT").unwrap();
        assert_eq!(seq.encode().unwrap(), vec![0xFF]);
    }

    #[test]
    fn leading_a_run_is_elided() {
        // AAAA packs to the zero value: a single zero byte.
        let seq = DnaSequence::new("AAAA").unwrap();
        assert_eq!(seq.encode().unwrap(), vec![0x00]);

        // AAAACGT: only the trailing bases carry set bits.
        let seq = DnaSequence::new("AACGT").unwrap();
        assert_eq!(seq.encode().unwrap(), vec![0b0001_1011]);
    }

    #[test]
    fn decode_restores_leading_as() {
        let encoded = DnaSequence::new("AACGT").unwrap().encode().unwrap();
        let decoded = DnaSequence::decode(&encoded, 5);
        assert_eq!(decoded.as_str(), "AACGT");

        let encoded = DnaSequence::new("AAAA").unwrap().encode().unwrap();
        let decoded = DnaSequence::decode(&encoded, 4);
        assert_eq!(decoded.as_str(), "AAAA");
    }

    #[test]
    fn round_trips_assorted_sequences() {
        for s in [
            "A",
            "T",
            "CGCG",
            "ACGTACGTACGT",
            "AAAAAAAAAAAAAAAAT",
            "GATTACA",
            "TTTTTTTTTTTTTTTTTTTTTTTTTTTTTTTTT",
        ] {
            let seq = DnaSequence::new(s).unwrap();
            let encoded = seq.encode().unwrap();
            assert_eq!(DnaSequence::decode(&encoded, s.len()).as_str(), s, "{s}");
        }
    }

    #[test]
    fn decode_tolerates_extra_leading_zero_bytes() {
        let mut encoded = DnaSequence::new("CGCG").unwrap().encode().unwrap();
        encoded.insert(0, 0);
        assert_eq!(DnaSequence::decode(&encoded, 4).as_str(), "CGCG");
    }

    #[test]
    fn terminated_appends_dollar() {
        let seq = DnaSequence::new("ACG").unwrap();
        assert_eq!(seq.terminated(), b"ACG$");
    }

    #[test]
    fn stats_reports_percentages() {
        let seq = DnaSequence::new("AAAAGGTC").unwrap();
        assert_eq!(seq.stats(), "A(50.00), C(12.50), G(25.00), T(12.50)");
    }

    #[test]
    fn branch_index_follows_child_order() {
        assert_eq!(branch_index(b'A'), Some(0));
        assert_eq!(branch_index(b'C'), Some(1));
        assert_eq!(branch_index(b'G'), Some(2));
        assert_eq!(branch_index(b'T'), Some(3));
        assert_eq!(branch_index(b'$'), Some(4));
        assert_eq!(branch_index(b'X'), None);
    }
}
