//! # Trie Node Codec
//!
//! Every trie node lives in the pool as a small byte record; this module
//! defines the in-memory variants and their byte images. The first byte of
//! an image is a tag selecting the variant:
//!
//! ```text
//! Empty     [0xFE]                                              1 byte
//! Leaf      [0x01, literal_len: u16 BE, payload: u32 BE]        7 bytes
//! Internal  [0x00, A C G T $ child handles, each u32 BE]       21 bytes
//! ```
//!
//! All five child handles of an internal node are serialized as
//! independent big-endian fields. An unknown tag or a truncated image is a
//! decode error and treated as store corruption by the caller.

use eyre::{bail, ensure, eyre, Result};
use zerocopy::byteorder::{BigEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::storage::Handle;

pub const TAG_INTERNAL: u8 = 0x00;
pub const TAG_LEAF: u8 = 0x01;
pub const TAG_EMPTY: u8 = 0xFE;

/// Number of children per internal node: A, C, G, T, `$`.
pub const CHILD_COUNT: usize = 5;

/// An in-memory trie node. Internal nodes hold child *handles*, never
/// child values; the node graph on disk is connected purely by pool
/// offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrieNode {
    /// The empty flyweight. Exactly one empty-node record exists on disk;
    /// every vacant child slot references it.
    Empty,
    /// A stored sequence: the handle of its packed payload record and its
    /// literal base count (used to restore elided leading bits).
    Leaf { payload: Handle, literal_len: u16 },
    /// A five-way branch, children in the fixed order A, C, G, T, `$`.
    Internal { children: [Handle; CHILD_COUNT] },
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
struct LeafImage {
    tag: u8,
    literal_len: U16<BigEndian>,
    payload: U32<BigEndian>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
struct InternalImage {
    tag: u8,
    children: [U32<BigEndian>; CHILD_COUNT],
}

impl TrieNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self, TrieNode::Leaf { .. })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TrieNode::Empty)
    }

    /// An internal node with every child slot pointing at the flyweight.
    pub fn vacant_internal(flyweight: Handle) -> Self {
        TrieNode::Internal {
            children: [flyweight; CHILD_COUNT],
        }
    }

    /// Serializes this node to its byte image.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            TrieNode::Empty => vec![TAG_EMPTY],
            TrieNode::Leaf {
                payload,
                literal_len,
            } => {
                let image = LeafImage {
                    tag: TAG_LEAF,
                    literal_len: U16::new(*literal_len),
                    payload: U32::new(payload.addr()),
                };
                image.as_bytes().to_vec()
            }
            TrieNode::Internal { children } => {
                let image = InternalImage {
                    tag: TAG_INTERNAL,
                    children: children.map(|h| U32::new(h.addr())),
                };
                image.as_bytes().to_vec()
            }
        }
    }

    /// Decodes a byte image, switching on the tag byte.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        ensure!(!bytes.is_empty(), "empty trie node image");
        match bytes[0] {
            TAG_EMPTY => {
                ensure!(
                    bytes.len() == 1,
                    "empty-node image has trailing bytes ({})",
                    bytes.len()
                );
                Ok(TrieNode::Empty)
            }
            TAG_LEAF => {
                let image = LeafImage::ref_from_bytes(bytes)
                    .map_err(|e| eyre!("malformed leaf image: {:?}", e))?;
                Ok(TrieNode::Leaf {
                    payload: Handle::new(image.payload.get()),
                    literal_len: image.literal_len.get(),
                })
            }
            TAG_INTERNAL => {
                let image = InternalImage::ref_from_bytes(bytes)
                    .map_err(|e| eyre!("malformed internal-node image: {:?}", e))?;
                Ok(TrieNode::Internal {
                    children: image.children.map(|h| Handle::new(h.get())),
                })
            }
            tag => bail!("unknown trie node tag {:#04x}", tag),
        }
    }
}
