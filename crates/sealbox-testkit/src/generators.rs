//! Proptest generators for property-based testing.

use proptest::prelude::*;

use sealbox_core::BLOCK_SIZE;

/// Arbitrary content up to `max_len` bytes.
pub fn content(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Content whose length is an exact multiple of the padding block,
/// including zero.
pub fn block_aligned_content(max_blocks: usize) -> impl Strategy<Value = Vec<u8>> {
    (0..=max_blocks).prop_flat_map(|blocks| {
        prop::collection::vec(any::<u8>(), blocks * BLOCK_SIZE..=blocks * BLOCK_SIZE)
    })
}

/// Content biased toward padding edge cases: empty, one short of a block,
/// exactly a block, and arbitrary.
pub fn edge_content() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        Just(Vec::new()),
        prop::collection::vec(any::<u8>(), BLOCK_SIZE - 1..=BLOCK_SIZE - 1),
        block_aligned_content(4),
        content(512),
    ]
}

/// A sequence of appends, each possibly empty.
pub fn appends(max_parts: usize, max_len: usize) -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(content(max_len), 0..=max_parts)
}

/// Any filename, including empty and non-ASCII.
pub fn filename() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "\\PC{0,24}".prop_map(String::from)]
}

/// A username; distinct case variants are distinct users.
pub fn username() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_]{0,15}".prop_map(String::from)
}
