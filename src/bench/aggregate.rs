//! Order-independent result folding
//!
//! The sink is the XOR of every digest's leading byte. XOR is associative
//! and commutative with identity 0, so the fold can consume digests in
//! whatever order workers produce them and still match the sequential run.

use crate::bench::workload::Digest;

/// Single-byte accumulator for digests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sink {
    value: u8,
    absorbed: u64,
}

impl Sink {
    /// Create an empty sink (value 0)
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one digest into the sink
    pub fn absorb(&mut self, digest: &Digest) {
        self.value ^= digest[0];
        self.absorbed += 1;
    }

    /// Current folded value
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Number of digests folded so far
    pub fn absorbed(&self) -> u64 {
        self.absorbed
    }
}

/// Fold a sequence of digests into a sink value
pub fn fold_digests<'a, I>(digests: I) -> u8
where
    I: IntoIterator<Item = &'a Digest>,
{
    digests
        .into_iter()
        .fold(Sink::new(), |mut sink, digest| {
            sink.absorb(digest);
            sink
        })
        .value()
}
