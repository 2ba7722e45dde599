//! Synthetic workload
//!
//! Each task derives a pseudo-random block from its id and hashes it. The
//! hash only exists to burn CPU in proportion to the block size; nothing
//! but its leading byte is ever looked at.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use sha2::{Digest as _, Sha256};

/// Zero-based identity of one unit of work
pub type TaskId = u64;

/// Length of a task digest in bytes
pub const DIGEST_LEN: usize = 32;

/// Output of hashing one block
pub type Digest = [u8; DIGEST_LEN];

/// Generate the input block for a task.
///
/// The generator is seeded with the task id, so the same `(id, size)` always
/// yields the same bytes and different ids yield unrelated blocks.
pub fn generate_block(id: TaskId, size: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(id);
    let mut block = vec![0u8; size];
    rng.fill_bytes(&mut block);
    block
}

/// Hash a block down to a fixed-size digest
pub fn digest(block: &[u8]) -> Digest {
    Sha256::digest(block).into()
}

/// Run one task end to end: generate its block and hash it
pub fn run_task(id: TaskId, block_size: usize) -> Digest {
    let block = generate_block(id, block_size);
    digest(&block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_block_is_deterministic() {
        let a = generate_block(42, 1024);
        let b = generate_block(42, 1024);
        assert_eq!(a, b);
        assert_eq!(a.len(), 1024);
    }

    #[test]
    fn test_generate_block_varies_with_id() {
        assert_ne!(generate_block(1, 512), generate_block(2, 512));
    }

    #[test]
    fn test_generate_block_prefix_stable_across_sizes() {
        // Longer blocks extend the same stream rather than reshuffling it
        let short = generate_block(7, 100);
        let long = generate_block(7, 1000);
        assert_eq!(&long[..100], &short[..]);
    }

    #[test]
    fn test_empty_block() {
        assert!(generate_block(3, 0).is_empty());
        assert_eq!(digest(&[]).len(), DIGEST_LEN);
    }

    #[test]
    fn test_digest_is_sha256() {
        let hex: String = digest(b"abc").iter().map(|b| format!("{:02x}", b)).collect();
        assert_eq!(
            hex,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_run_task_consistent() {
        let first = run_task(42, 1024);
        let second = run_task(42, 1024);
        assert_eq!(first, second);
        assert_eq!(first.len(), DIGEST_LEN);
    }

    #[test]
    fn test_run_task_diverges_for_distinct_ids() {
        for size in [1usize, 64, 512] {
            for id in 0..16u64 {
                assert_ne!(run_task(id, size), run_task(id + 1, size), "id {} size {}", id, size);
            }
        }
    }

    #[test]
    fn test_run_task_known_value() {
        assert_eq!(run_task(0, 1024)[0], 0xe0);
        assert_eq!(run_task(1, 1024)[0], 0x55);
    }
}
