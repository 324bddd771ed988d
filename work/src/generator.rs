//! PoW generation (multi-threaded CPU).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use nanomock_types::WorkNonce;
use rayon::prelude::*;

use crate::validator::work_value;
use crate::WorkError;

/// Batch size per thread before checking the stop flags.
const BATCH_SIZE: u64 = 4096;

/// Generates proof-of-work using all available CPU cores.
///
/// This is a blocking call; async callers run it on a blocking thread.
#[derive(Clone, Debug, Default)]
pub struct WorkGenerator {
    cancelled: Arc<AtomicBool>,
}

impl WorkGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort any generation in progress (and every later one).
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Find a nonce whose work value against `root` meets `min_difficulty`.
    ///
    /// The nonce space is strided across rayon's threads; the first thread to
    /// find a valid nonce signals the others to stop.
    pub fn generate(&self, root: &[u8; 32], min_difficulty: u64) -> Result<WorkNonce, WorkError> {
        if min_difficulty == 0 {
            return Ok(WorkNonce(0));
        }

        let found = AtomicU64::new(u64::MAX);
        let done = AtomicBool::new(false);
        let num_threads = rayon::current_num_threads().max(1) as u64;

        (0..num_threads).into_par_iter().for_each(|thread_id| {
            let mut nonce = thread_id;
            loop {
                if done.load(Ordering::Relaxed) || self.cancelled.load(Ordering::Relaxed) {
                    return;
                }
                for _ in 0..BATCH_SIZE {
                    if work_value(root, nonce) >= min_difficulty {
                        if !done.swap(true, Ordering::AcqRel) {
                            found.store(nonce, Ordering::Release);
                        }
                        return;
                    }
                    nonce = nonce.wrapping_add(num_threads);
                }
            }
        });

        if done.load(Ordering::Acquire) {
            Ok(WorkNonce(found.load(Ordering::Acquire)))
        } else {
            Err(WorkError::Cancelled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::validate_work;

    #[test]
    fn generated_work_validates() {
        let root = [0x42; 32];
        let nonce = WorkGenerator::new().generate(&root, 1 << 60).unwrap();
        assert!(validate_work(&root, nonce.0, 1 << 60));
    }

    #[test]
    fn zero_difficulty_short_circuits() {
        let nonce = WorkGenerator::new().generate(&[0; 32], 0).unwrap();
        assert_eq!(nonce, WorkNonce(0));
    }

    #[test]
    fn cancelled_generator_gives_up() {
        let generator = WorkGenerator::new();
        generator.cancel();
        assert_eq!(
            generator.generate(&[7; 32], u64::MAX),
            Err(WorkError::Cancelled)
        );
    }
}
