//! Persisted generation runs.
//!
//! A file holds three parallel lists with one nested list per run:
//!
//! ```json
//! { "h": [["<hash>", ...], ...], "s": [["<seed>", ...], ...], "b": [[{...}, ...], ...] }
//! ```
//!
//! `h` and `b` follow block order. `s` holds the distinct seeds the run's
//! accounts were derived from, sorted.

use std::collections::BTreeSet;
use std::path::Path;

use nanomock_types::{BlockHash, JsonBlock};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::BlockgenError;
use crate::result::BlockResult;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFile {
    pub h: Vec<Vec<BlockHash>>,
    pub s: Vec<Vec<String>>,
    pub b: Vec<Vec<JsonBlock>>,
}

impl BlockFile {
    /// Collect runs. Refuses any run containing a failed block.
    pub fn from_runs(runs: &[Vec<BlockResult>]) -> Result<Self, BlockgenError> {
        let total: usize = runs.iter().map(Vec::len).sum();
        let failed = runs.iter().flatten().filter(|r| !r.success).count();
        if failed > 0 {
            return Err(BlockgenError::FailedBlocks { failed, total });
        }

        let mut file = Self::default();
        for run in runs {
            let mut hashes = Vec::with_capacity(run.len());
            let mut blocks = Vec::with_capacity(run.len());
            let mut seeds = BTreeSet::new();
            for result in run {
                match (&result.hash, &result.block) {
                    (Some(hash), Some(block)) => {
                        hashes.push(*hash);
                        blocks.push(block.clone());
                    }
                    _ => {
                        return Err(BlockgenError::BlockFile(format!(
                            "block of {} has no hash or body",
                            result.account()
                        )))
                    }
                }
                if let Some(seed) = &result.account_data.source_seed {
                    seeds.insert(seed.clone());
                }
            }
            file.h.push(hashes);
            file.s.push(seeds.into_iter().collect());
            file.b.push(blocks);
        }
        Ok(file)
    }

    pub fn block_count(&self) -> usize {
        self.h.iter().map(Vec::len).sum()
    }
}

pub fn write_block_file(path: impl AsRef<Path>, runs: &[Vec<BlockResult>]) -> Result<BlockFile, BlockgenError> {
    let path = path.as_ref();
    let file = BlockFile::from_runs(runs)?;
    let json = serde_json::to_vec(&file).map_err(|e| BlockgenError::BlockFile(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| BlockgenError::BlockFile(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), runs = runs.len(), blocks = file.block_count(), "wrote block file");
    Ok(file)
}

pub fn read_block_file(path: impl AsRef<Path>) -> Result<BlockFile, BlockgenError> {
    let path = path.as_ref();
    let content =
        std::fs::read(path).map_err(|e| BlockgenError::BlockFile(format!("{}: {e}", path.display())))?;
    let file: BlockFile =
        serde_json::from_slice(&content).map_err(|e| BlockgenError::BlockFile(e.to_string()))?;
    if file.h.len() != file.b.len() || file.h.iter().zip(&file.b).any(|(h, b)| h.len() != b.len()) {
        return Err(BlockgenError::BlockFile("hash and block lists differ in length".into()));
    }
    Ok(file)
}
