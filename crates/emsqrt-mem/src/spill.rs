//! Spill-to-storage for operators that must exceed their memory budget in a
//! bounded way: external sort runs, grace hash join partitions, and (via
//! `RightSideStore`, see `emsqrt-operators::join::merge`) overflow of the
//! merge join's right-side blocks is intentionally NOT routed through here —
//! the join subsystem enforces a hard ceiling instead of spilling, per its
//! `SizeLimits` contract.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use emsqrt_core::budget::MemoryBudget;
use emsqrt_core::id::SpillId;
use emsqrt_core::types::RowBatch;

use crate::error::{Error, Result};
use crate::guard::BudgetGuardImpl;

/// Storage abstraction a spill manager writes segments through. `emsqrt-io`
/// implements this for the local filesystem; object-store backends are
/// future implementations of the same trait.
pub trait Storage: Send + Sync {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;
    fn read(&self, path: &str) -> Result<Vec<u8>>;
    fn delete(&self, path: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    None,
    Zstd,
    Lz4,
}

impl Codec {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        match self {
            Codec::None => Ok(bytes.to_vec()),
            Codec::Zstd => {
                #[cfg(feature = "zstd")]
                {
                    zstd::encode_all(bytes, 0).map_err(|e| Error::Codec(e.to_string()))
                }
                #[cfg(not(feature = "zstd"))]
                {
                    Err(Error::CodecUnsupported("zstd"))
                }
            }
            Codec::Lz4 => {
                #[cfg(feature = "lz4")]
                {
                    let mut out = Vec::new();
                    let mut encoder = lz4::EncoderBuilder::new()
                        .build(&mut out)
                        .map_err(|e| Error::Codec(e.to_string()))?;
                    std::io::Write::write_all(&mut encoder, bytes)
                        .map_err(|e| Error::Codec(e.to_string()))?;
                    let (out, result) = encoder.finish();
                    result.map_err(|e| Error::Codec(e.to_string()))?;
                    Ok(out)
                }
                #[cfg(not(feature = "lz4"))]
                {
                    Err(Error::CodecUnsupported("lz4"))
                }
            }
        }
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        match self {
            Codec::None => Ok(bytes.to_vec()),
            Codec::Zstd => {
                #[cfg(feature = "zstd")]
                {
                    zstd::decode_all(bytes).map_err(|e| Error::Codec(e.to_string()))
                }
                #[cfg(not(feature = "zstd"))]
                {
                    Err(Error::CodecUnsupported("zstd"))
                }
            }
            Codec::Lz4 => {
                #[cfg(feature = "lz4")]
                {
                    let mut out = Vec::new();
                    let mut decoder =
                        lz4::Decoder::new(bytes).map_err(|e| Error::Codec(e.to_string()))?;
                    std::io::Read::read_to_end(&mut decoder, &mut out)
                        .map_err(|e| Error::Codec(e.to_string()))?;
                    Ok(out)
                }
                #[cfg(not(feature = "lz4"))]
                {
                    Err(Error::CodecUnsupported("lz4"))
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentName(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub name: SegmentName,
    pub spill_id: SpillId,
    pub run_index: u32,
    pub uncompressed_len: u64,
    pub compressed_len: u64,
    pub checksum: [u8; 32],
}

/// Writes/reads `RowBatch` segments under `spill_dir`, one file per segment.
/// `add`-style writers (hash join partitions, external sort runs) call
/// `write_batch` as each bounded chunk fills; readers stream back via
/// `read_batch`, each read acquiring a budget guard sized to the segment's
/// uncompressed length so spill reads count against the same ceiling as
/// in-memory buffers.
pub struct SpillManager {
    storage: Box<dyn Storage>,
    codec: Codec,
    spill_dir: String,
    segments: HashMap<SegmentName, SegmentMeta>,
    next_seq: AtomicU64,
}

impl SpillManager {
    pub fn new(storage: Box<dyn Storage>, codec: Codec, spill_dir: String) -> Self {
        Self {
            storage,
            codec,
            spill_dir,
            segments: HashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    fn path_for(&self, name: &SegmentName) -> String {
        format!("{}/{}.seg", self.spill_dir, name.0)
    }

    /// Allocate the next run index for a caller managing its own runs
    /// (external sort merge passes, grace hash join partitions).
    pub fn next_run_index(&self) -> u32 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) as u32
    }

    pub fn write_batch(
        &mut self,
        batch: &RowBatch,
        spill_id: SpillId,
        run_index: u32,
    ) -> Result<SegmentMeta> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let name = SegmentName(format!("spill-{}-{}-{}", spill_id.get(), run_index, seq));

        let raw = serde_json::to_vec(batch).map_err(|e| Error::Storage(e.to_string()))?;
        let uncompressed_len = raw.len() as u64;
        let compressed = self.codec.compress(&raw)?;
        let compressed_len = compressed.len() as u64;
        let checksum = *blake3::hash(&compressed).as_bytes();

        let path = self.path_for(&name);
        self.storage.write(&path, &compressed)?;

        let meta = SegmentMeta {
            name: name.clone(),
            spill_id,
            run_index,
            uncompressed_len,
            compressed_len,
            checksum,
        };
        self.segments.insert(name, meta.clone());
        Ok(meta)
    }

    pub fn read_batch(
        &self,
        meta: &SegmentMeta,
        budget: &dyn MemoryBudget<Guard = BudgetGuardImpl>,
    ) -> Result<RowBatch> {
        let _guard = budget
            .acquire("spill_read", meta.uncompressed_len as usize)
            .map_err(|e| Error::Budget(e.to_string()))?;

        let path = self.path_for(&meta.name);
        let compressed = self.storage.read(&path)?;

        let checksum = *blake3::hash(&compressed).as_bytes();
        if checksum != meta.checksum {
            return Err(Error::ChecksumMismatch);
        }

        let raw = self.codec.decompress(&compressed)?;
        serde_json::from_slice(&raw).map_err(|e| Error::Storage(e.to_string()))
    }

    pub fn list_segments(&self) -> Vec<SegmentMeta> {
        self.segments.values().cloned().collect()
    }

    pub fn get_segment(&self, name: &SegmentName) -> Option<SegmentMeta> {
        self.segments.get(name).cloned()
    }

    pub fn delete_segment(&mut self, name: &SegmentName) -> Result<()> {
        if let Some(meta) = self.segments.remove(name) {
            let path = self.path_for(&meta.name);
            self.storage.delete(&path)?;
        }
        Ok(())
    }
}
