//! Local-filesystem implementation of `emsqrt_mem::spill::Storage`.
//!
//! Cloud backends (S3/GCS/Azure) are future implementations of the same
//! trait, gated behind the `s3`/`gcs`/`azure` features; none are wired up
//! yet, so those features currently add nothing.

use std::fs;
use std::path::Path;

use emsqrt_mem::spill::Storage;
use emsqrt_mem::error::{Error, Result};

#[derive(Debug, Default, Clone, Copy)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for FsStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Storage(e.to_string()))?;
        }
        fs::write(path, bytes).map_err(|e| Error::Storage(e.to_string()))
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| Error::Storage(e.to_string()))
    }

    fn delete(&self, path: &str) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }
}
