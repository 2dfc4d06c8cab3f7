pub mod csv;
pub mod jsonl;

#[cfg(feature = "parquet")]
pub mod parquet;
