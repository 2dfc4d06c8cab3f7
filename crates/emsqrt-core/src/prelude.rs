//! Convenience re-exports for the common schema vocabulary, so downstream
//! crates don't need to know `Schema`/`Field`/`DataType` live in `schema`.

pub use crate::schema::{DataType, Field, Schema};
