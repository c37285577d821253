//! Fixtures for transcript and hook-store tests.
//!
//! Provides utilities to:
//! - Build JSONL transcript files record by record
//! - Stand in for the hook store with an in-memory KV backend
//! - Generate deterministic or unique session identifiers

mod fixtures;
mod kv;
mod world;

pub use fixtures::{TranscriptBuilder, fixture_session_id, unique_session_id};
pub use kv::MemoryKv;
pub use world::ProjectsRoot;
