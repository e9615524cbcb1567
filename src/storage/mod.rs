//! Storage backends for agent and sample persistence
//!
//! This module provides a trait-based abstraction for the hub's durable
//! store: agent identity rows and probe samples.
//!
//! ## Design
//!
//! - **Trait-based**: `StorageBackend` trait allows swapping implementations
//! - **Async**: All operations are async for compatibility with Tokio tasks
//! - **Source of truth**: the in-memory sample cache is a pure optimization
//!   on top of this layer and is rebuilt empty on restart
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database, good for small fleets
//! - **In-Memory**: No persistence, for testing or throwaway deployments

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use schema::{AgentRow, NewAgent, SampleRow};
