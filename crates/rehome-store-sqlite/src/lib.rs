//! SQLite backend for the rehome adoption engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every invariant-bearing write goes
//! through [`SqliteStore::with_exclusive_lock`].

mod encode;
mod lock;
mod ops;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use lock::Lock;
pub use store::{SqliteStore, StoreOptions};
