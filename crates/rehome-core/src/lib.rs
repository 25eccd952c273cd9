//! Core types and trait definitions for the rehome adoption engine.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the application state machine, the subject status synchronizer, the
//! standing rules that decide who may act on an application, and the
//! [`engine::Engine`] facade through which callers reach a store.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod application;
pub mod audit;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod media;
pub mod message;
pub mod notify;
pub mod principal;
pub mod store;
pub mod subject;
pub mod sync;
pub mod validate;

pub use error::{Classify, Error, ErrorKind, Result};
