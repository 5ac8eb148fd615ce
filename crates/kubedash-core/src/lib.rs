//! # kubedash-core
//!
//! Foundation types for the kubedash extension:
//!
//! - **Protocol ids**: [`RequestId`] and [`SubscriberUid`] newtypes so a
//!   request correlation id can never be confused with a subscriber uid
//! - **Logging**: `tracing` subscriber setup plus an in-memory capture
//!   utility for asserting on emitted events in tests

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;

pub use ids::{RequestId, SubscriberUid};
