//! # kubedash-subscriptions
//!
//! Who is listening to what. Producers only do expensive upstream work
//! (resource watches, log streams) while somebody is subscribed, and only
//! for the parameterizations actually requested; this crate tracks that
//! interest and fans payloads out.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `registry` | Cross-process registry: webview listeners identified by uid |
//! | `local` | In-process registry: listeners are callbacks, disposal-scoped |
//! | `interest` | Interest-change notifications driving on-demand producers |
//! | `options` | Falsy exclusion and deep-equality de-duplication of options |
//! | `dispatcher` | Delivery: remote (via `fire`) and local (direct callbacks) |
//!
//! Registry maps are plain mutex-guarded state, never held across an
//! `await`; a subscribe cannot interleave with a dispatch mid-iteration on
//! the same channel.

#![deny(unsafe_code)]

pub mod dispatcher;
pub mod interest;
pub mod local;
pub mod options;
pub mod registry;

pub use dispatcher::{DispatchSink, LocalDispatcher, RemoteDispatcher};
pub use interest::InterestChange;
pub use local::{LocalSubscriptions, SubscriptionGuard};
pub use registry::{ChannelSubscriptions, SubscriberEntry};
