//! Protocol id newtypes.
//!
//! Two numeric ids cross the process boundary: the per-request correlation
//! id assigned by the calling endpoint, and the per-subscription uid chosen
//! by the webview. Both are plain `u64` on the wire; the newtypes keep them
//! apart in signatures.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw id value.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Return the raw id value.
            #[must_use]
            pub const fn value(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

numeric_id! {
    /// Correlation id of one in-flight request on one endpoint.
    ///
    /// Unique among *outstanding* requests only; values are recycled freely
    /// once the matching response has settled.
    RequestId
}

numeric_id! {
    /// Caller-chosen identity of one active subscription on a channel.
    ///
    /// The webview allocates these; the extension-side registry treats them
    /// as opaque. Uniqueness per channel is the caller's responsibility.
    SubscriberUid
}
