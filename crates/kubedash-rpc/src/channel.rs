//! Named, typed channel declarations.
//!
//! A channel is a uniquely named logical endpoint. Invokable channels carry
//! method calls; event channels carry one-way broadcasts of a single payload
//! type. Channels are declared once as `const` items and referenced for the
//! process lifetime; the string name is the only cross-process contract, so
//! renaming one is a breaking protocol change.

use std::fmt;
use std::marker::PhantomData;

/// An invokable (method-call-style) channel.
///
/// The callable surface of an invokable channel is described by a proxy
/// trait on the webview side and a [`crate::extension::MethodTable`] on the
/// extension side; the channel itself is pure data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApiChannel {
    name: &'static str,
}

impl ApiChannel {
    /// Declare an invokable channel with a globally unique name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// The channel's wire name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for ApiChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// An event (broadcast-style) channel carrying payloads of type `T`.
///
/// `T` exists for compile-time typing only; nothing of it appears on the
/// wire beyond its serialized payloads.
pub struct EventChannel<T> {
    name: &'static str,
    _payload: PhantomData<fn() -> T>,
}

impl<T> EventChannel<T> {
    /// Declare an event channel with a globally unique name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _payload: PhantomData,
        }
    }

    /// The channel's wire name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for EventChannel<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EventChannel<T> {}

impl<T> fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("name", &self.name)
            .finish()
    }
}

impl<T> fmt::Display for EventChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
