//! Handler groups and the builder API used to assemble them.

pub mod builder;
pub(crate) mod group;
pub mod retry;

pub use builder::{AnyHandlerGroupBuilder, HandlerGroupBuilder, Listener, ListenerBuilder, ListenerId};
pub use group::{AnyFailureHandler, AnyHandlerGroup, FailureHandler, HandlerGroup};
pub use retry::RetryPolicy;

pub(crate) use group::ErasedHandlerGroup;
