//! Global interceptor chain wrapping every publish.

pub mod chain;
pub mod context;

pub use chain::{Interceptor, InterceptorChain};
pub use context::{AttributeValue, InterceptorContext};
