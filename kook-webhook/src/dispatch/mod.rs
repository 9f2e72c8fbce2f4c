//! Event fan-out.
//!
//! ```text
//! d → Event → snapshot(handlers[event.type]) → one task per handler
//! ```

pub mod dispatcher;
pub mod registry;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use registry::{HandlerFn, HandlerRegistry, HandlerResult};
