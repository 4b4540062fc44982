//! View-state binding over a client tree.
//!
//! [`ApiContext`] holds the tree for the lifetime of the application.
//! [`ApiCall`] wraps one endpoint with observable [`CallState`] and optional
//! [`CallHooks`]; [`Resource`] re-runs an [`ApiCall`] whenever its arguments
//! change and discards superseded runs.

mod call;
mod context;
mod hooks;
mod resource;
mod state;

pub use call::ApiCall;
pub use context::{ApiContext, Route};
pub use hooks::{CallHooks, HookFuture, HookStage, PosthookPolicy};
pub use resource::Resource;
pub use state::{CallState, Settlement};
