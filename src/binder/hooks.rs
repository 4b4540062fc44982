use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Hooks resolve to `Some(err)` to fail the call, `None` to let it continue.
pub type HookFuture = Pin<Box<dyn Future<Output = Option<Value>> + Send>>;

type PreFn = dyn Fn(Vec<Value>, CancellationToken) -> HookFuture + Send + Sync;
type PostFn = dyn Fn(i32, Option<Value>, CancellationToken) -> HookFuture + Send + Sync;
type ErrFn = dyn Fn(HookStage, &Value) + Send + Sync;

/// Where in a call an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Prehook,
    Api,
    Posthook,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookStage::Prehook => "prehook",
            HookStage::Api => "api",
            HookStage::Posthook => "posthook",
        })
    }
}

/// What a failing posthook does to an otherwise successful call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PosthookPolicy {
    /// The posthook's error replaces the success; data and status are kept.
    #[default]
    Report,
    /// Success is committed first and the posthook runs detached; its error
    /// is only logged.
    Ignore,
}

#[derive(Clone, Default)]
pub struct CallHooks {
    pub(super) prehook: Option<Arc<PreFn>>,
    pub(super) posthook: Option<Arc<PostFn>>,
    pub(super) errhook: Option<Arc<ErrFn>>,
    pub(super) posthook_policy: PosthookPolicy,
}

impl CallHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs before the request with the call's arguments.
    pub fn prehook<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Value>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Value>> + Send + 'static,
    {
        self.prehook = Some(Arc::new(move |args, cancel| Box::pin(f(args, cancel)) as HookFuture));
        self
    }

    /// Runs after a successful request with its status and data.
    pub fn posthook<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(i32, Option<Value>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Value>> + Send + 'static,
    {
        self.posthook = Some(Arc::new(move |status, data, cancel| {
            Box::pin(f(status, data, cancel)) as HookFuture
        }));
        self
    }

    /// Notified of every error that reaches the call state.
    pub fn errhook<F>(mut self, f: F) -> Self
    where
        F: Fn(HookStage, &Value) + Send + Sync + 'static,
    {
        self.errhook = Some(Arc::new(f));
        self
    }

    pub fn posthook_policy(mut self, policy: PosthookPolicy) -> Self {
        self.posthook_policy = policy;
        self
    }
}

impl fmt::Debug for CallHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallHooks")
            .field("prehook", &self.prehook.is_some())
            .field("posthook", &self.posthook.is_some())
            .field("errhook", &self.errhook.is_some())
            .field("posthook_policy", &self.posthook_policy)
            .finish()
    }
}
