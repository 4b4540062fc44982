use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::client::ConfigError;
use crate::fetch::{Fetch, TRANSPORT_STATUS};

use super::context::ApiContext;
use super::hooks::{CallHooks, HookStage, PosthookPolicy};
use super::state::{CallState, Settlement};

/// A stateful wrapper around one endpoint.
///
/// Tracks `loading`, `success`, `err`, `status` and `data` in a
/// [`watch`] channel. Overlapping executions are not serialized; each one
/// commits only if its token is still live at the moment of commit, so the
/// latest live execution wins.
pub struct ApiCall {
    route: Arc<Fetch>,
    args: Mutex<Vec<Value>>,
    init_state: Option<Value>,
    hooks: CallHooks,
    state: watch::Sender<CallState>,
}

impl ApiCall {
    pub fn new(route: Arc<Fetch>, args: Vec<Value>, init_state: Option<Value>, hooks: CallHooks) -> Self {
        let (state, _) = watch::channel(CallState::initial(init_state.clone()));
        Self {
            route,
            args: Mutex::new(args),
            init_state,
            hooks,
            state,
        }
    }

    /// Binds the callable node at `path`.
    pub fn from_context(
        ctx: &ApiContext,
        path: &str,
        args: Vec<Value>,
        init_state: Option<Value>,
        hooks: CallHooks,
    ) -> Result<Self, ConfigError> {
        let route = Arc::clone(ctx.client().require(path)?);
        Ok(Self::new(route, args, init_state, hooks))
    }

    pub fn route(&self) -> &Arc<Fetch> {
        &self.route
    }

    pub fn state(&self) -> CallState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CallState> {
        self.state.subscribe()
    }

    pub fn args(&self) -> Vec<Value> {
        self.args.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the arguments used by later calls to [`ApiCall::execute`].
    pub fn set_args(&self, args: Vec<Value>) {
        *self.args.lock().unwrap_or_else(PoisonError::into_inner) = args;
    }

    pub fn mark_loading(&self) {
        self.state.send_if_modified(|state| !std::mem::replace(&mut state.loading, true));
    }

    /// Executes with the current arguments.
    pub async fn execute(&self, cancel: &CancellationToken) -> Settlement {
        let args = self.args();
        self.execute_with(cancel, args).await
    }

    /// Executes with `args`, leaving the stored arguments alone.
    ///
    /// `loading` is set before the first suspension point. The token is
    /// checked after every suspension point; once it fires nothing more is
    /// written to the state.
    pub async fn execute_with(&self, cancel: &CancellationToken, args: Vec<Value>) -> Settlement {
        self.mark_loading();

        if let Some(prehook) = &self.hooks.prehook {
            let err = prehook(args.clone(), cancel.clone()).await;
            if cancel.is_cancelled() {
                return Settlement::Cancelled;
            }
            if let Some(err) = err {
                return self.fail(cancel, HookStage::Prehook, err, TRANSPORT_STATUS, self.init_state.clone());
            }
        }

        let outcome = self.route.call_with(cancel, &args).await;
        if outcome.is_cancelled() || cancel.is_cancelled() {
            return Settlement::Cancelled;
        }
        let (data, status, err) = outcome.into_parts();
        if let Some(err) = err {
            return self.fail(cancel, HookStage::Api, err, status, self.init_state.clone());
        }

        let success = CallState {
            loading: false,
            success: true,
            err: None,
            status,
            data: data.clone(),
        };
        let Some(posthook) = &self.hooks.posthook else {
            return self.commit(cancel, success);
        };

        match self.hooks.posthook_policy {
            PosthookPolicy::Report => {
                let err = posthook(status, data.clone(), cancel.clone()).await;
                if cancel.is_cancelled() {
                    return Settlement::Cancelled;
                }
                match err {
                    Some(err) => self.fail(cancel, HookStage::Posthook, err, status, data),
                    None => self.commit(cancel, success),
                }
            },
            PosthookPolicy::Ignore => {
                let settlement = self.commit(cancel, success);
                if !settlement.is_cancelled() {
                    // Detached: neither its result nor a later cancel touches the state.
                    let hook = posthook(status, data, cancel.clone());
                    let url = self.route.url().to_string();
                    tokio::spawn(async move {
                        if let Some(err) = hook.await {
                            debug!(url = url.as_str(), error:% = err; "Ignoring posthook error");
                        }
                    });
                }
                settlement
            },
        }
    }

    fn fail(
        &self,
        cancel: &CancellationToken,
        stage: HookStage,
        err: Value,
        status: i32,
        data: Option<Value>,
    ) -> Settlement {
        let settlement = self.commit(cancel, CallState {
            loading: false,
            success: false,
            err: Some(err.clone()),
            status,
            data,
        });
        if !settlement.is_cancelled() {
            warn!(stage:% = stage, status = status, url = self.route.url(), error:% = err; "Call failed");
            if let Some(errhook) = &self.hooks.errhook {
                errhook(stage, &err);
            }
        }
        settlement
    }

    /// Replaces the state unless `cancel` fired first. The check and the
    /// write happen under the channel's lock.
    fn commit(&self, cancel: &CancellationToken, next: CallState) -> Settlement {
        let committed = self.state.send_if_modified(|state| {
            if cancel.is_cancelled() {
                return false;
            }
            *state = next.clone();
            true
        });
        if committed {
            Settlement::Settled(next)
        } else {
            Settlement::Cancelled
        }
    }
}

impl std::fmt::Debug for ApiCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCall")
            .field("route", &self.route)
            .field("hooks", &self.hooks)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
