use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::ConfigError;

use super::call::ApiCall;
use super::context::{ApiContext, Route};
use super::hooks::CallHooks;
use super::state::{CallState, Settlement};

struct Run {
    args: Vec<Value>,
    cancel: CancellationToken,
}

/// An [`ApiCall`] that runs itself whenever its arguments change.
///
/// Each run gets a fresh [`CancellationToken`]; starting a run cancels the
/// previous one, so only the newest run can commit state. Built on
/// [`Route::Null`] it never calls out and keeps its initial state. Dropping
/// the resource cancels whatever is in flight.
pub struct Resource {
    call: Option<Arc<ApiCall>>,
    idle: watch::Sender<CallState>,
    inflight: Mutex<Option<Run>>,
}

impl Resource {
    pub fn new(
        ctx: &ApiContext,
        route: impl Into<Route>,
        init_state: Option<Value>,
        hooks: CallHooks,
    ) -> Result<Self, ConfigError> {
        let route: Route = route.into();
        let call = ctx
            .endpoint(&route)?
            .map(|fetch| Arc::new(ApiCall::new(fetch, Vec::new(), init_state.clone(), hooks)));
        let (idle, _) = watch::channel(CallState::initial(init_state));
        Ok(Self {
            call,
            idle,
            inflight: Mutex::new(None),
        })
    }

    pub fn is_null(&self) -> bool {
        self.call.is_none()
    }

    pub fn state(&self) -> CallState {
        match &self.call {
            Some(call) => call.state(),
            None => self.idle.borrow().clone(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CallState> {
        match &self.call {
            Some(call) => call.subscribe(),
            None => self.idle.subscribe(),
        }
    }

    /// Starts a run if `args` differ from the last run's, or if nothing has
    /// run yet. Must be called from within a tokio runtime.
    pub fn sync(&self, args: Vec<Value>) -> Option<JoinHandle<Settlement>> {
        let unchanged = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|run| run.args == args);
        if unchanged {
            return None;
        }
        self.launch(args)
    }

    /// Cancels the current run and starts a new one with the same arguments.
    pub fn reexecute(&self) -> Option<JoinHandle<Settlement>> {
        let call = self.call.as_ref()?;
        let args = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|run| run.args.clone())
            .unwrap_or_else(|| call.args());
        self.launch(args)
    }

    /// Cancels the current run, if any. The state keeps whatever it held.
    pub fn cancel(&self) {
        if let Some(run) = self.inflight.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            run.cancel.cancel();
        }
    }

    fn launch(&self, args: Vec<Value>) -> Option<JoinHandle<Settlement>> {
        let call = Arc::clone(self.call.as_ref()?);
        let cancel = CancellationToken::new();

        let previous = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Run {
                args: args.clone(),
                cancel: cancel.clone(),
            });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }
        debug!(url = call.route().url(), args:? = args; "Starting resource run");

        call.set_args(args.clone());
        call.mark_loading();
        Some(tokio::spawn(async move { call.execute_with(&cancel, args).await }))
    }
}

impl Drop for Resource {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("call", &self.call)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::{EndpointConfig, EndpointConfigMap, make_api_client};
    use crate::request::{RequestDescriptor, RequestOptions};

    fn context(mock_server: &MockServer) -> ApiContext {
        let mut tree = EndpointConfigMap::new();
        tree.insert(
            "item".into(),
            EndpointConfig::new("/items/{0}")
                .method("GET")
                .expect_data(true)
                .transformer(|args| RequestDescriptor::new().with_params(args.to_vec())),
        );
        ApiContext::new(make_api_client(mock_server.uri(), RequestOptions::default(), &tree).unwrap())
    }

    async fn mount_item(mock_server: &MockServer, id: u32, delay: Duration) {
        Mock::given(method("GET"))
            .and(path(format!("/items/{id}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": id}))
                    .set_delay(delay),
            )
            .mount(mock_server)
            .await;
    }

    #[tokio::test]
    async fn test_newer_run_supersedes_older_run() {
        let mock_server = MockServer::start().await;
        mount_item(&mock_server, 1, Duration::from_millis(300)).await;
        mount_item(&mock_server, 2, Duration::ZERO).await;

        let resource = Resource::new(&context(&mock_server), "item", None, CallHooks::new()).unwrap();
        let first = resource.sync(vec![json!(1)]).unwrap();
        let second = resource.sync(vec![json!(2)]).unwrap();

        assert!(second.await.unwrap().state().is_some());
        assert_eq!(first.await.unwrap(), Settlement::Cancelled);

        let state = resource.state();
        assert!(state.success);
        assert!(!state.loading);
        assert_eq!(state.data, Some(json!({"id": 2})));
    }

    #[tokio::test]
    async fn test_unchanged_args_do_not_rerun() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
            .expect(2)
            .mount(&mock_server)
            .await;

        let resource = Resource::new(&context(&mock_server), "item", None, CallHooks::new()).unwrap();
        resource.sync(vec![json!(5)]).unwrap().await.unwrap();
        assert!(resource.sync(vec![json!(5)]).is_none());

        let settlement = resource.reexecute().unwrap().await.unwrap();
        assert_eq!(settlement.state().and_then(|s| s.data.clone()), Some(json!({"id": 5})));
    }

    #[tokio::test]
    async fn test_null_route_never_calls() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let resource = Resource::new(&context(&mock_server), Route::Null, Some(json!([])), CallHooks::new()).unwrap();
        assert!(resource.is_null());
        assert!(resource.sync(vec![json!(1)]).is_none());
        assert!(resource.reexecute().is_none());
        assert_eq!(resource.state(), CallState::initial(Some(json!([]))));
    }

    #[tokio::test]
    async fn test_unknown_route_is_a_config_error() {
        let mock_server = MockServer::start().await;
        let err = Resource::new(&context(&mock_server), "missing", None, CallHooks::new()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEndpoint(_)));
    }

    #[tokio::test]
    async fn test_drop_cancels_in_flight_run() {
        let mock_server = MockServer::start().await;
        mount_item(&mock_server, 9, Duration::from_millis(300)).await;

        let resource = Resource::new(&context(&mock_server), "item", None, CallHooks::new()).unwrap();
        let handle = resource.sync(vec![json!(9)]).unwrap();
        assert!(resource.state().loading);
        drop(resource);

        assert_eq!(handle.await.unwrap(), Settlement::Cancelled);
    }
}
