use std::sync::Arc;

use bevy::prelude::*;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use crate::qa::error::QaError;
use crate::qa::protocol::{interpret_reply, QueryRequest, QueryResponse, RawReply};

pub type QueryResult = Result<QueryResponse, QaError>;

/// Sends one query and resolves to the raw reply. The future must yield while it waits,
/// so aborting it stops the request.
pub trait QaTransport: Send + Sync + 'static {
    fn send(&self, request: QueryRequest) -> BoxFuture<'static, Result<RawReply, QaError>>;
}

/// Transport plus the runtime its requests are driven on. Requests never touch Bevy's
/// task pools, so a slow answer cannot hold up asset loading.
#[derive(Resource, Clone)]
pub struct QaClient {
    transport: Arc<dyn QaTransport>,
    runtime: Arc<Runtime>,
}

impl QaClient {
    pub fn new(transport: impl QaTransport) -> Result<Self, QaError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("qa-client")
            .enable_io()
            .enable_time()
            .build()
            .map_err(|err| QaError::Transport(format!("failed to start QA runtime: {err}")))?;
        Ok(Self {
            transport: Arc::new(transport),
            runtime: Arc::new(runtime),
        })
    }

    /// Start a request. Dropping the returned handle aborts it.
    pub fn dispatch(&self, request: QueryRequest) -> PendingQuery {
        let reply = self.transport.send(request);
        let handle = self
            .runtime
            .spawn(reply.map(|reply| reply.and_then(|reply| interpret_reply(&reply))));
        PendingQuery { handle }
    }
}

/// An outstanding request on the client runtime.
pub struct PendingQuery {
    handle: JoinHandle<QueryResult>,
}

impl PendingQuery {
    /// The result, if the request has finished.
    pub fn poll(&mut self) -> Option<QueryResult> {
        let joined = (&mut self.handle).now_or_never()?;
        Some(joined.unwrap_or_else(|err| {
            Err(QaError::Transport(format!("QA request task failed: {err}")))
        }))
    }
}

impl Drop for PendingQuery {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// JSON-over-HTTP transport for the hosted QA endpoint.
pub struct HttpTransport {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl QaTransport for HttpTransport {
    fn send(&self, request: QueryRequest) -> BoxFuture<'static, Result<RawReply, QaError>> {
        let post = self.client.post(&self.endpoint).json(&request);
        async move {
            let response = post
                .send()
                .await
                .map_err(|err| QaError::Transport(err.to_string()))?;

            let status = response.status().as_u16();
            // An unreadable body still carries a status worth reporting
            let body = response.text().await.unwrap_or_default();
            Ok(RawReply { status, body })
        }
        .boxed()
    }
}
