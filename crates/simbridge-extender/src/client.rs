//! Extender client: the two-call filter/prioritize exchange.
//!
//! [`HttpExtenderClient`] POSTs JSON to `{url}/filter` and
//! `{url}/prioritize` over a pooled hyper client. Every call is bounded by
//! a request timeout; a timeout, a connection failure, a non-2xx status or
//! an undecodable body all surface as [`ExtenderError`] tagged with the
//! phase that failed.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, Uri, header};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use tracing::debug;

use simbridge_state::{Job, Node};

use crate::error::{ExtenderCause, ExtenderError, ExtenderPhase, ExtenderResult};
use crate::protocol::{ExtenderArgs, FilterResult, HostPriorityList};

/// Boxed future returned by [`Extender`] calls.
pub type ExtenderFuture<'a, T> = Pin<Box<dyn Future<Output = ExtenderResult<T>> + Send + 'a>>;

/// A filter/prioritize scorer.
pub trait Extender: Send + Sync {
    /// Narrow `nodes` to those viable for `job`. An empty result means no
    /// node can take the job.
    fn filter<'a>(&'a self, job: &'a Job, nodes: &'a [Node]) -> ExtenderFuture<'a, Vec<Node>>;

    /// Score `nodes` for `job`.
    fn prioritize<'a>(
        &'a self,
        job: &'a Job,
        nodes: &'a [Node],
    ) -> ExtenderFuture<'a, HostPriorityList>;
}

/// HTTP+JSON extender client.
#[derive(Clone)]
pub struct HttpExtenderClient {
    client: Client<HttpConnector, Full<Bytes>>,
    filter_uri: Uri,
    prioritize_uri: Uri,
    timeout: Duration,
}

impl HttpExtenderClient {
    /// Build a client for the extender at `base_url` (e.g. `http://localhost:8081`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ExtenderCause> {
        let base = base_url.trim_end_matches('/');
        let filter_uri = endpoint(base, ExtenderPhase::Filter)?;
        let prioritize_uri = endpoint(base, ExtenderPhase::Prioritize)?;

        let client = Client::builder(TokioExecutor::new()).build_http();

        Ok(Self {
            client,
            filter_uri,
            prioritize_uri,
            timeout,
        })
    }

    /// Per-call request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn call<T: DeserializeOwned>(
        &self,
        phase: ExtenderPhase,
        args: &ExtenderArgs,
    ) -> ExtenderResult<T> {
        let fail = |cause| ExtenderError::new(phase, cause);

        let uri = match phase {
            ExtenderPhase::Filter => self.filter_uri.clone(),
            ExtenderPhase::Prioritize => self.prioritize_uri.clone(),
        };
        let payload = serde_json::to_vec(args).map_err(|e| fail(ExtenderCause::Encode(e)))?;

        let req = Request::builder()
            .method(Method::POST)
            .uri(&uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::USER_AGENT, "simbridge-extender/0.1")
            .body(Full::new(Bytes::from(payload)))
            .map_err(|e| fail(ExtenderCause::InvalidUrl(e.to_string())))?;

        let exchange = async {
            let resp = self
                .client
                .request(req)
                .await
                .map_err(|e| ExtenderCause::Transport(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(ExtenderCause::Status(status.as_u16()));
            }

            let body = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| ExtenderCause::Transport(e.to_string()))?
                .to_bytes();
            serde_json::from_slice::<T>(&body).map_err(ExtenderCause::Decode)
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(value)) => {
                debug!(%phase, %uri, job_id = args.pod.id, "extender call succeeded");
                Ok(value)
            }
            Ok(Err(cause)) => Err(fail(cause)),
            Err(_) => Err(fail(ExtenderCause::Timeout(self.timeout))),
        }
    }
}

impl Extender for HttpExtenderClient {
    fn filter<'a>(&'a self, job: &'a Job, nodes: &'a [Node]) -> ExtenderFuture<'a, Vec<Node>> {
        Box::pin(async move {
            let args = ExtenderArgs::new(job, nodes);
            let result: FilterResult = self.call(ExtenderPhase::Filter, &args).await?;
            Ok(result.into_survivors(nodes))
        })
    }

    fn prioritize<'a>(
        &'a self,
        job: &'a Job,
        nodes: &'a [Node],
    ) -> ExtenderFuture<'a, HostPriorityList> {
        Box::pin(async move {
            let args = ExtenderArgs::new(job, nodes);
            // A JSON `null` list is an empty list.
            let list: Option<HostPriorityList> = self.call(ExtenderPhase::Prioritize, &args).await?;
            Ok(list.unwrap_or_default())
        })
    }
}

fn endpoint(base: &str, phase: ExtenderPhase) -> Result<Uri, ExtenderCause> {
    let raw = format!("{base}/{}", phase.path());
    let uri: Uri = raw
        .parse()
        .map_err(|e: http::uri::InvalidUri| ExtenderCause::InvalidUrl(format!("{raw}: {e}")))?;
    match uri.scheme_str() {
        Some("http") if uri.authority().is_some() => Ok(uri),
        _ => Err(ExtenderCause::InvalidUrl(format!("{raw}: expected http://host[:port]"))),
    }
}
