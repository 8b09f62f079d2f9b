//! Permissive mock extender.
//!
//! Every candidate passes `/filter` and every candidate scores
//! [`MOCK_SCORE`] in `/prioritize`. Useful as a stand-in scorer when wiring
//! the bridge end to end.

use std::net::SocketAddr;

use axum::routing::post;
use axum::{Json, Router};
use tracing::{debug, info};

use crate::protocol::{ExtenderArgs, FilterResult, HostPriority, HostPriorityList};

/// Score the mock assigns to every node.
pub const MOCK_SCORE: i64 = 100;

/// Build the mock extender router.
pub fn router() -> Router {
    Router::new()
        .route("/filter", post(filter))
        .route("/prioritize", post(prioritize))
}

/// Serve the mock extender on `addr` until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "mock extender listening");
    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown)
        .await
}

async fn filter(Json(args): Json<ExtenderArgs>) -> Json<FilterResult> {
    debug!(job = %args.pod.name, candidates = args.nodes.len(), "mock filter");
    Json(FilterResult {
        nodes: Some(args.nodes),
    })
}

async fn prioritize(Json(args): Json<ExtenderArgs>) -> Json<HostPriorityList> {
    debug!(job = %args.pod.name, candidates = args.nodes.len(), "mock prioritize");
    Json(
        args.nodes
            .into_iter()
            .map(|node| HostPriority::new(node.name, MOCK_SCORE))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use simbridge_state::{Job, Node};
    use tower::ServiceExt;

    fn args_body() -> Body {
        let args = ExtenderArgs::new(
            &Job::new(7, "cloudlet-7", 500, 256),
            &[Node::new(1, "vm-1", 1000, 1024), Node::new(2, "vm-2", 1000, 1024)],
        );
        Body::from(serde_json::to_vec(&args).unwrap())
    }

    async fn post_json(path: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(args_body())
            .unwrap();
        let resp = router().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn filter_echoes_every_candidate() {
        let (status, body) = post_json("/filter").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(body["nodes"][0]["name"], "vm-1");
    }

    #[tokio::test]
    async fn prioritize_scores_every_candidate_equally() {
        let (status, body) = post_json("/prioritize").await;
        assert_eq!(status, StatusCode::OK);
        let list: HostPriorityList = serde_json::from_value(body).unwrap();
        assert_eq!(
            list,
            vec![HostPriority::new("vm-1", MOCK_SCORE), HostPriority::new("vm-2", MOCK_SCORE)]
        );
    }
}
