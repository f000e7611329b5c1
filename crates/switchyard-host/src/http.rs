use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::body::{Body, Bytes, to_bytes};
use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, Response, StatusCode, header};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use switchyard_core::check::{CID_HEADER, CheckClient, CheckOutcome};
use url::form_urlencoded;

use crate::cluster::ClusterSummary;
use crate::config::RoutedView;
use crate::datetime::UserProfile;
use crate::dispatch::{Dispatcher, ViewResponse, format_trace};
use crate::presenter::Presenter;
use crate::request::{InboundRequest, SessionContext};
use crate::view::View;

/// Query/form parameter selecting the cluster.
pub const CLUSTER_PARAM: &str = "cluster";
pub const CONTENT_TYPE_JS: &str = "application/javascript";
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared, read-only state behind every route.
pub struct HostState {
    pub dispatcher: Dispatcher,
    pub presenter: Arc<dyn Presenter>,
    pub clusters: Vec<ClusterSummary>,
    pub profile: Option<UserProfile>,
    pub check: Option<Arc<CheckClient>>,
    next_cid: AtomicU64,
}

impl HostState {
    pub fn new(dispatcher: Dispatcher, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            dispatcher,
            presenter,
            clusters: Vec::new(),
            profile: None,
            check: None,
            next_cid: AtomicU64::new(1),
        }
    }

    pub fn with_clusters(mut self, clusters: Vec<ClusterSummary>) -> Self {
        self.clusters = clusters;
        self
    }

    pub fn with_profile(mut self, profile: Option<UserProfile>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_check(mut self, check: Option<CheckClient>) -> Self {
        self.check = check.map(Arc::new);
        self
    }

    fn session_for(&self, cluster_id: Option<&str>) -> SessionContext {
        let choices = self
            .clusters
            .iter()
            .map(|cluster| json!({"id": cluster.id, "name": cluster.name}))
            .collect::<Vec<_>>();
        SessionContext {
            cluster_id: cluster_id.map(str::to_string),
            clusters: self.clusters.clone(),
            choose_cluster_form: json!({ "cluster": cluster_id, "choices": choices }),
            profile: self.profile.clone(),
        }
    }

    fn next_cid(&self) -> String {
        let seq = self.next_cid.fetch_add(1, Ordering::Relaxed);
        format!("switchyard-{seq:016x}")
    }
}

/// One route per view, `{route}/{id}` for views addressing a single object,
/// `/healthz`, and `/check/{service}` when a check endpoint is configured.
pub fn router(state: Arc<HostState>, views: Vec<RoutedView>) -> Router {
    let mut router = Router::new().route("/healthz", get(healthz));
    if state.check.is_some() {
        router = router.route("/check/{service}", post(check));
    }
    for RoutedView { route, view } in views {
        let view = Arc::new(view);
        if view.kind().takes_path_id() {
            let with_id = format!("{}/{{id}}", route.trim_end_matches('/'));
            let by_id = Arc::clone(&view);
            router = router.route(
                &with_id,
                any(
                    move |State(state): State<Arc<HostState>>,
                          Path(id): Path<String>,
                          request: Request| {
                        let view = Arc::clone(&by_id);
                        async move { serve_view(state, view, Some(id), request).await }
                    },
                ),
            );
        }
        router = router.route(
            &route,
            any(
                move |State(state): State<Arc<HostState>>, request: Request| {
                    let view = Arc::clone(&view);
                    async move { serve_view(state, view, None, request).await }
                },
            ),
        );
    }
    router.with_state(state)
}

async fn serve_view(
    state: Arc<HostState>,
    view: Arc<View>,
    path_id: Option<String>,
    request: Request,
) -> Response<Body> {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => return bad_request(format!("failed to read body: {err}")),
    };

    let mut inbound = InboundRequest::new(parts.method.clone());
    if let Some(query) = parts.uri.query() {
        extend_params(&mut inbound, query.as_bytes());
    }
    if is_form(&parts.headers) {
        extend_params(&mut inbound, &bytes);
    }
    inbound.path_id = path_id;
    inbound.session = state.session_for(inbound.param(CLUSTER_PARAM));

    let dispatcher = state.dispatcher.clone();
    let outcome =
        tokio::task::spawn_blocking(move || dispatcher.dispatch(&view, &inbound)).await;
    match outcome {
        Ok(response) => into_http(&state, response),
        Err(err) => {
            tracing::error!(error = %err, "dispatch task failed");
            text_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn extend_params(inbound: &mut InboundRequest, raw: &[u8]) {
    for (name, value) in form_urlencoded::parse(raw) {
        inbound.params.insert(name.into_owned(), value.into_owned());
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

fn into_http(state: &HostState, response: ViewResponse) -> Response<Body> {
    match response {
        ViewResponse::Render { template, payload } => {
            let context = payload.to_context();
            match state.presenter.render(&template, &context) {
                Ok(Some(page)) => typed_response(StatusCode::OK, "text/html; charset=utf-8", page),
                Ok(None) => typed_response(StatusCode::OK, "application/json", context.to_string()),
                Err(err) => {
                    let trace = format!("{err:#}");
                    tracing::error!(template = %template, error = %trace, "render failed");
                    text_response(StatusCode::INTERNAL_SERVER_ERROR, trace)
                }
            }
        }
        ViewResponse::Json(body) => typed_response(StatusCode::OK, CONTENT_TYPE_JS, body.to_string()),
        ViewResponse::Empty => Response::builder()
            .status(StatusCode::OK)
            .body(Body::empty())
            .expect("building empty response must succeed"),
        ViewResponse::ServerError(trace) => text_response(StatusCode::INTERNAL_SERVER_ERROR, trace),
        ViewResponse::MethodNotAllowed { allowed, message } => {
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            let mut response = text_response(StatusCode::METHOD_NOT_ALLOWED, message);
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(header::ALLOW, value);
            }
            response
        }
    }
}

async fn healthz(State(state): State<Arc<HostState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "dispatch": state.dispatcher.metrics().snapshot(),
    }))
}

/// Forwards a JSON body to the check endpoint as `service`.
async fn check(
    State(state): State<Arc<HostState>>,
    Path(service): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response<Body> {
    let Some(client) = state.check.clone() else {
        return text_response(StatusCode::NOT_FOUND, "no check endpoint configured".into());
    };
    let payload = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => Some(value),
            Err(err) => return bad_request(format!("check payload is not JSON: {err}")),
        }
    };
    let cid = headers
        .get(CID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| state.next_cid());

    let outcome = tokio::task::spawn_blocking(move || {
        client.invoke_check(&cid, &service, payload.as_ref())
    })
    .await;
    match outcome {
        Ok(Ok(CheckOutcome::Ok(response))) => {
            json_response(StatusCode::OK, json!({"ok": true, "response": response}))
        }
        Ok(Ok(CheckOutcome::Raw(envelope))) => {
            json_response(StatusCode::OK, json!({"ok": false, "envelope": envelope}))
        }
        Ok(Err(err)) => {
            let trace = format_trace(&err);
            tracing::error!(error = %trace, "check invocation failed");
            text_response(StatusCode::BAD_GATEWAY, trace)
        }
        Err(err) => text_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn typed_response(status: StatusCode, content_type: &str, body: String) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .expect("building response must succeed")
}

fn text_response(status: StatusCode, body: String) -> Response<Body> {
    typed_response(status, "text/plain; charset=utf-8", body)
}

fn json_response(status: StatusCode, body: Value) -> Response<Body> {
    typed_response(status, "application/json", body.to_string())
}

fn bad_request(message: String) -> Response<Body> {
    json_response(StatusCode::BAD_REQUEST, json!({ "error": message }))
}
