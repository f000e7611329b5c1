use std::error::Error as StdError;
use std::sync::Arc;

use axum::http::Method;
use serde_json::{Map, Value, json};
use switchyard_core::gateway::optional_string;
use switchyard_core::{Gateway, GatewayError, InvocationRequest, InvocationResponse};
use thiserror::Error;
use tracing::{Level, span};

use crate::cluster::ClusterSummary;
use crate::i18n;
use crate::metrics::DispatchMetrics;
use crate::normalize::{NormalizeError, RenderRecord};
use crate::request::InboundRequest;
use crate::view::{View, ViewKind, change_password, create_edit, delete, index};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("view `{view}` has no service configured")]
    MissingService { view: String },
    #[error("gateway invocation failed")]
    Gateway(#[from] GatewayError),
    #[error("service `{service}` reported a failure")]
    ServiceRejected { service: String },
    #[error("failed to normalize the service response")]
    Normalize(#[from] NormalizeError),
    #[error("`{hook}` must be implemented by the view")]
    NotImplemented { hook: &'static str },
    #[error("view hook failed")]
    Hook(#[source] Box<dyn StdError + Send + Sync>),
}

/// Everything an Index view hands to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderPayload {
    pub cluster_id: Option<String>,
    pub items: Vec<RenderRecord>,
    pub item: Option<RenderRecord>,
    pub zato_clusters: Vec<ClusterSummary>,
    pub choose_cluster_form: Value,
    /// View-specific fields; they override the shared keys on collision.
    pub extra: Map<String, Value>,
}

impl RenderPayload {
    pub fn to_context(&self) -> Value {
        let mut context = Map::new();
        context.insert("cluster_id".into(), optional_string(self.cluster_id.as_deref()));
        context.insert("items".into(), json!(self.items));
        context.insert("item".into(), json!(self.item));
        context.insert("zato_clusters".into(), json!(self.zato_clusters));
        context.insert("choose_cluster_form".into(), self.choose_cluster_form.clone());
        for (key, value) in &self.extra {
            context.insert(key.clone(), value.clone());
        }
        Value::Object(context)
    }
}

/// Outcome of one dispatch, ready for the HTTP layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewResponse {
    Render {
        template: String,
        payload: RenderPayload,
    },
    /// JSON body for script-driven forms.
    Json(Value),
    Empty,
    ServerError(String),
    MethodNotAllowed {
        allowed: Vec<Method>,
        message: String,
    },
}

/// Runs views against a gateway: one gateway call at most per request, and
/// every failure converted into [`ViewResponse::ServerError`].
#[derive(Clone)]
pub struct Dispatcher {
    gateway: Arc<dyn Gateway>,
    metrics: Arc<DispatchMetrics>,
    locale: String,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            metrics: Arc::new(DispatchMetrics::default()),
            locale: i18n::select_locale(None),
        }
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = i18n::select_locale(Some(locale));
        self
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    pub fn dispatch(&self, view: &View, request: &InboundRequest) -> ViewResponse {
        DispatchMetrics::incr(&self.metrics.dispatches);
        let cluster_id = request.session.cluster_id();
        let root_span = span!(
            Level::INFO,
            "view.dispatch",
            view = %view.name(),
            kind = view.kind().label(),
            service = ?view.service_name(),
            cluster_id = ?cluster_id
        );
        let _root_guard = root_span.enter();

        if !view.allows(&request.method) {
            return self.reject_method(view, &request.method);
        }

        let result = match view.kind() {
            ViewKind::Index(options) => index::run(self, view, options, request),
            ViewKind::CreateEdit(options) => create_edit::run(self, view, options, request),
            ViewKind::Delete(_) => delete::run(self, view, request),
            ViewKind::ChangePassword(options) => {
                change_password::run(self, view, options, request)
            }
        };
        match result {
            Ok(response) => response,
            Err(err) => self.fail(view, &err),
        }
    }

    fn reject_method(&self, view: &View, method: &Method) -> ViewResponse {
        DispatchMetrics::incr(&self.metrics.rejected_methods);
        let allowed = view
            .methods()
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let message = i18n::format_message(
            i18n::METHOD_NOT_ALLOWED,
            "method not allowed",
            &self.locale,
            &[
                ("method", method.as_str()),
                ("view", view.name()),
                ("allowed", &allowed),
            ],
        );
        tracing::warn!(method = %method, allowed = %allowed, "{message}");
        ViewResponse::MethodNotAllowed {
            allowed: view.methods().to_vec(),
            message,
        }
    }

    fn fail(&self, view: &View, err: &DispatchError) -> ViewResponse {
        DispatchMetrics::incr(&self.metrics.failures);
        let trace = format_trace(err);
        let body = match view.kind() {
            ViewKind::Delete(options) => format!("{}, e:[{trace}]", options.error_message),
            ViewKind::ChangePassword(options) => {
                format!("{}, e:[{trace}]", options.error_message)
            }
            ViewKind::Index(_) | ViewKind::CreateEdit(_) => trace,
        };
        tracing::error!(error = %body, "view dispatch failed");
        ViewResponse::ServerError(body)
    }

    /// The single gateway round trip of a request.
    pub(crate) fn invoke(
        &self,
        service: &str,
        payload: &InvocationRequest,
    ) -> Result<InvocationResponse, DispatchError> {
        DispatchMetrics::incr(&self.metrics.invocations);
        let invoke_span = span!(Level::DEBUG, "gateway.invoke", service = %service);
        let _invoke_guard = invoke_span.enter();
        self.gateway.invoke(service, payload).map_err(|err| {
            DispatchMetrics::incr(&self.metrics.invoke_errors);
            DispatchError::Gateway(err)
        })
    }

    pub(crate) fn skip_invocation(&self, reason: &'static str) {
        DispatchMetrics::incr(&self.metrics.skipped_invocations);
        tracing::debug!(reason, "gateway invocation skipped");
    }
}

/// `{id, cluster_id}`, then hook-supplied extras, then the schema inputs read
/// from `prefix + name`.
pub(crate) fn build_request(
    view: &View,
    request: &InboundRequest,
    id: Option<&str>,
    prefix: &str,
) -> Result<InvocationRequest, DispatchError> {
    let mut payload = InvocationRequest::new(id, request.session.cluster_id());
    payload.merge(view.hooks().extra_input(request)?);
    for name in view.schema().input_required() {
        let key = format!("{prefix}{name}");
        payload.insert(name.clone(), optional_string(request.param(&key)));
    }
    Ok(payload)
}

pub(crate) fn require_service(view: &View) -> Result<&str, DispatchError> {
    view.service_name()
        .ok_or_else(|| DispatchError::MissingService {
            view: view.name().to_string(),
        })
}

/// The error followed by each of its sources, one per line.
pub fn format_trace(err: &(dyn StdError + 'static)) -> String {
    let mut trace = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        trace.push_str("\ncaused by: ");
        trace.push_str(&cause.to_string());
        source = cause.source();
    }
    trace
}
