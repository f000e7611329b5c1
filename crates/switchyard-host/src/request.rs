use axum::http::Method;
use indexmap::IndexMap;
use serde_json::Value;

use crate::cluster::ClusterSummary;
use crate::datetime::UserProfile;

/// Context the session layer attaches to every request.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub cluster_id: Option<String>,
    pub clusters: Vec<ClusterSummary>,
    pub choose_cluster_form: Value,
    pub profile: Option<UserProfile>,
}

impl SessionContext {
    /// The selected cluster, with blank selections treated as none.
    pub fn cluster_id(&self) -> Option<&str> {
        self.cluster_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// One inbound request as seen by a view.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Query and form parameters; form values win on collision.
    pub params: IndexMap<String, String>,
    /// Object id taken from the route, if the route has one.
    pub path_id: Option<String>,
    pub session: SessionContext,
}

impl InboundRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            params: IndexMap::new(),
            path_id: None,
            session: SessionContext::default(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_path_id(mut self, id: impl Into<String>) -> Self {
        self.path_id = Some(id.into());
        self
    }

    pub fn with_cluster(mut self, cluster_id: impl Into<String>) -> Self {
        self.session.cluster_id = Some(cluster_id.into());
        self
    }

    pub fn with_session(mut self, session: SessionContext) -> Self {
        self.session = session;
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Route id first, then the `id` parameter.
    pub fn object_id(&self) -> Option<&str> {
        self.path_id.as_deref().or_else(|| self.param("id"))
    }
}
