use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use serde_json::{Map, Value};

use crate::dispatch::DispatchError;
use crate::request::InboundRequest;
use crate::schema::FieldSchema;

pub(crate) mod change_password;
pub(crate) mod create_edit;
pub mod declarative;
pub(crate) mod delete;
pub(crate) mod index;

pub use declarative::DeclarativeHooks;

/// What a create/edit view did, derived from its form prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Created,
    Updated,
}

impl Verb {
    pub fn from_prefix(form_prefix: &str) -> Self {
        if form_prefix.is_empty() {
            Verb::Created
        } else {
            Verb::Updated
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Created => "created",
            Verb::Updated => "updated",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    pub template: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateEditOptions {
    /// Prepended to every input name when reading the form body.
    pub form_prefix: String,
}

impl CreateEditOptions {
    pub fn verb(&self) -> Verb {
        Verb::from_prefix(&self.form_prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOptions {
    pub error_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePasswordOptions {
    pub password_field: String,
    pub confirm_field: String,
    pub success_message: String,
    pub error_message: String,
}

impl Default for ChangePasswordOptions {
    fn default() -> Self {
        Self {
            password_field: "password1".to_string(),
            confirm_field: "password2".to_string(),
            success_message: "Password updated".to_string(),
            error_message: "Could not change the password".to_string(),
        }
    }
}

/// The verb a view implements together with its verb-specific settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewKind {
    Index(IndexOptions),
    CreateEdit(CreateEditOptions),
    Delete(DeleteOptions),
    ChangePassword(ChangePasswordOptions),
}

impl ViewKind {
    pub fn label(&self) -> &'static str {
        match self {
            ViewKind::Index(_) => "index",
            ViewKind::CreateEdit(options) => match options.verb() {
                Verb::Created => "create",
                Verb::Updated => "edit",
            },
            ViewKind::Delete(_) => "delete",
            ViewKind::ChangePassword(_) => "change_password",
        }
    }

    pub fn default_methods(&self) -> Vec<Method> {
        match self {
            ViewKind::Index(_) => vec![Method::GET],
            _ => vec![Method::POST],
        }
    }

    /// Whether the route also takes the object id as a path segment.
    pub fn takes_path_id(&self) -> bool {
        matches!(self, ViewKind::Delete(_) | ViewKind::ChangePassword(_))
    }
}

/// Inputs available to [`ViewHooks::handle`].
pub struct HandleContext<'a> {
    pub request: &'a InboundRequest,
    pub locale: &'a str,
}

/// Per-view customization points.
///
/// `handle` is consulted by index views and `success_message` by create/edit
/// views; both fail with [`DispatchError::NotImplemented`] unless overridden.
pub trait ViewHooks: Send + Sync {
    /// Fields merged into the invocation payload before the schema inputs.
    fn extra_input(&self, _request: &InboundRequest) -> Result<Map<String, Value>, DispatchError> {
        Ok(Map::new())
    }

    /// View-specific render fields.
    fn handle(&self, _ctx: &HandleContext<'_>) -> Result<Map<String, Value>, DispatchError> {
        Err(DispatchError::NotImplemented { hook: "handle" })
    }

    fn success_message(
        &self,
        _data: &Value,
        _verb: Verb,
        _locale: &str,
    ) -> Result<String, DispatchError> {
        Err(DispatchError::NotImplemented {
            hook: "success_message",
        })
    }

    /// Fields merged into a create/edit reply ahead of the copied outputs.
    fn extra_return(&self, _request: &InboundRequest) -> Result<Map<String, Value>, DispatchError> {
        Ok(Map::new())
    }
}

/// Hooks that only provide the trait defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl ViewHooks for DefaultHooks {}

/// A named, immutable view definition shared by every request it serves.
#[derive(Clone)]
pub struct View {
    name: String,
    service_name: Option<String>,
    methods: Vec<Method>,
    schema: FieldSchema,
    kind: ViewKind,
    hooks: Arc<dyn ViewHooks>,
}

impl View {
    pub fn new(name: impl Into<String>, kind: ViewKind) -> Self {
        Self {
            name: name.into(),
            service_name: None,
            methods: kind.default_methods(),
            schema: FieldSchema::default(),
            kind,
            hooks: Arc::new(DefaultHooks),
        }
    }

    pub fn with_service(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    pub fn with_methods(mut self, methods: Vec<Method>) -> Self {
        self.methods = methods;
        self
    }

    pub fn with_schema(mut self, schema: FieldSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ViewHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blank service names count as unset.
    pub fn service_name(&self) -> Option<&str> {
        self.service_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn kind(&self) -> &ViewKind {
        &self.kind
    }

    pub fn hooks(&self) -> &dyn ViewHooks {
        self.hooks.as_ref()
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("service_name", &self.service_name)
            .field("methods", &self.methods)
            .field("schema", &self.schema)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
