use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use axum::http::Method;
use serde::{Deserialize, Serialize};
use switchyard_core::GatewayConfig;
use switchyard_core::env::DEFAULT_GATEWAY_TIMEOUT;
use url::Url;

use crate::cluster::{ClusterSummary, ServersState};
use crate::datetime::UserProfile;
use crate::i18n;
use crate::presenter::HandlebarsPresenter;
use crate::schema::FieldSchema;
use crate::view::{
    ChangePasswordOptions, CreateEditOptions, DeclarativeHooks, DeleteOptions, IndexOptions,
    View, ViewKind,
};

pub const DEFAULT_PORT: u16 = 8080;
const EDIT_FORM_PREFIX: &str = "edit-";

/// Everything the host needs to serve a set of views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    #[serde(default)]
    pub server: ServerSection,
    pub gateway: GatewaySection,
    #[serde(default)]
    pub check: Option<CheckSection>,
    #[serde(default)]
    pub locale: Option<String>,
    /// Display preferences applied to every session.
    #[serde(default)]
    pub profile: Option<UserProfile>,
    #[serde(default)]
    pub clusters: Vec<ClusterDecl>,
    #[serde(default)]
    pub views: Vec<ViewDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub bind: IpAddr,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    /// `http(s)://` base URL or a fixture directory (`fs://`, `file://`, or a
    /// plain path).
    pub location: String,
    /// humantime duration, e.g. `"10s"`.
    #[serde(default)]
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckSection {
    pub endpoint: Url,
    #[serde(default)]
    pub timeout: Option<String>,
}

impl CheckSection {
    pub fn timeout(&self) -> Result<Duration> {
        match self.timeout.as_deref() {
            Some(raw) => humantime::parse_duration(raw.trim())
                .with_context(|| format!("invalid check timeout `{raw}`")),
            None => Ok(DEFAULT_GATEWAY_TIMEOUT),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterDecl {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub servers: Option<ServersState>,
}

impl ClusterDecl {
    pub fn summary(&self) -> ClusterSummary {
        let summary = ClusterSummary::new(&self.id, &self.name);
        match &self.servers {
            Some(state) => summary.with_servers_state(state),
            None => summary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKindDecl {
    Index,
    Create,
    Edit,
    Delete,
    ChangePassword,
}

/// One `[[views]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewDecl {
    pub name: String,
    pub kind: ViewKindDecl,
    pub route: String,
    #[serde(default)]
    pub service: Option<String>,
    /// Template name handed to the presenter (index views).
    #[serde(default)]
    pub template: Option<String>,
    /// Handlebars source registered under `template`.
    #[serde(default)]
    pub template_file: Option<PathBuf>,
    #[serde(default)]
    pub methods: Option<Vec<String>>,
    #[serde(default)]
    pub schema: FieldSchema,
    #[serde(default)]
    pub form_prefix: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub password_field: Option<String>,
    #[serde(default)]
    pub confirm_field: Option<String>,
    #[serde(default)]
    pub success_message: Option<String>,
    #[serde(default)]
    pub hooks: DeclarativeHooks,
}

impl ViewDecl {
    pub fn build(&self, locale: &str) -> Result<View> {
        if !self.route.starts_with('/') {
            bail!("view `{}`: route `{}` must start with `/`", self.name, self.route);
        }
        if let Some(segment) = self
            .route
            .split('/')
            .find(|segment| segment.contains(['{', '}']) || segment.starts_with([':', '*']))
        {
            bail!(
                "view `{}`: route `{}` has a capture segment `{segment}`",
                self.name,
                self.route
            );
        }
        let kind = self.kind(locale)?;
        let mut view = View::new(&self.name, kind)
            .with_schema(self.schema.clone())
            .with_hooks(Arc::new(self.hooks.clone()));
        if let Some(service) = &self.service {
            view = view.with_service(service);
        }
        if let Some(methods) = &self.methods {
            view = view.with_methods(parse_methods(&self.name, methods)?);
        }
        Ok(view)
    }

    fn kind(&self, locale: &str) -> Result<ViewKind> {
        let kind = match self.kind {
            ViewKindDecl::Index => ViewKind::Index(IndexOptions {
                template: self
                    .template
                    .clone()
                    .ok_or_else(|| anyhow!("index view `{}` needs a template", self.name))?,
            }),
            ViewKindDecl::Create | ViewKindDecl::Edit => {
                let default_prefix = if self.kind == ViewKindDecl::Edit {
                    EDIT_FORM_PREFIX
                } else {
                    ""
                };
                ViewKind::CreateEdit(CreateEditOptions {
                    form_prefix: self
                        .form_prefix
                        .clone()
                        .unwrap_or_else(|| default_prefix.to_string()),
                })
            }
            ViewKindDecl::Delete => ViewKind::Delete(DeleteOptions {
                error_message: self.error_message.clone().unwrap_or_else(|| {
                    let object = self.hooks.object_label.as_deref().unwrap_or(&self.name);
                    i18n::format_message(
                        i18n::DELETE_FAILED,
                        "Could not delete the {object}",
                        locale,
                        &[("object", object)],
                    )
                }),
            }),
            ViewKindDecl::ChangePassword => {
                let defaults = ChangePasswordOptions::default();
                ViewKind::ChangePassword(ChangePasswordOptions {
                    password_field: self
                        .password_field
                        .clone()
                        .unwrap_or(defaults.password_field),
                    confirm_field: self.confirm_field.clone().unwrap_or(defaults.confirm_field),
                    success_message: self.success_message.clone().unwrap_or_else(|| {
                        i18n::resolve_message(
                            i18n::PASSWORD_UPDATED,
                            &defaults.success_message,
                            locale,
                        )
                    }),
                    error_message: self.error_message.clone().unwrap_or_else(|| {
                        i18n::resolve_message(
                            i18n::PASSWORD_FAILED,
                            &defaults.error_message,
                            locale,
                        )
                    }),
                })
            }
        };
        Ok(kind)
    }
}

fn parse_methods(view: &str, methods: &[String]) -> Result<Vec<Method>> {
    if methods.is_empty() {
        bail!("view `{view}` allows no methods");
    }
    methods
        .iter()
        .map(|raw| {
            Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
                .with_context(|| format!("view `{view}`: invalid method `{raw}`"))
        })
        .collect()
}

/// A view together with the route it is mounted on.
#[derive(Debug, Clone)]
pub struct RoutedView {
    pub route: String,
    pub view: View,
}

impl HostConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            _ => toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?,
        };
        if let Some(parent) = path.parent() {
            config.resolve_relative_paths(parent);
        }
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse config")
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind, self.server.port)
    }

    pub fn locale(&self) -> String {
        i18n::select_locale(self.locale.as_deref())
    }

    pub fn gateway_config(&self) -> Result<GatewayConfig> {
        GatewayConfig::from_parts(&self.gateway.location, self.gateway.timeout.as_deref())?
            .with_env_overrides()
    }

    pub fn cluster_summaries(&self) -> Vec<ClusterSummary> {
        self.clusters.iter().map(ClusterDecl::summary).collect()
    }

    /// Builds every view, rejecting routes that collide.
    /// Builds every view and checks that no two of them, nor the built-in
    /// endpoints, claim the same path.
    pub fn routed_views(&self) -> Result<Vec<RoutedView>> {
        let locale = self.locale();
        let mut claimed = HashMap::from([(
            "/healthz".to_string(),
            "the health endpoint".to_string(),
        )]);
        if self.check.is_some() {
            claimed.insert("/check/{}".to_string(), "the check endpoint".to_string());
        }
        let mut views = Vec::with_capacity(self.views.len());
        for decl in &self.views {
            let view = decl.build(&locale)?;
            let mut paths = vec![decl.route.clone()];
            if view.kind().takes_path_id() {
                paths.push(format!("{}/{{}}", decl.route.trim_end_matches('/')));
            }
            for path in paths {
                if let Some(owner) = claimed.get(&path) {
                    bail!(
                        "view `{}`: route `{path}` is already served by {owner}",
                        decl.name
                    );
                }
                claimed.insert(path, format!("view `{}`", decl.name));
            }
            views.push(RoutedView {
                route: decl.route.clone(),
                view,
            });
        }
        Ok(views)
    }

    pub fn presenter(&self) -> Result<HandlebarsPresenter> {
        let mut presenter = HandlebarsPresenter::new();
        for decl in &self.views {
            if let (Some(name), Some(path)) = (&decl.template, &decl.template_file) {
                presenter.register_file(name, path)?;
            }
        }
        Ok(presenter)
    }

    /// Human-readable summary of the resolved configuration.
    pub fn explain(&self) -> Result<String> {
        let gateway = self.gateway_config()?;
        let mut report = format!(
            "listen: {}\ngateway: {} ({}, timeout {})\nlocale: {}\n",
            self.bind_addr(),
            gateway.location.display(),
            gateway.location.scheme(),
            humantime::format_duration(gateway.timeout),
            self.locale(),
        );
        if let Some(check) = &self.check {
            report.push_str(&format!("check: {}\n", check.endpoint));
        }
        for cluster in &self.clusters {
            report.push_str(&format!("cluster: {} ({})\n", cluster.id, cluster.name));
        }
        for routed in self.routed_views()? {
            let view = &routed.view;
            let methods = view
                .methods()
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(",");
            report.push_str(&format!(
                "view: {} {} [{}] {} -> {}\n",
                routed.route,
                view.name(),
                view.kind().label(),
                methods,
                view.service_name().unwrap_or("-"),
            ));
        }
        Ok(report)
    }

    fn resolve_relative_paths(&mut self, base: &Path) {
        for decl in &mut self.views {
            if let Some(path) = decl.template_file.as_mut()
                && path.is_relative()
            {
                *path = base.join(&*path);
            }
        }
    }
}
