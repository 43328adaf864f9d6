use std::sync::Arc;

use axum::response::{Html, IntoResponse, Response};
use http::{header::ACCEPT, HeaderMap, StatusCode};
use mediatype::MediaTypeList;
use serde::Serialize;
use serde_json::Value;

use crate::{request::ResolvedOperation, response::EncodedResponse};

pub const DEFAULT_GRAPHIQL_VERSION: &str = "0.17.5";

const DEFAULT_TEMPLATE: &str = include_str!("../templates/explorer.html");

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Explorer template could not be rendered: {0}")]
    Render(String),
}

/// The values a template is rendered with.
///
/// Every value but `graphiql_version` is a JavaScript
/// literals, either a quoted string or `null`, and can be embedded in a
/// script as they are.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplorerValues {
    pub graphiql_version: String,
    pub subscriptions: String,
    pub query: String,
    pub variables: String,
    pub operation_name: String,
    pub result: String,
}

impl ExplorerValues {
    fn get(&self, name: &str) -> Option<&str> {
        Some(match name {
            "graphiql_version" => &self.graphiql_version,
            "subscriptions" => &self.subscriptions,
            "query" => &self.query,
            "variables" => &self.variables,
            "operation_name" => &self.operation_name,
            "result" => &self.result,
            _ => return None,
        })
    }
}

/// Renders explorer templates with an external templating library.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template: &str, values: &ExplorerValues) -> Result<String, TemplateError>;
}

#[async_trait::async_trait]
pub trait AsyncTemplateEngine: Send + Sync {
    async fn render(&self, template: &str, values: &ExplorerValues) -> Result<String, TemplateError>;
}

/// Handlebars HTML-escapes by default, which breaks the JavaScript literals.
/// Register [`handlebars::no_escape`] on the registry.
#[cfg(feature = "handlebars")]
impl TemplateEngine for handlebars::Handlebars<'static> {
    fn render(&self, template: &str, values: &ExplorerValues) -> Result<String, TemplateError> {
        self.render_template(template, values)
            .map_err(|err| TemplateError::Render(err.to_string()))
    }
}

#[derive(Clone, Default)]
pub(crate) enum Renderer {
    /// Substitutes `{{ name }}` placeholders.
    #[default]
    Builtin,
    Sync(Arc<dyn TemplateEngine>),
    Async(Arc<dyn AsyncTemplateEngine>),
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin => write!(f, "Builtin"),
            Self::Sync(_) => write!(f, "Sync"),
            Self::Async(_) => write!(f, "Async"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Explorer {
    pub version: String,
    pub template: Option<Arc<str>>,
    pub renderer: Renderer,
    pub subscriptions: Option<String>,
}

impl Default for Explorer {
    fn default() -> Self {
        Explorer {
            version: DEFAULT_GRAPHIQL_VERSION.to_owned(),
            template: None,
            renderer: Renderer::Builtin,
            subscriptions: None,
        }
    }
}

impl Explorer {
    pub(crate) fn values(
        &self,
        operation: Option<&ResolvedOperation>,
        response: &EncodedResponse,
        first_is_null: bool,
    ) -> ExplorerValues {
        let query = operation.and_then(|operation| operation.query());
        let operation_name = operation.and_then(|operation| operation.operation_name.as_deref());
        let variables = operation
            .filter(|operation| !operation.variables.is_empty())
            .and_then(|operation| serde_json::to_string_pretty(&operation.variables).ok());

        ExplorerValues {
            graphiql_version: self.version.clone(),
            subscriptions: js_literal(self.subscriptions.as_deref()),
            query: js_literal(query),
            variables: js_literal(variables.as_deref()),
            operation_name: js_literal(operation_name),
            result: js_literal((!first_is_null).then_some(response.body.as_str())),
        }
    }

    pub(crate) async fn render(&self, values: &ExplorerValues) -> Result<String, TemplateError> {
        let template = self.template.as_deref().unwrap_or(DEFAULT_TEMPLATE);

        match &self.renderer {
            Renderer::Builtin => Ok(substitute(template, values)),
            Renderer::Sync(engine) => engine.render(template, values),
            Renderer::Async(engine) => engine.render(template, values).await,
        }
    }
}

/// Whether the client would rather see the explorer than JSON.
pub(crate) fn accepts_html(headers: &HeaderMap) -> bool {
    headers.get_all(ACCEPT).iter().any(|value| {
        value
            .to_str()
            .map(|accept| {
                MediaTypeList::new(accept).flatten().any(|media_type| {
                    let (ty, subty) = (media_type.ty.as_str(), media_type.subty.as_str());
                    (ty.eq_ignore_ascii_case("text") && subty.eq_ignore_ascii_case("html")) || (ty == "*" && subty == "*")
                })
            })
            .unwrap_or(false)
    })
}

pub(crate) fn html_response(page: String) -> Response {
    (StatusCode::OK, Html(page)).into_response()
}

/// A JSON string literal safe to embed in a `<script>` element, or `null`.
fn js_literal(value: Option<&str>) -> String {
    match value {
        Some(value) => Value::String(value.to_owned()).to_string().replace("</", "<\\/"),
        None => "null".to_owned(),
    }
}

/// Replaces every `{{ name }}` placeholder naming a known value, anything else
/// is left untouched.
fn substitute(template: &str, values: &ExplorerValues) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };

        match values.get(after[..end].trim()) {
            Some(value) => output.push_str(value),
            None => output.push_str(&rest[start..start + 2 + end + 2]),
        }

        rest = &after[end + 2..];
    }

    output.push_str(rest);
    output
}
