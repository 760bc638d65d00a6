use thiserror::Error;

/// Errors raised while rendering a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unresolved reference to {stack}/{logical_id} in template; synthesize the assembly first")]
    UnresolvedReference { stack: String, logical_id: String },

    #[error("cannot render template as JSON")]
    Json(#[from] serde_json::Error),
}
