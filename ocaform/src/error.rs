//! Error types shared by the compiler, the validator and the session.
//!
//! Nothing raised while compiling a package is fatal: the compiler logs the
//! problem and degrades. These types surface where a caller asked for
//! something specific (a step, a field, a child record) that does not exist,
//! or where a field value was rejected.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FormError>;

/// Errors returned by lookups and session actions.
#[derive(Debug, Error)]
pub enum FormError {
    /// A capture-unit or reference id resolves to nothing.
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    /// Steps reference each other in a loop and cannot be ordered.
    #[error("cyclic reference between steps: {}", .0.join(", "))]
    CyclicReference(Vec<String>),

    /// No step with this id was compiled.
    #[error("unknown step: {0}")]
    UnknownStep(String),

    /// The field is not part of the step it was looked up in.
    #[error("field `{field}` does not belong to step `{step}`")]
    UnknownField { step: String, field: String },

    /// A child record was requested from a field without a navigable target.
    #[error("field `{0}` is not a navigable reference")]
    NotAReference(String),

    /// No child record with this id exists.
    #[error("unknown child record: {0}")]
    UnknownChild(String),

    /// A navigation target lies outside the compiled form.
    #[error("step index {index} out of range (form has {len} steps)")]
    StepOutOfRange { index: usize, len: usize },

    /// The package compiled to an empty form.
    #[error("the package has no presentations to render")]
    NothingToRender,

    /// The package document is not valid JSON for the package model.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Why a single field value was rejected.
///
/// Rules are checked in declaration order and the first failure wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, serde::Serialize, serde::Deserialize)]
pub enum ValidationError {
    /// Mandatory field left empty.
    #[error("this field is required")]
    Required,
    /// Value does not match the declared format.
    #[error("value does not match the expected format")]
    FormatMismatch,
    /// Value is not one of the declared entry codes.
    #[error("value is not an allowed entry code")]
    EntryCodeMismatch,
    /// Value is not valid UTF-8 text.
    #[error("value is not valid UTF-8 text")]
    InvalidEncoding,
    /// Value is not one of the options offered for the language.
    #[error("value is not one of the offered options")]
    OptionMismatch,
}

/// Signalled when the step graph contains a reference cycle.
///
/// The sorter falls back to discovery order and hands this back instead of
/// failing, so a form can still be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[error("cyclic reference between steps: {}", .unresolved.join(", "))]
pub struct CyclicReferenceWarning {
    /// Steps that could not be placed in dependency order.
    pub unresolved: Vec<String>,
}

impl From<CyclicReferenceWarning> for FormError {
    fn from(w: CyclicReferenceWarning) -> Self {
        FormError::CyclicReference(w.unresolved)
    }
}
