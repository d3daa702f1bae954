//! # ocaform
//!
//! Compiles OCA packages into navigable, multi-language questionnaires.
//!
//! An OCA package describes capture units (attributes plus label, option,
//! cardinality and validation overlays) and presentation documents that
//! group those attributes into pages. `ocaform` turns one package into an
//! ordered list of [`Step`]s, each holding pages, sections and fully
//! resolved [`Field`]s, and keeps the state of a user filling them in.
//!
//! ## Features
//!
//! - Reference resolution between capture units, safe on cyclic schemas
//! - Per-language labels, options and help text with English fallback
//! - Merging of several presentations describing the same unit
//! - Dependency ordering of steps (parents before the steps they reference)
//! - Per-field validation: required, format, entry codes, UTF-8, options
//! - A session model with page navigation and repeatable child records
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ocaform::{FormDefinition, FormSession, Package};
//!
//! let json = std::fs::read_to_string("package.json").unwrap();
//! let package: Package = json.parse().unwrap();
//! let form = Arc::new(FormDefinition::compile(&package));
//!
//! let mut session = FormSession::new(form).unwrap();
//! session.edit_field("title", "Ocean temperatures").unwrap();
//! let failures = session.save_page();
//! ```
//!
//! ## Modules
//!
//! - [`data`] - Package model and the compiler
//! - [`validation`] - Field value checks
//! - [`session`] - Form session state
//! - [`error`] - Error types

#[macro_use]
extern crate log;

/// Package model, compiler and compiled form structures.
pub mod data;

/// Error types.
pub mod error;

/// Form session state and child records.
pub mod session;

/// Field value validation.
pub mod validation;

pub use data::{
    FormDefinition, Package,
    field::{Field, FieldType},
    page::{Page, Section},
    step::Step,
};
pub use error::{FormError, ValidationError};
pub use session::{ChildRecord, FormData, FormSession};
pub use validation::{FieldValue, validate_field};
