//! # ocatool
//!
//! Command-line companion for OCA questionnaire packages.
//!
//! `ocatool` loads a package, compiles it with [`ocaform`] and lets you look
//! at the result from the terminal.
//!
//! ## Features
//!
//! - **Compile**: Write the ordered steps as JSON for a front end
//! - **Inspect**: Coloured outline of steps, pages, sections and fields
//! - **Check**: Validate an answers document against the form
//! - **Questions**: Build the flattened submission document
//! - **Config schema**: Print the JSON schema of `.ocatool.toml`
//!
//! ## Modules
//!
//! - [`config`] - Tool configuration
//! - [`ctx`] - Application context
//! - [`report`] - Terminal reports
//! - [`submit`] - Submission document

/// Tool configuration loaded from `.ocatool.toml`.
pub mod config;

/// Application context and package loading.
pub mod ctx;

/// Form outline and answer checks for the terminal.
pub mod report;

/// Flattened submission document.
pub mod submit;

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;
