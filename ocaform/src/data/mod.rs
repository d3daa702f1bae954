//! Package model and the schema-to-form compiler.
//!
//! Compilation runs leaf-first through these submodules:
//!
//! - [`package`] - Raw package model, read leniently
//! - [`resolver`] - Capture-unit lookup by digest or alias
//! - [`relation`] - Reference graph of a capture unit
//! - [`overlay`] - Per-attribute overlay projection
//! - [`field`] - Field synthesis
//! - [`page`] - Page and section layout
//! - [`step`] - Step assembly across presentations
//! - [`sort`] - Dependency ordering of steps
//! - [`navigation`] - Parent and child queries over steps
//! - [`definition`] - The compiled form

/// The compiled form.
pub mod definition;

/// Field synthesis from overlays and interaction hints.
pub mod field;

/// Parent and child queries over compiled steps.
pub mod navigation;

/// Per-attribute overlay projection.
pub mod overlay;

/// Raw package model.
pub mod package;

/// Page and section layout.
pub mod page;

/// Reference graph extraction.
pub mod relation;

/// Capture-unit lookup.
pub mod resolver;

/// Dependency ordering of steps.
pub mod sort;

/// Step assembly.
pub mod step;

#[cfg(test)]
pub(crate) mod fixtures;

pub use definition::FormDefinition;
pub use package::Package;
