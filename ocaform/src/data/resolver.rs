use std::collections::HashMap;

use crate::{
    data::package::{CaptureUnit, OcaBundle},
    error::{FormError, Result},
};

/// Locates capture units by identifier.
///
/// Lookup order is fixed: the bundle's capture-base digest, then each
/// dependency's capture-base digest, then each dependency's own digest (the
/// alias used by `refs:` sentinels). When several units share an id the
/// first one in that order wins. Indexes are built once, so repeated
/// lookups are constant time.
pub struct EntityResolver<'a> {
    bundle: &'a CaptureUnit,
    dependencies: &'a [CaptureUnit],
    by_capture_base: HashMap<&'a str, usize>,
    by_digest: HashMap<&'a str, usize>,
}

impl<'a> EntityResolver<'a> {
    pub fn new(bundle: &'a CaptureUnit, dependencies: &'a [CaptureUnit]) -> Self {
        let mut by_capture_base = HashMap::new();
        let mut by_digest = HashMap::new();
        for (idx, dep) in dependencies.iter().enumerate() {
            by_capture_base
                .entry(dep.capture_base.d.as_str())
                .or_insert(idx);
            by_digest.entry(dep.d.as_str()).or_insert(idx);
        }
        Self {
            bundle,
            dependencies,
            by_capture_base,
            by_digest,
        }
    }

    pub fn from_bundle(oca: &'a OcaBundle) -> Self {
        Self::new(&oca.bundle, &oca.dependencies)
    }

    /// The root bundle.
    pub fn bundle(&self) -> &'a CaptureUnit {
        self.bundle
    }

    /// Resolve `id` to its capture unit.
    pub fn resolve(&self, id: &str) -> Result<&'a CaptureUnit> {
        if self.bundle.capture_base.d == id {
            return Ok(self.bundle);
        }
        self.by_capture_base
            .get(id)
            .or_else(|| self.by_digest.get(id))
            .map(|&idx| &self.dependencies[idx])
            .ok_or_else(|| FormError::EntityNotFound(id.to_string()))
    }

    /// Resolve `id` and return the canonical (capture-base) digest of the
    /// unit it names.
    pub fn canonical_id(&self, id: &str) -> Result<&'a str> {
        self.resolve(id).map(|unit| unit.capture_base.d.as_str())
    }
}
