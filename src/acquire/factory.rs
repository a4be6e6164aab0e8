use std::collections::BTreeMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::acquire::config::{ConfigSchema, SourceConfig};
use crate::acquire::error::ScopeError;
use crate::acquire::source::DataSource;

/// Constructor signature every registered source provides. Runs on a config
/// already resolved against the source's schema.
pub type SourceConstructor = fn(&SourceConfig) -> Result<Box<dyn DataSource>, ScopeError>;

/// Everything the registry knows about one source type. The schema is the
/// registry's only coupling to the CLI layer, which surfaces it as flags.
#[derive(Clone)]
pub struct SourceRegistration {
    pub name: &'static str,
    pub summary: &'static str,
    pub schema: ConfigSchema,
    pub build: SourceConstructor,
}

static REGISTRY: Lazy<RwLock<BTreeMap<&'static str, SourceRegistration>>> =
    Lazy::new(|| RwLock::new(BTreeMap::new()));

/// Register a source type with the process-wide registry. A later
/// registration under the same name replaces the earlier one.
pub fn register(registration: SourceRegistration) {
    REGISTRY
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .insert(registration.name, registration);
}

/// Look up a single source's registration.
pub fn lookup(name: &str) -> Result<SourceRegistration, ScopeError> {
    REGISTRY
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(name)
        .cloned()
        .ok_or_else(|| ScopeError::UnknownSource(name.to_string()))
}

/// Construct a source by name: resolve `options` against its schema
/// (defaults, type checks), then run its constructor (semantic checks).
pub fn create(name: &str, options: &SourceConfig) -> Result<Box<dyn DataSource>, ScopeError> {
    let registration = lookup(name)?;
    let resolved = registration.schema.resolve(options)?;
    (registration.build)(&resolved)
}

/// All registered sources, in name order.
pub fn registered_sources() -> Vec<SourceRegistration> {
    REGISTRY
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .values()
        .cloned()
        .collect()
}
