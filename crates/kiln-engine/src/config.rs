//! Engine configuration
//!
//! ```toml
//! [introspection]
//! strict = true
//! strategy = "pojo"            # or "map"
//! permissions = "restricted"   # or "unrestricted"
//! allow = ["app.model.Person"]
//! deny = ["app.model { Person { ssn; wipe(); } }"]
//! ```

use std::path::Path;
use std::sync::Arc;

use kiln_sdk::ClassRegistry;
use serde::Deserialize;
use tracing::warn;

use crate::error::{IntrospectionError, IntrospectionResult};
use crate::introspection::Permissions;
use crate::strategy::ResolverStrategy;
use crate::uberspect::Uberspect;

/// Starting point of the permission policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyBase {
    /// Every class visible
    #[default]
    Unrestricted,
    /// Only the core packages visible
    Restricted,
}

/// The `[introspection]` table
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntrospectionConfig {
    /// Report accessor failures from object contexts
    #[serde(default)]
    pub strict: bool,

    /// Resolver ordering
    #[serde(default)]
    pub strategy: ResolverStrategy,

    /// Base policy
    #[serde(default)]
    pub permissions: PolicyBase,

    /// Qualified class names granted on top of the base policy
    #[serde(default)]
    pub allow: Vec<String>,

    /// Deny rules, composed in order
    #[serde(default)]
    pub deny: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    introspection: IntrospectionConfig,
}

impl IntrospectionConfig {
    /// Parse from TOML text. A missing `[introspection]` table gives the defaults.
    pub fn load_from_toml(content: &str) -> IntrospectionResult<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| IntrospectionError::Config(e.to_string()))?;
        Ok(file.introspection)
    }

    /// Read and parse a TOML file
    pub fn load_from_file(path: &Path) -> IntrospectionResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| IntrospectionError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::load_from_toml(&content)
    }

    /// Assemble the policy: base, then granted classes, then each deny rule
    pub fn permissions(&self, registry: &ClassRegistry) -> IntrospectionResult<Permissions> {
        let mut permissions = match self.permissions {
            PolicyBase::Unrestricted => Permissions::unrestricted(),
            PolicyBase::Restricted => Permissions::restricted(),
        };
        if !self.allow.is_empty() {
            permissions = permissions.with_classes(self.allow.iter().map(String::as_str));
        }
        for rules in &self.deny {
            permissions = permissions.compose(rules)?;
        }
        for package in permissions.rule_packages() {
            if !registry.has_package(&package) {
                warn!(package = %package, "deny rule names an unknown package");
            }
        }
        Ok(permissions)
    }

    /// Build the resolution facade over `registry`
    pub fn build(&self, registry: Arc<ClassRegistry>) -> IntrospectionResult<Uberspect> {
        let permissions = self.permissions(&registry)?;
        Ok(Uberspect::with_strategy(registry, permissions, self.strategy))
    }
}
