//! Class map registry
//!
//! The [`Introspector`] owns one [`ClassMap`] per class, created lazily on
//! first use and published with insert-if-absent: threads racing on the same
//! class may each build a map, but only the first one stored is ever seen.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use kiln_sdk::{ClassId, ClassRegistry, ConstructorDef, FieldDef, MethodDef, Value};
use rustc_hash::FxBuildHasher;
use tracing::debug;

use super::class_map::{Cached, ClassMap};
use super::method_key::MethodKey;
use super::permissions::Permissions;
use crate::error::{IntrospectionError, IntrospectionResult};

/// Per-engine cache of class maps and constructors
pub struct Introspector {
    registry: Arc<ClassRegistry>,
    permissions: Permissions,
    class_maps: DashMap<ClassId, Arc<ClassMap>, FxBuildHasher>,
    constructors: DashMap<MethodKey, Cached<Arc<ConstructorDef>>, FxBuildHasher>,
}

impl Introspector {
    /// Create an introspector over `registry`
    pub fn new(registry: Arc<ClassRegistry>, permissions: Permissions) -> Self {
        Self {
            registry,
            permissions,
            class_maps: DashMap::with_hasher(FxBuildHasher),
            constructors: DashMap::with_hasher(FxBuildHasher),
        }
    }

    /// The class registry
    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    /// The permission policy
    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    /// The class map of `class`, built on first use
    pub fn get_map(&self, class: ClassId) -> Arc<ClassMap> {
        if let Some(map) = self.class_maps.get(&class).map(|m| m.value().clone()) {
            if map.is_alive() {
                return map;
            }
            self.purge(class);
            return ClassMap::empty();
        }

        let built = ClassMap::create(&self.registry, class, &self.permissions);
        match self.class_maps.entry(class) {
            Entry::Occupied(existing) => {
                debug!(class = %class, "lost class map race, discarding redundant walk");
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                slot.insert(built.clone());
                built
            }
        }
    }

    /// Drop the cached map of `class` (and its constructors).
    ///
    /// Returns whether a map was cached.
    pub fn purge(&self, class: ClassId) -> bool {
        if let Some(def) = self.registry.get(class) {
            let prefix = def.qualified_name();
            self.constructors.retain(|key, _| key.name() != prefix);
        }
        self.class_maps.remove(&class).is_some()
    }

    /// Number of cached class maps
    pub fn class_map_count(&self) -> usize {
        self.class_maps.len()
    }

    /// Resolve `key` on `class`
    pub fn get_method(&self, class: ClassId, key: &MethodKey) -> IntrospectionResult<Option<Arc<MethodDef>>> {
        self.get_map(class).get_method(&self.registry, key)
    }

    /// Resolve a call of `name` with `args` on `class`
    pub fn get_method_for_args(
        &self,
        class: ClassId,
        name: &str,
        args: &[Value],
    ) -> IntrospectionResult<Option<Arc<MethodDef>>> {
        self.get_method(class, &MethodKey::from_args(name, args))
    }

    /// Admitted public field of `class`
    pub fn get_field(&self, class: ClassId, name: &str) -> Option<Arc<FieldDef>> {
        self.get_map(class).get_field(name)
    }

    /// Admitted overloads of `name` on `class`
    pub fn methods(&self, class: ClassId, name: &str) -> Vec<Arc<MethodDef>> {
        self.get_map(class).methods(name)
    }

    /// Admitted method names of `class`, sorted
    pub fn method_names(&self, class: ClassId) -> Vec<String> {
        self.get_map(class).method_names()
    }

    /// Admitted field names of `class`, sorted
    pub fn field_names(&self, class: ClassId) -> Vec<String> {
        self.get_map(class).field_names()
    }

    /// Look up a class by qualified name, if the policy lets scripts see it
    pub fn get_class_by_name(&self, name: &str) -> Option<ClassId> {
        let def = self.registry.get_by_name(name)?;
        (def.is_alive() && self.permissions.allow_class(&def)).then(|| def.id())
    }

    /// Resolve the constructor of `class_name` best matching `args`
    pub fn get_constructor(&self, class_name: &str, args: &[Value]) -> IntrospectionResult<Option<Arc<ConstructorDef>>> {
        let Some(def) = self.registry.get_by_name(class_name) else {
            return Ok(None);
        };
        if !def.is_alive() || !def.is_public() || def.is_interface() || !self.permissions.allow_class(&def) {
            return Ok(None);
        }

        let key = MethodKey::from_args(class_name, args);
        let cached = self.constructors.get(&key).map(|c| c.value().clone());
        let cached = match cached {
            Some(cached) => cached,
            None => {
                let candidates: Vec<Arc<ConstructorDef>> = def
                    .constructors()
                    .iter()
                    .filter(|c| c.is_public() && self.permissions.allow_constructor(&def, c))
                    .cloned()
                    .collect();
                let resolved = match key.most_specific(&self.registry, &candidates) {
                    Ok(Some(ctor)) => Cached::Found(ctor),
                    Ok(None) => Cached::Miss,
                    Err(ambiguity) => Cached::Ambiguous(ambiguity.candidates.into()),
                };
                self.constructors.entry(key.clone()).or_insert(resolved).value().clone()
            }
        };
        match cached {
            Cached::Found(ctor) => Ok(Some(ctor)),
            Cached::Miss => Ok(None),
            Cached::Ambiguous(candidates) => Err(IntrospectionError::Ambiguous {
                class: class_name.to_string(),
                method: key.describe(&self.registry),
                candidates: candidates.to_vec(),
            }),
        }
    }
}

impl std::fmt::Debug for Introspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Introspector")
            .field("permissions", &self.permissions)
            .field("class_maps", &self.class_maps.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_sdk::{ClassBuilder, Type};

    fn introspector() -> Introspector {
        Introspector::new(Arc::new(ClassRegistry::new()), Permissions::unrestricted())
    }

    #[test]
    fn test_map_is_cached_once() {
        let is = introspector();
        let a = is.get_map(ClassId::STRING);
        let b = is.get_map(ClassId::STRING);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(is.class_map_count(), 1);
    }

    #[test]
    fn test_queries() {
        let is = introspector();
        assert!(is.method_names(ClassId::STRING).contains(&"length".to_string()));
        assert_eq!(is.methods(ClassId::STRING, "substring").len(), 2);
        assert!(is.field_names(ClassId::STRING).is_empty());
        assert_eq!(is.field_names(ClassId::INTEGER), vec!["MAX_VALUE".to_string(), "MIN_VALUE".to_string()]);
        assert!(is.get_field(ClassId::INTEGER, "MAX_VALUE").unwrap().is_constant());
        assert_eq!(is.get_class_by_name("kiln.util.HashMap"), Some(ClassId::HASH_MAP));
        assert_eq!(is.get_class_by_name("no.Such"), None);
    }

    #[test]
    fn test_get_method_for_args() {
        let is = introspector();
        let m = is
            .get_method_for_args(ClassId::STRING, "substring", &[Value::Int(1), Value::Int(2)])
            .unwrap()
            .unwrap();
        assert_eq!(m.params().len(), 2);
        assert!(is
            .get_method_for_args(ClassId::STRING, "substring", &[Value::from("x")])
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_constructor_resolution() {
        let registry = Arc::new(ClassRegistry::new());
        let id = registry
            .register(
                ClassBuilder::new("t.Point")
                    .constructor(&[], |_| Ok(Value::Null))
                    .constructor(&[Type::INT, Type::INT], |args| Ok(args[0].clone())),
            )
            .unwrap();
        let is = Introspector::new(registry, Permissions::unrestricted());
        let ctor = is
            .get_constructor("t.Point", &[Value::Int(1), Value::Int(2)])
            .unwrap()
            .unwrap();
        assert_eq!(ctor.declaring_class(), id);
        assert_eq!(ctor.params().len(), 2);
        assert!(is.get_constructor("t.Point", &[Value::from("x")]).unwrap().is_none());
        assert!(is.get_constructor("kiln.util.List", &[]).unwrap().is_none());
    }

    #[test]
    fn test_retired_class_is_purged() {
        let registry = Arc::new(ClassRegistry::new());
        let id = registry
            .register(ClassBuilder::new("t.Temp").method("f", &[], Type::VOID, |_, _| Ok(Value::Null)))
            .unwrap();
        let is = Introspector::new(registry.clone(), Permissions::unrestricted());
        assert!(!is.get_map(id).is_empty());
        assert_eq!(is.class_map_count(), 1);

        registry.retire(id);
        assert!(is.get_map(id).is_empty());
        assert_eq!(is.class_map_count(), 0);
        assert_eq!(is.get_class_by_name("t.Temp"), None);
    }
}
