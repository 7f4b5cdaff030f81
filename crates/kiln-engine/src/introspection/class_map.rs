//! Per-class introspection cache
//!
//! A [`ClassMap`] indexes the public methods visible on a class (its own,
//! its superclasses' and every interface it implements) by [`MethodKey`] and
//! by bare name, plus the public fields the class declares itself. It is
//! built in one pass and then only ever grows by memoizing lookups.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use kiln_sdk::{ClassDef, ClassId, ClassRegistry, FieldDef, MethodDef};
use once_cell::sync::Lazy;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use tracing::{debug, trace};

use super::method_key::MethodKey;
use super::permissions::Permissions;
use crate::error::{IntrospectionError, IntrospectionResult};

/// Memoized outcome of a lookup
#[derive(Debug, Clone)]
pub enum Cached<T> {
    /// Resolved to a member
    Found(T),
    /// Looked up before: absent or denied
    Miss,
    /// Looked up before: overloads tied
    Ambiguous(Arc<[String]>),
}

/// Shared map for classes that expose nothing
static EMPTY: Lazy<Arc<ClassMap>> = Lazy::new(|| Arc::new(ClassMap::new(None, String::new())));

/// Method and field index of one class
#[derive(Debug)]
pub struct ClassMap {
    class: Option<ClassId>,
    class_name: String,
    def: Option<Arc<ClassDef>>,
    by_key: DashMap<MethodKey, Cached<Arc<MethodDef>>, FxBuildHasher>,
    by_name: FxHashMap<String, Vec<Arc<MethodDef>>>,
    fields: FxHashMap<String, Arc<FieldDef>>,
}

impl ClassMap {
    fn new(class: Option<ClassId>, class_name: String) -> Self {
        Self {
            class,
            class_name,
            def: None,
            by_key: DashMap::with_hasher(FxBuildHasher),
            by_name: FxHashMap::default(),
            fields: FxHashMap::default(),
        }
    }

    /// The shared empty map
    pub fn empty() -> Arc<ClassMap> {
        EMPTY.clone()
    }

    /// Build the map of `class` under `permissions`.
    ///
    /// Unknown, retired or denied classes, and classes exposing nothing,
    /// get the shared empty map.
    pub fn create(registry: &ClassRegistry, class: ClassId, permissions: &Permissions) -> Arc<ClassMap> {
        let Some(def) = registry.get(class) else {
            return Self::empty();
        };
        if !def.is_alive() || !permissions.allow_class(&def) {
            return Self::empty();
        }

        let mut map = ClassMap::new(Some(class), def.qualified_name());
        map.def = Some(def.clone());
        let mut admitted = Vec::new();
        let mut visited = FxHashSet::default();

        let mut current = Some(def.clone());
        while let Some(c) = current {
            map.collect_methods(&c, permissions, &mut admitted);
            map.collect_interfaces(registry, &c, permissions, &mut visited, &mut admitted);
            current = c.superclass().and_then(|s| registry.get(s));
        }

        for method in admitted {
            map.by_name
                .entry(method.name().to_string())
                .or_default()
                .push(method);
        }

        if def.is_public() {
            for field in def.fields() {
                if field.is_public() && permissions.allow_field(&def, field) {
                    map.fields.insert(field.name().to_string(), field.clone());
                }
            }
        }

        if map.by_key.is_empty() && map.fields.is_empty() {
            return Self::empty();
        }
        trace!(
            class = %map.class_name,
            methods = map.by_key.len(),
            fields = map.fields.len(),
            "created class map"
        );
        Arc::new(map)
    }

    fn collect_interfaces(
        &mut self,
        registry: &ClassRegistry,
        class: &ClassDef,
        permissions: &Permissions,
        visited: &mut FxHashSet<ClassId>,
        admitted: &mut Vec<Arc<MethodDef>>,
    ) {
        for &iface in class.interfaces() {
            if !visited.insert(iface) {
                continue;
            }
            if let Some(idef) = registry.get(iface) {
                self.collect_methods(&idef, permissions, admitted);
                self.collect_interfaces(registry, &idef, permissions, visited, admitted);
            }
        }
    }

    fn collect_methods(&mut self, class: &ClassDef, permissions: &Permissions, admitted: &mut Vec<Arc<MethodDef>>) {
        if !class.is_public() || !permissions.allow_class(class) {
            return;
        }
        for method in class.methods() {
            if !method.is_public() {
                continue;
            }
            let key = MethodKey::from_method(method);
            match self.by_key.entry(key) {
                Entry::Occupied(existing) => {
                    if let Cached::Found(prev) = existing.get() {
                        if prev.params() != method.params() {
                            debug!(
                                class = %self.class_name,
                                kept = ?prev.params(),
                                dropped = ?method.params(),
                                method = method.name(),
                                "signature collision, keeping first"
                            );
                        }
                    }
                }
                Entry::Vacant(slot) => {
                    if permissions.allow_method(class, method) {
                        slot.insert(Cached::Found(method.clone()));
                        admitted.push(method.clone());
                    } else {
                        slot.insert(Cached::Miss);
                    }
                }
            }
        }
    }

    /// Class this map describes (`None` for the empty map)
    pub fn class(&self) -> Option<ClassId> {
        self.class
    }

    /// Whether this is the shared empty map
    pub fn is_empty(&self) -> bool {
        self.class.is_none()
    }

    /// False once the described class has been retired. Reads the class's
    /// own flag, so the registry is never consulted.
    pub fn is_alive(&self) -> bool {
        self.def.as_ref().map_or(true, |d| d.is_alive())
    }

    /// Find the method for `key`.
    ///
    /// Exact keys registered during population answer directly. Other keys
    /// are resolved against the overloads of the same name and the outcome
    /// is memoized, ambiguity included.
    pub fn get_method(&self, registry: &ClassRegistry, key: &MethodKey) -> IntrospectionResult<Option<Arc<MethodDef>>> {
        if self.is_empty() {
            return Ok(None);
        }
        let cached = self.by_key.get(key).map(|entry| entry.value().clone());
        let cached = match cached {
            Some(cached) => cached,
            None => {
                let resolved = self.resolve(registry, key);
                self.by_key
                    .entry(key.clone())
                    .or_insert(resolved)
                    .value()
                    .clone()
            }
        };
        match cached {
            Cached::Found(method) => Ok(Some(method)),
            Cached::Miss => Ok(None),
            Cached::Ambiguous(candidates) => Err(IntrospectionError::Ambiguous {
                class: self.class_name.clone(),
                method: key.describe(registry),
                candidates: candidates.to_vec(),
            }),
        }
    }

    fn resolve(&self, registry: &ClassRegistry, key: &MethodKey) -> Cached<Arc<MethodDef>> {
        let Some(candidates) = self.by_name.get(key.name()) else {
            return Cached::Miss;
        };
        match key.most_specific(registry, candidates) {
            Ok(Some(method)) => Cached::Found(method),
            Ok(None) => Cached::Miss,
            Err(ambiguity) => {
                debug!(
                    class = %self.class_name,
                    method = %key.describe(registry),
                    candidates = ambiguity.candidates.len(),
                    "ambiguous overload"
                );
                Cached::Ambiguous(ambiguity.candidates.into())
            }
        }
    }

    /// Admitted overloads of `name`, in discovery order
    pub fn methods(&self, name: &str) -> Vec<Arc<MethodDef>> {
        self.by_name.get(name).cloned().unwrap_or_default()
    }

    /// Names of all admitted methods, sorted
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.keys().cloned().collect();
        names.sort();
        names
    }

    /// Admitted public field declared by this class
    pub fn get_field(&self, name: &str) -> Option<Arc<FieldDef>> {
        self.fields.get(name).cloned()
    }

    /// Names of all admitted fields, sorted
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.fields.keys().cloned().collect();
        names.sort();
        names
    }
}
