//! Class registry
//!
//! Owns every registered [`ClassDef`] and answers the hierarchy questions the
//! introspection layer asks: supertypes, assignability and distance. The core
//! classes are installed on construction at their fixed ids.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::builtins;
use crate::class::{ClassBuilder, ClassDef};
use crate::error::{HostError, HostResult};
use crate::types::{ClassId, Type};
use crate::value::{ArrayRef, Value};

#[derive(Default)]
struct RegistryInner {
    /// Classes indexed by ID
    classes: Vec<Arc<ClassDef>>,
    /// Qualified name to ID mapping
    name_to_id: FxHashMap<String, ClassId>,
    /// Interned array classes by component type
    arrays: FxHashMap<Type, ClassId>,
}

/// Registry of host classes.
///
/// Safe to share between threads; lookups take a read lock and hand out
/// `Arc<ClassDef>` so callers never hold the lock.
pub struct ClassRegistry {
    inner: RwLock<RegistryInner>,
}

impl ClassRegistry {
    /// Create a registry holding the core classes
    pub fn new() -> Self {
        let registry = Self {
            inner: RwLock::new(RegistryInner::default()),
        };
        builtins::install(&registry);
        registry
    }

    /// Register a class.
    ///
    /// Fails if the qualified name is taken or a referenced supertype is unknown.
    pub fn register(&self, builder: ClassBuilder) -> HostResult<ClassId> {
        // validation and insertion share one guard so a name is claimed once
        let mut inner = self.inner.write();
        let qualified = qualify(&builder.package, &builder.name);
        if inner.name_to_id.contains_key(&qualified) {
            return Err(HostError::DuplicateClass(qualified));
        }
        let known = |id: &ClassId| id.index() < inner.classes.len();
        if let Some(sup) = builder.superclass.filter(|s| !known(s)) {
            return Err(HostError::Failure(format!("unknown superclass {}", sup)));
        }
        if let Some(iface) = builder.interfaces.iter().find(|i| !known(*i)) {
            return Err(HostError::Failure(format!("unknown interface {}", iface)));
        }
        Ok(Self::insert_locked(&mut inner, builder))
    }

    /// Append a class without validation; used for the core classes
    pub(crate) fn insert(&self, builder: ClassBuilder) -> ClassId {
        Self::insert_locked(&mut self.inner.write(), builder)
    }

    fn insert_locked(inner: &mut RegistryInner, builder: ClassBuilder) -> ClassId {
        let id = ClassId::from_raw(inner.classes.len() as u32);
        let alive = Arc::new(AtomicBool::new(true));

        let superclass = match builder.superclass {
            None if !builder.is_interface && id != ClassId::OBJECT => Some(ClassId::OBJECT),
            other => other,
        };

        let methods = builder
            .methods
            .into_iter()
            .map(|mut m| {
                m.declaring_class = id;
                m.alive = alive.clone();
                Arc::new(m)
            })
            .collect();
        let fields = builder
            .fields
            .into_iter()
            .map(|mut f| {
                f.declaring_class = id;
                f.alive = alive.clone();
                Arc::new(f)
            })
            .collect();
        let constructors = builder
            .constructors
            .into_iter()
            .map(|mut c| {
                c.declaring_class = id;
                c.alive = alive.clone();
                Arc::new(c)
            })
            .collect();

        let def = ClassDef {
            id,
            name: builder.name,
            package: builder.package,
            is_public: builder.is_public,
            is_interface: builder.is_interface,
            superclass,
            interfaces: builder.interfaces,
            methods,
            fields,
            constructors,
            component: None,
            alive,
        };
        inner.name_to_id.insert(def.qualified_name(), id);
        inner.classes.push(Arc::new(def));
        id
    }

    /// Get class by ID
    pub fn get(&self, id: ClassId) -> Option<Arc<ClassDef>> {
        self.inner.read().classes.get(id.index()).cloned()
    }

    /// Get class by qualified name
    pub fn get_by_name(&self, name: &str) -> Option<Arc<ClassDef>> {
        let inner = self.inner.read();
        inner
            .name_to_id
            .get(name)
            .and_then(|id| inner.classes.get(id.index()))
            .cloned()
    }

    /// Resolve a qualified name to its id
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.inner.read().name_to_id.get(name).copied()
    }

    /// The array class for `component`, created on first use
    pub fn array_class(&self, component: Type) -> ClassId {
        if let Some(id) = self.inner.read().arrays.get(&component) {
            return *id;
        }
        let name = format!("{}[]", self.type_name(component));
        let mut inner = self.inner.write();
        if let Some(id) = inner.arrays.get(&component) {
            return *id;
        }
        let id = ClassId::from_raw(inner.classes.len() as u32);
        let def = ClassDef {
            id,
            name: name.clone(),
            package: String::new(),
            is_public: true,
            is_interface: false,
            superclass: Some(ClassId::OBJECT),
            interfaces: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            constructors: Vec::new(),
            component: Some(component),
            alive: Arc::new(AtomicBool::new(true)),
        };
        inner.classes.push(Arc::new(def));
        inner.name_to_id.insert(name, id);
        inner.arrays.insert(component, id);
        id
    }

    /// Create an array of `component` holding `elements`
    pub fn new_array(&self, component: Type, elements: Vec<Value>) -> HostResult<ArrayRef> {
        if let Type::Primitive(p) = component {
            if let Some(bad) = elements.iter().find(|v| v.primitive_kind() != Some(p)) {
                return Err(HostError::TypeMismatch {
                    expected: p.name().to_string(),
                    got: bad.type_name().to_string(),
                });
            }
        }
        let class = self.array_class(component);
        Ok(ArrayRef::new(class, component, elements))
    }

    /// Direct superclass
    pub fn superclass(&self, id: ClassId) -> Option<ClassId> {
        self.get(id).and_then(|c| c.superclass)
    }

    /// Directly implemented interfaces
    pub fn interfaces(&self, id: ClassId) -> Vec<ClassId> {
        self.get(id).map(|c| c.interfaces.clone()).unwrap_or_default()
    }

    /// Number of inheritance edges between `from` and its supertype `to`.
    ///
    /// Breadth-first over superclasses and interfaces. Interfaces reach the
    /// root class in one step. Arrays of references are covariant.
    /// Returns `None` when `to` is not a supertype of `from`.
    pub fn supertype_distance(&self, from: ClassId, to: ClassId) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        let inner = self.inner.read();
        Self::distance_locked(&inner, from, to)
    }

    fn distance_locked(inner: &RegistryInner, from: ClassId, to: ClassId) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        let from_def = inner.classes.get(from.index())?;
        let to_def = inner.classes.get(to.index())?;

        if let (Some(fc), Some(tc)) = (from_def.component, to_def.component) {
            return match (fc, tc) {
                (Type::Class(a), Type::Class(b)) => Self::distance_locked(inner, a, b),
                _ => None,
            };
        }

        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::new();
        queue.push_back((from, 0u32));
        visited.insert(from);

        while let Some((current, depth)) = queue.pop_front() {
            if current == to {
                return Some(depth);
            }
            let Some(def) = inner.classes.get(current.index()) else {
                continue;
            };
            let mut next: Vec<ClassId> = def.interfaces.clone();
            match def.superclass {
                Some(sup) => next.push(sup),
                None if current != ClassId::OBJECT => next.push(ClassId::OBJECT),
                None => {}
            }
            for n in next {
                if visited.insert(n) {
                    queue.push_back((n, depth + 1));
                }
            }
        }
        None
    }

    /// Whether a value of class `from` can be stored where `to` is expected
    pub fn is_assignable(&self, from: ClassId, to: ClassId) -> bool {
        self.supertype_distance(from, to).is_some()
    }

    /// Display name of a type
    pub fn type_name(&self, ty: Type) -> String {
        match ty {
            Type::Primitive(p) => p.name().to_string(),
            Type::Null => "null".to_string(),
            Type::Class(id) => self
                .get(id)
                .map(|c| c.qualified_name())
                .unwrap_or_else(|| id.to_string()),
        }
    }

    /// Distinct non-empty package names, sorted
    pub fn packages(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut packages: Vec<String> = inner
            .classes
            .iter()
            .filter(|c| !c.package.is_empty())
            .map(|c| c.package.clone())
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        packages.sort();
        packages
    }

    /// Check whether any class lives in `package`
    pub fn has_package(&self, package: &str) -> bool {
        self.inner.read().classes.iter().any(|c| c.package == package)
    }

    /// Retire a class. Its members report dead from now on, which
    /// invalidates every executor and cache entry built from them.
    ///
    /// Returns false if the class is unknown or already retired.
    pub fn retire(&self, id: ClassId) -> bool {
        match self.get(id) {
            Some(def) => def.alive.swap(false, Ordering::AcqRel),
            None => false,
        }
    }

    /// Number of registered classes, arrays included
    pub fn len(&self) -> usize {
        self.inner.read().classes.len()
    }

    /// Never true: the core classes are always present
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over a snapshot of all classes
    pub fn classes(&self) -> Vec<Arc<ClassDef>> {
        self.inner.read().classes.clone()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry").field("classes", &self.len()).finish()
    }
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", package, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ids_are_fixed() {
        let registry = ClassRegistry::new();
        assert_eq!(registry.class_id("kiln.lang.Object"), Some(ClassId::OBJECT));
        assert_eq!(registry.class_id("kiln.lang.String"), Some(ClassId::STRING));
        assert_eq!(registry.class_id("kiln.util.HashMap"), Some(ClassId::HASH_MAP));
        assert_eq!(registry.len(), ClassId::BUILTIN_COUNT as usize);
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ClassRegistry::new();
        let id = registry.register(ClassBuilder::new("geo.Point")).unwrap();
        let def = registry.get(id).unwrap();
        assert_eq!(def.qualified_name(), "geo.Point");
        assert_eq!(def.superclass(), Some(ClassId::OBJECT));
        assert_eq!(registry.get_by_name("geo.Point").unwrap().id(), id);
    }

    #[test]
    fn test_duplicate_rejected() {
        let registry = ClassRegistry::new();
        registry.register(ClassBuilder::new("a.A")).unwrap();
        assert_eq!(
            registry.register(ClassBuilder::new("a.A")),
            Err(HostError::DuplicateClass("a.A".to_string()))
        );
    }

    #[test]
    fn test_unknown_superclass_rejected() {
        let registry = ClassRegistry::new();
        let result = registry.register(ClassBuilder::new("a.A").extends(ClassId::from_raw(999)));
        assert!(result.is_err());
    }

    #[test]
    fn test_supertype_distance() {
        let registry = ClassRegistry::new();
        let base = registry.register(ClassBuilder::new("t.Base")).unwrap();
        let derived = registry
            .register(ClassBuilder::new("t.Derived").extends(base))
            .unwrap();

        assert_eq!(registry.supertype_distance(derived, derived), Some(0));
        assert_eq!(registry.supertype_distance(derived, base), Some(1));
        assert_eq!(registry.supertype_distance(derived, ClassId::OBJECT), Some(2));
        assert_eq!(registry.supertype_distance(base, derived), None);

        assert_eq!(registry.supertype_distance(ClassId::INTEGER, ClassId::NUMBER), Some(1));
        assert_eq!(registry.supertype_distance(ClassId::INTEGER, ClassId::COMPARABLE), Some(1));
        assert_eq!(registry.supertype_distance(ClassId::STRING, ClassId::CHAR_SEQUENCE), Some(1));
        assert_eq!(registry.supertype_distance(ClassId::LIST, ClassId::OBJECT), Some(1));
        assert!(registry.is_assignable(ClassId::ARRAY_LIST, ClassId::ITERABLE));
    }

    #[test]
    fn test_arrays_are_interned_and_covariant() {
        let registry = ClassRegistry::new();
        let strings = registry.array_class(Type::STRING);
        assert_eq!(registry.array_class(Type::STRING), strings);
        let objects = registry.array_class(Type::OBJECT);
        let ints = registry.array_class(Type::INT);

        assert_eq!(registry.get(strings).unwrap().name(), "kiln.lang.String[]");
        assert!(registry.is_assignable(strings, objects));
        assert!(!registry.is_assignable(objects, strings));
        assert!(!registry.is_assignable(ints, objects));
        assert!(registry.is_assignable(ints, ClassId::OBJECT));
    }

    #[test]
    fn test_new_array_checks_primitive_elements() {
        let registry = ClassRegistry::new();
        assert!(registry.new_array(Type::INT, vec![Value::Int(1)]).is_ok());
        assert!(registry.new_array(Type::INT, vec![Value::from("x")]).is_err());
    }

    #[test]
    fn test_retire_marks_members_dead() {
        let registry = ClassRegistry::new();
        let id = registry
            .register(ClassBuilder::new("t.Gone").method("f", &[], Type::VOID, |_, _| Ok(Value::Null)))
            .unwrap();
        let def = registry.get(id).unwrap();
        let method = def.methods()[0].clone();
        assert!(method.is_alive());

        assert!(registry.retire(id));
        assert!(!def.is_alive());
        assert!(!method.is_alive());
        assert!(!registry.retire(id));
    }

    #[test]
    fn test_packages() {
        let registry = ClassRegistry::new();
        registry.register(ClassBuilder::new("geo.Point")).unwrap();
        let packages = registry.packages();
        assert!(packages.contains(&"kiln.lang".to_string()));
        assert!(packages.contains(&"geo".to_string()));
        assert!(registry.has_package("kiln.util"));
        assert!(!registry.has_package("nope"));
    }
}
