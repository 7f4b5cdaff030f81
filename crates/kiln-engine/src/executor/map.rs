//! Keyed container access through `Map.get` / `Map.put`

use std::sync::Arc;

use kiln_sdk::{ClassId, MethodDef, Value};

use super::{same_key_type, Executor, TryOutcome};
use crate::error::{IntrospectionError, IntrospectionResult};
use crate::introspection::{Introspector, MethodKey};

fn is_map(introspector: &Introspector, class: ClassId) -> bool {
    introspector.registry().is_assignable(class, ClassId::MAP)
}

/// `map[key]` read
#[derive(Debug, Clone)]
pub struct MapGet {
    class: ClassId,
    method: Arc<MethodDef>,
    key: Value,
}

impl MapGet {
    /// Discover on classes assignable to `Map` exposing an admitted `get(key)`
    pub fn discover(introspector: &Introspector, class: ClassId, key: &Value) -> IntrospectionResult<Option<Self>> {
        if !is_map(introspector, class) {
            return Ok(None);
        }
        let method = introspector.get_method(class, &MethodKey::from_args("get", std::slice::from_ref(key)))?;
        Ok(method.map(|method| Self {
            class,
            method,
            key: key.clone(),
        }))
    }

    /// Value stored under the bound key, `null` when absent
    pub fn invoke(&self, target: &Value) -> IntrospectionResult<Value> {
        self.get(target, &self.key)
    }

    fn get(&self, target: &Value, key: &Value) -> IntrospectionResult<Value> {
        self.method
            .invoke(target, std::slice::from_ref(key))
            .map_err(|e| IntrospectionError::invocation(self.method.name(), e))
    }

    /// Read `key` if the target class matches and `key` has the bound key's type
    pub fn try_invoke(&self, target: &Value, key: &Value) -> IntrospectionResult<TryOutcome> {
        if target.is_null() || target.class_id() != self.class || !same_key_type(&self.key, key) {
            return Ok(TryOutcome::Failed);
        }
        self.get(target, key).map(TryOutcome::Done)
    }
}

impl Executor for MapGet {
    fn target_class(&self) -> ClassId {
        self.class
    }

    fn target_property(&self) -> Value {
        self.key.clone()
    }

    fn is_alive(&self) -> bool {
        self.method.is_alive()
    }
}

impl PartialEq for MapGet {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && Arc::ptr_eq(&self.method, &other.method) && self.key == other.key
    }
}

/// `map[key] = value` write
#[derive(Debug, Clone)]
pub struct MapSet {
    class: ClassId,
    method: Arc<MethodDef>,
    key: Value,
}

impl MapSet {
    /// Discover on classes assignable to `Map` exposing an admitted `put(key, value)`
    pub fn discover(
        introspector: &Introspector,
        class: ClassId,
        key: &Value,
        value: &Value,
    ) -> IntrospectionResult<Option<Self>> {
        if !is_map(introspector, class) {
            return Ok(None);
        }
        let args = [key.clone(), value.clone()];
        let method = introspector.get_method(class, &MethodKey::from_args("put", &args))?;
        Ok(method.map(|method| Self {
            class,
            method,
            key: key.clone(),
        }))
    }

    /// Store `value` under the bound key, returning `value`
    pub fn invoke(&self, target: &Value, value: &Value) -> IntrospectionResult<Value> {
        self.put(target, &self.key, value)
    }

    fn put(&self, target: &Value, key: &Value, value: &Value) -> IntrospectionResult<Value> {
        self.method
            .invoke(target, &[key.clone(), value.clone()])
            .map_err(|e| IntrospectionError::invocation(self.method.name(), e))?;
        Ok(value.clone())
    }

    /// Store under `key` if the target class matches and `key` has the bound key's type
    pub fn try_invoke(&self, target: &Value, key: &Value, value: &Value) -> IntrospectionResult<TryOutcome> {
        if target.is_null() || target.class_id() != self.class || !same_key_type(&self.key, key) {
            return Ok(TryOutcome::Failed);
        }
        self.put(target, key, value).map(TryOutcome::Done)
    }
}

impl Executor for MapSet {
    fn target_class(&self) -> ClassId {
        self.class
    }

    fn target_property(&self) -> Value {
        self.key.clone()
    }

    fn is_alive(&self) -> bool {
        self.method.is_alive()
    }
}

impl PartialEq for MapSet {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && Arc::ptr_eq(&self.method, &other.method) && self.key == other.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspection::Permissions;
    use kiln_sdk::{ClassRegistry, MapObject};

    fn introspector() -> Introspector {
        Introspector::new(Arc::new(ClassRegistry::new()), Permissions::unrestricted())
    }

    #[test]
    fn test_get_present_and_absent() {
        let is = introspector();
        let map = MapObject::new_value([(Value::from("k"), Value::Int(7))]);
        let get = MapGet::discover(&is, ClassId::HASH_MAP, &Value::from("k")).unwrap().unwrap();
        assert_eq!(get.invoke(&map).unwrap(), Value::Int(7));
        assert_eq!(get.target_property(), Value::from("k"));

        let missing = MapGet::discover(&is, ClassId::HASH_MAP, &Value::from("nope")).unwrap().unwrap();
        assert_eq!(missing.invoke(&map).unwrap(), Value::Null);
    }

    #[test]
    fn test_try_invoke_uses_given_key() {
        let is = introspector();
        let map = MapObject::new_value([(Value::from("a"), Value::Int(1)), (Value::from("b"), Value::Int(2))]);
        let get = MapGet::discover(&is, ClassId::HASH_MAP, &Value::from("a")).unwrap().unwrap();
        assert_eq!(get.try_invoke(&map, &Value::from("b")).unwrap(), TryOutcome::Done(Value::Int(2)));
        assert!(get.try_invoke(&map, &Value::Int(1)).unwrap().is_failed());
        assert!(get.try_invoke(&Value::from("s"), &Value::from("a")).unwrap().is_failed());
    }

    #[test]
    fn test_not_a_map() {
        let is = introspector();
        assert!(MapGet::discover(&is, ClassId::STRING, &Value::from("k")).unwrap().is_none());
        assert!(MapSet::discover(&is, ClassId::ARRAY_LIST, &Value::from("k"), &Value::Int(1))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_set() {
        let is = introspector();
        let map = MapObject::new_value(Vec::<(Value, Value)>::new());
        let set = MapSet::discover(&is, ClassId::HASH_MAP, &Value::from("k"), &Value::Int(1))
            .unwrap()
            .unwrap();
        assert_eq!(set.invoke(&map, &Value::Int(1)).unwrap(), Value::Int(1));
        let out = set.try_invoke(&map, &Value::from("j"), &Value::Int(2)).unwrap();
        assert_eq!(out, TryOutcome::Done(Value::Int(2)));
        let state = map.state::<MapObject>().unwrap();
        assert_eq!(state.get(&Value::from("k")), Value::Int(1));
        assert_eq!(state.get(&Value::from("j")), Value::Int(2));
    }

    #[test]
    fn test_discovery_is_idempotent() {
        let is = introspector();
        let a = MapGet::discover(&is, ClassId::HASH_MAP, &Value::from("k")).unwrap().unwrap();
        let b = MapGet::discover(&is, ClassId::HASH_MAP, &Value::from("k")).unwrap().unwrap();
        let c = MapGet::discover(&is, ClassId::HASH_MAP, &Value::from("j")).unwrap().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
