//! Duck-typed access: any class with `get(key)` or `set(key, value)`

use std::sync::Arc;

use kiln_sdk::{ClassId, MethodDef, Type, Value};

use super::{Executor, TryOutcome};
use crate::error::{IntrospectionError, IntrospectionResult};
use crate::introspection::{Introspector, MethodKey};

/// Generic `get(key)` read
#[derive(Debug, Clone)]
pub struct DuckGet {
    class: ClassId,
    method: Arc<MethodDef>,
    key: Value,
    /// Argument passed to `get`: the key, or its `int` form
    arg: Value,
}

impl DuckGet {
    /// Discover an admitted `get(key)` on `class`.
    ///
    /// A string key that names no such overload is retried as an `int`
    /// when it parses as one.
    pub fn discover(introspector: &Introspector, class: ClassId, key: &Value) -> IntrospectionResult<Option<Self>> {
        let found = introspector.get_method(class, &MethodKey::from_args("get", std::slice::from_ref(key)))?;
        if let Some(method) = found {
            return Ok(Some(Self {
                class,
                method,
                key: key.clone(),
                arg: key.clone(),
            }));
        }
        let Some(index) = key.as_str().and_then(|s| s.parse::<i32>().ok()) else {
            return Ok(None);
        };
        let index = Value::Int(index);
        let found = introspector.get_method(class, &MethodKey::from_args("get", std::slice::from_ref(&index)))?;
        Ok(found.map(|method| Self {
            class,
            method,
            key: key.clone(),
            arg: index,
        }))
    }

    /// Call `get` with the bound key
    pub fn invoke(&self, target: &Value) -> IntrospectionResult<Value> {
        self.method
            .invoke(target, std::slice::from_ref(&self.arg))
            .map_err(|e| IntrospectionError::invocation(self.method.name(), e))
    }

    /// Call if the class matches and `key` equals the bound key
    pub fn try_invoke(&self, target: &Value, key: &Value) -> IntrospectionResult<TryOutcome> {
        if target.is_null() || target.class_id() != self.class || *key != self.key {
            return Ok(TryOutcome::Failed);
        }
        self.invoke(target).map(TryOutcome::Done)
    }
}

impl Executor for DuckGet {
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

impl PartialEq for DuckGet {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && Arc::ptr_eq(&self.method, &other.method) && self.key == other.key
    }
}

/// Generic `set(key, value)` or `put(key, value)` write
#[derive(Debug, Clone)]
pub struct DuckSet {
    class: ClassId,
    method: Arc<MethodDef>,
    key: Value,
    value_type: Type,
}

impl DuckSet {
    /// Discover an admitted `set(key, value)`, falling back to `put(key, value)`
    pub fn discover(
        introspector: &Introspector,
        class: ClassId,
        key: &Value,
        value: &Value,
    ) -> IntrospectionResult<Option<Self>> {
        let args = [key.clone(), value.clone()];
        for name in ["set", "put"] {
            if let Some(method) = introspector.get_method(class, &MethodKey::from_args(name, &args))? {
                return Ok(Some(Self {
                    class,
                    method,
                    key: key.clone(),
                    value_type: value.runtime_type(),
                }));
            }
        }
        Ok(None)
    }

    /// Call the setter with the bound key, returning `value`
    pub fn invoke(&self, target: &Value, value: &Value) -> IntrospectionResult<Value> {
        self.method
            .invoke(target, &[self.key.clone(), value.clone()])
            .map_err(|e| IntrospectionError::invocation(self.method.name(), e))?;
        Ok(value.clone())
    }

    /// Call if the class matches, `key` equals the bound key and the value
    /// has the type discovery saw or still fits the second parameter's type
    pub fn try_invoke(&self, target: &Value, key: &Value, value: &Value) -> IntrospectionResult<TryOutcome> {
        if target.is_null() || target.class_id() != self.class || *key != self.key {
            return Ok(TryOutcome::Failed);
        }
        let fits = match self.method.params().get(1) {
            Some(_) if !value.is_null() && value.runtime_type() == self.value_type => true,
            Some(param) if param.is_primitive() => value.primitive_kind() == param.primitive_kind(),
            Some(_) => true,
            None => false,
        };
        if !fits {
            return Ok(TryOutcome::Failed);
        }
        self.invoke(target, value).map(TryOutcome::Done)
    }
}

impl Executor for DuckSet {
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

impl PartialEq for DuckSet {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && Arc::ptr_eq(&self.method, &other.method) && self.key == other.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspection::Permissions;
    use kiln_sdk::{arg, ClassBuilder, ClassRegistry, Type};
    use parking_lot::Mutex;
    use rustc_hash::FxHashMap;

    #[derive(Default)]
    struct Bag {
        slots: Mutex<FxHashMap<String, Value>>,
    }

    fn setup() -> (Introspector, ClassId, Value) {
        let registry = Arc::new(ClassRegistry::new());
        let id = registry
            .register(
                ClassBuilder::new("t.Bag")
                    .method("get", &[Type::STRING], Type::OBJECT, |this, args| {
                        let key: String = arg(args, 0)?;
                        Ok(this.state::<Bag>()?.slots.lock().get(&key).cloned().unwrap_or_default())
                    })
                    .method("set", &[Type::STRING, Type::OBJECT], Type::VOID, |this, args| {
                        let key: String = arg(args, 0)?;
                        this.state::<Bag>()?.slots.lock().insert(key, args[1].clone());
                        Ok(Value::Null)
                    }),
            )
            .unwrap();
        let target = Value::object(id, Bag::default());
        (Introspector::new(registry, Permissions::unrestricted()), id, target)
    }

    #[test]
    fn test_duck_get_and_set() {
        let (is, id, target) = setup();
        let set = DuckSet::discover(&is, id, &Value::from("a"), &Value::Int(1)).unwrap().unwrap();
        set.invoke(&target, &Value::Int(1)).unwrap();
        let get = DuckGet::discover(&is, id, &Value::from("a")).unwrap().unwrap();
        assert_eq!(get.invoke(&target).unwrap(), Value::Int(1));
        assert_eq!(get.try_invoke(&target, &Value::from("a")).unwrap(), TryOutcome::Done(Value::Int(1)));
        assert!(get.try_invoke(&target, &Value::from("b")).unwrap().is_failed());
    }

    #[test]
    fn test_put_fallback_on_maps() {
        let registry = Arc::new(ClassRegistry::new());
        let is = Introspector::new(registry, Permissions::unrestricted());
        let set = DuckSet::discover(&is, ClassId::HASH_MAP, &Value::from("k"), &Value::Int(2))
            .unwrap()
            .unwrap();
        let map = kiln_sdk::MapObject::new_value(Vec::<(Value, Value)>::new());
        set.invoke(&map, &Value::Int(2)).unwrap();
        assert_eq!(
            map.state::<kiln_sdk::MapObject>().unwrap().get(&Value::from("k")),
            Value::Int(2)
        );
    }

    #[test]
    fn test_numeric_string_key_retried_as_int() {
        let registry = Arc::new(ClassRegistry::new());
        let is = Introspector::new(registry, Permissions::unrestricted());
        let get = DuckGet::discover(&is, ClassId::ARRAY_LIST, &Value::from("1")).unwrap().unwrap();
        assert_eq!(get.target_property(), Value::from("1"));
        let list = kiln_sdk::ListObject::new_value(vec![Value::Int(5), Value::Int(6)]);
        assert_eq!(get.invoke(&list).unwrap(), Value::Int(6));
        // replays for the identifier it was discovered with
        assert_eq!(get.try_invoke(&list, &Value::from("1")).unwrap(), TryOutcome::Done(Value::Int(6)));
        assert!(get.try_invoke(&list, &Value::Int(1)).unwrap().is_failed());
        assert!(DuckGet::discover(&is, ClassId::ARRAY_LIST, &Value::from("x")).unwrap().is_none());
    }

    #[test]
    fn test_widened_duck_set_replays() {
        let registry = Arc::new(ClassRegistry::new());
        let id = registry
            .register(ClassBuilder::new("t.Ledger").method("set", &[Type::STRING, Type::LONG], Type::VOID, |_, _| {
                Ok(Value::Null)
            }))
            .unwrap();
        let is = Introspector::new(registry, Permissions::unrestricted());
        let ledger = Value::object(id, ());
        let key = Value::from("total");
        let set = DuckSet::discover(&is, id, &key, &Value::Int(1)).unwrap().unwrap();
        assert_eq!(set.try_invoke(&ledger, &key, &Value::Int(2)).unwrap(), TryOutcome::Done(Value::Int(2)));
        assert_eq!(set.try_invoke(&ledger, &key, &Value::Long(3)).unwrap(), TryOutcome::Done(Value::Long(3)));
        assert!(set.try_invoke(&ledger, &key, &Value::from("x")).unwrap().is_failed());
    }
}
