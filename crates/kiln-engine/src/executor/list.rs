//! Indexed access to arrays and `List`s

use std::sync::Arc;

use kiln_sdk::{ClassId, HostError, MethodDef, Type, Value};

use super::{cast_integer, Executor, TryOutcome};
use crate::error::{IntrospectionError, IntrospectionResult};
use crate::introspection::{Introspector, MethodKey};

const ARRAY_MEMBER: &str = "[]";

/// Which kind of indexed container an executor drives
#[derive(Debug, Clone)]
pub enum ListKind {
    /// Native array element access
    Array,
    /// An admitted `get(int)` / `set(int, value)` on a `List`
    List(Arc<MethodDef>),
}

impl ListKind {
    fn member(&self) -> &str {
        match self {
            ListKind::Array => ARRAY_MEMBER,
            ListKind::List(m) => m.name(),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            ListKind::Array => true,
            ListKind::List(m) => m.is_alive(),
        }
    }
}

impl PartialEq for ListKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ListKind::Array, ListKind::Array) => true,
            (ListKind::List(a), ListKind::List(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn is_array(introspector: &Introspector, class: ClassId) -> bool {
    introspector.registry().get(class).map(|c| c.is_array()).unwrap_or(false)
}

fn is_list(introspector: &Introspector, class: ClassId) -> bool {
    introspector.registry().is_assignable(class, ClassId::LIST)
}

fn array_of(target: &Value) -> Result<&kiln_sdk::ArrayRef, HostError> {
    match target {
        Value::Array(a) => Ok(a),
        Value::Null => Err(HostError::NullTarget),
        other => Err(HostError::TypeMismatch {
            expected: "array".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

/// `list[index]` read
#[derive(Debug, Clone, PartialEq)]
pub struct ListGet {
    class: ClassId,
    kind: ListKind,
    index: i32,
}

impl ListGet {
    /// Discover when `key` is a number and `class` is an array or a `List`
    /// with an admitted `get(int)`. Bounds are checked at invocation.
    pub fn discover(introspector: &Introspector, class: ClassId, key: &Value) -> IntrospectionResult<Option<Self>> {
        let Some(index) = cast_integer(key) else {
            return Ok(None);
        };
        let kind = if is_array(introspector, class) {
            ListKind::Array
        } else if is_list(introspector, class) {
            match introspector.get_method(class, &MethodKey::new("get", &[Type::INT]))? {
                Some(method) => ListKind::List(method),
                None => return Ok(None),
            }
        } else {
            return Ok(None);
        };
        Ok(Some(Self { class, kind, index }))
    }

    /// The container kind
    pub fn kind(&self) -> &ListKind {
        &self.kind
    }

    /// Element at the bound index
    pub fn invoke(&self, target: &Value) -> IntrospectionResult<Value> {
        self.get(target, self.index)
    }

    fn get(&self, target: &Value, index: i32) -> IntrospectionResult<Value> {
        let result = match &self.kind {
            ListKind::Array => array_of(target).and_then(|a| a.get(index)),
            ListKind::List(method) => method.invoke(target, &[Value::Int(index)]),
        };
        result.map_err(|e| IntrospectionError::invocation(self.kind.member(), e))
    }

    /// Read `key` if the target class matches and `key` is still an index
    pub fn try_invoke(&self, target: &Value, key: &Value) -> IntrospectionResult<TryOutcome> {
        if target.is_null() || target.class_id() != self.class {
            return Ok(TryOutcome::Failed);
        }
        match cast_integer(key) {
            Some(index) => self.get(target, index).map(TryOutcome::Done),
            None => Ok(TryOutcome::Failed),
        }
    }
}

impl Executor for ListGet {
    fn target_class(&self) -> ClassId {
        self.class
    }

    fn target_property(&self) -> Value {
        Value::Int(self.index)
    }

    fn is_alive(&self) -> bool {
        self.kind.is_alive()
    }
}

/// `list[index] = value` write
#[derive(Debug, Clone, PartialEq)]
pub struct ListSet {
    class: ClassId,
    kind: ListKind,
    index: i32,
}

impl ListSet {
    /// Discover when `key` is a number and `class` is an array, or a `List`
    /// with an admitted `set(int, value)` for this value's type.
    /// Array element types are checked at invocation.
    pub fn discover(
        introspector: &Introspector,
        class: ClassId,
        key: &Value,
        value: &Value,
    ) -> IntrospectionResult<Option<Self>> {
        let Some(index) = cast_integer(key) else {
            return Ok(None);
        };
        let kind = if is_array(introspector, class) {
            ListKind::Array
        } else if is_list(introspector, class) {
            let key = MethodKey::from_args("set", &[Value::Int(index), value.clone()]);
            match introspector.get_method(class, &key)? {
                Some(method) => ListKind::List(method),
                None => return Ok(None),
            }
        } else {
            return Ok(None);
        };
        Ok(Some(Self { class, kind, index }))
    }

    /// The container kind
    pub fn kind(&self) -> &ListKind {
        &self.kind
    }

    /// Store `value` at the bound index, returning `value`
    pub fn invoke(&self, target: &Value, value: &Value) -> IntrospectionResult<Value> {
        self.set(target, self.index, value)
    }

    fn set(&self, target: &Value, index: i32, value: &Value) -> IntrospectionResult<Value> {
        let result = match &self.kind {
            ListKind::Array => array_of(target).and_then(|a| a.set(index, value.clone())),
            ListKind::List(method) => method.invoke(target, &[Value::Int(index), value.clone()]).map(|_| ()),
        };
        result.map_err(|e| IntrospectionError::invocation(self.kind.member(), e))?;
        Ok(value.clone())
    }

    /// Store at `key` if the target class matches and `key` is still an index
    pub fn try_invoke(&self, target: &Value, key: &Value, value: &Value) -> IntrospectionResult<TryOutcome> {
        if target.is_null() || target.class_id() != self.class {
            return Ok(TryOutcome::Failed);
        }
        match cast_integer(key) {
            Some(index) => self.set(target, index, value).map(TryOutcome::Done),
            None => Ok(TryOutcome::Failed),
        }
    }
}

impl Executor for ListSet {
    fn target_class(&self) -> ClassId {
        self.class
    }

    fn target_property(&self) -> Value {
        Value::Int(self.index)
    }

    fn is_alive(&self) -> bool {
        self.kind.is_alive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspection::Permissions;
    use kiln_sdk::{ClassRegistry, ListObject};

    fn introspector() -> Introspector {
        Introspector::new(Arc::new(ClassRegistry::new()), Permissions::unrestricted())
    }

    #[test]
    fn test_array_get_and_set() {
        let is = introspector();
        let array = is
            .registry()
            .new_array(Type::INT, vec![Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();
        let class = array.class_id();
        let target = Value::Array(array);

        let get = ListGet::discover(&is, class, &Value::Long(1)).unwrap().unwrap();
        assert_eq!(get.kind(), &ListKind::Array);
        assert_eq!(get.invoke(&target).unwrap(), Value::Int(2));

        let set = ListSet::discover(&is, class, &Value::Int(0), &Value::Int(9)).unwrap().unwrap();
        set.invoke(&target, &Value::Int(9)).unwrap();
        assert_eq!(get.try_invoke(&target, &Value::Int(0)).unwrap(), TryOutcome::Done(Value::Int(9)));
    }

    #[test]
    fn test_array_bounds_checked_at_invoke() {
        let is = introspector();
        let array = is.registry().new_array(Type::OBJECT, vec![Value::Null; 3]).unwrap();
        let class = array.class_id();
        let target = Value::Array(array);
        let set = ListSet::discover(&is, class, &Value::Int(5), &Value::from("v")).unwrap().unwrap();
        let err = set.invoke(&target, &Value::from("v")).unwrap_err();
        assert_eq!(
            err.host_error(),
            Some(&HostError::IndexOutOfBounds { index: 5, len: 3 })
        );
    }

    #[test]
    fn test_list_methods() {
        let is = introspector();
        let list = ListObject::new_value(vec![Value::from("a"), Value::from("b")]);
        let get = ListGet::discover(&is, ClassId::ARRAY_LIST, &Value::Int(1)).unwrap().unwrap();
        assert!(matches!(get.kind(), ListKind::List(_)));
        assert_eq!(get.invoke(&list).unwrap(), Value::from("b"));

        let set = ListSet::discover(&is, ClassId::ARRAY_LIST, &Value::Int(0), &Value::Int(5))
            .unwrap()
            .unwrap();
        assert_eq!(set.invoke(&list, &Value::Int(5)).unwrap(), Value::Int(5));
        assert_eq!(get.try_invoke(&list, &Value::Int(0)).unwrap(), TryOutcome::Done(Value::Int(5)));
    }

    #[test]
    fn test_non_index_and_non_list() {
        let is = introspector();
        assert!(ListGet::discover(&is, ClassId::ARRAY_LIST, &Value::from("x")).unwrap().is_none());
        assert!(ListGet::discover(&is, ClassId::HASH_MAP, &Value::Int(0)).unwrap().is_none());
        let get = ListGet::discover(&is, ClassId::ARRAY_LIST, &Value::Int(0)).unwrap().unwrap();
        let list = ListObject::new_value(vec![Value::Int(1)]);
        assert!(get.try_invoke(&list, &Value::from("0")).unwrap().is_failed());
        assert!(get.try_invoke(&Value::Null, &Value::Int(0)).unwrap().is_failed());
    }
}
