//! Bean-style accessors: `getFoo()`, `isFoo()`, `setFoo(value)`

use std::sync::Arc;

use kiln_sdk::{ClassId, MethodDef, Type, Value};

use super::{cast_string, Executor, TryOutcome};
use crate::error::{IntrospectionError, IntrospectionResult};
use crate::introspection::{Introspector, MethodKey};

/// Resolve `prefix` + property with the first letter upper-cased, then as
/// written with the first letter lower-cased (`getFoo`, then `getfoo`).
fn discover_accessor(
    introspector: &Introspector,
    class: ClassId,
    prefix: &str,
    property: &str,
    args: &[Value],
) -> IntrospectionResult<Option<Arc<MethodDef>>> {
    let mut chars = property.chars();
    let Some(first) = chars.next() else {
        return Ok(None);
    };
    let rest = chars.as_str();

    let upper: String = first.to_uppercase().collect();
    let name = format!("{}{}{}", prefix, upper, rest);
    if let Some(method) = introspector.get_method(class, &MethodKey::from_args(&name, args))? {
        return Ok(Some(method));
    }
    let lower: String = first.to_lowercase().collect();
    let name = format!("{}{}{}", prefix, lower, rest);
    introspector.get_method(class, &MethodKey::from_args(&name, args))
}

fn invoke_method(method: &MethodDef, target: &Value, args: &[Value]) -> IntrospectionResult<Value> {
    method
        .invoke(target, args)
        .map_err(|e| IntrospectionError::invocation(method.name(), e))
}

/// `getFoo()` read
#[derive(Debug, Clone)]
pub struct PropertyGetter {
    class: ClassId,
    method: Arc<MethodDef>,
    property: String,
}

impl PropertyGetter {
    /// Discover an admitted no-argument `get` accessor for `key`
    pub fn discover(introspector: &Introspector, class: ClassId, key: &Value) -> IntrospectionResult<Option<Self>> {
        let Some(property) = cast_string(key) else {
            return Ok(None);
        };
        let method = discover_accessor(introspector, class, "get", &property, &[])?;
        Ok(method.map(|method| Self { class, method, property }))
    }

    /// Call the getter
    pub fn invoke(&self, target: &Value) -> IntrospectionResult<Value> {
        invoke_method(&self.method, target, &[])
    }

    /// Call if the class and the property name still match
    pub fn try_invoke(&self, target: &Value, key: &Value) -> IntrospectionResult<TryOutcome> {
        if target.is_null() || target.class_id() != self.class || cast_string(key).as_deref() != Some(self.property.as_str()) {
            return Ok(TryOutcome::Failed);
        }
        self.invoke(target).map(TryOutcome::Done)
    }
}

impl Executor for PropertyGetter {
    fn target_class(&self) -> ClassId {
        self.class
    }

    fn target_property(&self) -> Value {
        Value::string(&self.property)
    }

    fn is_alive(&self) -> bool {
        self.method.is_alive()
    }
}

impl PartialEq for PropertyGetter {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && Arc::ptr_eq(&self.method, &other.method) && self.property == other.property
    }
}

/// `isFoo()` read of a boolean property
#[derive(Debug, Clone)]
pub struct BooleanGet {
    class: ClassId,
    method: Arc<MethodDef>,
    property: String,
}

impl BooleanGet {
    /// Discover an admitted no-argument `is` accessor returning a boolean
    pub fn discover(introspector: &Introspector, class: ClassId, key: &Value) -> IntrospectionResult<Option<Self>> {
        let Some(property) = cast_string(key) else {
            return Ok(None);
        };
        let method = discover_accessor(introspector, class, "is", &property, &[])?;
        Ok(method
            .filter(|m| m.return_type().is_boolean())
            .map(|method| Self { class, method, property }))
    }

    /// Call the accessor
    pub fn invoke(&self, target: &Value) -> IntrospectionResult<Value> {
        invoke_method(&self.method, target, &[])
    }

    /// Call if the class and the property name still match
    pub fn try_invoke(&self, target: &Value, key: &Value) -> IntrospectionResult<TryOutcome> {
        if target.is_null() || target.class_id() != self.class || cast_string(key).as_deref() != Some(self.property.as_str()) {
            return Ok(TryOutcome::Failed);
        }
        self.invoke(target).map(TryOutcome::Done)
    }
}

impl Executor for BooleanGet {
    fn target_class(&self) -> ClassId {
        self.class
    }

    fn target_property(&self) -> Value {
        Value::string(&self.property)
    }

    fn is_alive(&self) -> bool {
        self.method.is_alive()
    }
}

impl PartialEq for BooleanGet {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && Arc::ptr_eq(&self.method, &other.method) && self.property == other.property
    }
}

/// `setFoo(value)` write
#[derive(Debug, Clone)]
pub struct PropertySetter {
    class: ClassId,
    method: Arc<MethodDef>,
    property: String,
    /// Runtime type of the value discovery selected the overload for
    value_type: Type,
}

impl PropertySetter {
    /// Discover an admitted one-argument `set` accessor taking `value`
    pub fn discover(
        introspector: &Introspector,
        class: ClassId,
        key: &Value,
        value: &Value,
    ) -> IntrospectionResult<Option<Self>> {
        let Some(property) = cast_string(key) else {
            return Ok(None);
        };
        let method = discover_accessor(introspector, class, "set", &property, std::slice::from_ref(value))?;
        Ok(method.map(|method| Self {
            class,
            method,
            property,
            value_type: value.runtime_type(),
        }))
    }

    /// Call the setter, returning `value`
    pub fn invoke(&self, target: &Value, value: &Value) -> IntrospectionResult<Value> {
        invoke_method(&self.method, target, std::slice::from_ref(value))?;
        Ok(value.clone())
    }

    /// Call if the class and name still match and `value` has the type this
    /// setter was discovered with, or the parameter's exact type (`null` for
    /// a reference parameter)
    pub fn try_invoke(&self, target: &Value, key: &Value, value: &Value) -> IntrospectionResult<TryOutcome> {
        if target.is_null() || target.class_id() != self.class || cast_string(key).as_deref() != Some(self.property.as_str()) {
            return Ok(TryOutcome::Failed);
        }
        let Some(&param) = self.method.params().first() else {
            return Ok(TryOutcome::Failed);
        };
        let fits = if value.is_null() {
            !param.is_primitive()
        } else {
            let actual = value.runtime_type();
            actual == self.value_type || param.normalized() == actual
        };
        if !fits {
            return Ok(TryOutcome::Failed);
        }
        self.invoke(target, value).map(TryOutcome::Done)
    }
}

impl Executor for PropertySetter {
    fn target_class(&self) -> ClassId {
        self.class
    }

    fn target_property(&self) -> Value {
        Value::string(&self.property)
    }

    fn is_alive(&self) -> bool {
        self.method.is_alive()
    }
}

impl PartialEq for PropertySetter {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && Arc::ptr_eq(&self.method, &other.method) && self.property == other.property
    }
}
