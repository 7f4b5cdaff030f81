//! Method calls and constructors

use std::sync::Arc;

use kiln_sdk::{ClassId, ConstructorDef, MethodDef, Value};

use super::{Executor, TryOutcome};
use crate::error::{IntrospectionError, IntrospectionResult};
use crate::introspection::{Introspector, MethodKey};

/// A resolved overload, bound to the signature of the call that found it
#[derive(Debug, Clone)]
pub struct MethodExecutor {
    class: ClassId,
    method: Arc<MethodDef>,
    key: MethodKey,
}

impl MethodExecutor {
    /// Resolve `name` for `args` on `class`.
    ///
    /// Fails with [`IntrospectionError::Ambiguous`] when overloads tie.
    pub fn discover(
        introspector: &Introspector,
        class: ClassId,
        name: &str,
        args: &[Value],
    ) -> IntrospectionResult<Option<Self>> {
        let key = MethodKey::from_args(name, args);
        let method = introspector.get_method(class, &key)?;
        Ok(method.map(|method| Self { class, method, key }))
    }

    /// The resolved method
    pub fn method(&self) -> &Arc<MethodDef> {
        &self.method
    }

    /// Call signature this executor was resolved for
    pub fn key(&self) -> &MethodKey {
        &self.key
    }

    /// Call the method
    pub fn invoke(&self, target: &Value, args: &[Value]) -> IntrospectionResult<Value> {
        self.method
            .invoke(target, args)
            .map_err(|e| IntrospectionError::invocation(self.method.name(), e))
    }

    /// Call if `target` has the bound class and `name` with `args` produce
    /// the bound signature
    pub fn try_invoke(&self, target: &Value, name: &str, args: &[Value]) -> IntrospectionResult<TryOutcome> {
        if target.is_null() || target.class_id() != self.class || MethodKey::from_args(name, args) != self.key {
            return Ok(TryOutcome::Failed);
        }
        self.invoke(target, args).map(TryOutcome::Done)
    }
}

impl Executor for MethodExecutor {
    fn target_class(&self) -> ClassId {
        self.class
    }

    fn target_property(&self) -> Value {
        Value::string(self.key.name())
    }

    fn is_alive(&self) -> bool {
        self.method.is_alive()
    }
}

impl PartialEq for MethodExecutor {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && Arc::ptr_eq(&self.method, &other.method) && self.key == other.key
    }
}

/// A resolved constructor overload
#[derive(Debug, Clone)]
pub struct ConstructorExecutor {
    constructor: Arc<ConstructorDef>,
    key: MethodKey,
}

impl ConstructorExecutor {
    /// Resolve the constructor of `class_name` for `args`
    pub fn discover(introspector: &Introspector, class_name: &str, args: &[Value]) -> IntrospectionResult<Option<Self>> {
        let constructor = introspector.get_constructor(class_name, args)?;
        Ok(constructor.map(|constructor| Self {
            constructor,
            key: MethodKey::from_args(class_name, args),
        }))
    }

    /// The resolved constructor
    pub fn constructor(&self) -> &Arc<ConstructorDef> {
        &self.constructor
    }

    /// Create an instance
    pub fn invoke(&self, args: &[Value]) -> IntrospectionResult<Value> {
        self.constructor
            .new_instance(args)
            .map_err(|e| IntrospectionError::invocation(self.key.name(), e))
    }

    /// Create if `class_name` with `args` produce the bound signature
    pub fn try_invoke(&self, class_name: &str, args: &[Value]) -> IntrospectionResult<TryOutcome> {
        if MethodKey::from_args(class_name, args) != self.key {
            return Ok(TryOutcome::Failed);
        }
        self.invoke(args).map(TryOutcome::Done)
    }
}

impl Executor for ConstructorExecutor {
    fn target_class(&self) -> ClassId {
        self.constructor.declaring_class()
    }

    fn target_property(&self) -> Value {
        Value::string(self.key.name())
    }

    fn is_alive(&self) -> bool {
        self.constructor.is_alive()
    }
}

impl PartialEq for ConstructorExecutor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.constructor, &other.constructor) && self.key == other.key
    }
}
