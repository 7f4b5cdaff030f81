//! Public field access

use std::sync::Arc;

use kiln_sdk::{ClassId, FieldDef, HostError, Type, Value};

use super::{cast_string, Executor, TryOutcome};
use crate::error::{IntrospectionError, IntrospectionResult};
use crate::introspection::{param_distance, Introspector};

/// Reads a public field
#[derive(Debug, Clone)]
pub struct FieldGet {
    class: ClassId,
    field: Arc<FieldDef>,
}

impl FieldGet {
    /// Find an admitted public field named by `key` on `class`
    pub fn discover(introspector: &Introspector, class: ClassId, key: &Value) -> Option<Self> {
        let name = cast_string(key)?;
        let field = introspector.get_field(class, &name)?;
        Some(Self { class, field })
    }

    /// The bound field
    pub fn field(&self) -> &Arc<FieldDef> {
        &self.field
    }

    /// Enum constant or static final: the read may be folded
    pub fn is_constant(&self) -> bool {
        self.field.is_constant()
    }

    /// Read the field's current value
    pub fn invoke(&self, target: &Value) -> IntrospectionResult<Value> {
        self.field
            .get(target)
            .map_err(|e| IntrospectionError::invocation(self.field.name(), e))
    }

    /// Read if `target` is of the bound class and `key` names the bound field.
    /// An access refusal degrades to [`TryOutcome::Failed`].
    pub fn try_invoke(&self, target: &Value, key: &Value) -> IntrospectionResult<TryOutcome> {
        if target.class_id() != self.class || cast_string(key).as_deref() != Some(self.field.name()) {
            return Ok(TryOutcome::Failed);
        }
        match self.field.get(target) {
            Ok(value) => Ok(TryOutcome::Done(value)),
            Err(HostError::IllegalAccess(_)) => Ok(TryOutcome::Failed),
            Err(e) => Err(IntrospectionError::invocation(self.field.name(), e)),
        }
    }
}

impl Executor for FieldGet {
    fn target_class(&self) -> ClassId {
        self.class
    }

    fn target_property(&self) -> Value {
        Value::string(self.field.name())
    }

    fn is_alive(&self) -> bool {
        self.field.is_alive()
    }
}

impl PartialEq for FieldGet {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && Arc::ptr_eq(&self.field, &other.field)
    }
}

/// Writes a public non-final field
#[derive(Debug, Clone)]
pub struct FieldSet {
    class: ClassId,
    field: Arc<FieldDef>,
}

impl FieldSet {
    /// Find an admitted, writable field named by `key` whose type accepts `value`
    pub fn discover(introspector: &Introspector, class: ClassId, key: &Value, value: &Value) -> Option<Self> {
        let name = cast_string(key)?;
        let field = introspector.get_field(class, &name)?;
        if field.is_final() {
            return None;
        }
        param_distance(introspector.registry(), field.field_type(), value.runtime_type())?;
        Some(Self { class, field })
    }

    /// The bound field
    pub fn field(&self) -> &Arc<FieldDef> {
        &self.field
    }

    /// Write `value`, returning it
    pub fn invoke(&self, target: &Value, value: &Value) -> IntrospectionResult<Value> {
        self.field
            .set(target, value.clone())
            .map_err(|e| IntrospectionError::invocation(self.field.name(), e))?;
        Ok(value.clone())
    }

    /// Write if the class and name still match and `value` plainly fits.
    /// Reference values of another class than the field's fall back to
    /// discovery, which knows the hierarchy.
    pub fn try_invoke(&self, target: &Value, key: &Value, value: &Value) -> IntrospectionResult<TryOutcome> {
        if target.class_id() != self.class || cast_string(key).as_deref() != Some(self.field.name()) {
            return Ok(TryOutcome::Failed);
        }
        if !self.fits(value) {
            return Ok(TryOutcome::Failed);
        }
        match self.field.set(target, value.clone()) {
            Ok(()) => Ok(TryOutcome::Done(value.clone())),
            Err(HostError::IllegalAccess(_)) => Ok(TryOutcome::Failed),
            Err(e) => Err(IntrospectionError::invocation(self.field.name(), e)),
        }
    }

    fn fits(&self, value: &Value) -> bool {
        let declared = self.field.field_type();
        match (declared, value.primitive_kind()) {
            (_, _) if value.is_null() => !declared.is_primitive(),
            (Type::Primitive(p), Some(actual)) => actual.widening_distance(p).is_some(),
            (Type::Primitive(_), None) => false,
            _ => declared.normalized() == value.runtime_type() || declared == Type::OBJECT,
        }
    }
}

impl Executor for FieldSet {
    fn target_class(&self) -> ClassId {
        self.class
    }

    fn target_property(&self) -> Value {
        Value::string(self.field.name())
    }

    fn is_alive(&self) -> bool {
        self.field.is_alive()
    }
}

impl PartialEq for FieldSet {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && Arc::ptr_eq(&self.field, &other.field)
    }
}
