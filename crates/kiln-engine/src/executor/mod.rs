//! Executors: resolved, cacheable accessors
//!
//! An executor binds one way of reading, writing or calling a member to the
//! class it was discovered on and the property it was discovered for. The
//! interpreter keeps it at a call site and replays it through `try_invoke`,
//! which re-validates the binding without touching the introspector and
//! reports [`TryOutcome::Failed`] when the shape has changed.
//!
//! | Family   | Get          | Set          |
//! |----------|--------------|--------------|
//! | field    | [`FieldGet`] | [`FieldSet`] |
//! | map      | [`MapGet`]   | [`MapSet`]   |
//! | list     | [`ListGet`]  | [`ListSet`]  |
//! | property | [`PropertyGetter`], [`BooleanGet`] | [`PropertySetter`] |
//! | duck     | [`DuckGet`]  | [`DuckSet`]  |
//!
//! plus [`MethodExecutor`] and [`ConstructorExecutor`] for calls.

mod duck;
mod field;
mod list;
mod map;
mod method;
mod property;

pub use duck::{DuckGet, DuckSet};
pub use field::{FieldGet, FieldSet};
pub use list::{ListGet, ListKind, ListSet};
pub use map::{MapGet, MapSet};
pub use method::{ConstructorExecutor, MethodExecutor};
pub use property::{BooleanGet, PropertyGetter, PropertySetter};

use kiln_sdk::{ClassId, Value};

use crate::error::IntrospectionResult;

// ============================================================================
// Shared capability set
// ============================================================================

/// Result of the self-validating fast path
#[derive(Debug, Clone, PartialEq)]
pub enum TryOutcome {
    /// The binding still applied; this is the result of the access
    Done(Value),
    /// Stale binding: fall back to full discovery
    Failed,
}

impl TryOutcome {
    /// Whether the fast path was rejected
    pub fn is_failed(&self) -> bool {
        matches!(self, TryOutcome::Failed)
    }

    /// The access result, if the fast path applied
    pub fn into_value(self) -> Option<Value> {
        match self {
            TryOutcome::Done(v) => Some(v),
            TryOutcome::Failed => None,
        }
    }
}

/// Capabilities common to every executor
pub trait Executor {
    /// Exact class this executor was discovered for
    fn target_class(&self) -> ClassId;

    /// Key, index or name this executor is bound to
    fn target_property(&self) -> Value;

    /// False once the underlying member has been retired
    fn is_alive(&self) -> bool;

    /// Whether a call site may keep this executor
    fn is_cacheable(&self) -> bool {
        self.is_alive()
    }
}

/// Coerce a property identifier to a name: strings as-is, integers printed
pub(crate) fn cast_string(key: &Value) -> Option<String> {
    match key {
        Value::Str(s) => Some(s.to_string()),
        Value::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

/// Coerce a property identifier to an index; only numbers qualify.
/// Wide and fractional numbers truncate, see [`Value::as_index`].
pub(crate) fn cast_integer(key: &Value) -> Option<i32> {
    key.as_index()
}

/// Same runtime class, with `null` only matching `null`
pub(crate) fn same_key_type(bound: &Value, key: &Value) -> bool {
    bound.runtime_type() == key.runtime_type()
}

// ============================================================================
// Get / set dispatch
// ============================================================================

/// A discovered property read
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyGet {
    /// Public field
    Field(FieldGet),
    /// `Map.get(key)`
    Map(MapGet),
    /// Array element or `List.get(index)`
    List(ListGet),
    /// `getFoo()`
    Property(PropertyGetter),
    /// `isFoo()`
    Boolean(BooleanGet),
    /// Generic `get(key)`
    Duck(DuckGet),
}

macro_rules! dispatch {
    ($enum:ident, $self:ident, $inner:ident => $body:expr, [$($variant:ident),*]) => {
        match $self {
            $($enum::$variant($inner) => $body,)*
        }
    };
}

impl PropertyGet {
    /// Read the property from `target`
    pub fn invoke(&self, target: &Value) -> IntrospectionResult<Value> {
        dispatch!(PropertyGet, self, e => e.invoke(target), [Field, Map, List, Property, Boolean, Duck])
    }

    /// Read the property if `target` and `key` still match the binding
    pub fn try_invoke(&self, target: &Value, key: &Value) -> IntrospectionResult<TryOutcome> {
        dispatch!(PropertyGet, self, e => e.try_invoke(target, key), [Field, Map, List, Property, Boolean, Duck])
    }

    /// Whether the read may be folded to a constant
    pub fn is_constant(&self) -> bool {
        matches!(self, PropertyGet::Field(f) if f.is_constant())
    }
}

impl Executor for PropertyGet {
    fn target_class(&self) -> ClassId {
        dispatch!(PropertyGet, self, e => e.target_class(), [Field, Map, List, Property, Boolean, Duck])
    }

    fn target_property(&self) -> Value {
        dispatch!(PropertyGet, self, e => e.target_property(), [Field, Map, List, Property, Boolean, Duck])
    }

    fn is_alive(&self) -> bool {
        dispatch!(PropertyGet, self, e => e.is_alive(), [Field, Map, List, Property, Boolean, Duck])
    }
}

/// A discovered property write
#[derive(Debug, Clone, PartialEq)]
pub enum PropertySet {
    /// Public non-final field
    Field(FieldSet),
    /// `Map.put(key, value)`
    Map(MapSet),
    /// Array element or `List.set(index, value)`
    List(ListSet),
    /// `setFoo(value)`
    Property(PropertySetter),
    /// Generic `set(key, value)` or `put(key, value)`
    Duck(DuckSet),
}

impl PropertySet {
    /// Write `value` and return it
    pub fn invoke(&self, target: &Value, value: &Value) -> IntrospectionResult<Value> {
        dispatch!(PropertySet, self, e => e.invoke(target, value), [Field, Map, List, Property, Duck])
    }

    /// Write if `target`, `key` and `value` still match the binding
    pub fn try_invoke(&self, target: &Value, key: &Value, value: &Value) -> IntrospectionResult<TryOutcome> {
        dispatch!(PropertySet, self, e => e.try_invoke(target, key, value), [Field, Map, List, Property, Duck])
    }
}

impl Executor for PropertySet {
    fn target_class(&self) -> ClassId {
        dispatch!(PropertySet, self, e => e.target_class(), [Field, Map, List, Property, Duck])
    }

    fn target_property(&self) -> Value {
        dispatch!(PropertySet, self, e => e.target_property(), [Field, Map, List, Property, Duck])
    }

    fn is_alive(&self) -> bool {
        dispatch!(PropertySet, self, e => e.is_alive(), [Field, Map, List, Property, Duck])
    }
}
