//! Script values
//!
//! [`Value`] is the owned, thread-safe representation of everything a script
//! can hold. Primitives are stored inline; strings, arrays and host objects
//! are reference-counted and shared.
//!
//! Equality and hashing are structural for primitives and strings (floats by
//! bit pattern) and by identity for arrays and host objects, so values can be
//! used as container keys. As with boxed numbers, `Int(1)` and `Long(1)` are
//! different values.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{HostError, HostResult};
use crate::types::{ClassId, Primitive, Type};

/// A script value
#[derive(Clone, Default)]
pub enum Value {
    /// The null reference
    #[default]
    Null,
    /// Boxed `boolean`
    Bool(bool),
    /// Boxed `char`
    Char(char),
    /// Boxed `byte`
    Byte(i8),
    /// Boxed `short`
    Short(i16),
    /// Boxed `int`
    Int(i32),
    /// Boxed `long`
    Long(i64),
    /// Boxed `float`
    Float(f32),
    /// Boxed `double`
    Double(f64),
    /// Immutable string
    Str(Arc<str>),
    /// Fixed-length array
    Array(ArrayRef),
    /// Host object instance
    Object(ObjectRef),
}

impl Value {
    /// Create a string value
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    /// Wrap host state as an object of the given class
    pub fn object<T: Any + Send + Sync>(class: ClassId, state: T) -> Self {
        Value::Object(ObjectRef::new(class, state))
    }

    /// Check if this is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Exact runtime class of this value. `null` reports the root class.
    pub fn class_id(&self) -> ClassId {
        match self {
            Value::Null => ClassId::OBJECT,
            Value::Bool(_) => ClassId::BOOLEAN,
            Value::Char(_) => ClassId::CHARACTER,
            Value::Byte(_) => ClassId::BYTE,
            Value::Short(_) => ClassId::SHORT,
            Value::Int(_) => ClassId::INTEGER,
            Value::Long(_) => ClassId::LONG,
            Value::Float(_) => ClassId::FLOAT,
            Value::Double(_) => ClassId::DOUBLE,
            Value::Str(_) => ClassId::STRING,
            Value::Array(a) => a.class_id(),
            Value::Object(o) => o.class_id(),
        }
    }

    /// Runtime type as used in call-site signatures (`null` has its own type)
    pub fn runtime_type(&self) -> Type {
        match self {
            Value::Null => Type::Null,
            other => Type::Class(other.class_id()),
        }
    }

    /// Short type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Char(_) => "char",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Str(_) => "String",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Primitive kind of a boxed primitive value
    pub fn primitive_kind(&self) -> Option<Primitive> {
        Primitive::from_boxed(self.class_id()).filter(|_| !self.is_null())
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an integral number
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Byte(v) => Some(v as i64),
            Value::Short(v) => Some(v as i64),
            Value::Int(v) => Some(v as i64),
            Value::Long(v) => Some(v),
            _ => None,
        }
    }

    /// Get as f64 if this is any number
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(v as f64),
            Value::Double(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    /// Coerce a number to an `int` index, truncating like a narrowing cast.
    /// Non-numbers (including `char`) yield `None`.
    ///
    /// Truncation is intentional and matches `intValue()`: out-of-range
    /// `long`s wrap (`4294967297L` becomes `1`) and fractions are dropped.
    pub fn as_index(&self) -> Option<i32> {
        match *self {
            Value::Byte(v) => Some(v as i32),
            Value::Short(v) => Some(v as i32),
            Value::Int(v) => Some(v),
            Value::Long(v) => Some(v as i32),
            Value::Float(v) => Some(v as i32),
            Value::Double(v) => Some(v as i32),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as array
    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get as host object
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Borrow the host state of an object value.
    ///
    /// Fails with [`HostError::NullTarget`] on null and
    /// [`HostError::TypeMismatch`] when the state is not a `T`.
    pub fn state<T: Any>(&self) -> HostResult<&T> {
        match self {
            Value::Null => Err(HostError::NullTarget),
            Value::Object(o) => o.downcast_ref::<T>().ok_or_else(|| HostError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                got: format!("object of class {}", o.class_id()),
            }),
            other => Err(HostError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }

    /// Render for `toString()`-style display
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Char(c) => c.to_string(),
            Value::Byte(v) => v.to_string(),
            Value::Short(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Str(s) => s.to_string(),
            Value::Array(a) => {
                let items: Vec<String> = a.to_vec().iter().map(Value::to_display_string).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Object(o) => format!("object{}", o.class_id()),
        }
    }

    fn discriminant(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Char(_) => 2,
            Value::Byte(_) => 3,
            Value::Short(_) => 4,
            Value::Int(_) => 5,
            Value::Long(_) => 6,
            Value::Float(_) => 7,
            Value::Double(_) => 8,
            Value::Str(_) => 9,
            Value::Array(_) => 10,
            Value::Object(_) => 11,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.discriminant());
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Char(c) => c.hash(state),
            Value::Byte(v) => v.hash(state),
            Value::Short(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Long(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::Array(a) => (Arc::as_ptr(&a.0) as *const () as usize).hash(state),
            Value::Object(o) => (Arc::as_ptr(&o.0) as *const () as usize).hash(state),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Char(c) => write!(f, "Char({:?})", c),
            Value::Byte(v) => write!(f, "Byte({})", v),
            Value::Short(v) => write!(f, "Short({})", v),
            Value::Int(v) => write!(f, "Int({})", v),
            Value::Long(v) => write!(f, "Long({})", v),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Double(v) => write!(f, "Double({})", v),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Array(a) => fmt::Debug::fmt(a, f),
            Value::Object(o) => fmt::Debug::fmt(o, f),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<ArrayRef> for Value {
    fn from(a: ArrayRef) -> Self {
        Value::Array(a)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// ============================================================================
// Arrays
// ============================================================================

struct ArrayData {
    class: ClassId,
    component: Type,
    elements: RwLock<Vec<Value>>,
}

/// Shared fixed-length array.
///
/// Created through [`ClassRegistry::new_array`](crate::ClassRegistry::new_array),
/// which interns the array class for the component type.
#[derive(Clone)]
pub struct ArrayRef(Arc<ArrayData>);

impl ArrayRef {
    pub(crate) fn new(class: ClassId, component: Type, elements: Vec<Value>) -> Self {
        Self(Arc::new(ArrayData {
            class,
            component,
            elements: RwLock::new(elements),
        }))
    }

    /// The interned array class
    pub fn class_id(&self) -> ClassId {
        self.0.class
    }

    /// Declared component type
    pub fn component(&self) -> Type {
        self.0.component
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.elements.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_index(index: i32, len: usize) -> HostResult<usize> {
        if index < 0 || index as usize >= len {
            return Err(HostError::IndexOutOfBounds {
                index: index as i64,
                len,
            });
        }
        Ok(index as usize)
    }

    /// Read the element at `index`
    pub fn get(&self, index: i32) -> HostResult<Value> {
        let elements = self.0.elements.read();
        let i = Self::check_index(index, elements.len())?;
        Ok(elements[i].clone())
    }

    /// Write the element at `index`.
    ///
    /// Primitive component types only accept values of their exact boxed class.
    pub fn set(&self, index: i32, value: Value) -> HostResult<()> {
        if let Type::Primitive(p) = self.0.component {
            if value.primitive_kind() != Some(p) {
                return Err(HostError::TypeMismatch {
                    expected: p.name().to_string(),
                    got: value.type_name().to_string(),
                });
            }
        }
        let mut elements = self.0.elements.write();
        let i = Self::check_index(index, elements.len())?;
        elements[i] = value;
        Ok(())
    }

    /// Snapshot of the elements
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.elements.read().clone()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("class", &self.0.class)
            .field("len", &self.len())
            .finish()
    }
}

// ============================================================================
// Host objects
// ============================================================================

struct ObjectData {
    class: ClassId,
    state: Box<dyn Any + Send + Sync>,
}

/// Shared host object: a class id plus type-erased host state.
///
/// Host invokers recover the state with [`ObjectRef::downcast_ref`] or
/// [`Value::state`]. Mutable state uses interior mutability.
#[derive(Clone)]
pub struct ObjectRef(Arc<ObjectData>);

impl ObjectRef {
    /// Wrap host state as an instance of `class`
    pub fn new<T: Any + Send + Sync>(class: ClassId, state: T) -> Self {
        Self(Arc::new(ObjectData {
            class,
            state: Box::new(state),
        }))
    }

    /// Runtime class
    pub fn class_id(&self) -> ClassId {
        self.0.class
    }

    /// Borrow the host state as `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.state.downcast_ref::<T>()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.0.class)
    }
}

// ============================================================================
// Argument conversion
// ============================================================================

/// Convert from a script value to a Rust type.
///
/// Implement this trait to receive your type as an invoker argument.
pub trait FromValue: Sized {
    /// Convert, returning an error if the value has the wrong type
    fn from_value(value: &Value) -> HostResult<Self>;
}

fn mismatch(expected: &str, got: &Value) -> HostError {
    HostError::TypeMismatch {
        expected: expected.to_string(),
        got: got.type_name().to_string(),
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> HostResult<Self> {
        Ok(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> HostResult<Self> {
        value.as_bool().ok_or_else(|| mismatch("boolean", value))
    }
}

impl FromValue for char {
    fn from_value(value: &Value) -> HostResult<Self> {
        match value {
            Value::Char(c) => Ok(*c),
            other => Err(mismatch("char", other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> HostResult<Self> {
        match *value {
            Value::Byte(v) => Ok(v as i32),
            Value::Short(v) => Ok(v as i32),
            Value::Int(v) => Ok(v),
            Value::Char(c) => Ok(c as i32),
            ref other => Err(mismatch("int", other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> HostResult<Self> {
        match *value {
            Value::Char(c) => Ok(c as i64),
            ref other => other.as_i64().ok_or_else(|| mismatch("long", other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> HostResult<Self> {
        value.as_f64().ok_or_else(|| mismatch("double", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> HostResult<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("String", value))
    }
}

/// Fetch and convert the argument at `index`
pub fn arg<T: FromValue>(args: &[Value], index: usize) -> HostResult<T> {
    let value = args.get(index).ok_or(HostError::MissingArgument(index))?;
    T::from_value(value)
}
