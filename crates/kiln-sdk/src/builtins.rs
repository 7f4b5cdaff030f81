//! Core classes
//!
//! Installs `kiln.lang` (root, boxes, strings, interfaces) and `kiln.util`
//! (list and map containers) at the ids fixed by [`ClassId`]. Registration
//! order below must follow those ids.

use std::hash::{Hash, Hasher};

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};

use crate::class::ClassBuilder;
use crate::error::{HostError, HostResult};
use crate::registry::ClassRegistry;
use crate::types::{ClassId, Type};
use crate::value::{arg, Value};

/// Host state behind `kiln.util.ArrayList`
#[derive(Debug, Default)]
pub struct ListObject {
    items: RwLock<Vec<Value>>,
}

impl ListObject {
    /// Create a list value holding `items`
    pub fn new_value(items: Vec<Value>) -> Value {
        Value::object(
            ClassId::ARRAY_LIST,
            ListObject {
                items: RwLock::new(items),
            },
        )
    }

    fn check(index: i32, len: usize) -> HostResult<usize> {
        if index < 0 || index as usize >= len {
            return Err(HostError::IndexOutOfBounds {
                index: index as i64,
                len,
            });
        }
        Ok(index as usize)
    }

    /// Element at `index`
    pub fn get(&self, index: i32) -> HostResult<Value> {
        let items = self.items.read();
        let i = Self::check(index, items.len())?;
        Ok(items[i].clone())
    }

    /// Replace the element at `index`, returning the previous one
    pub fn set(&self, index: i32, value: Value) -> HostResult<Value> {
        let mut items = self.items.write();
        let i = Self::check(index, items.len())?;
        Ok(std::mem::replace(&mut items[i], value))
    }

    /// Append
    pub fn push(&self, value: Value) {
        self.items.write().push(value);
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Membership by value equality
    pub fn contains(&self, value: &Value) -> bool {
        self.items.read().contains(value)
    }

    /// Snapshot of the elements
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.read().clone()
    }
}

/// Host state behind `kiln.util.HashMap`
#[derive(Debug, Default)]
pub struct MapObject {
    entries: RwLock<FxHashMap<Value, Value>>,
}

impl MapObject {
    /// Create a map value holding `entries`
    pub fn new_value(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
        Value::object(
            ClassId::HASH_MAP,
            MapObject {
                entries: RwLock::new(entries.into_iter().collect()),
            },
        )
    }

    /// Value for `key`, or null
    pub fn get(&self, key: &Value) -> Value {
        self.entries.read().get(key).cloned().unwrap_or_default()
    }

    /// Insert, returning the previous value or null
    pub fn put(&self, key: Value, value: Value) -> Value {
        self.entries.write().insert(key, value).unwrap_or_default()
    }

    /// Remove, returning the previous value or null
    pub fn remove(&self, key: &Value) -> Value {
        self.entries.write().remove(key).unwrap_or_default()
    }

    /// Check for a key
    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn this_str(target: &Value) -> HostResult<&str> {
    match target {
        Value::Null => Err(HostError::NullTarget),
        other => other.as_str().ok_or_else(|| HostError::TypeMismatch {
            expected: "String".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

fn this_number(target: &Value) -> HostResult<f64> {
    match target {
        Value::Null => Err(HostError::NullTarget),
        other => other.as_f64().ok_or_else(|| HostError::TypeMismatch {
            expected: "Number".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

fn hash_of(value: &Value) -> i32 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish() as i32
}

fn char_at(s: &str, index: i32) -> HostResult<char> {
    let len = s.chars().count();
    if index < 0 {
        return Err(HostError::IndexOutOfBounds {
            index: index as i64,
            len,
        });
    }
    s.chars()
        .nth(index as usize)
        .ok_or(HostError::IndexOutOfBounds {
            index: index as i64,
            len,
        })
}

fn substring(s: &str, begin: i32, end: Option<i32>) -> HostResult<Value> {
    let chars: Vec<char> = s.chars().collect();
    let end = end.unwrap_or(chars.len() as i32);
    if begin < 0 || end < begin || end as usize > chars.len() {
        return Err(HostError::IndexOutOfBounds {
            index: if begin < 0 { begin as i64 } else { end as i64 },
            len: chars.len(),
        });
    }
    Ok(Value::from(chars[begin as usize..end as usize].iter().collect::<String>()))
}

fn compare_numbers(a: &Value, b: &Value) -> HostResult<Value> {
    let ordering = match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => this_number(a)?
            .partial_cmp(&this_number(b)?)
            .unwrap_or(std::cmp::Ordering::Equal),
    };
    Ok(Value::Int(ordering as i32))
}

fn compare_values(a: &Value, b: &Value) -> HostResult<Value> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(Value::Int(x.cmp(y) as i32)),
        (Value::Bool(x), Value::Bool(y)) => Ok(Value::Int(x.cmp(y) as i32)),
        (Value::Char(x), Value::Char(y)) => Ok(Value::Int(x.cmp(y) as i32)),
        _ => compare_numbers(a, b),
    }
}

fn list_state(target: &Value) -> HostResult<&ListObject> {
    target.state::<ListObject>()
}

fn map_state(target: &Value) -> HostResult<&MapObject> {
    target.state::<MapObject>()
}

fn index_arg(args: &[Value], i: usize) -> HostResult<i32> {
    let value = args.get(i).ok_or(HostError::MissingArgument(i))?;
    value.as_index().ok_or_else(|| HostError::TypeMismatch {
        expected: "int".to_string(),
        got: value.type_name().to_string(),
    })
}

fn object_class() -> ClassBuilder {
    ClassBuilder::new("kiln.lang.Object")
        .constructor(&[], |_| Ok(Value::object(ClassId::OBJECT, ())))
        .method("toString", &[], Type::STRING, |this, _| {
            Ok(Value::from(this.to_display_string()))
        })
        .method("hashCode", &[], Type::INT, |this, _| Ok(Value::Int(hash_of(this))))
        .method("equals", &[Type::OBJECT], Type::BOOLEAN, |this, args| {
            Ok(Value::Bool(*this == args[0]))
        })
}

fn number_class() -> ClassBuilder {
    ClassBuilder::new("kiln.lang.Number")
        .method("intValue", &[], Type::INT, |this, _| {
            let v = this_number(this)?;
            Ok(Value::Int(this.as_i64().map(|i| i as i32).unwrap_or(v as i32)))
        })
        .method("longValue", &[], Type::LONG, |this, _| {
            let v = this_number(this)?;
            Ok(Value::Long(this.as_i64().unwrap_or(v as i64)))
        })
        .method("doubleValue", &[], Type::DOUBLE, |this, _| {
            Ok(Value::Double(this_number(this)?))
        })
}

fn numeric_box(name: &str, own: Type) -> ClassBuilder {
    ClassBuilder::new(name)
        .extends(ClassId::NUMBER)
        .implements(ClassId::COMPARABLE)
        .method("compareTo", &[own.normalized()], Type::INT, |this, args| {
            compare_numbers(this, &args[0])
        })
}

fn string_class() -> ClassBuilder {
    ClassBuilder::new("kiln.lang.String")
        .implements(ClassId::CHAR_SEQUENCE)
        .implements(ClassId::COMPARABLE)
        .method("length", &[], Type::INT, |this, _| {
            Ok(Value::Int(this_str(this)?.chars().count() as i32))
        })
        .method("charAt", &[Type::INT], Type::CHAR, |this, args| {
            Ok(Value::Char(char_at(this_str(this)?, arg(args, 0)?)?))
        })
        .method("isEmpty", &[], Type::BOOLEAN, |this, _| {
            Ok(Value::Bool(this_str(this)?.is_empty()))
        })
        .method("toUpperCase", &[], Type::STRING, |this, _| {
            Ok(Value::from(this_str(this)?.to_uppercase()))
        })
        .method("substring", &[Type::INT], Type::STRING, |this, args| {
            substring(this_str(this)?, arg(args, 0)?, None)
        })
        .method("substring", &[Type::INT, Type::INT], Type::STRING, |this, args| {
            substring(this_str(this)?, arg(args, 0)?, Some(arg(args, 1)?))
        })
        .method("concat", &[Type::STRING], Type::STRING, |this, args| {
            let other: String = arg(args, 0)?;
            Ok(Value::from(format!("{}{}", this_str(this)?, other)))
        })
        .method("contains", &[Type::class(ClassId::CHAR_SEQUENCE)], Type::BOOLEAN, |this, args| {
            let needle: String = arg(args, 0)?;
            Ok(Value::Bool(this_str(this)?.contains(needle.as_str())))
        })
        .method("startsWith", &[Type::STRING], Type::BOOLEAN, |this, args| {
            let prefix: String = arg(args, 0)?;
            Ok(Value::Bool(this_str(this)?.starts_with(prefix.as_str())))
        })
        .method("compareTo", &[Type::STRING], Type::INT, |this, args| {
            compare_values(this, &args[0])
        })
        .static_method("valueOf", &[Type::OBJECT], Type::STRING, |_, args| {
            Ok(Value::from(args[0].to_display_string()))
        })
}

fn collection_methods(builder: ClassBuilder) -> ClassBuilder {
    builder
        .method("size", &[], Type::INT, |this, _| {
            Ok(Value::Int(list_state(this)?.len() as i32))
        })
        .method("isEmpty", &[], Type::BOOLEAN, |this, _| {
            Ok(Value::Bool(list_state(this)?.is_empty()))
        })
        .method("contains", &[Type::OBJECT], Type::BOOLEAN, |this, args| {
            Ok(Value::Bool(list_state(this)?.contains(&args[0])))
        })
}

fn list_methods(builder: ClassBuilder) -> ClassBuilder {
    collection_methods(builder)
        .method("get", &[Type::INT], Type::OBJECT, |this, args| {
            list_state(this)?.get(index_arg(args, 0)?)
        })
        .method("set", &[Type::INT, Type::OBJECT], Type::OBJECT, |this, args| {
            list_state(this)?.set(index_arg(args, 0)?, args[1].clone())
        })
        .method("add", &[Type::OBJECT], Type::BOOLEAN, |this, args| {
            list_state(this)?.push(args[0].clone());
            Ok(Value::Bool(true))
        })
}

fn map_methods(builder: ClassBuilder) -> ClassBuilder {
    builder
        .method("get", &[Type::OBJECT], Type::OBJECT, |this, args| {
            Ok(map_state(this)?.get(&args[0]))
        })
        .method("put", &[Type::OBJECT, Type::OBJECT], Type::OBJECT, |this, args| {
            Ok(map_state(this)?.put(args[0].clone(), args[1].clone()))
        })
        .method("containsKey", &[Type::OBJECT], Type::BOOLEAN, |this, args| {
            Ok(Value::Bool(map_state(this)?.contains_key(&args[0])))
        })
        .method("remove", &[Type::OBJECT], Type::OBJECT, |this, args| {
            Ok(map_state(this)?.remove(&args[0]))
        })
        .method("size", &[], Type::INT, |this, _| {
            Ok(Value::Int(map_state(this)?.len() as i32))
        })
        .method("isEmpty", &[], Type::BOOLEAN, |this, _| {
            Ok(Value::Bool(map_state(this)?.is_empty()))
        })
}

/// Register the core classes. Order follows the fixed [`ClassId`] constants.
pub(crate) fn install(registry: &ClassRegistry) {
    let classes = [
        object_class(),
        number_class(),
        ClassBuilder::new("kiln.lang.Boolean")
            .implements(ClassId::COMPARABLE)
            .method("booleanValue", &[], Type::BOOLEAN, |this, _| match this {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                _ => Err(HostError::NullTarget),
            })
            .method("compareTo", &[Type::class(ClassId::BOOLEAN)], Type::INT, |this, args| {
                compare_values(this, &args[0])
            }),
        ClassBuilder::new("kiln.lang.Character")
            .implements(ClassId::COMPARABLE)
            .method("charValue", &[], Type::CHAR, |this, _| match this {
                Value::Char(c) => Ok(Value::Char(*c)),
                _ => Err(HostError::NullTarget),
            }),
        numeric_box("kiln.lang.Byte", Type::BYTE),
        numeric_box("kiln.lang.Short", Type::SHORT),
        numeric_box("kiln.lang.Integer", Type::INT)
            .constant("MAX_VALUE", Type::INT, Value::Int(i32::MAX))
            .constant("MIN_VALUE", Type::INT, Value::Int(i32::MIN)),
        numeric_box("kiln.lang.Long", Type::LONG)
            .constant("MAX_VALUE", Type::LONG, Value::Long(i64::MAX)),
        numeric_box("kiln.lang.Float", Type::FLOAT),
        numeric_box("kiln.lang.Double", Type::DOUBLE),
        ClassBuilder::interface("kiln.lang.CharSequence")
            .method("length", &[], Type::INT, |this, _| {
                Ok(Value::Int(this_str(this)?.chars().count() as i32))
            })
            .method("charAt", &[Type::INT], Type::CHAR, |this, args| {
                Ok(Value::Char(char_at(this_str(this)?, arg(args, 0)?)?))
            }),
        ClassBuilder::interface("kiln.lang.Comparable")
            .method("compareTo", &[Type::OBJECT], Type::INT, |this, args| {
                compare_values(this, &args[0])
            }),
        string_class(),
        ClassBuilder::interface("kiln.lang.Iterable"),
        collection_methods(ClassBuilder::interface("kiln.util.Collection").implements(ClassId::ITERABLE)),
        list_methods(ClassBuilder::interface("kiln.util.List").implements(ClassId::COLLECTION)),
        map_methods(ClassBuilder::interface("kiln.util.Map")),
        list_methods(
            ClassBuilder::new("kiln.util.ArrayList")
                .implements(ClassId::LIST)
                .constructor(&[], |_| Ok(ListObject::new_value(Vec::new()))),
        ),
        map_methods(
            ClassBuilder::new("kiln.util.HashMap")
                .implements(ClassId::MAP)
                .constructor(&[], |_| Ok(MapObject::new_value(Vec::<(Value, Value)>::new()))),
        ),
    ];
    for builder in classes {
        registry.insert(builder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(registry: &ClassRegistry, class: ClassId, name: &str, arity: usize) -> std::sync::Arc<crate::MethodDef> {
        registry
            .get(class)
            .unwrap()
            .methods()
            .iter()
            .find(|m| m.name() == name && m.params().len() == arity)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_string_methods() {
        let registry = ClassRegistry::new();
        let s = Value::from("hello");
        let length = method(&registry, ClassId::STRING, "length", 0);
        assert_eq!(length.invoke(&s, &[]).unwrap(), Value::Int(5));

        let sub = method(&registry, ClassId::STRING, "substring", 2);
        assert_eq!(
            sub.invoke(&s, &[Value::Int(1), Value::Int(3)]).unwrap(),
            Value::from("el")
        );

        let char_at = method(&registry, ClassId::STRING, "charAt", 1);
        assert!(matches!(
            char_at.invoke(&s, &[Value::Int(9)]),
            Err(HostError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_list_object() {
        let registry = ClassRegistry::new();
        let list = ListObject::new_value(vec![Value::Int(1), Value::Int(2)]);
        let get = method(&registry, ClassId::ARRAY_LIST, "get", 1);
        let set = method(&registry, ClassId::ARRAY_LIST, "set", 2);

        assert_eq!(get.invoke(&list, &[Value::Int(1)]).unwrap(), Value::Int(2));
        assert_eq!(
            set.invoke(&list, &[Value::Int(0), Value::from("x")]).unwrap(),
            Value::Int(1)
        );
        assert_eq!(list.state::<ListObject>().unwrap().get(0).unwrap(), Value::from("x"));
    }

    #[test]
    fn test_map_object() {
        let registry = ClassRegistry::new();
        let map = MapObject::new_value([(Value::from("k"), Value::Int(7))]);
        let get = method(&registry, ClassId::HASH_MAP, "get", 1);
        let put = method(&registry, ClassId::HASH_MAP, "put", 2);

        assert_eq!(get.invoke(&map, &[Value::from("k")]).unwrap(), Value::Int(7));
        assert_eq!(get.invoke(&map, &[Value::from("z")]).unwrap(), Value::Null);
        put.invoke(&map, &[Value::from("z"), Value::Int(1)]).unwrap();
        assert_eq!(map.state::<MapObject>().unwrap().len(), 2);
    }

    #[test]
    fn test_number_conversions() {
        let registry = ClassRegistry::new();
        let int_value = method(&registry, ClassId::NUMBER, "intValue", 0);
        assert_eq!(int_value.invoke(&Value::Double(3.7), &[]).unwrap(), Value::Int(3));
        assert_eq!(int_value.invoke(&Value::Long(9), &[]).unwrap(), Value::Int(9));

        let cmp = method(&registry, ClassId::INTEGER, "compareTo", 1);
        assert_eq!(cmp.invoke(&Value::Int(1), &[Value::Int(2)]).unwrap(), Value::Int(-1));
    }

    #[test]
    fn test_object_equals() {
        let registry = ClassRegistry::new();
        let equals = method(&registry, ClassId::OBJECT, "equals", 1);
        assert_eq!(
            equals.invoke(&Value::Int(1), &[Value::Int(1)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            equals.invoke(&Value::Int(1), &[Value::Long(1)]).unwrap(),
            Value::Bool(false)
        );
    }
}
