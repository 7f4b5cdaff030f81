//! Method signature keys and overload resolution
//!
//! A [`MethodKey`] identifies a member by name and normalized parameter
//! types. Normalization collapses every primitive onto its boxed class, so
//! `foo(int)` and `foo(Integer)` produce the same key.

use std::fmt;
use std::sync::Arc;

use kiln_sdk::{ClassRegistry, ConstructorDef, MethodDef, Type, Value};

/// Weight added to reference conversions so any primitive widening
/// (at most five steps) ranks ahead of them
const REFERENCE_BASE: u32 = 8;

/// Cost of passing `null` to any reference parameter
const NULL_COST: u32 = REFERENCE_BASE;

/// Name plus normalized parameter types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    name: Arc<str>,
    params: Box<[Type]>,
}

impl MethodKey {
    /// Create from a name and parameter types; primitives are normalized
    pub fn new(name: &str, params: &[Type]) -> Self {
        Self {
            name: Arc::from(name),
            params: params.iter().map(|t| t.normalized()).collect(),
        }
    }

    /// Key of a declared method
    pub fn from_method(method: &MethodDef) -> Self {
        Self::new(method.name(), method.params())
    }

    /// Key for a call site, from the runtime types of its arguments.
    /// A `null` argument keeps the distinguished null type.
    pub fn from_args(name: &str, args: &[Value]) -> Self {
        Self {
            name: Arc::from(name),
            params: args.iter().map(Value::runtime_type).collect(),
        }
    }

    /// Member name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized parameter types
    pub fn params(&self) -> &[Type] {
        &self.params
    }

    /// Render with qualified type names, e.g. `put(kiln.lang.String, null)`
    pub fn describe(&self, registry: &ClassRegistry) -> String {
        describe(registry, &self.name, &self.params)
    }

    /// Pick the most specific applicable candidate.
    ///
    /// Returns `Ok(None)` when nothing is applicable and
    /// [`Ambiguity`] when several candidates tie for the lowest distance.
    pub fn most_specific<T: Parameterized>(
        &self,
        registry: &ClassRegistry,
        candidates: &[T],
    ) -> Result<Option<T>, Ambiguity> {
        let mut best: Option<u32> = None;
        let mut tied: Vec<&T> = Vec::new();

        for candidate in candidates {
            let formals = candidate.parameters();
            if formals.len() != self.params.len() {
                continue;
            }
            let Some(score) = signature_distance(registry, formals, &self.params) else {
                continue;
            };
            match best {
                Some(b) if score > b => {}
                Some(b) if score == b => tied.push(candidate),
                _ => {
                    best = Some(score);
                    tied.clear();
                    tied.push(candidate);
                }
            }
        }

        match tied.len() {
            0 => Ok(None),
            1 => Ok(Some(tied[0].clone())),
            _ => Err(Ambiguity {
                candidates: tied
                    .iter()
                    .map(|c| describe(registry, c.member_name(), c.parameters()))
                    .collect(),
            }),
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match p {
                Type::Primitive(p) => write!(f, "{}", p)?,
                Type::Class(id) => write!(f, "{}", id)?,
                Type::Null => write!(f, "null")?,
            }
        }
        write!(f, ")")
    }
}

/// Several overloads tie for most specific
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    /// Signatures of the tied candidates
    pub candidates: Vec<String>,
}

/// Something with a formal parameter list that overload resolution can rank
pub trait Parameterized: Clone {
    /// Formal parameter types
    fn parameters(&self) -> &[Type];
    /// Name used in diagnostics
    fn member_name(&self) -> &str;
}

impl Parameterized for Arc<MethodDef> {
    fn parameters(&self) -> &[Type] {
        self.params()
    }

    fn member_name(&self) -> &str {
        self.name()
    }
}

impl Parameterized for Arc<ConstructorDef> {
    fn parameters(&self) -> &[Type] {
        self.params()
    }

    fn member_name(&self) -> &str {
        "<init>"
    }
}

fn describe(registry: &ClassRegistry, name: &str, params: &[Type]) -> String {
    let params: Vec<String> = params.iter().map(|t| registry.type_name(*t)).collect();
    format!("{}({})", name, params.join(", "))
}

fn signature_distance(registry: &ClassRegistry, formals: &[Type], actuals: &[Type]) -> Option<u32> {
    formals
        .iter()
        .zip(actuals)
        .try_fold(0u32, |acc, (formal, actual)| {
            param_distance(registry, *formal, *actual).map(|d| acc + d)
        })
}

/// Conversion cost from an argument of type `actual` to a parameter of type
/// `formal`; `None` when not applicable.
///
/// - identical after normalization: 0
/// - primitive widening (primitive or boxed formal): number of widening steps
/// - reference assignment: `REFERENCE_BASE` plus the supertype distance
/// - `null` to any reference: `NULL_COST`; `null` to a primitive: not applicable
pub fn param_distance(registry: &ClassRegistry, formal: Type, actual: Type) -> Option<u32> {
    if actual == Type::Null {
        return if formal.is_primitive() { None } else { Some(NULL_COST) };
    }
    if formal.normalized() == actual.normalized() {
        return Some(0);
    }
    if let (Some(fp), Some(ap)) = (formal.primitive_kind(), actual.primitive_kind()) {
        return ap.widening_distance(fp);
    }
    if formal.is_primitive() {
        return None;
    }
    let (Some(from), Some(to)) = (actual.as_class(), formal.as_class()) else {
        return None;
    };
    registry
        .supertype_distance(from, to)
        .map(|d| REFERENCE_BASE + d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_sdk::{ClassBuilder, ClassId};

    fn overloads(registry: &ClassRegistry, sigs: &[&[Type]]) -> Vec<Arc<MethodDef>> {
        let mut builder = ClassBuilder::new(&format!("t.Overloads{}", registry.len()));
        for params in sigs {
            builder = builder.method("foo", params, Type::VOID, |_, _| Ok(Value::Null));
        }
        let id = registry.register(builder).unwrap();
        registry.get(id).unwrap().methods().to_vec()
    }

    #[test]
    fn test_normalization_collapses_boxing() {
        let a = MethodKey::new("foo", &[Type::INT]);
        let b = MethodKey::new("foo", &[Type::class(ClassId::INTEGER)]);
        assert_eq!(a, b);
        assert_ne!(a, MethodKey::new("foo", &[Type::LONG]));
        assert_ne!(a, MethodKey::new("bar", &[Type::INT]));
        assert_eq!(MethodKey::from_args("foo", &[Value::Int(1)]), a);
    }

    #[test]
    fn test_exact_match_wins() {
        let registry = ClassRegistry::new();
        let methods = overloads(&registry, &[&[Type::LONG], &[Type::INT], &[Type::OBJECT]]);
        let key = MethodKey::from_args("foo", &[Value::Int(3)]);
        let found = key.most_specific(&registry, &methods).unwrap().unwrap();
        assert_eq!(found.params(), &[Type::INT]);
    }

    #[test]
    fn test_widening_beats_reference() {
        let registry = ClassRegistry::new();
        let methods = overloads(&registry, &[&[Type::OBJECT], &[Type::DOUBLE], &[Type::LONG]]);
        let key = MethodKey::from_args("foo", &[Value::Int(3)]);
        let found = key.most_specific(&registry, &methods).unwrap().unwrap();
        assert_eq!(found.params(), &[Type::LONG]);
    }

    #[test]
    fn test_closer_supertype_wins() {
        let registry = ClassRegistry::new();
        let methods = overloads(
            &registry,
            &[&[Type::OBJECT], &[Type::class(ClassId::NUMBER)]],
        );
        let key = MethodKey::from_args("foo", &[Value::Double(1.0)]);
        let found = key.most_specific(&registry, &methods).unwrap().unwrap();
        assert_eq!(found.params(), &[Type::class(ClassId::NUMBER)]);
    }

    #[test]
    fn test_tie_is_ambiguous() {
        let registry = ClassRegistry::new();
        let methods = overloads(
            &registry,
            &[
                &[Type::class(ClassId::NUMBER), Type::OBJECT],
                &[Type::OBJECT, Type::class(ClassId::NUMBER)],
            ],
        );
        let key = MethodKey::from_args("foo", &[Value::Int(1), Value::Int(2)]);
        let err = key.most_specific(&registry, &methods).unwrap_err();
        assert_eq!(err.candidates.len(), 2);
        assert!(err.candidates[0].starts_with("foo(kiln.lang.Number"));
    }

    #[test]
    fn test_null_matches_any_reference() {
        let registry = ClassRegistry::new();
        let methods = overloads(&registry, &[&[Type::INT], &[Type::STRING]]);
        let key = MethodKey::from_args("foo", &[Value::Null]);
        let found = key.most_specific(&registry, &methods).unwrap().unwrap();
        assert_eq!(found.params(), &[Type::STRING]);

        let methods = overloads(&registry, &[&[Type::OBJECT], &[Type::STRING]]);
        assert!(key.most_specific(&registry, &methods).is_err());
    }

    #[test]
    fn test_inapplicable_is_none() {
        let registry = ClassRegistry::new();
        let methods = overloads(&registry, &[&[Type::INT], &[Type::INT, Type::INT]]);
        let by_type = MethodKey::from_args("foo", &[Value::from("s")]);
        assert!(matches!(by_type.most_specific(&registry, &methods), Ok(None)));
        let by_arity = MethodKey::from_args("foo", &[]);
        assert!(matches!(by_arity.most_specific(&registry, &methods), Ok(None)));
        let narrowing = MethodKey::from_args("foo", &[Value::Long(1)]);
        assert!(matches!(narrowing.most_specific(&registry, &methods), Ok(None)));
    }

    #[test]
    fn test_param_distance_table() {
        let registry = ClassRegistry::new();
        assert_eq!(param_distance(&registry, Type::INT, Type::class(ClassId::INTEGER)), Some(0));
        assert_eq!(param_distance(&registry, Type::LONG, Type::class(ClassId::INTEGER)), Some(1));
        assert_eq!(param_distance(&registry, Type::INT, Type::class(ClassId::BOOLEAN)), None);
        assert_eq!(param_distance(&registry, Type::INT, Type::STRING), None);
        assert_eq!(param_distance(&registry, Type::OBJECT, Type::STRING), Some(REFERENCE_BASE + 1));
        assert_eq!(param_distance(&registry, Type::STRING, Type::OBJECT), None);
        assert_eq!(param_distance(&registry, Type::INT, Type::Null), None);
        assert_eq!(param_distance(&registry, Type::STRING, Type::Null), Some(NULL_COST));
    }

    #[test]
    fn test_display() {
        let key = MethodKey::new("foo", &[Type::INT, Type::STRING]);
        assert_eq!(key.to_string(), "foo(#6, #12)");
        let registry = ClassRegistry::new();
        assert_eq!(key.describe(&registry), "foo(kiln.lang.Integer, kiln.lang.String)");
    }
}
