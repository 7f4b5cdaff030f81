//! Call-site inline caches
//!
//! A call site remembers the last executor it used. Each evaluation first
//! replays it through `try_invoke`; only a [`TryOutcome::Failed`] sends the
//! site back to the facade for full discovery.

use std::sync::atomic::{AtomicU64, Ordering};

use kiln_sdk::Value;
use parking_lot::RwLock;

use crate::error::IntrospectionResult;
use crate::executor::{Executor, MethodExecutor, PropertyGet, PropertySet, TryOutcome};
use crate::strategy::AccessStyle;
use crate::uberspect::Uberspect;

/// Inline cache slot plus hit/miss counters
#[derive(Debug)]
pub struct CallSite<E> {
    cached: RwLock<Option<E>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Call site for property reads
pub type GetSite = CallSite<PropertyGet>;

/// Call site for property writes
pub type SetSite = CallSite<PropertySet>;

/// Call site for method calls
pub type MethodSite = CallSite<MethodExecutor>;

impl<E> Default for CallSite<E> {
    fn default() -> Self {
        Self {
            cached: RwLock::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl<E: Executor + Clone> CallSite<E> {
    /// Empty call site
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluations answered by the cached executor
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Evaluations that needed discovery
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// The cached executor, if any
    pub fn cached(&self) -> Option<E> {
        self.cached.read().clone()
    }

    /// Forget the cached executor
    pub fn clear(&self) {
        *self.cached.write() = None;
    }

    fn replay(&self, attempt: impl FnOnce(&E) -> IntrospectionResult<TryOutcome>) -> IntrospectionResult<Option<Value>> {
        let cached = self.cached.read().clone();
        if let Some(executor) = cached {
            if let TryOutcome::Done(value) = attempt(&executor)? {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(value));
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    fn store(&self, executor: &E) {
        if executor.is_cacheable() {
            *self.cached.write() = Some(executor.clone());
        }
    }
}

impl CallSite<PropertyGet> {
    /// Evaluate `target.key`.
    ///
    /// `Ok(None)` when no accessor exists.
    pub fn get(&self, uberspect: &Uberspect, style: AccessStyle, target: &Value, key: &Value) -> IntrospectionResult<Option<Value>> {
        if let Some(value) = self.replay(|e| e.try_invoke(target, key))? {
            return Ok(Some(value));
        }
        let Some(executor) = uberspect.get_property_get_as(style, target, key)? else {
            return Ok(None);
        };
        let value = executor.invoke(target)?;
        self.store(&executor);
        Ok(Some(value))
    }
}

impl CallSite<PropertySet> {
    /// Evaluate `target.key = value`.
    ///
    /// `Ok(None)` when no accessor exists.
    pub fn set(
        &self,
        uberspect: &Uberspect,
        style: AccessStyle,
        target: &Value,
        key: &Value,
        value: &Value,
    ) -> IntrospectionResult<Option<Value>> {
        if let Some(written) = self.replay(|e| e.try_invoke(target, key, value))? {
            return Ok(Some(written));
        }
        let Some(executor) = uberspect.get_property_set_as(style, target, key, value)? else {
            return Ok(None);
        };
        let written = executor.invoke(target, value)?;
        self.store(&executor);
        Ok(Some(written))
    }
}

impl CallSite<MethodExecutor> {
    /// Evaluate `target.name(args)`.
    ///
    /// `Ok(None)` when no overload applies.
    pub fn call(&self, uberspect: &Uberspect, target: &Value, name: &str, args: &[Value]) -> IntrospectionResult<Option<Value>> {
        if let Some(value) = self.replay(|e| e.try_invoke(target, name, args))? {
            return Ok(Some(value));
        }
        let Some(executor) = uberspect.get_method(target, name, args)? else {
            return Ok(None);
        };
        let value = executor.invoke(target, args)?;
        self.store(&executor);
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspection::Permissions;
    use kiln_sdk::{arg, ClassBuilder, ClassRegistry, ListObject, MapObject, Type};
    use std::sync::Arc;

    fn uberspect() -> Uberspect {
        Uberspect::new(Arc::new(ClassRegistry::new()), Permissions::unrestricted())
    }

    fn with_class(builder: ClassBuilder) -> (Uberspect, Value) {
        let registry = Arc::new(ClassRegistry::new());
        let id = registry.register(builder).unwrap();
        (Uberspect::new(registry, Permissions::unrestricted()), Value::object(id, ()))
    }

    #[test]
    fn test_get_site_hits_after_first_miss() {
        let u = uberspect();
        let site = GetSite::new();
        let map = MapObject::new_value([(Value::from("a"), Value::Int(1))]);
        for _ in 0..3 {
            let v = site.get(&u, AccessStyle::Bracket, &map, &Value::from("a")).unwrap();
            assert_eq!(v, Some(Value::Int(1)));
        }
        assert_eq!(site.misses(), 1);
        assert_eq!(site.hits(), 2);
    }

    #[test]
    fn test_shape_change_falls_back() {
        let u = uberspect();
        let site = GetSite::new();
        let map = MapObject::new_value([(Value::from("a"), Value::Int(1))]);
        let list = ListObject::new_value(vec![Value::from("x")]);
        site.get(&u, AccessStyle::Bracket, &map, &Value::from("a")).unwrap();
        let v = site.get(&u, AccessStyle::Bracket, &list, &Value::Int(0)).unwrap();
        assert_eq!(v, Some(Value::from("x")));
        assert_eq!(site.misses(), 2);
        assert!(matches!(site.cached(), Some(PropertyGet::List(_))));
    }

    #[test]
    fn test_set_and_call_sites() {
        let u = uberspect();
        let list = ListObject::new_value(vec![Value::Int(0), Value::Int(0)]);
        let set = SetSite::new();
        set.set(&u, AccessStyle::Bracket, &list, &Value::Int(0), &Value::Int(4)).unwrap();
        set.set(&u, AccessStyle::Bracket, &list, &Value::Int(1), &Value::Int(5)).unwrap();
        assert_eq!(set.hits(), 1);

        let call = MethodSite::new();
        assert_eq!(call.call(&u, &list, "size", &[]).unwrap(), Some(Value::Int(2)));
        assert_eq!(call.call(&u, &list, "get", &[Value::Int(1)]).unwrap(), Some(Value::Int(5)));
        assert_eq!(call.call(&u, &list, "nope", &[]).unwrap(), None);
        assert_eq!(call.misses(), 3);

        call.clear();
        assert!(call.cached().is_none());
    }

    #[test]
    fn test_numeric_string_index_stays_cached() {
        let (u, row) = with_class(ClassBuilder::new("t.Row").method("get", &[Type::INT], Type::INT, |_, args| {
            Ok(Value::Int(arg::<i32>(args, 0)? * 10))
        }));
        let site = GetSite::new();
        for _ in 0..5 {
            let v = site.get(&u, AccessStyle::Bracket, &row, &Value::from("1")).unwrap();
            assert_eq!(v, Some(Value::Int(10)));
        }
        assert!(matches!(site.cached(), Some(PropertyGet::Duck(_))));
        assert_eq!(site.misses(), 1);
        assert_eq!(site.hits(), 4);
    }

    #[test]
    fn test_widening_setter_stays_cached() {
        let (u, acct) = with_class(
            ClassBuilder::new("t.Acct").method("setBalance", &[Type::LONG], Type::VOID, |_, _| Ok(Value::Null)),
        );
        let site = SetSite::new();
        for i in 0..5 {
            let v = site
                .set(&u, AccessStyle::Dot, &acct, &Value::from("balance"), &Value::Int(i))
                .unwrap();
            assert_eq!(v, Some(Value::Int(i)));
        }
        assert_eq!(site.misses(), 1);
        assert_eq!(site.hits(), 4);
    }
}
