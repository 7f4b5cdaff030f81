//! Resolution facade
//!
//! [`Uberspect`] turns a (target, property) or (target, method, arguments)
//! triple into an executor. It resolves the target's runtime class, asks the
//! [`Introspector`] for its class map and tries the executor families in the
//! order the [`ResolverStrategy`] prescribes, returning the first discovery.
//! `Ok(None)` means no accessor exists or the policy hides it; the two are
//! indistinguishable.

use std::sync::Arc;

use kiln_sdk::{ClassId, ClassRegistry, Value};

use crate::error::IntrospectionResult;
use crate::executor::{
    BooleanGet, ConstructorExecutor, DuckGet, DuckSet, Executor, FieldGet, FieldSet, ListGet, ListSet, MapGet,
    MapSet, MethodExecutor, PropertyGet, PropertyGetter, PropertySet, PropertySetter,
};
use crate::introspection::{Introspector, Permissions};
use crate::strategy::{AccessStyle, PropertyResolver, ResolverStrategy};

/// Member resolution for one engine configuration
#[derive(Debug)]
pub struct Uberspect {
    introspector: Introspector,
    strategy: ResolverStrategy,
}

impl Uberspect {
    /// Create a facade with the default strategy
    pub fn new(registry: Arc<ClassRegistry>, permissions: Permissions) -> Self {
        Self::with_strategy(registry, permissions, ResolverStrategy::default())
    }

    /// Create a facade with an explicit strategy
    pub fn with_strategy(registry: Arc<ClassRegistry>, permissions: Permissions, strategy: ResolverStrategy) -> Self {
        Self {
            introspector: Introspector::new(registry, permissions),
            strategy,
        }
    }

    /// The underlying introspector
    pub fn introspector(&self) -> &Introspector {
        &self.introspector
    }

    /// The class registry
    pub fn registry(&self) -> &Arc<ClassRegistry> {
        self.introspector.registry()
    }

    /// The permission policy
    pub fn permissions(&self) -> &Permissions {
        self.introspector.permissions()
    }

    /// The resolver strategy
    pub fn strategy(&self) -> ResolverStrategy {
        self.strategy
    }

    /// Resolver order for `target` accessed with `style`
    pub fn resolvers(&self, target: &Value, style: AccessStyle) -> &'static [PropertyResolver] {
        self.strategy.resolvers(self.registry(), target.class_id(), style)
    }

    // ========================================================================
    // Property get
    // ========================================================================

    /// Discover a read of `key` on `target` written as `target.key`
    pub fn get_property_get(&self, target: &Value, key: &Value) -> IntrospectionResult<Option<PropertyGet>> {
        self.get_property_get_as(AccessStyle::Dot, target, key)
    }

    /// Discover a read of `key` on `target` written in `style`
    pub fn get_property_get_as(
        &self,
        style: AccessStyle,
        target: &Value,
        key: &Value,
    ) -> IntrospectionResult<Option<PropertyGet>> {
        self.get_property_get_with(self.resolvers(target, style), target, key)
    }

    /// Discover a read trying `resolvers` in order
    pub fn get_property_get_with(
        &self,
        resolvers: &[PropertyResolver],
        target: &Value,
        key: &Value,
    ) -> IntrospectionResult<Option<PropertyGet>> {
        if target.is_null() {
            return Ok(None);
        }
        let class = target.class_id();
        let is = &self.introspector;
        for resolver in resolvers {
            let found = match resolver {
                PropertyResolver::Property => match PropertyGetter::discover(is, class, key)? {
                    Some(getter) => Some(PropertyGet::Property(getter)),
                    None => BooleanGet::discover(is, class, key)?.map(PropertyGet::Boolean),
                },
                PropertyResolver::Map => MapGet::discover(is, class, key)?.map(PropertyGet::Map),
                PropertyResolver::List => ListGet::discover(is, class, key)?.map(PropertyGet::List),
                PropertyResolver::Duck => DuckGet::discover(is, class, key)?.map(PropertyGet::Duck),
                PropertyResolver::Field => FieldGet::discover(is, class, key).map(PropertyGet::Field),
            };
            if let Some(executor) = found.filter(|e| e.is_alive()) {
                return Ok(Some(executor));
            }
        }
        Ok(None)
    }

    // ========================================================================
    // Property set
    // ========================================================================

    /// Discover a write of `value` to `key` on `target` written as `target.key = value`
    pub fn get_property_set(&self, target: &Value, key: &Value, value: &Value) -> IntrospectionResult<Option<PropertySet>> {
        self.get_property_set_as(AccessStyle::Dot, target, key, value)
    }

    /// Discover a write written in `style`
    pub fn get_property_set_as(
        &self,
        style: AccessStyle,
        target: &Value,
        key: &Value,
        value: &Value,
    ) -> IntrospectionResult<Option<PropertySet>> {
        self.get_property_set_with(self.resolvers(target, style), target, key, value)
    }

    /// Discover a write trying `resolvers` in order
    pub fn get_property_set_with(
        &self,
        resolvers: &[PropertyResolver],
        target: &Value,
        key: &Value,
        value: &Value,
    ) -> IntrospectionResult<Option<PropertySet>> {
        if target.is_null() {
            return Ok(None);
        }
        let class = target.class_id();
        let is = &self.introspector;
        for resolver in resolvers {
            let found = match resolver {
                PropertyResolver::Property => PropertySetter::discover(is, class, key, value)?.map(PropertySet::Property),
                PropertyResolver::Map => MapSet::discover(is, class, key, value)?.map(PropertySet::Map),
                PropertyResolver::List => ListSet::discover(is, class, key, value)?.map(PropertySet::List),
                PropertyResolver::Duck => DuckSet::discover(is, class, key, value)?.map(PropertySet::Duck),
                PropertyResolver::Field => FieldSet::discover(is, class, key, value).map(PropertySet::Field),
            };
            if let Some(executor) = found.filter(|e| e.is_alive()) {
                return Ok(Some(executor));
            }
        }
        Ok(None)
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Discover the overload of `name` that `args` select on `target`.
    /// Fields are never considered.
    pub fn get_method(&self, target: &Value, name: &str, args: &[Value]) -> IntrospectionResult<Option<MethodExecutor>> {
        if target.is_null() {
            return Ok(None);
        }
        self.get_method_on(target.class_id(), name, args)
    }

    /// Discover a method on an explicit class, e.g. a static call
    pub fn get_method_on(&self, class: ClassId, name: &str, args: &[Value]) -> IntrospectionResult<Option<MethodExecutor>> {
        let found = MethodExecutor::discover(&self.introspector, class, name, args)?;
        Ok(found.filter(|e| e.is_alive()))
    }

    /// Discover the constructor of `class_name` that `args` select
    pub fn get_constructor(&self, class_name: &str, args: &[Value]) -> IntrospectionResult<Option<ConstructorExecutor>> {
        let found = ConstructorExecutor::discover(&self.introspector, class_name, args)?;
        Ok(found.filter(|e| e.is_alive()))
    }
}
