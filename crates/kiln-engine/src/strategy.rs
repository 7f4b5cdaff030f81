//! Resolver ordering
//!
//! Which executor families the facade tries, and in which order, depends on
//! how the property was written (`a.b` or `a[b]`) and on the configured
//! [`ResolverStrategy`].

use kiln_sdk::{ClassId, ClassRegistry};
use serde::Deserialize;

/// One executor family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyResolver {
    /// `getFoo()` / `isFoo()` / `setFoo(v)`
    Property,
    /// `Map.get` / `Map.put`
    Map,
    /// Array elements and `List.get` / `List.set`
    List,
    /// Generic `get(key)` / `set(key, v)`
    Duck,
    /// Public fields
    Field,
}

/// How a property access was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessStyle {
    /// `a.b`
    #[default]
    Dot,
    /// `a[b]`
    Bracket,
}

const DOT: &[PropertyResolver] = &[
    PropertyResolver::Property,
    PropertyResolver::Map,
    PropertyResolver::List,
    PropertyResolver::Duck,
    PropertyResolver::Field,
];

const BRACKET: &[PropertyResolver] = &[
    PropertyResolver::Map,
    PropertyResolver::List,
    PropertyResolver::Duck,
    PropertyResolver::Property,
    PropertyResolver::Field,
];

const MAP_ONLY: &[PropertyResolver] = &[PropertyResolver::Map];

/// Named resolver orderings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverStrategy {
    /// Bean properties first for `a.b`, containers first for `a[b]`
    #[default]
    Pojo,
    /// As `Pojo`, except maps only ever resolve to their entries
    Map,
}

impl ResolverStrategy {
    /// Resolvers to try, in order, for a target of class `class`
    pub fn resolvers(self, registry: &ClassRegistry, class: ClassId, style: AccessStyle) -> &'static [PropertyResolver] {
        if self == ResolverStrategy::Map && registry.is_assignable(class, ClassId::MAP) {
            return MAP_ONLY;
        }
        match style {
            AccessStyle::Dot => DOT,
            AccessStyle::Bracket => BRACKET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pojo_orders() {
        let registry = ClassRegistry::new();
        let dot = ResolverStrategy::Pojo.resolvers(&registry, ClassId::HASH_MAP, AccessStyle::Dot);
        assert_eq!(dot[0], PropertyResolver::Property);
        let bracket = ResolverStrategy::Pojo.resolvers(&registry, ClassId::HASH_MAP, AccessStyle::Bracket);
        assert_eq!(bracket[0], PropertyResolver::Map);
        assert_eq!(bracket.last(), Some(&PropertyResolver::Field));
    }

    #[test]
    fn test_map_strategy_only_narrows_maps() {
        let registry = ClassRegistry::new();
        let on_map = ResolverStrategy::Map.resolvers(&registry, ClassId::HASH_MAP, AccessStyle::Dot);
        assert_eq!(on_map, &[PropertyResolver::Map]);
        let on_list = ResolverStrategy::Map.resolvers(&registry, ClassId::ARRAY_LIST, AccessStyle::Dot);
        assert_eq!(on_list.len(), 5);
    }
}
