//! Introspection: what a script may see of a host class
//!
//! - [`permissions`]: the policy deciding which classes and members are visible
//! - [`method_key`]: signature keys and most-specific overload resolution
//! - [`class_map`]: the per-class method and field index
//! - [`introspector`]: the registry of class maps owned by one engine

pub mod class_map;
pub mod introspector;
pub mod method_key;
pub mod permissions;

pub use class_map::{Cached, ClassMap};
pub use introspector::Introspector;
pub use method_key::{param_distance, Ambiguity, MethodKey, Parameterized};
pub use permissions::{Permissions, PermissionsError};
