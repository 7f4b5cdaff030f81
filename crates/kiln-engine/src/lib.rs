//! Kiln Engine - object-model runtime for the Kiln scripting language
//!
//! Given a host value and a property name or method signature, the engine
//! resolves, caches and invokes the matching accessor. Host classes never
//! implement anything engine-specific: they are described once in a
//! [`ClassRegistry`](kiln_sdk::ClassRegistry) and everything else is found
//! by introspection.
//!
//! - [`introspection`]: permission policy, signature keys, per-class caches
//! - [`executor`]: the accessor families and their `try_invoke` fast paths
//! - [`Uberspect`]: the resolution facade
//! - [`CallSite`]: inline caches the interpreter keeps per expression
//!
//! # Example
//!
//! ```ignore
//! use kiln_engine::{GetSite, Permissions, Uberspect};
//!
//! let uberspect = Uberspect::new(registry.clone(), Permissions::restricted());
//! let site = GetSite::new();
//! let name = site.get(&uberspect, AccessStyle::Dot, &person, &Value::from("name"))?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod call_site;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod introspection;
pub mod strategy;
pub mod uberspect;

pub use call_site::{CallSite, GetSite, MethodSite, SetSite};
pub use config::{IntrospectionConfig, PolicyBase};
pub use context::ObjectContext;
pub use error::{IntrospectionError, IntrospectionResult};
pub use executor::{ConstructorExecutor, Executor, MethodExecutor, PropertyGet, PropertySet, TryOutcome};
pub use introspection::{Introspector, MethodKey, Permissions, PermissionsError};
pub use strategy::{AccessStyle, PropertyResolver, ResolverStrategy};
pub use uberspect::Uberspect;
