//! Kiln SDK - host object model for the Kiln scripting engine
//!
//! This crate provides the types a host needs to expose its classes to
//! scripts without depending on the full kiln-engine: script [`Value`]s,
//! declared [`Type`]s, class declarations built with [`ClassBuilder`], and
//! the [`ClassRegistry`] that owns them.
//!
//! # Example
//!
//! ```ignore
//! use kiln_sdk::{ClassBuilder, ClassRegistry, Type, Value};
//!
//! let registry = ClassRegistry::new();
//! let point = registry.register(
//!     ClassBuilder::new("geo.Point")
//!         .final_field("x", Type::INT, |p| Ok(p.state::<Point>()?.x.into()))
//!         .method("norm", &[], Type::DOUBLE, |p, _| Ok(p.state::<Point>()?.norm().into())),
//! )?;
//! let p = Value::object(point, Point { x: 3, y: 4 });
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod builtins;
pub mod class;
pub mod error;
pub mod registry;
pub mod types;
pub mod value;

pub use builtins::{ListObject, MapObject};
pub use class::{ClassBuilder, ClassDef, ConstructorDef, FieldDef, Factory, Getter, Invoker, MethodDef, Setter};
pub use error::{HostError, HostResult};
pub use registry::ClassRegistry;
pub use types::{ClassId, Modifiers, Primitive, Type};
pub use value::{arg, ArrayRef, FromValue, ObjectRef, Value};
