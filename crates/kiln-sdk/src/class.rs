//! Host class declarations
//!
//! A host describes each class with a [`ClassBuilder`] and hands it to the
//! [`ClassRegistry`](crate::ClassRegistry), which assigns the id and freezes
//! the result into a [`ClassDef`]. Members are shared as `Arc`s so executors
//! can hold on to them without borrowing the registry.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{HostError, HostResult};
use crate::types::{ClassId, Modifiers, Type};
use crate::value::Value;

/// Method body: `(target, args) -> result`. Static methods ignore the target.
pub type Invoker = Arc<dyn Fn(&Value, &[Value]) -> HostResult<Value> + Send + Sync>;

/// Field read: `target -> value`
pub type Getter = Arc<dyn Fn(&Value) -> HostResult<Value> + Send + Sync>;

/// Field write: `(target, value)`
pub type Setter = Arc<dyn Fn(&Value, Value) -> HostResult<()> + Send + Sync>;

/// Constructor body: `args -> new instance`
pub type Factory = Arc<dyn Fn(&[Value]) -> HostResult<Value> + Send + Sync>;

fn unbound() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(true))
}

/// A declared method
pub struct MethodDef {
    name: String,
    params: Vec<Type>,
    return_type: Type,
    modifiers: Modifiers,
    pub(crate) declaring_class: ClassId,
    pub(crate) alive: Arc<AtomicBool>,
    invoker: Invoker,
}

impl MethodDef {
    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Formal parameter types in declaration order
    pub fn params(&self) -> &[Type] {
        &self.params
    }

    /// Declared return type ([`Type::VOID`] for none)
    pub fn return_type(&self) -> Type {
        self.return_type
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Public visibility
    pub fn is_public(&self) -> bool {
        self.modifiers.is_public
    }

    /// Static method
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static
    }

    /// Class that declares this method
    pub fn declaring_class(&self) -> ClassId {
        self.declaring_class
    }

    /// False once the declaring class has been retired
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Call the method
    pub fn invoke(&self, target: &Value, args: &[Value]) -> HostResult<Value> {
        if args.len() < self.params.len() {
            return Err(HostError::MissingArgument(args.len()));
        }
        (self.invoker)(target, args)
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("declaring_class", &self.declaring_class)
            .finish()
    }
}

/// A declared field
pub struct FieldDef {
    name: String,
    field_type: Type,
    modifiers: Modifiers,
    pub(crate) declaring_class: ClassId,
    pub(crate) alive: Arc<AtomicBool>,
    getter: Getter,
    setter: Option<Setter>,
}

impl FieldDef {
    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    pub fn field_type(&self) -> Type {
        self.field_type
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Public visibility
    pub fn is_public(&self) -> bool {
        self.modifiers.is_public
    }

    /// Static field
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static
    }

    /// Final field
    pub fn is_final(&self) -> bool {
        self.modifiers.is_final
    }

    /// An enum constant, or a static final field
    pub fn is_constant(&self) -> bool {
        self.modifiers.is_enum_constant || (self.modifiers.is_static && self.modifiers.is_final)
    }

    /// Class that declares this field
    pub fn declaring_class(&self) -> ClassId {
        self.declaring_class
    }

    /// False once the declaring class has been retired
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Read the field
    pub fn get(&self, target: &Value) -> HostResult<Value> {
        (self.getter)(target)
    }

    /// Write the field. Final fields refuse with [`HostError::IllegalAccess`].
    pub fn set(&self, target: &Value, value: Value) -> HostResult<()> {
        match &self.setter {
            Some(setter) if !self.modifiers.is_final => setter(target, value),
            _ => Err(HostError::IllegalAccess(format!(
                "field '{}' is final",
                self.name
            ))),
        }
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("type", &self.field_type)
            .field("declaring_class", &self.declaring_class)
            .finish()
    }
}

/// A declared constructor
pub struct ConstructorDef {
    params: Vec<Type>,
    modifiers: Modifiers,
    pub(crate) declaring_class: ClassId,
    pub(crate) alive: Arc<AtomicBool>,
    factory: Factory,
}

impl ConstructorDef {
    /// Formal parameter types
    pub fn params(&self) -> &[Type] {
        &self.params
    }

    /// Public visibility
    pub fn is_public(&self) -> bool {
        self.modifiers.is_public
    }

    /// Class this constructor instantiates
    pub fn declaring_class(&self) -> ClassId {
        self.declaring_class
    }

    /// False once the class has been retired
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Create an instance
    pub fn new_instance(&self, args: &[Value]) -> HostResult<Value> {
        if args.len() < self.params.len() {
            return Err(HostError::MissingArgument(args.len()));
        }
        (self.factory)(args)
    }
}

impl fmt::Debug for ConstructorDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDef")
            .field("params", &self.params)
            .field("declaring_class", &self.declaring_class)
            .finish()
    }
}

/// A registered class, interface or array class
#[derive(Debug)]
pub struct ClassDef {
    pub(crate) id: ClassId,
    pub(crate) name: String,
    pub(crate) package: String,
    pub(crate) is_public: bool,
    pub(crate) is_interface: bool,
    pub(crate) superclass: Option<ClassId>,
    pub(crate) interfaces: Vec<ClassId>,
    pub(crate) methods: Vec<Arc<MethodDef>>,
    pub(crate) fields: Vec<Arc<FieldDef>>,
    pub(crate) constructors: Vec<Arc<ConstructorDef>>,
    pub(crate) component: Option<Type>,
    pub(crate) alive: Arc<AtomicBool>,
}

impl ClassDef {
    /// Class id
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Simple name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package name (empty for the default package and for arrays)
    pub fn package(&self) -> &str {
        &self.package
    }

    /// `package.Name`, or just `Name` in the default package
    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }

    /// Public visibility
    pub fn is_public(&self) -> bool {
        self.is_public
    }

    /// Interface rather than concrete class
    pub fn is_interface(&self) -> bool {
        self.is_interface
    }

    /// Direct superclass (`None` for the root and for interfaces)
    pub fn superclass(&self) -> Option<ClassId> {
        self.superclass
    }

    /// Directly implemented (or, for interfaces, extended) interfaces
    pub fn interfaces(&self) -> &[ClassId] {
        &self.interfaces
    }

    /// Directly declared methods
    pub fn methods(&self) -> &[Arc<MethodDef>] {
        &self.methods
    }

    /// Directly declared fields
    pub fn fields(&self) -> &[Arc<FieldDef>] {
        &self.fields
    }

    /// Declared constructors
    pub fn constructors(&self) -> &[Arc<ConstructorDef>] {
        &self.constructors
    }

    /// Component type, for array classes
    pub fn component(&self) -> Option<Type> {
        self.component
    }

    /// Whether this is an array class
    pub fn is_array(&self) -> bool {
        self.component.is_some()
    }

    /// False once the class has been retired
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

/// Builder for a host class.
///
/// ```ignore
/// let point = registry.register(
///     ClassBuilder::new("geo.Point")
///         .field("x", Type::INT, |p| ..., |p, v| ...)
///         .method("norm", &[], Type::DOUBLE, |p, _| ...),
/// )?;
/// ```
pub struct ClassBuilder {
    pub(crate) name: String,
    pub(crate) package: String,
    pub(crate) is_public: bool,
    pub(crate) is_interface: bool,
    pub(crate) superclass: Option<ClassId>,
    pub(crate) interfaces: Vec<ClassId>,
    pub(crate) methods: Vec<MethodDef>,
    pub(crate) fields: Vec<FieldDef>,
    pub(crate) constructors: Vec<ConstructorDef>,
}

impl ClassBuilder {
    /// Start a public class named `package.Name`
    pub fn new(qualified_name: &str) -> Self {
        let (package, name) = match qualified_name.rfind('.') {
            Some(dot) => (&qualified_name[..dot], &qualified_name[dot + 1..]),
            None => ("", qualified_name),
        };
        Self {
            name: name.to_string(),
            package: package.to_string(),
            is_public: true,
            is_interface: false,
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            constructors: Vec::new(),
        }
    }

    /// Start a public interface
    pub fn interface(qualified_name: &str) -> Self {
        let mut builder = Self::new(qualified_name);
        builder.is_interface = true;
        builder
    }

    /// Set the superclass (defaults to the root class)
    pub fn extends(mut self, superclass: ClassId) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: ClassId) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Mark the class non-public
    pub fn non_public(mut self) -> Self {
        self.is_public = false;
        self
    }

    /// Add a method with explicit modifiers
    pub fn add_method<F>(
        mut self,
        name: &str,
        params: &[Type],
        return_type: Type,
        modifiers: Modifiers,
        invoker: F,
    ) -> Self
    where
        F: Fn(&Value, &[Value]) -> HostResult<Value> + Send + Sync + 'static,
    {
        self.methods.push(MethodDef {
            name: name.to_string(),
            params: params.to_vec(),
            return_type,
            modifiers,
            declaring_class: ClassId::OBJECT,
            alive: unbound(),
            invoker: Arc::new(invoker),
        });
        self
    }

    /// Add a public instance method
    pub fn method<F>(self, name: &str, params: &[Type], return_type: Type, invoker: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> HostResult<Value> + Send + Sync + 'static,
    {
        self.add_method(name, params, return_type, Modifiers::PUBLIC, invoker)
    }

    /// Add a public static method
    pub fn static_method<F>(self, name: &str, params: &[Type], return_type: Type, invoker: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> HostResult<Value> + Send + Sync + 'static,
    {
        self.add_method(name, params, return_type, Modifiers::PUBLIC.with_static(), invoker)
    }

    /// Add a non-public instance method
    pub fn private_method<F>(self, name: &str, params: &[Type], return_type: Type, invoker: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> HostResult<Value> + Send + Sync + 'static,
    {
        self.add_method(name, params, return_type, Modifiers::PRIVATE, invoker)
    }

    fn add_field(mut self, name: &str, field_type: Type, modifiers: Modifiers, getter: Getter, setter: Option<Setter>) -> Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            field_type,
            modifiers,
            declaring_class: ClassId::OBJECT,
            alive: unbound(),
            getter,
            setter,
        });
        self
    }

    /// Add a public mutable field
    pub fn field<G, S>(self, name: &str, field_type: Type, getter: G, setter: S) -> Self
    where
        G: Fn(&Value) -> HostResult<Value> + Send + Sync + 'static,
        S: Fn(&Value, Value) -> HostResult<()> + Send + Sync + 'static,
    {
        self.add_field(name, field_type, Modifiers::PUBLIC, Arc::new(getter), Some(Arc::new(setter)))
    }

    /// Add a public final field
    pub fn final_field<G>(self, name: &str, field_type: Type, getter: G) -> Self
    where
        G: Fn(&Value) -> HostResult<Value> + Send + Sync + 'static,
    {
        self.add_field(name, field_type, Modifiers::PUBLIC.with_final(), Arc::new(getter), None)
    }

    /// Add a non-public mutable field
    pub fn private_field<G, S>(self, name: &str, field_type: Type, getter: G, setter: S) -> Self
    where
        G: Fn(&Value) -> HostResult<Value> + Send + Sync + 'static,
        S: Fn(&Value, Value) -> HostResult<()> + Send + Sync + 'static,
    {
        self.add_field(name, field_type, Modifiers::PRIVATE, Arc::new(getter), Some(Arc::new(setter)))
    }

    /// Add a public static final field holding `value`
    pub fn constant(self, name: &str, field_type: Type, value: Value) -> Self {
        let modifiers = Modifiers::PUBLIC.with_static().with_final();
        self.add_field(name, field_type, modifiers, Arc::new(move |_| Ok(value.clone())), None)
    }

    /// Add an enum constant holding `value`
    pub fn enum_constant(self, name: &str, value: Value) -> Self {
        let field_type = value.runtime_type();
        let modifiers = Modifiers::PUBLIC.with_enum_constant();
        self.add_field(name, field_type, modifiers, Arc::new(move |_| Ok(value.clone())), None)
    }

    /// Add a public constructor
    pub fn constructor<F>(mut self, params: &[Type], factory: F) -> Self
    where
        F: Fn(&[Value]) -> HostResult<Value> + Send + Sync + 'static,
    {
        self.constructors.push(ConstructorDef {
            params: params.to_vec(),
            modifiers: Modifiers::PUBLIC,
            declaring_class: ClassId::OBJECT,
            alive: unbound(),
            factory: Arc::new(factory),
        });
        self
    }
}
