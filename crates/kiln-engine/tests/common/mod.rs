//! Shared host classes for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use kiln_sdk::{arg, ClassBuilder, ClassId, ClassRegistry, HostResult, Type, Value};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;

/// State behind `app.model.Person`
pub struct Person {
    pub name: RwLock<String>,
    pub age: RwLock<i32>,
}

pub struct Fixture {
    pub registry: Arc<ClassRegistry>,
    pub person: ClassId,
    pub employee: ClassId,
    pub secret: ClassId,
}

fn person(this: &Value) -> HostResult<&Person> {
    this.state::<Person>()
}

pub fn fixture() -> Fixture {
    let registry = Arc::new(ClassRegistry::new());
    let person_class: Arc<OnceCell<ClassId>> = Arc::new(OnceCell::new());
    let constructed = person_class.clone();

    let person_id = registry
        .register(
            ClassBuilder::new("app.model.Person")
                .field(
                    "age",
                    Type::INT,
                    |this| Ok(Value::Int(*person(this)?.age.read())),
                    |this, v| {
                        *person(this)?.age.write() = v.as_index().ok_or("age must be a number")?;
                        Ok(())
                    },
                )
                .constant("SPECIES", Type::STRING, Value::from("human"))
                .method("getName", &[], Type::STRING, |this, _| {
                    Ok(Value::string(person(this)?.name.read().as_str()))
                })
                .method("setName", &[Type::STRING], Type::VOID, |this, args| {
                    *person(this)?.name.write() = arg(args, 0)?;
                    Ok(Value::Null)
                })
                .method("isAdult", &[], Type::BOOLEAN, |this, _| {
                    Ok(Value::Bool(*person(this)?.age.read() >= 18))
                })
                .method("foo", &[Type::INT], Type::STRING, |_, _| Ok(Value::from("foo(int)")))
                .method("foo", &[Type::class(ClassId::INTEGER)], Type::STRING, |_, _| {
                    Ok(Value::from("foo(Integer)"))
                })
                .method("bar", &[Type::class(ClassId::NUMBER), Type::OBJECT], Type::VOID, |_, _| Ok(Value::Null))
                .method("bar", &[Type::OBJECT, Type::class(ClassId::NUMBER)], Type::VOID, |_, _| Ok(Value::Null))
                .method("greet", &[Type::STRING], Type::STRING, |this, args| {
                    let other: String = arg(args, 0)?;
                    Ok(Value::from(format!("{} greets {}", person(this)?.name.read(), other)))
                })
                .method("greet", &[Type::OBJECT], Type::STRING, |_, _| Ok(Value::from("greets someone")))
                .constructor(&[Type::STRING, Type::INT], move |args| {
                    let class = *constructed.get().ok_or("Person is not registered yet")?;
                    Ok(new_person_value_of(class, arg(args, 0)?, arg(args, 1)?))
                }),
        )
        .expect("register Person");
    let _ = person_class.set(person_id);

    let employee_id = registry
        .register(
            ClassBuilder::new("app.model.Employee")
                .extends(person_id)
                .method("getName", &[], Type::STRING, |this, _| {
                    Ok(Value::from(format!("Employee {}", person(this)?.name.read())))
                }),
        )
        .expect("register Employee");

    let secret_id = registry
        .register(
            ClassBuilder::new("app.internal.Secret")
                .field("code", Type::INT, |_| Ok(Value::Int(1234)), |_, _| Ok(()))
                .method("reveal", &[], Type::STRING, |_, _| Ok(Value::from("hunter2")))
                .method("getCode", &[], Type::INT, |_, _| Ok(Value::Int(1234))),
        )
        .expect("register Secret");

    Fixture {
        registry,
        person: person_id,
        employee: employee_id,
        secret: secret_id,
    }
}

fn new_person_value_of(class: ClassId, name: String, age: i32) -> Value {
    Value::object(
        class,
        Person {
            name: RwLock::new(name),
            age: RwLock::new(age),
        },
    )
}

impl Fixture {
    pub fn new_person(&self, name: &str, age: i32) -> Value {
        new_person_value_of(self.person, name.to_string(), age)
    }

    pub fn new_employee(&self, name: &str, age: i32) -> Value {
        new_person_value_of(self.employee, name.to_string(), age)
    }

    pub fn new_secret(&self) -> Value {
        Value::object(self.secret, ())
    }
}
