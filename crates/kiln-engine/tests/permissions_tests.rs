//! Permission policies as seen through the facade

mod common;

use common::fixture;
use kiln_engine::{Permissions, PermissionsError, Uberspect};
use kiln_sdk::{ListObject, Value};

#[test]
fn test_restricted_hides_application_classes() {
    let fx = fixture();
    let u = Uberspect::new(fx.registry.clone(), Permissions::restricted());
    let ada = fx.new_person("Ada", 36);
    assert!(u.get_property_get(&ada, &Value::from("name")).unwrap().is_none());
    assert!(u.get_method(&ada, "greet", &[Value::from("x")]).unwrap().is_none());

    // core classes stay usable
    let list = ListObject::new_value(vec![Value::Int(1)]);
    assert!(u.get_method(&list, "size", &[]).unwrap().is_some());
    assert!(u.get_method(&Value::from("abc"), "length", &[]).unwrap().is_some());
}

#[test]
fn test_class_grants_on_top_of_restricted() {
    let fx = fixture();
    let permissions = Permissions::restricted().with_classes(["app.model.Person"]);
    let u = Uberspect::new(fx.registry.clone(), permissions);
    let ada = fx.new_person("Ada", 36);
    let bo = fx.new_employee("Bo", 20);
    assert!(u.get_property_get(&ada, &Value::from("name")).unwrap().is_some());
    // Employee itself is not granted
    assert!(u.get_property_get(&bo, &Value::from("name")).unwrap().is_none());
}

#[test]
fn test_member_rules() {
    let fx = fixture();
    let permissions = Permissions::unrestricted()
        .compose(
            "# no renaming, no age
             app.model {
                 Person { setName(); age; }
             }",
        )
        .unwrap();
    let u = Uberspect::new(fx.registry.clone(), permissions);
    let ada = fx.new_person("Ada", 36);
    assert!(u.get_property_get(&ada, &Value::from("name")).unwrap().is_some());
    assert!(u
        .get_property_set(&ada, &Value::from("name"), &Value::from("x"))
        .unwrap()
        .is_none());
    assert!(u.get_property_get(&ada, &Value::from("age")).unwrap().is_none());
    assert!(u.get_method(&ada, "setName", &[Value::from("x")]).unwrap().is_none());
}

#[test]
fn test_compose_never_regrants() {
    let fx = fixture();
    let narrowed = Permissions::unrestricted().compose("app.model { Person { greet(); } }").unwrap();
    // a later, unrelated rule keeps the earlier denial
    let narrower = narrowed.compose("app.internal { }").unwrap();
    let u = Uberspect::new(fx.registry.clone(), narrower.clone());
    let ada = fx.new_person("Ada", 36);
    assert!(u.get_method(&ada, "greet", &[Value::from("x")]).unwrap().is_none());
    assert!(u.get_method(&fx.new_secret(), "reveal", &[]).unwrap().is_none());

    // an explicit class grant is a widening step of its own
    let granted = narrower.with_classes(["app.internal.Secret"]);
    let u = Uberspect::new(fx.registry.clone(), granted);
    assert!(u.get_method(&fx.new_secret(), "reveal", &[]).unwrap().is_some());
    assert!(u.get_method(&ada, "greet", &[Value::from("x")]).unwrap().is_none());
}

#[test]
fn test_wildcard_packages() {
    let fx = fixture();
    let permissions = Permissions::unrestricted().compose("app.** { }").unwrap();
    let u = Uberspect::new(fx.registry.clone(), permissions);
    assert!(u.get_method(&fx.new_person("Ada", 1), "getName", &[]).unwrap().is_none());
    assert!(u.get_method(&fx.new_secret(), "reveal", &[]).unwrap().is_none());
    assert!(u.get_method(&Value::from("s"), "isEmpty", &[]).unwrap().is_some());
}

#[test]
fn test_syntax_errors_are_located() {
    let err = Permissions::unrestricted().compose("app {\n  Person { name }\n}").unwrap_err();
    let PermissionsError::Syntax { line, .. } = err;
    assert_eq!(line, 2);
}
