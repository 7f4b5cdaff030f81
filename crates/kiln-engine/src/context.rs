//! Variables backed by the properties of one host object

use kiln_sdk::Value;
use tracing::debug;

use crate::error::IntrospectionResult;
use crate::uberspect::Uberspect;

/// Script context resolving each variable as a property of `object`.
///
/// In strict mode a failing accessor is reported; otherwise reads yield
/// `null` and writes are dropped.
#[derive(Debug)]
pub struct ObjectContext<'a> {
    uberspect: &'a Uberspect,
    object: Value,
    strict: bool,
}

impl<'a> ObjectContext<'a> {
    /// Wrap `object`
    pub fn new(uberspect: &'a Uberspect, object: Value, strict: bool) -> Self {
        Self {
            uberspect,
            object,
            strict,
        }
    }

    /// The wrapped object
    pub fn object(&self) -> &Value {
        &self.object
    }

    /// Whether accessor failures are reported
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Read variable `name`; `null` when it does not exist
    pub fn get(&self, name: &str) -> IntrospectionResult<Value> {
        let key = Value::from(name);
        let Some(executor) = self.uberspect.get_property_get(&self.object, &key)? else {
            return Ok(Value::Null);
        };
        match executor.invoke(&self.object) {
            Ok(value) => Ok(value),
            Err(e) if self.strict => Err(e),
            Err(e) => {
                debug!(variable = name, error = %e, "context read failed");
                Ok(Value::Null)
            }
        }
    }

    /// Write variable `name`; ignored when it does not exist
    pub fn set(&self, name: &str, value: Value) -> IntrospectionResult<()> {
        let key = Value::from(name);
        let Some(executor) = self.uberspect.get_property_set(&self.object, &key, &value)? else {
            return Ok(());
        };
        match executor.invoke(&self.object, &value) {
            Ok(_) => Ok(()),
            Err(e) if self.strict => Err(e),
            Err(e) => {
                debug!(variable = name, error = %e, "context write failed");
                Ok(())
            }
        }
    }

    /// Whether variable `name` can be read
    pub fn has(&self, name: &str) -> IntrospectionResult<bool> {
        Ok(self
            .uberspect
            .get_property_get(&self.object, &Value::from(name))?
            .is_some())
    }
}
