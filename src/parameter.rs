//! Named, validated configuration values for services.

use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::fluent::Fluent;
use crate::value::Value;

/// Predicate deciding whether a supplied parameter value is acceptable.
pub type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Descriptor for a positional service parameter.
///
/// Parameters are bound either at resolution time (positional arguments to
/// `Container::resolve`) or ahead of time through `Container::configure`.
/// Supplied values always pass through the validator; defaults never do.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Parameter, Value};
///
/// let retries = Parameter::new("retries")
///     .with_validator(|v| v.as_i64().map_or(false, |n| n >= 0))
///     .with_default(3);
///
/// assert!(retries.validate(&Value::from(5)));
/// assert!(!retries.validate(&Value::from(-1)));
/// assert_eq!(retries.resolve(None, "client", 0).unwrap(), Some(Value::from(3)));
/// ```
#[derive(Clone)]
pub struct Parameter {
    name: String,
    validator: Validator,
    default: Option<Value>,
}

impl Fluent for Parameter {}

impl Parameter {
    /// Creates a parameter accepting any value, with no default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            validator: Arc::new(|_| true),
            default: None,
        }
    }

    /// A parameter that only accepts integers.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name).with_validator(|v| v.as_i64().is_some())
    }

    /// A parameter that only accepts strings.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name).with_validator(|v| v.as_str().is_some())
    }

    pub fn with_validator<F>(self, validator: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.chain(|p| p.validator = Arc::new(validator))
    }

    pub fn with_default(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.chain(|p| p.set_default(value))
    }

    pub fn set_default(&mut self, value: Value) {
        self.default = Some(value);
    }

    /// Name under which the value is handed to the service.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Runs the validator. No side effects.
    pub fn validate(&self, value: &Value) -> bool {
        (self.validator)(value)
    }

    /// Applies this parameter to a positional argument.
    ///
    /// A supplied value must pass validation; the error names `service` and the
    /// 1-based position derived from `index`. An absent value falls back to the
    /// default without consulting the validator, or stays unset.
    pub fn resolve(&self, value: Option<&Value>, service: &str, index: usize) -> DiResult<Option<Value>> {
        match value {
            Some(value) if !self.validate(value) => Err(DiError::InvalidParameter {
                service: service.to_string(),
                position: index + 1,
            }),
            Some(value) => Ok(Some(value.clone())),
            None => Ok(self.default.clone()),
        }
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

impl From<&str> for Parameter {
    fn from(name: &str) -> Self {
        Parameter::new(name)
    }
}

impl From<String> for Parameter {
    fn from(name: String) -> Self {
        Parameter::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn string_shorthand_accepts_anything() {
        let p: Parameter = "level".into();
        assert_eq!(p.name(), "level");
        assert!(p.validate(&Value::Null));
        assert!(p.default_value().is_none());
        assert_eq!(p.resolve(None, "svc", 0).unwrap(), None);
    }

    #[test]
    fn defaults_bypass_the_validator() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let p = Parameter::new("n")
            .with_validator(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                false
            })
            .with_default("fallback");

        assert_eq!(p.resolve(None, "svc", 0).unwrap(), Some(Value::from("fallback")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalid_values_report_one_based_position() {
        let p = Parameter::integer("count");
        let err = p.resolve(Some(&Value::from("five")), "_foo", 0).unwrap_err();
        assert_eq!(err.to_string(), "Invalid parameter #1 passed to _foo.");

        let err = p.resolve(Some(&Value::from("five")), "_foo", 2).unwrap_err();
        assert!(matches!(err, DiError::InvalidParameter { position: 3, .. }));
    }

    #[test]
    fn supplied_values_win_over_defaults() {
        let p = Parameter::string("mode").with_default("slow");
        assert_eq!(p.resolve(Some(&Value::from("fast")), "svc", 0).unwrap(), Some(Value::from("fast")));
    }
}
