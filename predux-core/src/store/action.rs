//! Action records.
//!
//! An action names a reducer (`{container}/{method}`) and carries its
//! arguments as JSON. Actions are what the dispatch table routes and what the
//! `action_dispatched` trace signal reports.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;

use crate::error::{Result, StoreError};

/// The type tag of an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionType {
    container: Option<Arc<str>>,
    method: Arc<str>,
}

impl ActionType {
    /// Build a type tag, validating the method name.
    pub fn new(container: Option<&str>, method: &str) -> Result<Self> {
        validate_method_name(method)?;
        Ok(Self {
            container: container.map(Arc::from),
            method: Arc::from(method),
        })
    }

    pub(crate) fn from_parts(container: Option<Arc<str>>, method: Arc<str>) -> Self {
        Self { container, method }
    }

    /// Parse `container/method` or a bare `method`.
    ///
    /// The container part may itself contain `/`; the method is everything
    /// after the last one.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag.rsplit_once('/') {
            Some((container, method)) => Self::new(Some(container), method),
            None => Self::new(None, tag),
        }
    }

    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.container {
            Some(container) => write!(f, "{}/{}", container, self.method),
            None => f.write_str(&self.method),
        }
    }
}

/// Reject names that cannot round-trip through an action type.
pub(crate) fn validate_method_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name.contains('/') {
        "must not contain '/'"
    } else if name.trim() != name {
        "must not have surrounding whitespace"
    } else {
        return Ok(());
    };

    Err(StoreError::InvalidMethodName {
        name: name.to_string(),
        reason,
    })
}

/// A dispatchable action: a type tag and the reducer's arguments.
///
/// The payload is the JSON encoding of the reducer's argument value. Tuples
/// encode as arrays, so `(a, b)` becomes the argument list `[a, b]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    kind: ActionType,
    payload: Value,
}

impl Action {
    pub fn new(kind: ActionType, payload: Value) -> Self {
        Self { kind, payload }
    }

    /// Encode typed arguments into an action.
    pub fn encode<A: Serialize + ?Sized>(kind: ActionType, args: &A) -> Result<Self> {
        let payload = serde_json::to_value(args).map_err(|source| StoreError::Encode {
            action: kind.to_string(),
            source,
        })?;
        Ok(Self { kind, payload })
    }

    pub fn kind(&self) -> &ActionType {
        &self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// The argument list as seen by the reducer.
    pub fn args(&self) -> &[Value] {
        match &self.payload {
            Value::Null => &[],
            Value::Array(items) => items,
            other => std::slice::from_ref(other),
        }
    }

    /// The flat `[type, ...args]` record.
    pub fn record(&self) -> SmallVec<[Value; 4]> {
        let mut record = SmallVec::with_capacity(self.args().len() + 1);
        record.push(Value::String(self.kind.to_string()));
        record.extend(self.args().iter().cloned());
        record
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for arg in self.args() {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_tag_formats_container_and_method() {
        let kind = ActionType::new(Some("counter"), "increment").unwrap();
        assert_eq!(kind.to_string(), "counter/increment");

        let bare = ActionType::new(None, "increment").unwrap();
        assert_eq!(bare.to_string(), "increment");
    }

    #[test]
    fn parse_splits_on_last_slash() {
        let kind = ActionType::parse("app/todos/add").unwrap();
        assert_eq!(kind.container(), Some("app/todos"));
        assert_eq!(kind.method(), "add");

        let bare = ActionType::parse("add").unwrap();
        assert_eq!(bare.container(), None);
    }

    #[test]
    fn invalid_method_names_are_rejected() {
        assert!(ActionType::new(None, "").is_err());
        assert!(ActionType::new(None, "a/b").is_err());
        assert!(ActionType::new(None, " add").is_err());
        assert!(ActionType::parse("counter/").is_err());
    }

    #[test]
    fn tuple_arguments_spread_into_record() {
        let kind = ActionType::new(Some("todos"), "rename").unwrap();
        let action = Action::encode(kind, &(3, "milk")).unwrap();

        assert_eq!(action.args(), &[json!(3), json!("milk")]);
        assert_eq!(
            action.record().into_vec(),
            vec![json!("todos/rename"), json!(3), json!("milk")]
        );
    }

    #[test]
    fn unit_and_scalar_arguments() {
        let kind = ActionType::new(Some("counter"), "reset").unwrap();
        let unit = Action::encode(kind.clone(), &()).unwrap();
        assert!(unit.args().is_empty());
        assert_eq!(unit.to_string(), "counter/reset");

        let scalar = Action::encode(kind, &5).unwrap();
        assert_eq!(scalar.args(), &[json!(5)]);
        assert_eq!(scalar.to_string(), "counter/reset 5");
    }
}
