//! # Expressions
//!
//! The small expression language the mutation operators evaluate: literals,
//! row variables, property reads (direct and through the row cache), map and
//! list construction, and null-propagating addition.

use super::{ExecutionContext, QueryState};
use crate::tokens::LazyPropertyKey;
use crate::transaction::Transaction;
use crate::{EntityKind, KestrelError, Value};
use std::fmt;

/// An expression evaluated against one row.
#[derive(Debug, Clone)]
pub enum Expression {
    Literal(Value),
    Variable(String),
    /// `expr.key` read from a map or straight from the graph.
    Property(Box<Expression>, LazyPropertyKey),
    /// `variable.key` read through the row's property cache.
    CachedProperty {
        variable: String,
        key: LazyPropertyKey,
    },
    Map(Vec<(String, Expression)>),
    List(Vec<Expression>),
    Add(Box<Expression>, Box<Expression>),
}

impl Expression {
    /// The `null` literal.
    #[must_use]
    pub fn null() -> Self {
        Self::Literal(Value::NoValue)
    }

    /// A literal value.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// A row variable.
    #[must_use]
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// `inner.key`
    #[must_use]
    pub fn property(inner: Expression, key: impl Into<String>) -> Self {
        Self::Property(Box::new(inner), LazyPropertyKey::new(key))
    }

    /// `variable.key` through the row cache.
    #[must_use]
    pub fn cached_property(variable: impl Into<String>, key: impl Into<String>) -> Self {
        Self::CachedProperty {
            variable: variable.into(),
            key: LazyPropertyKey::new(key),
        }
    }

    /// A map literal.
    #[must_use]
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Expression)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, e)| (k.into(), e)).collect())
    }

    /// `lhs + rhs`
    #[must_use]
    pub fn add(lhs: Expression, rhs: Expression) -> Self {
        Self::Add(Box::new(lhs), Box::new(rhs))
    }

    /// Evaluate against `row`.
    pub fn evaluate(
        &self,
        row: &mut ExecutionContext,
        state: &QueryState<'_>,
    ) -> Result<Value, KestrelError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Variable(name) => row.get_by_name(name),
            Self::Property(inner, key) => {
                let target = inner.evaluate(row, state)?;
                self.read_property(&target, key, state.transaction())
            }
            Self::CachedProperty { variable, key } => {
                let target = row.get_by_name(variable)?;
                let Some((kind, id)) = entity_of(&target) else {
                    return self.read_property(&target, key, state.transaction());
                };
                if let Some(value) = row.cached_property(kind, id, key.name()) {
                    return Ok(value.clone());
                }
                let value = read_entity_property(state.transaction(), kind, id, key)?;
                row.cache_property(kind, id, key.name(), value.clone());
                Ok(value)
            }
            Self::Map(entries) => {
                let mut map = std::collections::BTreeMap::new();
                for (name, expr) in entries {
                    map.insert(name.clone(), expr.evaluate(row, state)?);
                }
                Ok(Value::Map(map))
            }
            Self::List(items) => items
                .iter()
                .map(|item| item.evaluate(row, state))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Self::Add(lhs, rhs) => {
                let lhs = lhs.evaluate(row, state)?;
                let rhs = rhs.evaluate(row, state)?;
                self.add_values(lhs, rhs)
            }
        }
    }

    fn read_property(
        &self,
        target: &Value,
        key: &LazyPropertyKey,
        tx: &Transaction,
    ) -> Result<Value, KestrelError> {
        match target {
            Value::NoValue => Ok(Value::NoValue),
            Value::Map(map) => Ok(map.get(key.name()).cloned().unwrap_or_default()),
            Value::Node(id) => read_entity_property(tx, EntityKind::Node, id.0, key),
            Value::Relationship(id) => read_entity_property(tx, EntityKind::Relationship, id.0, key),
            other => Err(self.type_mismatch("Map, Node or Relationship", other)),
        }
    }

    fn add_values(&self, lhs: Value, rhs: Value) -> Result<Value, KestrelError> {
        use Value::{Float, Int, List, NoValue, String};

        Ok(match (lhs, rhs) {
            (NoValue, _) | (_, NoValue) => NoValue,
            (Int(a), Int(b)) => Int(a.checked_add(b).ok_or_else(|| {
                KestrelError::Arithmetic(format!("integer overflow evaluating {self}"))
            })?),
            (Int(a), Float(b)) => Float(a as f64 + b),
            (Float(a), Int(b)) => Float(a + b as f64),
            (Float(a), Float(b)) => Float(a + b),
            (String(a), String(b)) => String(a + &b),
            (List(mut a), List(b)) => {
                a.extend(b);
                List(a)
            }
            (List(mut a), b) => {
                a.push(b);
                List(a)
            }
            (a, List(b)) => {
                let mut items = Vec::with_capacity(b.len() + 1);
                items.push(a);
                items.extend(b);
                List(items)
            }
            (a, b) => {
                let offending = if matches!(a, Int(_) | Float(_) | String(_)) { b } else { a };
                return Err(self.type_mismatch("Integer, Float, String or List", &offending));
            }
        })
    }

    /// A type error naming this expression and the offending runtime value.
    pub(crate) fn type_mismatch(&self, expected: &'static str, value: &Value) -> KestrelError {
        KestrelError::TypeMismatch {
            expression: self.to_string(),
            expected,
            value: value.to_string(),
        }
    }
}

fn entity_of(value: &Value) -> Option<(EntityKind, u64)> {
    match value {
        Value::Node(id) => Some((EntityKind::Node, id.0)),
        Value::Relationship(id) => Some((EntityKind::Relationship, id.0)),
        _ => None,
    }
}

// Unknown keys and missing (virtual) entities both read as NoValue.
fn read_entity_property(
    tx: &Transaction,
    kind: EntityKind,
    id: u64,
    key: &LazyPropertyKey,
) -> Result<Value, KestrelError> {
    Ok(match key.id(tx.property_keys())? {
        Some(key) => tx.graph().property(kind, id, key),
        None => Value::NoValue,
    })
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(Value::NoValue) => f.write_str("null"),
            Self::Literal(value) => write!(f, "{value}"),
            Self::Variable(name) => f.write_str(name),
            Self::Property(inner, key) => write!(f, "{inner}.{}", key.name()),
            Self::CachedProperty { variable, key } => write!(f, "{variable}.{}", key.name()),
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (name, expr)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {expr}")?;
                }
                f.write_str("}")
            }
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Add(lhs, rhs) => write!(f, "{lhs} + {rhs}"),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
