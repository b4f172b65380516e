//! Dynamically typed runtime values.

use super::{EntityRef, NodeId, RelationshipId};
use std::collections::BTreeMap;
use std::fmt;

/// A runtime value flowing through expressions and into property storage.
///
/// `NoValue` is the null sentinel. It is never stored: writing it to a
/// property means "remove this property if present".
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    NoValue,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Node(NodeId),
    Relationship(RelationshipId),
}

impl Value {
    /// Build a map value from `(key, value)` pairs.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Whether this is the null sentinel.
    #[must_use]
    pub fn is_no_value(&self) -> bool {
        matches!(self, Self::NoValue)
    }

    /// Interpret the value as a mutation target.
    ///
    /// Returns `None` when the value is neither a node, a relationship nor null.
    #[must_use]
    pub fn as_entity_ref(&self) -> Option<EntityRef> {
        match self {
            Self::Node(id) => Some(EntityRef::Node(*id)),
            Self::Relationship(id) => Some(EntityRef::Relationship(*id)),
            Self::NoValue => Some(EntityRef::Null),
            _ => None,
        }
    }

    /// Whether the value can be written as a property.
    ///
    /// Primitives are storable, and so are lists whose elements are all
    /// primitives of the same type.
    #[must_use]
    pub fn is_storable(&self) -> bool {
        match self {
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::String(_) => true,
            Self::List(items) => {
                let mut kinds = items.iter().map(|item| {
                    if item.is_primitive() {
                        Some(std::mem::discriminant(item))
                    } else {
                        None
                    }
                });
                match kinds.next() {
                    None => true,
                    Some(None) => false,
                    Some(first) => kinds.all(|kind| kind == first),
                }
            }
            Self::NoValue | Self::Map(_) | Self::Node(_) | Self::Relationship(_) => false,
        }
    }

    fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::String(_)
        )
    }

    /// Name of the value's type, as used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::NoValue => "NoValue",
            Self::Bool(_) => "Boolean",
            Self::Int(_) => "Integer",
            Self::Float(_) => "Float",
            Self::String(_) => "String",
            Self::List(_) => "List",
            Self::Map(_) => "Map",
            Self::Node(_) => "Node",
            Self::Relationship(_) => "Relationship",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoValue => f.write_str("NO_VALUE"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::String(s) => write!(f, "\"{s}\""),
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
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Self::Node(id) => write!(f, "{id}"),
            Self::Relationship(id) => write!(f, "{id}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}
