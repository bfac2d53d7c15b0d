#![forbid(unsafe_code)]

//! Dynamic property values and their semantic types.
//!
//! [`Value`] is what crosses every dynamic seam in tether: schema getters
//! produce it, predicates and sort keys compare it, bindings carry it between
//! a model property and a control.
//!
//! # Invariants
//!
//! 1. [`Value::total_cmp`] is a total order: `Null` < booleans < numbers <
//!    text < references. `Int` and `Float` compare numerically with each other.
//! 2. [`Value::coerce`] either returns a value that [`Value::conforms_to`] the
//!    requested type, or fails with [`Error::TypeMismatch`].
//! 3. `Null` conforms to every type (all properties are nullable).

use core::cmp::Ordering;
use core::fmt;

use crate::error::{Error, Result};
use crate::id::EntityId;

/// The semantic type of a schema property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Bool,
    Int,
    Float,
    Text,
    /// A reference to an entity of the named type, stored by identifier.
    Reference(&'static str),
}

impl SemanticType {
    /// The referenced type name, for [`SemanticType::Reference`].
    #[must_use]
    pub fn referenced_type(&self) -> Option<&'static str> {
        match self {
            Self::Reference(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Text => f.write_str("text"),
            Self::Reference(name) => write!(f, "reference to {name}"),
        }
    }
}

/// A dynamically typed property value.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Ref(EntityId),
}

impl Value {
    /// Short lowercase name of the variant, for diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Ref(_) => "reference",
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to floats.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(x) => Some(*x),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_reference(&self) -> Option<EntityId> {
        match self {
            Self::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// Extract a boolean, for use inside schema setters after coercion.
    pub fn try_bool(&self) -> Result<bool> {
        self.as_bool().ok_or_else(|| self.mismatch(SemanticType::Bool))
    }

    pub fn try_int(&self) -> Result<i64> {
        self.as_int().ok_or_else(|| self.mismatch(SemanticType::Int))
    }

    pub fn try_float(&self) -> Result<f64> {
        self.as_float().ok_or_else(|| self.mismatch(SemanticType::Float))
    }

    /// Take the text out of a `Text` value.
    pub fn try_text(self) -> Result<String> {
        match self {
            Self::Text(s) => Ok(s),
            other => Err(other.mismatch(SemanticType::Text)),
        }
    }

    pub fn try_reference(&self) -> Result<EntityId> {
        self.as_reference()
            .ok_or_else(|| self.mismatch(SemanticType::Reference("entity")))
    }

    fn mismatch(&self, expected: SemanticType) -> Error {
        Error::TypeMismatch {
            expected,
            found: self.clone(),
        }
    }

    /// Whether the value can be stored as-is in a property of type `ty`.
    #[must_use]
    pub fn conforms_to(&self, ty: &SemanticType) -> bool {
        matches!(
            (self, ty),
            (Self::Null, _)
                | (Self::Bool(_), SemanticType::Bool)
                | (Self::Int(_), SemanticType::Int)
                | (Self::Float(_), SemanticType::Float)
                | (Self::Text(_), SemanticType::Text)
                | (Self::Ref(_), SemanticType::Reference(_))
        )
    }

    /// Convert the value to the representation of `ty`.
    ///
    /// Text parses into numbers, booleans and identifiers; integers widen to
    /// floats; integral floats narrow to integers; anything formats to text.
    pub fn coerce(self, ty: &SemanticType) -> Result<Value> {
        if self.conforms_to(ty) {
            return Ok(self);
        }
        let coerced = match (&self, ty) {
            (Self::Int(i), SemanticType::Float) => Some(Self::Float(*i as f64)),
            (Self::Float(x), SemanticType::Int) => {
                (x.is_finite() && x.fract() == 0.0 && x.abs() < i64::MAX as f64)
                    .then(|| Self::Int(*x as i64))
            }
            (Self::Bool(b), SemanticType::Int) => Some(Self::Int(i64::from(*b))),
            (Self::Int(i), SemanticType::Bool) => Some(Self::Bool(*i != 0)),
            (Self::Text(s), SemanticType::Int) => parse_int(s.trim()),
            (Self::Text(s), SemanticType::Float) => s.trim().parse::<f64>().ok().map(Self::Float),
            (Self::Text(s), SemanticType::Bool) => parse_bool(s.trim()),
            (Self::Text(s), SemanticType::Reference(_)) => {
                s.parse::<EntityId>().ok().map(Self::Ref)
            }
            (_, SemanticType::Text) => Some(Self::Text(self.to_string())),
            _ => None,
        };
        coerced.ok_or_else(|| self.mismatch(ty.clone()))
    }

    /// Total order used by sort keys and ordering predicates.
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Ref(a), Self::Ref(b)) => a.cmp(b),
            (a, b) if a.rank() == 2 && b.rank() == 2 => {
                let x = a.as_float().unwrap_or_default();
                let y = b.as_float().unwrap_or_default();
                x.total_cmp(&y)
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Text(_) => 3,
            Self::Ref(_) => 4,
        }
    }
}

fn parse_int(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Int(i));
    }
    // "10.0" from a slider label still names an integer.
    let x = s.parse::<f64>().ok()?;
    (x.is_finite() && x.fract() == 0.0).then(|| Value::Int(x as i64))
}

fn parse_bool(s: &str) -> Option<Value> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(Value::Bool(true)),
        "false" | "no" | "off" | "0" => Some(Value::Bool(false)),
        _ => None,
    }
}

/// Formats the way a text control displays the value; `Null` is empty.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Ref(id) => write!(f, "{id}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<EntityId> for Value {
    fn from(v: EntityId) -> Self {
        Self::Ref(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
