#![forbid(unsafe_code)]

//! Structured filter predicates.
//!
//! A [`Predicate`] is built from comparisons on property paths combined with
//! `and` / `or` / `not`. Comparison paths and literals are checked against
//! each source type's schema when a collection is built, so a typo surfaces
//! as `InvalidPropertyPath` at construction time instead of as an empty list.
//! [`Predicate::func`] is the escape hatch for arbitrary closures and is not
//! validated.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use tether_core::{EntityRef, Error, Result, SemanticType, Value};

use crate::context::{Context, PropertyPath};

/// Comparison operator of a [`Predicate::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Substring match on text.
    Contains,
    /// Case-insensitive substring match on text.
    ContainsIgnoreCase,
    /// Prefix match on text.
    BeginsWith,
}

impl Comparison {
    const fn is_textual(self) -> bool {
        matches!(
            self,
            Self::Contains | Self::ContainsIgnoreCase | Self::BeginsWith
        )
    }

    const fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }
}

/// Filter over entities.
#[derive(Clone)]
pub enum Predicate {
    Compare {
        path: String,
        op: Comparison,
        value: Value,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Func(Rc<dyn Fn(&EntityRef) -> bool>),
}

impl Predicate {
    pub fn compare(path: impl Into<String>, op: Comparison, value: impl Into<Value>) -> Self {
        Self::Compare {
            path: path.into(),
            op,
            value: value.into(),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, Comparison::Eq, value)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn ne(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, Comparison::Ne, value)
    }

    pub fn lt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, Comparison::Lt, value)
    }

    pub fn le(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, Comparison::Le, value)
    }

    pub fn gt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, Comparison::Gt, value)
    }

    pub fn ge(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(path, Comparison::Ge, value)
    }

    pub fn contains(path: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::compare(path, Comparison::Contains, needle.into())
    }

    pub fn contains_ignore_case(path: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::compare(path, Comparison::ContainsIgnoreCase, needle.into())
    }

    pub fn begins_with(path: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::compare(path, Comparison::BeginsWith, prefix.into())
    }

    /// Conjunction; an empty list matches everything.
    #[must_use]
    pub fn all(predicates: Vec<Predicate>) -> Self {
        Self::And(predicates)
    }

    /// Disjunction; an empty list matches nothing.
    #[must_use]
    pub fn any(predicates: Vec<Predicate>) -> Self {
        Self::Or(predicates)
    }

    #[must_use]
    pub fn negate(predicate: Predicate) -> Self {
        Self::Not(Box::new(predicate))
    }

    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Self::And(mut list) => {
                list.push(other);
                Self::And(list)
            }
            first => Self::And(vec![first, other]),
        }
    }

    #[must_use]
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Self::Or(mut list) => {
                list.push(other);
                Self::Or(list)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// Unvalidated closure predicate.
    pub fn func(f: impl Fn(&EntityRef) -> bool + 'static) -> Self {
        Self::Func(Rc::new(f))
    }

    /// Validate against `entity_type` and coerce literals to the types of the
    /// properties they are compared with.
    pub(crate) fn compile(&self, context: &Context, entity_type: &str) -> Result<CompiledPredicate> {
        Ok(match self {
            Self::Compare { path, op, value } => {
                let path = context.validate_path(entity_type, path)?;
                let value = compile_literal(&path, *op, value.clone())?;
                CompiledPredicate::Compare {
                    path,
                    op: *op,
                    value,
                }
            }
            Self::And(list) => CompiledPredicate::And(
                list.iter()
                    .map(|p| p.compile(context, entity_type))
                    .collect::<Result<_>>()?,
            ),
            Self::Or(list) => CompiledPredicate::Or(
                list.iter()
                    .map(|p| p.compile(context, entity_type))
                    .collect::<Result<_>>()?,
            ),
            Self::Not(inner) => {
                CompiledPredicate::Not(Box::new(inner.compile(context, entity_type)?))
            }
            Self::Func(f) => CompiledPredicate::Func(Rc::clone(f)),
        })
    }
}

fn compile_literal(path: &PropertyPath, op: Comparison, value: Value) -> Result<Value> {
    if op.is_textual() {
        if *path.leaf_type() != SemanticType::Text {
            return Err(Error::TypeMismatch {
                expected: path.leaf_type().clone(),
                found: value,
            });
        }
        return value.coerce(&SemanticType::Text);
    }
    if value.is_null() {
        return Ok(value);
    }
    value.coerce(path.leaf_type())
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { path, op, value } => {
                write!(f, "{path} {op:?} {value:?}")
            }
            Self::And(list) => f.debug_tuple("And").field(list).finish(),
            Self::Or(list) => f.debug_tuple("Or").field(list).finish(),
            Self::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Self::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// A predicate checked against one source type.
#[derive(Clone)]
pub(crate) enum CompiledPredicate {
    Compare {
        path: PropertyPath,
        op: Comparison,
        value: Value,
    },
    And(Vec<CompiledPredicate>),
    Or(Vec<CompiledPredicate>),
    Not(Box<CompiledPredicate>),
    Func(Rc<dyn Fn(&EntityRef) -> bool>),
}

impl CompiledPredicate {
    pub(crate) fn evaluate(&self, context: &Context, entity: &EntityRef) -> Result<bool> {
        match self {
            Self::Compare { path, op, value } => {
                let actual = context.resolve_path(entity, path)?;
                Ok(compare(&actual, *op, value))
            }
            Self::And(list) => {
                for p in list {
                    if !p.evaluate(context, entity)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Or(list) => {
                for p in list {
                    if p.evaluate(context, entity)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not(inner) => Ok(!inner.evaluate(context, entity)?),
            Self::Func(f) => Ok(f(entity)),
        }
    }

    /// Every validated path, for dependency tracking.
    pub(crate) fn paths<'a>(&'a self, out: &mut Vec<&'a PropertyPath>) {
        match self {
            Self::Compare { path, .. } => out.push(path),
            Self::And(list) | Self::Or(list) => {
                for p in list {
                    p.paths(out);
                }
            }
            Self::Not(inner) => inner.paths(out),
            Self::Func(_) => {}
        }
    }
}

fn compare(actual: &Value, op: Comparison, expected: &Value) -> bool {
    if op.is_ordering() && (actual.is_null() || expected.is_null()) {
        return false;
    }
    let text = || actual.as_text().zip(expected.as_text());
    match op {
        Comparison::Eq => actual.total_cmp(expected) == Ordering::Equal,
        Comparison::Ne => actual.total_cmp(expected) != Ordering::Equal,
        Comparison::Lt => actual.total_cmp(expected) == Ordering::Less,
        Comparison::Le => actual.total_cmp(expected) != Ordering::Greater,
        Comparison::Gt => actual.total_cmp(expected) == Ordering::Greater,
        Comparison::Ge => actual.total_cmp(expected) != Ordering::Less,
        Comparison::Contains => text().is_some_and(|(a, e)| a.contains(e)),
        Comparison::ContainsIgnoreCase => text().is_some_and(|(a, e)| {
            a.to_lowercase().contains(&e.to_lowercase())
        }),
        Comparison::BeginsWith => text().is_some_and(|(a, e)| a.starts_with(e)),
    }
}
