//! Filter conditions and their query-string form.

use std::fmt;

use crate::coercion::token;
use crate::error::{Error, RequestBuildError, Result};
use crate::schema::TypeDescriptor;
use crate::value::Value;

/// Comparison operators understood by PostgREST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    ILike,
    Is,
    In,
    /// Contains (`@>`), for arrays, ranges and json
    Contains,
    /// Contained in (`<@`)
    ContainedIn,
    /// Overlap (`&&`)
    Overlap,
    StrictlyLeft,
    StrictlyRight,
    NotRightOf,
    NotLeftOf,
    Adjacent,
    FullText,
    PlainFullText,
    PhraseFullText,
    WebFullText,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "eq",
            Operator::NotEqual => "neq",
            Operator::GreaterThan => "gt",
            Operator::GreaterThanOrEqual => "gte",
            Operator::LessThan => "lt",
            Operator::LessThanOrEqual => "lte",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::Is => "is",
            Operator::In => "in",
            Operator::Contains => "cs",
            Operator::ContainedIn => "cd",
            Operator::Overlap => "ov",
            Operator::StrictlyLeft => "sl",
            Operator::StrictlyRight => "sr",
            Operator::NotRightOf => "nxr",
            Operator::NotLeftOf => "nxl",
            Operator::Adjacent => "adj",
            Operator::FullText => "fts",
            Operator::PlainFullText => "plfts",
            Operator::PhraseFullText => "phfts",
            Operator::WebFullText => "wfts",
        }
    }

    fn is_full_text(&self) -> bool {
        matches!(
            self,
            Operator::FullText
                | Operator::PlainFullText
                | Operator::PhraseFullText
                | Operator::WebFullText
        )
    }

    fn is_range_only(&self) -> bool {
        matches!(
            self,
            Operator::StrictlyLeft
                | Operator::StrictlyRight
                | Operator::NotRightOf
                | Operator::NotLeftOf
                | Operator::Adjacent
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filter condition, or a logical group of them.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Condition {
        /// Column, or a dotted path through reference edges (`profile.email`)
        path: String,
        operator: Operator,
        value: Value,
        /// Text search configuration for the full-text operators
        config: Option<String>,
    },
    Not(Box<Filter>),
    Or(Vec<Filter>),
    And(Vec<Filter>),
}

impl Filter {
    pub fn new(path: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Filter::Condition {
            path: path.into(),
            operator,
            value: value.into(),
            config: None,
        }
    }

    /// Full-text condition with an explicit search configuration (`english`).
    pub fn full_text(
        path: impl Into<String>,
        operator: Operator,
        query: impl Into<String>,
        config: impl Into<String>,
    ) -> Self {
        Filter::Condition {
            path: path.into(),
            operator,
            value: Value::Text(query.into()),
            config: Some(config.into()),
        }
    }

    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    /// Check edge segments of every path and every operand.
    pub(crate) fn validate(&self, descriptor: &TypeDescriptor) -> Result<()> {
        match self {
            Filter::Condition {
                path,
                operator,
                value,
                ..
            } => {
                validate_path(descriptor, path)?;
                validate_operand(path, *operator, value)
                    .map_err(|reason| RequestBuildError::InvalidOperand {
                        path: path.clone(),
                        operator: operator.to_string(),
                        reason: reason.to_string(),
                    })
                    .map_err(Error::from)
            }
            Filter::Not(inner) => inner.validate(descriptor),
            Filter::Or(filters) | Filter::And(filters) => {
                if filters.is_empty() {
                    return Err(RequestBuildError::InvalidOperand {
                        path: String::new(),
                        operator: self.group_name().to_string(),
                        reason: "empty group".to_string(),
                    }
                    .into());
                }
                filters.iter().try_for_each(|f| f.validate(descriptor))
            }
        }
    }

    /// Top-level query pair: `age=gt.30`, `not.or=(..)`, `or=(..)`.
    pub(crate) fn to_query_pair(&self) -> Result<(String, String)> {
        match self {
            Filter::Condition { path, .. } => Ok((path.clone(), self.condition_token()?)),
            Filter::Not(inner) => match inner.as_ref() {
                Filter::Not(twice) => twice.to_query_pair(),
                Filter::Condition { path, .. } => {
                    Ok((path.clone(), format!("not.{}", inner.condition_token()?)))
                }
                group => {
                    let (key, value) = group.to_query_pair()?;
                    Ok((format!("not.{key}"), value))
                }
            },
            Filter::Or(filters) | Filter::And(filters) => Ok((
                self.group_name().to_string(),
                format!("({})", nested(filters)?),
            )),
        }
    }

    /// Form used inside a logical group: `age.gt.30`, `not.and(..)`.
    fn expression(&self) -> Result<String> {
        match self {
            Filter::Condition { path, .. } => Ok(format!("{path}.{}", self.nested_condition_token()?)),
            Filter::Not(inner) => match inner.as_ref() {
                Filter::Not(twice) => twice.expression(),
                Filter::Condition { path, .. } => {
                    Ok(format!("{path}.not.{}", inner.nested_condition_token()?))
                }
                group => Ok(format!("not.{}", group.expression()?)),
            },
            Filter::Or(filters) | Filter::And(filters) => {
                Ok(format!("{}({})", self.group_name(), nested(filters)?))
            }
        }
    }

    fn group_name(&self) -> &'static str {
        match self {
            Filter::And(_) => "and",
            _ => "or",
        }
    }

    fn condition_token(&self) -> Result<String> {
        self.render_condition(false)
    }

    fn nested_condition_token(&self) -> Result<String> {
        self.render_condition(true)
    }

    fn render_condition(&self, nested: bool) -> Result<String> {
        let Filter::Condition {
            path,
            operator,
            value,
            config,
        } = self
        else {
            return Ok(String::new());
        };

        let operand = match operator {
            Operator::In => token::list(value),
            Operator::Is => Ok(match value {
                Value::Bool(b) => b.to_string(),
                _ => "null".to_string(),
            }),
            op if op.is_full_text() => Ok(match value {
                Value::Text(text) => text.clone(),
                other => token::scalar(other)?,
            }),
            _ => token::scalar(value),
        }
        .map_err(|source| RequestBuildError::Operand {
            path: path.clone(),
            source,
        })?;

        // inside a group, commas and parentheses would split the expression
        let operand = if nested && !matches!(operator, Operator::In | Operator::Is) {
            token::quote_item(&operand)
        } else {
            operand
        };

        Ok(match config {
            Some(config) if operator.is_full_text() => format!("{operator}({config}).{operand}"),
            _ => format!("{operator}.{operand}"),
        })
    }
}

fn nested(filters: &[Filter]) -> Result<String> {
    Ok(filters
        .iter()
        .map(Filter::expression)
        .collect::<Result<Vec<_>>>()?
        .join(","))
}

/// Every segment before the last must be a reference edge.
fn validate_path(descriptor: &TypeDescriptor, path: &str) -> Result<()> {
    let mut segments: Vec<&str> = path.split('.').collect();
    segments.pop();

    let mut current = None;
    for segment in segments {
        let owner = current.as_deref().unwrap_or(descriptor);
        let Some(reference) = owner.reference(segment) else {
            return Err(RequestBuildError::UnknownEdge {
                table: owner.table().to_string(),
                edge: segment.to_string(),
            }
            .into());
        };
        current = Some(reference.target()?);
    }
    Ok(())
}

fn validate_operand(path: &str, operator: Operator, value: &Value) -> std::result::Result<(), &'static str> {
    if path.is_empty() {
        return Err("empty column path");
    }
    match operator {
        Operator::In if !matches!(value, Value::Array(_)) => Err("expected a list"),
        Operator::Is if !matches!(value, Value::Null | Value::Bool(_)) => {
            Err("expected null, true or false")
        }
        Operator::Like | Operator::ILike if !matches!(value, Value::Text(_)) => {
            Err("expected a text pattern")
        }
        op if op.is_full_text() && !matches!(value, Value::Text(_)) => Err("expected a text query"),
        Operator::Contains | Operator::ContainedIn
            if !matches!(value, Value::Array(_) | Value::Range(_) | Value::Json(_)) =>
        {
            Err("expected an array, a range or json")
        }
        Operator::Overlap if !matches!(value, Value::Array(_) | Value::Range(_)) => {
            Err("expected an array or a range")
        }
        op if op.is_range_only() && !matches!(value, Value::Range(_)) => Err("expected a range"),
        _ => Ok(()),
    }
}
