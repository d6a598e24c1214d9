//! Row filters shared by every data backend

use serde_json::Value;

use super::Row;

/// Operator for filter expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to
    Eq,

    /// Not equal to
    Neq,

    /// In a list of values
    In,
}

impl FilterOperator {
    /// Convert the operator to its PostgREST representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::In => "in",
        }
    }
}

/// A single `column <op> value(s)` condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    pub values: Vec<String>,
}

impl Filter {
    /// Rows where `column` equals `value`
    pub fn eq<T: ToString>(column: &str, value: T) -> Self {
        Self {
            column: column.to_string(),
            operator: FilterOperator::Eq,
            values: vec![value.to_string()],
        }
    }

    /// Rows where `column` differs from `value`
    pub fn neq<T: ToString>(column: &str, value: T) -> Self {
        Self {
            column: column.to_string(),
            operator: FilterOperator::Neq,
            values: vec![value.to_string()],
        }
    }

    /// Rows where `column` is one of `values`
    pub fn in_list<T: ToString>(column: &str, values: &[T]) -> Self {
        Self {
            column: column.to_string(),
            operator: FilterOperator::In,
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// The `(column, "op.value")` query parameter PostgREST expects
    pub fn to_param(&self) -> (String, String) {
        let value = match self.operator {
            FilterOperator::In => format!("in.({})", self.values.join(",")),
            _ => format!(
                "{}.{}",
                self.operator.as_str(),
                self.values.first().map(String::as_str).unwrap_or_default()
            ),
        };
        (self.column.clone(), value)
    }

    /// Evaluate the filter against a row held in memory
    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.get(&self.column).map(value_text);
        match self.operator {
            FilterOperator::Eq => actual.as_deref() == self.values.first().map(String::as_str),
            FilterOperator::Neq => actual.as_deref() != self.values.first().map(String::as_str),
            FilterOperator::In => actual
                .map(|a| self.values.iter().any(|v| *v == a))
                .unwrap_or(false),
        }
    }
}

/// Textual form of a JSON value, as it would appear in a query string
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
