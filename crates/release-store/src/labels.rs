//! Label filters and their translation into backend predicates
//!
//! Callers query by a fixed set of indexed fields (`NAME`, `VERSION`,
//! `STATUS`, `OWNER`, `CREATED_AT`, `MODIFIED_AT`). The translator turns a
//! [`LabelFilter`] into `column = $param` clauses joined with `AND`; values
//! are only ever carried as bound parameters.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::record::ReleaseRecord;
use crate::release::Status;

/// Logical label fields usable in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LabelField {
    Name,
    Version,
    Status,
    Owner,
    CreatedAt,
    ModifiedAt,
}

impl LabelField {
    pub const ALL: [LabelField; 6] = [
        LabelField::Name,
        LabelField::Version,
        LabelField::Status,
        LabelField::Owner,
        LabelField::CreatedAt,
        LabelField::ModifiedAt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelField::Name => "NAME",
            LabelField::Version => "VERSION",
            LabelField::Status => "STATUS",
            LabelField::Owner => "OWNER",
            LabelField::CreatedAt => "CREATED_AT",
            LabelField::ModifiedAt => "MODIFIED_AT",
        }
    }

    /// Look a field up by name, ignoring ASCII case.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(label))
    }

    /// Column used when no mapping is configured; also the field name rows
    /// are read back under.
    pub(crate) fn default_column(&self) -> &'static str {
        match self {
            LabelField::Name => "name",
            LabelField::Version => "version",
            LabelField::Status => "status",
            LabelField::Owner => "owner",
            LabelField::CreatedAt => "created_at",
            LabelField::ModifiedAt => "modified_at",
        }
    }

    /// Type a raw filter value for this field.
    pub fn value(&self, raw: &str) -> StoreResult<LabelValue> {
        match self {
            LabelField::Name | LabelField::Owner => Ok(LabelValue::Text(raw.to_string())),
            // Status codes are matched in their stored spelling.
            LabelField::Status => raw
                .parse::<Status>()
                .map(|status| LabelValue::Text(status.as_str().to_string()))
                .map_err(|_| StoreError::InvalidLabel {
                    field: self.as_str().to_string(),
                    value: raw.to_string(),
                }),
            LabelField::Version | LabelField::CreatedAt | LabelField::ModifiedAt => raw
                .trim()
                .parse::<i64>()
                .map(LabelValue::Int)
                .map_err(|_| StoreError::InvalidLabel {
                    field: self.as_str().to_string(),
                    value: raw.to_string(),
                }),
        }
    }

    /// The value this field holds on a stored row.
    pub fn value_of(&self, record: &ReleaseRecord) -> Option<LabelValue> {
        match self {
            LabelField::Name => Some(LabelValue::Text(record.name.clone())),
            LabelField::Version => Some(LabelValue::Int(i64::from(record.version))),
            LabelField::Status => Some(LabelValue::Text(record.status.clone())),
            LabelField::Owner => Some(LabelValue::Text(record.owner.clone())),
            LabelField::CreatedAt => Some(LabelValue::Int(record.created_at)),
            LabelField::ModifiedAt => record.modified_at.map(LabelValue::Int),
        }
    }
}

impl fmt::Display for LabelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed label value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelValue {
    Text(String),
    Int(i64),
}

impl LabelValue {
    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            LabelValue::Text(s) => serde_json::Value::String(s.clone()),
            LabelValue::Int(n) => serde_json::Value::from(*n),
        }
    }
}

/// What to do with filter names outside the fixed field set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownLabels {
    /// Drop them and query on the recognised fields only
    #[default]
    Ignore,
    /// Fail the query with [`StoreError::UnknownLabel`]
    Reject,
}

impl FromStr for UnknownLabels {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(UnknownLabels::Ignore),
            "reject" => Ok(UnknownLabels::Reject),
            other => Err(StoreError::InvalidConfig(format!(
                "unknown-label policy must be `ignore` or `reject`, got {other:?}"
            ))),
        }
    }
}

/// Caller-supplied label filter: field name to expected value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFilter {
    labels: BTreeMap<String, String>,
}

impl LabelFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(label, value);
        self
    }

    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(label.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Raw value supplied for `field`, if any.
    pub fn get(&self, field: LabelField) -> Option<&str> {
        self.labels
            .iter()
            .find(|(label, _)| LabelField::from_label(label) == Some(field))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Map every recognised label to its field and typed value.
    pub fn resolve(&self, unknown: UnknownLabels) -> StoreResult<Vec<(LabelField, LabelValue)>> {
        let mut resolved = Vec::with_capacity(self.labels.len());
        for (label, raw) in &self.labels {
            match LabelField::from_label(label) {
                Some(field) => resolved.push((field, field.value(raw)?)),
                None if unknown == UnknownLabels::Reject => {
                    return Err(StoreError::UnknownLabel {
                        field: label.clone(),
                    })
                }
                None => debug!(label = %label, "ignoring unknown label"),
            }
        }
        Ok(resolved)
    }

    /// Whether a stored row carries every recognised label value.
    pub fn matches(&self, record: &ReleaseRecord, unknown: UnknownLabels) -> StoreResult<bool> {
        Ok(self
            .resolve(unknown)?
            .iter()
            .all(|(field, value)| field.value_of(record).as_ref() == Some(value)))
    }
}

impl fmt::Display for LabelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (label, value) in &self.labels {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{label}={value}")?;
            first = false;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelFilter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            labels: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, String>> for LabelFilter {
    fn from(labels: HashMap<String, String>) -> Self {
        labels.into_iter().collect()
    }
}

impl From<BTreeMap<String, String>> for LabelFilter {
    fn from(labels: BTreeMap<String, String>) -> Self {
        Self { labels }
    }
}

/// Backend column for each label field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelColumns {
    columns: BTreeMap<LabelField, String>,
}

impl Default for LabelColumns {
    fn default() -> Self {
        Self {
            columns: LabelField::ALL
                .into_iter()
                .map(|field| (field, field.default_column().to_string()))
                .collect(),
        }
    }
}

impl LabelColumns {
    /// Point `field` at a different column.
    ///
    /// Column names must be plain identifiers, distinct from the other
    /// fields' columns and from the reserved `id`, `key` and `body` columns.
    pub fn with_column(
        mut self,
        field: LabelField,
        column: impl Into<String>,
    ) -> StoreResult<Self> {
        let column = column.into();
        if !is_identifier(&column) {
            return Err(StoreError::InvalidConfig(format!(
                "column for {field} is not a valid identifier: {column:?}"
            )));
        }
        if RESERVED_COLUMNS.contains(&column.as_str()) {
            return Err(StoreError::InvalidConfig(format!(
                "column for {field} uses reserved name {column:?}"
            )));
        }
        if let Some((other, _)) = self
            .columns
            .iter()
            .find(|(other, existing)| **other != field && **existing == column)
        {
            return Err(StoreError::InvalidConfig(format!(
                "column {column:?} for {field} is already used by {other}"
            )));
        }
        self.columns.insert(field, column);
        Ok(self)
    }

    pub fn column(&self, field: LabelField) -> &str {
        self.columns
            .get(&field)
            .map(String::as_str)
            .unwrap_or_else(|| field.default_column())
    }
}

const RESERVED_COLUMNS: [&str; 3] = ["id", "key", "body"];

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A conjunction of `column = $param` clauses plus the values to bind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<String>,
    bindings: Vec<(String, serde_json::Value)>,
}

impl Predicate {
    /// Add `column = $param` bound to `value`.
    pub fn push_eq(&mut self, column: &str, param: &str, value: serde_json::Value) {
        self.clauses.push(format!("{column} = ${param}"));
        self.bindings.push((param.to_string(), value));
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    pub fn bindings(&self) -> &[(String, serde_json::Value)] {
        &self.bindings
    }

    /// Clauses joined with `AND`; empty when there are none.
    pub fn where_clause(&self) -> String {
        self.clauses.join(" AND ")
    }
}

/// Translates label filters using an explicit column mapping.
#[derive(Debug, Clone, Default)]
pub struct LabelTranslator {
    columns: LabelColumns,
    unknown: UnknownLabels,
}

impl LabelTranslator {
    pub fn new(columns: LabelColumns, unknown: UnknownLabels) -> Self {
        Self { columns, unknown }
    }

    pub fn columns(&self) -> &LabelColumns {
        &self.columns
    }

    pub fn unknown_labels(&self) -> UnknownLabels {
        self.unknown
    }

    /// Build the predicate for `filter`; see [`LabelFilter::resolve`] for value typing.
    pub fn translate(&self, filter: &LabelFilter) -> StoreResult<Predicate> {
        self.translate_into(Predicate::default(), filter)
    }

    /// Append the clauses for `filter` to an existing predicate.
    pub fn translate_into(
        &self,
        mut predicate: Predicate,
        filter: &LabelFilter,
    ) -> StoreResult<Predicate> {
        for (n, (field, value)) in filter.resolve(self.unknown)?.into_iter().enumerate() {
            predicate.push_eq(
                self.columns.column(field),
                &format!("label_{n}"),
                value.to_json(),
            );
        }
        Ok(predicate)
    }
}
