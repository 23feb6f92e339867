#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use crate::list_options::RECORDS_FIELD_SUFFIX;
use crate::record::RecordKey;

/// Per-record field that signals deletion intent when present.
pub const REMOVE_SIGNAL_FIELD: &str = "remove";

pub const FORM_PAIRS_MAX: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormDecodeError {
    TooManyFields { max: usize },
    MalformedFieldName(String),
    InvalidRecordKey { field: String, key: String },
    NestingTooDeep(String),
}

impl fmt::Display for FormDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyFields { max } => write!(f, "form has more than {max} fields"),
            Self::MalformedFieldName(name) => write!(f, "malformed form field name: {name}"),
            Self::InvalidRecordKey { field, key } => {
                write!(f, "invalid record key '{key}' in form field {field}")
            }
            Self::NestingTooDeep(name) => write!(f, "form field nested too deep: {name}"),
        }
    }
}

impl std::error::Error for FormDecodeError {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmittedRecordFields(BTreeMap<String, String>);

impl SubmittedRecordFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn signals_remove(&self) -> bool {
        self.0.contains_key(REMOVE_SIGNAL_FIELD)
    }

    /// Submitted values excluding the remove signal.
    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter(|(field, _)| field.as_str() != REMOVE_SIGNAL_FIELD)
            .map(|(field, value)| (field.as_str(), value.as_str()))
    }
}

/// Submitted records of one list, iterated in ascending key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmittedRecordList(BTreeMap<RecordKey, SubmittedRecordFields>);

impl SubmittedRecordList {
    pub fn iter(&self) -> impl Iterator<Item = (RecordKey, &SubmittedRecordFields)> {
        self.0.iter().map(|(key, fields)| (*key, fields))
    }

    pub fn keys(&self) -> impl Iterator<Item = RecordKey> + '_ {
        self.0.keys().copied()
    }

    pub fn get(&self, key: RecordKey) -> Option<&SubmittedRecordFields> {
        self.0.get(&key)
    }

    pub fn first_remove_signal(&self) -> Option<RecordKey> {
        self.0
            .iter()
            .find(|(_, fields)| fields.signals_remove())
            .map(|(key, _)| *key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One request's worth of submitted form data.
///
/// Scalars are plain `name=value` fields; record lists are the `{ns}Records[key][field]`
/// groups keyed by their top-level field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmittedData {
    scalars: BTreeMap<String, String>,
    record_lists: BTreeMap<String, SubmittedRecordList>,
}

impl SubmittedData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.scalars.insert(name.into(), value.into());
        self
    }

    pub fn with_record(
        mut self,
        records_field: impl Into<String>,
        key: RecordKey,
        fields: SubmittedRecordFields,
    ) -> Self {
        self.insert_record(records_field, key, fields);
        self
    }

    pub fn insert_record(
        &mut self,
        records_field: impl Into<String>,
        key: RecordKey,
        fields: SubmittedRecordFields,
    ) {
        self.record_lists
            .entry(records_field.into())
            .or_default()
            .0
            .insert(key, fields);
    }

    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.scalars.get(name).map(String::as_str)
    }

    pub fn has_scalar(&self, name: &str) -> bool {
        self.scalars.contains_key(name)
    }

    pub fn records(&self, records_field: &str) -> Option<&SubmittedRecordList> {
        self.record_lists.get(records_field)
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.record_lists.is_empty()
    }

    /// Decodes flat HTML form pairs such as `itemRecords[3][description]=Bolt`.
    ///
    /// `name[key]` registers a record with no fields. Fields of other widgets on the same form
    /// (`address[street]`, `tags[]`) are kept as scalars under their full name. A later
    /// duplicate name overwrites an earlier one.
    pub fn from_form_pairs<I, K, V>(pairs: I) -> Result<Self, FormDecodeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut data = Self::new();
        for (idx, (name, value)) in pairs.into_iter().enumerate() {
            if idx >= FORM_PAIRS_MAX {
                return Err(FormDecodeError::TooManyFields {
                    max: FORM_PAIRS_MAX,
                });
            }
            let name = name.as_ref();
            let value = value.into();
            match parse_field_name(name)? {
                FieldPath::Scalar(base) => {
                    data.scalars.insert(base.to_string(), value);
                }
                FieldPath::Record { base, key } => {
                    let key = parse_key(name, key)?;
                    data.record_lists
                        .entry(base.to_string())
                        .or_default()
                        .0
                        .entry(key)
                        .or_default();
                }
                FieldPath::RecordField { base, key, field } => {
                    let key = parse_key(name, key)?;
                    data.record_lists
                        .entry(base.to_string())
                        .or_default()
                        .0
                        .entry(key)
                        .or_default()
                        .insert(field, value);
                }
            }
        }
        Ok(data)
    }
}

enum FieldPath<'a> {
    Scalar(&'a str),
    Record { base: &'a str, key: &'a str },
    RecordField {
        base: &'a str,
        key: &'a str,
        field: &'a str,
    },
}

/// Only bases ending in `Records` are record lists and parsed strictly; every other name,
/// bracketed or not, is kept whole as an opaque scalar.
fn parse_field_name(name: &str) -> Result<FieldPath<'_>, FormDecodeError> {
    let Some(open) = name.find('[') else {
        return Ok(FieldPath::Scalar(name));
    };
    let base = &name[..open];
    if !base.ends_with(RECORDS_FIELD_SUFFIX) {
        return Ok(FieldPath::Scalar(name));
    }

    let malformed = || FormDecodeError::MalformedFieldName(name.to_string());
    let mut segments = Vec::new();
    let mut rest = &name[open..];
    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return Err(malformed());
        };
        let Some(close) = inner.find(']') else {
            return Err(malformed());
        };
        let segment = &inner[..close];
        if segment.is_empty() || segment.contains('[') {
            return Err(malformed());
        }
        segments.push(segment);
        rest = &inner[close + 1..];
    }

    match segments.as_slice() {
        [key] => Ok(FieldPath::Record { base, key }),
        [key, field] => Ok(FieldPath::RecordField { base, key, field }),
        _ => Err(FormDecodeError::NestingTooDeep(name.to_string())),
    }
}

fn parse_key(name: &str, raw: &str) -> Result<RecordKey, FormDecodeError> {
    RecordKey::parse(raw).ok_or_else(|| FormDecodeError::InvalidRecordKey {
        field: name.to_string(),
        key: raw.to_string(),
    })
}
