pub mod note;
pub mod talk;

pub use note::Note;
pub use talk::Talk;

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Storage type of a scalar entity field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
}

/// Static description of one scalar field
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Name used in JSON bodies, sort parameters and search documents
    pub name: &'static str,
    /// Relational column name
    pub column: &'static str,
    pub kind: FieldKind,
}

impl FieldDef {
    pub const fn text(name: &'static str, column: &'static str) -> Self {
        Self {
            name,
            column,
            kind: FieldKind::Text,
        }
    }

    pub const fn integer(name: &'static str, column: &'static str) -> Self {
        Self {
            name,
            column,
            kind: FieldKind::Integer,
        }
    }
}

/// Value of one scalar field, in the order given by [`Entity::FIELDS`]
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum FieldValue {
    Text(Option<String>),
    Integer(Option<i32>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Integer(_) => FieldKind::Integer,
        }
    }

    /// Textual form used for full-text matching, `None` for null values
    pub fn as_search_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(value) => value.as_ref().map(|s| s.to_lowercase()),
            FieldValue::Integer(value) => value.map(|v| v.to_string()),
        }
    }
}

/// Sequential reader over decoded field values.
///
/// Entities rebuild themselves from storage by reading their fields back in
/// declaration order.
pub struct FieldReader {
    values: std::vec::IntoIter<FieldValue>,
}

impl FieldReader {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }

    pub fn text(&mut self) -> Result<Option<String>> {
        match self.values.next() {
            Some(FieldValue::Text(value)) => Ok(value),
            Some(other) => Err(anyhow!("Expected text field, found {:?}", other.kind())),
            None => Err(anyhow!("Missing text field")),
        }
    }

    pub fn integer(&mut self) -> Result<Option<i32>> {
        match self.values.next() {
            Some(FieldValue::Integer(value)) => Ok(value),
            Some(other) => Err(anyhow!("Expected integer field, found {:?}", other.kind())),
            None => Err(anyhow!("Missing integer field")),
        }
    }
}

/// A persisted record with a store-assigned numeric identifier.
///
/// Both repositories and the REST layer are generic over this trait, so a new
/// entity only has to describe its fields.
pub trait Entity:
    Clone + Debug + Default + Serialize + DeserializeOwned + Send + Sync + Unpin + 'static
{
    /// Lowercase entity name, used for table names and alert headers
    const NAME: &'static str;

    /// Plural path segment under `/api`
    const COLLECTION: &'static str;

    /// Scalar fields, excluding the identifier
    const FIELDS: &'static [FieldDef];

    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: Option<i64>);

    /// Field values in `FIELDS` order
    fn values(&self) -> Vec<FieldValue>;

    /// Rebuild an entity from its id and field values in `FIELDS` order
    fn from_values(id: i64, fields: &mut FieldReader) -> Result<Self>;

    /// Look up a field by its public name
    fn field(name: &str) -> Option<&'static FieldDef> {
        Self::FIELDS.iter().find(|f| f.name == name)
    }

    /// Whether `property` can be used for sorting
    fn is_sortable(property: &str) -> bool {
        property == "id" || Self::field(property).is_some()
    }
}

/// Identity comparison shared by all entities: equal only when both ids are
/// present and the same.
pub fn same_identity(a: Option<i64>, b: Option<i64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}
