use super::{same_identity, Entity, FieldDef, FieldReader, FieldValue};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A sticky note placed on a board
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    pub id: Option<i64>,
    pub text: Option<String>,
    pub colour: Option<String>,
    pub left: Option<i32>,
    pub top: Option<i32>,
}

impl Note {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_colour(mut self, colour: impl Into<String>) -> Self {
        self.colour = Some(colour.into());
        self
    }

    pub fn with_left(mut self, left: i32) -> Self {
        self.left = Some(left);
        self
    }

    pub fn with_top(mut self, top: i32) -> Self {
        self.top = Some(top);
        self
    }
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        same_identity(self.id, other.id)
    }
}

impl Entity for Note {
    const NAME: &'static str = "note";
    const COLLECTION: &'static str = "notes";
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::text("text", "text"),
        FieldDef::text("colour", "colour"),
        FieldDef::integer("left", "left_pos"),
        FieldDef::integer("top", "top_pos"),
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Text(self.text.clone()),
            FieldValue::Text(self.colour.clone()),
            FieldValue::Integer(self.left),
            FieldValue::Integer(self.top),
        ]
    }

    fn from_values(id: i64, fields: &mut FieldReader) -> Result<Self> {
        Ok(Self {
            id: Some(id),
            text: fields.text()?,
            colour: fields.text()?,
            left: fields.integer()?,
            top: fields.integer()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_id_only() {
        let mut a = Note::new().with_text("a");
        let mut b = Note::new().with_text("b");
        assert_ne!(a, b);
        assert_ne!(a, a.clone());

        a.id = Some(7);
        b.id = Some(7);
        assert_eq!(a, b);

        b.id = Some(8);
        assert_ne!(a, b);
    }

    #[test]
    fn values_round_trip_through_reader() {
        let note = Note::new()
            .with_text("buy milk")
            .with_colour("yellow")
            .with_left(10)
            .with_top(-4);

        let mut reader = FieldReader::new(note.values());
        let rebuilt = Note::from_values(3, &mut reader).unwrap();

        assert_eq!(rebuilt.id, Some(3));
        assert_eq!(rebuilt.text.as_deref(), Some("buy milk"));
        assert_eq!(rebuilt.colour.as_deref(), Some("yellow"));
        assert_eq!(rebuilt.left, Some(10));
        assert_eq!(rebuilt.top, Some(-4));
    }

    #[test]
    fn deserializes_partial_body() {
        let note: Note = serde_json::from_str(r#"{"text":"hi","left":5}"#).unwrap();
        assert_eq!(note.id, None);
        assert_eq!(note.text.as_deref(), Some("hi"));
        assert_eq!(note.left, Some(5));
        assert_eq!(note.colour, None);
    }

    #[test]
    fn serializes_missing_fields_as_null() {
        let json = serde_json::to_value(Note::new().with_text("x")).unwrap();
        assert_eq!(json["text"], "x");
        assert!(json["id"].is_null());
        assert!(json["top"].is_null());
    }

    #[test]
    fn coordinate_columns_avoid_sql_keywords() {
        assert_eq!(Note::field("left").unwrap().column, "left_pos");
        assert_eq!(Note::field("top").unwrap().column, "top_pos");
        assert!(Note::is_sortable("id"));
        assert!(Note::is_sortable("colour"));
        assert!(!Note::is_sortable("left_pos"));
    }
}
