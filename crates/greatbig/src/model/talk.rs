use super::{same_identity, Entity, FieldDef, FieldReader, FieldValue};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A conference talk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Talk {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub speaker: Option<String>,
}

impl Talk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }
}

impl PartialEq for Talk {
    fn eq(&self, other: &Self) -> bool {
        same_identity(self.id, other.id)
    }
}

impl Entity for Talk {
    const NAME: &'static str = "talk";
    const COLLECTION: &'static str = "talks";
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::text("title", "title"),
        FieldDef::text("text", "text"),
        FieldDef::text("speaker", "speaker"),
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Text(self.title.clone()),
            FieldValue::Text(self.text.clone()),
            FieldValue::Text(self.speaker.clone()),
        ]
    }

    fn from_values(id: i64, fields: &mut FieldReader) -> Result<Self> {
        Ok(Self {
            id: Some(id),
            title: fields.text()?,
            text: fields.text()?,
            speaker: fields.text()?,
        })
    }
}
