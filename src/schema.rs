//! Table names, per-entity writable fields and the stored JSON shapes.
//! Names and shapes are shared with existing data and must not change.

use crate::sql::{Field, FieldKind, Table};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const USERS: Table = Table {
    name: "app_8b514_users",
    key: "user_id",
    key_type: "text",
};

pub const LANGUAGES: Table = Table {
    name: "app_8b514_languages",
    key: "id",
    key_type: "uuid",
};

pub const WORDS: Table = Table {
    name: "app_8b514_words",
    key: "id",
    key_type: "uuid",
};

pub const TRANSLATIONS: Table = Table {
    name: "app_8b514_translations",
    key: "id",
    key_type: "uuid",
};

pub const USER_REQUIRED: &[&str] = &["user_id", "email", "username"];
pub const LANGUAGE_REQUIRED: &[&str] = &["user_id", "name"];
pub const WORD_REQUIRED: &[&str] = &["language_id", "word", "ipa"];

pub const USER_FIELDS: &[Field] = &[
    Field::new("email", FieldKind::Text),
    Field::new("username", FieldKind::Text),
];

pub const LANGUAGE_FIELDS: &[Field] = &[
    Field::new("name", FieldKind::Text),
    Field::new("phonemes", FieldKind::Json),
    Field::new("alphabet_mappings", FieldKind::Json),
    Field::new("syllables", FieldKind::Text),
    Field::new("rules", FieldKind::Text),
];

pub const WORD_FIELDS: &[Field] = &[
    Field::new("word", FieldKind::Text),
    Field::new("ipa", FieldKind::Text),
    Field::new("pos", FieldKind::TextArray),
    Field::new("is_root", FieldKind::Bool),
    Field::new("embedding", FieldKind::FloatArray),
];

pub const DEFAULT_SYLLABLES: &str = "CV";
pub const DEFAULT_TRANSLATION_LANGUAGE: &str = "en";

/// Phoneme inventory of a language.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Phonemes {
    pub consonants: Vec<String>,
    pub vowels: Vec<String>,
    pub diphthongs: Vec<String>,
}

/// Phoneme to grapheme mappings, one map per phoneme class.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AlphabetMappings {
    pub consonants: Map<String, Value>,
    pub vowels: Map<String, Value>,
    pub diphthongs: Map<String, Value>,
}

impl Phonemes {
    pub fn default_json() -> Value {
        serde_json::to_value(Phonemes::default()).unwrap_or(Value::Null)
    }
}

impl AlphabetMappings {
    pub fn default_json() -> Value {
        serde_json::to_value(AlphabetMappings::default()).unwrap_or(Value::Null)
    }
}
