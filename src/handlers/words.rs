//! Words and their translations.
//!
//! Lists aggregate translations in the database (`json_agg`, oldest first, `[]` when none);
//! single reads fetch them with a second statement. Writes that carry a `translations`
//! list insert them after the word (create) or replace the existing set (update).
//! Every statement commits on its own, so a failed translation insert leaves the word in place.

use crate::error::AppError;
use crate::extractors::{extract_body, path_params, query_params, Method, RequestEnvelope};
use crate::handlers::{bind_field, finish, owner_param, returned};
use crate::response::{created, ok, ResponseEnvelope};
use crate::schema::{DEFAULT_TRANSLATION_LANGUAGE, LANGUAGES, TRANSLATIONS, WORDS, WORD_FIELDS, WORD_REQUIRED};
use crate::service::{DataAccess, RequestValidator};
use crate::sql::{self, FieldKind, QueryBuf, SqlValue};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

pub async fn handle(db: &dyn DataAccess, event: &RequestEnvelope) -> ResponseEnvelope {
    finish("words", dispatch(db, event).await)
}

async fn dispatch(db: &dyn DataAccess, event: &RequestEnvelope) -> Result<ResponseEnvelope, AppError> {
    let path = path_params(event);
    let query = query_params(event);
    let owner = owner_param(query, "userId");
    match event.method {
        Method::Get => {
            if event.resource.contains("/languages/{languageId}/words") {
                let language_id = RequestValidator::path_id(path.get("languageId"), "Language")?;
                let language_id = RequestValidator::uuid(language_id, "languageId")?;
                list_language_words(db, language_id, owner).await
            } else if event.resource.contains("{wordId}") {
                let id = word_id(path)?;
                get_word(db, id, owner).await
            } else {
                let language_id = owner_param(query, "languageId")
                    .map(|id| RequestValidator::uuid(id, "languageId"))
                    .transpose()?;
                list_words(db, language_id, owner).await
            }
        }
        Method::Post => create_word(db, &extract_body(event)?).await,
        Method::Put => {
            let id = word_id(path)?;
            update_word(db, id, &extract_body(event)?).await
        }
        Method::Delete => {
            let id = word_id(path)?;
            delete_word(db, id, owner).await
        }
        Method::Other(_) => Err(AppError::MethodNotAllowed),
    }
}

fn word_id(path: &HashMap<String, String>) -> Result<&str, AppError> {
    RequestValidator::uuid(RequestValidator::path_id(path.get("wordId"), "Word")?, "wordId")
}

enum WordFilter<'a> {
    All,
    Language(&'a str),
    Owner(&'a str),
}

/// Words newest first. The aggregated translations are keyed by the translations table name,
/// which list clients read; a single-word read uses `translations` instead.
fn list_query(filter: WordFilter<'_>) -> QueryBuf {
    let (clause, param) = match filter {
        WordFilter::All => (String::new(), None),
        WordFilter::Language(id) => ("WHERE w.language_id = $1::uuid ".to_string(), Some(id)),
        WordFilter::Owner(uid) => (
            format!(
                "WHERE w.language_id IN (SELECT id FROM {} WHERE user_id = $1) ",
                LANGUAGES.qualified()
            ),
            Some(uid),
        ),
    };
    let sql = format!(
        "SELECT w.*, \
         COALESCE(json_agg(json_build_object(\
         'id', t.id, 'language_code', t.language_code, 'meaning', t.meaning, 'created_at', t.created_at\
         ) ORDER BY t.created_at) FILTER (WHERE t.id IS NOT NULL), '[]'::json) AS {} \
         FROM {} w LEFT JOIN {} t ON w.id = t.word_id \
         {}GROUP BY w.id ORDER BY w.created_at DESC",
        TRANSLATIONS.name,
        WORDS.qualified(),
        TRANSLATIONS.qualified(),
        clause
    );
    let q = QueryBuf::new(sql);
    match param {
        Some(p) => q.bind(p),
        None => q,
    }
}

/// 404 unless `user_id` owns the language. Missing and foreign languages are indistinguishable.
async fn verify_language_owner(db: &dyn DataAccess, language_id: &str, user_id: &str) -> Result<(), AppError> {
    let q = QueryBuf::new(format!(
        "SELECT id FROM {} WHERE id = $1::uuid AND user_id = $2",
        LANGUAGES.qualified()
    ))
    .bind(language_id)
    .bind(user_id);
    match db.fetch_optional(&q).await? {
        Some(_) => Ok(()),
        None => Err(AppError::not_found("Language not found or access denied")),
    }
}

pub async fn list_words(
    db: &dyn DataAccess,
    language_id: Option<&str>,
    user_id: Option<&str>,
) -> Result<ResponseEnvelope, AppError> {
    let filter = match (language_id, user_id) {
        (Some(lid), Some(uid)) => {
            verify_language_owner(db, lid, uid).await?;
            WordFilter::Language(lid)
        }
        (Some(lid), None) => WordFilter::Language(lid),
        (None, Some(uid)) => WordFilter::Owner(uid),
        (None, None) => WordFilter::All,
    };
    Ok(ok(Value::Array(db.fetch_all(&list_query(filter)).await?)))
}

pub async fn list_language_words(
    db: &dyn DataAccess,
    language_id: &str,
    user_id: Option<&str>,
) -> Result<ResponseEnvelope, AppError> {
    if let Some(uid) = user_id {
        verify_language_owner(db, language_id, uid).await?;
    }
    Ok(ok(Value::Array(db.fetch_all(&list_query(WordFilter::Language(language_id))).await?)))
}

pub async fn get_word(db: &dyn DataAccess, id: &str, user_id: Option<&str>) -> Result<ResponseEnvelope, AppError> {
    let q = match user_id {
        Some(uid) => QueryBuf::new(format!(
            "SELECT w.* FROM {} w JOIN {} l ON w.language_id = l.id WHERE w.id = $1::uuid AND l.user_id = $2",
            WORDS.qualified(),
            LANGUAGES.qualified()
        ))
        .bind(id)
        .bind(uid),
        None => QueryBuf::new(format!("SELECT * FROM {} WHERE id = $1::uuid", WORDS.qualified())).bind(id),
    };
    let mut word = db
        .fetch_optional(&q)
        .await?
        .ok_or_else(|| AppError::not_found("Word not found"))?;

    let tq = QueryBuf::new(format!(
        "SELECT * FROM {} WHERE word_id = $1::uuid ORDER BY created_at",
        TRANSLATIONS.qualified()
    ))
    .bind(id);
    let translations = db.fetch_all(&tq).await?;
    if let Value::Object(ref mut m) = word {
        m.insert("translations".into(), Value::Array(translations));
    }
    Ok(ok(word))
}

#[derive(Debug, PartialEq)]
struct NewTranslation {
    language_code: String,
    meaning: String,
}

/// Entries without a non-empty `meaning` are dropped; `language_code` defaults to `en`.
fn parse_translations(v: &Value) -> Result<Vec<NewTranslation>, AppError> {
    let invalid = || AppError::InvalidField {
        field: "translations",
        expected: "array of objects",
    };
    let items = v.as_array().ok_or_else(invalid)?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let obj = item.as_object().ok_or_else(invalid)?;
        let Some(meaning) = obj.get("meaning").and_then(Value::as_str).filter(|m| !m.is_empty()) else {
            continue;
        };
        let language_code = obj
            .get("language_code")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_TRANSLATION_LANGUAGE);
        out.push(NewTranslation {
            language_code: language_code.to_string(),
            meaning: meaning.to_string(),
        });
    }
    Ok(out)
}

async fn insert_translations(db: &dyn DataAccess, word_id: &Value, items: &[NewTranslation]) -> Result<(), AppError> {
    let word_id = sql::Field::new("word_id", FieldKind::Uuid).bind(word_id)?;
    for t in items {
        let q = sql::insert(
            &TRANSLATIONS,
            vec![
                ("word_id", word_id.clone()),
                ("language_code", SqlValue::text(t.language_code.as_str())),
                ("meaning", SqlValue::text(t.meaning.as_str())),
            ],
        );
        db.execute(&q).await?;
    }
    Ok(())
}

pub async fn create_word(db: &dyn DataAccess, body: &Map<String, Value>) -> Result<ResponseEnvelope, AppError> {
    RequestValidator::require(body, WORD_REQUIRED)?;
    let language_id = bind_field(body, "language_id", FieldKind::Uuid)?;
    let translations = match body.get("translations") {
        Some(v) => parse_translations(v)?,
        None => Vec::new(),
    };

    if body.contains_key("user_id") {
        let lid = body.get("language_id").and_then(Value::as_str).unwrap_or_default();
        let uid = body.get("user_id").and_then(Value::as_str).unwrap_or_default();
        verify_language_owner(db, lid, uid).await?;
    }

    let pos = match body.get("pos") {
        Some(_) => bind_field(body, "pos", FieldKind::TextArray)?,
        None => SqlValue::TextArray(Some(Vec::new())),
    };
    let is_root = match body.get("is_root") {
        Some(_) => bind_field(body, "is_root", FieldKind::Bool)?,
        None => SqlValue::Bool(Some(false)),
    };
    let q = sql::insert(
        &WORDS,
        vec![
            ("language_id", language_id),
            ("word", bind_field(body, "word", FieldKind::Text)?),
            ("ipa", bind_field(body, "ipa", FieldKind::Text)?),
            ("pos", pos),
            ("is_root", is_root),
            ("embedding", bind_field(body, "embedding", FieldKind::FloatArray)?),
        ],
    );
    let row = returned(db.fetch_optional(&q).await?)?;

    if !translations.is_empty() {
        insert_translations(db, row.get("id").unwrap_or(&Value::Null), &translations).await?;
    }
    Ok(created(row))
}

/// Partial update. A `translations` list replaces the word's translations wholesale.
pub async fn update_word(db: &dyn DataAccess, id: &str, body: &Map<String, Value>) -> Result<ResponseEnvelope, AppError> {
    if body.contains_key("user_id") {
        let uid = body.get("user_id").and_then(Value::as_str).unwrap_or_default();
        let verify = QueryBuf::new(format!(
            "SELECT w.id FROM {} w JOIN {} l ON w.language_id = l.id WHERE w.id = $1::uuid AND l.user_id = $2",
            WORDS.qualified(),
            LANGUAGES.qualified()
        ))
        .bind(id)
        .bind(uid);
        if db.fetch_optional(&verify).await?.is_none() {
            return Err(AppError::not_found("Word not found or access denied"));
        }
    }

    let q = sql::update(&WORDS, WORD_FIELDS, id, body)?;
    let replacement = match body.get("translations") {
        Some(v) => Some(parse_translations(v)?),
        None => None,
    };

    let row = db
        .fetch_optional(&q)
        .await?
        .ok_or_else(|| AppError::not_found("Word not found"))?;

    if let Some(items) = replacement {
        let clear = QueryBuf::new(format!(
            "DELETE FROM {} WHERE word_id = $1::uuid",
            TRANSLATIONS.qualified()
        ))
        .bind(id);
        let removed = db.execute(&clear).await?;
        tracing::debug!(word_id = %id, removed, added = items.len(), "replacing translations");
        insert_translations(db, row.get("id").unwrap_or(&Value::Null), &items).await?;
    }
    Ok(ok(row))
}

pub async fn delete_word(db: &dyn DataAccess, id: &str, user_id: Option<&str>) -> Result<ResponseEnvelope, AppError> {
    let q = match user_id {
        Some(uid) => QueryBuf::new(format!(
            "DELETE FROM {} WHERE id = $1::uuid AND language_id IN (SELECT id FROM {} WHERE user_id = $2) RETURNING id",
            WORDS.qualified(),
            LANGUAGES.qualified()
        ))
        .bind(id)
        .bind(uid),
        None => QueryBuf::new(format!("DELETE FROM {} WHERE id = $1::uuid RETURNING id", WORDS.qualified())).bind(id),
    };
    let row = db
        .fetch_optional(&q)
        .await?
        .ok_or_else(|| AppError::not_found("Word not found or access denied"))?;
    Ok(ok(json!({
        "message": "Word deleted successfully",
        "id": row.get("id").cloned().unwrap_or(Value::Null),
    })))
}
