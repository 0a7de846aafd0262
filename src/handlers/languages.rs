//! Languages: list (all, by owner), get, create, partial update, delete, with optional ownership checks.

use crate::error::AppError;
use crate::extractors::{extract_body, path_params, query_params, Method, RequestEnvelope};
use crate::handlers::{bind_field, finish, owner_param, returned};
use crate::response::{created, ok, ResponseEnvelope};
use crate::schema::{
    AlphabetMappings, Phonemes, DEFAULT_SYLLABLES, LANGUAGES, LANGUAGE_FIELDS, LANGUAGE_REQUIRED,
};
use crate::service::{DataAccess, RequestValidator};
use crate::sql::{self, FieldKind, QueryBuf, SqlValue};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

pub async fn handle(db: &dyn DataAccess, event: &RequestEnvelope) -> ResponseEnvelope {
    finish("languages", dispatch(db, event).await)
}

async fn dispatch(db: &dyn DataAccess, event: &RequestEnvelope) -> Result<ResponseEnvelope, AppError> {
    let path = path_params(event);
    let query = query_params(event);
    let owner = owner_param(query, "userId");
    match event.method {
        Method::Get => {
            if event.resource.contains("/users/{userId}/languages") {
                let user_id = RequestValidator::path_id(path.get("userId"), "User")?;
                list_languages(db, Some(user_id)).await
            } else if event.resource.contains("{languageId}") {
                let id = language_id(path)?;
                get_language(db, id, owner).await
            } else {
                list_languages(db, owner).await
            }
        }
        Method::Post => create_language(db, &extract_body(event)?).await,
        Method::Put => {
            let id = language_id(path)?;
            update_language(db, id, &extract_body(event)?).await
        }
        Method::Delete => {
            let id = language_id(path)?;
            delete_language(db, id, owner).await
        }
        Method::Other(_) => Err(AppError::MethodNotAllowed),
    }
}

fn language_id(path: &HashMap<String, String>) -> Result<&str, AppError> {
    RequestValidator::uuid(RequestValidator::path_id(path.get("languageId"), "Language")?, "languageId")
}

/// Newest first, optionally restricted to one owner.
pub async fn list_languages(db: &dyn DataAccess, user_id: Option<&str>) -> Result<ResponseEnvelope, AppError> {
    let table = LANGUAGES.qualified();
    let q = match user_id {
        Some(uid) => QueryBuf::new(format!(
            "SELECT * FROM {} WHERE user_id = $1 ORDER BY created_at DESC",
            table
        ))
        .bind(uid),
        None => QueryBuf::new(format!("SELECT * FROM {} ORDER BY created_at DESC", table)),
    };
    Ok(ok(Value::Array(db.fetch_all(&q).await?)))
}

pub async fn get_language(db: &dyn DataAccess, id: &str, user_id: Option<&str>) -> Result<ResponseEnvelope, AppError> {
    let table = LANGUAGES.qualified();
    let q = match user_id {
        Some(uid) => QueryBuf::new(format!("SELECT * FROM {} WHERE id = $1::uuid AND user_id = $2", table))
            .bind(id)
            .bind(uid),
        None => QueryBuf::new(format!("SELECT * FROM {} WHERE id = $1::uuid", table)).bind(id),
    };
    let row = db
        .fetch_optional(&q)
        .await?
        .ok_or_else(|| AppError::not_found("Language not found"))?;
    Ok(ok(row))
}

pub async fn create_language(db: &dyn DataAccess, body: &Map<String, Value>) -> Result<ResponseEnvelope, AppError> {
    RequestValidator::require(body, LANGUAGE_REQUIRED)?;
    let phonemes = body.get("phonemes").cloned().unwrap_or_else(Phonemes::default_json);
    let mappings = body
        .get("alphabet_mappings")
        .cloned()
        .unwrap_or_else(AlphabetMappings::default_json);
    let syllables = match body.get("syllables") {
        Some(_) => bind_field(body, "syllables", FieldKind::Text)?,
        None => SqlValue::text(DEFAULT_SYLLABLES),
    };
    let rules = match body.get("rules") {
        Some(_) => bind_field(body, "rules", FieldKind::Text)?,
        None => SqlValue::text(""),
    };
    let q = sql::insert(
        &LANGUAGES,
        vec![
            ("user_id", bind_field(body, "user_id", FieldKind::Text)?),
            ("name", bind_field(body, "name", FieldKind::Text)?),
            ("phonemes", SqlValue::Json(phonemes)),
            ("alphabet_mappings", SqlValue::Json(mappings)),
            ("syllables", syllables),
            ("rules", rules),
        ],
    );
    let row = returned(db.fetch_optional(&q).await?)?;
    Ok(created(row))
}

/// Partial update. A `user_id` in the body must own the language: absent row is 404, other owner 403.
pub async fn update_language(db: &dyn DataAccess, id: &str, body: &Map<String, Value>) -> Result<ResponseEnvelope, AppError> {
    let q = sql::update(&LANGUAGES, LANGUAGE_FIELDS, id, body)?;

    if let Some(claimed) = body.get("user_id") {
        let verify = QueryBuf::new(format!("SELECT user_id FROM {} WHERE id = $1::uuid", LANGUAGES.qualified())).bind(id);
        let current = db
            .fetch_optional(&verify)
            .await?
            .ok_or_else(|| AppError::not_found("Language not found"))?;
        if current.get("user_id") != Some(claimed) {
            return Err(AppError::Forbidden);
        }
    }

    let row = db
        .fetch_optional(&q)
        .await?
        .ok_or_else(|| AppError::not_found("Language not found"))?;
    Ok(ok(row))
}

pub async fn delete_language(db: &dyn DataAccess, id: &str, user_id: Option<&str>) -> Result<ResponseEnvelope, AppError> {
    let table = LANGUAGES.qualified();
    let q = match user_id {
        Some(uid) => QueryBuf::new(format!(
            "DELETE FROM {} WHERE id = $1::uuid AND user_id = $2 RETURNING id",
            table
        ))
        .bind(id)
        .bind(uid),
        None => QueryBuf::new(format!("DELETE FROM {} WHERE id = $1::uuid RETURNING id", table)).bind(id),
    };
    let row = db
        .fetch_optional(&q)
        .await?
        .ok_or_else(|| AppError::not_found("Language not found or access denied"))?;
    Ok(ok(json!({
        "message": "Language deleted successfully",
        "id": row.get("id").cloned().unwrap_or(Value::Null),
    })))
}
