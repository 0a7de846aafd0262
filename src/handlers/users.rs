//! Users: get by id, upsert, partial update. No delete path.

use crate::error::AppError;
use crate::extractors::{extract_body, path_params, Method, RequestEnvelope};
use crate::handlers::{bind_field, finish, returned};
use crate::response::{created, ok, ResponseEnvelope};
use crate::schema::{USERS, USER_FIELDS, USER_REQUIRED};
use crate::service::{DataAccess, RequestValidator};
use crate::sql::{self, FieldKind, QueryBuf};
use serde_json::{Map, Value};

pub async fn handle(db: &dyn DataAccess, event: &RequestEnvelope) -> ResponseEnvelope {
    finish("users", dispatch(db, event).await)
}

async fn dispatch(db: &dyn DataAccess, event: &RequestEnvelope) -> Result<ResponseEnvelope, AppError> {
    let user_id = path_params(event).get("userId");
    match event.method {
        Method::Get => get_user(db, RequestValidator::path_id(user_id, "User")?).await,
        Method::Post => create_or_update_user(db, &extract_body(event)?).await,
        Method::Put => {
            let id = RequestValidator::path_id(user_id, "User")?;
            update_user(db, id, &extract_body(event)?).await
        }
        _ => Err(AppError::MethodNotAllowed),
    }
}

pub async fn get_user(db: &dyn DataAccess, user_id: &str) -> Result<ResponseEnvelope, AppError> {
    let q = QueryBuf::new(format!("SELECT * FROM {} WHERE user_id = $1", USERS.qualified())).bind(user_id);
    let row = db
        .fetch_optional(&q)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(ok(row))
}

/// Insert, or overwrite email/username of the existing row with the same `user_id`.
pub async fn create_or_update_user(db: &dyn DataAccess, body: &Map<String, Value>) -> Result<ResponseEnvelope, AppError> {
    RequestValidator::require(body, USER_REQUIRED)?;
    let q = sql::upsert(
        &USERS,
        vec![
            ("user_id", bind_field(body, "user_id", FieldKind::Text)?),
            ("email", bind_field(body, "email", FieldKind::Text)?),
            ("username", bind_field(body, "username", FieldKind::Text)?),
        ],
        &["email", "username"],
    );
    let row = returned(db.fetch_optional(&q).await?)?;
    Ok(created(row))
}

pub async fn update_user(db: &dyn DataAccess, user_id: &str, body: &Map<String, Value>) -> Result<ResponseEnvelope, AppError> {
    let q = sql::update(&USERS, USER_FIELDS, user_id, body)?;
    let row = db
        .fetch_optional(&q)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(ok(row))
}
