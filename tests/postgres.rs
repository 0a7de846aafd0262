//! Runs against a real PostgreSQL when `CONLANG_TEST_DATABASE_URL` is set; every test is a no-op otherwise.

use axum::http::StatusCode;
use conlang_backend::migration::{MigrationBackend, PgMigrations, MIGRATIONS};
use conlang_backend::secrets::StaticSecretStore;
use conlang_backend::sql::QueryBuf;
use conlang_backend::{route, DataAccess, Database, RequestEnvelope};
use serde_json::{json, Map, Value};
use sqlx::postgres::PgSslMode;
use std::sync::Arc;
use tokio::sync::OnceCell;

static SCHEMA: OnceCell<()> = OnceCell::const_new();

fn database() -> Option<Database> {
    let raw = std::env::var("CONLANG_TEST_DATABASE_URL").ok()?;
    let url = reqwest::Url::parse(&raw).ok()?;
    let mut secret = Map::new();
    secret.insert("host".into(), json!(url.host_str().unwrap_or("localhost")));
    secret.insert("port".into(), json!(url.port().unwrap_or(5432)));
    secret.insert("dbname".into(), json!(url.path().trim_start_matches('/')));
    secret.insert("username".into(), json!(url.username()));
    secret.insert("password".into(), json!(url.password().unwrap_or_default()));
    Some(
        Database::new(Arc::new(StaticSecretStore(secret)), "test").with_ssl_mode(PgSslMode::Prefer),
    )
}

async fn migrated() -> Option<Database> {
    let db = database()?;
    SCHEMA
        .get_or_init(|| async {
            PgMigrations::new(database().unwrap()).run_pending(MIGRATIONS).await.unwrap();
        })
        .await;
    Some(db)
}

async fn call(db: &Database, event: RequestEnvelope) -> (StatusCode, Value) {
    let resp = route(db, &event).await;
    (resp.status(), resp.json())
}

async fn new_language(db: &Database, user: &str) -> String {
    let (code, lang) = call(
        db,
        RequestEnvelope::new("POST", "/languages").with_body(json!({"user_id": user, "name": "Kalan"})),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED);
    lang["id"].as_str().unwrap().to_string()
}

async fn translations_of(db: &Database, word_id: &str) -> Vec<Value> {
    let q = QueryBuf::new("SELECT meaning FROM app_8b514_translations WHERE word_id = $1::uuid").bind(word_id);
    db.fetch_all(&q).await.unwrap()
}

async fn new_user(db: &Database) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    let (code, _) = call(
        db,
        RequestEnvelope::new("POST", "/users").with_body(json!({
            "user_id": id,
            "email": format!("{}@test.local", id),
            "username": "tester",
        })),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED);
    id
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let Some(_db) = migrated().await else { return };
    let backend = PgMigrations::new(database().unwrap());
    let again = backend.run_pending(MIGRATIONS).await.unwrap();
    assert_eq!(again.applied_count, 0);
    let st = backend.report_status(MIGRATIONS).await.unwrap();
    assert_eq!(st.pending_count, 0);
    assert!(st.applied_count >= MIGRATIONS.len());
}

#[tokio::test]
async fn user_upsert_keeps_one_row() {
    let Some(db) = migrated().await else { return };
    let id = new_user(&db).await;
    let (code, row) = call(
        &db,
        RequestEnvelope::new("POST", "/users").with_body(json!({
            "user_id": id,
            "email": format!("{}@test.local", id),
            "username": "renamed",
        })),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED);
    assert_eq!(row["username"], "renamed");

    let q = QueryBuf::new("SELECT user_id FROM app_8b514_users WHERE user_id = $1").bind(id.as_str());
    assert_eq!(db.fetch_all(&q).await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_a_language_cascades_to_words_and_translations() {
    let Some(db) = migrated().await else { return };
    let user = new_user(&db).await;

    let (code, lang) = call(
        &db,
        RequestEnvelope::new("POST", "/languages").with_body(json!({"user_id": user, "name": "Kalan"})),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED);
    assert_eq!(lang["syllables"], "CV");
    assert_eq!(lang["phonemes"], json!({"consonants": [], "vowels": [], "diphthongs": []}));
    let lang_id = lang["id"].as_str().unwrap().to_string();

    let (code, word) = call(
        &db,
        RequestEnvelope::new("POST", "/words").with_body(json!({
            "language_id": lang_id,
            "word": "kala",
            "ipa": "ˈka.la",
            "pos": ["noun"],
            "translations": [{"meaning": "water"}, {"meaning": ""}],
        })),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED);
    let word_id = word["id"].as_str().unwrap().to_string();

    let (_, listed) = call(
        &db,
        RequestEnvelope::new("GET", "/languages/{languageId}/words").with_path("languageId", &lang_id),
    )
    .await;
    assert_eq!(listed[0]["app_8b514_translations"].as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["app_8b514_translations"][0]["language_code"], "en");

    let (code, _) = call(
        &db,
        RequestEnvelope::new("DELETE", "/languages/{languageId}")
            .with_path("languageId", &lang_id)
            .with_query("userId", "someone-else"),
    )
    .await;
    assert_eq!(code, StatusCode::NOT_FOUND);

    let (code, _) = call(
        &db,
        RequestEnvelope::new("DELETE", "/languages/{languageId}")
            .with_path("languageId", &lang_id)
            .with_query("userId", &user),
    )
    .await;
    assert_eq!(code, StatusCode::OK);

    let (code, _) = call(&db, RequestEnvelope::new("GET", "/words/{wordId}").with_path("wordId", &word_id)).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
    let q = QueryBuf::new("SELECT id FROM app_8b514_translations WHERE word_id = $1::uuid")
        .bind(word_id.as_str());
    assert!(db.fetch_all(&q).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_user_cascades_to_languages_words_and_translations() {
    let Some(db) = migrated().await else { return };
    let user = new_user(&db).await;
    let lang_id = new_language(&db, &user).await;
    let (code, word) = call(
        &db,
        RequestEnvelope::new("POST", "/words").with_body(json!({
            "language_id": lang_id,
            "word": "tesu",
            "translations": [{"meaning": "stone"}],
        })),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED);
    let word_id = word["id"].as_str().unwrap().to_string();
    assert_eq!(translations_of(&db, &word_id).await.len(), 1);

    let q = QueryBuf::new("DELETE FROM app_8b514_users WHERE user_id = $1").bind(user.as_str());
    assert_eq!(db.execute(&q).await.unwrap(), 1);

    let (code, _) = call(
        &db,
        RequestEnvelope::new("GET", "/languages/{languageId}").with_path("languageId", &lang_id),
    )
    .await;
    assert_eq!(code, StatusCode::NOT_FOUND);
    let (code, _) = call(&db, RequestEnvelope::new("GET", "/words/{wordId}").with_path("wordId", &word_id)).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
    assert!(translations_of(&db, &word_id).await.is_empty());
}

#[tokio::test]
async fn word_update_replaces_translations() {
    let Some(db) = migrated().await else { return };
    let user = new_user(&db).await;
    let lang_id = new_language(&db, &user).await;
    let (code, word) = call(
        &db,
        RequestEnvelope::new("POST", "/words").with_body(json!({
            "language_id": lang_id,
            "word": "miro",
            "translations": [{"meaning": "A"}, {"meaning": "B"}],
        })),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED);
    let word_id = word["id"].as_str().unwrap().to_string();
    assert_eq!(translations_of(&db, &word_id).await.len(), 2);

    let (code, _) = call(
        &db,
        RequestEnvelope::new("PUT", "/words/{wordId}")
            .with_path("wordId", &word_id)
            .with_body(json!({"ipa": "mi.ro", "translations": [{"meaning": "C"}]})),
    )
    .await;
    assert_eq!(code, StatusCode::OK);

    let (code, fetched) =
        call(&db, RequestEnvelope::new("GET", "/words/{wordId}").with_path("wordId", &word_id)).await;
    assert_eq!(code, StatusCode::OK);
    let translations = fetched["translations"].as_array().unwrap();
    assert_eq!(translations.len(), 1);
    assert_eq!(translations[0]["meaning"], "C");
}
