//! Typed statement parameters. Each variant declares its PostgreSQL type, so NULLs stay typed.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Bool(Option<bool>),
    Uuid(Option<uuid::Uuid>),
    Json(Value),
    TextArray(Option<Vec<String>>),
    FloatArray(Option<Vec<f64>>),
}

impl SqlValue {
    pub fn text(s: impl Into<String>) -> Self {
        SqlValue::Text(Some(s.into()))
    }

    fn type_info(&self) -> PgTypeInfo {
        match self {
            SqlValue::Text(_) => <String as Type<Postgres>>::type_info(),
            SqlValue::Bool(_) => <bool as Type<Postgres>>::type_info(),
            SqlValue::Uuid(_) => <uuid::Uuid as Type<Postgres>>::type_info(),
            SqlValue::Json(_) => <Value as Type<Postgres>>::type_info(),
            SqlValue::TextArray(_) => <Vec<String> as Type<Postgres>>::type_info(),
            SqlValue::FloatArray(_) => <Vec<f64> as Type<Postgres>>::type_info(),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::text(s)
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(Some(s))
    }
}

impl<'q> Encode<'q, Postgres> for SqlValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            SqlValue::Text(v) => <Option<String> as Encode<Postgres>>::encode_by_ref(v, buf),
            SqlValue::Bool(v) => <Option<bool> as Encode<Postgres>>::encode_by_ref(v, buf),
            SqlValue::Uuid(v) => <Option<uuid::Uuid> as Encode<Postgres>>::encode_by_ref(v, buf),
            SqlValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf),
            SqlValue::TextArray(v) => <Option<Vec<String>> as Encode<Postgres>>::encode_by_ref(v, buf),
            SqlValue::FloatArray(v) => <Option<Vec<f64>> as Encode<Postgres>>::encode_by_ref(v, buf),
        }
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(self.type_info())
    }
}

impl Type<Postgres> for SqlValue {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }
}
