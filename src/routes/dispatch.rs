//! Resource-template dispatch: picks the handler for an inbound envelope.

use crate::error::AppError;
use crate::extractors::RequestEnvelope;
use crate::handlers::{health, languages, users, words};
use crate::response::ResponseEnvelope;
use crate::service::DataAccess;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Users,
    Languages,
    Words,
    Health,
}

impl Resource {
    /// Nested templates belong to their innermost collection:
    /// `/users/{userId}/languages` is a languages route, `/languages/{languageId}/words` a words route.
    pub fn of(template: &str) -> Option<Self> {
        let segments: Vec<&str> = template
            .split('/')
            .filter(|s| !s.is_empty() && !s.starts_with('{'))
            .collect();
        match segments.as_slice() {
            ["health"] => Some(Resource::Health),
            ["users"] => Some(Resource::Users),
            ["users", "languages"] | ["languages"] => Some(Resource::Languages),
            ["languages", "words"] | ["words"] => Some(Resource::Words),
            _ => None,
        }
    }
}

pub async fn route(db: &dyn DataAccess, event: &RequestEnvelope) -> ResponseEnvelope {
    let Some(resource) = Resource::of(&event.resource) else {
        tracing::debug!(resource = %event.resource, "no handler for resource");
        return AppError::not_found(format!("No route for {}", event.resource)).into();
    };
    match resource {
        Resource::Users => users::handle(db, event).await,
        Resource::Languages => languages::handle(db, event).await,
        Resource::Words => words::handle(db, event).await,
        Resource::Health => health::handle(event),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDb;
    use axum::http::StatusCode;
    use rstest::rstest;

    #[rstest]
    #[case("/users", Some(Resource::Users))]
    #[case("/users/{userId}", Some(Resource::Users))]
    #[case("/users/{userId}/languages", Some(Resource::Languages))]
    #[case("/languages/{languageId}", Some(Resource::Languages))]
    #[case("/languages/{languageId}/words", Some(Resource::Words))]
    #[case("/words/{wordId}", Some(Resource::Words))]
    #[case("/health", Some(Resource::Health))]
    #[case("/subscriptions", None)]
    fn templates_select_handlers(#[case] template: &str, #[case] expected: Option<Resource>) {
        assert_eq!(Resource::of(template), expected);
    }

    #[tokio::test]
    async fn unknown_resource_is_not_found() {
        let db = ScriptedDb::new();
        let resp = route(&db, &RequestEnvelope::new("GET", "/phonemes")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(db.statements().is_empty());
    }

    #[tokio::test]
    async fn options_is_method_not_allowed() {
        let db = ScriptedDb::new();
        let resp = route(&db, &RequestEnvelope::new("OPTIONS", "/words")).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
