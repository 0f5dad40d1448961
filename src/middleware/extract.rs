// src/middleware/extract.rs
//
// Drop-in replacements for axum's `Json`, `Query` and `Path` whose
// rejections come back as a localized `ApiError` body.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRef, FromRequest, FromRequestParts, Request,
    },
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
};

fn invalid_input<S>(locale: &Locale, state: &S, detail: String) -> ApiError
where
    AppState: FromRef<S>,
{
    let app_state = AppState::from_ref(state);
    tracing::debug!(%detail, "Rejected request input");
    AppError::InvalidInput(detail).to_api_error(locale, &app_state.i18n_store)
}

async fn reject<S>(parts: &mut Parts, state: &S, detail: String) -> ApiError
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    let Ok(locale) = Locale::from_request_parts(parts, state).await;
    invalid_input(&locale, state, detail)
}

/// JSON body; also usable as a response.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // The body is consumed below, so the locale is resolved up front.
        let (mut parts, body) = req.into_parts();
        let Ok(locale) = Locale::from_request_parts(&mut parts, state).await;

        let result: Result<axum::Json<T>, JsonRejection> =
            axum::Json::from_request(Request::from_parts(parts, body), state).await;
        match result {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(invalid_input(&locale, state, rejection.body_text())),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Query string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let result: Result<axum::extract::Query<T>, QueryRejection> =
            axum::extract::Query::from_request_parts(parts, state).await;
        match result {
            Ok(axum::extract::Query(value)) => Ok(Query(value)),
            Err(rejection) => Err(reject(parts, state, rejection.body_text()).await),
        }
    }
}

/// Path segments.
#[derive(Debug, Clone, Copy)]
pub struct Path<T>(pub T);

impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let result: Result<axum::extract::Path<T>, PathRejection> =
            axum::extract::Path::from_request_parts(parts, state).await;
        match result {
            Ok(axum::extract::Path(value)) => Ok(Path(value)),
            Err(rejection) => Err(reject(parts, state, rejection.body_text()).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, StatusCode},
        routing::{get, post},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{
        config::tests::lazy_state,
        models::requisition::{RequisitionFilter, TransitionPayload},
    };

    fn app() -> Router {
        Router::new()
            .route(
                "/requisitions/{id}/transition",
                post(|Path(id): Path<Uuid>, Json(payload): Json<TransitionPayload>| async move {
                    Json(serde_json::json!({ "id": id, "status": payload.status }))
                }),
            )
            .route(
                "/requisitions",
                get(|Query(filter): Query<RequisitionFilter>| async move {
                    Json(serde_json::json!({ "status": filter.status }))
                }),
            )
            .with_state(lazy_state())
    }

    async fn send(request: axum::http::Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn transition(id: &str, body: &str) -> axum::http::Request<Body> {
        axum::http::Request::post(format!("/requisitions/{id}/transition"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn well_formed_input_passes_through() {
        let id = Uuid::new_v4();
        let (status, body) = send(transition(&id.to_string(), r#"{"status":"submitted"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "submitted");
    }

    #[tokio::test]
    async fn truncated_json_is_a_structured_validation_error() {
        let id = Uuid::new_v4();
        let (status, body) = send(transition(&id.to_string(), r#"{"status":"submitted""#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation_error");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_enum_value_is_a_structured_validation_error() {
        let id = Uuid::new_v4();
        let (status, body) = send(transition(&id.to_string(), r#"{"status":"archived"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation_error");
    }

    #[tokio::test]
    async fn non_uuid_path_segment_is_a_structured_validation_error() {
        let (status, body) = send(transition("not-a-uuid", r#"{"status":"submitted"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation_error");
    }

    #[tokio::test]
    async fn bad_query_value_is_a_structured_validation_error() {
        let request = axum::http::Request::get("/requisitions?status=archived")
            .header(header::ACCEPT_LANGUAGE, "pt")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation_error");
    }
}
