// src/routes.rs

use axum::{
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::{AppState, Config},
    docs::ApiDoc,
    handlers,
    middleware::auth::auth_guard,
};

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match &config.cors_origins {
        None => layer.allow_origin(Any),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(%origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(origins))
        }
    }
}

pub fn build_router(app_state: AppState) -> Router {
    // Public routes
    let auth_routes = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh));

    // Everything else requires a valid access token
    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        // --- Units ---
        .route(
            "/units",
            get(handlers::units::list_units).post(handlers::units::create_unit),
        )
        .route(
            "/units/{id}",
            get(handlers::units::get_unit)
                .put(handlers::units::update_unit)
                .delete(handlers::units::deactivate_unit),
        )
        // --- Users ---
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::deactivate_user),
        )
        .route("/users/{id}/units", put(handlers::users::assign_units))
        // --- Products ---
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route("/products/e-catalogue", get(handlers::products::e_catalogue))
        .route(
            "/products/categories",
            get(handlers::products::list_categories).post(handlers::products::create_category),
        )
        .route(
            "/products/categories/{id}",
            put(handlers::products::update_category).delete(handlers::products::deactivate_category),
        )
        .route(
            "/products/{id}",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::deactivate_product),
        )
        .route("/products/{id}/stock", patch(handlers::products::update_stock))
        .route(
            "/products/{id}/consumption",
            patch(handlers::products::update_consumption),
        )
        // --- Suppliers ---
        .route(
            "/suppliers",
            get(handlers::suppliers::list_suppliers).post(handlers::suppliers::create_supplier),
        )
        .route(
            "/suppliers/{id}",
            get(handlers::suppliers::get_supplier)
                .put(handlers::suppliers::update_supplier)
                .delete(handlers::suppliers::deactivate_supplier),
        )
        // --- Stock ---
        .route("/stock/adjustments", post(handlers::stock::create_adjustment))
        .route("/stock/movements", get(handlers::stock::list_movements))
        .route("/stock/alerts", get(handlers::stock::list_alerts))
        // --- Requisitions ---
        .route(
            "/requisitions",
            get(handlers::requisitions::list_requisitions)
                .post(handlers::requisitions::create_requisition),
        )
        .route("/requisitions/stats", get(handlers::requisitions::requisition_stats))
        .route(
            "/requisitions/{id}",
            get(handlers::requisitions::get_requisition)
                .put(handlers::requisitions::update_requisition)
                .delete(handlers::requisitions::delete_requisition),
        )
        .route("/requisitions/{id}/items", post(handlers::requisitions::add_item))
        .route(
            "/requisitions/{id}/items/{item_id}",
            put(handlers::requisitions::update_item).delete(handlers::requisitions::delete_item),
        )
        .route(
            "/requisitions/{id}/transition",
            post(handlers::requisitions::transition_requisition),
        )
        .route(
            "/requisitions/{id}/comments",
            get(handlers::requisitions::list_comments).post(handlers::requisitions::add_comment),
        )
        // --- Notifications ---
        .route("/notifications", get(handlers::notifications::list_notifications))
        .route("/notifications/{id}/read", post(handlers::notifications::mark_read))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let cors = cors_layer(&app_state.config);

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/v1", auth_routes.merge(protected_routes))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{
        config::tests::{lazy_state, test_config},
        models::auth::TokenKind,
    };

    // The pool never connects: every request below is rejected before any query runs.
    fn app() -> Router {
        build_router(lazy_state())
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_check_is_public() {
        let response = app()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_route_without_token_is_unauthorized() {
        let response = app()
            .oneshot(Request::get("/api/v1/requisitions").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "authentication_error");
    }

    #[tokio::test]
    async fn malformed_token_is_rejected_in_the_callers_language() {
        let response = app()
            .oneshot(
                Request::get("/api/v1/auth/me")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .header(header::ACCEPT_LANGUAGE, "pt-BR")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Token de autenticação inválido, expirado ou ausente.");
    }

    #[tokio::test]
    async fn refresh_token_is_not_accepted_as_access_token() {
        let token = test_config()
            .jwt_keys()
            .issue(Uuid::new_v4(), TokenKind::Refresh)
            .unwrap();

        let response = app()
            .oneshot(
                Request::get("/api/v1/units")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_payload_is_validated_before_lookup() {
        let response = app()
            .oneshot(
                Request::post("/api/v1/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email":"not-an-email","password":"secret"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "validation_error");
        assert!(body["details"]["email"].is_array());
    }

    #[tokio::test]
    async fn malformed_json_gets_a_structured_error() {
        let response = app()
            .oneshot(
                Request::post("/api/v1/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email":"a@b.com""#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "validation_error");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = app()
            .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["paths"]["/api/v1/requisitions/{id}/transition"].is_object());
        assert!(body["paths"]["/api/v1/requisitions/{id}/comments"]["post"].is_object());
        assert!(body["paths"]["/api/v1/products/categories/{id}"]["delete"].is_object());
    }

    #[tokio::test]
    async fn comment_thread_requires_a_token() {
        let uri = format!("/api/v1/requisitions/{}/comments", Uuid::new_v4());
        let response = app()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["kind"], "authentication_error");
    }
}
