use std::net::SocketAddr;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::AppResult;
use crate::state::AppState;
use crate::store::DocumentStore;
use crate::{auth, bookings, content, payments, products, users, wishlist};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Laptop Hunter server is running..." }))
        .route("/health", get(health))
        .merge(auth::router())
        .merge(users::router())
        .merge(products::router())
        .merge(bookings::router())
        .merge(wishlist::router())
        .merge(content::router())
        .merge(payments::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

async fn health(State(state): State<AppState>) -> AppResult<Json<Value>> {
    state.store.ping().await?;
    Ok(Json(json!({ "status": "ok" })))
}

/// Serves until Ctrl-C / SIGTERM, then closes the store.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.host, state.config.port).parse()?;
    let store = state.store.clone();
    let app = build_app(state);

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        auth::jwt::JwtKeys,
        payments::provider::fake::RecordingPayments,
        store::{memory::MemoryStore, to_document, Collection, DocumentStore},
    };

    struct TestApp {
        router: Router,
        keys: JwtKeys,
    }

    impl TestApp {
        async fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let admin = to_document(&json!({ "email": "root@x.com", "role": "admin" })).unwrap();
            store.insert_one(Collection::Users, admin).await.unwrap();

            let state = AppState::from_parts(
                store,
                Arc::new(AppState::test_config()),
                Arc::new(RecordingPayments::default()),
            );
            let keys = JwtKeys::from_ref(&state);
            Self {
                router: build_app(state),
                keys,
            }
        }

        async fn call(
            &self,
            method: Method,
            uri: &str,
            token_for: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(email) = token_for {
                let token = self.keys.issue(email).unwrap();
                req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let req = match body {
                Some(v) => req
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(v.to_string())),
                None => req.body(Body::empty()),
            }
            .unwrap();

            let res = self.router.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                    Value::String(String::from_utf8_lossy(&bytes).into_owned())
                })
            };
            (status, value)
        }
    }

    #[tokio::test]
    async fn root_reports_availability() {
        let app = TestApp::new().await;
        let (status, body) = app.call(Method::GET, "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("Laptop Hunter server is running..."));

        let (status, body) = app.call(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn signup_lookup_and_admin_removal() {
        let app = TestApp::new().await;

        let (status, created) = app
            .call(
                Method::POST,
                "/users",
                None,
                Some(json!({ "email": "a@x.com", "name": "Ann", "userType": "buyer" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let id = created["insertedId"].as_str().unwrap().to_string();

        let (status, user) = app.call(Method::GET, "/user?email=a@x.com", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["_id"], id);
        assert_eq!(user["email"], "a@x.com");
        assert_eq!(user["userType"], "buyer");
        assert_eq!(user["verified"], false);

        let (status, _) = app
            .call(
                Method::POST,
                "/users",
                None,
                Some(json!({ "email": "a@x.com", "userType": "seller" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let uri = format!("/user/{id}?email=root@x.com");
        let (status, deleted) = app.call(Method::DELETE, &uri, Some("root@x.com"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["deletedCount"], 1);

        let (status, user) = app.call(Method::GET, "/user?email=a@x.com", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user, Value::Null);
    }

    #[tokio::test]
    async fn non_admin_gets_forbidden_not_silence() {
        let app = TestApp::new().await;
        let (_, created) = app
            .call(
                Method::POST,
                "/users",
                None,
                Some(json!({ "email": "s@x.com", "userType": "seller" })),
            )
            .await;
        let id = created["insertedId"].as_str().unwrap().to_string();

        let uri = format!("/user/{id}?email=s@x.com");
        let (status, body) = app.call(Method::PUT, &uri, Some("s@x.com"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Forbidden Access.");

        let uri = format!("/user/{id}?email=root@x.com");
        let (status, body) = app.call(Method::PUT, &uri, Some("root@x.com"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["modifiedCount"], 1);

        let (_, sellers) = app
            .call(
                Method::GET,
                "/users?userType=seller&email=root@x.com",
                Some("root@x.com"),
                None,
            )
            .await;
        assert_eq!(sellers.as_array().unwrap().len(), 1);
        assert_eq!(sellers[0]["verified"], true);

        let (status, _) = app.call(Method::GET, "/users?userType=seller", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn role_endpoints_answer_booleans() {
        let app = TestApp::new().await;
        app.call(
            Method::POST,
            "/users",
            None,
            Some(json!({ "email": "b@x.com", "userType": "buyer" })),
        )
        .await;

        let (_, body) = app.call(Method::GET, "/users/admin/root@x.com", None, None).await;
        assert_eq!(body, json!({ "isAdmin": true }));
        let (_, body) = app.call(Method::GET, "/users/admin/b@x.com", None, None).await;
        assert_eq!(body, json!({ "isAdmin": false }));
        let (_, body) = app.call(Method::GET, "/users/buyer/b@x.com", None, None).await;
        assert_eq!(body, json!({ "isBuyer": true }));
        let (_, body) = app.call(Method::GET, "/users/seller/b@x.com", None, None).await;
        assert_eq!(body, json!({ "isSeller": false }));
        let (_, body) = app.call(Method::GET, "/users/seller/ghost@x.com", None, None).await;
        assert_eq!(body, json!({ "isSeller": false }));
    }

    #[tokio::test]
    async fn product_lifecycle() {
        let app = TestApp::new().await;
        let (status, created) = app
            .call(
                Method::POST,
                "/addproducts",
                None,
                Some(json!({ "sellerEmail": "s@x.com", "brand": "dell", "model": "XPS" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let id = created["insertedId"].as_str().unwrap().to_string();

        for _ in 0..2 {
            let (status, _) = app
                .call(Method::PUT, &format!("/productsold/{id}"), None, None)
                .await;
            assert_eq!(status, StatusCode::OK);
        }
        let (_, products) = app.call(Method::GET, "/product?brand=dell", None, None).await;
        let products = products.as_array().unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0]["status"], "sold");
        assert_eq!(products[0]["model"], "XPS");

        let (status, _) = app
            .call(Method::PUT, &format!("/products/{id}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, mine) = app
            .call(Method::GET, "/myproduct?email=s@x.com", Some("s@x.com"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine[0]["ads"], true);

        let (status, _) = app
            .call(Method::GET, "/myproduct?email=s@x.com", Some("b@x.com"), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let missing = uuid::Uuid::new_v4();
        let (status, _) = app
            .call(Method::PUT, &format!("/productavailable/{missing}"), None, None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, deleted) = app
            .call(Method::DELETE, &format!("/myproduct/{id}"), None, None)
            .await;
        assert_eq!(deleted["deletedCount"], 1);
        let (_, all) = app.call(Method::GET, "/products", None, None).await;
        assert_eq!(all, json!([]));
    }

    #[tokio::test]
    async fn booking_flow_for_buyer_and_seller() {
        let app = TestApp::new().await;
        let (status, created) = app
            .call(
                Method::POST,
                "/booking",
                None,
                Some(json!({
                    "buyerEmail": "b@x.com",
                    "sellerEmail": "s@x.com",
                    "productId": "p-1",
                    "price": 25.5,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let id = created["insertedId"].as_str().unwrap().to_string();

        let (status, mine) = app
            .call(Method::GET, "/bookings?email=b@x.com", Some("b@x.com"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine[0]["productId"], "p-1");

        let (_, buyers) = app.call(Method::GET, "/mybuyers/s@x.com", None, None).await;
        assert_eq!(buyers[0]["buyerEmail"], "b@x.com");

        let (status, _) = app
            .call(
                Method::POST,
                "/paymentinfo",
                None,
                Some(json!({ "bookingId": id, "transactionId": "txn_9" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, booking) = app.call(Method::GET, &format!("/booking/{id}"), None, None).await;
        assert_eq!(booking["paid"], true);
        assert_eq!(booking["transactionId"], "txn_9");

        let (_, deleted) = app
            .call(Method::DELETE, &format!("/myorders/{id}"), None, None)
            .await;
        assert_eq!(deleted["deletedCount"], 1);
        let (_, booking) = app.call(Method::GET, &format!("/booking/{id}"), None, None).await;
        assert_eq!(booking, Value::Null);
    }

    #[tokio::test]
    async fn google_sign_in_creates_then_refreshes() {
        let app = TestApp::new().await;
        let (status, first) = app
            .call(
                Method::PUT,
                "/googleuser/g@x.com",
                None,
                Some(json!({ "name": "Gina" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["upsertedCount"], 1);

        let (_, second) = app
            .call(
                Method::PUT,
                "/googleuser/g@x.com",
                None,
                Some(json!({ "name": "Gina R." })),
            )
            .await;
        assert_eq!(second["matchedCount"], 1);

        let (_, user) = app.call(Method::GET, "/user?email=g@x.com", None, None).await;
        assert_eq!(user["name"], "Gina R.");
        assert_eq!(user["userType"], "buyer");
    }

    #[tokio::test]
    async fn malformed_input_is_a_400_with_message() {
        let app = TestApp::new().await;
        let cases = [
            (
                Method::POST,
                "/users",
                Some(json!({ "email": "a@x.com", "userType": "admin" })),
            ),
            (
                Method::POST,
                "/booking",
                Some(json!({ "buyerEmail": "b@x.com", "productId": "p-1" })),
            ),
            (Method::GET, "/user", None),
            (Method::GET, "/booking/not-a-uuid", None),
            (Method::GET, "/product", None),
        ];

        for (method, uri, body) in cases {
            let (status, body) = app.call(method, uri, None, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()), "{uri}: {body}");
        }
    }

    #[tokio::test]
    async fn google_sign_in_rejects_malformed_profile() {
        let app = TestApp::new().await;
        let req = Request::put("/googleuser/g@x.com")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\":"))
            .unwrap();
        let res = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let (_, user) = app.call(Method::GET, "/user?email=g@x.com", None, None).await;
        assert_eq!(user, Value::Null);

        let (status, res) = app.call(Method::PUT, "/googleuser/g@x.com", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(res["upsertedCount"], 1);
    }
}
