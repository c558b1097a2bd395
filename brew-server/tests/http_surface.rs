//! HTTP surface of the order flow: replay status codes and error mapping.
//!
//! Needs `DATABASE_URL` like the engine-level tests; ignored by default.

mod support;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use brew_server::api;
use support::test_state;

async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for integration tests");
    let pool = PgPool::connect(&url).await.expect("database connection");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

async fn seed_catalog(pool: &PgPool) -> (Uuid, Uuid) {
    let product_id: (Uuid,) = sqlx::query_as(
        "INSERT INTO products (name, base_price_cents) VALUES ($1, 300) RETURNING id",
    )
    .bind(format!("latte-{}", Uuid::new_v4()))
    .fetch_one(pool)
    .await
    .expect("seed product");

    let variation_id: (Uuid,) = sqlx::query_as(
        "INSERT INTO product_variations (product_id, name, price_change_cents)
         VALUES ($1, 'oat milk', 70) RETURNING id",
    )
    .bind(product_id.0)
    .fetch_one(pool)
    .await
    .expect("seed variation");

    (product_id.0, variation_id.0)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_order(body: &Value, key: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .header("Idempotency-Key", key)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn patch_status(order_id: &str, status: &str) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(format!("/api/orders/{order_id}/status"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "status": status }).to_string()))
        .unwrap()
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn replay_is_distinguishable_by_status_code() {
    let pool = test_pool().await;
    let (product_id, variation_id) = seed_catalog(&pool).await;
    let (state, payment, _) = test_state(pool.clone());
    let router: Router = api::create_router(state);

    let key = format!("http-{}", Uuid::new_v4());
    let body = json!({
        "customer_id": Uuid::new_v4(),
        "items": [
            { "product_id": product_id, "variation_id": variation_id, "quantity": 2 }
        ],
        "total_cents": 740
    });

    // First attempt creates
    let response = router
        .clone()
        .oneshot(post_order(&body, &key))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created["status"], "waiting");
    assert_eq!(created["total_cents"], 740);
    assert_eq!(created["items"][0]["line_total_cents"], 740);
    assert!(created["payment"].is_object());

    // Retry replays the same order without a second charge
    let response = router
        .clone()
        .oneshot(post_order(&body, &key))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let replayed = json_body(response).await;
    assert_eq!(replayed["id"], created["id"]);
    assert_eq!(payment.calls(), 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set DATABASE_URL)"]
async fn status_updates_map_errors_to_stable_codes() {
    let pool = test_pool().await;
    let (product_id, variation_id) = seed_catalog(&pool).await;
    let (state, _, _) = test_state(pool.clone());
    let router: Router = api::create_router(state);

    let body = json!({
        "customer_id": Uuid::new_v4(),
        "items": [
            { "product_id": product_id, "variation_id": variation_id, "quantity": 1 }
        ]
    });
    let response = router
        .clone()
        .oneshot(post_order(&body, &format!("http-{}", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    let order_id = created["id"].as_str().unwrap().to_string();

    // Legal transition
    let response = router
        .clone()
        .oneshot(patch_status(&order_id, "preparation"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = json_body(response).await;
    assert_eq!(updated["status"], "preparation");

    // Reverse transition → 400 with the transition error code
    let response = router
        .clone()
        .oneshot(patch_status(&order_id, "waiting"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], 4002); // InvalidStatusTransition

    // Unknown order → 404 with the order-not-found code
    let response = router
        .clone()
        .oneshot(patch_status(&Uuid::new_v4().to_string(), "preparation"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["code"], 4001); // OrderNotFound

    // Declined payment → 402 with the provider response attached
    let (state, payment, _) = test_state(pool.clone());
    payment.set_fail(true);
    let router: Router = api::create_router(state);
    let decline_body = json!({
        "customer_id": Uuid::new_v4(),
        "items": [
            { "product_id": product_id, "variation_id": variation_id, "quantity": 1 }
        ]
    });
    let response = router
        .oneshot(post_order(&decline_body, &format!("http-{}", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body = json_body(response).await;
    assert_eq!(body["code"], 5001); // PaymentFailed
    assert_eq!(body["details"]["provider_status"], 500);
}
