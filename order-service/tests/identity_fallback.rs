// Integration tests for owner resolution of break-glass checkouts.
// Run with:
//   cargo test -p order-service --features "integration-tests" --tests -- --test-threads=1

#![cfg(feature = "integration-tests")]

use axum::{
    body::{to_bytes, Body},
    Router,
};
use http::{Request, StatusCode};
use order_service::{build_jwt_verifier_from_env, build_router, AppState};
use sqlx::Executor;
use tower::ServiceExt;
use uuid::Uuid;

const ISSUER: &str = "https://auth.kirana.local";
const AUDIENCE: &str = "kirana-storefront";

// Minimal schema helper (duplicated from orders_flow.rs to avoid cross-test deps)
const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
      id uuid PRIMARY KEY,
      name text NOT NULL,
      email text NOT NULL,
      role text NOT NULL,
      created_at timestamptz NOT NULL DEFAULT now()
    );
    CREATE TABLE IF NOT EXISTS orders (
      id uuid PRIMARY KEY,
      user_id uuid NOT NULL,
      payment_method text NOT NULL,
      items_total numeric NOT NULL,
      tax_total numeric NOT NULL,
      shipping_total numeric NOT NULL,
      discount_total numeric NOT NULL,
      grand_total numeric NOT NULL,
      shipping_name text NOT NULL,
      shipping_address text NOT NULL,
      shipping_city text NOT NULL,
      shipping_postal_code text NOT NULL,
      shipping_country text NOT NULL,
      status text NOT NULL DEFAULT 'pending',
      is_paid boolean NOT NULL DEFAULT false,
      paid_at timestamptz NULL,
      payment_id text NULL,
      payment_status text NULL,
      is_delivered boolean NOT NULL DEFAULT false,
      delivered_at timestamptz NULL,
      awb_number text NULL,
      created_at timestamptz NOT NULL DEFAULT now(),
      updated_at timestamptz NOT NULL DEFAULT now()
    );
    CREATE TABLE IF NOT EXISTS order_items (
      order_id uuid NOT NULL,
      product_id uuid NOT NULL,
      name text NOT NULL,
      unit_price numeric NOT NULL,
      quantity int NOT NULL,
      image_url text NULL
    );
"#;

async fn start_test_db() -> Option<sqlx::PgPool> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP identity tests: TEST_DATABASE_URL not set");
            return None;
        }
    };
    match sqlx::PgPool::connect(&url).await {
        Ok(pool) => {
            pool.execute(SCHEMA).await.expect("schema");
            Some(pool)
        }
        Err(err) => {
            eprintln!("SKIP identity tests: cannot connect to TEST_DATABASE_URL: {err}");
            None
        }
    }
}

fn generate_rsa_pems() -> (String, String) {
    use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
    use rsa::rand_core::OsRng;
    use rsa::RsaPrivateKey;

    let mut rng = OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("keygen");
    let public_key = private_key.to_public_key();
    let private_pem = private_key.to_pkcs1_pem(LineEnding::LF).expect("pem").to_string();
    let public_pem = public_key.to_pkcs1_pem(LineEnding::LF).expect("pub pem");
    (private_pem, public_pem)
}

fn sign_token(private_pem: &str, sub: &str, role: &str) -> String {
    use chrono::Utc;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        role: &'a str,
        iss: &'a str,
        aud: &'a str,
        exp: i64,
        iat: i64,
    }

    let encoding = EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("encoding");
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub,
        role,
        iss: ISSUER,
        aud: AUDIENCE,
        exp: now + 600,
        iat: now,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some("local-dev".to_string());
    encode(&header, &claims, &encoding).expect("sign")
}

fn build_test_app(pool: sqlx::PgPool, public_pem: &str) -> Router {
    std::env::set_var("JWT_ISSUER", ISSUER);
    std::env::set_var("JWT_AUDIENCE", AUDIENCE);
    std::env::set_var("JWT_DEV_PUBLIC_KEY_PEM", public_pem);
    let verifier = build_jwt_verifier_from_env().expect("jwt verifier");
    build_router(AppState {
        db: pool,
        jwt_verifier: verifier,
    })
}

fn order_body() -> serde_json::Value {
    serde_json::json!({
        "items": [
            {"product_id": Uuid::new_v4(), "name": "Basmati Rice 5kg", "unit_price": "650.00", "quantity": 1, "image_url": null}
        ],
        "shipping": {
            "name": "Walk-in",
            "address": "Counter Sale",
            "city": "Bengaluru",
            "postal_code": "560001",
            "country": "IN"
        },
        "payment_method": "cash",
        "totals": {
            "items_total": "650.00",
            "tax_total": "0.00",
            "shipping_total": "0.00",
            "discount_total": "0.00",
            "grand_total": "650.00"
        }
    })
}

async fn post_order(app: &Router, token: &str, body: &serde_json::Value) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/orders")
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

#[tokio::test]
async fn fallback_checkout_requires_a_persisted_admin() {
    let Some(pool) = start_test_db().await else { return };

    // Precondition: no persisted admin rows at all.
    sqlx::query("DELETE FROM users WHERE role = 'admin'")
        .execute(&pool)
        .await
        .expect("clear admins");

    let (private_pem, public_pem) = generate_rsa_pems();
    let app = build_test_app(pool.clone(), &public_pem);
    let token = sign_token(&private_pem, "fallback-admin", "admin");

    let (status, body) = post_order(&app, &token, &order_body()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
    assert_eq!(body["code"].as_str(), Some("no_valid_owner"));

    // With exactly one persisted admin, that row owns the order.
    let admin = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email, role) VALUES ($1, 'Store Admin', 'admin@example.test', 'admin')")
        .bind(admin)
        .execute(&pool)
        .await
        .expect("seed admin");

    let (status, body) = post_order(&app, &token, &order_body()).await;
    assert_eq!(status, StatusCode::CREATED, "body: {body}");
    assert_eq!(body["user_id"].as_str(), Some(admin.to_string().as_str()));
}

#[tokio::test]
async fn explicit_customer_reference_wins_when_persisted() {
    let Some(pool) = start_test_db().await else { return };

    let admin = Uuid::new_v4();
    let customer = Uuid::new_v4();
    for (id, role) in [(admin, "admin"), (customer, "customer")] {
        sqlx::query("INSERT INTO users (id, name, email, role) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(format!("user-{id}"))
            .bind(format!("{id}@example.test"))
            .bind(role)
            .execute(&pool)
            .await
            .expect("seed user");
    }

    let (private_pem, public_pem) = generate_rsa_pems();
    let app = build_test_app(pool.clone(), &public_pem);
    let token = sign_token(&private_pem, &admin.to_string(), "admin");

    // Admin places an order on behalf of a persisted customer.
    let mut body = order_body();
    body["customer_id"] = serde_json::json!(customer);
    let (status, resp) = post_order(&app, &token, &body).await;
    assert_eq!(status, StatusCode::CREATED, "body: {resp}");
    assert_eq!(resp["user_id"].as_str(), Some(customer.to_string().as_str()));

    // A dangling reference falls back to the session identity.
    let mut body = order_body();
    body["customer_id"] = serde_json::json!(Uuid::new_v4());
    let (status, resp) = post_order(&app, &token, &body).await;
    assert_eq!(status, StatusCode::CREATED, "body: {resp}");
    assert_eq!(resp["user_id"].as_str(), Some(admin.to_string().as_str()));
}
