use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use marketplace_engine::{
    db_types::{Cents, NewProduct, PaymentProviderKind, PaymentStatus, Product, Purchase, PurchaseId},
    events::EventProducers,
    helpers::sign_payload,
    purchase_objects::DownloadEntry,
    test_utils::prepare_env::{destroy_database, prepare_test_env, random_db_path},
    traits::{CatalogManagement, PaymentProvider, ProviderError, ProviderSession, PurchaseManagement},
    CatalogApi,
    CheckoutFlowApi,
    PurchasesApi,
    SettlementConfig,
    SqliteDatabase,
};
use mkt_common::Secret;
use serde_json::json;

use super::helpers::{get_request, post_request, send};
use crate::{
    data_objects::{CheckoutSessionResponse, EnabledProviders},
    helpers::BUYER_EMAIL_HEADER,
    server::{api_scope, stripe_scope},
    stripe_routes::STRIPE_SIGNATURE_HEADER,
};

const WEBHOOK_SECRET: &str = "whsec_server_tests";
const BUYER: &str = "buyer@example.com";

/// Hands out `cs_test_{purchase_id}` as the session reference.
#[derive(Debug, Clone)]
struct TestProvider;

impl PaymentProvider for TestProvider {
    fn kind(&self) -> PaymentProviderKind {
        PaymentProviderKind::Stripe
    }

    async fn create_checkout_session(&self, purchase: &Purchase) -> Result<ProviderSession, ProviderError> {
        Ok(ProviderSession {
            external_ref: format!("cs_test_{}", purchase.id),
            redirect_url: format!("https://checkout.stripe.test/pay/{}", purchase.id),
        })
    }
}

#[actix_web::test]
async fn fallback_checkout_settles_immediately() {
    let db = prepare_test_env(&random_db_path()).await;
    let p1 = add_product(&db, 1000).await;
    let body = cart(&p1, 2, "paypal");
    let (status, body) =
        post_request(&[], "/api/checkout/create-session", body, configure(&db, None)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let res: CheckoutSessionResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(res.payment_status, PaymentStatus::Paid);
    assert_eq!(res.total_amount, Cents::from(2000));
    assert!(res.redirect_url.is_none());
    assert_eq!(sales(&db, &p1).await, 2);

    let (status, body) =
        get_request(&[(BUYER_EMAIL_HEADER, BUYER)], "/api/me/downloads", configure(&db, None)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let downloads: Vec<DownloadEntry> = serde_json::from_str(&body).unwrap();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].product_id, p1.id);
    assert_eq!(downloads[0].quantity, 2);
    destroy_database(db).await;
}

#[actix_web::test]
async fn provider_checkout_settles_once_per_purchase() {
    let db = prepare_test_env(&random_db_path()).await;
    let p1 = add_product(&db, 1000).await;
    let body = cart(&p1, 2, "stripe");
    let (status, body) =
        post_request(&[], "/api/checkout/create-session", body, configure(&db, Some(TestProvider))).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let res: CheckoutSessionResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(res.payment_status, PaymentStatus::Pending);
    let session_id = res.session_id.clone().unwrap();
    assert_eq!(session_id, format!("cs_test_{}", res.purchase_id));
    let expected_url = format!("https://checkout.stripe.test/pay/{}", res.purchase_id);
    assert_eq!(res.redirect_url.as_deref(), Some(expected_url.as_str()));
    assert_eq!(sales(&db, &p1).await, 0);

    let payload = event("checkout.session.completed", &session_id);
    for _ in 0..2 {
        let (status, body) = webhook(&db, &payload, &signature(&payload, WEBHOOK_SECRET)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"success\":true"));
    }
    assert_eq!(purchase(&db, &res.purchase_id).await.payment_status, PaymentStatus::Paid);
    assert_eq!(sales(&db, &p1).await, 2);
    destroy_database(db).await;
}

#[actix_web::test]
async fn unknown_session_references_are_acknowledged() {
    let db = prepare_test_env(&random_db_path()).await;
    let payload = event("checkout.session.completed", "cs_test_nobody");
    let (status, body) = webhook(&db, &payload, &signature(&payload, WEBHOOK_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("No purchase for cs_test_nobody"));
    destroy_database(db).await;
}

#[actix_web::test]
async fn forged_notifications_are_rejected() {
    let db = prepare_test_env(&random_db_path()).await;
    let p1 = add_product(&db, 500).await;
    let body = cart(&p1, 1, "stripe");
    let (_, body) =
        post_request(&[], "/api/checkout/create-session", body, configure(&db, Some(TestProvider))).await.unwrap();
    let res: CheckoutSessionResponse = serde_json::from_str(&body).unwrap();
    let payload = event("checkout.session.completed", &res.session_id.unwrap());

    let (status, _) = webhook(&db, &payload, &signature(&payload, "whsec_somebody_else")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = webhook(&db, &payload, "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(purchase(&db, &res.purchase_id).await.payment_status, PaymentStatus::Pending);
    assert_eq!(sales(&db, &p1).await, 0);
    destroy_database(db).await;
}

#[actix_web::test]
async fn carts_with_no_available_products_are_rejected() {
    let db = prepare_test_env(&random_db_path()).await;
    let body = json!({"buyer_email": BUYER, "items": [{"product_id": "prod_missing", "quantity": 1}]});
    let (status, body) = post_request(&[], "/api/checkout/create-session", body, configure(&db, None)).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("None of the requested products are available"));
    let history = PurchasesApi::new(db.clone()).purchases_for_buyer(BUYER).await.unwrap();
    assert!(history.purchases.is_empty());
    destroy_database(db).await;
}

#[actix_web::test]
async fn direct_settlement_is_refused_when_a_provider_handles_the_purchase() {
    let db = prepare_test_env(&random_db_path()).await;
    let p1 = add_product(&db, 500).await;
    let body = cart(&p1, 1, "stripe");
    let (_, body) =
        post_request(&[], "/api/checkout/create-session", body, configure(&db, Some(TestProvider))).await.unwrap();
    let res: CheckoutSessionResponse = serde_json::from_str(&body).unwrap();
    let path = format!("/api/checkout/{}/settle", res.purchase_id);
    let (status, _) = send(TestRequest::post().uri(&path), configure(&db, Some(TestProvider))).await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(purchase(&db, &res.purchase_id).await.payment_status, PaymentStatus::Pending);
    destroy_database(db).await;
}

#[actix_web::test]
async fn admin_status_changes_follow_the_state_machine() {
    let db = prepare_test_env(&random_db_path()).await;
    let p1 = add_product(&db, 750).await;
    let (_, body) =
        post_request(&[], "/api/checkout/create-session", cart(&p1, 1, "paypal"), configure(&db, None)).await.unwrap();
    let res: CheckoutSessionResponse = serde_json::from_str(&body).unwrap();
    let path = format!("/api/admin/purchases/{}/status", res.purchase_id);

    let (status, body) = post_request(&[], &path, json!({"status": "refunded"}), configure(&db, None)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let refunded: Purchase = serde_json::from_str(&body).unwrap();
    assert_eq!(refunded.payment_status, PaymentStatus::Refunded);

    let (status, body) = post_request(&[], &path, json!({"status": "paid"}), configure(&db, None)).await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("cannot move from refunded to paid"));
    // Refunds leave the sales counter alone
    assert_eq!(sales(&db, &p1).await, 1);
    destroy_database(db).await;
}

fn configure(db: &SqliteDatabase, provider: Option<TestProvider>) -> impl FnOnce(&mut ServiceConfig) {
    let db = db.clone();
    move |cfg| {
        let config = SettlementConfig { webhook_secret: Secret::from(WEBHOOK_SECRET), ..SettlementConfig::default() };
        let checkout_api = CheckoutFlowApi::new(db.clone(), provider, config, EventProducers::default());
        cfg.app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(CatalogApi::new(db.clone())))
            .app_data(web::Data::new(PurchasesApi::new(db)))
            .app_data(web::Data::new(EnabledProviders::default()))
            .service(api_scope::<SqliteDatabase, TestProvider>())
            .service(stripe_scope::<SqliteDatabase, TestProvider>());
    }
}

async fn add_product(db: &SqliteDatabase, price: i64) -> Product {
    db.insert_product(NewProduct::new("alice", "Vector icon pack", Cents::from(price))).await.unwrap()
}

fn cart(product: &Product, quantity: i64, provider: &str) -> serde_json::Value {
    json!({
        "buyer_email": BUYER,
        "items": [{"product_id": product.id, "quantity": quantity}],
        "provider": provider
    })
}

async fn sales(db: &SqliteDatabase, product: &Product) -> i64 {
    db.fetch_product(&product.id).await.unwrap().unwrap().stats.sales
}

async fn purchase(db: &SqliteDatabase, id: &PurchaseId) -> Purchase {
    db.fetch_purchase(id).await.unwrap().unwrap()
}

fn event(event_type: &str, session_id: &str) -> Vec<u8> {
    json!({
        "id": "evt_1NG8Du2eZvKYlo2CUI79vXWy",
        "type": event_type,
        "data": { "object": { "id": session_id, "object": "checkout.session" } }
    })
    .to_string()
    .into_bytes()
}

fn signature(payload: &[u8], secret: &str) -> String {
    sign_payload(payload, &Secret::from(secret), Utc::now().timestamp()).unwrap()
}

async fn webhook(db: &SqliteDatabase, payload: &[u8], signature: &str) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri("/stripe/webhook").set_payload(payload.to_vec());
    if !signature.is_empty() {
        req = req.insert_header((STRIPE_SIGNATURE_HEADER, signature));
    }
    send(req, configure(db, Some(TestProvider))).await.unwrap()
}
