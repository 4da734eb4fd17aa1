use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use marketplace_engine::{
    db_types::{Cents, Product, ProductId, ProductStats, ProductStatus},
    CatalogApi,
};
use serde_json::json;

use super::helpers::{get_request, post_request, send};
use crate::{
    endpoint_tests::mocks::MockCatalogManager,
    helpers::SELLER_ID_HEADER,
    routes::{BrowseProductsRoute, CreateProductRoute, DeleteProductRoute, ProductByIdRoute, UpdateProductRoute},
};

#[actix_web::test]
async fn browse_only_asks_for_active_products() {
    let _ = env_logger::try_init().ok();
    let mut catalog = MockCatalogManager::new();
    catalog
        .expect_search_products()
        .withf(|f| f.statuses == Some(vec![ProductStatus::Active]) && f.search.as_deref() == Some("icon"))
        .times(1)
        .returning(|_| Ok(vec![product("prod_1", "alice", ProductStatus::Active)]));
    let (status, body) = get_request(&[], "/api/products?search=icon", configure(catalog)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let products: Vec<Product> = serde_json::from_str(&body).unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id.as_str(), "prod_1");
}

#[actix_web::test]
async fn viewing_a_product_counts_the_view() {
    let _ = env_logger::try_init().ok();
    let mut catalog = MockCatalogManager::new();
    catalog
        .expect_fetch_product()
        .times(2)
        .returning(|id| Ok(Some(product(id.as_str(), "alice", ProductStatus::Active))));
    catalog.expect_increment_views().times(1).returning(|_| Ok(true));
    let (status, body) = get_request(&[], "/api/products/prod_1", configure(catalog)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let product: Product = serde_json::from_str(&body).unwrap();
    assert_eq!(product.id.as_str(), "prod_1");
}

#[actix_web::test]
async fn suspended_products_are_not_visible() {
    let _ = env_logger::try_init().ok();
    let mut catalog = MockCatalogManager::new();
    catalog.expect_fetch_product().returning(|id| Ok(Some(product(id.as_str(), "alice", ProductStatus::Suspended))));
    catalog.expect_increment_views().never();
    let (status, body) = get_request(&[], "/api/products/prod_1", configure(catalog)).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Product prod_1 is not available"}"#);
}

#[actix_web::test]
async fn creating_a_product_requires_a_seller() {
    let _ = env_logger::try_init().ok();
    let mut catalog = MockCatalogManager::new();
    catalog.expect_insert_product().never();
    let body = json!({"title": "Vector icon pack", "price": "12.50"});
    let (status, body) = post_request(&[], "/api/seller/products", body, configure(catalog)).await.unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("mkt-seller-id"));
}

#[actix_web::test]
async fn new_products_belong_to_the_calling_seller() {
    let _ = env_logger::try_init().ok();
    let mut catalog = MockCatalogManager::new();
    catalog
        .expect_insert_product()
        .withf(|p| p.seller_id == "alice" && p.price == Cents::from(1250) && p.currency == "usd")
        .times(1)
        .returning(|p| {
            let mut product = product("prod_new", &p.seller_id, p.status);
            product.price = p.price;
            Ok(product)
        });
    let body = json!({"title": "Vector icon pack", "price": "12.50"});
    let (status, body) =
        post_request(&[(SELLER_ID_HEADER, "alice")], "/api/seller/products", body, configure(catalog)).await.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    let product: Product = serde_json::from_str(&body).unwrap();
    assert_eq!(product.seller_id, "alice");
    assert_eq!(product.price, Cents::from(1250));
}

#[actix_web::test]
async fn negative_prices_are_rejected() {
    let _ = env_logger::try_init().ok();
    let mut catalog = MockCatalogManager::new();
    catalog.expect_insert_product().never();
    let body = json!({"title": "Vector icon pack", "price": "-1.00"});
    let (status, _) =
        post_request(&[(SELLER_ID_HEADER, "alice")], "/api/seller/products", body, configure(catalog)).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn sellers_cannot_edit_other_sellers_products() {
    let _ = env_logger::try_init().ok();
    let mut catalog = MockCatalogManager::new();
    catalog.expect_fetch_product().returning(|id| Ok(Some(product(id.as_str(), "bob", ProductStatus::Active))));
    catalog.expect_update_product().never();
    let req = TestRequest::put()
        .uri("/api/seller/products/prod_1")
        .insert_header((SELLER_ID_HEADER, "alice"))
        .set_json(json!({"price": "1.00"}));
    let (status, _) = send(req, configure(catalog)).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn deleting_a_product_suspends_it() {
    let _ = env_logger::try_init().ok();
    let mut catalog = MockCatalogManager::new();
    catalog.expect_fetch_product().returning(|id| Ok(Some(product(id.as_str(), "alice", ProductStatus::Active))));
    catalog
        .expect_update_product()
        .withf(|_, update| update.status == Some(ProductStatus::Suspended) && update.price.is_none())
        .times(1)
        .returning(|id, _| Ok(Some(product(id.as_str(), "alice", ProductStatus::Suspended))));
    let req = TestRequest::delete().uri("/api/seller/products/prod_1").insert_header((SELLER_ID_HEADER, "alice"));
    let (status, body) = send(req, configure(catalog)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let product: Product = serde_json::from_str(&body).unwrap();
    assert_eq!(product.status, ProductStatus::Suspended);
}

fn configure(catalog: MockCatalogManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(CatalogApi::new(catalog))).service(
            web::scope("/api")
                .service(BrowseProductsRoute::<MockCatalogManager>::new())
                .service(ProductByIdRoute::<MockCatalogManager>::new())
                .service(CreateProductRoute::<MockCatalogManager>::new())
                .service(UpdateProductRoute::<MockCatalogManager>::new())
                .service(DeleteProductRoute::<MockCatalogManager>::new()),
        );
    }
}

fn product(id: &str, seller: &str, status: ProductStatus) -> Product {
    let timestamp = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    Product {
        id: ProductId::from(id),
        seller_id: seller.to_string(),
        title: "Vector icon pack".to_string(),
        description: "200 icons in SVG and PNG".to_string(),
        price: Cents::from(1000),
        currency: "usd".to_string(),
        category: Some("graphics".to_string()),
        tags: vec!["icons".to_string()],
        preview_media_url: None,
        file_storage_key: Some("files/icons.zip".to_string()),
        status,
        stats: ProductStats::default(),
        created_at: timestamp,
        updated_at: timestamp,
    }
}
