use marketplace_engine::{
    checkout_objects::CheckoutRequest,
    db_types::{NewProduct, PaymentProviderKind, PaymentStatus, ProductStatus, ProductUpdate},
    events::EventProducers,
    payout_objects::CommissionRate,
    traits::{CatalogError, ProductQueryFilter},
    CatalogApi,
    PayoutApi,
    PurchasesApi,
};
use mkt_common::Cents;
use support::*;

mod support;

#[tokio::test]
async fn catalog_lifecycle() {
    let db = new_test_db().await;
    let api = CatalogApi::new(db.clone());

    let err = api.create_product(NewProduct::new("seller_a", "Bad", Cents::from(-1))).await.unwrap_err();
    assert!(matches!(err, CatalogError::NegativePrice));
    let err = api.create_product(NewProduct::new("seller_a", "  ", Cents::from(100))).await.unwrap_err();
    assert!(matches!(err, CatalogError::InvalidProduct(_)));

    let brushes = NewProduct::new("seller_a", "Watercolour brushes", Cents::from(1200)).with_category("art");
    let brushes = api.create_product(brushes).await.unwrap();
    let fonts = NewProduct::new("seller_b", "Display fonts", Cents::from(800)).with_category("type");
    let fonts = api.create_product(fonts).await.unwrap();
    let draft = NewProduct::new("seller_a", "Secret brushes", Cents::from(500)).with_status(ProductStatus::Draft);
    let draft = api.create_product(draft).await.unwrap();
    assert_eq!(brushes.stats.views, 0);
    assert_eq!(brushes.stats.sales, 0);

    let found = api.browse_products(ProductQueryFilter::default().with_search("BRUSH")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, brushes.id);
    let found = api.browse_products(ProductQueryFilter::default().with_category("type")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, fonts.id);

    let viewed = api.view_product(&brushes.id).await.unwrap().unwrap();
    assert_eq!(viewed.stats.views, 1);
    let viewed = api.view_product(&brushes.id).await.unwrap().unwrap();
    assert_eq!(viewed.stats.views, 2);
    // Drafts are not public, and looking at them does not count
    assert!(api.view_product(&draft.id).await.unwrap().is_none());
    assert_eq!(api.product_by_id(&draft.id).await.unwrap().unwrap().stats.views, 0);
    assert!(api.view_product(&"prod_missing".into()).await.unwrap().is_none());

    let update = ProductUpdate::default().with_price(Cents::from(1500));
    let updated = api.update_product(&brushes.id, update).await.unwrap();
    assert_eq!(updated.price, Cents::from(1500));
    assert_eq!(updated.stats.views, 2);
    let err = api.update_product(&brushes.id, ProductUpdate::default()).await.unwrap_err();
    assert!(matches!(err, CatalogError::UpdateNoOp));
    let err = api.update_product(&"prod_missing".into(), ProductUpdate::default().with_title("x")).await.unwrap_err();
    assert!(matches!(err, CatalogError::ProductNotFound(_)));

    let suspended = api.suspend_product(&brushes.id).await.unwrap();
    assert_eq!(suspended.status, ProductStatus::Suspended);
    assert!(api.view_product(&brushes.id).await.unwrap().is_none());
    let found = api.browse_products(ProductQueryFilter::default().with_search("brush")).await.unwrap();
    assert!(found.is_empty());
    assert_eq!(api.seller_products("seller_a").await.unwrap().len(), 2);
    tear_down(&db).await;
}

#[tokio::test]
async fn payouts_and_analytics() {
    let db = new_test_db().await;
    let a1 = add_product(&db, "seller_a", "A one", 2000).await;
    let a2 = add_product(&db, "seller_a", "A two", 1005).await;
    let b1 = add_product(&db, "seller_b", "B one", 500).await;
    let catalog = CatalogApi::new(db.clone());
    let checkout = checkout_api(&db, None, EventProducers::default());
    let payouts = PayoutApi::new(db.clone(), CommissionRate::from_bps(1000).unwrap());
    let purchases = PurchasesApi::new(db.clone());

    for _ in 0..4 {
        catalog.view_product(&a1.id).await.unwrap();
    }
    catalog.view_product(&a2.id).await.unwrap();
    catalog.view_product(&b1.id).await.unwrap();

    // Paid: a1 x1, a2 x1, b1 x2
    let req = CheckoutRequest::new("x@example.com", PaymentProviderKind::Paypal)
        .with_item(a1.id.clone(), 1)
        .with_item(a2.id.clone(), 1)
        .with_item(b1.id.clone(), 2);
    checkout.checkout(req).await.unwrap();
    // Pending only, never counted
    let req = CheckoutRequest::new("y@example.com", PaymentProviderKind::Paypal).with_item(a1.id.clone(), 5);
    checkout.initiate(req).await.unwrap();
    // Paid then refunded, drops out of payouts
    let req = CheckoutRequest::new("y@example.com", PaymentProviderKind::Paypal).with_item(a1.id.clone(), 1);
    let refunded = checkout.checkout(req).await.unwrap().purchase().clone();
    checkout.refund_purchase(&refunded.id).await.unwrap();

    let a = payouts.payouts_for_seller("seller_a").await.unwrap();
    assert_eq!(a.accruals.len(), 1);
    let usd = &a.accruals[0];
    assert_eq!(usd.currency, "usd");
    assert_eq!(usd.gross, Cents::from(3005));
    assert_eq!(usd.commission, Cents::from(301));
    assert_eq!(usd.net, Cents::from(2704));
    assert_eq!(usd.purchase_count, 1);
    assert_eq!(usd.units_sold, 2);
    assert!(a.payout_account_id.is_none());

    catalog.link_payout_account("seller_b", "acct_123").await.unwrap();
    let b = payouts.payouts_for_seller("seller_b").await.unwrap();
    assert_eq!(b.accruals[0].gross, Cents::from(1000));
    assert_eq!(b.accruals[0].net, Cents::from(900));
    assert_eq!(b.payout_account_id.as_deref(), Some("acct_123"));

    let nobody = payouts.payouts_for_seller("seller_z").await.unwrap();
    assert!(nobody.accruals.is_empty());
    let summary = payouts.payout_summary().await.unwrap();
    assert_eq!(summary.iter().map(|s| s.seller_id.as_str()).collect::<Vec<_>>(), vec!["seller_a", "seller_b"]);

    // Sales are historical: the refunded unit still counts
    let analytics = payouts.seller_analytics("seller_a").await.unwrap();
    assert_eq!(analytics.products, 2);
    assert_eq!(analytics.views, 5);
    assert_eq!(analytics.sales, 3);
    assert_eq!(analytics.revenue.get("usd"), Some(&Cents::from(3005)));
    assert_eq!(analytics.conversion_rate, 60.0);

    let stats = payouts.platform_stats().await.unwrap();
    assert_eq!(stats.sellers, 2);
    assert_eq!(stats.products, 3);
    assert_eq!(stats.paid_purchases, 1);
    assert_eq!(stats.revenue.get("usd"), Some(&Cents::from(4005)));
    assert_eq!(stats.commission.get("usd"), Some(&Cents::from(401)));

    let history = purchases.purchases_for_buyer("y@example.com").await.unwrap();
    assert_eq!(history.purchases.len(), 2);
    let downloads = purchases.downloads_for_buyer("x@example.com").await.unwrap();
    assert_eq!(downloads.len(), 3);
    assert!(downloads.iter().all(|d| d.download_url.starts_with("/api/downloads/prod_")));
    assert!(purchases.downloads_for_buyer("y@example.com").await.unwrap().is_empty());
    let refunded = purchases.purchase_by_id(&refunded.id).await.unwrap().unwrap();
    assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
    tear_down(&db).await;
}
