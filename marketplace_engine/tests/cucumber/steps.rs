use std::str::FromStr;

use cucumber::{given, then, when};
use marketplace_engine::{
    checkout_objects::{CheckoutRequest, CheckoutResult, ReconcileOutcome},
    db_types::{NewProduct, PaymentProviderKind, PaymentStatus, ProductStatus, ProductUpdate},
    traits::{CatalogManagement, PurchaseManagement},
};
use mkt_common::Cents;

use crate::{
    cucumber::{MarketplaceSystem, MarketplaceWorld},
    support::{signed, webhook_body},
};

#[given("a marketplace without a payment provider")]
async fn marketplace_without_provider(world: &mut MarketplaceWorld) {
    world.system = Some(MarketplaceSystem::new(None).await);
}

#[given(expr = "a marketplace with a {word} checkout provider")]
async fn marketplace_with_provider(world: &mut MarketplaceWorld, provider: String) {
    let kind = PaymentProviderKind::from_str(&provider).expect("Unknown provider");
    world.system = Some(MarketplaceSystem::new(Some(kind)).await);
}

#[given(expr = "seller {word} lists {string} for {int} cents")]
async fn seller_lists_product(world: &mut MarketplaceWorld, seller: String, title: String, price: i64) {
    let product = world
        .db()
        .insert_product(NewProduct::new(seller, title.clone(), Cents::from(price)))
        .await
        .expect("Error listing product");
    world.products.insert(title, product.id);
}

#[given(expr = "{string} is suspended")]
async fn product_is_suspended(world: &mut MarketplaceWorld, title: String) {
    let id = world.product_id(&title);
    let update = ProductUpdate::default().with_status(ProductStatus::Suspended);
    world.db().update_product(&id, update).await.expect("Error suspending product");
}

#[when(expr = "{word} checks out {int} x {string} with {word}")]
async fn checkout_one(world: &mut MarketplaceWorld, buyer: String, qty: i64, title: String, provider: String) {
    let id = world.product_id(&title);
    let kind = PaymentProviderKind::from_str(&provider).expect("Unknown provider");
    let request = CheckoutRequest::new(buyer, kind).with_item(id, qty);
    run_checkout(world, request).await;
}

#[when(expr = "{word} checks out {int} x {string} and {int} x {string} with {word}")]
async fn checkout_two(
    world: &mut MarketplaceWorld,
    buyer: String,
    qty1: i64,
    title1: String,
    qty2: i64,
    title2: String,
    provider: String,
) {
    let kind = PaymentProviderKind::from_str(&provider).expect("Unknown provider");
    let request = CheckoutRequest::new(buyer, kind)
        .with_item(world.product_id(&title1), qty1)
        .with_item(world.product_id(&title2), qty2);
    run_checkout(world, request).await;
}

async fn run_checkout(world: &mut MarketplaceWorld, request: CheckoutRequest) {
    match world.api().checkout(request).await {
        Ok(CheckoutResult::Redirect { purchase, session }) => {
            world.purchase = Some(purchase);
            world.session = Some(session);
        },
        Ok(CheckoutResult::Settled { purchase }) => {
            world.purchase = Some(purchase);
            world.session = None;
        },
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "the provider reports {word}")]
async fn provider_reports(world: &mut MarketplaceWorld, event: String) {
    let event_type = match event.as_str() {
        "completion" => "checkout.session.completed",
        "expiry" => "checkout.session.expired",
        "failure" => "checkout.session.async_payment_failed",
        other => panic!("Unknown provider event {other}"),
    };
    let session = world.session.as_ref().expect("No provider checkout is in progress");
    let body = webhook_body(event_type, &session.external_ref);
    let outcome =
        world.api().process_provider_notification(&body, Some(&signed(&body))).await.expect("Notification rejected");
    if let ReconcileOutcome::Settled(p) | ReconcileOutcome::Failed(p) = outcome {
        world.purchase = Some(p);
    }
}

#[when(expr = "the price of {string} changes to {int} cents")]
async fn price_changes(world: &mut MarketplaceWorld, title: String, price: i64) {
    let id = world.product_id(&title);
    let update = ProductUpdate::default().with_price(Cents::from(price));
    world.db().update_product(&id, update).await.expect("Error updating product");
}

#[then(expr = "the purchase is {word}")]
async fn purchase_status(world: &mut MarketplaceWorld, status: String) {
    let expected = PaymentStatus::from_str(&status).expect("Unknown status");
    let id = world.purchase().id.clone();
    let purchase = world.db().fetch_purchase(&id).await.expect("Error fetching purchase").expect("Purchase missing");
    assert_eq!(purchase.payment_status, expected);
}

#[then(expr = "the purchase total is {int} cents")]
async fn purchase_total(world: &mut MarketplaceWorld, total: i64) {
    let id = world.purchase().id.clone();
    let purchase = world.db().fetch_purchase(&id).await.expect("Error fetching purchase").expect("Purchase missing");
    assert_eq!(purchase.total_amount, Cents::from(total));
}

#[then(expr = "the purchase line for {string} is priced at {int} cents")]
async fn purchase_line_price(world: &mut MarketplaceWorld, title: String, price: i64) {
    let product_id = world.product_id(&title);
    let id = world.purchase().id.clone();
    let purchase = world.db().fetch_purchase(&id).await.expect("Error fetching purchase").expect("Purchase missing");
    let item = purchase.items.iter().find(|i| i.product_id == product_id).expect("Product not in purchase");
    assert_eq!(item.unit_price, Cents::from(price));
}

#[then(expr = "{string} has {int} sales")]
async fn product_sales(world: &mut MarketplaceWorld, title: String, sales: i64) {
    let id = world.product_id(&title);
    let product = world.db().fetch_product(&id).await.expect("Error fetching product").expect("Product missing");
    assert_eq!(product.stats.sales, sales);
}

#[then("the buyer is redirected to the provider")]
async fn redirected(world: &mut MarketplaceWorld) {
    let session = world.session.as_ref().expect("No redirect was issued");
    assert!(session.redirect_url.starts_with("https://"));
}

#[then(expr = "the checkout is rejected because {string}")]
async fn checkout_rejected(world: &mut MarketplaceWorld, reason: String) {
    let err = world.last_error.as_ref().expect("The checkout succeeded");
    assert!(err.contains(&reason), "'{err}' does not mention '{reason}'");
}
