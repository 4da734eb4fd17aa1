use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer, Scope};
use log::*;
use marketplace_engine::{
    events::EventProducers,
    traits::{MarketplaceDatabase, PaymentProvider},
    CatalogApi,
    CheckoutFlowApi,
    PayoutApi,
    PurchasesApi,
    SqliteDatabase,
};
use stripe_tools::StripeApi;

use crate::{
    config::ServerConfig,
    data_objects::EnabledProviders,
    errors::ServerError,
    integrations::stripe::{create_settlement_handlers, SellerOnboarding, StripeCheckoutProvider},
    routes::{
        health,
        AdminPayoutsRoute,
        BrowseProductsRoute,
        CreateCheckoutSessionRoute,
        CreateProductRoute,
        DeleteProductRoute,
        MyDownloadsRoute,
        MyPurchasesRoute,
        PlatformStatsRoute,
        ProductByIdRoute,
        PurchaseByIdRoute,
        RetryCheckoutRoute,
        SearchPurchasesRoute,
        SellerAnalyticsRoute,
        SellerPayoutsRoute,
        SellerProductsRoute,
        SettlePurchaseRoute,
        UpdateProductRoute,
        UpdatePurchaseStatusRoute,
    },
    stripe_routes::{StripeOnboardRoute, StripeWebhookRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    let stripe = if config.stripe.is_configured() {
        info!("💳️ Stripe checkout is enabled");
        Some(StripeApi::new(config.stripe.clone())?)
    } else {
        warn!("💳️ Stripe is not configured. Purchases will be settled directly, without payment.");
        None
    };
    let handlers = create_settlement_handlers(config.commission);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, stripe, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    stripe: Option<StripeApi>,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let provider = stripe
        .clone()
        .map(|api| StripeCheckoutProvider::new(api, config.success_url.clone(), config.cancel_url.clone()));
    let onboarding = SellerOnboarding::new(stripe);
    let settlement = config.settlement_config();
    let commission = config.commission;
    let enabled_providers = EnabledProviders(config.enabled_providers.clone());
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutFlowApi::new(db.clone(), provider.clone(), settlement.clone(), producers.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mkt::access_log"))
            .app_data(web::Data::new(CatalogApi::new(db.clone())))
            .app_data(web::Data::new(PurchasesApi::new(db.clone())))
            .app_data(web::Data::new(PayoutApi::new(db.clone(), commission)))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(enabled_providers.clone()))
            .app_data(web::Data::new(onboarding.clone()))
            .service(health)
            .service(api_scope::<SqliteDatabase, StripeCheckoutProvider>())
            .service(stripe_scope::<SqliteDatabase, StripeCheckoutProvider>())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Every route under `/api`. The handlers expect the engine APIs for `B` and `P` to be registered as app data.
pub fn api_scope<B, P>() -> Scope
where
    B: MarketplaceDatabase + 'static,
    P: PaymentProvider + 'static,
{
    web::scope("/api")
        .service(BrowseProductsRoute::<B>::new())
        .service(ProductByIdRoute::<B>::new())
        .service(SellerProductsRoute::<B>::new())
        .service(CreateProductRoute::<B>::new())
        .service(UpdateProductRoute::<B>::new())
        .service(DeleteProductRoute::<B>::new())
        .service(SellerAnalyticsRoute::<B>::new())
        .service(SellerPayoutsRoute::<B>::new())
        .service(StripeOnboardRoute::<B>::new())
        .service(CreateCheckoutSessionRoute::<B, P>::new())
        .service(RetryCheckoutRoute::<B, P>::new())
        .service(SettlePurchaseRoute::<B, P>::new())
        .service(PurchaseByIdRoute::<B>::new())
        .service(MyPurchasesRoute::<B>::new())
        .service(MyDownloadsRoute::<B>::new())
        .service(PlatformStatsRoute::<B>::new())
        .service(AdminPayoutsRoute::<B>::new())
        .service(SearchPurchasesRoute::<B>::new())
        .service(UpdatePurchaseStatusRoute::<B, P>::new())
}

pub fn stripe_scope<B, P>() -> Scope
where
    B: MarketplaceDatabase + 'static,
    P: PaymentProvider + 'static,
{
    web::scope("/stripe").service(StripeWebhookRoute::<B, P>::new())
}

#[cfg(test)]
mod test {
    use marketplace_engine::test_utils::prepare_env::{destroy_database, prepare_test_env, random_db_path};

    use super::*;

    #[actix_web::test]
    async fn server_instance_starts_and_stops() {
        let db = prepare_test_env(&random_db_path()).await;
        let config = ServerConfig::new("127.0.0.1", 0);
        let srv = create_server_instance(config, db.clone(), None, EventProducers::default()).unwrap();
        let handle = srv.handle();
        let running = actix_web::rt::spawn(srv);
        handle.stop(true).await;
        running.await.unwrap().unwrap();
        destroy_database(db).await;
    }
}
