//! Request handler definitions
//!
//! Define each route and its handler here. Handlers stay thin: they extract the caller's identity and request
//! parameters, call one engine API, and map the result onto an HTTP response. Anything longer belongs in the engine.
//!
//! Handlers never block the worker thread. Every database or provider call is awaited, so a worker can serve other
//! requests while one is in flight.
//!
//! Identity: seller routes read the seller id from the `mkt-seller-id` header and buyer routes read the buyer's email
//! from the `mkt-buyer-email` header (see [`crate::helpers`]). Both are set by the gateway in front of this server.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use marketplace_engine::{
    checkout_objects::CheckoutResult,
    db_types::{Product, ProductId, PurchaseId},
    traits::{CatalogManagement, MarketplaceDatabase, PaymentProvider, PurchaseManagement},
    CatalogApi,
    CheckoutFlowApi,
    PayoutApi,
    PurchasesApi,
};

use crate::{
    data_objects::{
        CheckoutSessionRequest,
        CheckoutSessionResponse,
        EnabledProviders,
        NewProductRequest,
        ProductSearchParams,
        ProductUpdateRequest,
        PurchaseSearchParams,
        StatusUpdateRequest,
    },
    errors::ServerError,
    helpers::{BuyerIdentity, SellerIdentity},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Catalog  ----------------------------------------------------
route!(browse_products => Get "/products" impl CatalogManagement);
/// Lists active products. Accepts `search` (title substring), `category`, `seller` and `limit` query parameters.
pub async fn browse_products<B: CatalogManagement>(
    api: web::Data<CatalogApi<B>>,
    query: web::Query<ProductSearchParams>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET products: {query:?}");
    let products = api.browse_products(query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(product_by_id => Get "/products/{id}" impl CatalogManagement);
/// Fetches an active product and counts the view.
pub async fn product_by_id<B: CatalogManagement>(
    api: web::Data<CatalogApi<B>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let id = ProductId::from(path.into_inner());
    match api.view_product(&id).await? {
        Some(product) => Ok(HttpResponse::Ok().json(product)),
        None => Err(ServerError::NoRecordFound(format!("Product {id} is not available"))),
    }
}

route!(create_product => Post "/seller/products" impl CatalogManagement);
pub async fn create_product<B: CatalogManagement>(
    seller: SellerIdentity,
    api: web::Data<CatalogApi<B>>,
    body: web::Json<NewProductRequest>,
) -> Result<HttpResponse, ServerError> {
    let product = body.into_inner().into_new_product(&seller.0)?;
    let product = api.create_product(product).await?;
    Ok(HttpResponse::Created().json(product))
}

route!(update_product => Put "/seller/products/{id}" impl CatalogManagement);
pub async fn update_product<B: CatalogManagement>(
    seller: SellerIdentity,
    api: web::Data<CatalogApi<B>>,
    path: web::Path<String>,
    body: web::Json<ProductUpdateRequest>,
) -> Result<HttpResponse, ServerError> {
    let id = ProductId::from(path.into_inner());
    owned_product(api.get_ref(), &seller, &id).await?;
    let product = api.update_product(&id, body.into_inner().try_into()?).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(delete_product => Delete "/seller/products/{id}" impl CatalogManagement);
/// Delists the product. Purchases that include it, and their downloads, are unaffected.
pub async fn delete_product<B: CatalogManagement>(
    seller: SellerIdentity,
    api: web::Data<CatalogApi<B>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let id = ProductId::from(path.into_inner());
    owned_product(api.get_ref(), &seller, &id).await?;
    let product = api.suspend_product(&id).await?;
    Ok(HttpResponse::Ok().json(product))
}

async fn owned_product<B: CatalogManagement>(
    api: &CatalogApi<B>,
    seller: &SellerIdentity,
    id: &ProductId,
) -> Result<Product, ServerError> {
    let product = api
        .product_by_id(id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Product {id} does not exist")))?;
    if product.seller_id != seller.0 {
        warn!("💻️ Seller {} tried to modify product {id}, which belongs to {}", seller.0, product.seller_id);
        return Err(ServerError::InsufficientPermissions(format!("Product {id} belongs to another seller")));
    }
    Ok(product)
}

route!(seller_products => Get "/seller/products" impl CatalogManagement);
/// All of the seller's products, drafts and suspended ones included.
pub async fn seller_products<B: CatalogManagement>(
    seller: SellerIdentity,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let products = api.seller_products(&seller.0).await?;
    Ok(HttpResponse::Ok().json(products))
}

//----------------------------------------------   Sellers  ----------------------------------------------------
route!(seller_analytics => Get "/seller/analytics" impl MarketplaceDatabase);
pub async fn seller_analytics<B: MarketplaceDatabase>(
    seller: SellerIdentity,
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let analytics = api.seller_analytics(&seller.0).await?;
    Ok(HttpResponse::Ok().json(analytics))
}

route!(seller_payouts => Get "/seller/payouts" impl MarketplaceDatabase);
pub async fn seller_payouts<B: MarketplaceDatabase>(
    seller: SellerIdentity,
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payouts = api.payouts_for_seller(&seller.0).await?;
    Ok(HttpResponse::Ok().json(payouts))
}

//----------------------------------------------   Checkout  ---------------------------------------------------
route!(create_checkout_session => Post "/checkout/create-session" impl MarketplaceDatabase, PaymentProvider);
/// Creates a purchase from the cart. The response carries either a redirect to the provider's hosted checkout, or,
/// when no provider client handles the chosen provider, the already-settled purchase.
pub async fn create_checkout_session<B: MarketplaceDatabase, P: PaymentProvider>(
    api: web::Data<CheckoutFlowApi<B, P>>,
    providers: web::Data<EnabledProviders>,
    body: web::Json<CheckoutSessionRequest>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner().into_checkout_request(&providers)?;
    debug!("💻️ Checkout for {} with {} cart lines", request.buyer_email, request.items.len());
    let result = api.checkout(request).await?;
    Ok(HttpResponse::Ok().json(CheckoutSessionResponse::from(result)))
}

route!(retry_checkout => Post "/checkout/{purchase_id}/retry" impl MarketplaceDatabase, PaymentProvider);
/// Starts a new hosted checkout for a purchase that is still pending, e.g. after the provider was unavailable.
pub async fn retry_checkout<B: MarketplaceDatabase, P: PaymentProvider>(
    api: web::Data<CheckoutFlowApi<B, P>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let id = PurchaseId::from(path.into_inner());
    info!("💻️ Retrying provider checkout for purchase {id}");
    let (purchase, session) = api.begin_provider_checkout(&id).await?;
    let result = CheckoutResult::Redirect { purchase, session };
    Ok(HttpResponse::Ok().json(CheckoutSessionResponse::from(result)))
}

route!(settle_purchase => Post "/checkout/{purchase_id}/settle" impl MarketplaceDatabase, PaymentProvider);
/// Settles a purchase whose provider has no client configured. Repeating the call is harmless.
pub async fn settle_purchase<B: MarketplaceDatabase, P: PaymentProvider>(
    api: web::Data<CheckoutFlowApi<B, P>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let id = PurchaseId::from(path.into_inner());
    let purchase = api.settle_direct(&id).await?;
    let result = CheckoutResult::Settled { purchase };
    Ok(HttpResponse::Ok().json(CheckoutSessionResponse::from(result)))
}

//----------------------------------------------   Buyers  -----------------------------------------------------
route!(purchase_by_id => Get "/purchases/{id}" impl PurchaseManagement);
pub async fn purchase_by_id<B: PurchaseManagement>(
    buyer: BuyerIdentity,
    api: web::Data<PurchasesApi<B>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let id = PurchaseId::from(path.into_inner());
    let purchase =
        api.purchase_by_id(&id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Purchase {id}")))?;
    if !purchase.buyer_email.eq_ignore_ascii_case(&buyer.0) {
        return Err(ServerError::InsufficientPermissions(format!("Purchase {id} belongs to another buyer")));
    }
    Ok(HttpResponse::Ok().json(purchase))
}

route!(my_purchases => Get "/me/purchases" impl PurchaseManagement);
pub async fn my_purchases<B: PurchaseManagement>(
    buyer: BuyerIdentity,
    api: web::Data<PurchasesApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let history = api.purchases_for_buyer(&buyer.0).await?;
    Ok(HttpResponse::Ok().json(history))
}

route!(my_downloads => Get "/me/downloads" impl PurchaseManagement);
/// The buyer's library: one entry per line item of every paid purchase.
pub async fn my_downloads<B: PurchaseManagement>(
    buyer: BuyerIdentity,
    api: web::Data<PurchasesApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let downloads = api.downloads_for_buyer(&buyer.0).await?;
    Ok(HttpResponse::Ok().json(downloads))
}

//----------------------------------------------   Admin  ------------------------------------------------------
route!(platform_stats => Get "/admin/stats" impl MarketplaceDatabase);
pub async fn platform_stats<B: MarketplaceDatabase>(
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let stats = api.platform_stats().await?;
    Ok(HttpResponse::Ok().json(stats))
}

route!(admin_payouts => Get "/admin/payouts" impl MarketplaceDatabase);
pub async fn admin_payouts<B: MarketplaceDatabase>(
    api: web::Data<PayoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let summary = api.payout_summary().await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(search_purchases => Get "/admin/purchases" impl PurchaseManagement);
pub async fn search_purchases<B: PurchaseManagement>(
    api: web::Data<PurchasesApi<B>>,
    query: web::Query<PurchaseSearchParams>,
) -> Result<HttpResponse, ServerError> {
    let purchases = api.search_purchases(query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(purchases))
}

route!(update_purchase_status => Post "/admin/purchases/{id}/status" impl MarketplaceDatabase, PaymentProvider);
/// Moves a purchase to a new status. Only `pending → paid`, `pending → failed` and `paid → refunded` are accepted.
pub async fn update_purchase_status<B: MarketplaceDatabase, P: PaymentProvider>(
    api: web::Data<CheckoutFlowApi<B, P>>,
    path: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, ServerError> {
    let id = PurchaseId::from(path.into_inner());
    let status = body.into_inner().status;
    info!("💻️ Admin request to change purchase {id} to {status}");
    let purchase = api.modify_status(&id, status).await?;
    Ok(HttpResponse::Ok().json(purchase))
}
