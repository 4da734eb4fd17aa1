use std::collections::HashMap;

use cucumber::World;
use log::*;
use marketplace_engine::{
    db_types::{PaymentProviderKind, ProductId, Purchase},
    events::EventProducers,
    traits::ProviderSession,
    CheckoutFlowApi,
    SqliteDatabase,
};

use crate::support::{checkout_api, new_test_db, MockProvider};

#[derive(Default, Debug, World)]
pub struct MarketplaceWorld {
    pub system: Option<MarketplaceSystem>,
    pub products: HashMap<String, ProductId>,
    pub purchase: Option<Purchase>,
    pub session: Option<ProviderSession>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct MarketplaceSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub provider: Option<MockProvider>,
    pub api: CheckoutFlowApi<SqliteDatabase, MockProvider>,
}

impl MarketplaceWorld {
    pub fn system(&self) -> &MarketplaceSystem {
        self.system.as_ref().expect("Marketplace not initialised")
    }

    pub fn api(&self) -> &CheckoutFlowApi<SqliteDatabase, MockProvider> {
        &self.system().api
    }

    pub fn db(&self) -> &SqliteDatabase {
        &self.system().db
    }

    pub fn product_id(&self, title: &str) -> ProductId {
        self.products.get(title).cloned().unwrap_or_else(|| panic!("No product called '{title}' has been listed"))
    }

    pub fn purchase(&self) -> &Purchase {
        self.purchase.as_ref().expect("No purchase has been made")
    }
}

impl MarketplaceSystem {
    pub async fn new(provider: Option<PaymentProviderKind>) -> Self {
        let db = new_test_db().await;
        let db_path = marketplace_engine::traits::MarketplaceDatabase::url(&db).to_string();
        let provider = provider.map(MockProvider::new);
        let api = checkout_api(&db, provider.clone(), EventProducers::default());
        debug!("🚀️ Marketplace ready at {db_path}");
        Self { db_path, db, provider, api }
    }
}
