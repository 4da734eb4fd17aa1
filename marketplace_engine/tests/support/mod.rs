#![allow(dead_code)]
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use chrono::Utc;
use log::*;
use marketplace_engine::{
    db_types::{NewProduct, PaymentProviderKind, Product, Purchase},
    events::EventProducers,
    helpers::sign_payload,
    traits::{CatalogManagement, MarketplaceDatabase, PaymentProvider, ProviderError, ProviderSession},
    CheckoutFlowApi,
    SettlementConfig,
    SqliteDatabase,
};
use mkt_common::{Cents, Secret};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub const WEBHOOK_SECRET: &str = "whsec_engine_tests";

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/mkt_engine_test_{:016x}.db", dir.display(), rand::random::<u64>())
}

/// A fresh, migrated database in the temp directory.
pub async fn new_test_db() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = random_db_path();
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    db.migrate().await.expect("Error running migrations");
    debug!("🚀️ Test database ready at {url}");
    db
}

pub async fn tear_down(db: &SqliteDatabase) {
    let url = db.url().to_string();
    db.pool().close().await;
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Could not remove test database {url}: {e}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderBehaviour {
    Succeed,
    Fail,
    Hang,
}

/// A payment provider that hands out predictable session references and can be told to misbehave.
#[derive(Debug, Clone)]
pub struct MockProvider {
    kind: PaymentProviderKind,
    behaviour: Arc<Mutex<ProviderBehaviour>>,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new(kind: PaymentProviderKind) -> Self {
        Self {
            kind,
            behaviour: Arc::new(Mutex::new(ProviderBehaviour::Succeed)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_behaviour(&self, behaviour: ProviderBehaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PaymentProvider for MockProvider {
    fn kind(&self) -> PaymentProviderKind {
        self.kind
    }

    async fn create_checkout_session(&self, purchase: &Purchase) -> Result<ProviderSession, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let behaviour = *self.behaviour.lock().unwrap();
        match behaviour {
            ProviderBehaviour::Succeed => Ok(ProviderSession {
                external_ref: format!("cs_test_{}_{n}", purchase.id),
                redirect_url: format!("https://checkout.test/pay/{}", purchase.id),
            }),
            ProviderBehaviour::Fail => Err(ProviderError("The card processor is down".into())),
            ProviderBehaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError("Gave up".into()))
            },
        }
    }
}

pub fn settlement_config() -> SettlementConfig {
    SettlementConfig {
        webhook_secret: Secret::from(WEBHOOK_SECRET),
        provider_timeout: Duration::from_millis(250),
        ..SettlementConfig::default()
    }
}

pub fn checkout_api(
    db: &SqliteDatabase,
    provider: Option<MockProvider>,
    producers: EventProducers,
) -> CheckoutFlowApi<SqliteDatabase, MockProvider> {
    CheckoutFlowApi::new(db.clone(), provider, settlement_config(), producers)
}

pub async fn add_product(db: &SqliteDatabase, seller: &str, title: &str, price: i64) -> Product {
    db.insert_product(NewProduct::new(seller, title, Cents::from(price))).await.expect("Error inserting product")
}

pub fn webhook_body(event_type: &str, session_id: &str) -> Vec<u8> {
    serde_json::json!({
        "id": format!("evt_{}", rand::random::<u32>()),
        "type": event_type,
        "data": { "object": { "id": session_id, "object": "checkout.session" } }
    })
    .to_string()
    .into_bytes()
}

/// A notification for a session that carries the purchase id as its client reference, as real sessions do.
pub fn webhook_body_for_purchase(event_type: &str, session_id: &str, purchase_id: &str) -> Vec<u8> {
    serde_json::json!({
        "id": format!("evt_{}", rand::random::<u32>()),
        "type": event_type,
        "data": { "object": { "id": session_id, "object": "checkout.session", "client_reference_id": purchase_id } }
    })
    .to_string()
    .into_bytes()
}

pub fn signed(body: &[u8]) -> String {
    sign_payload(body, &Secret::from(WEBHOOK_SECRET), Utc::now().timestamp()).expect("Error signing payload")
}
