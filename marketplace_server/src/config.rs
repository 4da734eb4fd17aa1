use std::{str::FromStr, time::Duration};

use chrono::Duration as ChronoDuration;
use log::*;
use marketplace_engine::{
    db_types::PaymentProviderKind,
    mkt_api::checkout_flow_api::{DEFAULT_PROVIDER_TIMEOUT, DEFAULT_SIGNATURE_TOLERANCE_SECS},
    payout_objects::CommissionRate,
    SettlementConfig,
};
use mkt_common::{helpers::parse_comma_list, Secret};
use stripe_tools::StripeConfig;

const DEFAULT_MKT_HOST: &str = "127.0.0.1";
const DEFAULT_MKT_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/marketplace.db";
const DEFAULT_SUCCESS_URL: &str = "https://example.com/checkout/success?purchase={purchase_id}";
const DEFAULT_CANCEL_URL: &str = "https://example.com/checkout/cancel?purchase={purchase_id}";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub stripe: StripeConfig,
    /// The secret used to verify Stripe webhook signatures. An empty secret rejects every webhook.
    pub webhook_secret: Secret<String>,
    /// How far a webhook's signed timestamp may drift from the server clock
    pub webhook_tolerance: ChronoDuration,
    /// The upper bound on creating a hosted checkout session
    pub provider_timeout: Duration,
    pub commission: CommissionRate,
    /// The payment providers buyers may choose at checkout
    pub enabled_providers: Vec<PaymentProviderKind>,
    /// Where the provider sends the buyer after paying. `{purchase_id}` is substituted.
    pub success_url: String,
    /// Where the provider sends the buyer if they abandon the checkout. `{purchase_id}` is substituted.
    pub cancel_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MKT_HOST.into(),
            port: DEFAULT_MKT_PORT,
            database_url: DEFAULT_DATABASE_URL.into(),
            stripe: StripeConfig::default(),
            webhook_secret: Secret::default(),
            webhook_tolerance: ChronoDuration::seconds(DEFAULT_SIGNATURE_TOLERANCE_SECS),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            commission: CommissionRate::default(),
            enabled_providers: vec![PaymentProviderKind::Stripe, PaymentProviderKind::Paypal],
            success_url: DEFAULT_SUCCESS_URL.into(),
            cancel_url: DEFAULT_CANCEL_URL.into(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.into(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let host = std::env::var("MKT_HOST").ok().unwrap_or_else(|| {
            info!("🪛️ MKT_HOST not set, using {DEFAULT_MKT_HOST}");
            defaults.host.clone()
        });
        let port = parse_env("MKT_PORT", defaults.port);
        let database_url = std::env::var("MKT_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ MKT_DATABASE_URL not set, using {DEFAULT_DATABASE_URL}");
            defaults.database_url.clone()
        });
        let stripe = StripeConfig::new_from_env_or_default();
        let webhook_secret = match std::env::var("MKT_STRIPE_WEBHOOK_SECRET") {
            Ok(s) if !s.trim().is_empty() => Secret::new(s),
            _ => {
                warn!(
                    "🪛️ MKT_STRIPE_WEBHOOK_SECRET is not set. Every payment notification will be rejected, so \
                     purchases paid through Stripe will stay pending."
                );
                Secret::default()
            },
        };
        let webhook_tolerance =
            ChronoDuration::seconds(parse_env("MKT_WEBHOOK_TOLERANCE", DEFAULT_SIGNATURE_TOLERANCE_SECS));
        let provider_timeout =
            Duration::from_secs(parse_env("MKT_PROVIDER_TIMEOUT", defaults.provider_timeout.as_secs()));
        let commission = parse_env("MKT_COMMISSION_PERCENT", defaults.commission);
        let enabled_providers = std::env::var("MKT_ENABLED_PROVIDERS")
            .ok()
            .map(|s| parse_providers(&s))
            .filter(|p| {
                if p.is_empty() {
                    warn!("🪛️ MKT_ENABLED_PROVIDERS names no known provider. Using the defaults instead.");
                }
                !p.is_empty()
            })
            .unwrap_or_else(|| defaults.enabled_providers.clone());
        let success_url = std::env::var("MKT_CHECKOUT_SUCCESS_URL").ok().unwrap_or_else(|| {
            info!("🪛️ MKT_CHECKOUT_SUCCESS_URL not set, using {DEFAULT_SUCCESS_URL}");
            defaults.success_url.clone()
        });
        let cancel_url = std::env::var("MKT_CHECKOUT_CANCEL_URL").ok().unwrap_or_else(|| {
            info!("🪛️ MKT_CHECKOUT_CANCEL_URL not set, using {DEFAULT_CANCEL_URL}");
            defaults.cancel_url.clone()
        });
        Self {
            host,
            port,
            database_url,
            stripe,
            webhook_secret,
            webhook_tolerance,
            provider_timeout,
            commission,
            enabled_providers,
            success_url,
            cancel_url,
        }
    }

    pub fn settlement_config(&self) -> SettlementConfig {
        SettlementConfig {
            webhook_secret: self.webhook_secret.clone(),
            signature_tolerance: self.webhook_tolerance,
            provider_timeout: self.provider_timeout,
        }
    }
}

fn parse_env<T>(var: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid value for {var} ({s}). {e}. Using the default, {default}.");
            default
        }),
        Err(_) => {
            info!("🪛️ {var} not set, using {default}");
            default
        },
    }
}

/// Unknown provider names are logged and skipped.
pub fn parse_providers(value: &str) -> Vec<PaymentProviderKind> {
    let mut result = Vec::new();
    for name in parse_comma_list(value) {
        match name.parse::<PaymentProviderKind>() {
            Ok(p) if !result.contains(&p) => result.push(p),
            Ok(_) => {},
            Err(e) => warn!("🪛️ {e}. Ignoring it."),
        }
    }
    result
}
