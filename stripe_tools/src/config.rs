use std::time::Duration;

use log::*;
use mkt_common::Secret;

const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Base URL of the API, without the version path. Overridable so that tests can point at a local mock.
    pub api_base: String,
    pub secret_key: Secret<String>,
    pub request_timeout: Duration,
    /// Where Stripe sends a seller whose onboarding link has expired.
    pub onboarding_refresh_url: String,
    /// Where Stripe sends a seller after completing onboarding.
    pub onboarding_return_url: String,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_STRIPE_API_BASE.to_string(),
            secret_key: Secret::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            onboarding_refresh_url: "https://example.com/seller/onboarding".to_string(),
            onboarding_return_url: "https://example.com/seller/dashboard".to_string(),
        }
    }
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let defaults = Self::default();
        let api_base = std::env::var("MKT_STRIPE_API_BASE").unwrap_or_else(|_| {
            debug!("💳️ MKT_STRIPE_API_BASE not set, using {DEFAULT_STRIPE_API_BASE}");
            defaults.api_base.clone()
        });
        let secret_key = Secret::new(std::env::var("MKT_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("💳️ MKT_STRIPE_SECRET_KEY not set. Stripe checkout is disabled and purchases settle directly.");
            String::default()
        }));
        let request_timeout = std::env::var("MKT_PROVIDER_TIMEOUT")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("💳️ Invalid value for MKT_PROVIDER_TIMEOUT ({s}). {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);
        let onboarding_refresh_url =
            std::env::var("MKT_STRIPE_ONBOARD_REFRESH_URL").unwrap_or(defaults.onboarding_refresh_url);
        let onboarding_return_url =
            std::env::var("MKT_STRIPE_ONBOARD_RETURN_URL").unwrap_or(defaults.onboarding_return_url);
        Self { api_base, secret_key, request_timeout, onboarding_refresh_url, onboarding_return_url }
    }

    /// True when an API key is available, i.e. the hosted checkout path can be used.
    pub fn is_configured(&self) -> bool {
        !self.secret_key.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config_is_not_configured() {
        let config = StripeConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.api_base, "https://api.stripe.com");
        let config = StripeConfig { secret_key: Secret::from("sk_test_123"), ..StripeConfig::default() };
        assert!(config.is_configured());
        assert!(!format!("{config:?}").contains("sk_test_123"));
    }
}
