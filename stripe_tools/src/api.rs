use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    config::StripeConfig,
    data_objects::{AccountLink, CheckoutSession, ConnectedAccount, NewCheckoutSession},
    StripeApiError,
};

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl std::fmt::Debug for StripeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StripeApi ({})", self.config.api_base)
    }
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        if !config.is_configured() {
            return Err(StripeApiError::NotConfigured("no secret key was provided".into()));
        }
        let mut headers = HeaderMap::with_capacity(1);
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.reveal()))
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_base.trim_end_matches('/'))
    }

    /// Sends a form-encoded request and deserializes the JSON response. Stripe error bodies are unpacked into
    /// [`StripeApiError::QueryError`].
    pub async fn form_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("💳️ Sending {method} {url}");
        let mut req = self.client.request(method.clone(), url);
        if !params.is_empty() {
            req = if method == Method::GET { req.query(params) } else { req.form(params) };
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                StripeApiError::Timeout
            } else {
                StripeApiError::RestResponseError(e.to_string())
            }
        })?;
        let status = response.status();
        if status.is_success() {
            trace!("💳️ Stripe request successful. {status}");
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let body = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            let message = match serde_json::from_str::<StripeErrorBody>(&body) {
                Ok(StripeErrorBody { error }) => format!(
                    "{} ({})",
                    error.message.unwrap_or_default(),
                    error.error_type.unwrap_or_else(|| "unknown_error".into())
                ),
                Err(_) => body,
            };
            Err(StripeApiError::QueryError { status: status.as_u16(), message })
        }
    }

    pub async fn create_checkout_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<CheckoutSession, StripeApiError> {
        debug!("💳️ Creating checkout session for {}", session.client_reference_id);
        let result: CheckoutSession =
            self.form_request(Method::POST, "/checkout/sessions", &session.to_form_params()).await?;
        info!("💳️ Checkout session {} created for {}", result.id, session.client_reference_id);
        Ok(result)
    }

    pub async fn fetch_checkout_session(&self, session_id: &str) -> Result<CheckoutSession, StripeApiError> {
        let path = format!("/checkout/sessions/{session_id}");
        self.form_request(Method::GET, &path, &[]).await
    }

    /// Creates an Express connected account, the destination for a seller's payouts.
    pub async fn create_express_account(&self, email: Option<&str>) -> Result<ConnectedAccount, StripeApiError> {
        let mut params = vec![
            ("type".to_string(), "express".to_string()),
            ("capabilities[transfers][requested]".to_string(), "true".to_string()),
        ];
        if let Some(email) = email {
            params.push(("email".to_string(), email.to_string()));
        }
        let account: ConnectedAccount = self.form_request(Method::POST, "/accounts", &params).await?;
        info!("💳️ Created connected account {}", account.id);
        Ok(account)
    }

    /// Creates a single-use onboarding link for a connected account.
    pub async fn create_account_link(&self, account_id: &str) -> Result<AccountLink, StripeApiError> {
        let params = vec![
            ("account".to_string(), account_id.to_string()),
            ("refresh_url".to_string(), self.config.onboarding_refresh_url.clone()),
            ("return_url".to_string(), self.config.onboarding_return_url.clone()),
            ("type".to_string(), "account_onboarding".to_string()),
        ];
        let link: AccountLink = self.form_request(Method::POST, "/account_links", &params).await?;
        debug!("💳️ Onboarding link for {account_id} expires at {}", link.expires_at);
        Ok(link)
    }
}
