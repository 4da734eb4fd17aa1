use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//--------------------------------------   Checkout sessions   --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLineItem {
    pub name: String,
    /// ISO currency code. Stripe expects lowercase codes.
    pub currency: String,
    /// Price per unit in the currency's minor unit
    pub unit_amount: i64,
    pub quantity: i64,
}

/// The parameters for a new hosted checkout session in `payment` mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCheckoutSession {
    pub customer_email: String,
    /// Our own reference for the purchase, echoed back in the session object
    pub client_reference_id: String,
    pub line_items: Vec<SessionLineItem>,
    pub success_url: String,
    pub cancel_url: String,
}

impl NewCheckoutSession {
    /// Stripe's API accepts `application/x-www-form-urlencoded` bodies with bracketed keys for nested values.
    pub fn to_form_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("mode".to_string(), "payment".to_string()),
            ("customer_email".to_string(), self.customer_email.clone()),
            ("client_reference_id".to_string(), self.client_reference_id.clone()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
            ("metadata[purchase_id]".to_string(), self.client_reference_id.clone()),
        ];
        for (i, item) in self.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            params.push((format!("{prefix}[price_data][currency]"), item.currency.to_ascii_lowercase()));
            params.push((format!("{prefix}[price_data][product_data][name]"), item.name.clone()));
            params.push((format!("{prefix}[price_data][unit_amount]"), item.unit_amount.to_string()));
            params.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// The hosted payment page. Absent once the session is complete or expired.
    pub url: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub client_reference_id: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
}

//--------------------------------------   Connect onboarding  --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedAccount {
    pub id: String,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub details_submitted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLink {
    pub url: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}
