use thiserror::Error;

#[derive(Debug, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Stripe is not configured: {0}")]
    NotConfigured(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("The request to Stripe timed out")]
    Timeout,
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}
