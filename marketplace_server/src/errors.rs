use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use marketplace_engine::{
    db_types::PurchaseId,
    traits::CatalogError,
    CheckoutError,
    ReportingError,
};
use stripe_tools::StripeApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("The request was not valid. {0}")]
    ValidationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("No caller identity was provided. {0}")]
    MissingIdentity(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The request conflicts with the current state of the resource. {0}")]
    Conflict(String),
    #[error("The payment provider is unavailable. {reason}")]
    ProviderUnavailable { purchase_id: PurchaseId, reason: String },
    #[error("The notification could not be authenticated. {0}")]
    UnauthenticatedEvent(String),
    #[error("An upstream service returned an error. {0}")]
    UpstreamError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::UnauthenticatedEvent(_) => StatusCode::BAD_REQUEST,
            Self::MissingIdentity(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            Self::ProviderUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            // The purchase still exists, so the client needs its id to retry the checkout
            Self::ProviderUnavailable { purchase_id, .. } => {
                serde_json::json!({ "error": self.to_string(), "purchase_id": purchase_id })
            },
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::InvalidRequest(_) | CheckoutError::InvalidCart | CheckoutError::MixedCurrencies(_) => {
                Self::ValidationError(e.to_string())
            },
            CheckoutError::ProviderUnavailable { purchase_id, reason } => {
                Self::ProviderUnavailable { purchase_id, reason }
            },
            CheckoutError::UnauthenticatedEvent(msg) => Self::UnauthenticatedEvent(msg),
            CheckoutError::PurchaseNotFound(_) => Self::NoRecordFound(e.to_string()),
            CheckoutError::PurchaseNotPending { .. } |
            CheckoutError::DirectSettlementNotAllowed(_) |
            CheckoutError::InvalidTransition(_) => Self::Conflict(e.to_string()),
            CheckoutError::DatabaseError(msg) => {
                error!("💻️ Database error during checkout. {msg}");
                Self::BackendError(msg)
            },
        }
    }
}

impl From<CatalogError> for ServerError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            CatalogError::NegativePrice |
            CatalogError::InvalidProduct(_) |
            CatalogError::InvalidIncrement(_) |
            CatalogError::UpdateNoOp => Self::ValidationError(e.to_string()),
            CatalogError::DatabaseError(msg) => {
                error!("💻️ Catalog database error. {msg}");
                Self::BackendError(msg)
            },
        }
    }
}

impl From<ReportingError> for ServerError {
    fn from(e: ReportingError) -> Self {
        match e {
            ReportingError::QueryError(msg) => Self::ValidationError(msg),
            ReportingError::DatabaseError(msg) => {
                error!("💻️ Reporting database error. {msg}");
                Self::BackendError(msg)
            },
        }
    }
}

impl From<StripeApiError> for ServerError {
    fn from(e: StripeApiError) -> Self {
        match e {
            StripeApiError::NotConfigured(_) | StripeApiError::Initialization(_) => {
                Self::ConfigurationError(e.to_string())
            },
            e => Self::UpstreamError(e.to_string()),
        }
    }
}
