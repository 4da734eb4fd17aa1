use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use log::debug;
use marketplace_engine::checkout_objects::is_valid_email;

use crate::errors::ServerError;

/// The header an upstream gateway uses to pass the authenticated seller's id
pub const SELLER_ID_HEADER: &str = "mkt-seller-id";
/// The header an upstream gateway uses to pass the authenticated buyer's email address
pub const BUYER_EMAIL_HEADER: &str = "mkt-buyer-email";

fn header_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers().get(name).and_then(|v| v.to_str().ok()).map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// The seller making the request. Sessions are terminated upstream, which forwards the seller id in a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellerIdentity(pub String);

impl FromRequest for SellerIdentity {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = header_value(req, SELLER_ID_HEADER).map(SellerIdentity).ok_or_else(|| {
            debug!("💻️ Seller request to {} has no {SELLER_ID_HEADER} header", req.path());
            ServerError::MissingIdentity(format!("The {SELLER_ID_HEADER} header is required"))
        });
        ready(result)
    }
}

/// The buyer making the request, identified by email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyerIdentity(pub String);

impl FromRequest for BuyerIdentity {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match header_value(req, BUYER_EMAIL_HEADER) {
            Some(email) if is_valid_email(&email) => Ok(BuyerIdentity(email)),
            Some(email) => Err(ServerError::ValidationError(format!("'{email}' is not a valid email address"))),
            None => Err(ServerError::MissingIdentity(format!("The {BUYER_EMAIL_HEADER} header is required"))),
        };
        ready(result)
    }
}
