//! The billing provider as seen by the pipelines.
//!
//! Every operation is a one-way mutation of remote state. Implementations
//! must not retry on their own; the caller decides what a failure means.

use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by a billing client.
#[derive(Debug, Error)]
pub enum BillingError {
    /// The provider answered with a non-success status
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The provider throttled the request
    #[error("rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl BillingError {
    /// Check if repeating the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            BillingError::RateLimited { .. } => true,
            BillingError::Api { status, .. } => *status >= 500,
            BillingError::Network(_) => true,
            BillingError::InvalidUrl(_) => false,
            BillingError::InvalidResponse(_) => false,
        }
    }

    /// Check if the target record does not exist (already deleted, typo'd id).
    pub fn is_not_found(&self) -> bool {
        match self {
            BillingError::Api { status, code, .. } => {
                *status == 404 || code.as_deref() == Some("resource_missing")
            }
            _ => false,
        }
    }
}

/// A coupon to create on the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponRequest {
    /// Coupon code; also what customers type at checkout.
    pub id: String,

    /// Display name.
    pub name: String,

    pub percent_off: Decimal,

    pub max_redemptions: u32,
}

impl CouponRequest {
    /// A coupon that zeroes one invoice once, named after its code.
    pub fn single_use_full_discount(code: impl Into<String>) -> Self {
        let code = code.into();
        CouponRequest {
            name: code.clone(),
            id: code,
            percent_off: Decimal::ONE_HUNDRED,
            max_redemptions: 1,
        }
    }
}

/// Remote mutations the pipelines need from the billing provider.
pub trait BillingClient {
    /// Cancels a subscription immediately.
    fn cancel_subscription(&self, id: &str) -> Result<(), BillingError>;

    /// Permanently deletes a customer.
    fn delete_customer(&self, id: &str) -> Result<(), BillingError>;

    fn create_coupon(&self, coupon: &CouponRequest) -> Result<(), BillingError>;

    fn delete_coupon(&self, id: &str) -> Result<(), BillingError>;
}
