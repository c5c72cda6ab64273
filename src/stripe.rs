//! Stripe implementation of [`BillingClient`] over blocking HTTP.
//!
//! Each call is a single request with no client-side retry. Identifiers are
//! pushed as encoded path segments, so codes containing `/` or spaces reach
//! the right resource.

use crate::billing::{BillingClient, BillingError, CouponRequest};
use log::debug;
use reqwest::blocking::{Client, Request};
use reqwest::header::RETRY_AFTER;
use reqwest::{Method, Url};
use serde::Deserialize;
use std::time::Duration;

/// Production API root.
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Default timeout for a single request in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Error envelope returned with every non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

/// The parts of a mutation response we check.
#[derive(Debug, Deserialize)]
struct Acknowledgement {
    id: Option<String>,
    deleted: Option<bool>,
}

/// Stripe API client authenticated with a secret key.
pub struct StripeClient {
    http: Client,
    api_base: Url,
    secret_key: String,
}

impl StripeClient {
    /// Creates a client against `api_base` with a per-request timeout.
    pub fn new(
        secret_key: impl Into<String>,
        api_base: &str,
        timeout: Duration,
    ) -> Result<Self, BillingError> {
        let api_base = Url::parse(api_base)
            .map_err(|e| BillingError::InvalidUrl(format!("{}: {}", api_base, e)))?;
        if api_base.cannot_be_a_base() {
            return Err(BillingError::InvalidUrl(api_base.to_string()));
        }

        let http = Client::builder().timeout(timeout).build()?;

        Ok(StripeClient {
            http,
            api_base,
            secret_key: secret_key.into(),
        })
    }

    /// Builds `<api_base>/v1/<segments...>`.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BillingError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| BillingError::InvalidUrl(self.api_base.to_string()))?
            .pop_if_empty()
            .push("v1")
            .extend(segments);
        Ok(url)
    }

    fn delete_request(&self, resource: &str, id: &str) -> Result<Request, BillingError> {
        let url = self.endpoint(&[resource, id])?;
        Ok(self
            .http
            .request(Method::DELETE, url)
            .bearer_auth(&self.secret_key)
            .build()?)
    }

    fn create_coupon_request(&self, coupon: &CouponRequest) -> Result<Request, BillingError> {
        let url = self.endpoint(&["coupons"])?;
        Ok(self
            .http
            .post(url)
            .bearer_auth(&self.secret_key)
            .form(coupon)
            .build()?)
    }

    /// Sends one request and maps the response onto success or a typed error.
    fn execute(&self, request: Request) -> Result<(), BillingError> {
        let method = request.method().clone();
        let path = request.url().path().to_string();

        let response = self.http.execute(request)?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text()?;
        debug!("{} {} -> {}", method, path, status);

        if !status.is_success() {
            return Err(error_from_response(status.as_u16(), retry_after, &body));
        }

        check_acknowledgement(&body)
    }
}

/// Decodes a non-2xx response into a [`BillingError`].
fn error_from_response(status: u16, retry_after: Option<Duration>, body: &str) -> BillingError {
    if status == 429 {
        return BillingError::RateLimited { retry_after };
    }

    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let ErrorBody {
                kind,
                code,
                message,
            } = envelope.error;
            let message = message
                .or(kind)
                .unwrap_or_else(|| "unknown error".to_string());
            BillingError::Api {
                status,
                code,
                message,
            }
        }
        Err(_) => {
            let trimmed = body.trim();
            BillingError::Api {
                status,
                code: None,
                message: if trimmed.is_empty() {
                    "empty response body".to_string()
                } else {
                    trimmed.to_string()
                },
            }
        }
    }
}

/// A 2xx body must be a JSON object; deletions must say they happened.
fn check_acknowledgement(body: &str) -> Result<(), BillingError> {
    let ack: Acknowledgement = serde_json::from_str(body)
        .map_err(|e| BillingError::InvalidResponse(format!("unexpected body: {}", e)))?;

    if ack.deleted == Some(false) {
        return Err(BillingError::InvalidResponse(format!(
            "{} was not deleted",
            ack.id.as_deref().unwrap_or("object")
        )));
    }

    Ok(())
}

impl BillingClient for StripeClient {
    fn cancel_subscription(&self, id: &str) -> Result<(), BillingError> {
        let request = self.delete_request("subscriptions", id)?;
        self.execute(request)
    }

    fn delete_customer(&self, id: &str) -> Result<(), BillingError> {
        let request = self.delete_request("customers", id)?;
        self.execute(request)
    }

    fn create_coupon(&self, coupon: &CouponRequest) -> Result<(), BillingError> {
        let request = self.create_coupon_request(coupon)?;
        self.execute(request)
    }

    fn delete_coupon(&self, id: &str) -> Result<(), BillingError> {
        let request = self.delete_request("coupons", id)?;
        self.execute(request)
    }
}
