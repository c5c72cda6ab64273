//! # Billing Batch
//!
//! One-shot batch mutations against a billing provider, driven by rows of a
//! delimited export: cancel subscriptions or delete customers whose field
//! starts with a prefix, or create/delete single-use coupons from a list.
//!
//! ## Design Principles
//!
//! - **One call in flight**: identifiers are mutated strictly in row order
//! - **Fixed pacing**: a pause follows every remote call to stay under the
//!   provider's rate limit
//! - **Halt on failure**: the first rejected call stops the batch
//! - **Fail-fast decoding**: an undecodable file mutates nothing unless the
//!   skip policy is chosen
//!
//! ## Example
//!
//! ```no_run
//! use billing_batch::{run_pipeline, BatchMutator, Pipeline, RunOptions, StripeClient};
//! use std::time::Duration;
//!
//! let client = StripeClient::new("sk_test_...", "https://api.stripe.com", Duration::from_secs(30)).unwrap();
//! let options = RunOptions { prefix: Some("💰".to_string()), ..RunOptions::default() };
//! let mut mutator = BatchMutator::new(Duration::from_millis(100));
//! run_pipeline(Pipeline::RemoveSubscriptions, &options, &client, &mut mutator).unwrap();
//! ```

pub mod billing;
pub mod config;
pub mod error;
pub mod mutator;
pub mod pipeline;
pub mod row;
pub mod selection;
pub mod stripe;

pub use billing::{BillingClient, BillingError, CouponRequest};
pub use error::{BatchError, Result};
pub use mutator::{BatchMutator, Pacer, RunSummary, ThreadPacer, DEFAULT_DELAY};
pub use pipeline::{run_pipeline, Pipeline, RunOptions};
pub use row::{DecodePolicy, Row, RowSource};
pub use selection::{FieldMapping, Selection};
pub use stripe::StripeClient;
