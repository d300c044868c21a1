//! Billing customer records, charges, and PII-safe purge for gateway-backed
//! payments.
//!
//! The crate mirrors a payment gateway's customer objects into durable local
//! records, executes charges with exact decimal-to-minor-unit conversion,
//! and scrubs payment-sensitive data on purge while retaining the record
//! itself for audit and history.
//!
//! # Example
//!
//! ```rust,ignore
//! use chargekit::{
//!     ChargeAmount, ChargeManager, Currency, CustomerManager, GatewayConfig,
//!     LifecycleManager, LiveGatewayClient,
//! };
//!
//! let client = LiveGatewayClient::with_default_config("sk_live_xxx".to_string())?;
//!
//! // Register a card captured client-side as a one-time token
//! let customers = CustomerManager::new(store.clone(), client.clone());
//! let record = customers.register("user_1", "user@example.com", "tok_visa").await?;
//!
//! // Charge an exact decimal amount in major units
//! let charges = ChargeManager::new(store.clone(), client);
//! let amount = ChargeAmount::from_major_str("10.00")?;
//! let charge = charges.charge(&record.id, amount, Currency::Usd).await?;
//! assert!(charge.paid);
//!
//! // Scrub payment data; the record and the user survive
//! let lifecycle = LifecycleManager::new(store);
//! lifecycle.purge(&record.id).await?;
//! ```

pub mod amount;
pub mod audit;
pub mod billing;
pub mod charge;
pub mod client;
pub mod customer;
pub mod error;
pub mod lifecycle;
pub mod live_client;
pub mod storage;

// Amount exports
pub use amount::{ChargeAmount, Currency, MAX_FRACTIONAL_DIGITS};

// Customer exports
pub use customer::{BillingCustomer, CardDetails, CustomerManager};

// Charge exports
pub use billing::ChargeManager;
pub use charge::Charge;

// Lifecycle exports
pub use lifecycle::LifecycleManager;

// Client exports
pub use client::{
    CardSnapshot, ChargeResponse, CreateChargeRequest, CreateCustomerRequest, CustomerResponse,
    GatewayClient,
};
pub use live_client::{GatewayConfig, InvalidApiKeyError, LiveGatewayClient};

// Storage exports
pub use storage::CustomerStore;

// Audit exports
pub use audit::{BillingAuditEvent, BillingAuditLogger, NoOpAuditLogger, TracingAuditLogger};

// Error exports
pub use error::{BillingError, Result};

// Test double exports, behind the `test-billing` feature
#[cfg(any(test, feature = "test-billing"))]
pub use client::test::MockGatewayClient;
#[cfg(any(test, feature = "test-billing"))]
pub use storage::test::InMemoryCustomerStore;
