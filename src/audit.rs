//! Audit logging for billing operations.
//!
//! Provides a trait-based audit logging system for tracking billing events.
//! This is useful for compliance, debugging, and security monitoring.

use std::fmt;

/// Audit event types for billing operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingAuditEvent {
    /// Billing customer registered with a card on file.
    CustomerRegistered {
        customer_id: String,
        gateway_customer_id: String,
    },
    /// Cached card metadata replaced.
    CardUpdated { customer_id: String },
    /// Charge executed and confirmed by the gateway.
    ChargeSucceeded {
        customer_id: String,
        charge_id: String,
        amount_minor: i64,
        currency: String,
    },
    /// Charge attempt failed.
    ChargeFailed {
        customer_id: String,
        reason: String,
    },
    /// Payment-sensitive data scrubbed from a record.
    CustomerPurged { customer_id: String },
    /// Gateway-side customer object deleted (explicit operation).
    GatewayCustomerDeleted {
        customer_id: String,
        gateway_customer_id: String,
    },
}

impl fmt::Display for BillingAuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CustomerRegistered { customer_id, gateway_customer_id } => {
                write!(f, "Customer registered: customer={}, gateway={}", customer_id, gateway_customer_id)
            }
            Self::CardUpdated { customer_id } => {
                write!(f, "Card updated: customer={}", customer_id)
            }
            Self::ChargeSucceeded { customer_id, charge_id, amount_minor, currency } => {
                write!(f, "Charge succeeded: customer={}, charge={}, amount_minor={}, currency={}", customer_id, charge_id, amount_minor, currency)
            }
            Self::ChargeFailed { customer_id, reason } => {
                write!(f, "Charge failed: customer={}, reason={}", customer_id, reason)
            }
            Self::CustomerPurged { customer_id } => {
                write!(f, "Customer purged: customer={}", customer_id)
            }
            Self::GatewayCustomerDeleted { customer_id, gateway_customer_id } => {
                write!(f, "Gateway customer deleted: customer={}, gateway={}", customer_id, gateway_customer_id)
            }
        }
    }
}

/// Trait for audit logging backends.
///
/// Implement this trait to integrate with your logging system (e.g.,
/// database, external service, file-based logging). Implementations should
/// handle failures gracefully to avoid disrupting billing operations.
#[allow(async_fn_in_trait)]
pub trait BillingAuditLogger: Send + Sync {
    /// Log a billing audit event.
    async fn log(&self, event: BillingAuditEvent);
}

/// No-op audit logger that does nothing.
///
/// Use this when audit logging is not needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAuditLogger;

impl BillingAuditLogger for NoOpAuditLogger {
    async fn log(&self, _event: BillingAuditEvent) {
        // No-op
    }
}

/// Tracing-based audit logger.
///
/// Logs audit events using the `tracing` crate at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

impl BillingAuditLogger for TracingAuditLogger {
    async fn log(&self, event: BillingAuditEvent) {
        tracing::info!(
            target: "chargekit::audit",
            event_type = %event_kind(&event),
            "{}", event
        );
    }
}

/// Get the event kind as a string for structured logging.
fn event_kind(event: &BillingAuditEvent) -> &'static str {
    match event {
        BillingAuditEvent::CustomerRegistered { .. } => "customer_registered",
        BillingAuditEvent::CardUpdated { .. } => "card_updated",
        BillingAuditEvent::ChargeSucceeded { .. } => "charge_succeeded",
        BillingAuditEvent::ChargeFailed { .. } => "charge_failed",
        BillingAuditEvent::CustomerPurged { .. } => "customer_purged",
        BillingAuditEvent::GatewayCustomerDeleted { .. } => "gateway_customer_deleted",
    }
}
