//! Purge and delete semantics for billing customer records.
//!
//! Both operations funnel into one idempotent scrub routine so their
//! outcomes are indistinguishable: payment-sensitive data is irrecoverably
//! cleared while the record's identity and the owning user account are
//! preserved. The gateway-side customer object is never touched here.

use crate::audit::{BillingAuditEvent, BillingAuditLogger, NoOpAuditLogger};
use crate::customer::BillingCustomer;
use crate::error::{BillingError, Result};
use crate::storage::CustomerStore;

/// Lifecycle operations for billing customer records.
pub struct LifecycleManager<S: CustomerStore, A: BillingAuditLogger = NoOpAuditLogger> {
    store: S,
    audit: A,
}

impl<S: CustomerStore> LifecycleManager<S> {
    /// Create a new lifecycle manager without audit logging.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            audit: NoOpAuditLogger,
        }
    }
}

impl<S: CustomerStore, A: BillingAuditLogger> LifecycleManager<S, A> {
    /// Create a lifecycle manager with an audit logger.
    #[must_use]
    pub fn with_audit_logger(store: S, audit: A) -> Self {
        Self { store, audit }
    }

    /// Irreversibly scrub payment-sensitive data from a record.
    ///
    /// Clears the owner link and all cached card metadata in a single
    /// aggregate mutation, then persists the record. The row is retained,
    /// the gateway identity survives, and the owning user account is not
    /// touched. Purging an already-purged record is a no-op that succeeds
    /// without a second persistence write.
    pub async fn purge(&self, customer_id: &str) -> Result<BillingCustomer> {
        let mut customer = self
            .store
            .find(customer_id)
            .await?
            .ok_or_else(|| BillingError::CustomerNotFound {
                customer_id: customer_id.to_string(),
            })?;

        if customer.is_purged() {
            tracing::debug!(
                target: "chargekit::lifecycle",
                customer_id = %customer.id,
                "Purge requested for already-purged record"
            );
            return Ok(customer);
        }

        customer.purge();
        self.store.save(&customer).await?;

        tracing::info!(
            target: "chargekit::lifecycle",
            customer_id = %customer.id,
            gateway_customer_id = %customer.gateway_customer_id,
            "Billing customer purged"
        );
        self.audit
            .log(BillingAuditEvent::CustomerPurged {
                customer_id: customer.id.clone(),
            })
            .await;

        Ok(customer)
    }

    /// Delete a billing customer record from the owner's perspective.
    ///
    /// A caller-facing synonym for [`purge`](Self::purge), not a separate
    /// code path: the two are guaranteed indistinguishable in outcome.
    pub async fn delete(&self, customer_id: &str) -> Result<BillingCustomer> {
        self.purge(customer_id).await
    }
}
