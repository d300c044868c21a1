//! Billing customer aggregate and customer management.
//!
//! The aggregate caches denormalized card metadata from the gateway and
//! owns the all-or-nothing scrub rule: every mutation that touches the
//! owner link or the card fields lives here, never in callers.

use serde::{Deserialize, Serialize};

use crate::audit::{BillingAuditEvent, BillingAuditLogger, NoOpAuditLogger};
use crate::client::{CreateCustomerRequest, GatewayClient};
use crate::error::{BillingError, Result};
use crate::storage::CustomerStore;

/// Cached card metadata for a billing customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    /// Gateway-assigned opaque hash identifying the physical card.
    pub fingerprint: String,
    /// Last four digits of the card number.
    pub last4: String,
    /// Card brand, e.g. "Visa".
    pub brand: String,
}

/// The durable billing aggregate mirroring a gateway-side customer.
///
/// The record is never physically deleted by this crate: purge scrubs the
/// owner link and card metadata in place while `gateway_customer_id` is
/// retained for audit and history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCustomer {
    /// Internal stable identifier, assigned at creation.
    pub id: String,
    /// Weak reference to the owning application user. `None` iff purged.
    pub owner_id: Option<String>,
    /// Gateway-assigned customer identifier. Assigned once, never cleared.
    pub gateway_customer_id: String,
    /// Cached card fingerprint; empty when no card is on file.
    pub card_fingerprint: String,
    /// Cached last four digits; empty when no card is on file.
    pub card_last4: String,
    /// Cached card brand; empty when no card is on file.
    pub card_brand: String,
}

impl BillingCustomer {
    /// Create a new billing customer linked to an application user.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        gateway_customer_id: impl Into<String>,
        card: CardDetails,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: Some(owner_id.into()),
            gateway_customer_id: gateway_customer_id.into(),
            card_fingerprint: card.fingerprint,
            card_last4: card.last4,
            card_brand: card.brand,
        }
    }

    /// Whether a charge can currently be executed against this record.
    ///
    /// True when the record is still linked to a user and carries a gateway
    /// identity. Inspects only local cached state; no gateway call.
    #[must_use]
    pub fn can_charge(&self) -> bool {
        self.owner_id.is_some() && !self.gateway_customer_id.is_empty()
    }

    /// Whether this record has been purged.
    #[must_use]
    pub fn is_purged(&self) -> bool {
        self.owner_id.is_none()
    }

    /// Irreversibly scrub payment-sensitive data in place.
    ///
    /// Clears the owner link and all three card fields in a single
    /// mutation so a partial scrub is never observable. The gateway
    /// identity is retained. Idempotent.
    pub fn purge(&mut self) {
        self.owner_id = None;
        self.card_fingerprint.clear();
        self.card_last4.clear();
        self.card_brand.clear();
    }

    /// Replace the cached card metadata.
    pub fn update_card(&mut self, card: CardDetails) {
        self.card_fingerprint = card.fingerprint;
        self.card_last4 = card.last4;
        self.card_brand = card.brand;
    }
}

/// Customer management operations.
///
/// Handles creating gateway customers, keeping the cached card metadata in
/// sync, and the explicit gateway-side deletion that purge deliberately
/// never performs.
pub struct CustomerManager<S: CustomerStore, C: GatewayClient, A: BillingAuditLogger = NoOpAuditLogger>
{
    store: S,
    client: C,
    audit: A,
}

impl<S: CustomerStore, C: GatewayClient> CustomerManager<S, C> {
    /// Create a new customer manager without audit logging.
    #[must_use]
    pub fn new(store: S, client: C) -> Self {
        Self {
            store,
            client,
            audit: NoOpAuditLogger,
        }
    }
}

impl<S: CustomerStore, C: GatewayClient, A: BillingAuditLogger> CustomerManager<S, C, A> {
    /// Create a customer manager with an audit logger.
    #[must_use]
    pub fn with_audit_logger(store: S, client: C, audit: A) -> Self {
        Self { store, client, audit }
    }

    /// Register a payment method for an application user.
    ///
    /// Creates the gateway customer with the captured card token, caches
    /// the returned card metadata, and persists a new billing record. This
    /// is the only way a billing record comes into existence.
    pub async fn register(
        &self,
        owner_id: &str,
        email: &str,
        card_token: &str,
    ) -> Result<BillingCustomer> {
        let response = self
            .client
            .create_customer(CreateCustomerRequest {
                email: email.to_string(),
                card_token: card_token.to_string(),
                owner_id: Some(owner_id.to_string()),
            })
            .await?;

        let card = response
            .active_card
            .map(|c| CardDetails {
                fingerprint: c.fingerprint,
                last4: c.last4,
                brand: c.brand,
            })
            .unwrap_or_default();

        let customer = BillingCustomer::new(
            uuid::Uuid::new_v4().to_string(),
            owner_id,
            response.id,
            card,
        );
        self.store.save(&customer).await?;

        tracing::info!(
            target: "chargekit::customer",
            customer_id = %customer.id,
            gateway_customer_id = %customer.gateway_customer_id,
            "Billing customer registered"
        );
        self.audit
            .log(BillingAuditEvent::CustomerRegistered {
                customer_id: customer.id.clone(),
                gateway_customer_id: customer.gateway_customer_id.clone(),
            })
            .await;

        Ok(customer)
    }

    /// Refresh the cached card metadata from the gateway.
    ///
    /// Overwrites the three card fields from the gateway customer's active
    /// card; clears them if the gateway reports no card on file.
    pub async fn refresh_card(&self, customer_id: &str) -> Result<BillingCustomer> {
        let mut customer = self.find_required(customer_id).await?;

        let response = self
            .client
            .retrieve_customer(&customer.gateway_customer_id)
            .await?;

        let card = response
            .active_card
            .map(|c| CardDetails {
                fingerprint: c.fingerprint,
                last4: c.last4,
                brand: c.brand,
            })
            .unwrap_or_default();
        customer.update_card(card);
        self.store.save(&customer).await?;

        self.audit
            .log(BillingAuditEvent::CardUpdated {
                customer_id: customer.id.clone(),
            })
            .await;

        Ok(customer)
    }

    /// Permanently delete the gateway-side customer object.
    ///
    /// This is a separate, explicit operation: purge only scrubs the local
    /// cache and leaves the gateway untouched.
    pub async fn delete_gateway_customer(&self, customer_id: &str) -> Result<()> {
        let customer = self.find_required(customer_id).await?;
        self.client
            .delete_customer(&customer.gateway_customer_id)
            .await?;

        tracing::info!(
            target: "chargekit::customer",
            customer_id = %customer.id,
            gateway_customer_id = %customer.gateway_customer_id,
            "Gateway-side customer deleted"
        );
        self.audit
            .log(BillingAuditEvent::GatewayCustomerDeleted {
                customer_id: customer.id.clone(),
                gateway_customer_id: customer.gateway_customer_id.clone(),
            })
            .await;
        Ok(())
    }

    async fn find_required(&self, customer_id: &str) -> Result<BillingCustomer> {
        self.store
            .find(customer_id)
            .await?
            .ok_or_else(|| BillingError::CustomerNotFound {
                customer_id: customer_id.to_string(),
            })
    }
}
