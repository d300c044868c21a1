//! Charge execution against a customer's on-file payment instrument.
//!
//! `ChargeManager` enforces the local contracts (chargeability, exact
//! minor-unit conversion) before any gateway I/O, then delegates to the
//! injected `GatewayClient` and normalizes its response. Gateway failures
//! are surfaced to the caller unmodified; retry policy, if any, belongs to
//! the client's transport layer.

use crate::amount::{ChargeAmount, Currency};
use crate::audit::{BillingAuditEvent, BillingAuditLogger, NoOpAuditLogger};
use crate::charge::Charge;
use crate::client::{CreateChargeRequest, GatewayClient};
use crate::customer::BillingCustomer;
use crate::error::{BillingError, Result};
use crate::storage::CustomerStore;

/// Charge execution operations.
///
/// Generic over the store, gateway client, and audit logger so tests can
/// supply deterministic fakes for each.
pub struct ChargeManager<S: CustomerStore, C: GatewayClient, A: BillingAuditLogger = NoOpAuditLogger>
{
    store: S,
    client: C,
    audit: A,
}

impl<S: CustomerStore, C: GatewayClient> ChargeManager<S, C> {
    /// Create a new charge manager without audit logging.
    #[must_use]
    pub fn new(store: S, client: C) -> Self {
        Self {
            store,
            client,
            audit: NoOpAuditLogger,
        }
    }
}

impl<S: CustomerStore, C: GatewayClient, A: BillingAuditLogger> ChargeManager<S, C, A> {
    /// Create a charge manager with an audit logger.
    #[must_use]
    pub fn with_audit_logger(store: S, client: C, audit: A) -> Self {
        Self { store, client, audit }
    }

    /// Execute a charge against the customer's on-file instrument.
    ///
    /// The amount is an exact decimal in major units and is converted to
    /// minor units before the gateway call; the conversion never rounds.
    /// Contract failures (`ContractViolation`, `NotChargeable`) are raised
    /// locally and guarantee zero gateway calls and zero persisted
    /// mutation.
    pub async fn charge(
        &self,
        customer_id: &str,
        amount: ChargeAmount,
        currency: Currency,
    ) -> Result<Charge> {
        let customer = self.find_required(customer_id).await?;

        if !customer.can_charge() {
            self.audit
                .log(BillingAuditEvent::ChargeFailed {
                    customer_id: customer_id.to_string(),
                    reason: "not chargeable".to_string(),
                })
                .await;
            return Err(BillingError::NotChargeable {
                customer_id: customer_id.to_string(),
            });
        }

        let amount_minor = amount.to_minor_units(currency)?;

        let created = match self
            .client
            .create_charge(CreateChargeRequest {
                gateway_customer_id: customer.gateway_customer_id.clone(),
                amount_minor,
                currency,
            })
            .await
        {
            Ok(response) => response,
            Err(err) => {
                self.audit
                    .log(BillingAuditEvent::ChargeFailed {
                        customer_id: customer_id.to_string(),
                        reason: err.to_string(),
                    })
                    .await;
                return Err(err);
            }
        };

        // The create response can be partial; retrieve for full details.
        let full = self.client.retrieve_charge(&created.id).await?;
        let charge = Charge::from_response(full)?;

        tracing::info!(
            target: "chargekit::billing",
            customer_id = %customer.id,
            charge_id = %charge.id,
            amount_minor,
            currency = %currency,
            paid = charge.paid,
            "Charge executed"
        );
        self.audit
            .log(BillingAuditEvent::ChargeSucceeded {
                customer_id: customer.id.clone(),
                charge_id: charge.id.clone(),
                amount_minor: charge.amount_minor,
                currency: currency.code().to_string(),
            })
            .await;

        Ok(charge)
    }

    /// Whether the customer currently has an active, non-purged instrument.
    ///
    /// Pure local predicate; performs no gateway call.
    pub async fn can_charge(&self, customer_id: &str) -> Result<bool> {
        let customer = self.find_required(customer_id).await?;
        Ok(customer.can_charge())
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
