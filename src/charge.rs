//! Charge result entity.
//!
//! A `Charge` is transient: it reflects gateway-confirmed state at the
//! moment of execution and is not persisted by this crate.

use serde::{Deserialize, Serialize};

use crate::client::ChargeResponse;
use crate::error::{BillingError, Result};

/// A charge executed against a customer's on-file instrument.
///
/// Card fields are a snapshot of the instrument the gateway actually
/// charged, taken from the gateway response rather than the cached record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    /// Gateway-assigned charge identifier.
    pub id: String,
    /// Amount in the currency's smallest unit. Always non-negative.
    pub amount_minor: i64,
    /// Last four digits of the charged card.
    pub card_last4: String,
    /// Brand of the charged card.
    pub card_brand: String,
    /// Gateway-confirmed settlement flag.
    pub paid: bool,
    /// Whether the charge has been refunded.
    pub refunded: bool,
    /// Processing fee in minor units.
    pub fee_minor: i64,
    /// Reference to a dispute record, if any.
    pub dispute_ref: Option<String>,
    /// Creation timestamp in epoch seconds, gateway-supplied.
    pub created_at: u64,
}

impl Charge {
    /// Normalize a gateway charge response into a `Charge`.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the gateway reports a negative amount or fee;
    /// the entity's non-negativity invariant is enforced here rather than
    /// through a panicking cast.
    pub fn from_response(response: ChargeResponse) -> Result<Self> {
        if response.amount < 0 {
            return Err(BillingError::internal(format!(
                "Gateway returned negative charge amount {} for '{}'",
                response.amount, response.id
            )));
        }
        if response.fee < 0 {
            return Err(BillingError::internal(format!(
                "Gateway returned negative fee {} for '{}'",
                response.fee, response.id
            )));
        }

        Ok(Self {
            id: response.id,
            amount_minor: response.amount,
            card_last4: response.card.last4,
            card_brand: response.card.brand,
            paid: response.paid,
            refunded: response.refunded,
            fee_minor: response.fee,
            dispute_ref: response.dispute,
            created_at: response.created,
        })
    }
}
