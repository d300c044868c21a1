//! Gateway client capability trait and wire types.
//!
//! This abstraction allows testing without real gateway calls and supports
//! different gateway client implementations. Managers accept a client at
//! construction; tests supply a deterministic mock instead of patching any
//! global state.

use serde::{Deserialize, Serialize};

use crate::amount::Currency;
use crate::error::Result;

/// Request to create a gateway-side customer with a card on file.
#[derive(Debug, Clone)]
pub struct CreateCustomerRequest {
    /// Customer email address.
    pub email: String,
    /// One-time card token obtained from the gateway's capture flow.
    pub card_token: String,
    /// The owning application user id, attached as gateway metadata.
    pub owner_id: Option<String>,
}

/// Request to create a charge against a gateway customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateChargeRequest {
    /// Gateway-assigned customer identifier.
    pub gateway_customer_id: String,
    /// Amount in the currency's smallest unit.
    pub amount_minor: i64,
    /// Charge currency.
    pub currency: Currency,
}

/// Card details as reported by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSnapshot {
    /// Gateway-assigned opaque hash identifying the physical card.
    /// Absent on charge responses.
    #[serde(default)]
    pub fingerprint: String,
    /// Last four digits of the card number.
    pub last4: String,
    /// Card brand, e.g. "Visa".
    #[serde(rename = "type")]
    pub brand: String,
}

/// A charge as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeResponse {
    /// Gateway-assigned charge identifier.
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// Snapshot of the instrument the gateway actually charged.
    pub card: CardSnapshot,
    /// Gateway-confirmed settlement flag.
    pub paid: bool,
    /// Whether the charge has been refunded.
    pub refunded: bool,
    /// Processing fee in minor units.
    pub fee: i64,
    /// Reference to a dispute record, if any.
    pub dispute: Option<String>,
    /// Creation timestamp in epoch seconds, gateway-supplied.
    pub created: u64,
}

/// A customer as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerResponse {
    /// Gateway-assigned customer identifier.
    pub id: String,
    /// The card currently on file, if any.
    #[serde(default)]
    pub active_card: Option<CardSnapshot>,
}

/// Trait for payment gateway operations.
///
/// The sole network-facing surface of this crate. Implementations must not
/// retain ambient/global configuration; everything they need is supplied at
/// construction.
#[allow(async_fn_in_trait)]
pub trait GatewayClient: Send + Sync {
    /// Create a gateway-side customer with a card on file.
    async fn create_customer(&self, request: CreateCustomerRequest) -> Result<CustomerResponse>;

    /// Retrieve a gateway customer.
    async fn retrieve_customer(&self, gateway_customer_id: &str) -> Result<CustomerResponse>;

    /// Permanently delete a gateway-side customer object.
    ///
    /// Never invoked by purge; see `LifecycleManager`.
    async fn delete_customer(&self, gateway_customer_id: &str) -> Result<()>;

    /// Create a charge against a customer's on-file instrument.
    async fn create_charge(&self, request: CreateChargeRequest) -> Result<ChargeResponse>;

    /// Retrieve full details for an existing charge.
    async fn retrieve_charge(&self, charge_id: &str) -> Result<ChargeResponse>;
}

/// Mock gateway client for testing.
#[cfg(any(test, feature = "test-billing"))]
pub mod test {
    use super::*;
    use crate::error::BillingError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::RwLock;

    /// Mock gateway client with scriptable responses and call recording.
    ///
    /// By default it fabricates plausible responses; tests can pin a fixed
    /// charge response or make the next call fail.
    #[derive(Default)]
    pub struct MockGatewayClient {
        id_counter: AtomicU64,
        customers: RwLock<HashMap<String, CustomerResponse>>,
        charges: RwLock<HashMap<String, ChargeResponse>>,
        charge_template: RwLock<Option<ChargeResponse>>,
        charge_requests: RwLock<Vec<CreateChargeRequest>>,
        fail_next: RwLock<Option<BillingError>>,
    }

    impl MockGatewayClient {
        /// Create a new mock client.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Pin the response returned for subsequent charge creations.
        pub fn set_charge_response(&self, response: ChargeResponse) {
            *self.charge_template.write().unwrap() = Some(response);
        }

        /// Make the next client call fail with the given error.
        pub fn fail_next_with(&self, error: BillingError) {
            *self.fail_next.write().unwrap() = Some(error);
        }

        /// All charge-create requests issued so far (for test assertions).
        pub fn charge_requests(&self) -> Vec<CreateChargeRequest> {
            self.charge_requests.read().unwrap().clone()
        }

        /// Number of charge-create calls issued so far.
        pub fn charge_call_count(&self) -> usize {
            self.charge_requests.read().unwrap().len()
        }

        /// Seed a gateway customer so `retrieve_customer` can find it.
        pub fn seed_customer(&self, customer: CustomerResponse) {
            self.customers
                .write()
                .unwrap()
                .insert(customer.id.clone(), customer);
        }

        fn take_failure(&self) -> Option<BillingError> {
            self.fail_next.write().unwrap().take()
        }

        fn next_id(&self, prefix: &str) -> String {
            format!("{}_test_{}", prefix, self.id_counter.fetch_add(1, Ordering::SeqCst))
        }
    }

    impl GatewayClient for MockGatewayClient {
        async fn create_customer(
            &self,
            request: CreateCustomerRequest,
        ) -> Result<CustomerResponse> {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            let response = CustomerResponse {
                id: self.next_id("cus"),
                active_card: Some(CardSnapshot {
                    fingerprint: format!("fp_{}", request.card_token),
                    last4: "4242".to_string(),
                    brand: "Visa".to_string(),
                }),
            };
            self.customers
                .write()
                .unwrap()
                .insert(response.id.clone(), response.clone());
            Ok(response)
        }

        async fn retrieve_customer(&self, gateway_customer_id: &str) -> Result<CustomerResponse> {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            self.customers
                .read()
                .unwrap()
                .get(gateway_customer_id)
                .cloned()
                .ok_or_else(|| BillingError::Gateway {
                    operation: "retrieve_customer".to_string(),
                    message: format!("No such customer: {}", gateway_customer_id),
                    code: Some("resource_missing".to_string()),
                    http_status: Some(404),
                })
        }

        async fn delete_customer(&self, gateway_customer_id: &str) -> Result<()> {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            self.customers.write().unwrap().remove(gateway_customer_id);
            Ok(())
        }

        async fn create_charge(&self, request: CreateChargeRequest) -> Result<ChargeResponse> {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            self.charge_requests.write().unwrap().push(request.clone());

            let response = match self.charge_template.read().unwrap().clone() {
                Some(template) => template,
                None => ChargeResponse {
                    id: self.next_id("ch"),
                    amount: request.amount_minor,
                    card: CardSnapshot {
                        fingerprint: String::new(),
                        last4: "4242".to_string(),
                        brand: "Visa".to_string(),
                    },
                    paid: true,
                    refunded: false,
                    fee: 0,
                    dispute: None,
                    created: 1_700_000_000,
                },
            };
            self.charges
                .write()
                .unwrap()
                .insert(response.id.clone(), response.clone());
            Ok(response)
        }

        async fn retrieve_charge(&self, charge_id: &str) -> Result<ChargeResponse> {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            self.charges
                .read()
                .unwrap()
                .get(charge_id)
                .cloned()
                .ok_or_else(|| BillingError::Gateway {
                    operation: "retrieve_charge".to_string(),
                    message: format!("No such charge: {}", charge_id),
                    code: Some("resource_missing".to_string()),
                    http_status: Some(404),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test::MockGatewayClient;
    use super::*;
    use crate::BillingError;

    #[tokio::test]
    async fn test_mock_records_charge_requests() {
        let client = MockGatewayClient::new();

        let request = CreateChargeRequest {
            gateway_customer_id: "cus_1".to_string(),
            amount_minor: 1000,
            currency: Currency::Usd,
        };
        client.create_charge(request.clone()).await.unwrap();

        assert_eq!(client.charge_call_count(), 1);
        assert_eq!(client.charge_requests()[0], request);
    }

    #[tokio::test]
    async fn test_mock_create_then_retrieve_charge() {
        let client = MockGatewayClient::new();

        let created = client
            .create_charge(CreateChargeRequest {
                gateway_customer_id: "cus_1".to_string(),
                amount_minor: 250,
                currency: Currency::Eur,
            })
            .await
            .unwrap();

        let retrieved = client.retrieve_charge(&created.id).await.unwrap();
        assert_eq!(retrieved, created);
        assert_eq!(retrieved.amount, 250);
    }

    #[tokio::test]
    async fn test_mock_fail_next() {
        let client = MockGatewayClient::new();
        client.fail_next_with(BillingError::Gateway {
            operation: "create_charge".to_string(),
            message: "Your card was declined".to_string(),
            code: Some("card_declined".to_string()),
            http_status: Some(402),
        });

        let result = client
            .create_charge(CreateChargeRequest {
                gateway_customer_id: "cus_1".to_string(),
                amount_minor: 1000,
                currency: Currency::Usd,
            })
            .await;
        assert!(result.is_err());
        // A failed call is not recorded as an issued charge
        assert_eq!(client.charge_call_count(), 0);
    }

    #[test]
    fn test_charge_response_wire_shape() {
        let json = r#"{
            "id": "ch_XXXXXX",
            "card": {"last4": "4323", "type": "Visa"},
            "amount": 1000,
            "paid": true,
            "refunded": false,
            "fee": 499,
            "dispute": null,
            "created": 1363911708
        }"#;

        let response: ChargeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.amount, 1000);
        assert_eq!(response.card.last4, "4323");
        assert_eq!(response.card.brand, "Visa");
        assert!(response.card.fingerprint.is_empty());
        assert_eq!(response.fee, 499);
        assert!(response.dispute.is_none());
        assert_eq!(response.created, 1363911708);
    }

    #[test]
    fn test_customer_response_wire_shape() {
        let json = r#"{
            "id": "cus_xxxxxxxxxxxxxxx",
            "active_card": {"fingerprint": "YYYYYYYY", "last4": "2342", "type": "Visa"}
        }"#;

        let response: CustomerResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.id, "cus_xxxxxxxxxxxxxxx");
        let card = response.active_card.unwrap();
        assert_eq!(card.fingerprint, "YYYYYYYY");
        assert_eq!(card.last4, "2342");

        let no_card: CustomerResponse = serde_json::from_str(r#"{"id": "cus_2"}"#).unwrap();
        assert!(no_card.active_card.is_none());
    }
}
