//! End-to-end billing flows over the public trait surface.
//!
//! These tests wire the managers to hand-rolled fakes rather than the
//! crate's built-in test doubles, exercising exactly what an application
//! embedding the crate would implement.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chargekit::{
    BillingCustomer, BillingError, CardSnapshot, ChargeAmount, ChargeManager, ChargeResponse,
    CreateChargeRequest, CreateCustomerRequest, Currency, CustomerManager, CustomerResponse,
    CustomerStore, GatewayClient, LifecycleManager,
};

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default, Clone)]
struct FakeStore {
    customers: Arc<RwLock<HashMap<String, BillingCustomer>>>,
}

#[async_trait]
impl CustomerStore for FakeStore {
    async fn find(&self, customer_id: &str) -> chargekit::Result<Option<BillingCustomer>> {
        Ok(self.customers.read().unwrap().get(customer_id).cloned())
    }

    async fn find_by_gateway_id(
        &self,
        gateway_customer_id: &str,
    ) -> chargekit::Result<Option<BillingCustomer>> {
        Ok(self
            .customers
            .read()
            .unwrap()
            .values()
            .find(|c| c.gateway_customer_id == gateway_customer_id)
            .cloned())
    }

    async fn save(&self, customer: &BillingCustomer) -> chargekit::Result<()> {
        self.customers
            .write()
            .unwrap()
            .insert(customer.id.clone(), customer.clone());
        Ok(())
    }
}

/// Gateway fake that answers every charge with a fixed response and records
/// what it was asked.
#[derive(Default, Clone)]
struct RecordingGateway {
    charge_requests: Arc<RwLock<Vec<CreateChargeRequest>>>,
}

impl RecordingGateway {
    fn charge_requests(&self) -> Vec<CreateChargeRequest> {
        self.charge_requests.read().unwrap().clone()
    }

    fn fixture_charge() -> ChargeResponse {
        ChargeResponse {
            id: "ch_XXXXXX".to_string(),
            amount: 1000,
            card: CardSnapshot {
                fingerprint: String::new(),
                last4: "4323".to_string(),
                brand: "Visa".to_string(),
            },
            paid: true,
            refunded: false,
            fee: 499,
            dispute: None,
            created: 1363911708,
        }
    }
}

impl GatewayClient for RecordingGateway {
    async fn create_customer(
        &self,
        _request: CreateCustomerRequest,
    ) -> chargekit::Result<CustomerResponse> {
        Ok(CustomerResponse {
            id: "cus_xxxxxxxxxxxxxxx".to_string(),
            active_card: Some(CardSnapshot {
                fingerprint: "YYYYYYYY".to_string(),
                last4: "2342".to_string(),
                brand: "Visa".to_string(),
            }),
        })
    }

    async fn retrieve_customer(
        &self,
        gateway_customer_id: &str,
    ) -> chargekit::Result<CustomerResponse> {
        Ok(CustomerResponse {
            id: gateway_customer_id.to_string(),
            active_card: None,
        })
    }

    async fn delete_customer(&self, _gateway_customer_id: &str) -> chargekit::Result<()> {
        Ok(())
    }

    async fn create_charge(
        &self,
        request: CreateChargeRequest,
    ) -> chargekit::Result<ChargeResponse> {
        self.charge_requests.write().unwrap().push(request);
        Ok(Self::fixture_charge())
    }

    async fn retrieve_charge(&self, _charge_id: &str) -> chargekit::Result<ChargeResponse> {
        Ok(Self::fixture_charge())
    }
}

/// Stand-in for the application's own user table, to assert that billing
/// purges never touch the user account.
#[derive(Default, Clone)]
struct UserDirectory {
    users: Arc<RwLock<HashSet<String>>>,
}

impl UserDirectory {
    fn add(&self, user_id: &str) {
        self.users.write().unwrap().insert(user_id.to_string());
    }

    fn exists(&self, user_id: &str) -> bool {
        self.users.read().unwrap().contains(user_id)
    }
}

async fn register_patrick(
    store: &FakeStore,
    gateway: &RecordingGateway,
    users: &UserDirectory,
) -> BillingCustomer {
    users.add("user_patrick");
    let manager = CustomerManager::new(store.clone(), gateway.clone());
    manager
        .register("user_patrick", "patrick@example.com", "tok_visa")
        .await
        .unwrap()
}

// ============================================================================
// Flows
// ============================================================================

#[tokio::test]
async fn test_register_then_charge_major_units() {
    let store = FakeStore::default();
    let gateway = RecordingGateway::default();
    let users = UserDirectory::default();

    let record = register_patrick(&store, &gateway, &users).await;
    assert_eq!(record.card_last4, "2342");
    assert!(record.can_charge());

    let charges = ChargeManager::new(store.clone(), gateway.clone());
    let amount = ChargeAmount::from_major_str("10.00").unwrap();
    let charge = charges
        .charge(&record.id, amount, Currency::Usd)
        .await
        .unwrap();

    // The wire carries minor units
    let requests = gateway.charge_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount_minor, 1000);
    assert_eq!(requests[0].gateway_customer_id, "cus_xxxxxxxxxxxxxxx");

    // Response normalized into the charge entity
    assert!(charge.paid);
    assert!(!charge.refunded);
    assert_eq!(charge.amount_minor, 1000);
    assert_eq!(charge.fee_minor, 499);
    assert_eq!(charge.card_last4, "4323");
    assert!(charge.dispute_ref.is_none());
    assert_eq!(charge.created_at, 1363911708);
}

#[tokio::test]
async fn test_purge_scrubs_but_keeps_record_and_user() {
    let store = FakeStore::default();
    let gateway = RecordingGateway::default();
    let users = UserDirectory::default();

    let record = register_patrick(&store, &gateway, &users).await;

    let lifecycle = LifecycleManager::new(store.clone());
    lifecycle.purge(&record.id).await.unwrap();

    let purged = store.find(&record.id).await.unwrap().unwrap();
    assert!(purged.owner_id.is_none());
    assert_eq!(purged.card_fingerprint, "");
    assert_eq!(purged.card_last4, "");
    assert_eq!(purged.card_brand, "");
    // Gateway identity survives
    assert_eq!(purged.gateway_customer_id, "cus_xxxxxxxxxxxxxxx");

    // The user account is untouched
    assert!(users.exists("user_patrick"));
}

#[tokio::test]
async fn test_delete_is_indistinguishable_from_purge() {
    let store_a = FakeStore::default();
    let store_b = FakeStore::default();
    let gateway = RecordingGateway::default();
    let users = UserDirectory::default();

    let record_a = register_patrick(&store_a, &gateway, &users).await;
    let record_b = register_patrick(&store_b, &gateway, &users).await;

    LifecycleManager::new(store_a.clone())
        .purge(&record_a.id)
        .await
        .unwrap();
    LifecycleManager::new(store_b.clone())
        .delete(&record_b.id)
        .await
        .unwrap();

    let purged = store_a.find(&record_a.id).await.unwrap().unwrap();
    let mut deleted = store_b.find(&record_b.id).await.unwrap().unwrap();
    // Records differ only in their generated internal ids
    deleted.id = purged.id.clone();
    assert_eq!(purged, deleted);
    assert!(users.exists("user_patrick"));
}

#[tokio::test]
async fn test_charge_after_purge_makes_no_gateway_call() {
    let store = FakeStore::default();
    let gateway = RecordingGateway::default();
    let users = UserDirectory::default();

    let record = register_patrick(&store, &gateway, &users).await;
    LifecycleManager::new(store.clone())
        .purge(&record.id)
        .await
        .unwrap();

    let charges = ChargeManager::new(store, gateway.clone());
    let amount = ChargeAmount::from_major_str("10.00").unwrap();
    let err = charges
        .charge(&record.id, amount, Currency::Usd)
        .await
        .unwrap_err();

    assert!(matches!(err, BillingError::NotChargeable { .. }));
    assert!(err.is_client_error());
    assert!(gateway.charge_requests().is_empty());
}

#[tokio::test]
async fn test_purge_twice_converges() {
    let store = FakeStore::default();
    let gateway = RecordingGateway::default();
    let users = UserDirectory::default();

    let record = register_patrick(&store, &gateway, &users).await;

    let lifecycle = LifecycleManager::new(store.clone());
    let once = lifecycle.purge(&record.id).await.unwrap();
    let twice = lifecycle.delete(&record.id).await.unwrap();
    assert_eq!(once, twice);
}

#[tokio::test]
async fn test_inexact_amount_rejected_before_gateway() {
    let store = FakeStore::default();
    let gateway = RecordingGateway::default();
    let users = UserDirectory::default();

    let record = register_patrick(&store, &gateway, &users).await;

    let charges = ChargeManager::new(store, gateway.clone());
    let amount = ChargeAmount::from_major_str("10.50").unwrap();
    let err = charges
        .charge(&record.id, amount, Currency::Jpy)
        .await
        .unwrap_err();

    assert!(matches!(err, BillingError::ContractViolation { .. }));
    assert!(gateway.charge_requests().is_empty());
}
