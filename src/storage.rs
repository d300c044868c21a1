//! Storage trait for billing customer records.
//!
//! Implement this trait to persist billing customers to your database.
//! An in-memory implementation is provided for testing.

use async_trait::async_trait;

use crate::customer::BillingCustomer;
use crate::error::Result;

/// Repository for billing customer records.
///
/// Concrete storage technology is an external concern; this crate only
/// requires point lookups and whole-record saves.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Look up a customer by internal id.
    async fn find(&self, customer_id: &str) -> Result<Option<BillingCustomer>>;

    /// Look up a customer by its gateway-assigned identifier.
    ///
    /// Works for purged records too: the gateway identity is retained
    /// after a scrub.
    async fn find_by_gateway_id(
        &self,
        gateway_customer_id: &str,
    ) -> Result<Option<BillingCustomer>>;

    /// Save or overwrite a customer record.
    async fn save(&self, customer: &BillingCustomer) -> Result<()>;
}

/// In-memory customer store for testing.
#[cfg(any(test, feature = "test-billing"))]
pub mod test {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    /// In-memory customer store for testing.
    ///
    /// Wraps data in Arc for cheap cloning.
    #[derive(Default, Clone)]
    pub struct InMemoryCustomerStore {
        customers: Arc<RwLock<HashMap<String, BillingCustomer>>>,
    }

    impl InMemoryCustomerStore {
        /// Create a new in-memory store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// All stored customers (for test assertions).
        pub fn all_customers(&self) -> Vec<BillingCustomer> {
            self.customers.read().unwrap().values().cloned().collect()
        }
    }

    #[async_trait]
    impl CustomerStore for InMemoryCustomerStore {
        async fn find(&self, customer_id: &str) -> Result<Option<BillingCustomer>> {
            Ok(self.customers.read().unwrap().get(customer_id).cloned())
        }

        async fn find_by_gateway_id(
            &self,
            gateway_customer_id: &str,
        ) -> Result<Option<BillingCustomer>> {
            let customers = self.customers.read().unwrap();
            Ok(customers
                .values()
                .find(|c| c.gateway_customer_id == gateway_customer_id)
                .cloned())
        }

        async fn save(&self, customer: &BillingCustomer) -> Result<()> {
            self.customers
                .write()
                .unwrap()
                .insert(customer.id.clone(), customer.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test::InMemoryCustomerStore;
    use super::*;
    use crate::customer::CardDetails;

    #[tokio::test]
    async fn test_in_memory_store_roundtrip() {
        let store = InMemoryCustomerStore::new();

        assert!(store.find("bc_1").await.unwrap().is_none());

        let customer = BillingCustomer::new(
            "bc_1",
            "user_1",
            "cus_abc",
            CardDetails {
                fingerprint: "fp".to_string(),
                last4: "4242".to_string(),
                brand: "Visa".to_string(),
            },
        );
        store.save(&customer).await.unwrap();

        let loaded = store.find("bc_1").await.unwrap().unwrap();
        assert_eq!(loaded, customer);

        let by_gateway = store.find_by_gateway_id("cus_abc").await.unwrap().unwrap();
        assert_eq!(by_gateway.id, "bc_1");

        assert!(store
            .find_by_gateway_id("cus_other")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_existing_record() {
        let store = InMemoryCustomerStore::new();

        let mut customer =
            BillingCustomer::new("bc_1", "user_1", "cus_abc", CardDetails::default());
        store.save(&customer).await.unwrap();

        customer.purge();
        store.save(&customer).await.unwrap();

        let loaded = store.find("bc_1").await.unwrap().unwrap();
        assert!(loaded.is_purged());
        assert_eq!(store.all_customers().len(), 1);
    }
}
