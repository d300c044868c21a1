//! Billing error types.
//!
//! Provides a granular error taxonomy for billing operations so callers can
//! distinguish local contract failures from remote gateway failures.

/// The main error type for billing operations.
///
/// Three failure families matter to callers: contract failures raised
/// locally before any I/O (`ContractViolation`, `NotChargeable`), gateway
/// failures surfaced verbatim with gateway-provided detail (`Gateway`), and
/// ambient failures (`CustomerNotFound`, `Storage`, `Internal`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BillingError {
    /// Caller supplied a malformed input, e.g. an amount that cannot be
    /// represented exactly in the currency's minor unit. Raised before any
    /// gateway call or persisted mutation.
    #[error("Contract violation: {message}")]
    ContractViolation { message: String },

    /// Charge attempted against a purged or unlinked customer. Raised
    /// before any gateway call or persisted mutation.
    #[error("Customer '{customer_id}' is not chargeable")]
    NotChargeable { customer_id: String },

    /// No billing record exists for the given customer id.
    #[error("Customer not found: {customer_id}")]
    CustomerNotFound { customer_id: String },

    /// The payment gateway rejected or could not process the request.
    /// Carries the gateway's own detail unmodified.
    #[error("Gateway error during '{operation}': {message}")]
    Gateway {
        operation: String,
        message: String,
        code: Option<String>,
        http_status: Option<u16>,
    },

    /// The customer repository failed to read or write a record.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// An unexpected internal error occurred, e.g. malformed gateway data.
    #[error("Internal billing error: {message}")]
    Internal { message: String },
}

impl BillingError {
    /// Shorthand for a contract violation with the given message.
    pub fn contract_violation(message: impl Into<String>) -> Self {
        Self::ContractViolation {
            message: message.into(),
        }
    }

    /// Shorthand for an internal error with the given message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this is a client error (caller can fix the request).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::ContractViolation { .. }
            | Self::NotChargeable { .. }
            | Self::CustomerNotFound { .. } => true,
            Self::Gateway { http_status, .. } => {
                matches!(http_status, Some(400..=499))
            }
            _ => false,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Only transient gateway conditions qualify; local contract failures
    /// are deterministic and never retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Gateway { http_status, .. } => {
                // Rate limit (429), timeouts (408), and server errors (5xx)
                matches!(http_status, Some(408) | Some(429) | Some(500..=599))
            }
            _ => false,
        }
    }
}

/// Result type alias for billing operations.
pub type Result<T> = std::result::Result<T, BillingError>;
