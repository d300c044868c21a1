//! Live gateway client implementation.
//!
//! Production-ready HTTP client for the payment gateway's REST API with
//! retry logic, secure API key handling, and proper error mapping.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::client::{
    ChargeResponse, CreateChargeRequest, CreateCustomerRequest, CustomerResponse, GatewayClient,
};
use crate::error::{BillingError, Result};

/// Header carrying the per-operation idempotency key.
const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the live gateway client.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway API.
    pub endpoint: Url,
    /// Maximum number of retry attempts for transient failures.
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            // Static literal, known-valid absolute URL.
            endpoint: Url::parse("https://api.stripe.com/")
                .expect("default endpoint is a valid URL"),
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            timeout_seconds: 30,
        }
    }
}

impl GatewayConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gateway API base URL.
    #[must_use]
    pub fn endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Set maximum retry attempts.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set base delay for exponential backoff.
    #[must_use]
    pub fn base_delay_ms(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    /// Set maximum delay between retries.
    #[must_use]
    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// Set request timeout.
    #[must_use]
    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

// ============================================================================
// API Key Validation
// ============================================================================

/// Error returned when API key validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidApiKeyError {
    /// Description of why the key is invalid.
    pub reason: String,
}

impl std::fmt::Display for InvalidApiKeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid gateway API key: {}", self.reason)
    }
}

impl std::error::Error for InvalidApiKeyError {}

/// Validate a gateway API key format.
///
/// Valid formats:
/// - `sk_test_*` - Test mode secret key
/// - `sk_live_*` - Live mode secret key
/// - `rk_test_*` - Test mode restricted key
/// - `rk_live_*` - Live mode restricted key
fn validate_api_key(key: &str) -> std::result::Result<(), InvalidApiKeyError> {
    const MIN_KEY_LENGTH: usize = 20;

    if key.is_empty() {
        return Err(InvalidApiKeyError {
            reason: "API key cannot be empty".to_string(),
        });
    }

    if key.len() < MIN_KEY_LENGTH {
        return Err(InvalidApiKeyError {
            reason: format!("API key too short (minimum {} characters)", MIN_KEY_LENGTH),
        });
    }

    let valid_prefixes = ["sk_test_", "sk_live_", "rk_test_", "rk_live_"];
    if !valid_prefixes.iter().any(|prefix| key.starts_with(prefix)) {
        return Err(InvalidApiKeyError {
            reason: "API key must start with sk_test_, sk_live_, rk_test_, or rk_live_"
                .to_string(),
        });
    }

    Ok(())
}

// ============================================================================
// Live Gateway Client
// ============================================================================

/// Live gateway client for production use.
///
/// Implements [`GatewayClient`] with:
/// - Secure API key handling using `SecretString`
/// - Retry logic with exponential backoff for transient failures
/// - Idempotency key support for mutating operations
/// - Proper error mapping to `BillingError` types
///
/// # Example
///
/// ```rust,ignore
/// use chargekit::{LiveGatewayClient, GatewayConfig};
///
/// let client = LiveGatewayClient::new(
///     "sk_live_xxx".to_string(),
///     GatewayConfig::default(),
/// )?;
///
/// // Use with the billing managers
/// let charge_manager = ChargeManager::new(store, client);
/// ```
#[derive(Clone)]
pub struct LiveGatewayClient {
    http: reqwest::Client,
    config: GatewayConfig,
    api_key: SecretString,
}

impl LiveGatewayClient {
    /// Create a new live gateway client.
    ///
    /// The API key is validated and stored securely, and won't be exposed in
    /// debug output. Supports test mode (`sk_test_`), live mode (`sk_live_`),
    /// and restricted keys (`rk_*`).
    ///
    /// # Errors
    ///
    /// Returns an error if the API key format is invalid.
    pub fn new(
        api_key: impl Into<SecretString>,
        config: GatewayConfig,
    ) -> std::result::Result<Self, InvalidApiKeyError> {
        let api_key: SecretString = api_key.into();

        validate_api_key(api_key.expose_secret())?;

        Ok(Self {
            // Timeouts are applied per attempt in `with_retry`.
            http: reqwest::Client::new(),
            config,
            api_key,
        })
    }

    /// Create a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key format is invalid.
    pub fn with_default_config(
        api_key: impl Into<SecretString>,
    ) -> std::result::Result<Self, InvalidApiKeyError> {
        Self::new(api_key, GatewayConfig::default())
    }

    /// Check if the client is using a test mode API key.
    #[must_use]
    pub fn is_test_mode(&self) -> bool {
        let key = self.api_key.expose_secret();
        key.starts_with("sk_test_") || key.starts_with("rk_test_")
    }

    /// Check if the client is using a live mode API key.
    #[must_use]
    pub fn is_live_mode(&self) -> bool {
        let key = self.api_key.expose_secret();
        key.starts_with("sk_live_") || key.starts_with("rk_live_")
    }

    /// Get the configured timeout duration.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    /// Generate an idempotency key for retryable mutating operations.
    #[inline]
    fn generate_idempotency_key(operation: &str) -> String {
        format!("{}_{}", operation, uuid::Uuid::new_v4())
    }

    fn endpoint_url(&self, path: &str) -> Result<Url> {
        self.config.endpoint.join(path).map_err(|e| {
            BillingError::internal(format!("Invalid gateway endpoint path '{}': {}", path, e))
        })
    }

    /// POST a form-encoded body, retrying with one idempotency key so the
    /// gateway deduplicates across attempts.
    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        operation: &str,
        params: Vec<(String, String)>,
    ) -> Result<T> {
        let url = self.endpoint_url(path)?;
        let idempotency_key = Self::generate_idempotency_key(operation);

        with_retry(&self.config, operation, || {
            let http = self.http.clone();
            let url = url.clone();
            let api_key = self.api_key.clone();
            let idempotency_key = idempotency_key.clone();
            let params = params.clone();
            async move {
                let response = http
                    .post(url)
                    .bearer_auth(api_key.expose_secret())
                    .header(IDEMPOTENCY_KEY_HEADER, idempotency_key)
                    .form(&params)
                    .send()
                    .await
                    .map_err(TransportError::Request)?;
                decode_response(response).await
            }
        })
        .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, operation: &str) -> Result<T> {
        let url = self.endpoint_url(path)?;

        with_retry(&self.config, operation, || {
            let http = self.http.clone();
            let url = url.clone();
            let api_key = self.api_key.clone();
            async move {
                let response = http
                    .get(url)
                    .bearer_auth(api_key.expose_secret())
                    .send()
                    .await
                    .map_err(TransportError::Request)?;
                decode_response(response).await
            }
        })
        .await
    }

    async fn delete(&self, path: &str, operation: &str) -> Result<()> {
        let url = self.endpoint_url(path)?;

        with_retry(&self.config, operation, || {
            let http = self.http.clone();
            let url = url.clone();
            let api_key = self.api_key.clone();
            async move {
                let response = http
                    .delete(url)
                    .bearer_auth(api_key.expose_secret())
                    .send()
                    .await
                    .map_err(TransportError::Request)?;
                let status = response.status();
                if status.is_success() {
                    Ok(())
                } else {
                    Err(decode_api_error(response, status.as_u16()).await)
                }
            }
        })
        .await
    }
}

// Debug implementation that doesn't expose the API key
impl std::fmt::Debug for LiveGatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveGatewayClient")
            .field("config", &self.config)
            .field("is_test_mode", &self.is_test_mode())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Transport Errors
// ============================================================================

/// Low-level failure of a single request attempt.
#[derive(Debug, thiserror::Error)]
enum TransportError {
    /// The request never produced a decoded gateway response.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway answered with an error status and body.
    #[error("Gateway API error ({http_status}): {message}")]
    Api {
        http_status: u16,
        message: String,
        code: Option<String>,
    },
}

/// Error body shape used by the gateway: `{"error": {"message", "code"}}`.
#[derive(Debug, Default, Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    error: GatewayErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayErrorDetail {
    message: Option<String>,
    code: Option<String>,
}

/// Decode a response body, mapping non-2xx statuses to `TransportError::Api`.
async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> std::result::Result<T, TransportError> {
    let status = response.status();
    if status.is_success() {
        response.json::<T>().await.map_err(TransportError::Request)
    } else {
        Err(decode_api_error(response, status.as_u16()).await)
    }
}

/// Decode an error response body, preserving the gateway's message verbatim.
async fn decode_api_error(response: reqwest::Response, http_status: u16) -> TransportError {
    let body: GatewayErrorBody = response.json().await.unwrap_or_default();
    TransportError::Api {
        http_status,
        message: body
            .error
            .message
            .unwrap_or_else(|| "Unknown error".to_string()),
        code: body.error.code,
    }
}

// ============================================================================
// Retry Logic
// ============================================================================

/// Execute an async operation with retry logic and timeout.
///
/// Retries on:
/// - HTTP 429 (Rate Limited)
/// - HTTP 5xx (Server Errors)
/// - Connection failures and timeouts
async fn with_retry<T, F, Fut>(config: &GatewayConfig, operation: &str, operation_fn: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, TransportError>>,
{
    let timeout_duration = Duration::from_secs(config.timeout_seconds);
    let mut attempts = 0;

    loop {
        let result = tokio::time::timeout(timeout_duration, operation_fn()).await;

        match result {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                if !is_retryable_error(&e) || attempts >= config.max_retries {
                    return Err(map_transport_error(e, operation));
                }

                log_retry(operation, attempts, &e, config);
                sleep_with_backoff(attempts, config).await;
                attempts += 1;
            }
            Err(_timeout) => {
                if attempts >= config.max_retries {
                    return Err(BillingError::Gateway {
                        operation: operation.to_string(),
                        message: format!(
                            "Request timed out after {} seconds",
                            config.timeout_seconds
                        ),
                        code: None,
                        http_status: Some(408),
                    });
                }

                tracing::warn!(
                    target: "chargekit::gateway",
                    operation = operation,
                    attempt = attempts + 1,
                    timeout_seconds = config.timeout_seconds,
                    "Gateway API request timed out, retrying"
                );

                sleep_with_backoff(attempts, config).await;
                attempts += 1;
            }
        }
    }
}

/// Log a retry attempt.
#[inline]
fn log_retry(operation: &str, attempts: u32, error: &TransportError, config: &GatewayConfig) {
    let delay = calculate_backoff_delay(attempts, config.base_delay_ms, config.max_delay_ms);
    tracing::warn!(
        target: "chargekit::gateway",
        operation = operation,
        attempt = attempts + 1,
        delay_ms = delay.as_millis() as u64,
        error = %error,
        "Retrying gateway API call after transient error"
    );
}

/// Sleep with exponential backoff.
#[inline]
async fn sleep_with_backoff(attempts: u32, config: &GatewayConfig) {
    let delay = calculate_backoff_delay(attempts, config.base_delay_ms, config.max_delay_ms);
    tokio::time::sleep(delay).await;
}

/// Check if an error is retryable.
#[inline]
fn is_retryable_error(error: &TransportError) -> bool {
    match error {
        TransportError::Api { http_status, .. } => {
            // Rate limited (429) or server errors (5xx)
            *http_status == 429 || (500..600).contains(http_status)
        }
        TransportError::Request(e) => e.is_timeout() || e.is_connect(),
    }
}

/// Calculate backoff delay with exponential backoff and jitter.
#[inline]
fn calculate_backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    // Exponential backoff: base_ms * 2^attempt
    let delay_ms = base_ms.saturating_mul(2_u64.saturating_pow(attempt));
    let delay_ms = delay_ms.min(max_ms);

    // Add jitter (0-25% of delay)
    let jitter = if delay_ms > 0 {
        fastrand::u64(0..=delay_ms / 4)
    } else {
        0
    };
    Duration::from_millis(delay_ms.saturating_add(jitter))
}

/// Map transport errors to `BillingError` types.
fn map_transport_error(error: TransportError, operation: &str) -> BillingError {
    match error {
        TransportError::Api {
            http_status,
            message,
            code,
        } => BillingError::Gateway {
            operation: operation.to_string(),
            message,
            code,
            http_status: Some(http_status),
        },
        TransportError::Request(e) if e.is_timeout() => BillingError::Gateway {
            operation: operation.to_string(),
            message: "Request timed out".to_string(),
            code: None,
            http_status: Some(408),
        },
        TransportError::Request(e) => BillingError::Gateway {
            operation: operation.to_string(),
            message: format!("HTTP client error: {e}"),
            code: None,
            http_status: e.status().map(|s| s.as_u16()),
        },
    }
}

// ============================================================================
// GatewayClient Implementation
// ============================================================================

impl GatewayClient for LiveGatewayClient {
    async fn create_customer(&self, request: CreateCustomerRequest) -> Result<CustomerResponse> {
        let mut params = vec![
            ("email".to_string(), request.email),
            ("card".to_string(), request.card_token),
        ];
        if let Some(owner_id) = request.owner_id {
            params.push(("metadata[owner_id]".to_string(), owner_id));
        }

        self.post_form("v1/customers", "create_customer", params)
            .await
    }

    async fn retrieve_customer(&self, gateway_customer_id: &str) -> Result<CustomerResponse> {
        self.get(
            &format!("v1/customers/{}", gateway_customer_id),
            "retrieve_customer",
        )
        .await
    }

    async fn delete_customer(&self, gateway_customer_id: &str) -> Result<()> {
        self.delete(
            &format!("v1/customers/{}", gateway_customer_id),
            "delete_customer",
        )
        .await
    }

    async fn create_charge(&self, request: CreateChargeRequest) -> Result<ChargeResponse> {
        let params = vec![
            ("customer".to_string(), request.gateway_customer_id),
            ("amount".to_string(), request.amount_minor.to_string()),
            ("currency".to_string(), request.currency.code().to_string()),
        ];

        self.post_form("v1/charges", "create_charge", params).await
    }

    async fn retrieve_charge(&self, charge_id: &str) -> Result<ChargeResponse> {
        self.get(&format!("v1/charges/{}", charge_id), "retrieve_charge")
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================
