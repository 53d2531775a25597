//! Configuration module for the OCI Generative AI client.
//!
//! Holds the per-request timeout/retry options, their three-level merge, and
//! the client configuration (region, compartment, endpoint).

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;
use url::Url;

use crate::errors::{GenAiError, GenAiResult};

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default maximum retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry, in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;

/// Default upper bound for a single retry delay, in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

/// Default region when none is configured.
pub const DEFAULT_REGION: &str = "us-chicago-1";

/// Path of the chat action, relative to the endpoint.
pub const CHAT_PATH: &str = "/20231130/actions/chat";

/// Inference endpoint for a region.
pub fn regional_endpoint(region: &str) -> String {
    format!("https://inference.generativeai.{}.oci.oraclecloud.com", region)
}

/// Retry overrides as they appear on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryOptions {
    /// Whether retries are enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Retries after the first attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// Delay before the first retry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,
    /// Upper bound for a single delay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

/// Timeout and retry overrides, at object level or per call.
///
/// Every field is optional; unset fields fall through to the next level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    /// Per-attempt timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Retry overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryOptions>,
}

impl RequestOptions {
    /// Options with only a timeout
    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        Self {
            timeout_ms: Some(timeout_ms),
            retry: None,
        }
    }

    /// Options that turn retries off
    pub fn without_retry() -> Self {
        Self {
            timeout_ms: None,
            retry: Some(RetryOptions {
                enabled: Some(false),
                ..Default::default()
            }),
        }
    }
}

/// Fully resolved retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Whether retries are enabled
    pub enabled: bool,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay_ms: u64,
    /// Upper bound for a single delay
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

/// Fully resolved request options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRequestOptions {
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
    /// Retry settings
    pub retry: RetrySettings,
}

impl Default for ResolvedRequestOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry: RetrySettings::default(),
        }
    }
}

impl ResolvedRequestOptions {
    /// Per-attempt timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Merge request options field by field: per-call, then object level, then defaults.
pub fn resolve_request_options(
    object_level: Option<&RequestOptions>,
    per_call: Option<&RequestOptions>,
) -> GenAiResult<ResolvedRequestOptions> {
    let defaults = ResolvedRequestOptions::default();
    let object_retry = object_level.and_then(|o| o.retry.as_ref());
    let call_retry = per_call.and_then(|o| o.retry.as_ref());

    fn pick<T: Copy>(
        call: Option<&RetryOptions>,
        object: Option<&RetryOptions>,
        field: fn(&RetryOptions) -> Option<T>,
        default: T,
    ) -> T {
        call.and_then(field)
            .or_else(|| object.and_then(field))
            .unwrap_or(default)
    }

    let resolved = ResolvedRequestOptions {
        timeout_ms: per_call
            .and_then(|o| o.timeout_ms)
            .or_else(|| object_level.and_then(|o| o.timeout_ms))
            .unwrap_or(defaults.timeout_ms),
        retry: RetrySettings {
            enabled: pick(call_retry, object_retry, |r| r.enabled, defaults.retry.enabled),
            max_retries: pick(
                call_retry,
                object_retry,
                |r| r.max_retries,
                defaults.retry.max_retries,
            ),
            base_delay_ms: pick(
                call_retry,
                object_retry,
                |r| r.base_delay_ms,
                defaults.retry.base_delay_ms,
            ),
            max_delay_ms: pick(
                call_retry,
                object_retry,
                |r| r.max_delay_ms,
                defaults.retry.max_delay_ms,
            ),
        },
    };

    validate(&resolved)?;
    Ok(resolved)
}

fn validate(options: &ResolvedRequestOptions) -> GenAiResult<()> {
    if options.timeout_ms == 0 {
        return Err(GenAiError::Configuration {
            message: "timeoutMs must be greater than 0".to_string(),
        });
    }
    if options.retry.base_delay_ms == 0 {
        return Err(GenAiError::Configuration {
            message: "retry.baseDelayMs must be greater than 0".to_string(),
        });
    }
    if options.retry.max_delay_ms < options.retry.base_delay_ms {
        return Err(GenAiError::Configuration {
            message: format!(
                "retry.maxDelayMs ({}) must be at least retry.baseDelayMs ({})",
                options.retry.max_delay_ms, options.retry.base_delay_ms
            ),
        });
    }
    Ok(())
}

/// Configuration for the OCI Generative AI client.
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    /// OCI region, e.g. `us-chicago-1`
    pub region: String,
    /// Default compartment for requests
    pub compartment_id: Option<String>,
    /// Inference endpoint without trailing slash
    pub endpoint: String,
    /// Object-level request options
    pub request_options: RequestOptions,
    /// Custom headers to include in requests
    pub custom_headers: Vec<(String, String)>,
    /// Emit every parsed chunk as a raw part before its derived parts
    pub include_raw_chunks: bool,
}

impl GenAiConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> GenAiConfigBuilder {
        GenAiConfigBuilder::new()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OCI_REGION` (optional): region, defaults to `us-chicago-1`
    /// - `OCI_COMPARTMENT_ID` (optional): default compartment
    /// - `OCI_GENAI_ENDPOINT` (optional): endpoint override
    /// - `OCI_GENAI_TIMEOUT_MS` (optional): request timeout in milliseconds
    /// - `OCI_GENAI_MAX_RETRIES` (optional): maximum retries
    pub fn from_env() -> GenAiResult<Self> {
        let mut builder = GenAiConfigBuilder::new();

        if let Ok(region) = std::env::var("OCI_REGION") {
            builder = builder.region(region);
        }

        if let Ok(compartment_id) = std::env::var("OCI_COMPARTMENT_ID") {
            builder = builder.compartment_id(compartment_id);
        }

        if let Ok(endpoint) = std::env::var("OCI_GENAI_ENDPOINT") {
            builder = builder.endpoint(endpoint);
        }

        if let Ok(timeout_str) = std::env::var("OCI_GENAI_TIMEOUT_MS") {
            let timeout_ms = timeout_str
                .parse::<u64>()
                .map_err(|_| GenAiError::Configuration {
                    message: format!("OCI_GENAI_TIMEOUT_MS is not a number: {}", timeout_str),
                })?;
            builder = builder.timeout_ms(timeout_ms);
        }

        if let Ok(retries_str) = std::env::var("OCI_GENAI_MAX_RETRIES") {
            let retries = retries_str
                .parse::<u32>()
                .map_err(|_| GenAiError::Configuration {
                    message: format!("OCI_GENAI_MAX_RETRIES is not a number: {}", retries_str),
                })?;
            builder = builder.max_retries(retries);
        }

        builder.build()
    }

    /// Returns the full URL for a path on the endpoint.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    /// URL of the chat action
    pub fn chat_url(&self) -> String {
        self.endpoint_url(CHAT_PATH)
    }

    /// Resolve object-level options against per-call overrides.
    pub fn resolve(&self, per_call: Option<&RequestOptions>) -> GenAiResult<ResolvedRequestOptions> {
        resolve_request_options(Some(&self.request_options), per_call)
    }
}

/// Builder for `GenAiConfig`.
#[derive(Debug, Default)]
pub struct GenAiConfigBuilder {
    region: Option<String>,
    compartment_id: Option<String>,
    endpoint: Option<String>,
    request_options: RequestOptions,
    custom_headers: Vec<(String, String)>,
    include_raw_chunks: bool,
}

impl GenAiConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the default compartment.
    pub fn compartment_id(mut self, compartment_id: impl Into<String>) -> Self {
        self.compartment_id = Some(compartment_id.into());
        self
    }

    /// Overrides the regional endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the object-level request options, replacing earlier timeout/retry calls.
    pub fn request_options(mut self, options: RequestOptions) -> Self {
        self.request_options = options;
        self
    }

    /// Sets the request timeout in milliseconds.
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_options.timeout_ms = Some(timeout_ms);
        self
    }

    /// Sets the maximum retries.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.request_options
            .retry
            .get_or_insert_with(RetryOptions::default)
            .max_retries = Some(max_retries);
        self
    }

    /// Adds a custom header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Emit raw chunks ahead of their derived parts.
    pub fn include_raw_chunks(mut self, include: bool) -> Self {
        self.include_raw_chunks = include;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> GenAiResult<GenAiConfig> {
        let region = self.region.unwrap_or_else(|| DEFAULT_REGION.to_string());
        if region.trim().is_empty() {
            return Err(GenAiError::Configuration {
                message: "Region cannot be empty".to_string(),
            });
        }

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| regional_endpoint(&region))
            .trim_end_matches('/')
            .to_string();

        let parsed = Url::parse(&endpoint)?;
        if parsed.scheme() != "https" && !is_loopback(&parsed) {
            return Err(GenAiError::Configuration {
                message: "Endpoint must use HTTPS".to_string(),
            });
        }

        // Fail on bad object-level options at build time rather than first call.
        resolve_request_options(Some(&self.request_options), None)?;

        Ok(GenAiConfig {
            region,
            compartment_id: self.compartment_id,
            endpoint,
            request_options: self.request_options,
            custom_headers: self.custom_headers,
            include_raw_chunks: self.include_raw_chunks,
        })
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}
