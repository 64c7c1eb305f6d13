//! Common constants used throughout the gcore-dns01 service

//==============================================================================
// G-Core API Constants
//==============================================================================

/// G-Core DNS API base URL
pub const GCORE_API_BASE: &str = "https://api.gcore.com/dns";

/// User agent string for G-Core API requests
pub const GCORE_USER_AGENT: &str = concat!("gcore-dns01/", env!("CARGO_PKG_VERSION"));

/// Authorization scheme expected by the G-Core API
pub const GCORE_AUTH_SCHEME: &str = "APIKey";

//==============================================================================
// ACME Constants
//==============================================================================

/// Leftmost label of every DNS-01 challenge record
pub const ACME_CHALLENGE_LABEL: &str = "_acme-challenge";

//==============================================================================
// TTL, Timeout and Retry Constants
//==============================================================================

/// Default TTL for challenge TXT records in seconds
pub const DEFAULT_TTL_SECS: u32 = 120;

/// Minimum accepted TTL in seconds
pub const MIN_TTL_SECS: u32 = 60;

/// Maximum accepted TTL in seconds
pub const MAX_TTL_SECS: u32 = 86_400;

/// Default HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Minimum HTTP request timeout in seconds
pub const MIN_TIMEOUT_SECS: u64 = 1;

/// Maximum HTTP request timeout in seconds
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Default number of attempts for one-shot CLI operations
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Maximum number of attempts for one-shot CLI operations
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;

/// Base delay for exponential backoff in seconds
pub const BACKOFF_BASE_SECS: u64 = 2;

/// Maximum delay for exponential backoff in seconds
pub const BACKOFF_MAX_SECS: u64 = 30;

/// Maximum exponent for exponential backoff
pub const BACKOFF_MAX_EXPONENT: u64 = 10;

//==============================================================================
// Validation Constants
//==============================================================================

/// Minimum API token length in characters
pub const MIN_API_TOKEN_LENGTH: usize = 16;

/// Maximum DNS record name length in characters
pub const MAX_RECORD_NAME_LENGTH: usize = 253;

/// Maximum DNS label length in characters
pub const MAX_LABEL_LENGTH: usize = 63;

//==============================================================================
// Server Constants
//==============================================================================

/// Default listen address for the HTTP surface
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

//==============================================================================
// Environment Variable Names
//==============================================================================

/// Environment variable name for the G-Core API token
pub const ENV_API_TOKEN: &str = "GCORE_API_TOKEN";

/// Environment variable name for the G-Core API base URL
pub const ENV_API_URL: &str = "GCORE_API_URL";

/// Environment variable name for the default TXT record TTL
pub const ENV_TTL: &str = "GCORE_TTL";

/// Environment variable name for the HTTP listen address
pub const ENV_LISTEN_ADDR: &str = "DNS01_LISTEN_ADDR";

/// Environment variable name for the CLI attempt limit
pub const ENV_MAX_ATTEMPTS: &str = "DNS01_MAX_ATTEMPTS";

/// Environment variable name for the provider type
pub const ENV_PROVIDER_TYPE: &str = "DNS01_PROVIDER_TYPE";
