// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "AIQA";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "aiqa";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for HTTP port
pub const ENV_PORT: &str = "PORT";

/// Environment variable for OTLP gRPC port
pub const ENV_GRPC_PORT: &str = "GRPC_PORT";

/// Environment variable for server host
pub const ENV_HOST: &str = "AIQA_HOST";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "AIQA_LOG";

// =============================================================================
// Environment Variables - Backing stores
// =============================================================================

/// Environment variable for the SQL store URL
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Environment variable for the search engine URL
pub const ENV_ELASTICSEARCH_URL: &str = "ELASTICSEARCH_URL";

/// Environment variable for the rate-limit store URL
pub const ENV_REDIS_URL: &str = "REDIS_URL";

// =============================================================================
// Environment Variables - Auth
// =============================================================================

/// Environment variable for the bootstrap admin email
pub const ENV_ADMIN_EMAIL: &str = "AIQA_ADMIN_EMAIL";

/// Environment variable for the JWT verification secret
pub const ENV_JWT_SECRET: &str = "AIQA_JWT_SECRET";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default HTTP port (OTLP/HTTP convention)
pub const DEFAULT_PORT: u16 = 4318;

/// Default gRPC port (OTLP/gRPC convention)
pub const DEFAULT_GRPC_PORT: u16 = 4317;

/// Maximum OTLP request body size (8 MB)
pub const OTLP_BODY_LIMIT: usize = 8 * 1024 * 1024;

/// Default REST request body size (2 MB)
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Graceful shutdown budget for background tasks
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// gRPC graceful-stop budget before force stop
pub const GRPC_SHUTDOWN_GRACE_SECS: u64 = 2;

// =============================================================================
// Postgres
// =============================================================================

pub const POSTGRES_MAX_CONNECTIONS: u32 = 10;
pub const POSTGRES_MIN_CONNECTIONS: u32 = 1;
pub const POSTGRES_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Cache
// =============================================================================

/// Cache key version prefix (bump to invalidate all cached data)
pub const CACHE_KEY_VERSION: &str = "v1";

/// Max entries for the in-memory cache backend
pub const CACHE_MAX_ENTRIES: u64 = 50_000;

/// TTL for positive API key lookups (seconds)
pub const CACHE_TTL_API_KEY_VALID: u64 = 60;

/// TTL for negative API key lookups (seconds)
pub const CACHE_TTL_API_KEY_INVALID: u64 = 30;

/// TTL for organisation lookups (seconds)
pub const CACHE_TTL_ORG: u64 = 60;

// =============================================================================
// Rate limiting (sliding window)
// =============================================================================

/// Sliding window duration for span ingestion quotas
pub const RATE_LIMIT_WINDOW_SECS: u64 = 3600;

/// Expiry refreshed on the window key on every record (2x window)
pub const RATE_LIMIT_KEY_EXPIRY_SECS: u64 = 7200;

// =============================================================================
// Search engine
// =============================================================================

/// Alias for the span index
pub const SPAN_INDEX_ALIAS: &str = "spans";

/// Alias for the dataset-example index
pub const EXAMPLE_INDEX_ALIAS: &str = "dataset_examples";

/// Attribute values serialising over this many bytes are moved to
/// `unindexed_attributes`
pub const UNINDEXED_VALUE_THRESHOLD: usize = 32 * 1024;

/// Bounded retries for org-scoped optimistic span updates
pub const SPAN_UPDATE_MAX_RETRIES: u32 = 3;

// =============================================================================
// Scoring
// =============================================================================

/// Wall-clock budget for one sandboxed metric script
pub const SANDBOX_TIMEOUT_SECS: u64 = 5;

/// Loop-iteration ceiling inside the sandbox (bounds runaway scripts that
/// never yield to the wall clock)
pub const SANDBOX_LOOP_LIMIT: u64 = 50_000_000;

/// Timeout for outbound LLM judge calls
pub const JUDGE_REQUEST_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// Experiments
// =============================================================================

/// Default maximum number of examples fetched by the runner
pub const DEFAULT_EXAMPLE_LIMIT: usize = 10_000;

/// Default page size for list endpoints
pub const DEFAULT_LIST_LIMIT: usize = 100;

// =============================================================================
// Span attributes
// =============================================================================

/// Attribute stamped on a span when an Example is created from it
pub const EXAMPLE_ATTR: &str = "aiqa.example";

/// GenAI usage attribute keys rolled up into parent spans
pub const ATTR_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";
pub const ATTR_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";
pub const ATTR_CACHED_INPUT_TOKENS: &str = "gen_ai.usage.cached_input_tokens";
pub const ATTR_TOTAL_TOKENS: &str = "gen_ai.usage.total_tokens";
pub const ATTR_COST_USD: &str = "gen_ai.usage.cost";
