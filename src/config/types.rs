use serde::Deserialize;

/// 2.5 MiB
pub const DEFAULT_MAX_PAGE_BYTES: usize = 2_621_440;

/// 10 MiB
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 10_485_760;

pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Rotation pool used when the config does not name its own agents
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
];

/// Main configuration structure
///
/// Every section is optional; an empty document yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub crawl: CrawlConfig,
    pub normalize: NormalizeConfig,
    pub analysis: AnalysisConfig,
}

/// Fetcher behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Total attempts per URL, including the first one
    pub max_attempts: u32,

    /// First backoff delay after a 403/429 (milliseconds)
    pub retry_base_delay_ms: u64,

    /// Upper bound for the backoff delay (milliseconds)
    pub retry_max_delay_ms: u64,

    /// Per-attempt request timeout (seconds)
    pub timeout_secs: u64,

    pub connect_timeout_secs: u64,

    /// Per-page body ceiling in bytes
    pub max_page_bytes: usize,

    pub max_redirects: usize,

    /// Value of the Accept header sent with every fetch
    pub accept: String,

    /// User-Agent strings rotated across attempts
    pub user_agents: Vec<String>,

    /// Disables the public-address guard (local testing only)
    pub allow_private_addresses: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            retry_base_delay_ms: 1_000,
            retry_max_delay_ms: 8_000,
            timeout_secs: 15,
            connect_timeout_secs: 10,
            max_page_bytes: DEFAULT_MAX_PAGE_BYTES,
            max_redirects: 10,
            accept: DEFAULT_ACCEPT.to_string(),
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            allow_private_addresses: false,
        }
    }
}

/// Crawl (frontier) configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Maximum simultaneous in-flight fetches within one crawl
    pub concurrency: usize,

    /// Soft ceiling on bytes consumed across one crawl
    pub max_total_bytes: u64,

    /// Optional deadline for the expansion phase (seconds)
    pub max_duration_secs: Option<u64>,

    pub respect_robots_txt: bool,

    /// Domain patterns (e.g. "*.example.com") never expanded into
    pub exclude_domains: Vec<String>,

    /// Skip merging pages whose body is byte-identical to one already merged
    pub dedupe_content: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
            max_duration_secs: None,
            respect_robots_txt: false,
            exclude_domains: Vec::new(),
            dedupe_content: true,
        }
    }
}

/// Text normalization configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NormalizeConfig {
    pub remove_stopwords: bool,

    /// Seed the stopword set with the built-in English list
    pub use_default_stopwords: bool,

    pub extra_stopwords: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            remove_stopwords: false,
            use_default_stopwords: true,
            extra_stopwords: Vec::new(),
        }
    }
}

/// Language-model analysis configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AnalysisConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`)
    pub api_base_url: String,

    pub model: String,

    /// Name of the environment variable holding the API key
    pub api_key_env: String,

    pub timeout_secs: u64,

    pub max_input_tokens: usize,

    pub max_output_tokens: u32,

    pub temperature: f32,

    /// Replaces the built-in system prompt when set
    pub system_prompt: Option<String>,

    /// JSON schema (as text) describing the expected report fields
    pub schema: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "LLM_API_KEY".to_string(),
            timeout_secs: 30,
            max_input_tokens: 6_000,
            max_output_tokens: 800,
            temperature: 0.0,
            system_prompt: None,
            schema: None,
        }
    }
}
