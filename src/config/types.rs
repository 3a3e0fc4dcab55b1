use serde::Deserialize;

/// Main configuration structure for Sumi-Sieve
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub fetch: FetchConfig,
    pub marketplace: MarketplaceConfig,
    #[serde(rename = "structured-data", default)]
    pub structured_data: Vec<PayloadSource>,
    pub links: LinksConfig,
    #[serde(rename = "next-page")]
    pub next_page: NextPageConfig,
    pub total: TotalConfig,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

/// Crawl loop behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of pages fetched in parallel
    pub concurrency: u32,

    /// Results the marketplace serves per search page
    #[serde(rename = "per-page")]
    pub per_page: u32,

    /// Page ceiling past which the marketplace stops serving results
    #[serde(rename = "safety-cap")]
    pub safety_cap: u32,

    /// Page count used when the total could not be estimated
    #[serde(rename = "fallback-pages")]
    pub fallback_pages: u32,

    /// Upper bound for incremental pagination
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Minimum links on a page to assume more pages exist without a "next" button
    #[serde(rename = "min-results")]
    pub min_results: usize,

    /// Fixed delay before each request (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Extra delay per worker slot, spreading requests apart (milliseconds)
    #[serde(rename = "jitter-ms")]
    pub jitter_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// What to do when page 1 gives no usable total
    #[serde(rename = "unknown-total", default)]
    pub unknown_total: UnknownTotalPolicy,
}

/// Pagination policy when the result total is unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownTotalPolicy {
    /// Follow pages one at a time while they look like they continue
    #[default]
    Incremental,
    /// Crawl a fixed number of pages concurrently
    Fallback,
}

/// Request header configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    pub referer: String,

    #[serde(rename = "accept-language")]
    pub accept_language: String,
}

/// Target marketplace configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceConfig {
    /// Marketplace domain; one subdomain label in front is accepted
    pub domain: String,

    /// Query parameter carrying the result page number
    #[serde(rename = "page-param")]
    pub page_param: String,

    /// Template for a listing's short link; `{id}` is replaced by the listing id
    #[serde(rename = "short-link", default)]
    pub short_link: Option<String>,
}

/// A machine-generated JSON payload embedded in the page
#[derive(Debug, Clone, Deserialize)]
pub struct PayloadSource {
    /// Name used in logs
    pub name: String,

    /// CSS selector of the element carrying the payload
    pub selector: String,

    /// Attribute holding the payload; the element text is used when absent
    #[serde(default)]
    pub attribute: Option<String>,
}

/// Listing-link extraction configuration (search pages)
#[derive(Debug, Clone, Deserialize)]
pub struct LinksConfig {
    /// Regex a normalized listing URL must match
    #[serde(rename = "listing-pattern")]
    pub listing_pattern: String,

    pub strategies: Vec<StrategyConfig>,
}

/// "Next page" affordance detection
#[derive(Debug, Clone, Deserialize)]
pub struct NextPageConfig {
    /// Anchor texts meaning "next page"
    pub labels: Vec<String>,

    /// Selector of pagination buttons searched as a last resort
    #[serde(rename = "button-selector")]
    pub button_selector: String,

    /// Text a pagination button must contain
    #[serde(rename = "button-text")]
    pub button_text: String,
}

/// Total-count estimation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TotalConfig {
    /// JSON keys holding a result count
    #[serde(rename = "count-keys")]
    pub count_keys: Vec<String>,

    /// Words that follow a result count in visible text ("1.240 resultados")
    #[serde(rename = "result-words")]
    pub result_words: Vec<String>,

    /// Internal field names searched in the raw markup
    #[serde(rename = "raw-fields")]
    pub raw_fields: Vec<String>,

    /// Raw-markup counts at or below this value are ignored
    #[serde(rename = "min-plausible")]
    pub min_plausible: u64,
}

/// One logical field and its strategy chain
#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    pub name: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub normalizer: NormalizerConfig,

    pub strategies: Vec<StrategyConfig>,
}

/// One entry of a strategy table
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    /// Provenance tag reported with values this strategy produced
    pub name: String,

    /// Explicit priority; entries without one keep their position
    #[serde(default)]
    pub rank: Option<u32>,

    #[serde(flatten)]
    pub kind: StrategyKindConfig,
}

/// Strategy kinds
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StrategyKindConfig {
    /// Key lookup in embedded JSON payloads
    StructuredData {
        keys: Vec<String>,
        #[serde(default)]
        within: Vec<String>,
        #[serde(default)]
        properties: Vec<String>,
        #[serde(rename = "max-depth", default = "default_max_depth")]
        max_depth: usize,
    },

    /// CSS selector lookup
    Selector {
        selector: String,
        #[serde(default)]
        attribute: Option<String>,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        pattern: Option<String>,
        #[serde(rename = "first-text", default)]
        first_text: bool,
    },

    /// Value node next to a label node
    LabeledValue { label: String },

    /// `<meta>` content or `<title>` text
    Meta {
        names: Vec<String>,
        #[serde(default)]
        pattern: Option<String>,
    },

    /// Regex over the page text
    Pattern {
        pattern: String,
        #[serde(default)]
        source: TextSource,
        #[serde(rename = "min-value", default)]
        min_value: Option<u64>,
    },

    /// Regex over the page URL
    UrlPattern {
        pattern: String,
        #[serde(default)]
        slug: bool,
    },
}

/// Which text a pattern strategy scans
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextSource {
    /// Visible text, text nodes joined by single spaces
    #[default]
    Text,
    /// The page source as fetched
    Raw,
}

/// Value cleaning and shape validation
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NormalizerConfig {
    /// Free text with length bounds
    Text {
        #[serde(rename = "min-len", default = "default_min_len")]
        min_len: usize,
        #[serde(rename = "max-len", default = "default_max_len")]
        max_len: usize,
        #[serde(default)]
        strip: Vec<String>,
        #[serde(default)]
        reject: Vec<String>,
        #[serde(rename = "title-case", default)]
        title_case: bool,
    },

    /// Currency-prefixed price
    Currency {
        #[serde(default = "default_currency_prefix")]
        prefix: String,
        #[serde(default = "default_thousands")]
        thousands: String,
    },

    /// First integer token
    Digits {
        #[serde(default)]
        min: Option<u64>,
        #[serde(default)]
        max: Option<u64>,
    },
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self::Text {
            min_len: default_min_len(),
            max_len: default_max_len(),
            strip: Vec::new(),
            reject: Vec::new(),
            title_case: false,
        }
    }
}

fn default_max_depth() -> usize {
    8
}

fn default_min_len() -> usize {
    1
}

fn default_max_len() -> usize {
    200
}

fn default_currency_prefix() -> String {
    "R$".to_string()
}

fn default_thousands() -> String {
    ".".to_string()
}
