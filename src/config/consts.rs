// src/config/consts.rs

// Portal
pub const PORTAL_ORIGIN: &str = "https://records.tceq.texas.gov";
pub const PORTAL_BASE_URL: &str = "https://records.tceq.texas.gov/cs/idcplg";
pub const SEARCH_FORM_SERVICE: &str = "TCEQ_SEARCH";
pub const SEARCH_PERFORM_SERVICE: &str = "TCEQ_PERFORM_SEARCH";
pub const FILE_SERVICE: &str = "GET_FILE";

// Search payload
pub const RECORD_SERIES: &str = "1081"; // AIR / New Source Review Permit
pub const DOCUMENT_TYPE_PERMITS: &str = "27";
pub const IDENTIFIER_FIELD: &str = "xRefNumTxt"; // "Central Registry RN"
pub const IDENTIFIER_FIELD_LABEL: &str = "Central Registry RN";
pub const KEYWORD: &str = "Technical Review";
pub const SORT_FIELD: &str = "dInDate";
pub const SORT_ORDER: &str = "Desc";
pub const RESULT_COUNT: u32 = 200;

// Net
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";
pub const CONNECT_TIMEOUT_SECS: u64 = 15;
pub const REQUEST_TIMEOUT_SECS: u64 = 60;
pub const RETRY_TOTAL: u32 = 3;
pub const RETRY_BACKOFF_MS: u64 = 1_000;
pub const RETRY_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

// Politeness
pub const REQUEST_PAUSE_MS: u64 = 750; // be polite
pub const JITTER_MS: u64 = 1_500; // extra 0..1500 ms
pub const DOWNLOAD_PAUSE_MS: u64 = 1_000;

// Browser
pub const BROWSER_WAIT_SECS: u64 = 20;
pub const BROWSER_POLL_MS: u64 = 250;
pub const BROWSER_MAX_PAGES: usize = 25;
pub const SCREENSHOT_DIR: &str = ".store/screenshots";

// Local files
pub const STORE_DIR: &str = ".store";
pub const LOG_FILE: &str = "debug.log";
pub const SETTINGS_FILE: &str = "tr_scrape.toml";
pub const ENV_PREFIX: &str = "TR_SCRAPE";

// Export
pub const DEFAULT_OUT_DIR: &str = "out";
pub const DEFAULT_DOWNLOAD_SUBDIR: &str = "technical_reviews";
pub const TITLE_STEM_MAX: usize = 80;
