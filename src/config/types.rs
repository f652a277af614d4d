use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// User-supplied transform applied to each extracted page (`url`, `content`)
#[derive(Clone)]
pub struct ContentTransform(pub Arc<dyn Fn(&str, &str) -> String + Send + Sync>);

impl ContentTransform {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn apply(&self, url: &str, content: &str) -> String {
        (self.0)(url, content)
    }
}

impl fmt::Debug for ContentTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentTransform(..)")
    }
}

/// Options for one `generate` run; doubles as the TOML config-file schema
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GenerateOptions {
    /// Root URL of the site (required, trailing slashes are stripped)
    pub site_url: String,

    /// Sitemap location, defaults to `<site-url>/sitemap.xml`
    pub sitemap_url: Option<String>,

    /// Whether to resolve the sitemap at all
    pub use_sitemap: bool,

    /// Explicit depth-0 URLs in addition to the sitemap
    pub seed_urls: Vec<String>,

    /// URL include patterns (substring, or `/regex/`)
    pub include_patterns: Vec<String>,

    /// URL exclude patterns (substring, or `/regex/`)
    pub exclude_patterns: Vec<String>,

    /// CSS selectors removed from every page before extraction
    pub strip_selectors: Vec<String>,

    pub max_pages: usize,
    pub max_chars_per_page: usize,
    pub max_total_chars: usize,

    /// Number of concurrent workers per stage
    pub concurrency: usize,

    /// Per-request timeout (milliseconds)
    pub timeout_ms: u64,

    /// Retries after the first failed attempt
    pub retries: u32,

    /// Base delay for linear retry backoff (milliseconds)
    pub retry_delay_ms: u64,

    pub user_agent: String,

    /// Extra request headers
    pub headers: BTreeMap<String, String>,

    /// Follow same-site links from the seed set
    pub recursive: bool,

    /// Maximum link-following depth
    pub max_depth: u32,

    /// Maximum links taken from a single page
    pub max_links_per_page: usize,

    /// Delay between discovery requests (milliseconds)
    pub request_delay_ms: u64,

    pub use_readability: bool,
    pub multi_method_extraction: bool,
    pub clean_content: bool,
    pub strip_images: bool,

    pub format: OutputFormat,

    pub filesystem: FileSystemOptions,

    pub content_filter: FilterConfig,

    #[serde(skip)]
    pub content_transform: Option<ContentTransform>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            site_url: String::new(),
            sitemap_url: None,
            use_sitemap: true,
            seed_urls: Vec::new(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            strip_selectors: Vec::new(),
            max_pages: 200,
            max_chars_per_page: 50_000,
            max_total_chars: 2_000_000,
            concurrency: 5,
            timeout_ms: 30_000,
            retries: 2,
            retry_delay_ms: 500,
            user_agent: format!(
                "{}/{}",
                crate::output::GENERATOR_NAME,
                crate::output::GENERATOR_VERSION
            ),
            headers: BTreeMap::new(),
            recursive: false,
            max_depth: 2,
            max_links_per_page: 50,
            request_delay_ms: 100,
            use_readability: true,
            multi_method_extraction: true,
            clean_content: false,
            strip_images: false,
            format: OutputFormat::Full,
            filesystem: FileSystemOptions::default(),
            content_filter: FilterConfig::default(),
            content_transform: None,
        }
    }
}

impl GenerateOptions {
    /// Creates options for a site with every other setting at its default
    pub fn for_site(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            ..Self::default()
        }
    }

    /// Site URL with trailing slashes removed
    pub fn site_root(&self) -> &str {
        self.site_url.trim().trim_end_matches('/')
    }

    /// Sitemap URL, falling back to `<site>/sitemap.xml`
    pub fn resolved_sitemap_url(&self) -> String {
        match &self.sitemap_url {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => format!("{}/sitemap.xml", self.site_root()),
        }
    }

    /// Page and character limits after applying the output-format preset
    pub fn effective_limits(&self) -> Limits {
        match self.format {
            OutputFormat::Full => Limits {
                max_pages: self.max_pages,
                max_chars_per_page: self.max_chars_per_page,
                max_total_chars: self.max_total_chars,
            },
            OutputFormat::Small => Limits {
                max_pages: 50,
                max_chars_per_page: 10_000,
                max_total_chars: 300_000,
            },
            OutputFormat::Minimal => Limits {
                max_pages: 20,
                max_chars_per_page: 3_000,
                max_total_chars: 50_000,
            },
        }
    }
}

/// Output size presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Full,
    Small,
    Minimal,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "small" => Ok(Self::Small),
            "minimal" => Ok(Self::Minimal),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

/// Page and character budgets in effect for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_pages: usize,
    pub max_chars_per_page: usize,
    pub max_total_chars: usize,
}

/// Local directory discovery settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FileSystemOptions {
    pub enabled: bool,

    /// Directory to walk
    pub base_path: PathBuf,

    /// Maximum directory depth below `base_path`
    pub max_depth: usize,

    /// Resolve symbolic links instead of skipping them
    pub follow_symlinks: bool,

    /// Glob patterns a file must match (any)
    pub include_patterns: Vec<String>,

    /// Glob patterns that reject a file or prune a directory
    pub exclude_patterns: Vec<String>,
}

impl Default for FileSystemOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            base_path: PathBuf::from("."),
            max_depth: 10,
            follow_symlinks: false,
            include_patterns: vec![
                "**/*.md".to_string(),
                "**/*.mdx".to_string(),
                "**/*.html".to_string(),
            ],
            exclude_patterns: vec!["**/node_modules/**".to_string(), "**/.git/**".to_string()],
        }
    }
}

/// Categorization and filtering rules
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FilterConfig {
    pub enabled: bool,
    pub categories: Vec<ContentCategory>,

    /// Category used when nothing scores above zero
    pub default_category: String,

    pub min_content_length: usize,
    pub max_content_length: Option<usize>,

    /// Keywords that raise relevance
    pub priority_keywords: Vec<String>,

    /// Pages containing any of these are dropped
    pub exclude_keywords: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            categories: default_categories(),
            default_category: "general".to_string(),
            min_content_length: 100,
            max_content_length: None,
            priority_keywords: Vec::new(),
            exclude_keywords: Vec::new(),
        }
    }
}

/// A named bucket with matching rules
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContentCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub url_patterns: Vec<String>,
    #[serde(default)]
    pub content_patterns: Vec<String>,
    #[serde(default)]
    pub max_pages: Option<usize>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl ContentCategory {
    fn builtin(id: &str, name: &str, priority: i32, urls: &[&str], content: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            priority,
            url_patterns: urls.iter().map(|s| s.to_string()).collect(),
            content_patterns: content.iter().map(|s| s.to_string()).collect(),
            max_pages: None,
            enabled: true,
        }
    }
}

/// Built-in category taxonomy
pub fn default_categories() -> Vec<ContentCategory> {
    vec![
        ContentCategory::builtin(
            "documentation",
            "Documentation",
            10,
            &["/docs", "/documentation", "/manual"],
            &[r"\bdocumentation\b", r"\binstallation\b", r"\bconfiguration\b"],
        ),
        ContentCategory::builtin(
            "api",
            "API Reference",
            9,
            &["/api", "/sdk", "/endpoints"],
            &[r"\bendpoint\b", r"\bparameters?\b", r"\brequest\b", r"\bresponse\b"],
        ),
        ContentCategory::builtin(
            "guides",
            "Guides & Tutorials",
            8,
            &["/guide", "/tutorial", "/getting-started", "/quickstart", "/learn"],
            &[r"\bstep \d+\b", r"\btutorial\b", r"\bgetting started\b"],
        ),
        ContentCategory::builtin(
            "reference",
            "Reference",
            7,
            &["/reference", "/spec", "/glossary", "/faq"],
            &[r"\breference\b", r"\bspecification\b"],
        ),
        ContentCategory::builtin(
            "blog",
            "Blog & News",
            4,
            &["/blog", "/news", "/changelog", "/releases"],
            &[r"\bannounc\w*\b", r"\breleased?\b"],
        ),
        ContentCategory::builtin("general", "General", 1, &[], &[]),
    ]
}
