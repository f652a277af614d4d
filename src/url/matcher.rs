use crate::ConfigError;
use regex::Regex;

/// A URL include/exclude pattern
///
/// Patterns written as `/.../` are regular expressions; anything else is a
/// literal substring.
#[derive(Debug, Clone)]
pub enum UrlPattern {
    Substring(String),
    Regex(Regex),
}

impl UrlPattern {
    /// Parses a pattern string
    ///
    /// # Examples
    ///
    /// ```
    /// use llms_harvest::url::UrlPattern;
    ///
    /// let literal = UrlPattern::parse("/blog/").unwrap();
    /// assert!(literal.matches("https://example.com/blog/post"));
    ///
    /// let regex = UrlPattern::parse(r"/\.pdf$/").unwrap();
    /// assert!(regex.matches("https://example.com/file.pdf"));
    /// assert!(!regex.matches("https://example.com/file.pdf.html"));
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::InvalidPattern(
                "URL pattern cannot be empty".to_string(),
            ));
        }

        match trimmed
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            Some(body) if is_regex_body(body) => Regex::new(body)
                .map(Self::Regex)
                .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e))),
            _ => Ok(Self::Substring(trimmed.to_string())),
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Substring(needle) => url.contains(needle.as_str()),
            Self::Regex(re) => re.is_match(url),
        }
    }
}

/// `/docs/` is a path fragment, `/^.*\.pdf$/` is a regex; tell them apart by
/// the presence of regex metacharacters.
fn is_regex_body(body: &str) -> bool {
    !body.is_empty() && body.chars().any(|c| "\\^$.*+?()[]{}|".contains(c))
}

/// Compiled include/exclude rule set
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    include: Vec<UrlPattern>,
    exclude: Vec<UrlPattern>,
}

impl UrlFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            include: include
                .iter()
                .map(|p| UrlPattern::parse(p))
                .collect::<Result<_, _>>()?,
            exclude: exclude
                .iter()
                .map(|p| UrlPattern::parse(p))
                .collect::<Result<_, _>>()?,
        })
    }

    /// True when any exclude pattern matches
    pub fn excludes(&self, url: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(url))
    }

    /// Exclude patterns are checked first; an empty include list accepts everything
    pub fn accepts(&self, url: &str) -> bool {
        if self.excludes(url) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| p.matches(url))
    }
}
