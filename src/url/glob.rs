//! Glob patterns for file-system discovery
//!
//! Only three wildcard tokens exist:
//!
//! | Token | Matches |
//! |-------|---------|
//! | `**`  | any characters including `/` (`**/` also matches nothing) |
//! | `*`   | any characters except `/` |
//! | `?`   | exactly one character except `/` |
//!
//! Every other character is literal. Patterns are anchored at both ends and
//! matched against `/`-separated relative paths. A pattern without any `/`
//! also matches a bare file name, so `*.md` finds markdown files at any depth.

use crate::ConfigError;
use regex::Regex;

/// A compiled, anchored glob
#[derive(Debug, Clone)]
pub struct Glob {
    pattern: String,
    regex: Regex,
    basename_only: bool,
}

impl Glob {
    /// Compiles a glob pattern
    ///
    /// # Examples
    ///
    /// ```
    /// use llms_harvest::url::Glob;
    ///
    /// let glob = Glob::new("docs/**/*.md").unwrap();
    /// assert!(glob.is_match("docs/intro.md"));
    /// assert!(glob.is_match("docs/guides/setup.md"));
    /// assert!(!glob.is_match("blog/post.md"));
    /// ```
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        if pattern.is_empty() {
            return Err(ConfigError::InvalidPattern(
                "glob pattern cannot be empty".to_string(),
            ));
        }

        let regex = Regex::new(&glob_to_regex(pattern))
            .map_err(|e| ConfigError::InvalidPattern(format!("glob '{}': {}", pattern, e)))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            basename_only: !pattern.contains('/'),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Tests a relative file path
    pub fn is_match(&self, path: &str) -> bool {
        let path = path.replace('\\', "/");
        if self.regex.is_match(&path) {
            return true;
        }
        self.basename_only
            && path
                .rsplit('/')
                .next()
                .is_some_and(|name| self.regex.is_match(name))
    }

    /// Tests a relative directory path, so `**/build/**` prunes `build` itself
    pub fn is_match_dir(&self, path: &str) -> bool {
        let path = path.replace('\\', "/");
        let trimmed = path.trim_end_matches('/');
        self.is_match(trimmed) || self.is_match(&format!("{}/", trimmed))
    }
}

/// Translates a glob into an anchored regular expression
fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c => {
                out.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }

    out.push('$');
    out
}

/// Compiles a list of patterns
pub fn compile_globs(patterns: &[String]) -> Result<Vec<Glob>, ConfigError> {
    patterns.iter().map(|p| Glob::new(p)).collect()
}
