use crate::config::types::GenerateOptions;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses an options file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML options file
///
/// # Returns
///
/// * `Ok(GenerateOptions)` - Successfully loaded and validated options
/// * `Err(ConfigError)` - Failed to load, parse, or validate the options
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use llms_harvest::config::load_options;
///
/// let options = load_options(Path::new("harvest.toml")).unwrap();
/// println!("Crawling {}", options.site_url);
/// ```
pub fn load_options(path: &Path) -> Result<GenerateOptions, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let options = parse_options(&content)?;
    validate(&options)?;
    Ok(options)
}

/// Parses options from TOML text without validating them
pub fn parse_options(content: &str) -> Result<GenerateOptions, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Computes a SHA-256 hash of the options file content
///
/// Logged at startup so a generated document can be traced back to the
/// exact configuration revision that produced it.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads options and returns them together with the file hash
pub fn load_options_with_hash(path: &Path) -> Result<(GenerateOptions, String), ConfigError> {
    let options = load_options(path)?;
    let hash = compute_config_hash(path)?;
    Ok((options, hash))
}
