//! Local file-system discovery
//!
//! Walks a base directory depth-first collecting documentation sources.
//! Excluded directories are pruned without being descended into; files
//! are tested against the exclude globs first and the include globs second.

use super::DiscoveredFile;
use crate::config::FileSystemOptions;
use crate::url::{compile_globs, Glob};
use crate::ConfigError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// Aggregate counters for one walk
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiscoveryStats {
    /// Regular files looked at
    pub scanned: usize,
    pub included: usize,
    /// Files rejected by a glob, plus pruned directories
    pub excluded: usize,
    pub directories: usize,
    pub duration: Duration,
}

/// Files found by a walk, in traversal order
#[derive(Debug, Clone, Default)]
pub struct FileDiscovery {
    pub files: Vec<DiscoveredFile>,
    pub stats: FileDiscoveryStats,
}

/// Walks `options.base_path` and returns matching files
///
/// Unreadable directories and entries are logged and skipped. A missing
/// base directory yields an empty result.
///
/// # Errors
///
/// Returns `ConfigError::InvalidPattern` if a glob fails to compile.
pub fn discover_files(options: &FileSystemOptions) -> Result<FileDiscovery, ConfigError> {
    let started = Instant::now();
    let include = compile_globs(&options.include_patterns)?;
    let exclude = compile_globs(&options.exclude_patterns)?;

    let mut discovery = FileDiscovery::default();
    let base = options.base_path.as_path();

    if !base.is_dir() {
        tracing::warn!(
            "File discovery base path {} is not a directory",
            base.display()
        );
        discovery.stats.duration = started.elapsed();
        return Ok(discovery);
    }

    let mut walker = WalkDir::new(base)
        .follow_links(options.follow_symlinks)
        .max_depth(options.max_depth.saturating_add(1))
        .sort_by_file_name()
        .into_iter();

    loop {
        let entry = match walker.next() {
            None => break,
            Some(Ok(entry)) => entry,
            Some(Err(e)) => {
                tracing::warn!("Skipping unreadable path: {}", e);
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        let relative_path = relative_path(base, entry.path());
        let is_symlink = entry.path_is_symlink();

        if is_symlink && !options.follow_symlinks {
            tracing::trace!("Skipping symlink {}", relative_path);
            continue;
        }

        let file_type = entry.file_type();

        if file_type.is_dir() {
            if exclude.iter().any(|g| g.is_match_dir(&relative_path)) {
                tracing::debug!("Pruning excluded directory {}", relative_path);
                discovery.stats.excluded += 1;
                walker.skip_current_dir();
            } else {
                discovery.stats.directories += 1;
            }
            continue;
        }

        if !file_type.is_file() {
            continue;
        }

        discovery.stats.scanned += 1;

        if !is_selected(&relative_path, &include, &exclude) {
            discovery.stats.excluded += 1;
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Cannot stat {}: {}", entry.path().display(), e);
                continue;
            }
        };

        let extension = entry
            .path()
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        discovery.files.push(DiscoveredFile {
            path: entry.path().to_path_buf(),
            relative_path,
            extension,
            size_bytes: metadata.len(),
            modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            depth: entry.depth() - 1,
            is_symlink,
        });
        discovery.stats.included += 1;
    }

    discovery.stats.duration = started.elapsed();
    tracing::info!(
        "File discovery: {} scanned, {} included, {} excluded, {} directories in {:?}",
        discovery.stats.scanned,
        discovery.stats.included,
        discovery.stats.excluded,
        discovery.stats.directories,
        discovery.stats.duration
    );

    Ok(discovery)
}

/// Exclude wins; an empty include list accepts everything
fn is_selected(path: &str, include: &[Glob], exclude: &[Glob]) -> bool {
    if exclude.iter().any(|g| g.is_match(path)) {
        return false;
    }
    include.is_empty() || include.iter().any(|g| g.is_match(path))
}

fn relative_path(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Maps a discovered file to the page URL it represents
///
/// The extension is dropped and a trailing `index` segment collapses to its
/// parent directory.
///
/// # Examples
///
/// ```
/// use llms_harvest::discovery::file_page_url;
///
/// assert_eq!(file_page_url("https://example.com", "docs/intro.md"), "https://example.com/docs/intro");
/// assert_eq!(file_page_url("https://example.com/", "docs/index.mdx"), "https://example.com/docs");
/// assert_eq!(file_page_url("https://example.com", "index.html"), "https://example.com/");
/// ```
pub fn file_page_url(site_url: &str, relative_path: &str) -> String {
    let site = site_url.trim_end_matches('/');
    let normalized = relative_path.replace('\\', "/");

    let mut segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
    if let Some(last) = segments.pop() {
        let stem = match last.rfind('.') {
            Some(dot) if dot > 0 => &last[..dot],
            _ => last,
        };
        if !stem.eq_ignore_ascii_case("index") {
            segments.push(stem);
        }
    }

    format!("{}/{}", site, segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn options_for(dir: &TempDir) -> FileSystemOptions {
        FileSystemOptions {
            enabled: true,
            base_path: dir.path().to_path_buf(),
            ..FileSystemOptions::default()
        }
    }

    fn write(dir: &TempDir, rel: &str, body: &str) {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, body).unwrap();
    }

    fn relative_paths(discovery: &FileDiscovery) -> Vec<&str> {
        discovery
            .files
            .iter()
            .map(|f| f.relative_path.as_str())
            .collect()
    }

    #[test]
    fn test_default_globs() {
        let dir = TempDir::new().unwrap();
        write(&dir, "README.md", "# Readme");
        write(&dir, "docs/guide.mdx", "# Guide");
        write(&dir, "docs/page.html", "<h1>Page</h1>");
        write(&dir, "docs/notes.txt", "ignored");
        write(&dir, "node_modules/pkg/README.md", "ignored");

        let discovery = discover_files(&options_for(&dir)).unwrap();
        assert_eq!(
            relative_paths(&discovery),
            vec!["README.md", "docs/guide.mdx", "docs/page.html"]
        );
        assert_eq!(discovery.stats.included, 3);
        assert_eq!(discovery.stats.scanned, 4);
    }

    #[test]
    fn test_file_metadata() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a/b/Deep.md", "12345");

        let discovery = discover_files(&options_for(&dir)).unwrap();
        assert_eq!(discovery.files.len(), 1);
        let file = &discovery.files[0];
        assert_eq!(file.relative_path, "a/b/Deep.md");
        assert_eq!(file.extension, "md");
        assert_eq!(file.size_bytes, 5);
        assert_eq!(file.depth, 2);
        assert!(!file.is_symlink);
        assert!(file.modified_at.is_some());
    }

    #[test]
    fn test_max_depth() {
        let dir = TempDir::new().unwrap();
        write(&dir, "top.md", "x");
        write(&dir, "one/two/deep.md", "x");

        let mut options = options_for(&dir);
        options.max_depth = 1;
        let discovery = discover_files(&options).unwrap();
        assert_eq!(relative_paths(&discovery), vec!["top.md"]);
    }

    #[test]
    fn test_exclude_before_include() {
        let dir = TempDir::new().unwrap();
        write(&dir, "docs/keep.md", "x");
        write(&dir, "docs/draft.md", "x");

        let mut options = options_for(&dir);
        options.exclude_patterns = vec!["**/draft.md".to_string()];
        let discovery = discover_files(&options).unwrap();
        assert_eq!(relative_paths(&discovery), vec!["docs/keep.md"]);
        assert_eq!(discovery.stats.excluded, 1);
    }

    #[test]
    fn test_missing_base_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut options = options_for(&dir);
        options.base_path = dir.path().join("does-not-exist");

        let discovery = discover_files(&options).unwrap();
        assert!(discovery.files.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_skipped_unless_followed() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        write(&outside, "linked.md", "# Linked");
        std::os::unix::fs::symlink(outside.path(), dir.path().join("shared")).unwrap();

        let discovery = discover_files(&options_for(&dir)).unwrap();
        assert!(discovery.files.is_empty());

        let mut options = options_for(&dir);
        options.follow_symlinks = true;
        let discovery = discover_files(&options).unwrap();
        assert_eq!(relative_paths(&discovery), vec!["shared/linked.md"]);
    }

    #[test]
    fn test_file_page_url() {
        assert_eq!(
            file_page_url("https://example.com", "guides/setup.mdx"),
            "https://example.com/guides/setup"
        );
        assert_eq!(
            file_page_url("https://example.com", "guides\\index.md"),
            "https://example.com/guides"
        );
        assert_eq!(
            file_page_url("https://example.com", ".hidden"),
            "https://example.com/.hidden"
        );
    }
}
