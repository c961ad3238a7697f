//! Maps request targets onto files under the document root.

use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::config::ServerConfig;
use crate::http::mime::content_type_for;

/// File served when a target names a directory.
pub const DEFAULT_DOCUMENT: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The target climbs above the document root or names something that is
    /// not a plain file name.
    Forbidden,
    /// The server may not look at the path.
    PermissionDenied,
    /// Any other failure while checking the path.
    Io(io::ErrorKind),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Forbidden => f.write_str("path escapes the document root"),
            ResolveError::PermissionDenied => f.write_str("permission denied"),
            ResolveError::Io(kind) => write!(f, "cannot inspect path: {}", kind),
        }
    }
}

impl std::error::Error for ResolveError {}

/// A target mapped onto the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Absolute path under the document root.
    pub filesystem_path: PathBuf,
    pub exists: bool,
    pub is_directory: bool,
    pub content_type: &'static str,
    /// Size in bytes when the path was checked. Zero if it does not exist.
    pub size: u64,
}

impl ResolvedPath {
    /// Only existing regular files are served.
    pub fn is_servable(&self) -> bool {
        self.exists && !self.is_directory
    }
}

/// Turns a raw target into a path relative to the document root.
///
/// The query string and fragment are dropped and the rest is percent-decoded
/// before being split on `/`. `.` and empty segments vanish, `..` removes the
/// segment before it. Climbing above the root, or a segment the host OS would
/// read as more than one path component, is [`ResolveError::Forbidden`].
pub fn normalize_target(target: &str) -> Result<PathBuf, ResolveError> {
    let path = target.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(path).decode_utf8_lossy();

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop().ok_or(ResolveError::Forbidden)?;
            }
            name => {
                if !is_plain_component(name) {
                    return Err(ResolveError::Forbidden);
                }
                segments.push(name);
            }
        }
    }

    Ok(segments.into_iter().collect())
}

fn is_plain_component(name: &str) -> bool {
    if name.contains(['\0', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Resolves `target` against the configured document root.
///
/// Directories, and targets ending in `/`, resolve to their `index.html`.
pub async fn resolve(target: &str, config: &ServerConfig) -> Result<ResolvedPath, ResolveError> {
    let relative = normalize_target(target)?;
    let mut path = config.document_root.join(relative);

    let wants_directory = target
        .split(['?', '#'])
        .next()
        .is_some_and(|p| p.ends_with('/'));

    let mut meta = stat(&path).await?;
    if wants_directory || meta.as_ref().is_some_and(|m| m.is_dir()) {
        path.push(DEFAULT_DOCUMENT);
        meta = stat(&path).await?;
    }

    let content_type = content_type_for(&path);
    Ok(ResolvedPath {
        filesystem_path: path,
        exists: meta.is_some(),
        is_directory: meta.as_ref().is_some_and(|m| m.is_dir()),
        content_type,
        size: meta.as_ref().map_or(0, |m| m.len()),
    })
}

/// `Ok(None)` when nothing is there, including a file used as a directory.
async fn stat(path: &Path) -> Result<Option<std::fs::Metadata>, ResolveError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta)),
        Err(e) => match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => Ok(None),
            io::ErrorKind::PermissionDenied => Err(ResolveError::PermissionDenied),
            kind => {
                tracing::debug!(path = %path.display(), error = %e, "stat failed");
                Err(ResolveError::Io(kind))
            }
        },
    }
}
