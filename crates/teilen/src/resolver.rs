//! Confinement of client-supplied locations to the shared root.
//!
//! A requested location is percent-decoded, rejected if absolute, joined onto
//! the root and canonicalized. Only candidates that are the root itself or a
//! descendant of it are accepted. The resolver never writes a response; it
//! returns a [`Rejection`] that the HTTP layer maps to a status code.

use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

/// Why a requested location was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No location given where one is required
    MissingArgument,
    /// Location starts with a root or drive prefix
    AbsolutePathRejected,
    /// Location escapes the root or cannot be canonicalized
    NotAllowed,
    /// Location is inside the root but missing (or not a directory when listing)
    NotFound,
}

/// What the resolved location must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// An existing directory (listing)
    Directory,
    /// Any existing entry (fetching)
    Entry,
}

/// Kind of a filesystem entry after following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

/// Minimal view of the filesystem needed for resolution.
pub trait PathStat {
    /// Whether `path` itself is a symlink, without following it.
    ///
    /// Missing entries (or a file used as a directory) are `Ok(false)`.
    fn is_symlink(&self, path: &Path) -> io::Result<bool>;

    /// Target of the symlink at `path`.
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Kind of the entry at `path`, `None` if it does not exist or cannot be read.
    fn kind(&self, path: &Path) -> Option<EntryKind>;
}

fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// [`PathStat`] backed by the host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl PathStat for HostFs {
    fn is_symlink(&self, path: &Path) -> io::Result<bool> {
        match std::fs::symlink_metadata(path) {
            Ok(metadata) => Ok(metadata.file_type().is_symlink()),
            Err(err) if is_missing(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::read_link(path)
    }

    fn kind(&self, path: &Path) -> Option<EntryKind> {
        let metadata = std::fs::metadata(path).ok()?;
        Some(if metadata.is_dir() {
            EntryKind::Directory
        } else if metadata.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        })
    }
}

/// True if the requested location starts with a root directory or a platform prefix.
///
/// Checks the first component instead of `Path::is_absolute`, so drive-relative
/// forms like `C:foo` are rejected on Windows as well.
pub fn is_absolute_request(requested: &str) -> bool {
    matches!(
        Path::new(requested).components().next(),
        Some(Component::RootDir | Component::Prefix(_))
    )
}

/// True if `candidate` is `root` or lies below it (component-wise prefix).
pub fn is_within(root: &Path, candidate: &Path) -> bool {
    candidate.starts_with(root)
}

/// Symlinks followed before canonicalization gives up (Linux `MAXSYMLINKS`).
pub const MAX_SYMLINK_HOPS: usize = 40;

fn push_reversed(pending: &mut Vec<PathBuf>, path: &Path) {
    for component in path.components().rev() {
        pending.push(PathBuf::from(component.as_os_str()));
    }
}

/// Canonicalize a path that may not fully exist, like a non-strict realpath.
///
/// Every component is checked for being a symlink, dangling ones included; a
/// link's target is spliced into the remaining components, absolute targets
/// restarting from the root. Missing components are kept as they are and `..`
/// pops the last component. Other errors, and more than [`MAX_SYMLINK_HOPS`]
/// links, are returned as errors.
pub fn canonicalize_lenient<S: PathStat + ?Sized>(fs: &S, path: &Path) -> io::Result<PathBuf> {
    let mut resolved = PathBuf::new();
    let mut pending = Vec::new();
    let mut hops = 0;
    push_reversed(&mut pending, path);

    while let Some(part) = pending.pop() {
        let Some(component) = part.components().next() else {
            continue;
        };
        match component {
            Component::Prefix(_) => resolved = part,
            Component::RootDir => {
                let prefix = match resolved.components().next() {
                    Some(prefix @ Component::Prefix(_)) => PathBuf::from(prefix.as_os_str()),
                    _ => PathBuf::new(),
                };
                resolved = prefix;
                resolved.push(component.as_os_str());
            }
            Component::CurDir => continue,
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                let next = resolved.join(name);
                if fs.is_symlink(&next)? {
                    hops += 1;
                    if hops > MAX_SYMLINK_HOPS {
                        return Err(io::Error::other(format!(
                            "too many levels of symbolic links at {}",
                            next.display()
                        )));
                    }
                    let target = fs.read_link(&next)?;
                    push_reversed(&mut pending, &target);
                } else {
                    resolved = next;
                }
            }
        }
    }

    Ok(resolved)
}

/// Percent-decode a requested location. Invalid UTF-8 is replaced lossily.
pub fn decode_location(raw: &str) -> String {
    let bytes = urlencoding::decode_binary(raw.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Resolves client locations against a fixed root.
#[derive(Debug, Clone)]
pub struct PathResolver<S = HostFs> {
    root: PathBuf,
    fs: S,
}

impl PathResolver<HostFs> {
    /// `root` must already be canonical.
    pub fn new(root: PathBuf) -> Self {
        Self { root, fs: HostFs }
    }
}

impl<S: PathStat> PathResolver<S> {
    pub fn with_fs(root: PathBuf, fs: S) -> Self {
        Self { root, fs }
    }

    /// Resolve a location for listing; defaults to the root when absent.
    pub fn resolve_directory(&self, raw: Option<&str>) -> Result<PathBuf, Rejection> {
        self.resolve(raw, true, Target::Directory)
    }

    /// Resolve a location for fetching; a location is required.
    pub fn resolve_entry(&self, raw: Option<&str>) -> Result<PathBuf, Rejection> {
        self.resolve(raw, false, Target::Entry)
    }

    /// Resolve `raw` to a canonical path confined to the root.
    pub fn resolve(
        &self,
        raw: Option<&str>,
        allow_default_to_root: bool,
        target: Target,
    ) -> Result<PathBuf, Rejection> {
        let Some(raw) = raw else {
            return if allow_default_to_root {
                Ok(self.root.clone())
            } else {
                Err(Rejection::MissingArgument)
            };
        };

        let decoded = decode_location(raw);

        if is_absolute_request(&decoded) {
            warn!("Absolute location rejected: {:?}", decoded);
            return Err(Rejection::AbsolutePathRejected);
        }

        let joined = self.root.join(&decoded);
        let candidate = canonicalize_lenient(&self.fs, &joined).map_err(|err| {
            warn!("Failed to canonicalize {:?}: {}", joined, err);
            Rejection::NotAllowed
        })?;

        if !is_within(&self.root, &candidate) {
            warn!(
                "Path traversal attempt: {:?} resolved to {:?} outside {:?}",
                decoded, candidate, self.root
            );
            return Err(Rejection::NotAllowed);
        }

        let found = match (target, self.fs.kind(&candidate)) {
            (Target::Directory, Some(EntryKind::Directory)) => true,
            (Target::Directory, _) => false,
            (Target::Entry, kind) => kind.is_some(),
        };
        if !found {
            debug!("Location does not exist: {:?}", candidate);
            return Err(Rejection::NotFound);
        }

        debug!("Resolved {:?} to {}", decoded, candidate.display());
        Ok(candidate)
    }
}
