//! File filtering for editor events.
//!
//! This module decides which files the build tool cares about. The main
//! filter is [`WatchedRoots`], which accepts a path when it lies at or
//! beneath one of the configured root directories. Additional filters can
//! narrow that further, for example by file extension.
//!
//! # Examples
//!
//! ```
//! use ck_notify::{FileFilter, WatchedRoots};
//! use camino::Utf8Path;
//!
//! let roots = WatchedRoots::new(["/Users/me/Sites/blog"]);
//!
//! assert!(roots.should_process(Utf8Path::new("/Users/me/Sites/blog/css/site.scss")));
//! assert!(!roots.should_process(Utf8Path::new("/Users/me/Sites/blog2/index.html")));
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use ck_core::{is_path_a_child_of_path, normalize_path, Config};
use smallvec::SmallVec;

/// A predicate deciding whether an event for a path should go further.
///
/// Filters must be [`Send`] and [`Sync`]: the gate is shared between
/// threads, and the watcher runs its filter on a blocking thread.
///
/// # Examples
///
/// ```
/// use ck_notify::FileFilter;
/// use camino::Utf8Path;
///
/// struct NoVendor;
///
/// impl FileFilter for NoVendor {
///     fn should_process(&self, path: &Utf8Path) -> bool {
///         !path.components().any(|c| c.as_str() == "vendor")
///     }
/// }
/// ```
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if the file at the given path should be processed.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts all files.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// The set of watched root directories.
///
/// Roots are normalized on construction. A path is accepted when it is a
/// child of any root (a root counts as a child of itself). An empty set
/// accepts every path.
///
/// # Examples
///
/// ```
/// use ck_notify::WatchedRoots;
/// use camino::Utf8Path;
///
/// let roots = WatchedRoots::new(["/sites/blog", "/sites/shop/"]);
/// assert_eq!(roots.len(), 2);
/// assert_eq!(
///     roots.root_for(Utf8Path::new("/sites/shop/cart.js")).map(Utf8Path::as_str),
///     Some("/sites/shop"),
/// );
/// assert!(roots.root_for(Utf8Path::new("/sites/shopfront/a.js")).is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchedRoots {
    roots: SmallVec<[Utf8PathBuf; 4]>,
}

impl WatchedRoots {
    /// Creates a root set, normalizing each root lexically.
    #[must_use]
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Utf8Path>,
    {
        let mut set = Self::default();
        for root in roots {
            set.push(root.as_ref());
        }
        set
    }

    /// Creates a root set from configuration.
    ///
    /// Uses [`Config::normalized_roots`], so roots are resolved through
    /// symlinks when the configuration asks for it.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.normalized_roots())
    }

    /// Adds a root unless it is already present.
    pub fn push(&mut self, root: &Utf8Path) {
        let root = normalize_path(root);
        if root.as_str().is_empty() || self.roots.contains(&root) {
            return;
        }
        self.roots.push(root);
    }

    /// Returns `true` if `path` lies inside one of the roots.
    ///
    /// Unlike [`FileFilter::should_process`], an empty set contains nothing.
    #[must_use]
    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.roots
            .iter()
            .any(|root| is_path_a_child_of_path(path, root))
    }

    /// Returns the deepest root containing `path`.
    #[must_use]
    pub fn root_for(&self, path: &Utf8Path) -> Option<&Utf8Path> {
        self.roots
            .iter()
            .filter(|root| is_path_a_child_of_path(path, root))
            .max_by_key(|root| root.components().count())
            .map(Utf8PathBuf::as_path)
    }

    /// Returns the number of roots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Returns `true` if no roots are configured.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Returns an iterator over the roots.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Utf8Path> {
        self.roots.iter().map(Utf8PathBuf::as_path)
    }
}

impl FileFilter for WatchedRoots {
    fn should_process(&self, path: &Utf8Path) -> bool {
        self.is_empty() || self.contains(path)
    }
}

/// A filter based on file extensions.
///
/// Extensions are compared case-insensitively; a leading dot in the
/// configured extension is ignored.
///
/// # Examples
///
/// ```
/// use ck_notify::{FileFilter, ExtensionFilter};
/// use camino::Utf8Path;
///
/// let filter = ExtensionFilter::new(&["scss", ".less", "js"]);
/// assert!(filter.should_process(Utf8Path::new("css/site.SCSS")));
/// assert!(filter.should_process(Utf8Path::new("css/theme.less")));
/// assert!(!filter.should_process(Utf8Path::new("index.html")));
/// ```
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    extensions: SmallVec<[String; 8]>,
}

impl ExtensionFilter {
    /// Creates a new extension filter.
    #[must_use]
    pub fn new(extensions: &[&str]) -> Self {
        Self::from_owned(extensions.iter().map(|s| (*s).to_owned()).collect())
    }

    /// Creates an extension filter from owned strings.
    #[must_use]
    pub fn from_owned(extensions: Vec<String>) -> Self {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_owned())
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }
}

impl FileFilter for ExtensionFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        path.extension()
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

/// A composite filter that combines multiple filters with AND logic.
///
/// An empty composite accepts all files.
pub struct CompositeFilter {
    filters: Vec<Box<dyn FileFilter>>,
}

impl CompositeFilter {
    /// Creates a new empty composite filter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Adds a filter to the composite.
    #[must_use]
    pub fn and<F: FileFilter>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Returns the number of combined filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if no filters were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for CompositeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompositeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeFilter")
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl FileFilter for CompositeFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        self.filters.iter().all(|f| f.should_process(path))
    }
}

/// Builds the extra (non-root) filter described by the configuration.
///
/// With no configured extensions every file passes.
#[must_use]
pub fn filter_from_config(config: &Config) -> CompositeFilter {
    let filter = CompositeFilter::new();
    if config.filter.extensions.is_empty() {
        filter
    } else {
        filter.and(ExtensionFilter::from_owned(config.filter.extensions.clone()))
    }
}

impl<F: FileFilter + ?Sized> FileFilter for Box<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

impl<F: FileFilter + ?Sized> FileFilter for std::sync::Arc<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}
