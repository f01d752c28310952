//! Target moniker resolution
//!
//! A specification names its targets with monikers such as
//! `file://C:/inetpub/web.config` or a plain relative path. Resolvers turn a
//! moniker into file paths; the registry picks which resolver handles one.

use crate::error::ProcessError;
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

static FILE_MONIKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^file://(?P<path>.+)$").expect("valid file moniker pattern"));

static SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]+://").expect("valid scheme pattern"));

/// Converts monikers into target file paths
///
/// Implement this trait to support new moniker schemes.
pub trait MonikerResolver: Send + Sync + 'static {
    /// Resolver name used in diagnostics
    fn name(&self) -> &'static str;

    /// Check if this resolver understands the moniker
    fn can_resolve(&self, moniker: &str) -> bool;

    /// Resolve the moniker into target paths
    ///
    /// Relative paths are resolved against `base`, the directory holding the
    /// specification file.
    ///
    /// # Errors
    /// Returns `ProcessError::UnresolvedMoniker` if the moniker is not understood
    fn resolve(&self, moniker: &str, base: &Path) -> Result<Vec<PathBuf>, ProcessError>;

    /// Resolver priority (higher = tried first when multiple resolvers accept)
    fn priority(&self) -> i32 {
        0
    }
}

/// Resolves `file://<path>` monikers
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMonikerResolver;

impl MonikerResolver for FileMonikerResolver {
    fn name(&self) -> &'static str {
        "file"
    }

    fn can_resolve(&self, moniker: &str) -> bool {
        FILE_MONIKER.is_match(moniker)
    }

    fn resolve(&self, moniker: &str, base: &Path) -> Result<Vec<PathBuf>, ProcessError> {
        let captures = FILE_MONIKER
            .captures(moniker)
            .ok_or_else(|| ProcessError::UnresolvedMoniker(moniker.to_string()))?;
        Ok(vec![base.join(&captures["path"])])
    }

    fn priority(&self) -> i32 {
        10
    }
}

/// Resolves scheme-less monikers as file system paths
#[derive(Debug, Clone, Copy, Default)]
pub struct PathMonikerResolver;

impl MonikerResolver for PathMonikerResolver {
    fn name(&self) -> &'static str {
        "path"
    }

    fn can_resolve(&self, moniker: &str) -> bool {
        !moniker.trim().is_empty() && !SCHEME.is_match(moniker)
    }

    fn resolve(&self, moniker: &str, base: &Path) -> Result<Vec<PathBuf>, ProcessError> {
        if !self.can_resolve(moniker) {
            return Err(ProcessError::UnresolvedMoniker(moniker.to_string()));
        }
        Ok(vec![base.join(moniker.trim())])
    }
}

/// Ordered set of moniker resolvers
pub struct ResolverRegistry {
    resolvers: Vec<Box<dyn MonikerResolver>>,
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        default_resolvers()
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("resolvers", &self.names())
            .finish()
    }
}

impl ResolverRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// Register a resolver
    pub fn register<R: MonikerResolver>(&mut self, resolver: R) {
        self.resolvers.push(Box::new(resolver));
        // stable: equal priorities keep registration order
        self.resolvers
            .sort_by_key(|r| std::cmp::Reverse(r.priority()));
    }

    /// Builder: register a resolver
    #[must_use]
    pub fn with<R: MonikerResolver>(mut self, resolver: R) -> Self {
        self.register(resolver);
        self
    }

    /// Find the resolver handling a moniker
    #[must_use]
    pub fn find(&self, moniker: &str) -> Option<&dyn MonikerResolver> {
        self.resolvers
            .iter()
            .find(|r| r.can_resolve(moniker))
            .map(|r| &**r)
    }

    /// Resolve one moniker
    ///
    /// # Errors
    /// Returns `ProcessError::UnresolvedMoniker` if no resolver accepts it
    pub fn resolve(&self, moniker: &str, base: &Path) -> Result<Vec<PathBuf>, ProcessError> {
        self.find(moniker)
            .ok_or_else(|| ProcessError::UnresolvedMoniker(moniker.to_string()))?
            .resolve(moniker, base)
    }

    /// Resolve every moniker, dropping duplicate paths
    ///
    /// # Errors
    /// Fails on the first moniker no resolver accepts
    pub fn resolve_all<S: AsRef<str>>(
        &self,
        monikers: &[S],
        base: &Path,
    ) -> Result<Vec<PathBuf>, ProcessError> {
        let mut paths = IndexSet::new();
        for moniker in monikers {
            paths.extend(self.resolve(moniker.as_ref(), base)?);
        }
        Ok(paths.into_iter().collect())
    }

    /// Names of registered resolvers, highest priority first
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }
}

/// Create registry with the built-in resolvers
#[inline]
#[must_use]
pub fn default_resolvers() -> ResolverRegistry {
    ResolverRegistry::new()
        .with(FileMonikerResolver)
        .with(PathMonikerResolver)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ShareResolver;

    impl MonikerResolver for ShareResolver {
        fn name(&self) -> &'static str {
            "share"
        }

        fn can_resolve(&self, moniker: &str) -> bool {
            moniker.starts_with("share://")
        }

        fn resolve(&self, moniker: &str, _base: &Path) -> Result<Vec<PathBuf>, ProcessError> {
            let host = moniker.trim_start_matches("share://");
            Ok(vec![PathBuf::from(format!("/mnt/{host}/a.config")), PathBuf::from(format!("/mnt/{host}/b.config"))])
        }

        fn priority(&self) -> i32 {
            20
        }
    }

    #[test]
    fn builtin_patterns_compile() {
        assert!(FILE_MONIKER.is_match("file://web.config"));
        assert!(SCHEME.is_match("https://host/web.config"));
    }

    #[test]
    fn file_moniker_resolves_relative_to_base() {
        let paths = FileMonikerResolver
            .resolve("file://conf/web.config", Path::new("/srv/specs"))
            .unwrap();
        assert_eq!(paths, vec![PathBuf::from("/srv/specs/conf/web.config")]);
    }

    #[test]
    fn file_moniker_keeps_absolute_path() {
        let paths = FileMonikerResolver
            .resolve("file:///etc/app/web.config", Path::new("/srv/specs"))
            .unwrap();
        assert_eq!(paths, vec![PathBuf::from("/etc/app/web.config")]);
    }

    #[test]
    fn file_resolver_rejects_other_schemes() {
        assert!(!FileMonikerResolver.can_resolve("http://host/web.config"));
        assert!(!FileMonikerResolver.can_resolve("file://"));
        assert!(matches!(
            FileMonikerResolver.resolve("web.config", Path::new(".")),
            Err(ProcessError::UnresolvedMoniker(_))
        ));
    }

    #[test]
    fn path_resolver_accepts_scheme_less_monikers() {
        assert!(PathMonikerResolver.can_resolve("web.config"));
        assert!(PathMonikerResolver.can_resolve("/etc/app/web.config"));
        assert!(!PathMonikerResolver.can_resolve("file://web.config"));
        assert!(!PathMonikerResolver.can_resolve("  "));
    }

    #[test]
    fn registry_prefers_higher_priority() {
        let registry = default_resolvers();
        assert_eq!(registry.names(), vec!["file", "path"]);
        assert_eq!(registry.find("file://web.config").map(|r| r.name()), Some("file"));
        assert_eq!(registry.find("web.config").map(|r| r.name()), Some("path"));
    }

    #[test]
    fn registry_rejects_unknown_scheme() {
        let err = default_resolvers()
            .resolve("ftp://host/web.config", Path::new("."))
            .unwrap_err();
        assert!(matches!(err, ProcessError::UnresolvedMoniker(m) if m == "ftp://host/web.config"));
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry = ResolverRegistry::new();
        assert!(registry.find("web.config").is_none());
        assert!(registry.resolve("web.config", Path::new(".")).is_err());
    }

    #[test]
    fn resolve_all_removes_duplicates_in_order() {
        let registry = default_resolvers();
        let paths = registry
            .resolve_all(
                &["file://b.config", "a.config", "b.config", "file://a.config"],
                Path::new("/srv"),
            )
            .unwrap();
        assert_eq!(paths, vec![PathBuf::from("/srv/b.config"), PathBuf::from("/srv/a.config")]);
    }

    #[test]
    fn custom_resolver_expands_to_several_targets() {
        let registry = default_resolvers().with(ShareResolver);
        assert_eq!(registry.names(), vec!["share", "file", "path"]);
        let paths = registry.resolve_all(&["share://web01"], Path::new(".")).unwrap();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn debug_lists_resolver_names() {
        let debug = format!("{:?}", default_resolvers());
        assert!(debug.contains("file"));
        assert!(debug.contains("path"));
    }
}
