//! Package descriptors and dependency edges.

/// A directed requirement from a dependent package to a target package.
///
/// `version == ""` means "any version accepted". An `optional` dependency
/// does not disable its dependent when the target is missing from the
/// graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    to: String,
    version: String,
    optional: bool,
}

impl Dependency {
    /// Create a dependency on `to` with no version constraint, required.
    #[must_use]
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            version: String::new(),
            optional: false,
        }
    }

    /// Constrain the dependency to an exact version of the target.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Mark the dependency as optional: a missing target does not disable
    /// the dependent.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Name of the package this dependency targets.
    #[must_use]
    pub fn to(&self) -> &str {
        &self.to
    }

    /// Required version, or the empty string if any version is accepted.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether a missing target is tolerated.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// Read-only descriptor of a package participating in the dependency graph.
///
/// Implementations are supplied by the caller; the graph engine only ever
/// reads through this trait. `name()` must be unique within a single
/// [`crate::Graph`] registration. The name `"global"` is reserved and always
/// forced enabled (see [`crate::Graph::register`]).
pub trait Package: Send + Sync {
    /// Unique name of the package within its graph.
    fn name(&self) -> &str;

    /// Version string of the package, compared against dependents'
    /// version constraints.
    fn version(&self) -> &str;

    /// Integer cohort, reserved for downstream ordering by callers.
    fn group(&self) -> i64;

    /// Ordered list of this package's dependencies.
    fn dependencies(&self) -> &[Dependency];
}
