/// Linux `MAXSYMLINKS`: symlink expansions allowed while resolving one path.
pub const DEFAULT_MAX_SYMLINK_EXPANSIONS: usize = 40;

/// Tunables of a [`PosixModel`](crate::PosixModel).
///
/// ```
/// use posix_model::{ModelConfig, PosixModel};
///
/// let config = ModelConfig::default()
///     .with_vivify_missing(false)
///     .with_max_handles(Some(256));
/// let model = PosixModel::with_config(config);
/// assert!(!model.config().vivify_missing);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// How many symlinks one resolution may dereference before failing with
    /// [`ModelError::LoopDetected`](crate::ModelError::LoopDetected).
    pub max_symlink_expansions: usize,
    /// When set, `chdir` and `opendir` create missing path components instead
    /// of failing: the traced process already entered that directory, so it
    /// exists even though the model has never seen it.
    pub vivify_missing: bool,
    /// Ceiling on the number of process handle records, `None` for unbounded.
    pub max_handles: Option<usize>,
}

impl ModelConfig {
    pub fn with_max_symlink_expansions(mut self, max: usize) -> Self {
        self.max_symlink_expansions = max;
        self
    }

    pub fn with_vivify_missing(mut self, vivify: bool) -> Self {
        self.vivify_missing = vivify;
        self
    }

    pub fn with_max_handles(mut self, max: Option<usize>) -> Self {
        self.max_handles = max;
        self
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_symlink_expansions: DEFAULT_MAX_SYMLINK_EXPANSIONS,
            vivify_missing: true,
            max_handles: None,
        }
    }
}
