use crate::core::{Result, StoreError};

pub const ENV_OWNER_ID: &str = "COLLECTION_STORE_OWNER_ID";
pub const ENV_PAGE_SIZE: &str = "COLLECTION_STORE_PAGE_SIZE";
pub const ENV_DUPLICATE_SUFFIX: &str = "COLLECTION_STORE_DUPLICATE_SUFFIX";

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Owner stamped on optimistic placeholders until the server answers
    pub owner_id: String,

    /// Appended to the name of a duplicated collection
    pub duplicate_suffix: String,

    /// Initial page size of the view
    pub page_size: usize,

    /// Transport failures kept for the UI; older ones are evicted
    pub max_retained_errors: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            owner_id: "local".to_string(),
            duplicate_suffix: " (copy)".to_string(),
            page_size: 25,
            max_retained_errors: 32,
        }
    }
}

impl StoreConfig {
    pub fn new(owner_id: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            ..Self::default()
        }
    }

    /// Set the duplicate-name suffix
    pub fn duplicate_suffix(mut self, suffix: &str) -> Self {
        self.duplicate_suffix = suffix.to_string();
        self
    }

    /// Set the initial page size
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set how many transport failures are retained
    pub fn max_retained_errors(mut self, max: usize) -> Self {
        self.max_retained_errors = max;
        self
    }

    /// Defaults overridden by `COLLECTION_STORE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(owner_id) = lookup(ENV_OWNER_ID) {
            config.owner_id = owner_id;
        }
        if let Some(suffix) = lookup(ENV_DUPLICATE_SUFFIX) {
            config.duplicate_suffix = suffix;
        }
        if let Some(raw) = lookup(ENV_PAGE_SIZE) {
            config.page_size = raw.trim().parse().map_err(|_| {
                StoreError::InvalidConfig(format!("{ENV_PAGE_SIZE} must be a positive integer, got '{raw}'"))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.owner_id.trim().is_empty() {
            return Err(StoreError::InvalidConfig("owner_id must not be empty".into()));
        }
        if self.page_size == 0 {
            return Err(StoreError::InvalidConfig("page_size must be at least 1".into()));
        }
        Ok(())
    }
}
