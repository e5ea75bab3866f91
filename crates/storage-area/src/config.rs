//! Storage area configuration.

/// Prefix joined to an area name to form its database name.
pub const DEFAULT_DATABASE_PREFIX: &str = "async-local-storage:";

/// Name of the area returned by [`StorageArea::default_area`](crate::StorageArea::default_area).
pub const DEFAULT_AREA_NAME: &str = "default";

/// Configuration for storage areas.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Prefix of every backing database name. The area name is appended
    /// verbatim, so distinct areas whose prefixed names coincide share
    /// storage.
    pub database_prefix: String,
    /// Refuse to construct areas outside a secure context.
    pub require_secure_context: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_prefix: DEFAULT_DATABASE_PREFIX.to_string(),
            require_secure_context: true,
        }
    }
}

impl StorageConfig {
    /// Backing database name for the area called `name`.
    pub fn database_name(&self, name: &str) -> String {
        format!("{}{}", self.database_prefix, name)
    }
}
