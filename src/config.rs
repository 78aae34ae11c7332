use serde::Deserialize;

/// Name of the Secret Service collection items are stored in.
pub const DEFAULT_COLLECTION: &str = "login";

/// Backend tuning shared by every [`Store`](crate::Store).
///
/// The defaults match what the free functions [`write`](crate::write),
/// [`read`](crate::read) and [`delete`](crate::delete) use.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Secret Service collection label, created on first use.
    pub collection: String,
    /// Windows persistence class of written credentials.
    pub persistence: Persistence,
    /// Separator between scope and item name in Windows target names.
    pub target_separator: char,
}

impl StoreConfig {
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_persistence(mut self, persistence: Persistence) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_target_separator(mut self, separator: char) -> Self {
        self.target_separator = separator;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_owned(),
            persistence: Persistence::default(),
            target_separator: ':',
        }
    }
}

/// Lifetime of a Windows credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persistence {
    /// Lives until the logon session ends.
    Session,
    /// Persists across sessions on this machine only.
    #[default]
    LocalMachine,
    /// Roams with the user profile.
    Enterprise,
}
