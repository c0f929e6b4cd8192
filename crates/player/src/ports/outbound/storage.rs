//! Local key-value storage.

pub use eom_shared::storage as storage_keys;

/// String key-value storage that survives restarts.
///
/// Failures are logged by implementations rather than returned; losing a
/// cached session never blocks play.
pub trait StorageProvider: Send + Sync {
    /// Save a string value with the given key
    fn save(&self, key: &str, value: &str);

    /// Load a string value by key, returns None if not found
    fn load(&self, key: &str) -> Option<String>;

    /// Remove a value by key
    fn remove(&self, key: &str);
}
