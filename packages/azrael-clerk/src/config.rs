//! Clerk configuration, grounded on `azrael_store::StoreConfig`.

#[derive(Debug, Clone)]
pub struct ClerkConfig {
    /// Maximum size in bytes of a `custom` field (spec.md §4.5.3/I6).
    pub custom_field_max_bytes: usize,
}

impl Default for ClerkConfig {
    fn default() -> Self {
        ClerkConfig {
            custom_field_max_bytes: 65_536,
        }
    }
}
