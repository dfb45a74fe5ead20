//! Configuration access port trait.
//!
//! Values come back as raw text; typed parsing and its errors live in
//! `domain::config_validation`.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Comma-separated list; `None` when the key is absent or blank.
    fn get_list(&self, section: &str, key: &str) -> Option<Vec<String>> {
        let raw = self.get_string(section, key)?;
        if raw.trim().is_empty() {
            return None;
        }
        Some(raw.split(',').map(|s| s.trim().to_string()).collect())
    }
}
