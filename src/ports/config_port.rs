//! Configuration access port trait.
//!
//! Lookups are by INI section and key. Missing or unparseable values fall
//! back to the caller's default.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Non-negative integer lookup; a negative value comes back as `Err(raw)`.
    fn get_usize(&self, section: &str, key: &str, default: usize) -> Result<usize, i64> {
        let fallback = i64::try_from(default).unwrap_or(i64::MAX);
        let raw = self.get_int(section, key, fallback);
        usize::try_from(raw).map_err(|_| raw)
    }
}
