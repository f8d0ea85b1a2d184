//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Every `key = value` pair of `section` in file order. Keys without a
    /// value are skipped.
    fn entries(&self, section: &str) -> Vec<(String, String)>;
}
