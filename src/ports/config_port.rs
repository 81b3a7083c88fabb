//! Configuration access port trait.

use rust_decimal::Decimal;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Exact decimal read for monetary and percentage settings. `None` when
    /// the key is absent or not a number.
    fn get_decimal(&self, section: &str, key: &str) -> Option<Decimal> {
        self.get_string(section, key)
            .and_then(|v| v.trim().parse::<Decimal>().ok())
    }
}
