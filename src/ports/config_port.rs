//! Configuration access port trait.

use crate::domain::error::FundgridError;

/// Section/key lookup over an INI-shaped source.
///
/// Adapters supply raw strings; the typed readers are strict, so a value
/// that is present but unparsable is a `ConfigInvalid` rather than a
/// silent fallback to the default.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, FundgridError>;

    fn get_f64(&self, section: &str, key: &str, default: f64) -> Result<f64, FundgridError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    FundgridError::invalid(section, key, format!("'{}' is not a number", s))
                }),
        }
    }

    fn get_usize(&self, section: &str, key: &str, default: usize) -> Result<usize, FundgridError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(s) => s.trim().parse::<usize>().map_err(|_| {
                FundgridError::invalid(
                    section,
                    key,
                    format!("'{}' is not a non-negative integer", s),
                )
            }),
        }
    }
}
