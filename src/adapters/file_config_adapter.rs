//! INI file configuration adapter.

use crate::domain::error::TradeSignalError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TradeSignalError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| TradeSignalError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const SAMPLE: &str = r#"
[sqlite]
path = /var/lib/tradesignal/signals.db
pool_size = 4

[csv]
dir = data/prices

[universe]
symbols = ULVR.L, AZN.L, BARC.L
lookback_days = 250

[portfolio]
value = 20000.00
risk_profile = moderate
stop_loss_percent = 7.5

[signals]
top = 3
"#;

    #[test]
    fn from_string_parses_all_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("sqlite", "path"),
            Some("/var/lib/tradesignal/signals.db".to_string())
        );
        assert_eq!(adapter.get_string("csv", "dir"), Some("data/prices".to_string()));
        assert_eq!(
            adapter.get_string("universe", "symbols"),
            Some("ULVR.L, AZN.L, BARC.L".to_string())
        );
        assert_eq!(adapter.get_int("sqlite", "pool_size", 1), 4);
        assert_eq!(adapter.get_int("signals", "top", 0), 3);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[portfolio]\nvalue = 100\n").unwrap();
        assert_eq!(adapter.get_string("portfolio", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_defaults() {
        let adapter = FileConfigAdapter::from_string("[universe]\nlookback_days = abc\n").unwrap();
        assert_eq!(adapter.get_int("universe", "lookback_days", 250), 250);
        assert_eq!(adapter.get_int("universe", "missing", 42), 42);
    }

    #[test]
    fn get_double_returns_value_or_default() {
        let adapter = FileConfigAdapter::from_string("[portfolio]\nvalue = 20000.5\n").unwrap();
        assert_eq!(adapter.get_double("portfolio", "value", 0.0), 20000.5);
        assert_eq!(adapter.get_double("portfolio", "missing", 99.9), 99.9);
    }

    #[test]
    fn get_decimal_is_exact() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_decimal("portfolio", "value"), Some(dec!(20000.00)));
        assert_eq!(adapter.get_decimal("portfolio", "stop_loss_percent"), Some(dec!(7.5)));
        assert_eq!(adapter.get_decimal("portfolio", "risk_profile"), None);
        assert_eq!(adapter.get_decimal("portfolio", "missing"), None);
    }

    #[test]
    fn get_bool_values() {
        let adapter =
            FileConfigAdapter::from_string("[signals]\na = true\nb = no\nc = On\nd = maybe\n")
                .unwrap();
        assert!(adapter.get_bool("signals", "a", false));
        assert!(!adapter.get_bool("signals", "b", true));
        assert!(adapter.get_bool("signals", "c", false));
        assert!(adapter.get_bool("signals", "d", true));
        assert!(!adapter.get_bool("signals", "missing", false));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(SAMPLE);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("csv", "dir"), Some("data/prices".to_string()));
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/tradesignal.ini");
        assert!(matches!(
            result,
            Err(TradeSignalError::ConfigParse { file, .. }) if file.contains("tradesignal.ini")
        ));
    }
}
