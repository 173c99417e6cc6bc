//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive; values keep their case.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
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
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }

    fn sections(&self) -> Vec<String> {
        let mut sections = self.config.sections();
        sections.sort();
        sections
    }

    fn section_entries(&self, section: &str) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|keys| {
                keys.iter()
                    .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
                    .collect()
            })
            .unwrap_or_default();
        entries.sort();
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn typed_getters_fall_back_to_defaults() {
        let adapter = FileConfigAdapter::from_string(
            "[data]\ncodes = 600000,000001\n[plan]\nlookback = 5\nmin_strength = 62.5\nbad = x\n",
        )
        .unwrap();
        assert_eq!(
            adapter.get_string("data", "codes"),
            Some("600000,000001".to_string())
        );
        assert_eq!(adapter.get_string("plan", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
        assert_eq!(adapter.get_int("plan", "lookback", 0), 5);
        assert_eq!(adapter.get_int("plan", "bad", 42), 42);
        assert_eq!(adapter.get_double("plan", "min_strength", 0.0), 62.5);
        assert_eq!(adapter.get_double("plan", "missing", 99.9), 99.9);
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[plan]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\n",
        )
        .unwrap();
        assert!(adapter.get_bool("plan", "a", false));
        assert!(adapter.get_bool("plan", "b", false));
        assert!(adapter.get_bool("plan", "c", false));
        assert!(!adapter.get_bool("plan", "d", true));
        assert!(!adapter.get_bool("plan", "e", true));
        assert!(!adapter.get_bool("plan", "f", true));
        assert!(adapter.get_bool("plan", "missing", true));
    }

    #[test]
    fn lists_sections_and_entries() {
        let content = r#"
[plan]
preset = full

[params.rsi]
period = 6
oversold = 25

[rule.golden]
entry = CROSS_ABOVE(SMA(5), SMA(20))
exit = CROSS_BELOW(SMA(5), SMA(20))
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        let sections = adapter.sections();
        assert!(sections.contains(&"params.rsi".to_string()));
        assert!(sections.contains(&"rule.golden".to_string()));
        assert_eq!(
            adapter.section_entries("params.rsi"),
            vec![
                ("oversold".to_string(), "25".to_string()),
                ("period".to_string(), "6".to_string()),
            ]
        );
        assert_eq!(
            adapter.get_string("rule.golden", "entry"),
            Some("CROSS_ABOVE(SMA(5), SMA(20))".to_string())
        );
        assert!(adapter.section_entries("missing").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[output]\npath = /tmp/results.jsonl\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("output", "path"),
            Some("/tmp/results.jsonl".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }
}
