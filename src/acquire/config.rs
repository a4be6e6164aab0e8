use std::collections::BTreeMap;

use serde_json::Value;

use crate::acquire::error::ScopeError;

/// Kind of value a config option accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionKind {
    Float,
    Int,
}

/// Declaration of one named option a data source accepts.
#[derive(Clone, Debug)]
pub struct ConfigOption {
    pub key: &'static str,
    pub help: &'static str,
    pub kind: OptionKind,
    pub default: Value,
}

impl ConfigOption {
    pub fn float(key: &'static str, help: &'static str, default: f64) -> Self {
        Self {
            key,
            help,
            kind: OptionKind::Float,
            default: Value::from(default),
        }
    }

    pub fn int(key: &'static str, help: &'static str, default: i64) -> Self {
        Self {
            key,
            help,
            kind: OptionKind::Int,
            default: Value::from(default),
        }
    }

    /// Check a supplied value against this option's kind, parsing strings
    /// (the CLI hands every flag over as text).
    fn coerce(&self, value: &Value) -> Result<Value, ScopeError> {
        match self.kind {
            OptionKind::Float => {
                if let Some(f) = value.as_f64() {
                    return Ok(Value::from(f));
                }
                if let Some(s) = value.as_str() {
                    if let Ok(f) = s.trim().parse::<f64>() {
                        return Ok(Value::from(f));
                    }
                }
                Err(ScopeError::invalid_config(
                    self.key,
                    format!("expected a number, got {value}"),
                ))
            }
            OptionKind::Int => {
                if let Some(i) = value.as_i64() {
                    return Ok(Value::from(i));
                }
                if let Some(s) = value.as_str() {
                    if let Ok(i) = s.trim().parse::<i64>() {
                        return Ok(Value::from(i));
                    }
                }
                Err(ScopeError::invalid_config(
                    self.key,
                    format!("expected an integer, got {value}"),
                ))
            }
        }
    }
}

/// The options a source declares: surfaced by the CLI layer and used to
/// resolve user-supplied values before construction.
#[derive(Clone, Debug, Default)]
pub struct ConfigSchema {
    pub options: Vec<ConfigOption>,
}

impl ConfigSchema {
    pub fn new(options: Vec<ConfigOption>) -> Self {
        Self { options }
    }

    pub fn option(&self, key: &str) -> Option<&ConfigOption> {
        self.options.iter().find(|o| o.key == key)
    }

    /// Validate `given` against this schema and fill in defaults.
    ///
    /// Unknown keys and mistyped values are rejected; the result carries a
    /// value for every declared option.
    pub fn resolve(&self, given: &SourceConfig) -> Result<SourceConfig, ScopeError> {
        for key in given.keys() {
            if self.option(key).is_none() {
                return Err(ScopeError::invalid_config(
                    key.clone(),
                    "not a recognized option for this source",
                ));
            }
        }
        let mut resolved = SourceConfig::new();
        for option in &self.options {
            let value = match given.raw(option.key) {
                Some(value) => option.coerce(value)?,
                None => option.default.clone(),
            };
            resolved.insert(option.key, value);
        }
        Ok(resolved)
    }
}

/// Immutable bag of named options, resolved once before a source is
/// constructed and never re-read afterwards.
#[derive(Clone, Debug, Default)]
pub struct SourceConfig {
    options: BTreeMap<String, Value>,
}

impl SourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy in tests and the CLI layer.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.options.insert(key.to_string(), value);
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.options.keys()
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.options.get(key).and_then(Value::as_f64)
    }

    pub fn require_f64(&self, key: &str) -> Result<f64, ScopeError> {
        self.get_f64(key)
            .ok_or_else(|| ScopeError::invalid_config(key, "required numeric option is missing"))
    }

    pub fn require_usize(&self, key: &str) -> Result<usize, ScopeError> {
        let value = self
            .options
            .get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| ScopeError::invalid_config(key, "required integer option is missing"))?;
        usize::try_from(value)
            .map_err(|_| ScopeError::invalid_config(key, "must be a non-negative integer"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ConfigSchema {
        ConfigSchema::new(vec![
            ConfigOption::float("samplerate", "Sample rate in Hz", 250.0),
            ConfigOption::int("channels", "Channel count", 8),
        ])
    }

    #[test]
    fn resolve_applies_defaults() {
        let resolved = schema().resolve(&SourceConfig::new()).unwrap();
        assert_eq!(resolved.get_f64("samplerate"), Some(250.0));
        assert_eq!(resolved.require_usize("channels").unwrap(), 8);
    }

    #[test]
    fn resolve_rejects_unknown_keys() {
        let given = SourceConfig::new().with("gain", 2.0);
        let err = schema().resolve(&given).unwrap_err();
        assert!(matches!(err, ScopeError::InvalidConfig { key, .. } if key == "gain"));
    }

    #[test]
    fn resolve_parses_cli_strings() {
        let given = SourceConfig::new()
            .with("samplerate", "500")
            .with("channels", "2");
        let resolved = schema().resolve(&given).unwrap();
        assert_eq!(resolved.get_f64("samplerate"), Some(500.0));
        assert_eq!(resolved.require_usize("channels").unwrap(), 2);
    }

    #[test]
    fn resolve_rejects_mistyped_values() {
        let given = SourceConfig::new().with("samplerate", "fast");
        assert!(schema().resolve(&given).is_err());

        let given = SourceConfig::new().with("channels", "2.5");
        assert!(schema().resolve(&given).is_err());
    }

    #[test]
    fn negative_integers_fail_usize_conversion() {
        let resolved = schema()
            .resolve(&SourceConfig::new().with("channels", -3))
            .unwrap();
        assert!(resolved.require_usize("channels").is_err());
    }
}
