mod sinusoid;
mod whitenoise;

pub use sinusoid::SinusoidSource;
pub use whitenoise::WhiteNoiseSource;

use crate::acquire::factory;

/// Register all built-in sources with the global registry. Called once at
/// startup, before the CLI surfaces the registered schemas.
pub fn register_builtin_sources() {
    factory::register(sinusoid::registration());
    factory::register(whitenoise::registration());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::config::SourceConfig;
    use crate::acquire::error::ScopeError;

    #[test]
    fn unknown_source_is_a_lookup_miss() {
        register_builtin_sources();
        let err = factory::create("unknown", &SourceConfig::new()).unwrap_err();
        assert!(matches!(err, ScopeError::UnknownSource(name) if name == "unknown"));
    }

    #[test]
    fn sin_rejects_a_negative_sample_rate() {
        register_builtin_sources();
        let options = SourceConfig::new().with("samplerate", -1.0);
        let err = factory::create("sin", &options).unwrap_err();
        assert!(matches!(err, ScopeError::InvalidConfig { key, .. } if key == "samplerate"));
    }

    #[test]
    fn builtin_sources_build_with_defaults() {
        register_builtin_sources();
        let sin = factory::create("sin", &SourceConfig::new()).unwrap();
        assert_eq!(sin.channel_count(), 8);
        let white = factory::create("white", &SourceConfig::new()).unwrap();
        assert_eq!(white.sample_rate_hz(), 500.0);
    }
}
