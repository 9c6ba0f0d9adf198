#[derive(Debug, Clone)]
pub struct Config {
    /// Filters spans and events based on a set of filter directives
    /// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
    pub(crate) env_filter: String,
    /// Output log events as JSON
    pub(crate) use_json_format: bool,
    /// Emit ANSI color codes
    pub(crate) use_ansi: bool,
}

impl Config {
    pub fn new(env_filter: &str, use_json_format: bool) -> Self {
        Self {
            env_filter: env_filter.into(),
            use_json_format,
            use_ansi: false,
        }
    }

    pub fn with_env_filter(mut self, env_filter: &str) -> Self {
        self.env_filter = env_filter.to_string();
        self
    }

    pub fn with_ansi(mut self, use_ansi: bool) -> Self {
        self.use_ansi = use_ansi;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env_filter: "info".to_string(),
            use_json_format: false,
            use_ansi: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = Config::new("info", true)
            .with_env_filter("warn,deployer=debug")
            .with_ansi(true);
        assert_eq!(config.env_filter, "warn,deployer=debug");
        assert!(config.use_json_format);
        assert!(config.use_ansi);
    }

    #[test]
    fn default_is_plain_info() {
        let config = Config::default();
        assert_eq!(config.env_filter, "info");
        assert!(!config.use_json_format);
        assert!(!config.use_ansi);
    }
}
