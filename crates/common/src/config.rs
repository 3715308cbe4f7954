use std::env;
use std::fmt;
use std::str::FromStr;

/// Deployment flavour. Selects the log formatter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Read `ENVIRONMENT`; anything unrecognised falls back to development.
    pub fn from_env() -> Self {
        env::var("ENVIRONMENT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            other => Err(format!(
                "{other} is not a supported environment. Use either `development` or `production`."
            )),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OTLP collector endpoint, if export is enabled.
pub fn otel_endpoint_from_env() -> Option<String> {
    env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .ok()
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn parses_known_names() {
        assert_eq!("prod".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!(
            "Production".parse::<Environment>(),
            Ok(Environment::Production)
        );
        assert_eq!(
            "development".parse::<Environment>(),
            Ok(Environment::Development)
        );
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    #[serial]
    fn from_env_defaults_to_development() {
        unsafe { env::remove_var("ENVIRONMENT") };
        assert_eq!(Environment::from_env(), Environment::Development);

        unsafe { env::set_var("ENVIRONMENT", "nonsense") };
        assert_eq!(Environment::from_env(), Environment::Development);

        unsafe { env::set_var("ENVIRONMENT", "production") };
        assert_eq!(Environment::from_env(), Environment::Production);

        unsafe { env::remove_var("ENVIRONMENT") };
    }

    #[test]
    #[serial]
    fn blank_otel_endpoint_is_ignored() {
        unsafe { env::set_var("OTEL_EXPORTER_OTLP_ENDPOINT", "  ") };
        assert_eq!(otel_endpoint_from_env(), None);

        unsafe { env::set_var("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317") };
        assert_eq!(
            otel_endpoint_from_env().as_deref(),
            Some("http://localhost:4317")
        );

        unsafe { env::remove_var("OTEL_EXPORTER_OTLP_ENDPOINT") };
    }
}
