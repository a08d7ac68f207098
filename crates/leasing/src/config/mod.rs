use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the leasing service.
///
/// Everything is read once at process start; components receive the relevant
/// section by value instead of reaching into the environment at call time.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub payments: PaymentConfig,
    pub email: EmailConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let payments = PaymentConfig {
            secret_key: require_var("PAYMENT_SECRET_KEY")?,
            webhook_secret: require_var("PAYMENT_WEBHOOK_SECRET")?,
            redirect_base_url: env::var("APP_PUBLIC_URL")
                .unwrap_or_else(|_| "https://www.mygreenlandapartments.com".to_string()),
        };

        let email = EmailConfig {
            api_key: require_var("EMAIL_API_KEY")?,
            from_address: env::var("EMAIL_FROM_ADDRESS")
                .unwrap_or_else(|_| "Greenland Apartments <applications@mygreenlandapartments.com>".to_string()),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            payments,
            email,
        })
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar { name }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Payment provider credentials and redirect targets.
///
/// The webhook signing secret gates every inbound completion event; the
/// redirect base backs the success and cancel URLs handed to the hosted
/// checkout page.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub redirect_base_url: String,
}

impl PaymentConfig {
    pub fn success_url(&self, application_id: &str) -> String {
        format!(
            "{}/success?application_id={application_id}",
            self.redirect_base_url
        )
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/apply?canceled=true", self.redirect_base_url)
    }
}

/// Email delivery provider credentials.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_key: String,
    pub from_address: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingVar { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingVar { name } => {
                write!(f, "required environment variable {name} is not set")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::MissingVar { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_PUBLIC_URL");
        env::remove_var("PAYMENT_SECRET_KEY");
        env::remove_var("PAYMENT_WEBHOOK_SECRET");
        env::remove_var("EMAIL_API_KEY");
        env::remove_var("EMAIL_FROM_ADDRESS");
    }

    fn set_required_secrets() {
        env::set_var("PAYMENT_SECRET_KEY", "sk_test_local");
        env::set_var("PAYMENT_WEBHOOK_SECRET", "whsec_local");
        env::set_var("EMAIL_API_KEY", "re_local");
    }

    #[test]
    fn load_uses_defaults_when_optional_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_secrets();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.email.from_address.contains("mygreenlandapartments"));
    }

    #[test]
    fn load_fails_without_payment_secrets() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        match AppConfig::load() {
            Err(ConfigError::MissingVar { name }) => {
                assert_eq!(name, "PAYMENT_SECRET_KEY");
            }
            other => panic!("expected missing var error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_secrets();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn redirect_targets_carry_correlation_and_cancel_markers() {
        let payments = PaymentConfig {
            secret_key: "sk".to_string(),
            webhook_secret: "whsec".to_string(),
            redirect_base_url: "https://example.test".to_string(),
        };
        assert_eq!(
            payments.success_url("abc-123"),
            "https://example.test/success?application_id=abc-123"
        );
        assert_eq!(payments.cancel_url(), "https://example.test/apply?canceled=true");
    }
}
