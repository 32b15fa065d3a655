use std::env;
use std::num::ParseIntError;

/// Default STUN server injected into every transport when none is configured.
const DEFAULT_STUN_URL: &str = "stun:stun.l.google.com:19302";

/// Smallest allowed per-connection outbound queue capacity.
pub const MIN_SEND_BUFFER_FRAMES: usize = 64;

/// Default per-connection outbound queue capacity.
pub const DEFAULT_SEND_BUFFER_FRAMES: usize = 256;

#[derive(Debug, Clone)]
/// Application configuration loaded from environment variables.
pub struct Config {
    /// Port the warp server (signaling WebSocket + metrics + health) listens on.
    pub signaling_port: u16,
    /// STUN URLs injected into every peer connection.
    pub stun_urls: Vec<String>,
    /// Per-connection outbound signaling queue capacity, in frames.
    pub send_buffer_frames: usize,
    /// Logging level (e.g., "info", "debug").
    pub rust_log: String,
}

#[derive(Debug)]
/// Errors that can occur during configuration loading.
pub enum ConfigError {
    /// A required environment variable is missing.
    MissingVariable(String),
    /// A numeric value could not be parsed.
    InvalidNumber(String, ParseIntError),
    /// A port value was 0, which is logically invalid for this application.
    PortOutOfRange(u16),
    /// SEND_BUFFER_FRAMES was below the supported minimum.
    BufferTooSmall(usize),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "{} is required", var),
            ConfigError::InvalidNumber(var, err) => {
                write!(f, "{} must be a valid number ({})", var, err)
            }
            ConfigError::PortOutOfRange(port) => {
                write!(f, "SIGNALING_PORT must be between 1 and 65535 (got {})", port)
            }
            ConfigError::BufferTooSmall(n) => {
                write!(
                    f,
                    "SEND_BUFFER_FRAMES must be at least {} (got {})",
                    MIN_SEND_BUFFER_FRAMES, n
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validates environment variables and returns a Config object.
/// Returns an error if any required variable is missing or invalid.
pub fn validate_env() -> Result<Config, ConfigError> {
    // Required: SIGNALING_PORT (valid port number)
    let port_str = env::var("SIGNALING_PORT")
        .map_err(|_| ConfigError::MissingVariable("SIGNALING_PORT".to_string()))?;

    let signaling_port: u16 = port_str
        .parse()
        .map_err(|e| ConfigError::InvalidNumber("SIGNALING_PORT".to_string(), e))?;

    if signaling_port == 0 {
        return Err(ConfigError::PortOutOfRange(signaling_port));
    }

    // Optional: STUN_URLS (comma-separated, defaults to the Google STUN server)
    let stun_urls: Vec<String> = match env::var("STUN_URLS") {
        Ok(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => vec![DEFAULT_STUN_URL.to_string()],
    };
    let stun_urls = if stun_urls.is_empty() {
        vec![DEFAULT_STUN_URL.to_string()]
    } else {
        stun_urls
    };

    // Optional: SEND_BUFFER_FRAMES (defaults to 256, minimum 64)
    let send_buffer_frames: usize = match env::var("SEND_BUFFER_FRAMES") {
        Ok(raw) => raw
            .parse()
            .map_err(|e| ConfigError::InvalidNumber("SEND_BUFFER_FRAMES".to_string(), e))?,
        Err(_) => DEFAULT_SEND_BUFFER_FRAMES,
    };
    if send_buffer_frames < MIN_SEND_BUFFER_FRAMES {
        return Err(ConfigError::BufferTooSmall(send_buffer_frames));
    }

    // Optional: RUST_LOG (defaults to "info")
    let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| {
        eprintln!("RUST_LOG not set, using default: info");
        "info".to_string()
    });

    Ok(Config {
        signaling_port,
        stun_urls,
        send_buffer_frames,
        rust_log,
    })
}

impl Default for Config {
    fn default() -> Self {
        Config {
            signaling_port: 0,
            stun_urls: vec![DEFAULT_STUN_URL.to_string()],
            send_buffer_frames: DEFAULT_SEND_BUFFER_FRAMES,
            rust_log: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    use std::sync::Mutex;

    lazy_static::lazy_static! {
        static ref ENV_MUTEX: Mutex<()> = Mutex::new(());
    }

    // Helper to set up and tear down environment variables for tests
    struct EnvGuard<'a> {
        vars: Vec<String>,
        _guard: std::sync::MutexGuard<'a, ()>,
    }

    impl<'a> EnvGuard<'a> {
        fn new() -> Self {
            let guard = ENV_MUTEX.lock().unwrap();
            EnvGuard {
                vars: Vec::new(),
                _guard: guard,
            }
        }

        fn set(&mut self, key: &str, value: &str) {
            env::set_var(key, value);
            self.vars.push(key.to_string());
        }

        fn unset(&mut self, key: &str) {
            env::remove_var(key);
            self.vars.push(key.to_string());
        }
    }

    impl<'a> Drop for EnvGuard<'a> {
        fn drop(&mut self) {
            for var in &self.vars {
                env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_validate_env_valid_configuration() {
        let mut guard = EnvGuard::new();
        guard.set("SIGNALING_PORT", "8443");
        guard.set("RUST_LOG", "debug");
        guard.unset("STUN_URLS");
        guard.unset("SEND_BUFFER_FRAMES");

        let config = validate_env().expect("Expected valid configuration");
        assert_eq!(config.signaling_port, 8443);
        assert_eq!(config.rust_log, "debug");
        assert_eq!(config.send_buffer_frames, DEFAULT_SEND_BUFFER_FRAMES);
        assert_eq!(config.stun_urls, vec![DEFAULT_STUN_URL.to_string()]);
    }

    #[test]
    fn test_validate_env_missing_port() {
        let mut guard = EnvGuard::new();
        guard.unset("SIGNALING_PORT");

        let result = validate_env();
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::MissingVariable(_)));
        assert!(err.to_string().contains("SIGNALING_PORT is required"));
    }

    #[test]
    fn test_validate_env_invalid_port() {
        let mut guard = EnvGuard::new();
        guard.set("SIGNALING_PORT", "not-a-number");

        let result = validate_env();
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidNumber(_, _)));
    }

    #[test]
    fn test_validate_env_port_out_of_range() {
        let mut guard = EnvGuard::new();
        guard.set("SIGNALING_PORT", "0");

        let result = validate_env();
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::PortOutOfRange(_)));
        assert!(err.to_string().contains("must be between 1 and 65535"));
    }

    #[test]
    fn test_validate_env_stun_urls_parsed() {
        let mut guard = EnvGuard::new();
        guard.set("SIGNALING_PORT", "8443");
        guard.set("STUN_URLS", "stun:a.example.com:3478, stun:b.example.com:3478");

        let config = validate_env().expect("Expected valid configuration");
        assert_eq!(
            config.stun_urls,
            vec![
                "stun:a.example.com:3478".to_string(),
                "stun:b.example.com:3478".to_string()
            ]
        );
    }

    #[test]
    fn test_validate_env_buffer_below_minimum() {
        let mut guard = EnvGuard::new();
        guard.set("SIGNALING_PORT", "8443");
        guard.set("SEND_BUFFER_FRAMES", "16");

        let result = validate_env();
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::BufferTooSmall(16)));
        assert!(err.to_string().contains("at least 64"));
    }

    #[test]
    fn test_validate_env_buffer_override() {
        let mut guard = EnvGuard::new();
        guard.set("SIGNALING_PORT", "8443");
        guard.set("SEND_BUFFER_FRAMES", "512");

        let config = validate_env().expect("Expected valid configuration");
        assert_eq!(config.send_buffer_frames, 512);
    }

    #[test]
    fn test_validate_env_rust_log_defaults() {
        let mut guard = EnvGuard::new();
        guard.set("SIGNALING_PORT", "8443");
        guard.unset("RUST_LOG");
        guard.unset("SEND_BUFFER_FRAMES");

        let config = validate_env().expect("Expected valid configuration");
        assert_eq!(config.rust_log, "info");
    }
}
