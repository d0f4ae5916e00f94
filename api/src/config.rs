use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

impl Env {
    fn parse(value: &str) -> Self {
        match value {
            "dev" => Env::Dev,
            "staging" => Env::Staging,
            "production" => Env::Production,
            _ => Env::Dev,
        }
    }

    pub fn from_env() -> Self {
        match var("ENVIRONMENT") {
            Ok(Some(env)) => Env::parse(&env),
            _ => Env::Dev,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub env: Env,
    pub database_url: String,
    pub database_max_connections: usize,
    pub port: u16,
    /// Public base URL, used to build the location of stored uploads
    pub site_url: String,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub cors_allowed_origins: Vec<String>,
    pub session_ttl_days: i64,
}

fn var(key: &str) -> Result<Option<String>, String> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(e) => match e {
            std::env::VarError::NotPresent => Ok(None),
            std::env::VarError::NotUnicode(_) => Err(format!(
                "Could not get the environment variable `{key}` due to unicode error"
            )),
        },
    }
}

fn required_var(key: &str) -> String {
    let val = var(key);
    match val {
        Ok(val) => match val {
            Some(val) => val,
            None => {
                tracing::error!("Environment variable `{key}` is required");
                std::process::exit(1)
            }
        },
        Err(e) => {
            tracing::error!(
                "Environment variable `{key}` is required, but could not retrieve: {e}"
            );
            std::process::exit(1)
        }
    }
}

/// Reads an optional variable and parses it, falling back to `default` when
/// it is missing or malformed.
fn parsed_var<T: FromStr>(key: &str, default: T) -> T {
    match var(key) {
        Ok(Some(raw)) => match raw.trim().parse() {
            Ok(val) => val,
            Err(_) => {
                tracing::warn!(
                    "Environment variable `{key}` has an invalid value `{raw}`, using default"
                );
                default
            }
        },
        Ok(None) => default,
        Err(e) => {
            tracing::warn!("{e}, using default");
            default
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_owned)
        .collect()
}

impl ServerConfig {
    pub fn new_from_env() -> Self {
        let port = parsed_var("PORT", 3000u16);

        let site_url = match var("SITE_URL") {
            Ok(Some(url)) => url.trim_end_matches('/').to_owned(),
            _ => format!("http://localhost:{port}"),
        };

        ServerConfig {
            env: Env::from_env(),
            database_url: required_var("DATABASE_URL"),
            database_max_connections: parsed_var("DATABASE_MAX_CONNECTIONS", 10),
            port,
            site_url,
            upload_dir: var("UPLOAD_DIR")
                .ok()
                .flatten()
                .unwrap_or_else(|| "uploads".into()),
            max_upload_bytes: parsed_var("MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            cors_allowed_origins: match var("CORS_ALLOWED_ORIGINS") {
                Ok(Some(raw)) => parse_origins(&raw),
                _ => Vec::new(),
            },
            session_ttl_days: parsed_var("SESSION_TTL_DAYS", 30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_environment_falls_back_to_dev() {
        assert_eq!(Env::parse("production"), Env::Production);
        assert_eq!(Env::parse("staging"), Env::Staging);
        assert_eq!(Env::parse("qa"), Env::Dev);
    }

    #[test]
    fn origins_are_trimmed_and_blanks_dropped() {
        assert_eq!(
            parse_origins(" https://example.com/, ,http://localhost:5173"),
            vec!["https://example.com", "http://localhost:5173"]
        );
        assert!(parse_origins("").is_empty());
    }
}
