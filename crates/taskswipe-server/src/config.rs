use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{Context, Result, bail};
use tracing::info;

const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub access_ttl: chrono::Duration,
    pub refresh_ttl: chrono::Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = required_secret(&lookup, "TASKSWIPE_JWT_SECRET")?;
        let jwt_refresh_secret = required_secret(&lookup, "TASKSWIPE_JWT_REFRESH_SECRET")?;
        if jwt_secret == jwt_refresh_secret {
            bail!("TASKSWIPE_JWT_SECRET and TASKSWIPE_JWT_REFRESH_SECRET must differ");
        }

        let access_minutes: i64 = try_load(&lookup, "TASKSWIPE_ACCESS_TTL_MINUTES", "15")?;
        let refresh_days: i64 = try_load(&lookup, "TASKSWIPE_REFRESH_TTL_DAYS", "7")?;
        if access_minutes <= 0 || refresh_days <= 0 {
            bail!("Token lifetimes must be positive");
        }

        Ok(Self {
            host: try_load(&lookup, "TASKSWIPE_HOST", "0.0.0.0")?,
            port: try_load(&lookup, "TASKSWIPE_PORT", "3000")?,
            db_path: try_load(&lookup, "TASKSWIPE_DB_PATH", "taskswipe.db")?,
            jwt_secret,
            jwt_refresh_secret,
            access_ttl: chrono::Duration::minutes(access_minutes),
            refresh_ttl: chrono::Duration::days(refresh_days),
        })
    }
}

fn try_load<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow::anyhow!("Invalid {key} value '{raw}': {e}"))
}

fn required_secret(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    let secret = lookup(key)
        .map(|s| s.trim().to_string())
        .with_context(|| format!("{key} is not set"))?;

    if secret.is_empty() || PLACEHOLDER_SECRETS.contains(&secret.as_str()) {
        bail!("{key} is empty or still a placeholder. Set it in your .env file and restart.");
    }
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const SECRETS: [(&str, &str); 2] = [
        ("TASKSWIPE_JWT_SECRET", "access-0f3a9c"),
        ("TASKSWIPE_JWT_REFRESH_SECRET", "refresh-77b1e2"),
    ];

    #[test]
    fn defaults_apply_when_only_secrets_are_set() {
        let config = load(&SECRETS).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, PathBuf::from("taskswipe.db"));
        assert_eq!(config.access_ttl, chrono::Duration::minutes(15));
        assert_eq!(config.refresh_ttl, chrono::Duration::days(7));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = SECRETS.to_vec();
        pairs.push(("TASKSWIPE_PORT", "8080"));
        pairs.push(("TASKSWIPE_ACCESS_TTL_MINUTES", "5"));
        let config = load(&pairs).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.access_ttl, chrono::Duration::minutes(5));
    }

    #[test]
    fn malformed_values_are_fatal() {
        let mut pairs = SECRETS.to_vec();
        pairs.push(("TASKSWIPE_PORT", "not-a-port"));
        assert!(load(&pairs).is_err());

        let mut pairs = SECRETS.to_vec();
        pairs.push(("TASKSWIPE_REFRESH_TTL_DAYS", "0"));
        assert!(load(&pairs).is_err());
    }

    #[test]
    fn missing_or_placeholder_secrets_are_fatal() {
        assert!(load(&[]).is_err());
        assert!(load(&[SECRETS[0]]).is_err());
        assert!(load(&[
            ("TASKSWIPE_JWT_SECRET", "dev-secret-change-me"),
            SECRETS[1],
        ])
        .is_err());
        assert!(load(&[
            ("TASKSWIPE_JWT_SECRET", "same"),
            ("TASKSWIPE_JWT_REFRESH_SECRET", "same"),
        ])
        .is_err());
    }
}
