//! Key classification for environment and label records.

use super::records::{EnvCategory, LabelCategory};

/// Case-insensitive substring markers for secret-bearing keys.
const SECRET_KEYWORDS: [&str; 9] = [
    "password",
    "secret",
    "key",
    "token",
    "auth",
    "credential",
    "pwd",
    "apikey",
    "private",
];

const DATABASE_KEYWORDS: [&str; 8] = [
    "database", "db_", "_db", "postgres", "mysql", "mongo", "redis", "sql",
];

const AUTH_KEYWORDS: [&str; 6] = [
    "password",
    "secret",
    "token",
    "auth",
    "credential",
    "apikey",
];

const CONFIG_KEYWORDS: [&str; 9] = [
    "config", "host", "port", "url", "uri", "endpoint", "path", "level", "mode",
];

/// Environment keys owned by the engine, compose, or the base image.
const SYSTEM_ENV_PREFIXES: [&str; 2] = ["DOCKER_", "COMPOSE_"];
const SYSTEM_ENV_KEYS: [&str; 3] = ["PATH", "HOME", "HOSTNAME"];

const SYSTEM_LABEL_PREFIXES: [&str; 3] = [
    "com.docker.",
    "org.opencontainers.",
    "org.label-schema.",
];
const COMPOSE_LABEL_PREFIXES: [&str; 2] = ["traefik.", "caddy"];

/// Whether an environment key looks like it carries a secret.
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SECRET_KEYWORDS.iter().any(|keyword| key.contains(keyword))
}

/// Classifies an environment key. System keys win over keyword matches so
/// `COMPOSE_PROJECT_NAME` is never tagged as a config key.
pub fn classify_env_key(key: &str) -> EnvCategory {
    if SYSTEM_ENV_KEYS.contains(&key)
        || SYSTEM_ENV_PREFIXES
            .iter()
            .any(|prefix| key.starts_with(prefix))
    {
        return EnvCategory::System;
    }
    let lower = key.to_ascii_lowercase();
    if DATABASE_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
    {
        return EnvCategory::Database;
    }
    if AUTH_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
        return EnvCategory::Auth;
    }
    if CONFIG_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
    {
        return EnvCategory::Config;
    }
    EnvCategory::Custom
}

/// Classifies a label key by its namespace prefix.
pub fn classify_label_key(key: &str) -> LabelCategory {
    if SYSTEM_LABEL_PREFIXES
        .iter()
        .any(|prefix| key.starts_with(prefix))
    {
        return LabelCategory::System;
    }
    if key.starts_with("x-") {
        return LabelCategory::Extension;
    }
    if COMPOSE_LABEL_PREFIXES
        .iter()
        .any(|prefix| key.starts_with(prefix))
    {
        return LabelCategory::Compose;
    }
    LabelCategory::Custom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_keys() {
        assert!(is_secret_key("POSTGRES_PASSWORD"));
        assert!(is_secret_key("api_token"));
        assert!(is_secret_key("SSH_PRIVATE_KEY"));
        assert!(is_secret_key("PGPASSWORD"));
        assert!(!is_secret_key("LOG_LEVEL"));
        assert!(!is_secret_key("DB_HOST"));
    }

    #[test]
    fn test_env_categories() {
        assert_eq!(classify_env_key("DATABASE_URL"), EnvCategory::Database);
        assert_eq!(classify_env_key("REDIS_HOST"), EnvCategory::Database);
        assert_eq!(classify_env_key("AUTH_TOKEN"), EnvCategory::Auth);
        assert_eq!(classify_env_key("LOG_LEVEL"), EnvCategory::Config);
        assert_eq!(classify_env_key("LISTEN_PORT"), EnvCategory::Config);
        assert_eq!(classify_env_key("PATH"), EnvCategory::System);
        assert_eq!(
            classify_env_key("COMPOSE_PROJECT_NAME"),
            EnvCategory::System
        );
        assert_eq!(classify_env_key("FEATURE_FLAG_X"), EnvCategory::Custom);
    }

    #[test]
    fn test_label_categories() {
        assert_eq!(
            classify_label_key("com.docker.compose.project"),
            LabelCategory::System
        );
        assert_eq!(
            classify_label_key("org.opencontainers.image.source"),
            LabelCategory::System
        );
        assert_eq!(classify_label_key("x-custom-tag"), LabelCategory::Extension);
        assert_eq!(
            classify_label_key("traefik.http.routers.web.rule"),
            LabelCategory::Compose
        );
        assert_eq!(classify_label_key("team"), LabelCategory::Custom);
    }
}
