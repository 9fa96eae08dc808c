use catalog_api::{
    AppConfig,
    config::{ConfigError, Env, MailConfig},
};
use serial_test::serial;
use std::{env, panic};

const CONFIG_VARS: &[&str] = &[
    "APP_ENV",
    "DATABASE_URL",
    "JWT_SECRET",
    "TOKEN_TTL_SECS",
    "BIND_ADDR",
    "MAIL_API_URL",
    "MAIL_API_KEY",
    "MAIL_FROM",
    "ADMIN_USERNAME",
    "ADMIN_EMAIL",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` with exactly `vars` set (every other config variable cleared), then
/// restores the original environment, even if the test panics.
fn run_with_env<T, R>(vars: &[(&str, &str)], test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals {
        unsafe {
            match original_value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn database_url_is_always_required() {
    let result = run_with_env(&[], AppConfig::load);
    assert!(matches!(result, Err(ConfigError::Missing("DATABASE_URL"))));
}

#[test]
#[serial]
fn local_mode_falls_back_to_development_defaults() {
    let config = run_with_env(&[("DATABASE_URL", "postgres://u:p@localhost/db")], AppConfig::load)
        .expect("local config should load");

    assert_eq!(config.env, Env::Local);
    assert!(!config.dev_auth_bypass);
    assert_eq!(config.bind_addr, "0.0.0.0:3000");
    assert_eq!(config.token_ttl_secs, 86_400);
    assert!(!config.jwt_secret.is_empty());
    assert!(config.mail.is_none());
    assert!(config.bootstrap_admin.is_none());
}

#[test]
#[serial]
fn explicit_local_env_enables_header_bypass() {
    let config = run_with_env(
        &[
            ("APP_ENV", "local"),
            ("DATABASE_URL", "postgres://u:p@localhost/db"),
        ],
        AppConfig::load,
    )
    .expect("local config should load");

    assert_eq!(config.env, Env::Local);
    assert!(config.dev_auth_bypass);
}

#[test]
#[serial]
fn production_requires_jwt_secret() {
    let result = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://u:p@db/prod"),
            ("MAIL_API_URL", "https://mail.example.com/send"),
            ("MAIL_API_KEY", "key"),
        ],
        AppConfig::load,
    );
    assert!(matches!(result, Err(ConfigError::Missing("JWT_SECRET"))));
}

#[test]
#[serial]
fn production_requires_mail_relay() {
    let result = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://u:p@db/prod"),
            ("JWT_SECRET", "prod-secret"),
        ],
        AppConfig::load,
    );
    assert!(matches!(result, Err(ConfigError::Missing("MAIL_API_URL"))));
}

#[test]
#[serial]
fn mail_url_without_key_is_rejected() {
    let result = run_with_env(
        &[
            ("DATABASE_URL", "postgres://u:p@localhost/db"),
            ("MAIL_API_URL", "https://mail.example.com/send"),
        ],
        AppConfig::load,
    );
    assert!(matches!(result, Err(ConfigError::Missing("MAIL_API_KEY"))));
}

#[test]
#[serial]
fn production_loads_with_every_secret() {
    let config = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://u:p@db/prod"),
            ("JWT_SECRET", "prod-secret"),
            ("TOKEN_TTL_SECS", "3600"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("MAIL_API_URL", "https://mail.example.com/send"),
            ("MAIL_API_KEY", "key"),
            ("ADMIN_USERNAME", "root"),
            ("ADMIN_EMAIL", "root@example.com"),
        ],
        AppConfig::load,
    )
    .expect("production config should load");

    assert_eq!(config.env, Env::Production);
    assert!(!config.dev_auth_bypass);
    assert_eq!(config.jwt_secret, "prod-secret");
    assert_eq!(config.token_ttl_secs, 3600);
    assert_eq!(config.bind_addr, "127.0.0.1:8080");
    assert_eq!(
        config.mail,
        Some(MailConfig {
            api_url: "https://mail.example.com/send".into(),
            api_key: "key".into(),
        })
    );
    assert_eq!(
        config.bootstrap_admin.map(|admin| admin.username),
        Some("root".to_string())
    );
}

#[test]
#[serial]
fn malformed_token_ttl_is_reported() {
    let result = run_with_env(
        &[
            ("DATABASE_URL", "postgres://u:p@localhost/db"),
            ("TOKEN_TTL_SECS", "a day"),
        ],
        AppConfig::load,
    );
    assert!(matches!(
        result,
        Err(ConfigError::Invalid { name: "TOKEN_TTL_SECS", .. })
    ));
}

#[test]
fn default_config_is_local() {
    let config = AppConfig::default();
    assert_eq!(config.env, Env::Local);
    assert!(config.mail.is_none());
}
