use booking::config::{ConfigError, ConfigLoader};
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const SECRET: &str = "a-very-long-test-secret-of-at-least-32-bytes";

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    for key in [
        "BOOKING_PROFILE",
        "BOOKING_API_BIND_ADDR",
        "BOOKING_LOG_LEVEL",
        "BOOKING_JWT_SECRET",
        "BOOKING_PRINCIPAL_ADMIN_EMAIL",
        "BOOKING_TOTAL_AXES",
        "BOOKING_CORS_ALLOWED_ORIGINS",
        "BOOKING_ADMIN_PASSWORD",
        "BOOKING_RATE_LIMIT_LOGIN_PER_MINUTE",
        "BOOKING_RATE_LIMIT_USER_PER_MINUTE",
    ] {
        unsafe {
            env::remove_var(key);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

fn empty_dir_loader() -> (TempDir, ConfigLoader) {
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    (temp_dir, loader)
}

#[test]
fn loads_defaults_when_only_secret_present() {
    let _guard = env_guard();
    clear_env();
    unsafe {
        env::set_var("BOOKING_JWT_SECRET", SECRET);
    }

    let (_dir, loader) = empty_dir_loader();
    let cfg = loader.load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.total_axes, 7);
    assert_eq!(cfg.access_token_ttl_seconds, 86_400);
    assert_eq!(cfg.refresh_token_ttl_seconds, 604_800);
    assert!(cfg.seed_axes_on_startup);
    assert!(cfg.cors_allowed_origins.is_empty());
    assert_eq!(cfg.rate_limit_login_per_minute, 5);
    assert_eq!(cfg.rate_limit_anon_per_minute, 20);
    assert_eq!(cfg.rate_limit_user_per_minute, 100);
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn missing_secret_is_rejected() {
    let _guard = env_guard();
    clear_env();

    let (_dir, loader) = empty_dir_loader();
    let err = loader.load().expect_err("secret is required");
    assert!(matches!(err, ConfigError::MissingJwtSecret));
    clear_env();
}

#[test]
fn short_secret_is_rejected() {
    let _guard = env_guard();
    clear_env();
    unsafe {
        env::set_var("BOOKING_JWT_SECRET", "too-short");
    }

    let (_dir, loader) = empty_dir_loader();
    let err = loader.load().expect_err("short secret should fail");
    assert!(matches!(err, ConfigError::JwtSecretTooShort { length: 9 }));
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        &format!("BOOKING_API_BIND_ADDR=127.0.0.1:3000\nBOOKING_JWT_SECRET={SECRET}\n"),
    );
    write_env_file(&temp_dir, ".env.test", "BOOKING_API_BIND_ADDR=192.168.0.10:5000\n");
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "BOOKING_API_BIND_ADDR=10.0.0.5:6000\nBOOKING_TOTAL_AXES=9\n",
    );
    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "BOOKING_PROFILE=test\nBOOKING_API_BIND_ADDR=127.0.0.1:4000\n",
    );

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.total_axes, 9);
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        &format!(
            "BOOKING_API_BIND_ADDR=127.0.0.1:3000\nBOOKING_JWT_SECRET={SECRET}\nBOOKING_PRINCIPAL_ADMIN_EMAIL=file@example.com\n"
        ),
    );
    unsafe {
        env::set_var("BOOKING_API_BIND_ADDR", "0.0.0.0:9090");
        env::set_var("BOOKING_PRINCIPAL_ADMIN_EMAIL", "Boss@Example.com");
        env::set_var(
            "BOOKING_CORS_ALLOWED_ORIGINS",
            "http://localhost:3000, https://booking.example.com",
        );
    }

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with env override");

    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert_eq!(cfg.principal_admin_email, "boss@example.com");
    assert!(cfg.is_principal_admin("BOSS@example.com"));
    assert_eq!(
        cfg.cors_allowed_origins,
        ["http://localhost:3000", "https://booking.example.com"]
    );
    clear_env();
}

#[test]
fn rate_limits_are_configurable() {
    let _guard = env_guard();
    clear_env();
    unsafe {
        env::set_var("BOOKING_JWT_SECRET", SECRET);
        env::set_var("BOOKING_RATE_LIMIT_LOGIN_PER_MINUTE", "0");
        env::set_var("BOOKING_RATE_LIMIT_USER_PER_MINUTE", "250");
    }

    let (_dir, loader) = empty_dir_loader();
    let cfg = loader.load().expect("config loads with rate limits");

    assert_eq!(cfg.rate_limit_login_per_minute, 0);
    assert_eq!(cfg.rate_limit_user_per_minute, 250);
    assert_eq!(cfg.rate_limit_anon_per_minute, 20);
    clear_env();
}

#[test]
fn invalid_bind_addr_returns_error() {
    let _guard = env_guard();
    clear_env();
    unsafe {
        env::set_var("BOOKING_API_BIND_ADDR", "not-an-addr");
        env::set_var("BOOKING_JWT_SECRET", SECRET);
    }

    let (_dir, loader) = empty_dir_loader();
    let err = loader.load().expect_err("invalid bind addr should fail");
    assert!(format!("{}", err).contains("invalid api bind address"));
    clear_env();
}

#[test]
fn unparsable_number_names_the_key() {
    let _guard = env_guard();
    clear_env();
    unsafe {
        env::set_var("BOOKING_JWT_SECRET", SECRET);
        env::set_var("BOOKING_TOTAL_AXES", "seven");
    }

    let (_dir, loader) = empty_dir_loader();
    let err = loader.load().expect_err("non-numeric total axes should fail");
    assert!(format!("{}", err).contains("BOOKING_TOTAL_AXES"));
    clear_env();
}

#[test]
fn redacted_json_hides_secrets() {
    let _guard = env_guard();
    clear_env();
    unsafe {
        env::set_var("BOOKING_JWT_SECRET", SECRET);
        env::set_var("BOOKING_ADMIN_PASSWORD", "bootstrap-password");
    }

    let (_dir, loader) = empty_dir_loader();
    let cfg = loader.load().unwrap();
    let json = cfg.redacted_json().unwrap();

    assert!(!json.contains(SECRET));
    assert!(!json.contains("bootstrap-password"));
    clear_env();
}
