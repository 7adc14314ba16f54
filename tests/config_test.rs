use std::env;
use std::sync::Mutex;

use qrlink::config::Config;

// Mutex to ensure tests that modify env vars don't run in parallel
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const VARS: &[&str] = &["PORT", "DATABASE_URL", "URL", "BCRYPT_COST", "IMPORT_DOCUMENT"];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
fn test_config_defaults() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_env();

    let config = Config::from_env();

    assert_eq!(config.port, 8080);
    assert_eq!(config.database_url, "data.db");
    assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
    assert!(config.import_document.is_none());
    assert_eq!(config.short_domain(), "http://localhost:8080");
}

#[test]
fn test_config_from_env() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_env();
    env::set_var("PORT", "3000");
    env::set_var("DATABASE_URL", "/tmp/links.db");
    env::set_var("URL", "https://sho.rt");
    env::set_var("BCRYPT_COST", "6");
    env::set_var("IMPORT_DOCUMENT", "legacy.json");

    let config = Config::from_env();

    assert_eq!(config.port, 3000);
    assert_eq!(config.database_url, "/tmp/links.db");
    assert_eq!(config.bcrypt_cost, 6);
    assert_eq!(config.import_document.as_deref(), Some("legacy.json"));
    assert_eq!(config.short_domain(), "https://sho.rt:3000");

    clear_env();
}

#[test]
fn test_config_ignores_unparsable_values() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clear_env();
    env::set_var("PORT", "not-a-port");
    env::set_var("BCRYPT_COST", "high");
    env::set_var("IMPORT_DOCUMENT", "");

    let config = Config::from_env();

    assert_eq!(config.port, 8080);
    assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
    assert!(config.import_document.is_none());

    clear_env();
}

#[test]
fn test_config_rejects_out_of_range_bcrypt_cost() {
    let _guard = ENV_MUTEX.lock().unwrap();

    for cost in ["2", "3", "32", "40"] {
        clear_env();
        env::set_var("BCRYPT_COST", cost);
        assert_eq!(Config::from_env().bcrypt_cost, bcrypt::DEFAULT_COST, "cost {}", cost);
    }

    for (cost, expected) in [("4", 4), ("31", 31)] {
        clear_env();
        env::set_var("BCRYPT_COST", cost);
        assert_eq!(Config::from_env().bcrypt_cost, expected);
    }

    clear_env();
}
