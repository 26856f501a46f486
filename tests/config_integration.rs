use chenge_advisor::config::AppConfig;
use serial_test::serial;
use std::env;

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("CHENGE_SERVER__PORT");
        env::remove_var("CHENGE_SERVER__HOST");
        env::remove_var("CHENGE_BACKEND__BASE_URL");
        env::remove_var("CONFIG_FILE");
        env::remove_var("PORT");
        env::remove_var("BACKEND_BASE_URL");
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["chenge-advisor"]).expect("defaults load");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.backend.base_url, "http://127.0.0.1:5000");
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("CHENGE_SERVER__PORT", "9090");
        env::set_var("CHENGE_BACKEND__BASE_URL", "http://finance.internal:8000");
    }

    let config = AppConfig::load_from_args(["chenge-advisor"]).expect("env load");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.backend.base_url, "http://finance.internal:8000");

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env_vars();
    unsafe {
        env::set_var("CHENGE_SERVER__PORT", "9090");
    }

    let config = AppConfig::load_from_args([
        "chenge-advisor",
        "--port",
        "8081",
        "--backend-url",
        "http://localhost:9999",
    ])
    .expect("cli load");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.backend.base_url, "http://localhost:9999");

    clear_env_vars();
}
