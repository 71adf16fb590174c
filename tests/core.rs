//! Core infrastructure tests.

mod common;

use common::{create_memory_config, create_memory_config_with, load_config, write_config};
use guardhouse::core::config::{Config, ConfigOverrides, LogFormat, StoreBackend};
use guardhouse::core::error::{FailureOrigin, GuardError, HttpErrorMapping, StoreError};
use guardhouse::core::runtime::{ComponentHealth, Runtime};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

// ============================================================================
// Config tests
// ============================================================================

#[test]
fn parse_full_config() {
    let file = write_config(
        r#"
[guards]
lifetime_seconds = 120
max_per_user = 5

[store]
backend = "redis"

[store.redis]
address = "redis.internal:6380"
command_timeout_ms = 250
database = 2

[http]
bind = "127.0.0.1:8080"
user_id_header = "x-account-id"
cors_allowed_origin = "https://app.example.com"

[telemetry]
log_level = "debug"
log_format = "json"
"#,
    );

    let config = load_config(&file);
    assert_eq!(config.guards.lifetime_seconds, 120);
    assert_eq!(config.guards.max_per_user, 5);
    assert_eq!(config.store.backend, StoreBackend::Redis);
    assert_eq!(config.store.redis.address, "redis.internal:6380");
    assert_eq!(config.store.redis.command_timeout_ms, 250);
    assert_eq!(config.store.redis.connect_timeout_ms, 1000);
    assert_eq!(config.store.redis.database, 2);
    assert_eq!(config.http.user_id_header, "x-account-id");
    assert_eq!(config.telemetry.log_format, LogFormat::Json);
}

#[test]
fn missing_guards_section_is_rejected() {
    let file = write_config("[store]\nbackend = \"memory\"\n");
    assert!(Config::from_file(file.path()).is_err());
}

#[test]
fn negative_quota_is_rejected() {
    let file = write_config("[guards]\nlifetime_seconds = 60\nmax_per_user = -1\n");
    assert!(Config::from_file(file.path()).is_err());
}

#[test]
fn invalid_bind_is_rejected() {
    let file = write_config(
        "[guards]\nlifetime_seconds = 60\nmax_per_user = 3\n[http]\nbind = \"localhost\"\n",
    );
    let err = Config::from_file(file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("http.bind"));
}

#[test]
fn overrides_are_applied_and_validated() {
    let file = create_memory_config();

    let overrides = ConfigOverrides {
        log_level: Some("warn".to_string()),
        http_bind: Some("127.0.0.1:9999".to_string()),
        redis_address: Some("10.0.0.5:6379".to_string()),
    };
    let config = Config::load(file.path(), &overrides).unwrap();
    assert_eq!(config.telemetry.log_level, "warn");
    assert_eq!(config.http.bind, "127.0.0.1:9999");
    assert_eq!(config.store.redis.address, "10.0.0.5:6379");

    let bad = ConfigOverrides {
        log_level: Some("loud".to_string()),
        ..ConfigOverrides::default()
    };
    assert!(Config::load(file.path(), &bad).is_err());
}

#[test]
fn missing_file_is_reported() {
    let err = Config::from_file(std::path::Path::new("/nonexistent/guardhouse.toml")).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}

// ============================================================================
// Error tests
// ============================================================================

#[test]
fn error_taxonomy() {
    let cases = [
        (
            GuardError::QuotaExceeded { max: 3 },
            403,
            FailureOrigin::Client,
            false,
        ),
        (GuardError::NotFound, 404, FailureOrigin::Client, false),
        (
            GuardError::PersistenceFailure { key: "1_a".into() },
            500,
            FailureOrigin::Server,
            true,
        ),
        (
            GuardError::DeletionFailure { key: "1_a".into() },
            500,
            FailureOrigin::Server,
            true,
        ),
        (
            GuardError::StoreUnavailable(StoreError::Timeout { timeout_ms: 500 }),
            503,
            FailureOrigin::Infrastructure,
            true,
        ),
    ];

    for (error, status, origin, retriable) in cases {
        assert_eq!(HttpErrorMapping::to_status(&error), status, "{error}");
        assert_eq!(error.origin(), origin, "{error}");
        assert_eq!(error.is_retriable(), retriable, "{error}");
    }
}

#[test]
fn store_error_converts_into_guard_error() {
    let err: GuardError = StoreError::unavailable("refused").into();
    assert_eq!(err.code(), "STORE_UNAVAILABLE");
    assert_eq!(err.public_message(), "Service unavailable");
}

// ============================================================================
// Runtime tests
// ============================================================================

async fn http_get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        path
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn runtime_serves_health_until_stopped() {
    let config = load_config(&create_memory_config_with(30, 2));
    let mut runtime = Runtime::new(config).unwrap();

    runtime.start().await.unwrap();
    assert!(runtime.is_running());
    assert!(runtime.health().is_ready());
    assert_eq!(runtime.manager().unwrap().policy().max_per_user, 2);

    let addr = runtime.local_addr().unwrap();
    let response = http_get(addr, "/health").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains(r#""status":"ok""#), "{response}");
    assert!(response.contains(r#""store":"memory""#), "{response}");

    runtime.stop().await.unwrap();
    assert!(!runtime.is_running());
    assert!(runtime.manager().is_none());
    assert_eq!(runtime.health().http, ComponentHealth::Stopped);
    assert_eq!(runtime.health().store, ComponentHealth::Stopped);
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn runtime_run_returns_after_shutdown_request() {
    let config = load_config(&create_memory_config());
    let mut runtime = Runtime::new(config).unwrap();
    let shutdown = runtime.shutdown_handle();

    let task = tokio::spawn(async move {
        let result = runtime.run().await;
        (result, runtime)
    });

    shutdown.shutdown();
    let (result, runtime) = tokio::time::timeout(std::time::Duration::from_secs(10), task)
        .await
        .expect("run() did not return after shutdown")
        .unwrap();

    result.unwrap();
    assert!(!runtime.is_running());
    assert_eq!(runtime.health().store, ComponentHealth::Stopped);
}

#[tokio::test]
async fn runtime_fails_to_start_without_redis() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let config = Config::from_toml(&format!(
        r#"
[guards]
lifetime_seconds = 60
max_per_user = 3

[store.redis]
address = "{}"
connect_timeout_ms = 200

[http]
bind = "127.0.0.1:0"
"#,
        address
    ))
    .unwrap();

    let mut runtime = Runtime::new(config).unwrap();
    let err = runtime.start().await.unwrap_err();
    assert!(format!("{:#}", err).contains("failed to open guard store"));
    assert_eq!(runtime.health().store, ComponentHealth::Failed);
}
