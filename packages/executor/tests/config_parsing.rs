use std::{fs, path::PathBuf, time::Duration};

use challenger_executor::{config::KeyConfig, ChallengerConfig, ConfigError, Executor};

/// Writes `contents` to a file unique to `name` under the temp dir.
fn write_config(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "challenger-{name}-{}.toml",
        std::process::id()
    ));
    fs::write(&path, contents).unwrap();
    path
}

const FULL: &str = r#"
[greenfield]
rpc_addrs  = ["http://127.0.0.1:26657", "http://127.0.0.1:26667"]
grpc_addrs = ["http://127.0.0.1:9090", "http://127.0.0.1:9091"]
request_timeout_secs = 3

[greenfield.key]
type = "local"
private_key = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"

[monitor]
update_client_interval_secs     = 5
update_validators_interval_secs = 30
fall_behind_threshold           = 8
deny_service_threshold_secs     = 120
height_query_attempts           = 3
height_query_delay_ms           = 200
height_query_timeout_secs       = 2

[log]
level = "debug"
use_otel = false
service_name = "challenger-test"

[metrics]
address = "127.0.0.1"
port = 9464
enabled = false
"#;

#[test]
fn full_config_is_loaded() {
    let path = write_config("full", FULL);
    let config = ChallengerConfig::from_file(&path).unwrap();
    fs::remove_file(path).unwrap();

    assert_eq!(config.greenfield.rpc_addrs.len(), 2);
    assert_eq!(config.greenfield.request_timeout(), Duration::from_secs(3));

    let monitor = config.monitor.monitor_config();
    assert_eq!(monitor.interval, Duration::from_secs(5));
    assert_eq!(monitor.fall_behind_threshold, 8);
    assert_eq!(monitor.deny_service_threshold, Duration::from_secs(120));
    assert_eq!(monitor.height_query.attempts, 3);
    assert_eq!(monitor.height_query.delay, Duration::from_millis(200));
    assert_eq!(config.monitor.validators_interval(), Duration::from_secs(30));

    assert_eq!(config.log.level(), tracing::Level::DEBUG);
    assert_eq!(config.log.service_name, "challenger-test");
    assert!(!config.metrics.enabled);
    assert!(matches!(config.greenfield.key, KeyConfig::Local { .. }));
}

#[test]
fn unpaired_addresses_abort_loading() {
    let contents = FULL.replace(
        r#"grpc_addrs = ["http://127.0.0.1:9090", "http://127.0.0.1:9091"]"#,
        r#"grpc_addrs = ["http://127.0.0.1:9090"]"#,
    );
    let path = write_config("unpaired", &contents);
    let result = ChallengerConfig::from_file(&path);
    fs::remove_file(path).unwrap();

    assert!(matches!(
        result,
        Err(ConfigError::AddressCountMismatch { rpc: 2, grpc: 1 })
    ));
}

#[tokio::test]
async fn executor_is_built_from_config() {
    let config: ChallengerConfig = FULL.parse().unwrap();
    let executor = Executor::from_config(&config).unwrap();

    assert_eq!(executor.address(), "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23");
    assert_eq!(executor.pool().len(), 2);
    assert_eq!(executor.pool().active_index(), 0);
}

#[tokio::test]
async fn bad_key_aborts_executor_construction() {
    let config: ChallengerConfig = FULL
        .replace(
            "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
            "0x1234",
        )
        .parse()
        .unwrap();

    assert!(matches!(
        Executor::from_config(&config),
        Err(ConfigError::InvalidKey(_))
    ));
}
