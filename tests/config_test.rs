//! Tests for config module

use std::path::PathBuf;
use std::time::Duration;

use bulk_import::config::{
    clamp_parallelism, Config, ConfigOptions, PrepareOptions, UploadOptions, DEFAULT_ENDPOINT,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_LIMIT, PART_SPLIT_SIZE,
};

fn test_config(endpoint: &str, api_key: &str) -> bulk_import::Result<std::sync::Arc<Config>> {
    Config::new(
        endpoint.to_string(),
        api_key.to_string(),
        ConfigOptions::default(),
    )
}

#[test]
fn test_config_new_with_valid_inputs() {
    let config = test_config(DEFAULT_ENDPOINT, "1/abcdef").unwrap();
    assert_eq!(config.endpoint, "https://api.treasuredata.com");
    assert_eq!(config.api_key, "1/abcdef");
}

#[test]
fn test_config_adds_https_prefix() {
    let config = test_config("api.example.com", "key").unwrap();
    assert_eq!(config.endpoint, "https://api.example.com");
}

#[test]
fn test_config_keeps_plain_http() {
    let config = test_config("http://localhost:9000", "key").unwrap();
    assert_eq!(config.endpoint, "http://localhost:9000");
}

#[test]
fn test_config_removes_multiple_trailing_slashes() {
    let config = test_config("https://api.example.com///", "key").unwrap();
    assert_eq!(config.endpoint, "https://api.example.com");
}

#[test]
fn test_config_empty_api_key_fails() {
    let err = test_config(DEFAULT_ENDPOINT, "  ").unwrap_err();
    assert!(err.to_string().contains("API key"));
}

#[test]
fn test_config_empty_endpoint_fails() {
    assert!(test_config(" / ", "key").is_err());
}

#[test]
fn test_config_default_values() {
    let config = test_config(DEFAULT_ENDPOINT, "key").unwrap();
    assert_eq!(config.retry.retry_limit, DEFAULT_RETRY_LIMIT);
    assert_eq!(config.retry.retry_wait, Duration::from_secs(1));
    assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
}

#[test]
fn test_config_with_custom_values() {
    let config = Config::new(
        DEFAULT_ENDPOINT.to_string(),
        "key".to_string(),
        ConfigOptions {
            retry_limit: Some(3),
            retry_wait_secs: Some(5),
            request_timeout_secs: Some(30),
        },
    )
    .unwrap();

    assert_eq!(config.retry.retry_limit, 3);
    assert_eq!(config.retry.retry_wait, Duration::from_secs(5));
    assert_eq!(config.request_timeout_secs, 30);
}

#[test]
fn test_config_zero_timeout_fails() {
    let result = Config::new(
        DEFAULT_ENDPOINT.to_string(),
        "key".to_string(),
        ConfigOptions {
            request_timeout_secs: Some(0),
            ..Default::default()
        },
    );
    assert!(result.is_err());
}

#[test]
fn test_clamp_parallelism() {
    assert_eq!(clamp_parallelism(-3), 1);
    assert_eq!(clamp_parallelism(0), 1);
    assert_eq!(clamp_parallelism(1), 1);
    assert_eq!(clamp_parallelism(4), 4);
    assert_eq!(clamp_parallelism(9), 8);
    assert_eq!(clamp_parallelism(i64::MAX), 8);
}

#[test]
fn test_upload_options_defaults() {
    let options = UploadOptions::default();
    assert_eq!(options.prefix, "");
    assert_eq!(options.suffix_count, 0);
    assert!(!options.auto_perform);
    assert_eq!(options.parallelism(), 2);

    let options = UploadOptions {
        parallel: 50,
        ..Default::default()
    };
    assert_eq!(options.parallelism(), 8);
}

#[test]
fn test_prepare_options_validate() {
    let config = PrepareOptions {
        output_dir: Some(PathBuf::from("out")),
        split_size_kb: 100,
        parallel: 0,
    }
    .validate()
    .unwrap();

    assert_eq!(config.output_dir, PathBuf::from("out"));
    assert_eq!(config.split_size, 100 * 1024);
    assert_eq!(config.parallel, 1);
}

#[test]
fn test_prepare_options_default_split_size() {
    let config = PrepareOptions {
        output_dir: Some(PathBuf::from("out")),
        ..Default::default()
    }
    .validate()
    .unwrap();
    assert_eq!(config.split_size, PART_SPLIT_SIZE);
}

#[test]
fn test_prepare_options_rejects_bad_split_size() {
    let zero = PrepareOptions {
        output_dir: Some(PathBuf::from("out")),
        split_size_kb: 0,
        parallel: 1,
    };
    assert!(zero.validate().is_err());

    let huge = PrepareOptions {
        output_dir: Some(PathBuf::from("out")),
        split_size_kb: u64::MAX,
        parallel: 1,
    };
    assert!(huge.validate().unwrap_err().to_string().contains("too large"));
}
