//! Tests for the retry module

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use bulk_import::retry::{execute, RetryPolicy};

#[tokio::test]
async fn test_always_failing_op_runs_budget_plus_one_times() {
    let attempts = AtomicU32::new(0);
    let counter = &attempts;

    let result: Result<(), String> = execute(
        "part",
        move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Err(format!("failure {}", n))
        },
        3,
        Duration::from_millis(1),
    )
    .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 4);
    // The last error comes back unchanged
    assert_eq!(result.unwrap_err(), "failure 4");
}

#[tokio::test]
async fn test_success_on_later_attempt() {
    let attempts = AtomicU32::new(0);
    let counter = &attempts;

    let result: Result<u32, String> = execute(
        "part",
        move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err("not yet".to_string())
            } else {
                Ok(n)
            }
        },
        5,
        Duration::from_millis(1),
    )
    .await;

    assert_eq!(result.unwrap(), 3);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_success_on_last_allowed_attempt() {
    let attempts = AtomicU32::new(0);
    let counter = &attempts;

    let result: Result<(), String> = execute(
        "part",
        move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= 2 {
                Err("flaky".to_string())
            } else {
                Ok(())
            }
        },
        2,
        Duration::from_millis(1),
    )
    .await;

    assert!(result.is_ok());
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_zero_budget_makes_single_attempt() {
    let attempts = AtomicU32::new(0);
    let counter = &attempts;

    let result: Result<(), &str> = execute(
        "part",
        move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("down")
        },
        0,
        Duration::from_secs(60),
    )
    .await;

    assert_eq!(result.unwrap_err(), "down");
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_policy_waits_fixed_delay_between_attempts() {
    let policy = RetryPolicy::new(2, Duration::from_millis(20));
    let attempts = AtomicU32::new(0);
    let counter = &attempts;
    let started = Instant::now();

    let result: Result<(), &str> = policy
        .run("part", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("down")
        })
        .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    // Two waits of 20ms, no growth
    assert!(started.elapsed() >= Duration::from_millis(40));
}
