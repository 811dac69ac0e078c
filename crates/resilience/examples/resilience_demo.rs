// crates/resilience/examples/resilience_demo.rs
//! Demonstration of resilience patterns

use socialdeck_resilience::{
    with_retry, with_retry_and_jitter, CircuitBreaker, CircuitBreakerConfig, RetryOptions,
    ServiceError, Timeout,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[tokio::main]
async fn main() {
    env_logger::init();

    println!("Resilience Patterns Demo");
    println!("========================\n");

    demo_retry().await;
    println!();
    demo_jitter().await;
    println!();
    demo_circuit_breaker().await;
    println!();
    demo_timeout().await;
}

async fn demo_retry() {
    println!("1. Retry Pattern");
    println!("----------------");

    let options = RetryOptions::new(3)
        .with_initial_delay(Duration::from_millis(100))
        .with_backoff_factor(2.0);
    let attempts = AtomicU32::new(0);

    let result = with_retry(&options, || {
        let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        println!("  Attempt {}", n);
        async move {
            if n < 3 {
                Err(ServiceError::new("ECONNRESET"))
            } else {
                Ok("post published")
            }
        }
    })
    .await;

    match result {
        Ok(value) => println!("✓ Success after retries: {}", value),
        Err(e) => println!("✗ Failed: {}", e),
    }
}

async fn demo_jitter() {
    println!("2. Jittered Backoff");
    println!("-------------------");

    let options = RetryOptions::new(5).with_initial_delay(Duration::from_millis(100));
    for attempt in 2..=5 {
        println!(
            "  Attempt {}: base {:?}, jittered {:?}",
            attempt,
            options.delay_for_attempt(attempt),
            options.jittered_delay(attempt)
        );
    }

    let result = with_retry_and_jitter(&options, || async {
        Err::<(), _>(ServiceError::http(401, "Unauthorized"))
    })
    .await;
    println!("✓ Fatal error surfaced immediately: {}", result.unwrap_err());
}

async fn demo_circuit_breaker() {
    println!("3. Circuit Breaker Pattern");
    println!("--------------------------");

    let config = CircuitBreakerConfig::new(3, Duration::from_millis(200), 2);
    let cb = CircuitBreaker::new(config).named("ai-provider");

    for i in 1..=3 {
        let _ = cb
            .execute(|| async { Err::<(), _>(ServiceError::http(503, "Service Unavailable")) })
            .await;
        println!("  Failure {} recorded, state: {}", i, cb.state());
    }

    match cb.execute(|| async { Ok::<_, ServiceError>(()) }).await {
        Err(e) if e.is_circuit_open() => println!("✓ Request rejected: {}", e),
        other => println!("✗ Unexpected result: {:?}", other),
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    for _ in 0..2 {
        let _ = cb.execute(|| async { Ok::<_, ServiceError>(()) }).await;
        println!("  Probe succeeded, state: {}", cb.state());
    }
}

async fn demo_timeout() {
    println!("4. Timeout Pattern");
    println!("------------------");

    let timeout = Timeout::new(Duration::from_millis(50));

    let result = timeout
        .execute(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<_, ServiceError>("fast response")
        })
        .await;
    println!("✓ Fast operation: {:?}", result.ok());

    let result = timeout
        .execute(async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, ServiceError>("slow response")
        })
        .await;
    println!("✓ Slow operation: {}", result.unwrap_err());
}
