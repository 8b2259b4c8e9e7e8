//! Basic circuit breaker usage example

use disyuntor::{Breaker, CircuitError, ManualClock};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    println!("=== Circuit Breaker Basic Example ===\n");

    // Simulated time so the example doesn't have to sleep
    let clock = Arc::new(ManualClock::new(0.0));

    let breaker: Breaker<String, String> = Breaker::builder("payment_api")
        .threshold(3)
        .timeout_secs(10.0)
        .clock(clock.clone())
        .on_open(|name| println!("🔴 Circuit '{}' opened!", name))
        .on_close(|name| println!("🟢 Circuit '{}' closed!", name))
        .on_half_open(|name| println!("🟡 Circuit '{}' half-open, testing...", name))
        .build()
        .expect("valid breaker config");

    println!("Initial state: {}\n", breaker.state());

    println!("--- Successful calls ---");
    for i in 1..=2 {
        match breaker.attempt(|| Ok(format!("Payment {}", i))) {
            Ok(result) => println!("✓ {}", result),
            Err(e) => println!("✗ Error: {}", e),
        }
    }
    println!("State: {}\n", breaker.state());

    println!("--- Triggering failures ---");
    for i in 1..=3 {
        match breaker.attempt(|| Err(format!("Payment failed {}", i))) {
            Ok(_) => println!("✓ Success"),
            Err(e) => println!("✗ {}", e),
        }
    }
    println!(
        "State: {} after {} failures\n",
        breaker.state(),
        breaker.failures()
    );

    println!("--- Attempting call 5s after opening ---");
    clock.advance(5.0);
    match breaker.attempt(|| Ok("Should be rejected".to_string())) {
        Ok(_) => println!("✓ Success"),
        Err(e @ CircuitError::Open { .. }) => println!("⏸ Not attempted: {}", e),
        Err(e) => println!("✗ {}", e),
    }
    println!();

    println!("--- Trial call 11s after opening ---");
    clock.advance(6.0);
    match breaker.attempt(|| Ok("Payment successful".to_string())) {
        Ok(result) => println!("✓ {}", result),
        Err(e) => println!("✗ {}", e),
    }
    println!(
        "State: {}, failures: {}",
        breaker.state(),
        breaker.failures()
    );
}
