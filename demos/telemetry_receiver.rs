//! A receiver factory with separate traces and logs entry points.
//!
//! Demonstrates:
//! - Declaring a process-wide registry with `define_shared_registry!`
//! - Two entry points resolving one erased config to the same receiver
//! - Attaching a logs consumer through one handle, using it through the other
//! - Shutting down and rebuilding the receiver for the same config
//!
//! Run with: `cargo run --example telemetry_receiver`

use parking_lot::Mutex;
use shared_component::{define_shared_registry, Component, ErasedConfig, RegistryError, Shared};
use std::convert::Infallible;
use std::error::Error;
use std::sync::Arc;

struct Config {
    extension_id: String,
}

type LogsConsumer = Box<dyn Fn(&str) + Send + Sync>;

struct Receiver {
    extension_id: String,
    logs: Mutex<Option<LogsConsumer>>,
}

impl Component for Receiver {
    type Error = Infallible;

    fn start(&self) -> Result<(), Infallible> {
        println!("   [{}] listener started", self.extension_id);
        Ok(())
    }

    fn shutdown(&self) -> Result<(), Infallible> {
        println!("   [{}] listener stopped", self.extension_id);
        Ok(())
    }
}

define_shared_registry!(RECEIVERS: Config => Receiver);

type Handle = Shared<Config, Receiver>;

fn build(config: &Arc<Config>) -> Result<Receiver, Infallible> {
    println!("   building receiver for {}", config.extension_id);
    Ok(Receiver {
        extension_id: config.extension_id.clone(),
        logs: Mutex::new(None),
    })
}

fn create_traces(config: &ErasedConfig) -> Result<Handle, RegistryError<Infallible>> {
    RECEIVERS.get_or_add_erased(config, build)
}

fn create_logs(
    config: &ErasedConfig,
    consumer: LogsConsumer,
) -> Result<Handle, RegistryError<Infallible>> {
    let receiver = RECEIVERS.get_or_add_erased(config, build)?;
    *receiver.logs.lock() = Some(consumer);
    Ok(receiver)
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("=== shared-component: Telemetry Receiver ===\n");

    RECEIVERS.set_trace_callback(|event| println!("   [trace] {}", event));

    let config = ErasedConfig::erase(Arc::new(Config {
        extension_id: "telemetry-ext".to_string(),
    }));

    // -------------------------------------------------------------------------
    // 1. Both entry points share one receiver
    // -------------------------------------------------------------------------
    println!("1. Creating traces and logs receivers...");

    let traces = create_traces(&config)?;
    let logs = create_logs(&config, Box::new(|line: &str| println!("   log consumer got: {line}")))?;

    println!("   same instance: {}\n", Shared::ptr_eq(&traces, &logs));

    // -------------------------------------------------------------------------
    // 2. Capabilities registered on one handle are visible on the other
    // -------------------------------------------------------------------------
    println!("2. Delivering a log line through the traces handle...");

    if let Some(consumer) = traces.logs.lock().as_ref() {
        consumer("platform.initStart");
    }
    println!();

    // -------------------------------------------------------------------------
    // 3. Start once, shut down once
    // -------------------------------------------------------------------------
    println!("3. Starting and stopping through both handles...");

    traces.start()?;
    logs.start()?;
    traces.shutdown()?;
    logs.shutdown()?;

    println!("   registry empty: {}\n", RECEIVERS.is_empty());

    // -------------------------------------------------------------------------
    // 4. The same config builds a new generation
    // -------------------------------------------------------------------------
    println!("4. Rebuilding after shutdown...");

    let rebuilt = create_traces(&config)?;
    println!(
        "   generation {} -> {}",
        traces.generation(),
        rebuilt.generation()
    );

    println!("\n=== Done ===");
    Ok(())
}
