//! Connection smoke test against a configured SurrealDB instance
//! Run with: cargo run --package release-store --example connect

use release_store::{ConnectionConfig, Driver, DriverOptions, SurrealDriver};

#[tokio::main]
async fn main() {
    // Load from environment
    dotenvy::dotenv().ok();

    println!("Testing SurrealDB connection...");

    let config = match ConnectionConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Missing configuration: {}", e);
            std::process::exit(1);
        }
    };
    let options = match DriverOptions::from_env() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("✗ Invalid driver options: {}", e);
            std::process::exit(1);
        }
    };

    println!("  Endpoint: {}", config.endpoint);
    println!("  Namespace: {}", config.namespace);
    println!("  Database: {}", config.database);
    println!("  Owner: {}", options.owner);

    match SurrealDriver::connect(&config, options).await {
        Ok(driver) => {
            println!("\n✓ Connected and schema initialized!");
            match driver.list(&|_| true).await {
                Ok(releases) => println!("✓ {} release(s) stored", releases.len()),
                Err(e) => {
                    eprintln!("✗ Listing releases failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("\n✗ Connection failed: {}", e);
            std::process::exit(1);
        }
    }
}
