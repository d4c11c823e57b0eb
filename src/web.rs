#![cfg(not(tarpaulin_include))]

use rental_admin::app;
use rental_admin::config::{self, AppConfig};
use std::env;

/// Main entry point for the admin reporting server
///
/// The listen address comes from `RENTAL_ADMIN_ADDR` (default `127.0.0.1:3000`)
/// and can be overridden by the first command-line argument.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::init_logging();

    let args: Vec<String> = env::args().collect();
    let config = AppConfig::from_env()?.with_addr_arg(args.get(1).map(String::as_str))?;

    app::run(config).await
}
