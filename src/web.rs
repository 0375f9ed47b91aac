#![cfg(not(tarpaulin_include))]

use cartesian_plot::{app, config::Config, logging};

/// Entry point of the plot viewer
///
/// Loads the configuration from `CARTESIAN_*` environment variables, fetches
/// the table and plots once, then serves them on `CARTESIAN_VIEWER_ADDR`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    let config = Config::from_env();
    app::run(config).await
}
