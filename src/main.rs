use std::env;
use visa_dashboard::app;
use visa_dashboard::config::DashboardConfig;

/// Dashboard web server
///
/// Usage: `visa-dashboard [--config FILE] [--addr HOST:PORT]`. Without
/// `--config` the built-in defaults are used; `--addr` overrides the bind
/// address from the configuration.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let mut config_path = None;
    let mut addr = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next(),
            "--addr" => addr = args.next(),
            other => {
                eprintln!("Usage: visa-dashboard [--config FILE] [--addr HOST:PORT]");
                return Err(format!("unexpected argument: {}", other).into());
            }
        }
    }

    let mut config = match config_path {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(addr) = addr {
        config.bind_addr = addr;
    }
    config.validate()?;

    app::run(config).await
}
