use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use skycast_core::{AppError, Config};
use skycast_weather::{Forecast, ForecastResolver};

/// Look up current weather for a place name or postal code.
#[derive(Parser)]
#[command(name = "skycast", version, about)]
struct Cli {
    /// Place name (e.g. "Hyderabad") or postal code (e.g. "500001")
    input: String,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Use this config file instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    skycast_core::init()?;

    match run(&cli).await {
        Ok(forecast) => {
            print_forecast(&forecast, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::debug!("Lookup failed: {}", e);
            print_error(&e, cli.json)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(cli: &Cli) -> Result<Forecast, AppError> {
    let (config, _warnings) = Config::load_validated(cli.config.as_deref())?;
    let resolver = ForecastResolver::from_config(&config)?;

    let forecast = resolver.resolve(&cli.input).await?;
    tracing::info!(
        "Resolved {:?} to {} (from cache: {})",
        cli.input.trim(),
        forecast.location,
        forecast.from_cache
    );
    Ok(forecast)
}

fn print_forecast(forecast: &Forecast, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(forecast)?);
        return Ok(());
    }

    println!("{}", forecast.location);
    if let Some(description) = &forecast.description {
        println!("  {}", description);
    }
    if let Some(temp) = forecast.temperature {
        println!("  Temperature: {:.1} °C", temp);
    }
    if let Some(feels_like) = forecast.feels_like {
        println!("  Feels like:  {:.1} °C", feels_like);
    }
    if let Some(humidity) = forecast.humidity {
        println!("  Humidity:    {}%", humidity);
    }
    if forecast.from_cache {
        println!("  (cached result)");
    }
    Ok(())
}

fn print_error(error: &AppError, json: bool) -> Result<()> {
    if json {
        let body = serde_json::json!({
            "error": error.user_message(),
            "code": error.code(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        let message = error.user_message();
        eprintln!("{}", message);

        let detail = error.to_string();
        if detail != message {
            eprintln!("  {}", detail);
        }
    }
    Ok(())
}
