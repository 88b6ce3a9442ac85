//! `crawl`: issue one request through a session and print the result.

use std::path::PathBuf;

use clap::Parser;

use crawl_client::config::{load_config, ClientConfig};
use crawl_client::observability::logging;
use crawl_client::{Method, RequestOptions, Session};

#[derive(Parser)]
#[command(name = "crawl")]
#[command(about = "Send an HTTP request with retries, auth and adapters from a TOML config", long_about = None)]
struct Cli {
    /// Absolute URL, or a path resolved against the configured endpoint.
    url: String,

    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// TOML client configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extra header, `Name: value`. Repeatable.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body sent as text.
    #[arg(short, long)]
    data: Option<String>,

    /// Override the retry count.
    #[arg(long)]
    retries: Option<u32>,

    /// Total timeout in seconds.
    #[arg(short, long)]
    timeout: Option<f64>,

    #[arg(long)]
    no_redirects: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(retries) = cli.retries {
        config.retry.attempts = retries;
    }
    let absolute = cli.url.starts_with("http://") || cli.url.starts_with("https://");
    if absolute && cli.config.is_none() {
        config.endpoint = cli.url.clone();
    }

    let method: Method = cli.method.to_uppercase().parse()?;
    let mut options = RequestOptions::new();
    for header in &cli.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("header '{header}' must look like 'Name: value'"))?;
        options = options.header(name.trim(), value.trim());
    }
    if let Some(data) = cli.data {
        options = options.text(data);
    }
    if let Some(timeout) = cli.timeout {
        options = options.timeout(timeout);
    }
    if cli.no_redirects {
        options = options.redirects(false);
    }

    let mut session = Session::new(config)?;
    session.open().await?;
    let result = session.try_request(method, &cli.url, options).await;
    session.close().await;

    let response = result?;
    println!("{} {}", response.status(), response.reason());
    for (name, value) in response.headers() {
        println!("{name}: {value}");
    }
    println!();
    println!("{}", response.text().await?);
    Ok(())
}
