//! Examina Web Server
//!
//! Session, refresh, and route-authorization layer for the Examina
//! course platform, served over HTTP.

use clap::Parser;
use examina_core::{init_logging, ExaminaConfig};
use examina_web::server::ExaminaServerBuilder;
use examina_web::WebConfig;

/// Examina Web Server - session and authorization layer for the course platform
#[derive(Parser)]
#[command(name = "examina-web")]
#[command(about = "Session and authorization server for Examina")]
#[command(version)]
struct Args {
    /// Server host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Load application configuration before logging so its directives apply
    let app_config = match &args.config {
        Some(path) => match ExaminaConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config from {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => ExaminaConfig::default(),
    };

    let mut logging = app_config.logging.clone();
    logging.level = args.log_level.clone();
    if let Err(e) = init_logging(&logging) {
        eprintln!("❌ Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    // Binding configuration: environment first, flags win
    let mut web_config = WebConfig::from_env();
    web_config.host = args.host;
    web_config.port = args.port;

    println!("🚀 Starting Examina Web Server");
    println!("📍 Server: http://{}:{}", web_config.host, web_config.port);
    println!("🔐 Token issuer: {}", app_config.auth.refresh_url);

    // One in-memory session slot: this binary serves a single
    // signed-in identity (see ExaminaServerBuilder::single_session)
    let server = match ExaminaServerBuilder::new()
        .host(web_config.host)
        .port(web_config.port)
        .app_config(app_config)
        .single_session()
        .build()
    {
        Ok(server) => server,
        Err(e) => {
            eprintln!("❌ Failed to build server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        eprintln!("❌ Server error: {}", e);
        std::process::exit(1);
    }
}
