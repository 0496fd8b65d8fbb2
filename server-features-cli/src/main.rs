mod config;
mod remote;
mod server;
mod telemetry;

use std::process;

use clap::{Parser, Subcommand};
use server_features::registry::builtin;
use server_features::{resolve, Feature, ResolvedFeatureSet};

use self::config::FeaturesConfig;
use self::server::ServeOptions;

#[derive(Parser, Debug)]
#[command(name = "server-features")]
#[command(version)]
#[command(about = "Which client features a backend version supports", long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every feature with the minimum backend version it needs
    List,
    /// Resolve every feature against a backend version
    Resolve {
        /// Backend version, e.g. 3.4.0
        version: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Exit with 0 when FEATURE is available on VERSION, 1 when it is not
    Check {
        /// Feature id, e.g. excludeBotsOnShortUrls
        feature: String,

        /// Backend version, e.g. 3.4.0
        version: String,
    },
    /// Ask a running backend for its version and resolve against it
    Probe {
        /// Backend base URL
        #[arg(short = 's', long = "server")]
        server: Option<String>,

        /// API key sent as X-Api-Key
        #[arg(short = 'k', long = "api-key")]
        api_key: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Path to config file
        #[arg(short = 'c', long = "config", default_value = "features.toml")]
        config: String,
    },
    /// Serve the feature set of one backend over HTTP
    Serve {
        /// Port to listen on
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,

        /// Address to bind
        #[arg(long = "hostname")]
        hostname: Option<String>,

        /// Path to config file
        #[arg(short = 'c', long = "config", default_value = "features.toml")]
        config: String,

        /// Backend version to publish at startup
        #[arg(long = "server-version")]
        server_version: Option<String>,

        /// Backend base URL to read the version from
        #[arg(short = 's', long = "server")]
        server: Option<String>,

        /// Re-read server_version from the config file when it changes (ignored when --server-version is given)
        #[arg(short = 'w', long = "watch")]
        watch: bool,

        /// Re-fetch the backend version every SECS seconds
        #[arg(long = "poll")]
        poll: Option<u64>,
    },
}

fn run_list() {
    for (feature, minimum) in builtin().entries() {
        println!("{:<32} >= {}", feature.id(), minimum);
    }
}

fn print_set(set: &ResolvedFeatureSet, json: bool) {
    if json {
        println!("{:#}", set.to_json());
        return;
    }
    match set.version() {
        Some(version) => println!("backend {}", version),
        None => println!("backend version unknown, all features disabled"),
    }
    for (feature, on) in set.iter() {
        println!("{:<32} {}", feature.id(), if on { "on" } else { "off" });
    }
}

fn run_resolve(version: &str, json: bool) {
    print_set(&resolve(version), json);
}

fn run_check(feature: &str, version: &str) {
    let feature: Feature = match feature.parse() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    if resolve(version).is_enabled(feature) {
        println!("{} is available on {}", feature, version);
    } else {
        println!(
            "{} is not available on {} (needs {})",
            feature,
            version,
            feature.min_version()
        );
        process::exit(1);
    }
}

async fn run_probe(
    server_arg: Option<String>,
    api_key_arg: Option<String>,
    json: bool,
    config_path: &str,
) {
    let config = FeaturesConfig::load_with_env(config_path);

    let server = match server_arg.or(config.server_url) {
        Some(url) => url,
        None => {
            eprintln!("No backend specified. Use --server, set FEATURES_SERVER_URL, or configure server_url in features.toml");
            process::exit(1);
        }
    };
    let api_key = api_key_arg.or(config.api_key);

    let client = reqwest::Client::new();
    match remote::fetch_server_version(&client, &server, api_key.as_deref()).await {
        Ok(version) => print_set(&resolve(&version), json),
        Err(e) => {
            eprintln!("Probe failed: {}", e);
            process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    telemetry::init();

    let cli = Args::parse();
    match cli.cmd {
        Command::List => run_list(),
        Command::Resolve { version, json } => run_resolve(&version, json),
        Command::Check { feature, version } => run_check(&feature, &version),
        Command::Probe {
            server,
            api_key,
            json,
            config,
        } => run_probe(server, api_key, json, &config).await,
        Command::Serve {
            port,
            hostname,
            config,
            server_version,
            server,
            watch,
            poll,
        } => {
            server::run_serve(ServeOptions {
                port,
                hostname,
                config_path: config,
                server_version,
                server,
                watch,
                poll,
            })
            .await
        }
    }
}
