// ctech-client/src/main.rs
use clap::{Parser, Subcommand};
use ctech_common::{StatsResponse, UnitsResponse};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod reference;

use api::{ApiClient, Auth, BoxedError};

#[derive(Parser)]
#[command(author, version, about = "Command-line client for the CommunityTech REST bridge", long_about = None)]
struct Cli {
    #[arg(short = 'u', long, env = "CTECH_URL", default_value = "http://localhost:3001")]
    base_url: String,
    /// User name; switches authentication to Basic
    #[arg(long, env = "CTECH_USER")]
    user: Option<String>,
    #[arg(long, env = "CTECH_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List active units, skipped directories and routes
    Units,
    /// Show server statistics
    Stats,
    /// Re-run unit discovery on the server
    Reload,
    /// GET a route, e.g. `elementor/kit/colors`
    Get { route: String },
    /// POST a JSON body to a route
    Post {
        route: String,
        #[arg(short, long)]
        data: String,
    },
    /// Audit SEO fields of published documents
    SeoAudit {
        #[arg(long)]
        post_type: Option<String>,
    },
    /// Generate a Markdown reference of the registered widgets
    WidgetReference {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), BoxedError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = ApiClient::new(&cli.base_url, Auth::from_parts(cli.user, cli.token))?;

    match cli.command {
        Commands::Units => {
            let units: UnitsResponse = serde_json::from_value(client.get(client.admin_url("units")?).await?)?;
            print_units(&units);
        }
        Commands::Stats => {
            let stats: StatsResponse = serde_json::from_value(client.get(client.admin_url("stats")?).await?)?;
            println!("Version:  {}", stats.version);
            println!("Uptime:   {}", stats.uptime_formatted);
            println!("Requests: {}", stats.request_count);
            println!("Units:    {}", stats.unit_count);
            println!("Routes:   {}", stats.route_count);
        }
        Commands::Reload => {
            let summary = client.post(client.admin_url("reload")?, None).await?;
            print_json(&summary)?;
        }
        Commands::Get { route } => {
            let value = client.get(client.route_url(&route)?).await?;
            print_json(&value)?;
        }
        Commands::Post { route, data } => {
            let body: Value = serde_json::from_str(&data).map_err(|e| format!("--data is not valid JSON: {}", e))?;
            let value = client.post(client.route_url(&route)?, Some(&body)).await?;
            print_json(&value)?;
        }
        Commands::SeoAudit { post_type } => {
            let mut url = client.route_url("seo/audit")?;
            if let Some(post_type) = post_type {
                url.query_pairs_mut().append_pair("post_type", &post_type);
            }
            let report = client.get(url).await?;
            print_audit(&report);
        }
        Commands::WidgetReference { output } => {
            let markdown = widget_reference(&client).await?;
            match output {
                Some(path) => {
                    fs::write(&path, markdown)?;
                    info!("Wrote widget reference to {}", path.display());
                    eprintln!("Wrote {}", path.display());
                }
                None => println!("{}", markdown),
            }
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<(), BoxedError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_units(units: &UnitsResponse) {
    println!("Active units ({}):", units.units.len());
    for unit in &units.units {
        let state = if unit.available { "" } else { " [unavailable]" };
        println!("  {:<20} {}{}", unit.slug, unit.name, state);
    }
    if !units.skipped.is_empty() {
        println!("Skipped directories ({}):", units.skipped.len());
        for skipped in &units.skipped {
            let directory = skipped["directory"].as_str().unwrap_or("?");
            let reason = skipped["reason"].as_str().unwrap_or("?");
            match skipped.get("detail").and_then(Value::as_str) {
                Some(detail) => println!("  {:<20} {} ({})", directory, reason, detail),
                None => println!("  {:<20} {}", directory, reason),
            }
        }
    }
    println!("Routes ({}):", units.routes.len());
    for route in &units.routes {
        println!(
            "  {:<6} {:<36} {:<15} {}",
            route["method"].as_str().unwrap_or("?"),
            route["path"].as_str().unwrap_or("?"),
            route["capability"].as_str().unwrap_or("?"),
            route["owner"].as_str().unwrap_or("?"),
        );
    }
}

fn print_audit(report: &Value) {
    println!(
        "Checked {} document(s) at {}; {} with issues",
        report["checked"],
        report["checked_at"].as_str().unwrap_or("?"),
        report["with_issues"]
    );
    for doc in report["documents"].as_array().into_iter().flatten() {
        let issues: Vec<&str> = doc["issues"]
            .as_array()
            .map(|i| i.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        println!(
            "  #{:<6} {:<10} {:<40} {}",
            doc["id"],
            doc["post_type"].as_str().unwrap_or("?"),
            doc["title"].as_str().unwrap_or(""),
            issues.join(", ")
        );
    }
}

/// Fetch every practical widget and render the Markdown reference. Widgets
/// that fail to load are reported and left out.
async fn widget_reference(client: &ApiClient) -> Result<String, BoxedError> {
    let list = client.get(client.route_url("elementor/widgets")?).await?;
    let mut names: Vec<String> = list["widgets"]
        .as_array()
        .map(|w| w.iter().filter_map(|w| w["name"].as_str()).map(str::to_string).collect())
        .unwrap_or_default();
    names.retain(|name| reference::is_practical(name));
    names.sort();

    eprintln!("Fetching {} widgets...", names.len());
    let mut details = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        match client.get(client.route_url(&format!("elementor/widgets/{}", name))?).await {
            Ok(mut detail) => {
                let widget = detail.get_mut("widget").map(Value::take).unwrap_or(Value::Null);
                details.push((name.clone(), widget));
            }
            Err(e) => eprintln!("  SKIP {}: {}", name, e),
        }
        if (i + 1) % 20 == 0 {
            eprintln!("  {}/{}...", i + 1, names.len());
        }
    }

    let source = client.base().host_str().unwrap_or("localhost").to_string();
    Ok(reference::render_reference(&details, &source))
}
