use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nav_routing::{
    build_graph, load_graph, save_graph, Coord, Engine, EngineConfig, MapData, Mode, RouteQuery,
};
use nav_serve::ServerConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nav-serve")]
#[command(about = "Road routing over OpenStreetMap extracts", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a graph snapshot from map data JSON
    Build {
        /// Input map data (nodes and tagged ways)
        input: PathBuf,
        /// Output .navg file
        output: PathBuf,
    },
    /// Find a route between two coordinates
    Route {
        /// Graph snapshot
        graph: PathBuf,
        /// Start coordinate (lat,lon)
        #[arg(long)]
        from: String,
        /// End coordinate (lat,lon)
        #[arg(long)]
        to: String,
        /// car, bike or foot
        #[arg(long, default_value = "car")]
        profile: String,
        /// Alternatives besides the primary route
        #[arg(long, default_value_t = 0)]
        alternatives: usize,
    },
    /// Start the HTTP API server
    Serve {
        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Graph snapshot, overrides config and GRAPH_DATA_PATH
        #[arg(long)]
        graph: Option<PathBuf>,
        /// Map data JSON, overrides config and MAP_DATA_PATH
        #[arg(long)]
        map: Option<PathBuf>,
        /// Port to listen on, overrides config and PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn init_tracing(default_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn parse_coord(s: &str) -> Result<Coord> {
    let (lat, lon) = s
        .split_once(',')
        .context("Coordinate must be in format 'lat,lon'")?;
    let lat = lat.trim().parse::<f64>().context("invalid latitude")?;
    let lon = lon.trim().parse::<f64>().context("invalid longitude")?;
    Ok(Coord::new(lat, lon))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output } => {
            init_tracing("info", cli.log_json);
            let start = Instant::now();

            let map = MapData::from_json_file(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let graph = build_graph(&map).context("failed to build graph")?;
            save_graph(&graph, &output)
                .with_context(|| format!("failed to write {}", output.display()))?;

            println!(
                "Built {} nodes, {} edges in {:.2}s -> {}",
                graph.node_count(),
                graph.edge_count(),
                start.elapsed().as_secs_f64(),
                output.display()
            );
        }
        Commands::Route {
            graph,
            from,
            to,
            profile,
            alternatives,
        } => {
            init_tracing("warn", cli.log_json);
            let from = parse_coord(&from)?;
            let to = parse_coord(&to)?;
            let mode: Mode = profile.parse()?;

            let graph = load_graph(&graph)
                .with_context(|| format!("failed to load {}", graph.display()))?;
            let engine = Engine::new(graph, EngineConfig::default());

            let start = Instant::now();
            let query = RouteQuery::new(from, to, mode).with_alternatives(alternatives);
            let routes = engine.route(&query, None)?;

            println!("Found {} route(s) in {:.3}s", routes.len(), start.elapsed().as_secs_f64());
            for (i, route) in routes.iter().enumerate() {
                let label = if i == 0 { "primary".to_string() } else { format!("alt {i}") };
                println!(
                    "  {label}: {:.0}m, {:.1} min, {} points",
                    route.distance_m,
                    route.duration_s / 60.0,
                    route.geometry.len()
                );
            }
        }
        Commands::Serve {
            config,
            graph,
            map,
            port,
        } => {
            let mut server_config = ServerConfig::load(config.as_deref())?;
            if let Some(graph) = graph {
                server_config.graph_data_path = Some(graph);
            }
            if let Some(map) = map {
                server_config.map_data_path = Some(map);
            }
            if let Some(port) = port {
                server_config.port = port;
            }
            server_config.log_json |= cli.log_json;

            init_tracing(&server_config.log_level, server_config.log_json);
            nav_serve::serve(server_config).await?;
        }
    }

    Ok(())
}
