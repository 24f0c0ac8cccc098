use clap::{Parser, Subcommand};
use matchmap::cluster::{self, LocationGroup};
use matchmap::config::{Config, PresenterConfig};
use matchmap::location::{self, GeoPoint, LocatableEntity};
use matchmap::source::{self, ProfileClient, ProfileSource};
use matchmap::viewport::{self, FitRequest, MapViewport, RenderFrame, ViewState};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

/// matchmap: member map placement engine
///
/// Resolves free-text member locations, clusters co-located members and
/// decides what the map draws at a given zoom.
///
/// Examples:
///   matchmap resolve Dhaka
///   matchmap resolve Nowhereville --country BD
///   matchmap map --input members.json --zoom 6
///   matchmap map --api http://localhost:8000/api --zoom 2
///   matchmap serve --port 3030
#[derive(Parser)]
#[command(name = "matchmap", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a city/country pair to a map point.
    Resolve {
        /// City name. Example: matchmap resolve "New York"
        city: Option<String>,

        /// Country name or code (e.g. BD, GB, Bangladesh).
        #[arg(long)]
        country: Option<String>,
    },

    /// List the built-in city (or country) table.
    Cities {
        #[arg(long)]
        countries: bool,
    },

    /// Place members and print the render frame for a zoom level.
    Map {
        /// Read members from a JSON file instead of the profile API.
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,

        /// Profile API base URL (overrides MATCHMAP_API_URL).
        #[arg(long)]
        api: Option<String>,

        /// Map zoom level. Defaults to the initial map zoom.
        #[arg(long, short = 'z')]
        zoom: Option<f64>,

        /// Offline mode: only use the local map cache.
        #[arg(long)]
        offline: bool,

        /// JSON file overriding map tuning values.
        #[arg(long)]
        presenter_config: Option<PathBuf>,

        /// Map pixel size used to compute the fitted view.
        #[arg(long, default_value_t = 800)]
        width: u32,

        #[arg(long, default_value_t = 500)]
        height: u32,
    },

    /// Run the HTTP API.
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long, short = 'p')]
        port: Option<u16>,

        /// Profile API base URL (overrides MATCHMAP_API_URL).
        #[arg(long)]
        api: Option<String>,

        #[arg(long)]
        offline: bool,

        #[arg(long)]
        presenter_config: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct GroupLine {
    key: String,
    position: GeoPoint,
    count: usize,
    members: Vec<String>,
}

#[derive(Serialize)]
struct MapOutput {
    groups: Vec<GroupLine>,
    frame: RenderFrame,
    fit: Option<FitRequest>,
    fitted_view: Option<ViewState>,
}

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load().unwrap_or_else(|e| fail(e));

    match cli.command {
        Command::Resolve { city, country } => {
            let r = location::resolve_with_source(city.as_deref(), country.as_deref());
            eprintln!("  \u{1F4CD} {} ({})", r.point, r.source);
            print_json(&r);
        }

        Command::Cities { countries } => {
            if countries {
                print_json(&location::builtin_country_list());
            } else {
                print_json(&location::builtin_city_list());
            }
        }

        Command::Map { input, api, zoom, offline, presenter_config, width, height } => {
            if let Some(path) = presenter_config {
                config.presenter = PresenterConfig::load_file(&path).unwrap_or_else(|e| fail(e));
            }
            let entities = load_entities(&config, input, api, offline);
            let zoom = zoom.unwrap_or(config.presenter.initial_zoom);
            let output = place(&entities, zoom, &config.presenter, width, height);

            eprintln!(
                "  {} members in {} locations, {} at zoom {}",
                entities.len(),
                output.groups.len(),
                output.frame.mode,
                zoom,
            );
            print_json(&output);
        }

        Command::Serve { host, port, api, offline, presenter_config } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if api.is_some() {
                config.api_url = api;
            }
            if let Some(path) = presenter_config {
                config.presenter = PresenterConfig::load_file(&path).unwrap_or_else(|e| fail(e));
            }
            if let Err(e) = matchmap::server::start(config, offline).await {
                fail(e);
            }
        }
    }
}

fn load_entities(
    config: &Config,
    input: Option<PathBuf>,
    api: Option<String>,
    offline: bool,
) -> Vec<LocatableEntity> {
    // Priority: --input > --api > MATCHMAP_API_URL > cache
    if let Some(path) = input {
        let entities = source::load_file(&path).unwrap_or_else(|e| fail(e));
        return source::with_location(entities);
    }

    let client = api
        .or_else(|| config.api_url.clone())
        .map(|url| ProfileClient::new(url, config.api_token.clone()));
    let mut src = ProfileSource::new(client);
    src.set_offline(offline);
    src.load().unwrap_or_else(|e| fail(e))
}

fn place(
    entities: &[LocatableEntity],
    zoom: f64,
    config: &PresenterConfig,
    width: u32,
    height: u32,
) -> MapOutput {
    let placed = cluster::build_with_radius(entities, config.spread_radius);
    let groups = cluster::group_by_location(&placed);
    let frame = viewport::render(&placed, zoom, config);
    let fit = viewport::fit_request(&placed, config);

    let mut view = MapViewport::new(config.initial_center, config.initial_zoom);
    view.resize(width, height);
    let fitted_view = fit.as_ref().and_then(|req| match view.fit(req) {
        Ok(_) => Some(view.state()),
        Err(e) => {
            tracing::warn!("Map fitBounds error: {}", e);
            None
        }
    });

    MapOutput {
        groups: groups.iter().map(group_line).collect(),
        frame,
        fit,
        fitted_view,
    }
}

fn group_line(group: &LocationGroup) -> GroupLine {
    GroupLine {
        key: group.key.clone(),
        position: group.position,
        count: group.len(),
        members: group.entities.iter().map(|p| p.entity.id.clone()).collect(),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(e),
    }
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}
