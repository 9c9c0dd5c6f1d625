pub mod alarm;
pub mod api;
pub mod config;
pub mod error;
pub mod geo;
pub mod notify;
pub mod poller;
pub mod session;
pub mod sound;
pub mod structs;
#[cfg(test)]
mod tests;

use alarm::ActiveAlarmState;
use api::ApiClient;
use config::Config;
use error::AgentError;
use geo::{Geocoder, LocationIq};
use notify::{NotificationFeed, Notifier};
use poller::{spawn_active_alarm_checker, spawn_notification_poller};
use session::Session;
use sound::{AlarmSound, AudioBackend, CommandAudio};
use structs::*;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

type MainResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(
    name = "menager-agent",
    about = "Terminal companion for the Menager dashboard backend"
)]
struct Cli {
    #[arg(long, env = "MENAGER_API_URL", default_value = "http://localhost:8000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and store the session token
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
    },
    /// Forget the stored session
    Logout,
    /// Run the dashboard loop: notification feed + active-alarm checker
    Watch,
    /// Transit alarms
    Alarm {
        #[command(subcommand)]
        command: AlarmCommand,
    },
    /// Route lookups between stops or map points
    Routes {
        #[command(subcommand)]
        command: RoutesCommand,
    },
    /// Transit stop lookups
    Stops {
        #[command(subcommand)]
        command: StopsCommand,
    },
    /// Market analysis panels
    Market {
        #[command(subcommand)]
        command: MarketCommand,
    },
    /// Wardrobe and outfit panels
    Style {
        #[command(subcommand)]
        command: StyleCommand,
    },
    /// Culture and art events
    Events {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

#[derive(Subcommand)]
enum AlarmCommand {
    /// List alarms with their trigger status
    List,
    /// Create a smart alarm
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,
        /// Target arrival time, HH:MM
        #[arg(long)]
        arrive: String,
        /// Walking minutes to the stop
        #[arg(long, default_value_t = 10)]
        walk: u32,
        /// Line code; repeat for several lines
        #[arg(long = "line")]
        lines: Vec<String>,
        #[arg(long)]
        origin_stop: Option<String>,
        #[arg(long)]
        dest_stop: Option<String>,
    },
    /// Delete an alarm
    Delete {
        id: i64,
    },
    Enable {
        id: i64,
    },
    Disable {
        id: i64,
    },
}

#[derive(Subcommand)]
enum RoutesCommand {
    /// Lines connecting two stop codes
    Search {
        #[arg(long)]
        origin_stop: String,
        #[arg(long)]
        dest_stop: String,
    },
    /// Lines connecting two addresses (geocoded first)
    Locate {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
}

#[derive(Subcommand)]
enum StopsCommand {
    /// Stops near an address or a coordinate pair
    Nearby {
        #[arg(long, conflicts_with_all = ["lat", "lon"])]
        address: Option<String>,
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
    },
    /// Lines serving a stop code
    Lines {
        durak: String,
    },
}

#[derive(Subcommand)]
enum MarketCommand {
    Rates,
    Upcoming,
    Scenarios,
    Summary,
    Pulse,
}

#[derive(Subcommand)]
enum StyleCommand {
    /// Daily outfit recommendation
    Recommend,
    /// List closet items
    Closet,
    /// Add a closet item
    Add {
        #[arg(long)]
        category: String,
        #[arg(long)]
        sub_category: String,
        /// Primary color, e.g. #2f4f4f
        #[arg(long)]
        color: String,
        #[arg(long)]
        material: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Re-sync color palettes on the backend
    SyncPalettes,
}

#[tokio::main]
async fn main() -> MainResult {
    dotenv().ok();
    pretty_env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_env(cli.base_url.clone());

    match cli.command {
        Command::Login { email, password } => login(&config, &email, &password).await,
        Command::Register { email, password, name } => {
            register(&config, &email, &password, &name).await
        }
        Command::Logout => logout(&config),
        Command::Watch => watch(&config).await,
        Command::Alarm { command } => handle_alarm(&config, command).await,
        Command::Routes { command } => handle_routes(&config, command).await,
        Command::Stops { command } => handle_stops(&config, command).await,
        Command::Market { command } => handle_market(&config, command).await,
        Command::Style { command } => handle_style(&config, command).await,
        Command::Events { limit } => handle_events(&config, limit).await,
    }
}

fn client(config: &Config) -> ApiClient {
    let session = Session::load(&config.session_path).ok();
    ApiClient::new(config, session)
}

//////////////////////////////////////////////////////////
// Auth
//////////////////////////////////////////////////////////

async fn login(config: &Config, email: &str, password: &str) -> MainResult {
    let api = ApiClient::new(config, None);
    let token = api.login(email, password).await?;
    Session::new(token.access_token).store(&config.session_path)?;
    println!("✅ Logged in as {}.", email);
    Ok(())
}

async fn register(config: &Config, email: &str, password: &str, name: &str) -> MainResult {
    let api = ApiClient::new(config, None);
    let token = api.register(email, password, name).await?;
    Session::new(token.access_token).store(&config.session_path)?;
    println!("✅ Account created, logged in as {}.", email);
    Ok(())
}

fn logout(config: &Config) -> MainResult {
    Session::clear(&config.session_path)?;
    println!("👋 Session cleared.");
    Ok(())
}

//////////////////////////////////////////////////////////
// Watch loop
//////////////////////////////////////////////////////////

async fn watch(config: &Config) -> MainResult {
    let session = Session::load(&config.session_path).ok();
    if session.is_none() {
        return Err(Box::new(AgentError::MissingSession));
    }
    let api = Arc::new(ApiClient::new(config, session));

    let audio: Arc<dyn AudioBackend> = Arc::new(CommandAudio::new(&config.sound_player)?);
    let feed = Arc::new(Mutex::new(NotificationFeed::new()));
    let mut notifier = Notifier::new(audio.clone());
    match notifier.request_permission() {
        notify::Permission::Granted => log::info!("desktop notifications enabled"),
        other => log::info!("desktop notifications off: {:?}", other),
    }
    let notifier = Arc::new(Mutex::new(notifier));

    let alarm_state = Arc::new(Mutex::new(ActiveAlarmState::new()));
    let alarm_sound = Arc::new(Mutex::new(AlarmSound::new(audio)));

    // Named handles so teardown can abort whatever is still in flight.
    let mut tasks: HashMap<&str, JoinHandle<()>> = HashMap::new();
    tasks.insert(
        "notifications",
        spawn_notification_poller(api.clone(), feed.clone(), notifier.clone()),
    );
    tasks.insert(
        "active-alarms",
        spawn_active_alarm_checker(api.clone(), alarm_state.clone(), alarm_sound.clone()),
    );

    println!("👀 Watching. Commands: d <n> = dismiss notification, x = dismiss alarm, q = quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "q" {
            break;
        } else if line == "x" {
            let dismissed = alarm_state.lock().unwrap().dismiss();
            match dismissed {
                Some(alarm) => {
                    alarm_sound.lock().unwrap().stop();
                    println!("🚫 Alarm '{}' dismissed.", alarm.alarm_name);
                }
                None => println!("No active alarm."),
            }
        } else if let Some(rest) = line.strip_prefix("d ") {
            match rest.trim().parse::<usize>() {
                Ok(index) => match feed.lock().unwrap().dismiss(index) {
                    Some(n) => println!("Dismissed [{}] {}", index, n.title),
                    None => println!("No notification at index {}.", index),
                },
                Err(_) => println!("Usage: d <index>"),
            }
        } else if !line.is_empty() {
            println!("Commands: d <n> | x | q");
        }
    }

    for (name, task) in tasks {
        task.abort();
        log::debug!("stopped {} poller", name);
    }
    alarm_sound.lock().unwrap().stop();
    Ok(())
}

//////////////////////////////////////////////////////////
// Alarms
//////////////////////////////////////////////////////////

async fn handle_alarm(config: &Config, command: AlarmCommand) -> MainResult {
    let api = client(config);
    match command {
        AlarmCommand::List => {
            let alarms = api.alarms().await?;
            if alarms.is_empty() {
                println!("No alarms yet. Create one with `alarm create`.");
                return Ok(());
            }
            for a in &alarms {
                let state = if a.alarm_enabled { "on " } else { "off" };
                let trigger = if a.should_trigger { " 🔔" } else { "" };
                println!(
                    "[{}] ({}) {} — {} → {} at {}, {} line(s){}\n      {}",
                    a.alarm_id,
                    state,
                    a.alarm_name,
                    a.origin,
                    a.destination,
                    a.target_arrival_time,
                    a.routes.len(),
                    trigger,
                    a.message,
                );
            }
        }
        AlarmCommand::Create {
            name,
            origin,
            destination,
            arrive,
            walk,
            lines,
            origin_stop,
            dest_stop,
        } => {
            let alarm = build_alarm_create(
                name,
                origin,
                destination,
                arrive,
                walk,
                lines,
                origin_stop,
                dest_stop,
            )?;
            let created = api.create_alarm(&alarm).await?;
            println!("✅ {}", created.message);
        }
        AlarmCommand::Delete { id } => {
            let reply = api.delete_alarm(id).await?;
            println!("🗑 {}", reply.message);
        }
        AlarmCommand::Enable { id } => {
            let update = SmartAlarmUpdate {
                alarm_enabled: Some(true),
                ..Default::default()
            };
            let reply = api.update_alarm(id, &update).await?;
            println!("✅ {}", reply.message);
        }
        AlarmCommand::Disable { id } => {
            let update = SmartAlarmUpdate {
                alarm_enabled: Some(false),
                ..Default::default()
            };
            let reply = api.update_alarm(id, &update).await?;
            println!("✅ {}", reply.message);
        }
    }
    Ok(())
}

/// Local validation before the create request goes out: nonempty name,
/// HH:MM arrival, at least one line.
fn build_alarm_create(
    name: String,
    origin: String,
    destination: String,
    arrive: String,
    walk: u32,
    lines: Vec<String>,
    origin_stop: Option<String>,
    dest_stop: Option<String>,
) -> Result<SmartAlarmCreate, AgentError> {
    if name.trim().is_empty() {
        return Err(AgentError::Validation("alarm name must not be empty".into()));
    }
    if lines.is_empty() {
        return Err(AgentError::Validation(
            "select at least one line with --line".into(),
        ));
    }
    parse_arrival_time(&arrive)?;

    Ok(SmartAlarmCreate {
        alarm_name: name,
        origin_location: origin,
        destination_location: destination,
        target_arrival_time: arrive,
        travel_time_to_stop: walk,
        selected_hat_kodlari: lines,
        origin_durak_kodu: origin_stop,
        destination_durak_kodu: dest_stop,
    })
}

pub fn parse_arrival_time(s: &str) -> Result<chrono::NaiveTime, AgentError> {
    chrono::NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| {
        AgentError::Validation(format!("invalid arrival time `{}`, expected HH:MM", s))
    })
}

//////////////////////////////////////////////////////////
// Routes and stops
//////////////////////////////////////////////////////////

fn geocoder(config: &Config) -> Result<LocationIq, AgentError> {
    let token = config.locationiq_token.clone().ok_or_else(|| {
        AgentError::Validation("LOCATIONIQ_TOKEN must be set for address lookups".into())
    })?;
    Ok(LocationIq::new(token))
}

/// Best-effort reverse lookup of picked coordinates; a miss only costs the
/// address line, never the stop listing.
async fn resolve_place(geo: &impl Geocoder, coords: Coordinates) -> Option<String> {
    match geo.reverse_locate(coords).await {
        Ok(place) => Some(place),
        Err(e) => {
            log::debug!("reverse geocode failed: {}", e);
            None
        }
    }
}

async fn handle_routes(config: &Config, command: RoutesCommand) -> MainResult {
    let api = client(config);
    match command {
        RoutesCommand::Search { origin_stop, dest_stop } => {
            let reply = api
                .search_routes(&RouteSearchRequest {
                    origin_durak_kodu: origin_stop,
                    destination_durak_kodu: dest_stop,
                })
                .await?;
            println!(
                "🚌 {} line(s) between {} and {}:",
                reply.routes.len(),
                reply.origin_durak,
                reply.destination_durak
            );
            print_routes(&reply.routes);
        }
        RoutesCommand::Locate { from, to } => {
            let geo = geocoder(config)?;
            let origin = geo.locate(&from).await?;
            let dest = geo.locate(&to).await?;

            let reply = api
                .search_routes_by_location(&LocationRouteSearchRequest {
                    origin_lat: origin.lat,
                    origin_lon: origin.lon,
                    dest_lat: dest.lat,
                    dest_lon: dest.lon,
                    radius_meters: config::ROUTE_SEARCH_RADIUS_METERS,
                })
                .await?;

            if reply.available_routes.is_empty() {
                if reply.origin_only_routes.is_empty() {
                    println!("No lines found between these locations. Try different ones.");
                } else {
                    println!("No direct line; lines heading that way (transfer may be needed):");
                    print_routes(&reply.origin_only_routes);
                }
            } else {
                println!("🚌 Direct line(s):");
                print_routes(&reply.available_routes);
            }
        }
    }
    Ok(())
}

fn print_routes(routes: &[RouteMatch]) {
    for r in routes {
        match &r.hat_adi {
            Some(name) => println!("  {} — {}", r.hat_kodu, name),
            None => println!("  {}", r.hat_kodu),
        }
    }
}

async fn handle_stops(config: &Config, command: StopsCommand) -> MainResult {
    let api = client(config);
    match command {
        StopsCommand::Nearby { address, lat, lon } => {
            let coords = match (address, lat, lon) {
                (Some(address), _, _) => geocoder(config)?.locate(&address).await?,
                (None, Some(lat), Some(lon)) => {
                    let coords = Coordinates { lat, lon };
                    // Raw coordinates aren't much to look at; show the
                    // resolved address when a geocoding token is configured.
                    if config.locationiq_token.is_some() {
                        if let Some(place) = resolve_place(&geocoder(config)?, coords).await {
                            println!("📍 {}", place);
                        }
                    }
                    coords
                }
                _ => {
                    return Err(Box::new(AgentError::Validation(
                        "pass --address or both --lat and --lon".into(),
                    )))
                }
            };
            let stops = api.nearby_stops(coords).await?;
            if stops.is_empty() {
                println!("No stops nearby.");
            }
            for s in &stops {
                match s.distance_meters {
                    Some(d) => println!("  {} — {} ({:.0} m)", s.durak_kodu, s.durak_adi, d),
                    None => println!("  {} — {}", s.durak_kodu, s.durak_adi),
                }
            }
        }
        StopsCommand::Lines { durak } => {
            let reply = api.stop_routes(&durak).await?;
            println!("🚏 Lines at stop {}:", reply.durak_kodu);
            print_routes(&reply.hatlar);
        }
    }
    Ok(())
}

//////////////////////////////////////////////////////////
// Market, style, events
//////////////////////////////////////////////////////////

async fn handle_market(config: &Config, command: MarketCommand) -> MainResult {
    let api = client(config);
    match command {
        MarketCommand::Rates => {
            let rates = api.current_rates().await?;
            for rate in &rates {
                let arrow = if rate.daily_change_percent >= 0.0 { "↑" } else { "↓" };
                println!(
                    "{:<24} {:>14.2}  {} {:.2}%",
                    rate.name,
                    rate.price,
                    arrow,
                    rate.daily_change_percent.abs()
                );
            }
        }
        MarketCommand::Upcoming => print_json(&api.upcoming_events().await?)?,
        MarketCommand::Scenarios => print_json(&api.scenarios().await?)?,
        MarketCommand::Summary => print_json(&api.market_summary().await?)?,
        MarketCommand::Pulse => print_json(&api.market_pulse().await?)?,
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) -> MainResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

const CLOTHING_CATEGORIES: [&str; 5] = ["Top", "Bottom", "Outerwear", "Shoes", "Accessory"];

async fn handle_style(config: &Config, command: StyleCommand) -> MainResult {
    let api = client(config);
    match command {
        StyleCommand::Recommend => {
            let rec = api.daily_recommendation().await?;
            if let Some(palette) = &rec.palette_name {
                println!("🎨 Palette: {} [{}]", palette, rec.colors.join(", "));
            }
            println!("🌤 {}", rec.weather_info);
            println!("{}", serde_json::to_string_pretty(&rec.outfit)?);
            println!("💡 {}", rec.advice);
        }
        StyleCommand::Closet => {
            let items = api.closet().await?;
            if items.is_empty() {
                println!("Closet is empty. Add something with `style add`.");
            }
            for item in &items {
                println!(
                    "[{}] {} / {} — {} {}",
                    item.id,
                    item.category,
                    item.sub_category,
                    item.primary_color_hex,
                    item.material.as_deref().unwrap_or("")
                );
            }
        }
        StyleCommand::Add {
            category,
            sub_category,
            color,
            material,
            image_url,
        } => {
            if !CLOTHING_CATEGORIES.contains(&category.as_str()) {
                return Err(Box::new(AgentError::Validation(format!(
                    "category must be one of {}",
                    CLOTHING_CATEGORIES.join(", ")
                ))));
            }
            let item = api
                .add_closet_item(&ClosetItemCreate {
                    category,
                    sub_category,
                    primary_color_hex: color,
                    material,
                    image_url,
                })
                .await?;
            println!("✅ Added closet item [{}].", item.id);
        }
        StyleCommand::SyncPalettes => {
            let reply = api.sync_palettes().await?;
            println!("✅ {} ({} palettes)", reply.message, reply.count);
        }
    }
    Ok(())
}

async fn handle_events(config: &Config, limit: u32) -> MainResult {
    let api = client(config);
    let events = api.events(limit).await?;
    for event in &events {
        let date = event
            .start
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .or_else(|| event.start.clone())
            .unwrap_or_default();
        let venue = event
            .venue
            .as_ref()
            .map(|v| v.name.as_str())
            .unwrap_or("");
        println!("🎭 {} — {} {}", event.name, venue, date);
        if let Some(url) = &event.url {
            println!("    {}", url);
        }
    }
    Ok(())
}
