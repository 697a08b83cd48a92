use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use movaa_booking::booking::{ForWho, PICKUP_TIMES};
use movaa_booking::config::Settings;
use movaa_booking::distance::rank_by_distance;
use movaa_booking::location::{
    destination_cities, FixedLocator, GeoPoint, Geocoder, Geolocator, IpApiLocator,
    LocationSearch, UreqFetch,
};
use movaa_booking::parks::{builtin_parks, search_parks};
use movaa_booking::session::{issue_ticket, BookingSession};
use movaa_booking::store::{FileStore, Storage};
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Movaa: bus tickets from the park nearest to you.
///
/// Examples:
///   movaa search "Herbert Macaulay"
///   movaa parks --lat 6.5244 --lon 3.3792
///   movaa book --to Aba --from Ikeja --date 2026-12-20 --time 9:00am --tickets 2
///   movaa ticket
///   movaa serve --port 3000
#[derive(Parser)]
#[command(name = "movaa", version, about, long_about = None)]
struct Cli {
    /// Settings file (default: ~/.movaa/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Offline mode: only the built-in city list is consulted.
    #[arg(long, global = true)]
    offline: bool,

    /// Store file (default: ~/.movaa/store.json).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Location suggestions from the geocoding pipeline.
    Search { query: String },

    /// Destination cities (blank lists the first ten).
    Cities { query: Option<String> },

    /// Nearest parks to a point, or a fuzzy park search.
    Parks {
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,
        #[arg(long, short = 'q')]
        query: Option<String>,
    },

    /// Fill in the booking form and save the draft.
    Book {
        /// Destination city.
        #[arg(long)]
        to: String,
        /// Departure text; auto-detected when omitted.
        #[arg(long)]
        from: Option<String>,
        /// Use this position instead of IP geolocation.
        #[arg(long, allow_hyphen_values = true, requires = "lon", conflicts_with = "from")]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "lat", conflicts_with = "from")]
        lon: Option<f64>,
        /// Travel date (YYYY-MM-DD).
        #[arg(long, short = 'd')]
        date: String,
        /// Pick-up time: 6:00am, 9:00am, 12:00pm, 3:00pm or 6:00pm.
        #[arg(long, short = 't')]
        time: String,
        #[arg(long, default_value_t = 1)]
        tickets: u32,
        #[arg(long, default_value_t = 0)]
        children: u32,
        #[arg(long, default_value = "me")]
        for_who: ForWho,
        /// Take-off park, overriding the nearest one.
        #[arg(long)]
        park: Option<String>,
        /// Pick the Nth suggestion (1-based) instead of keeping the typed text.
        #[arg(long)]
        pick: Option<usize>,
    },

    /// Issue the ticket for the saved booking (payment is simulated).
    Ticket,

    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).unwrap_or_else(|e| fail(e));
    if cli.offline {
        settings.offline = true;
    }
    if let Some(path) = cli.store.clone() {
        settings.store_path = Some(path);
    }

    init_tracing(&settings.log_level);

    match cli.command {
        Command::Search { query } => search(&settings, &query),
        Command::Cities { query } => {
            let found = destination_cities(query.as_deref().unwrap_or(""));
            for city in &found {
                eprintln!("  {:<16} {}", city.name, city.state);
            }
            print_json(&found);
        }
        Command::Parks { lat, lon, query } => parks(lat.zip(lon), query.as_deref()),
        Command::Book {
            to,
            from,
            lat,
            lon,
            date,
            time,
            tickets,
            children,
            for_who,
            park,
            pick,
        } => {
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .unwrap_or_else(|e| fail(format!("Invalid date '{}': {}", date, e)));
            let trip = Trip {
                to,
                from,
                position: lat.zip(lon).map(|(lat, lon)| GeoPoint::new(lat, lon)),
                date,
                time,
                tickets,
                children,
                for_who,
                park,
                pick,
            };
            book(&settings, trip);
        }
        Command::Ticket => ticket(&settings),
        Command::Serve { host, port } => serve(&settings, &host, port),
    }
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("movaa_booking={},movaa={}", level, level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn fail(e: impl Display) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(e),
    }
}

fn open_store(settings: &Settings) -> Storage {
    let path = settings.store_path.clone().unwrap_or_else(FileStore::default_path);
    let store = FileStore::load_from(path);
    eprintln!("  Store: {}", store.path().display());
    Storage::new(store)
}

// ─── search / parks ─────────────────────────────────────────────

fn search(settings: &Settings, query: &str) {
    let geocoder = LocationSearch::from_settings(settings);
    let found = geocoder.search(query);
    if found.is_empty() {
        eprintln!("  No suggestions for '{}'.", query);
    }
    for (i, candidate) in found.iter().enumerate() {
        eprintln!("  {}. {}", i + 1, candidate.display_line());
    }
    print_json(&found);
}

fn parks(origin: Option<(f64, f64)>, query: Option<&str>) {
    let parks = builtin_parks();
    match origin {
        Some((lat, lon)) => {
            let ranked = rank_by_distance(GeoPoint::new(lat, lon), &parks).unwrap_or_else(|e| fail(e));
            for r in &ranked {
                eprintln!("  {:>8.2} km  {} ({})", r.distance_km, r.park.name, r.park.address);
            }
            print_json(&ranked);
        }
        None => {
            let found = search_parks(query.unwrap_or(""), &parks);
            for p in &found {
                eprintln!("  {}: {}, {}", p.name, p.address, p.city);
            }
            print_json(&found);
        }
    }
}

// ─── book ───────────────────────────────────────────────────────

struct Trip {
    to: String,
    from: Option<String>,
    position: Option<GeoPoint>,
    date: NaiveDate,
    time: String,
    tickets: u32,
    children: u32,
    for_who: ForWho,
    park: Option<String>,
    pick: Option<usize>,
}

fn book(settings: &Settings, trip: Trip) {
    let geocoder: Arc<dyn Geocoder> = Arc::new(LocationSearch::from_settings(settings));
    let geolocator: Option<Box<dyn Geolocator>> = match (trip.position, &trip.from) {
        (Some(point), _) => Some(Box::new(FixedLocator(point))),
        (None, None) if !settings.offline => {
            let fetch = UreqFetch::new(&settings.user_agent, settings.geolocation_timeout());
            Some(Box::new(IpApiLocator::new(fetch, &settings.ipapi_url)))
        }
        _ => None,
    };

    let mut session = BookingSession::new(geocoder, geolocator, open_store(settings), settings.debounce());
    session.mount(Instant::now());
    session.run_auto_detect(Instant::now());
    if let Some(hint) = session.hint() {
        eprintln!("  \u{26A0}\u{FE0F}  {}. Pass --from to enter it manually.", hint);
    }

    session.type_destination(&trip.to, Instant::now());
    if let Some(from) = trip.from.as_deref() {
        session.type_from(from, Instant::now());
    }
    drain(&mut session);

    if trip.from.is_some() {
        let suggestions = session.selection().suggestions();
        for (i, candidate) in suggestions.iter().enumerate() {
            eprintln!("  {}. {}", i + 1, candidate.display_line());
        }
        let available = suggestions.len();
        match trip.pick {
            Some(n) if n >= 1 => {
                if !session.pick_suggestion(n - 1, Instant::now()) {
                    fail(format!("No suggestion #{} ({} available)", n, available));
                }
            }
            Some(_) => fail("--pick counts from 1"),
            None => session.leave_from_field(Instant::now()),
        }
    }

    if let Some(name) = trip.park.as_deref() {
        session.open_park_search();
        if !session.choose_park(name, Instant::now()) {
            let known: Vec<String> = session.park_search("").iter().map(|p| p.name.clone()).collect();
            fail(format!("Unknown park '{}'. Parks: {}", name, known.join(", ")));
        }
    }

    let form = session.form_mut();
    form.set_date(Some(trip.date));
    form.set_time(Some(&trip.time));
    form.set_for_who(trip.for_who);
    form.set_ticket_count(trip.tickets).unwrap_or_else(|e| fail(e));
    form.set_children_count(trip.children).unwrap_or_else(|e| fail(e));

    let selection = session.selection();
    if let Some(location) = selection.resolved() {
        eprintln!("  \u{1F4CD} {}", location.display_line());
    }
    if let Some(park) = selection.selected_park() {
        eprintln!("  \u{1F68C} {} ({})", park.name, park.address);
    }

    let result = session.submit(Utc::now().date_naive());
    session.teardown();
    match result {
        Ok(draft) => {
            eprintln!(
                "  {} -> {} on {} at {}: {} x NGN {} = NGN {}",
                draft.from, draft.destination, draft.date, draft.time,
                draft.tickets, draft.price_per_ticket, draft.total_price
            );
            print_json(&draft);
        }
        Err(e) => {
            if e.field == movaa_booking::booking::FormField::Time {
                eprintln!("  Pick-up times: {}", PICKUP_TIMES.join(", "));
            }
            fail(e);
        }
    }
}

/// Run the session's debounced searches until none are pending.
fn drain(session: &mut BookingSession) {
    while let Some(deadline) = session.next_deadline() {
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        session.tick(Instant::now());
    }
}

// ─── ticket / serve ─────────────────────────────────────────────

fn ticket(settings: &Settings) {
    let mut storage = open_store(settings);
    let Some(draft) = issue_ticket(&mut storage, &mut rand::thread_rng()) else {
        fail("No saved booking. Run `movaa book` first.");
    };
    eprintln!("  Ticket {}", draft.ticket_code.as_deref().unwrap_or("-"));
    eprintln!("  {} -> {}, {} {}", draft.from, draft.destination, draft.date, draft.time);
    if let Some(park) = &draft.selected_park {
        eprintln!("  Board at {} ({})", park.name, park.address);
    }
    eprintln!("  Adults: {}  Children: {}  Paid: NGN {}", draft.tickets, draft.children, draft.total_price);
    print_json(&draft);
}

fn serve(settings: &Settings, host: &str, port: u16) {
    let geocoder: Arc<dyn Geocoder> = Arc::new(LocationSearch::from_settings(settings));
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| fail(e));
    if let Err(e) = runtime.block_on(movaa_booking::server::start(host, port, geocoder)) {
        fail(format!("Cannot serve on {}:{}: {}", host, port, e));
    }
}
