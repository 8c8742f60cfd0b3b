use std::env;

use tracing_subscriber::EnvFilter;

use kolektrash::api::HttpApi;
use kolektrash::assignments::{AssignmentBoard, Outcome, ResponseStatus};
use kolektrash::collector;
use kolektrash::config::Config;
use kolektrash::directory::{load_barangays, DirectorySelection};
use kolektrash::display::{format_assignment, print_assignments, print_directory, print_profile};
use kolektrash::session::Session;
use kolektrash::{web, Error, Id};

const USAGE: &str = "\
Usage:
  kolektrash web [port]
  kolektrash directory [--cluster ID] [--search TEXT]
  kolektrash assignments
  kolektrash respond <assignment_id> <confirmed|declined>
  kolektrash collector <id>";

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();
}

/// Value following `flag`, e.g. `--cluster 2B`.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut config = Config::load()?;

    match args.get(1).map(String::as_str) {
        Some("web") => {
            if let Some(port) = args.get(2).and_then(|p| p.parse::<u16>().ok()) {
                config.port = port;
            }
            println!("Starting web server on port {}...", config.port);
            println!("Access the API at http://localhost:{}/api", config.port);
            web::start_server(config).await?;
        }
        Some("directory") => {
            let path = config
                .barangays_path
                .clone()
                .ok_or_else(|| Error::Config("KOLEKTRASH_BARANGAYS is not set".to_string()))?;

            let (records, error) = match load_barangays(&path) {
                Ok(records) => (records, None),
                Err(e) => (Vec::new(), Some(format!("Failed to load barangays: {e}"))),
            };
            let mut selection = DirectorySelection::new(records);
            selection.set_cluster_filter(flag_value(&args, "--cluster").map(Id::from));
            selection.set_text_filter(flag_value(&args, "--search").unwrap_or_default());
            print_directory(&selection, error.as_deref());
        }
        Some("assignments") => {
            let session = Session::load(&config.session_file)?;
            let api = HttpApi::new(&config.api_url, config.timeout)?;

            let mut board = AssignmentBoard::new(config.removal_policy);
            board.load(&api, &session).await;
            print_assignments(board.pending());
        }
        Some("respond") => {
            let (Some(assignment_id), Some(status)) = (args.get(2), args.get(3)) else {
                println!("{USAGE}");
                return Ok(());
            };
            let status: ResponseStatus = status.parse()?;
            let assignment_id = Id::from(assignment_id.as_str());

            let session = Session::load(&config.session_file)?;
            let api = HttpApi::new(&config.api_url, config.timeout)?;

            let mut board = AssignmentBoard::new(config.removal_policy);
            board.load(&api, &session).await;
            let record = board
                .pending()
                .iter()
                .find(|a| a.assignment_id == assignment_id)
                .map(format_assignment);

            match board.respond(&api, &session, &assignment_id, status).await? {
                Outcome::Acknowledged => {
                    println!("Marked {} as {}", record.unwrap_or_default(), status);
                }
                Outcome::Unconfirmed(e) => {
                    println!("⚠️  Sent {} for #{} but the server did not confirm: {}", status, assignment_id, e);
                }
                Outcome::NotPending => {
                    println!("Assignment #{} is not pending for you", assignment_id);
                }
            }
            print_assignments(board.pending());
        }
        Some("collector") => {
            let Some(id) = args.get(2) else {
                println!("{USAGE}");
                return Ok(());
            };
            let api = HttpApi::new(&config.api_url, config.timeout)?;
            let profile = collector::fetch_profile(&api, &Id::from(id.as_str())).await?;
            print_profile(&profile);
        }
        _ => {
            println!("{USAGE}");
        }
    }

    Ok(())
}
