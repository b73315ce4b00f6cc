use anyhow::Error;
use serde::Serialize;
use serde_json::Value;
use std::{path::PathBuf, time::Duration};
use structopt::StructOpt;
use taskboard::{
    Config, FileStorage, Gateway, ListParams, Registration, SessionContext,
    SessionStore, TaskFields, TaskId, TaskRepository,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Args::from_args();

    log::debug!("Starting application with {:#?}", args);

    // a missing or malformed backend URL is fatal
    let mut config = Config::new(&args.backend_url)?;
    if let Some(seconds) = args.timeout {
        config = config.with_timeout(Duration::from_secs(seconds));
    }

    let gateway = Gateway::new(&config)?;
    let session = SessionContext::new(FileStorage::new(&args.session_file))?;
    let auth = SessionStore::new(gateway.clone(), session.clone());
    let tasks = TaskRepository::new(gateway, session);

    match args.cmd {
        Command::Login { email, password } => {
            let logged_in = auth.login(&email, &password).await?;
            print_json(&logged_in.payload)?;
        },
        Command::Logout => auth.logout().await?,
        Command::Register {
            email,
            password,
            confirm_password,
        } => {
            let registration = Registration {
                email: &email,
                password: &password,
                confirm_password: &confirm_password,
            };
            print_json(&auth.register(&registration).await?)?;
        },
        Command::Whoami => match auth.session().current() {
            Some(session) => {
                println!("{} ({})", session.email, session.user_id)
            },
            None => println!("Not logged in"),
        },
        Command::List {
            page,
            limit,
            filters,
        } => {
            let mut params = ListParams::new();
            if let Some(page) = page {
                params = params.page(page);
            }
            if let Some(limit) = limit {
                params = params.limit(limit);
            }
            for (key, value) in filters {
                params.insert(key, value);
            }

            print_json(&tasks.list(&params).await?)?;
        },
        Command::Create { fields } => {
            print_json(&tasks.create(to_fields(fields)).await?)?;
        },
        Command::Update { id, fields } => {
            print_json(&tasks.update(&id, to_fields(fields)).await?)?;
        },
        Command::Delete { id } => {
            tasks.delete(&id).await?;
            log::info!("Deleted task {}", id);
        },
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn to_fields(pairs: Vec<(String, Value)>) -> TaskFields {
    pairs.into_iter().collect()
}

/// Parse a `key=value` filter.
fn parse_filter(src: &str) -> Result<(String, String), String> {
    match src.split_once('=') {
        Some((key, value)) if !key.is_empty() => {
            Ok((key.to_string(), value.to_string()))
        },
        _ => Err(format!("expected \"key=value\", found \"{}\"", src)),
    }
}

/// Parse a `key=value` task field, where the value is JSON if it can be
/// parsed as JSON and a plain string otherwise.
fn parse_field(src: &str) -> Result<(String, Value), String> {
    let (key, value) = parse_filter(src)?;
    let value = serde_json::from_str(&value).unwrap_or(Value::String(value));

    Ok((key, value))
}

#[derive(Debug, StructOpt)]
#[structopt(about = "Manage your tasks from the command line")]
struct Args {
    #[structopt(
        long = "backend-url",
        env = "TASKBOARD_BACKEND_URL",
        help = "The Taskboard backend's base URL"
    )]
    backend_url: String,
    #[structopt(
        long = "session-file",
        env = "TASKBOARD_SESSION_FILE",
        default_value = ".taskboard-session.json",
        parse(from_os_str),
        help = "Where to remember who is logged in"
    )]
    session_file: PathBuf,
    #[structopt(long = "timeout", help = "Request timeout in seconds")]
    timeout: Option<u64>,
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    #[structopt(about = "Log in and remember the session")]
    Login {
        #[structopt(short = "e", long = "email")]
        email: String,
        #[structopt(short = "p", long = "password")]
        password: String,
    },
    #[structopt(about = "End the current session")]
    Logout,
    #[structopt(about = "Create a new account")]
    Register {
        #[structopt(short = "e", long = "email")]
        email: String,
        #[structopt(short = "p", long = "password")]
        password: String,
        #[structopt(long = "confirm-password")]
        confirm_password: String,
    },
    #[structopt(about = "Show who is logged in")]
    Whoami,
    #[structopt(about = "List your tasks")]
    List {
        #[structopt(long = "page")]
        page: Option<u32>,
        #[structopt(long = "limit")]
        limit: Option<u32>,
        #[structopt(
            short = "f",
            long = "filter",
            parse(try_from_str = parse_filter),
            help = "Extra filters as key=value"
        )]
        filters: Vec<(String, String)>,
    },
    #[structopt(about = "Create a task")]
    Create {
        #[structopt(
            parse(try_from_str = parse_field),
            help = "Task fields as key=value"
        )]
        fields: Vec<(String, Value)>,
    },
    #[structopt(about = "Update some of a task's fields")]
    Update {
        id: TaskId,
        #[structopt(
            parse(try_from_str = parse_field),
            help = "Task fields as key=value"
        )]
        fields: Vec<(String, Value)>,
    },
    #[structopt(about = "Delete a task")]
    Delete { id: TaskId },
}
