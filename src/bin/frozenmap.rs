use std::fs::File;
use std::io::{BufReader, Error, ErrorKind, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use frozenmap::loader::freeze_json_file;
use frozenmap::{DuplicateKeys, FrozenMap, FrozenMapBuilder, FrozenMapConfig, OwnedValue, Value};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "frozenmap=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Info(args) => run_info(args),
        Command::Get(args) => run_get(args),
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "frozenmap utility for building and querying frozen maps from JSON",
    subcommand_required = true,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a frozen map from a JSON file and print its layout summary
    Info(InfoArgs),
    /// Build a frozen map from a JSON file and look up keys from reader threads
    Get(GetArgs),
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Optional JSON file holding a builder configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override for the number of slots allocated up front
    #[arg(long, value_name = "SLOTS")]
    initial_capacity: Option<usize>,

    /// Fail when the input contains the same key twice
    #[arg(long)]
    reject_duplicates: bool,
}

#[derive(clap::Args)]
struct InfoArgs {
    /// Path to the JSON file containing key-value pairs
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Optional keys to look up after freezing
    #[arg(short, long)]
    key: Vec<String>,

    #[command(flatten)]
    build: BuildArgs,
}

#[derive(clap::Args)]
struct GetArgs {
    /// Path to the JSON file containing key-value pairs
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Keys to look up
    #[arg(value_name = "KEY", required = true)]
    keys: Vec<String>,

    /// Number of reader threads sharing the frozen map
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    #[command(flatten)]
    build: BuildArgs,
}

#[derive(Serialize)]
struct Lookup<'a> {
    key: &'a str,
    #[serde(rename = "type")]
    kind: Option<&'static str>,
    value: Option<Value<'a>>,
}

fn lookup<'a>(map: &'a FrozenMap, key: &'a str) -> Lookup<'a> {
    let value = map.get(key);
    Lookup {
        key,
        kind: value.as_ref().map(Value::type_name),
        value,
    }
}

fn run_info(args: InfoArgs) -> Result<()> {
    let map = build_map(&args.input, &args.build)?;

    print_json(map.info())?;
    if !args.key.is_empty() {
        let lookups: Vec<_> = args.key.iter().map(|key| lookup(&map, key)).collect();
        print_json(&lookups)?;
    }

    Ok(())
}

fn run_get(args: GetArgs) -> Result<()> {
    if args.threads == 0 {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "--threads must be at least 1",
        ));
    }

    let map = Arc::new(build_map(&args.input, &args.build)?);
    let keys = Arc::new(args.keys);

    let mut handles = Vec::with_capacity(args.threads);
    for reader in 0..args.threads {
        let map = Arc::clone(&map);
        let keys = Arc::clone(&keys);
        handles.push(std::thread::spawn(move || {
            let found: Vec<Option<OwnedValue>> = keys
                .iter()
                .map(|key| map.get(key).map(|v| v.to_owned_value()))
                .collect();
            debug!("reader {} resolved {} keys", reader, found.len());
            found
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let found = handle
            .join()
            .map_err(|_| Error::other("reader thread panicked"))?;
        results.push(found);
    }
    if results.windows(2).any(|pair| pair[0] != pair[1]) {
        return Err(Error::other("reader threads disagree on lookup results"));
    }
    info!("{} reader threads returned identical results", results.len());

    let lookups: Vec<_> = keys.iter().map(|key| lookup(&map, key)).collect();
    print_json(&lookups)
}

fn build_map(input: &Path, args: &BuildArgs) -> Result<FrozenMap> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => FrozenMapConfig::default(),
    };
    if let Some(capacity) = args.initial_capacity {
        config.initial_capacity = capacity;
    }
    if args.reject_duplicates {
        config.duplicate_keys = DuplicateKeys::Reject;
    }
    debug!("building {} with {:?}", input.display(), config);

    freeze_json_file(FrozenMapBuilder::with_config(config)?, input)
}

fn load_config(path: &Path) -> Result<FrozenMapConfig> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Failed to parse config {}: {e}", path.display()),
        )
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::other(format!("Failed to format JSON: {e}")))?;
    println!("{}", json);
    Ok(())
}
