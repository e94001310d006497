//! settingskv CLI
//!
//! Command-line interface for inspecting and editing a store file.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use settingskv::{Config, DeleteRange, SetMode, SettingsError, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// settingskv CLI
#[derive(Parser, Debug)]
#[command(name = "settingskv-cli")]
#[command(about = "CLI for the settingskv record store")]
#[command(version)]
struct Args {
    /// Store file
    #[arg(short, long)]
    store: PathBuf,

    /// Make `set` and `add` discard every other key (legacy behavior)
    #[arg(long)]
    replace_on_set: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get one value
    Get {
        /// Key, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_key)]
        key: u16,

        /// Occurrence index
        #[arg(short, long, default_value = "0")]
        index: usize,

        /// Print the value as hex
        #[arg(long)]
        hex: bool,
    },

    /// Append a value, keeping existing ones
    Add {
        #[arg(value_parser = parse_key)]
        key: u16,

        value: String,

        /// Value is hex encoded
        #[arg(long)]
        hex: bool,
    },

    /// Replace all values of a key
    Set {
        #[arg(value_parser = parse_key)]
        key: u16,

        value: String,

        /// Value is hex encoded
        #[arg(long)]
        hex: bool,
    },

    /// Delete values of a key (all of them unless --index is given)
    Del {
        #[arg(value_parser = parse_key)]
        key: u16,

        /// Delete this occurrence and every later one
        #[arg(short, long)]
        index: Option<usize>,
    },

    /// List all records
    List,

    /// Check that the file is well-formed
    Verify,

    /// Remove the store file
    Wipe,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,settingskv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        if e.is_fatal() {
            tracing::error!("Fatal: {}", e);
        } else {
            eprintln!("error: {}", e);
        }
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), SettingsError> {
    let set_mode = if args.replace_on_set {
        SetMode::ReplaceStore
    } else {
        SetMode::Merge
    };
    let config = Config::builder()
        .store_path(&args.store)
        .set_mode(set_mode)
        .build();

    let store = Store::open(config)?;

    match args.command {
        Commands::Get { key, index, hex } => {
            let value = store.get(key, index)?;
            if hex {
                println!("{}", hex::encode(&value));
            } else {
                println!("{}", String::from_utf8_lossy(&value));
            }
        }
        Commands::Add { key, value, hex } => {
            store.add(key, &parse_value(&value, hex)?)?;
        }
        Commands::Set { key, value, hex } => {
            store.set(key, &parse_value(&value, hex)?)?;
        }
        Commands::Del { key, index } => {
            let range = index.map(DeleteRange::From).unwrap_or(DeleteRange::All);
            store.delete(key, range)?;
        }
        Commands::List => {
            for (key, value) in store.entries()? {
                println!("0x{:04x}  len={:<5}  {}", key, value.len(), hex::encode(&value));
            }
        }
        Commands::Verify => {
            let report = store.verify()?;
            println!(
                "records={} valid_bytes={} file_bytes={}",
                report.records, report.valid_len, report.file_len
            );
            if !report.is_well_formed() {
                println!(
                    "malformed tail: {:?}, {} bytes ignored",
                    report.defect,
                    report.ignored_bytes()
                );
                store.close();
                process::exit(2);
            }
        }
        Commands::Wipe => {
            store.wipe()?;
        }
    }

    store.close();
    Ok(())
}

fn parse_key(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(digits) => u16::from_str_radix(digits, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid key '{}': {}", s, e))
}

fn parse_value(s: &str, is_hex: bool) -> Result<Vec<u8>, SettingsError> {
    if is_hex {
        hex::decode(s).map_err(|e| {
            SettingsError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid hex value: {}", e),
            ))
        })
    } else {
        Ok(s.as_bytes().to_vec())
    }
}
