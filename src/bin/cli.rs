//! CinderKV CLI Client
//!
//! Command-line interface for interacting with CinderKV.

use clap::{Parser, Subcommand};
use cinderkv::{Client, Value};

/// CinderKV CLI
#[derive(Parser, Debug)]
#[command(name = "cinderkv-cli")]
#[command(about = "CLI for the CinderKV store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server, optionally echoing a message
    Ping {
        message: Option<String>,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Set a field of a hash
    Hset {
        hash: String,
        field: String,
        value: String,
    },

    /// Get a field of a hash
    Hget {
        hash: String,
        field: String,
    },

    /// Get every field and value of a hash
    Hgetall {
        hash: String,
    },
}

impl Commands {
    fn into_parts(self) -> Vec<String> {
        match self {
            Commands::Ping { message } => std::iter::once("PING".to_string()).chain(message).collect(),
            Commands::Get { key } => vec!["GET".to_string(), key],
            Commands::Set { key, value } => vec!["SET".to_string(), key, value],
            Commands::Hset { hash, field, value } => vec!["HSET".to_string(), hash, field, value],
            Commands::Hget { hash, field } => vec!["HGET".to_string(), hash, field],
            Commands::Hgetall { hash } => vec!["HGETALL".to_string(), hash],
        }
    }
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Could not connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    match client.command(&args.command.into_parts()) {
        Ok(reply) => {
            let failed = reply.is_error();
            print_reply(&reply, "");
            if failed {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a reply the way redis-cli does
fn print_reply(reply: &Value, indent: &str) {
    match reply {
        Value::SimpleString(text) => println!("{}", text),
        Value::SimpleError(text) => println!("(error) {}", text),
        Value::Integer(n) => println!("(integer) {}", n),
        Value::BulkString(payload) => println!("\"{}\"", String::from_utf8_lossy(payload)),
        Value::Null => println!("(nil)"),
        Value::Array(items) if items.is_empty() => println!("(empty array)"),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                let prefix = if i == 0 { String::new() } else { indent.to_string() };
                print!("{}{}) ", prefix, i + 1);
                print_reply(item, &format!("{}   ", indent));
            }
        }
    }
}
