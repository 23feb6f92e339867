#![forbid(unsafe_code)]

use std::env;
use std::io::{self, IsTerminal, Read};

use reclist_engines::integrity_codec::IntegrityCodec;
use reclist_engines::key_store::{IntegrityKeyStore, SecretSource};
use reclist_tools::envelope_cli::execute_envelope_command;
use reclist_tools::key_cli::execute_key_command;

const USAGE: &str = "usage: reclist key <init|set|path|has> | reclist envelope <seal|open> [payload tag]";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().skip(1).collect();
    let group = args.first().ok_or_else(|| USAGE.to_string())?.as_str();
    let subcommand = args.get(1).ok_or_else(|| USAGE.to_string())?.as_str();
    let rest: Vec<&str> = args.iter().skip(2).map(String::as_str).collect();

    let output = match group {
        "key" => {
            let value = if subcommand == "set" {
                Some(read_secret_value()?)
            } else {
                None
            };
            let store = IntegrityKeyStore::default_local();
            execute_key_command(&store, subcommand, value.as_deref())?
        }
        "envelope" => {
            let input = if subcommand == "seal" {
                Some(read_stdin()?)
            } else {
                None
            };
            let secret = SecretSource::from_env()
                .load()
                .map_err(|e| format!("failed to load integrity secret: {e}"))?;
            let codec = IntegrityCodec::new(secret);
            execute_envelope_command(&codec, subcommand, &rest, input.as_deref())?
        }
        _ => return Err(USAGE.to_string()),
    };
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn read_secret_value() -> Result<String, String> {
    let value = if io::stdin().is_terminal() {
        rpassword::prompt_password("Enter base64 integrity secret:").map_err(|e| e.to_string())?
    } else {
        read_stdin()?
    };
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        return Err("secret value must not be empty".to_string());
    }
    Ok(trimmed)
}

fn read_stdin() -> Result<String, String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| e.to_string())?;
    Ok(input)
}
