//! # dnadb CLI Entry Point
//!
//! Runs a command file against the store in the current directory:
//!
//! ```bash
//! dnadb <command-file> <num-buffers> <block-size>
//! ```
//!
//! The backing pool file (`dnadb.pool`) is created on first use and, after
//! a clean run, reopened with its contents intact on the next.

use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

use eyre::{Result, WrapErr};

use dnadb::config::{default_pool_path, StoreConfig};
use dnadb::controller::Controller;
use dnadb::storage::MemManager;
use dnadb::trie::DnaTrie;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        print_usage();
        process::exit(1);
    }

    let command_file = File::open(&args[1])
        .wrap_err_with(|| format!("command file \"{}\" not found", args[1]))?;
    let buffers: usize = match args[2].parse() {
        Ok(n) if n >= 1 => n,
        _ => {
            println!("Invalid buffer count of {}", args[2]);
            print_usage();
            process::exit(1);
        }
    };
    let block_size: usize = match args[3].parse() {
        Ok(n) if n >= 1 => n,
        _ => {
            println!("Invalid block size of {}", args[3]);
            print_usage();
            process::exit(1);
        }
    };

    let config = StoreConfig::with_cache(buffers, block_size);
    let (manager, resume) = MemManager::open(&default_pool_path(), &config)
        .wrap_err("memory manager initialization failed")?;
    let trie = DnaTrie::open(manager, resume)?;
    let mut controller = Controller::new(trie);

    let stdout = io::stdout();
    controller.run(BufReader::new(command_file), &mut stdout.lock())?;
    controller.close()?;
    Ok(())
}

fn print_usage() {
    println!("dnadb - embedded DNA sequence store");
    println!();
    println!("USAGE:");
    println!("    dnadb <command-file> <num-buffers> <block-size>");
    println!();
    println!("ARGS:");
    println!("    <command-file>    text file with one command per line");
    println!("    <num-buffers>     buffer-pool capacity (>= 1)");
    println!("    <block-size>      buffer block size in bytes (>= 1)");
}
