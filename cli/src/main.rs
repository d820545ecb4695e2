mod console;
mod interactive;
mod prompt;

use std::{
    fs::File,
    io::{stderr, stdin, stdout},
    path::PathBuf,
};

use anyhow::{Context, Result};
use cache_sim::{
    addr::{line_index, tag_of, Addr},
    config::{CacheConfig, WritePolicy},
    sim::{self, Simulator},
};
use clap::{Args, Parser, Subcommand};
use terminal_size::terminal_size;

use crate::{
    console::{ConsoleTrace, Show},
    prompt::{PartialConfig, Prompt},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// replay an access sequence against a direct-mapped cache
    Run(RunArgs),
    /// print line index and tag of addresses
    Decode(DecodeArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// File path to a JSON cache configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// Cache size in bytes
    #[arg(long)]
    cache_size: Option<u32>,
    /// Line size in bytes
    #[arg(long)]
    line_size: Option<u32>,
    /// Cycles for a cache access
    #[arg(long = "cycles")]
    access_cycles: Option<u32>,
    /// Write policy on hit (WT/WB)
    #[arg(long)]
    hit_policy: Option<String>,
    /// Write policy on miss (WT/WB)
    #[arg(long)]
    miss_policy: Option<String>,
    /// Cycles for a backing-store access on a miss
    #[arg(long)]
    penalty: Option<u32>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// File path to the access sequence
    #[arg(short, long, default_value = "access_sequence.txt")]
    input: PathBuf,
    /// Only print the final statistics
    #[arg(short, long)]
    quiet: bool,
    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,
    /// Enable interactive mode
    #[arg(long)]
    interactive: bool,
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Line size in bytes
    #[arg(long)]
    line_size: u32,
    /// Number of lines
    #[arg(long)]
    lines: u32,
    /// Addresses to decode
    #[arg(required = true)]
    addresses: Vec<u32>,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    match args.command {
        Command::Run(args) => {
            init_logger(args.verbose);
            run(args)
        }
        Command::Decode(DecodeArgs {
            line_size,
            lines,
            addresses,
        }) => {
            init_logger(false);
            for a in addresses.into_iter().map(Addr::new) {
                let index = line_index(a, lines, line_size)?;
                let tag = tag_of(a, line_size)?;
                println!("{a}: line {index}, tag {tag}");
            }
            Ok(())
        }
    }
}

fn init_logger(verbose: bool) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level(verbose)))
        .init();
}

fn log_level(verbose: bool) -> &'static str {
    if verbose {
        "info"
    } else {
        "warn"
    }
}

fn run(args: RunArgs) -> Result<()> {
    let RunArgs {
        config,
        input,
        quiet,
        json,
        interactive,
        ..
    } = args;
    let config = read_config(config, json)?;
    let accesses = sim::load_accesses(&input)?;

    let width = get_terminal_width().unwrap_or(100) as usize;
    let chunk_size = (width / 50).max(1);
    let show = if quiet || json || interactive {
        Show::none()
    } else {
        Show::all()
    };
    let trace = ConsoleTrace::new(stdout(), show, chunk_size, width);
    let mut sim = Simulator::new(config, accesses, trace)?;
    if !json {
        println!("{}", sim.session().config());
    }

    if interactive {
        interactive::execute_interactive(&mut sim, chunk_size, width)?;
    } else {
        sim.run()?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&sim.summary())?);
    } else {
        println!("{}", sim.collect_stat().view(width));
    }
    log::info!("finished execution.");
    Ok(())
}

/// Flags override the JSON file; whatever is still missing is asked for on stdin.
/// Prompts go to stderr when stdout carries JSON.
fn read_config(args: ConfigArgs, json: bool) -> Result<CacheConfig> {
    let ConfigArgs {
        config,
        cache_size,
        line_size,
        access_cycles,
        hit_policy,
        miss_policy,
        penalty,
    } = args;
    let from_file = match config {
        Some(p) => {
            let file = File::open(&p).with_context(|| format!("failed to open {}", p.display()))?;
            PartialConfig::from_config(CacheConfig::deser(file)?)
        }
        None => Default::default(),
    };
    let from_flags = PartialConfig {
        cache_size,
        line_size,
        access_cycles,
        hit_policy: hit_policy.as_deref().map(WritePolicy::from_token),
        miss_policy: miss_policy.as_deref().map(WritePolicy::from_token),
        memory_penalty: penalty,
    };
    let partial = from_file.overridden_by(from_flags);
    let config = match partial.into_config() {
        Some(config) => config,
        None if json => partial.complete(&mut Prompt::new(stdin().lock(), stderr()))?,
        None => partial.complete(&mut Prompt::new(stdin().lock(), stdout()))?,
    };
    config.geometry()?;
    Ok(config)
}

fn get_terminal_width() -> Option<u16> {
    terminal_size().map(|(w, _)| w.0.saturating_sub(20))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(true), "info");
        // warnings about ignored input stay visible without --verbose
        assert_eq!(log_level(false), "warn");
    }
}
