use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use emu8::{Config, KeyWait};

mod display;
mod keymap;
mod run;

/// Runs a Chip-8 ROM in an SDL2 window
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a .ch8 ROM
    rom: PathBuf,

    /// Size of each Chip-8 pixel on screen
    #[arg(short, long, default_value_t = 10)]
    scale: u32,

    /// Milliseconds between cycles
    #[arg(short, long, default_value_t = 1)]
    delay: u64,

    /// How Fx0A waits for a key: "reexecute" or "latched"
    #[arg(long, default_value_t = KeyWait::Reexecute)]
    key_wait: KeyWait,

    /// Cycles between timer decrements
    #[arg(long, default_value_t = 1)]
    timer_divider: u8,

    /// Seed for the random number instruction
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::default()
        .with_key_wait(args.key_wait)
        .with_cycles_per_timer_tick(args.timer_divider);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let settings = run::Settings {
        scale: args.scale,
        delay: args.delay,
    };
    if let Err(e) = run::run(&args.rom, config, settings) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}
