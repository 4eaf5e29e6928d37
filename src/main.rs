//! Constraint Layout CLI
//!
//! Usage:
//!   constraint-layout [OPTIONS] [FILE]
//!
//! Options:
//!   -c, --config <FILE>    Layout configuration (TOML format)
//!   -f, --frame-ms <MS>    Clock step between frames
//!       --frames           Print every frame, not only settled layouts
//!   -d, --debug            Log layout values on every frame
//!   -g, --grammar          Show scene format reference
//!   -h, --help             Print help

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use constraint_layout::{run_with_config, LayoutConfig, SceneConfig};

#[derive(Parser)]
#[command(name = "constraint-layout")]
#[command(about = "Incremental box-constraint layout driven by scene files")]
struct Cli {
    /// Input file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Layout configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Clock step between frames, in milliseconds
    #[arg(short, long, default_value_t = 16)]
    frame_ms: u64,

    /// Print every frame of a transition
    #[arg(long)]
    frames: bool,

    /// Debug mode: log every dimension on every frame
    #[arg(short, long)]
    debug: bool,

    /// Show scene format reference
    #[arg(short, long)]
    grammar: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.grammar {
        print_grammar();
        return;
    }

    // Load layout configuration
    let layout = match &cli.config {
        Some(path) => match LayoutConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => LayoutConfig::default(),
    };
    let layout = if cli.debug {
        layout.with_debug(true)
    } else {
        layout
    };

    // Read input
    let (source, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let config = SceneConfig::new()
        .with_layout(layout)
        .with_frame_interval(Duration::from_millis(cli.frame_ms))
        .with_record_frames(cli.frames);
    match run_with_config(&source, &config) {
        Ok(report) => {
            print!("{}", report);
        }
        Err(e) => {
            eprintln!("{}", e.format(&source, &filename));
            std::process::exit(1);
        }
    }
}

fn print_grammar() {
    println!(
        r#"CONSTRAINT LAYOUT SCENE FORMAT
=============================

STATEMENTS
----------
constrain <expr> (=|<=|>=) <expr> [options]
measure <dim> <width> <height>
average [<expr>, ...] >= <expr>
chain <name> <direction> <style> in <dim> [<dim>, ...]
boundary <dim> around [<dim>, ...] [left, right, top, bottom, tight]
sum <name> [<weight> * <expr>, ...] (=|<=|>=) <expr>
place <dim> in <dim> (sides|center) [horizontal: <ratio>, vertical: <ratio>]
table <name> in <dim> <rows> by <cols>

PASSES
------
Top-level statements form the first pass; each `pass {{ ... }}` block is
evaluated as a later pass against the same layout. Only the difference
between two passes reaches the solver.

EXPRESSIONS
-----------
gap                   Scalar variable
box.left              Dimension edge: left, right, top, bottom, width, height
box.center_x          Derived center: center_x, center_y
2 * a.width + 10      Linear arithmetic with + - * and parentheses

CONSTRAIN OPTIONS
-----------------
strength: strong|medium|weak   Priority (default strong)
enter: <ms>                    Transition when first declared
update: <ms>                   Transition when changed
exit: <ms>                     Transition when removed
key: <name>                    Stable identity independent of position

CHAINS
------
direction: row, row_reverse, column, column_reverse
style:     spread, spread_inside, packed, gapless"#
    );
}
