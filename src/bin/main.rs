use clap::{Parser, ValueEnum};
use k::ListingOptions;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, level_filters::LevelFilter};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to list
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Include hidden files
    #[arg(short, long)]
    all: bool,

    /// When to color the output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Print the listing as JSON
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(global = true, short, long, default_value = "error")]
    log: LevelFilter,
}

impl Cli {
    const fn options(&self) -> ListingOptions {
        ListingOptions { all: self.all }
    }
}

fn apply_color(choice: ColorChoice) {
    let enabled = match choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => io::stdout().is_terminal(),
    };
    colored::control::set_override(enabled);
}

async fn run(cli: &Cli) -> k::Result<()> {
    apply_color(cli.color);

    let listing = k::list(&cli.dir, cli.options()).await?;
    debug!(entries = listing.entries.len(), mode = ?listing.mode, "Listing ready");

    let mut out = BufWriter::new(io::stdout().lock());
    let written = if cli.json {
        k::render::render_json(&listing, &mut out)
    } else {
        k::render::render(&listing, &mut out)
    };

    match written.and_then(|()| out.flush()) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        result => Ok(result?),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive(cli.log.into());

    fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(io::stderr().is_terminal())
        .init();

    if let Err(e) = run(&cli).await {
        error!(error = %e, "Listing failed");
        eprintln!("k: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
