use clap::{Parser, Subcommand};
use ecb::config::{self, SiteConfig};
use ecb::{output, site};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ecb")]
#[command(about = "Static site compiler for web component pages")]
#[command(long_about = "\
Static site compiler for web component pages

Components are .html files named after the tag they define. Pages use them
by tag and are merged into a shared layout.

Project structure:

  project/
  ├── ecb.toml                     # Optional config (see gen-config)
  ├── app.html                     # Layout: {{ head }}, {{ content }}, {{ components }}
  ├── components/
  │   ├── ecb-button.html          # <ecb-button>
  │   └── forms/
  │       └── ecb_text_field.html  # <ecb-text-field>
  ├── pages/
  │   ├── index.html               # → dist/index.html
  │   └── blog/post.html           # → dist/blog/post.html
  └── assets/                      # → dist/assets/

Components may use other components. Cycles and unknown tags stop the build
before any page is written.

Run 'ecb gen-config' to generate a documented ecb.toml.")]
#[command(version)]
struct Cli {
    /// Project directory
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Output directory (overrides paths.output)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log every pipeline stage
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile every page and copy assets
    Build,
    /// Validate components and their dependencies without writing anything
    Check,
    /// Show the components each page needs
    Deps {
        /// Print JSON instead of a tree
        #[arg(long)]
        json: bool,
    },
    /// Print a stock ecb.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return ExitCode::SUCCESS;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&cli, &config);

    match run(&cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            if let Some(trace) = err.cycle_trace() {
                output::print_cycle_trace(trace, &cli.root);
            }
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<SiteConfig, config::ConfigError> {
    let mut config = config::load_config(&cli.root)?;
    if let Some(output) = &cli.output {
        config.paths.output = output.to_string_lossy().into_owned();
    }
    Ok(config)
}

fn run(cli: &Cli, config: SiteConfig) -> Result<(), site::BuildError> {
    match &cli.command {
        Command::Build => {
            let root = cli.root.clone();
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_build_event(&event, &root) {
                        println!("{}", line);
                    }
                }
            });
            let result = site::build(&cli.root, config, Some(tx));
            printer.join().ok();
            output::print_build_summary(&result?, &cli.root);
        }
        Command::Check => {
            println!("==> Checking {}", cli.root.display());
            let site = site::check(&cli.root, config)?;
            output::print_check_output(&site.components(), &cli.root);
            println!("==> Components are valid");
        }
        Command::Deps { json } => {
            let site = site::check(&cli.root, config)?;
            let pages = site.inspect()?;
            if *json {
                print_json(&pages);
            } else {
                output::print_dependency_tree(&pages, &site.components(), &cli.root);
            }
        }
        Command::GenConfig => print!("{}", config::stock_config_toml()),
    }
    Ok(())
}

fn print_json(pages: &[site::PageInspection]) {
    match serde_json::to_string_pretty(pages) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("error: could not serialize pages: {err}"),
    }
}

/// Install the log subscriber. `RUST_LOG` wins over the flags.
fn init_tracing(cli: &Cli, config: &SiteConfig) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if cli.verbose {
        "ecb=debug"
    } else if cli.quiet || !config.verbose {
        "ecb=warn"
    } else {
        "ecb=info"
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
