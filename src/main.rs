use clap::{Parser, Subcommand};
use kiln::config::Overrides;
use kiln::pipeline::{self, BuildOptions};
use kiln::{config, output};
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Static blog generator with incremental builds")]
#[command(long_about = "\
Static blog generator with incremental builds

Markdown files under the content directory become pages; tags, categories,
and date archives become listing pages. Rebuilds hash every content file,
diff against the previous build's manifest, and reuse cached work where
nothing changed. A changed config.toml invalidates the whole cache.

Project structure:

  config.toml            # Site config ([site].title and base_url required)
  content/
  └── posts/
      └── hello.md       # Markdown + optional YAML front matter
  assets/                # Copied verbatim to <output>/assets/
  public/                # Build output (default)
  .kiln/cache/           # Build manifest + cached article HTML

Front matter:

  ---
  title: Hello World
  date: 2024-06-01
  tags: [go, web]
  categories: [tech]
  draft: false
  ---

Run 'kiln gen-config' to print a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Path to the config file (its directory is the project root)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site
    Build(BuildArgs),
    /// Validate config and content without writing output
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Force a full build (bypass change detection)
    #[arg(long)]
    full: bool,

    /// Override the output directory
    #[arg(long)]
    output: Option<String>,

    /// Override parallelism for page generation
    #[arg(long)]
    parallel: Option<usize>,

    /// Run the pipeline without writing any files
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let root_dir = project_root(&cli.config)?;

    match cli.command {
        Command::Build(args) => {
            let opts = BuildOptions {
                root_dir,
                force_full: args.full,
                overrides: Overrides {
                    output_dir: args.output,
                    parallelism: args.parallel,
                },
                dry_run: args.dry_run,
            };
            let report = pipeline::run_build(&opts)?;
            output::print_build_report(&report);
        }
        Command::Check => {
            let count = pipeline::run_check(&root_dir)?;
            println!("check: {count} articles, content is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// The project root is the directory holding the config file.
fn project_root(config_path: &Path) -> std::io::Result<PathBuf> {
    let abs = std::path::absolute(config_path)?;
    Ok(abs
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}
