use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use venvx::config::Layout;

/// venvx - publish programs of per-package virtual environments
///
/// Every package lives in its own environment under the venvs root. venvx
/// decides which of its programs are linked into a shared bin directory and
/// keeps those links in step with the recorded expose rules.
///
/// Expose rules:
///   __eponym__   the program named like the package
///   __main__     the package's console scripts
///   __all__      every program except python/pip
///   _            nothing
///   NAME[:ALIAS] the named program, optionally published as ALIAS
#[derive(Parser, Debug)]
#[command(author, version = env!("VENVX_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the environments (default: $VENVX_HOME/venvs)
    #[arg(long = "venvs", env = "VENVX_VENVS", value_name = "PATH", global = true)]
    pub venvs_root: Option<PathBuf>,

    /// Directory the programs are linked into (default: ~/.local/bin)
    #[arg(long = "bin-dir", env = "VENVX_BIN_DIR", value_name = "PATH", global = true)]
    pub bin_dir: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Write the manifest of an environment that already exists
    Init(InitArgs),

    /// Expose programs of an environment
    Expose(ExposeArgs),

    /// Apply expose rules to every environment
    ExposeAll(ExposeAllArgs),

    /// Re-apply the last recorded expose rules of an environment
    Reexpose(NameArgs),

    /// List environments
    List,

    /// Show an environment and the state of its links
    Show(NameArgs),

    /// Remove an environment and its exposed programs
    Remove(RemoveArgs),

    /// Upgrade the manifest of an environment to the current format
    Migrate(NameArgs),
}

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Requirement the environment was created from, e.g. "jc>=1.25"
    #[arg(value_name = "SPEC")]
    pub spec: String,

    /// Environment name (defaults to the package name)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ExposeArgs {
    #[arg(value_name = "NAME")]
    pub name: String,

    #[arg(value_name = "RULE", required = true)]
    pub rules: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ExposeAllArgs {
    #[arg(value_name = "RULE", required = true)]
    pub rules: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct NameArgs {
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = venvx::runtime::RealRuntime;
    let layout = Layout::resolve(&runtime, cli.venvs_root, cli.bin_dir)?;

    match cli.command {
        Commands::Init(args) => venvx::commands::init(runtime, &args.spec, args.name.as_deref(), layout)?,
        Commands::Expose(args) => venvx::commands::expose(runtime, &args.name, &args.rules, layout)?,
        Commands::ExposeAll(args) => venvx::commands::expose_all(runtime, &args.rules, layout)?,
        Commands::Reexpose(args) => venvx::commands::reexpose(runtime, &args.name, layout)?,
        Commands::List => venvx::commands::list(runtime, layout)?,
        Commands::Show(args) => venvx::commands::show(runtime, &args.name, layout)?,
        Commands::Remove(args) => venvx::commands::remove(runtime, &args.name, args.yes, layout)?,
        Commands::Migrate(args) => venvx::commands::migrate(runtime, &args.name, layout)?,
    }
    Ok(())
}
