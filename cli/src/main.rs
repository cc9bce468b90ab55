use clap::Parser;
use std::process::ExitCode;

mod formatting;
mod prefix;
mod relocate;
mod rpath;
mod show;

pub(crate) use self::formatting::*;
pub(crate) use self::prefix::*;
pub(crate) use self::relocate::*;
pub(crate) use self::rpath::*;
pub(crate) use self::show::*;

#[derive(clap::Parser)]
#[clap(version)]
struct Args {
    #[clap(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
pub struct CommonArgs {
    /// The number of threads; all CPUs are used by default.
    #[clap(short = 'j', long = "jobs", value_name = "N", global = true)]
    jobs: Option<usize>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Relocate installed files.
    Relocate(RelocateArgs),
    /// Replace prefixes in text or binary files.
    Replace(ReplaceArgs),
    /// Print library search path.
    Rpath(RpathArgs),
    /// Overwrite library search path.
    SetRpath(SetRpathArgs),
    /// Show dynamic linking information.
    Show(ShowArgs),
    /// Re-point symbolic links.
    Links(LinksArgs),
    /// Make library search paths and symbolic links relative.
    MakeRelative(MakeRelativeArgs),
}

fn main() -> ExitCode {
    do_main()
        .inspect_err(|e| eprintln!("{e}"))
        .unwrap_or(ExitCode::FAILURE)
}

fn do_main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    env_logger::init();
    if let Some(jobs) = args.common.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()?;
    }
    match args.command {
        Command::Relocate(args) => relocate(args),
        Command::Replace(args) => replace(args),
        Command::Rpath(args) => rpath(args),
        Command::SetRpath(args) => set_rpath(args),
        Command::Show(args) => show(args),
        Command::Links(args) => links(args),
        Command::MakeRelative(args) => make_relative(args),
    }
}
