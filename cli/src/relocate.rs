use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use fs_err::OpenOptions;
use reloc::BinaryFilePrefixReplacer;
use reloc::Layout;
use reloc::PrefixReplacer;
use reloc::Relocator;
use reloc::TextFilePrefixReplacer;
use reloc::DEFAULT_SUFFIX_SAFETY_SIZE;

use crate::ChangesStr;
use crate::parse_prefix_pair;
use crate::ForceArg;
use crate::PrefixArgs;

#[derive(clap::Args)]
pub struct RelocateArgs {
    #[clap(flatten)]
    prefixes: PrefixArgs,

    /// The number of trailing C-string bytes that are never moved in binary files.
    #[clap(
        short = 's',
        long = "suffix-safety-size",
        value_name = "N",
        default_value_t = DEFAULT_SUFFIX_SAFETY_SIZE
    )]
    suffix_safety_size: usize,

    /// Don't rewrite RPATH/RUNPATH of ELF files.
    #[clap(action, long = "no-rpaths")]
    no_rpaths: bool,

    /// Change the tag of existing RPATH/RUNPATH entries.
    #[clap(long = "force", value_name = "TAG")]
    force: Option<ForceArg>,

    /// Treat RPATH/RUNPATH as $ORIGIN-relative; the files moved from OLD_ROOT to NEW_ROOT.
    #[clap(
        long = "relative",
        value_name = "OLD_ROOT=NEW_ROOT",
        value_parser = parse_prefix_pair
    )]
    relative: Option<(String, String)>,

    /// Files.
    #[clap(value_name = "FILE...")]
    files: Vec<PathBuf>,
}

pub fn relocate(args: RelocateArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let relocator = Relocator::options()
        .suffix_safety_size(args.suffix_safety_size)
        .rpaths(!args.no_rpaths)
        .force(args.force.map(Into::into))
        .relative(args.relative.map(|(old, new)| Layout::new(old, new)))
        .new_relocator(args.prefixes.prefix_map())?;
    let mut exit_code = ExitCode::SUCCESS;
    for result in relocator.relocate_files(&args.files) {
        match result {
            Ok(relocation) if !relocation.changes.is_empty() => {
                println!(
                    "{} {:?} {}",
                    "relocated".green(),
                    relocation.path,
                    ChangesStr(relocation.changes)
                );
            }
            Ok(..) => {}
            Err(e) => {
                eprintln!("{} {e}", "error".red().bold());
                exit_code = ExitCode::FAILURE;
            }
        }
    }
    Ok(exit_code)
}

#[derive(clap::ValueEnum, Clone, Copy)]
#[clap(rename_all = "snake_case")]
enum Mode {
    Text,
    Binary,
}

#[derive(clap::Args)]
pub struct ReplaceArgs {
    /// How the files are treated.
    #[clap(short = 'm', long = "mode", value_name = "MODE")]
    mode: Mode,

    #[clap(flatten)]
    prefixes: PrefixArgs,

    /// The number of trailing C-string bytes that are never moved in binary mode.
    #[clap(
        short = 's',
        long = "suffix-safety-size",
        value_name = "N",
        default_value_t = DEFAULT_SUFFIX_SAFETY_SIZE
    )]
    suffix_safety_size: usize,

    /// Files.
    #[clap(value_name = "FILE...")]
    files: Vec<PathBuf>,
}

pub fn replace(args: ReplaceArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let prefix_map = args.prefixes.prefix_map();
    let changed = match args.mode {
        Mode::Text => TextFilePrefixReplacer::new(prefix_map)?.apply(&args.files)?,
        Mode::Binary => {
            BinaryFilePrefixReplacer::new(prefix_map, args.suffix_safety_size)?.apply(&args.files)?
        }
    };
    for path in changed.iter() {
        println!("{} {:?}", "replaced".green(), path);
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(clap::Args)]
pub struct LinksArgs {
    #[clap(flatten)]
    prefixes: PrefixArgs,

    /// Symbolic links.
    #[clap(value_name = "LINK...")]
    links: Vec<PathBuf>,
}

pub fn links(args: LinksArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let changed = reloc::relocate_links(&args.links, &args.prefixes.prefix_map())?;
    for path in changed.iter() {
        println!("{} {:?}", "re-pointed".green(), path);
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(clap::Args)]
pub struct MakeRelativeArgs {
    /// RPATH/RUNPATH entries under this directory are made $ORIGIN-relative.
    #[clap(short = 'r', long = "root", value_name = "ROOT")]
    root: PathBuf,

    /// Change the tag of existing RPATH/RUNPATH entries.
    #[clap(long = "force", value_name = "TAG")]
    force: Option<ForceArg>,

    /// ELF files and symbolic links.
    #[clap(value_name = "FILE...")]
    files: Vec<PathBuf>,
}

pub fn make_relative(args: MakeRelativeArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let force = args.force.map(Into::into);
    let mut exit_code = ExitCode::SUCCESS;
    for path in args.files.iter() {
        let result = fs_err::symlink_metadata(path)
            .map_err(reloc::Error::from)
            .and_then(|metadata| {
                if metadata.is_symlink() {
                    return reloc::make_links_relative([(path, path)])
                        .map(|changed| !changed.is_empty());
                }
                let mut file = OpenOptions::new().read(true).write(true).open(path)?;
                reloc::make_rpaths_relative(&mut file, path, &args.root, force)
            });
        match result {
            Ok(true) => println!("{} {:?}", "relative".green(), path),
            Ok(false) => {}
            Err(e) => {
                eprintln!("{} {:?}: {e}", "error".red().bold(), path);
                exit_code = ExitCode::FAILURE;
            }
        }
    }
    Ok(exit_code)
}
