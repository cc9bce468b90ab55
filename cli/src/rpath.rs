use std::path::PathBuf;
use std::process::ExitCode;

use reloc::RpathKind;

#[derive(clap::ValueEnum, Clone, Copy)]
#[clap(rename_all = "snake_case")]
pub enum ForceArg {
    Rpath,
    Runpath,
}

impl From<ForceArg> for RpathKind {
    fn from(other: ForceArg) -> Self {
        match other {
            ForceArg::Rpath => Self::Rpath,
            ForceArg::Runpath => Self::Runpath,
        }
    }
}

#[derive(clap::Args)]
pub struct RpathArgs {
    /// ELF file.
    #[clap(value_name = "ELF file")]
    file: PathBuf,
}

pub fn rpath(args: RpathArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let Some(rpaths) = reloc::get_rpaths(&args.file) else {
        return Err(format!("Failed to read rpath from {:?}", args.file).into());
    };
    for rpath in rpaths.iter() {
        println!("{rpath}");
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(clap::Args)]
pub struct SetRpathArgs {
    /// Change the tag to RPATH or RUNPATH.
    #[clap(long = "force", value_name = "TAG")]
    force: Option<ForceArg>,

    /// ELF file.
    #[clap(value_name = "ELF file")]
    file: PathBuf,

    /// New search path entries.
    #[clap(value_name = "RPATH...")]
    rpaths: Vec<String>,
}

pub fn set_rpath(args: SetRpathArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if !reloc::replace_rpaths(&args.file, &args.rpaths, args.force.map(Into::into)) {
        log::error!(
            "Failed to set rpath of {:?}: no rpath or the new one is longer",
            args.file
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
