use std::path::PathBuf;
use std::process::ExitCode;

use fs_err::File;
use reloc::ContentKind;
use reloc::ElfFile;
use reloc::ParseOptions;

use crate::BytesStr;
use crate::Printer;

#[derive(clap::Args)]
pub struct ShowArgs {
    /// File.
    #[clap(value_name = "FILE")]
    file: PathBuf,
}

pub fn show(args: ShowArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut file = File::open(&args.file)?;
    let kind = reloc::detect_file_kind(&mut file)?;
    let mut printer = Printer::new();
    printer.title("File");
    printer.kv("Contents", format_args!("{:?}", kind));
    if kind != ContentKind::Elf {
        return Ok(ExitCode::SUCCESS);
    }
    let elf = ElfFile::parse(
        &mut file,
        ParseOptions::new().interpreter(true).dynamic(true),
    )?;
    printer.kv("Class", format_args!("{:?}", elf.class()));
    printer.kv("Byte order", format_args!("{:?}", elf.byte_order()));
    printer.kv("File type", format_args!("{:?}", elf.kind()));
    printer.kv(
        "Program header",
        format_args!(
            "{:#x}..{:#x}",
            elf.header.program_header_offset,
            elf.header.program_header_offset
                + elf.header.num_segments as u64 * elf.header.segment_len as u64,
        ),
    );
    if let Some(interpreter) = elf.interpreter.as_ref() {
        printer.kv("Interpreter", BytesStr(interpreter));
    }
    let Some(dynamic) = elf.dynamic.as_ref() else {
        return Ok(ExitCode::SUCCESS);
    };
    printer.title("Dynamic");
    if let Some(offset) = dynamic.string_table_offset {
        printer.kv("String table", format_args!("{:#x}", offset));
    }
    if let Some(soname) = dynamic.soname.as_ref() {
        printer.kv("SONAME", BytesStr(soname));
    }
    if let Some(rpath) = dynamic.rpath.as_ref() {
        printer.kv(
            &format!("{:?}", rpath.kind).to_uppercase(),
            BytesStr(&rpath.value),
        );
        printer.kv("String offset", format_args!("{:#x}", rpath.string_offset));
        printer.kv("Entry offset", format_args!("{:#x}", rpath.entry_offset));
    }
    if !dynamic.needed.is_empty() {
        printer.title("Needed");
        for needed in dynamic.needed.iter() {
            printer.row(BytesStr(needed));
        }
    }
    Ok(ExitCode::SUCCESS)
}
