use std::path::PathBuf;

use thiserror::Error;

const PADDING_HINT: &str =
    "To fix this, compile with more padding or install to a shorter prefix.";

/// Relocation error.
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    #[error("Not an ELF file")]
    NotElf,
    #[error("Invalid ELF class: {0}")]
    InvalidClass(u8),
    #[error("Invalid byte order: {0}")]
    InvalidByteOrder(u8),
    #[error("Invalid file kind: {0}: neither an executable nor a shared object")]
    InvalidFileKind(u16),
    #[error("Malformed ELF file: {0}")]
    Malformed(&'static str),
    #[error("Could not find a unique rpath/runpath: found {0} entries")]
    MultipleRpaths(usize),
    #[error("Could not find a unique string table for the dynamic section: found {0} entries")]
    NoUniqueStringTable(usize),
    #[error("Could not determine the size of the string table at offset {0:#x}")]
    StringTableNotFound(u64),
    #[error("Virtual address {0:#x} is not covered by any LOAD segment")]
    AddressNotMapped(u64),
    #[error("C-string at string table offset {0:#x} is not NUL-terminated")]
    UnterminatedString(u64),
    #[error(
        "Cannot replace \"{}\" with \"{}\" because the new prefix is longer. {}",
        .old.escape_ascii(),
        .new.escape_ascii(),
        PADDING_HINT
    )]
    CannotGrowString { old: Vec<u8>, new: Vec<u8> },
    #[error(
        "Cannot replace \"{}\" with \"{}\" in the C-string \"{}\". {}",
        .old.escape_ascii(),
        .new.escape_ascii(),
        .c_string.escape_ascii(),
        PADDING_HINT
    )]
    CannotShrinkCString {
        old: Vec<u8>,
        new: Vec<u8>,
        c_string: Vec<u8>,
    },
    #[error(
        "Binary string replacement changed the size of the file from {} to {} \
        when it should have remained the same. {}",
        .old_len,
        .new_len,
        PADDING_HINT
    )]
    FileSizeChanged { old_len: u64, new_len: u64 },
    #[error("Replacement of {actual} bytes does not cover the match of {expected} bytes")]
    ReplacementLength { expected: usize, actual: usize },
    #[error(
        "New rpath \"{}\" is longer than old rpath \"{}\"",
        .new.escape_ascii(),
        .old.escape_ascii()
    )]
    RpathTooLong { old: Vec<u8>, new: Vec<u8> },
    #[error("Failed to compile prefix pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("{path:?}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
    #[error("Input/output error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The file cannot be processed by the ELF codec.
    ///
    /// Callers usually skip such files: not every file is ELF.
    pub fn is_elf_parsing(&self) -> bool {
        match self {
            Self::NotElf
            | Self::InvalidClass(..)
            | Self::InvalidByteOrder(..)
            | Self::InvalidFileKind(..)
            | Self::Malformed(..)
            | Self::MultipleRpaths(..)
            | Self::NoUniqueStringTable(..)
            | Self::StringTableNotFound(..)
            | Self::AddressNotMapped(..)
            | Self::UnterminatedString(..) => true,
            Self::File { source, .. } => source.is_elf_parsing(),
            _ => false,
        }
    }

    /// The prefix mapping cannot be applied to a binary in place.
    pub fn is_binary_text_replace(&self) -> bool {
        match self {
            Self::CannotGrowString { .. }
            | Self::CannotShrinkCString { .. }
            | Self::FileSizeChanged { .. }
            | Self::ReplacementLength { .. } => true,
            Self::File { source, .. } => source.is_binary_text_replace(),
            _ => false,
        }
    }

    /// Attribute the error to the file at `path`.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            e @ Self::File { .. } => e,
            e => Self::File {
                path: path.into(),
                source: Box::new(e),
            },
        }
    }
}
