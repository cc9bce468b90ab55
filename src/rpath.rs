//! Read and overwrite `RPATH`/`RUNPATH` in place.
//!
//! The string can only be replaced by a string of the same or smaller length:
//! new dynamic entries and longer strings would require relinking.

use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::path::Path;

use crate::constants::*;
use crate::fs;
use crate::ByteOrder;
use crate::Class;
use crate::ElfFile;
use crate::ElfWrite;
use crate::Error;
use crate::ParseOptions;
use crate::PrefixMap;
use crate::RpathKind;
use crate::Schema;

/// Where the library search path lives in the file.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ElfDescriptor {
    /// Bitness.
    pub class: Class,
    /// Data format.
    pub byte_order: ByteOrder,
    /// File offset of the search path string.
    pub rpath_offset: u64,
    /// File offset of the tag word of the dynamic entry.
    pub dynamic_entry_offset: u64,
    /// The entry is `RUNPATH` rather than `RPATH`.
    pub is_runpath: bool,
}

impl ElfDescriptor {
    /// 64-bit file.
    pub fn is_64_bit(&self) -> bool {
        self.class == Class::Elf64
    }

    /// Little-endian file.
    pub fn is_little_endian(&self) -> bool {
        self.byte_order == ByteOrder::LittleEndian
    }

    /// Which tag currently holds the search path.
    pub fn kind(&self) -> RpathKind {
        if self.is_runpath {
            RpathKind::Runpath
        } else {
            RpathKind::Rpath
        }
    }

    /// Overwrite the tag of the dynamic entry.
    fn write_tag<W: Write + Seek>(&self, writer: &mut W, kind: RpathKind) -> Result<(), Error> {
        let field = Schema::get(self.class).dynamic.tag;
        let bytes = field.encode(kind.tag().as_number(), self.byte_order);
        writer.write_at(self.dynamic_entry_offset, &bytes)
    }
}

/// Read the search path string and its location.
///
/// Returns `None` if the file has no `DYNAMIC` segment or the segment has no `RPATH`/`RUNPATH`
/// entry. Fails if there is more than one such entry.
pub fn read_rpath<R: Read + Seek>(
    reader: &mut R,
) -> Result<Option<(Vec<u8>, ElfDescriptor)>, Error> {
    let elf = ElfFile::parse(reader, ParseOptions::new().dynamic(true))?;
    let Some(entry) = elf.rpath() else {
        return Ok(None);
    };
    let descriptor = ElfDescriptor {
        class: elf.class(),
        byte_order: elf.byte_order(),
        rpath_offset: entry.string_offset,
        dynamic_entry_offset: entry.entry_offset,
        is_runpath: entry.kind == RpathKind::Runpath,
    };
    Ok(Some((entry.value.clone(), descriptor)))
}

/// Get the search path entries of the file.
///
/// Returns an empty list if the file has no search path, and `None` if the file
/// is not an ELF file or can't be parsed.
pub fn get_rpaths<P: AsRef<Path>>(path: P) -> Option<Vec<String>> {
    let path = path.as_ref();
    let result = fs::File::open(path)
        .map_err(Error::from)
        .and_then(|mut file| read_rpath(&mut file));
    match result {
        Ok(Some((rpath, _))) => match String::from_utf8(rpath) {
            Ok(rpath) => Some(rpath.split(RPATH_SEPARATOR as char).map(Into::into).collect()),
            Err(e) => {
                log::debug!("Non-UTF-8 rpath in {path:?}: {e}");
                None
            }
        },
        Ok(None) => Some(Vec::new()),
        Err(e) => {
            log::debug!("Failed to read rpath from {path:?}: {e}");
            None
        }
    }
}

/// Overwrite the search path string with `rpath`.
///
/// The new string is written with a single NUL terminator; the bytes past the terminator are
/// left as is. If `force` is specified, the tag of the dynamic entry is changed accordingly.
///
/// Returns `false` if the file has no search path or the new string is longer than the old one.
pub fn write_rpath<F: Read + Write + Seek>(
    file: &mut F,
    rpath: &[u8],
    force: Option<RpathKind>,
) -> Result<bool, Error> {
    let Some((old, descriptor)) = read_rpath(file)? else {
        log::debug!("No rpath to overwrite");
        return Ok(false);
    };
    if old.len() < rpath.len() {
        log::debug!(
            "New rpath {:?} is longer than the old one {:?}",
            rpath.escape_ascii().to_string(),
            old.escape_ascii().to_string()
        );
        return Ok(false);
    }
    let mut bytes = Vec::with_capacity(rpath.len() + 1);
    bytes.extend_from_slice(rpath);
    bytes.push(0);
    file.write_at(descriptor.rpath_offset, &bytes)?;
    if let Some(kind) = force {
        descriptor.write_tag(file, kind)?;
    }
    Ok(true)
}

/// Replace the search path of the file with `rpaths` joined by `:`.
///
/// Any error is logged and reported as `false`: this function is meant to be called
/// on every installed file regardless of its type.
pub fn replace_rpaths<P: AsRef<Path>, S: AsRef<str>>(
    path: P,
    rpaths: &[S],
    force: Option<RpathKind>,
) -> bool {
    let path = path.as_ref();
    let rpath = join_rpaths(rpaths.iter().map(|s| s.as_ref().as_bytes()));
    let result = fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(Error::from)
        .and_then(|mut file| write_rpath(&mut file, &rpath, force));
    match result {
        Ok(changed) => changed,
        Err(e) => {
            log::debug!("Failed to replace rpath in {path:?}: {e}");
            false
        }
    }
}

/// Rewrite each search path entry that starts with one of the old prefixes.
///
/// Empty entries are dropped, the rest of the old string is zeroed out.
/// If `force` is specified, the tag of the dynamic entry is changed accordingly.
///
/// Returns `false` if the file is not an ELF file, or has no search path, or nothing changed.
pub fn substitute_rpaths<F: Read + Write + Seek>(
    file: &mut F,
    prefixes: &PrefixMap,
    force: Option<RpathKind>,
) -> Result<bool, Error> {
    rewrite_rpaths(file, force, |rpaths| {
        rpaths
            .iter()
            .map(|rpath| match prefixes.find_prefix_of(rpath) {
                Some((old_prefix, new_prefix)) => {
                    let mut new = new_prefix.to_vec();
                    new.extend_from_slice(&rpath[old_prefix.len()..]);
                    new
                }
                None => rpath.to_vec(),
            })
            .collect()
    })
}

/// Replace non-empty search path entries with the ones returned by `transform`.
///
/// The new string must fit into the old one; the remaining bytes are zeroed out.
pub(crate) fn rewrite_rpaths<F, T>(
    file: &mut F,
    force: Option<RpathKind>,
    transform: T,
) -> Result<bool, Error>
where
    F: Read + Write + Seek,
    T: FnOnce(&[&[u8]]) -> Vec<Vec<u8>>,
{
    let (old, descriptor) = match read_rpath(file) {
        Ok(Some(x)) => x,
        Ok(None) => return Ok(false),
        Err(e) if e.is_elf_parsing() => {
            log::debug!("Skipping rpath rewrite: {e}");
            return Ok(false);
        }
        Err(e) => return Err(e),
    };
    let rpaths = old
        .split(|b| *b == RPATH_SEPARATOR)
        .filter(|rpath| !rpath.is_empty())
        .collect::<Vec<_>>();
    let new_rpaths = transform(&rpaths);
    let changed = rpaths.len() != new_rpaths.len()
        || rpaths.iter().zip(new_rpaths.iter()).any(|(a, b)| *a != b.as_slice());
    let retag = force.filter(|kind| *kind != descriptor.kind());
    if !changed && retag.is_none() {
        return Ok(false);
    }
    if changed {
        let mut new = join_rpaths(new_rpaths.iter().map(Vec::as_slice));
        if new.len() > old.len() {
            return Err(Error::RpathTooLong { old, new });
        }
        log::trace!(
            "Replacing rpath {:?} with {:?}",
            old.escape_ascii().to_string(),
            new.escape_ascii().to_string()
        );
        // Zero out the rest of the old string. If the lengths are equal,
        // the original terminator is used.
        new.resize(old.len(), 0);
        file.write_at(descriptor.rpath_offset, &new)?;
    }
    if let Some(kind) = retag {
        descriptor.write_tag(file, kind)?;
    }
    Ok(true)
}

fn join_rpaths<'a>(rpaths: impl Iterator<Item = &'a [u8]>) -> Vec<u8> {
    let mut joined = Vec::new();
    for (i, rpath) in rpaths.enumerate() {
        if i != 0 {
            joined.push(RPATH_SEPARATOR);
        }
        joined.extend_from_slice(rpath);
    }
    joined
}
