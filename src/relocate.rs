use std::ffi::OsStr;
use std::ffi::OsString;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::ffi::OsStringExt;
use std::path::Path;
use std::path::PathBuf;

use bitflags::bitflags;
use rayon::prelude::*;

use crate::constants::*;
use crate::fs;
use crate::origin::parent_dir;
use crate::relative_path;
use crate::relocate_relative_rpaths;
use crate::substitute_rpaths;
use crate::BinaryFilePrefixReplacer;
use crate::ElfSeek;
use crate::Error;
use crate::Layout;
use crate::PrefixMap;
use crate::PrefixReplacer;
use crate::RpathKind;
use crate::TextFilePrefixReplacer;

/// How the contents of a file are relocated.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ContentKind {
    /// ELF executable, shared object or any other ELF file.
    Elf,
    /// Mach-O file or universal binary.
    MachO,
    /// Any other file that contains NUL bytes or invalid UTF-8.
    Binary,
    /// UTF-8 text.
    Text,
}

const MACHO_MAGICS: [u32; 5] = [0xfeedface, 0xfeedfacf, 0xcefaedfe, 0xcffaedfe, 0xcafebabe];

/// Guess the file contents from its first bytes.
pub fn detect_file_kind<R: Read + Seek>(reader: &mut R) -> Result<ContentKind, Error> {
    reader.seek_to(0)?;
    let mut data = Vec::with_capacity(SNIFF_LEN);
    reader.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut data)?;
    reader.seek_to(0)?;
    if data.starts_with(&MAGIC) {
        return Ok(ContentKind::Elf);
    }
    if let Some(magic) = data.first_chunk::<4>() {
        if MACHO_MAGICS.contains(&u32::from_be_bytes(*magic)) {
            return Ok(ContentKind::MachO);
        }
    }
    if data.contains(&0) {
        return Ok(ContentKind::Binary);
    }
    match std::str::from_utf8(&data) {
        Ok(..) => Ok(ContentKind::Text),
        // The buffer might end in the middle of a character.
        Err(e) if e.error_len().is_none() => Ok(ContentKind::Text),
        Err(..) => Ok(ContentKind::Binary),
    }
}

bitflags! {
    /// What was changed in a file.
    #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
    pub struct Changes: u8 {
        /// Prefixes were replaced as text.
        const TEXT = 1 << 0;
        /// Prefixes were replaced in binary strings.
        const BINARY = 1 << 1;
        /// `RPATH` or `RUNPATH` was rewritten.
        const RPATH = 1 << 2;
    }
}

/// The result of relocating one file.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Relocation {
    /// The file.
    pub path: PathBuf,
    /// Detected contents, `None` if the file wasn't read.
    pub kind: Option<ContentKind>,
    /// What was changed.
    pub changes: Changes,
}

/// Relocator options.
#[derive(Clone, Debug)]
pub struct RelocatorOptions {
    suffix_safety_size: usize,
    rpaths: bool,
    force: Option<RpathKind>,
    layout: Option<Layout>,
}

impl RelocatorOptions {
    /// Default options.
    pub fn new() -> Self {
        Self {
            suffix_safety_size: DEFAULT_SUFFIX_SAFETY_SIZE,
            rpaths: true,
            force: None,
            layout: None,
        }
    }

    /// The number of trailing C-string bytes that are never moved in binary files.
    pub fn suffix_safety_size(mut self, value: usize) -> Self {
        self.suffix_safety_size = value;
        self
    }

    /// Rewrite `RPATH`/`RUNPATH` of ELF files before replacing binary strings.
    pub fn rpaths(mut self, value: bool) -> Self {
        self.rpaths = value;
        self
    }

    /// Change the tag of the existing `RPATH`/`RUNPATH` entry.
    pub fn force(mut self, value: Option<RpathKind>) -> Self {
        self.force = value;
        self
    }

    /// Treat search paths as `$ORIGIN`-relative to the files that moved between the layouts.
    ///
    /// The original location of each file is found by mapping its path back through the
    /// new prefixes.
    pub fn relative(mut self, value: Option<Layout>) -> Self {
        self.layout = value;
        self
    }

    /// Create relocator with these options.
    pub fn new_relocator(self, prefix_map: PrefixMap) -> Result<Relocator, Error> {
        Ok(Relocator {
            text: TextFilePrefixReplacer::new(prefix_map.clone())?,
            binary: BinaryFilePrefixReplacer::new(prefix_map, self.suffix_safety_size)?,
            rpaths: self.rpaths,
            force: self.force,
            layout: self.layout,
        })
    }
}

impl Default for RelocatorOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Relocates installed files from old prefixes to new prefixes.
///
/// Text files are rewritten, binary files are patched in place, ELF files additionally get
/// their `RPATH`/`RUNPATH` rewritten. Regular expressions are compiled once and shared between
/// files.
#[derive(Clone, Debug)]
pub struct Relocator {
    text: TextFilePrefixReplacer,
    binary: BinaryFilePrefixReplacer,
    rpaths: bool,
    force: Option<RpathKind>,
    layout: Option<Layout>,
}

impl Relocator {
    /// Create relocator with default options.
    pub fn new(prefix_map: PrefixMap) -> Result<Self, Error> {
        RelocatorOptions::new().new_relocator(prefix_map)
    }

    /// Get default relocator options.
    pub fn options() -> RelocatorOptions {
        RelocatorOptions::new()
    }

    /// The mapping this relocator applies.
    pub fn prefix_map(&self) -> &PrefixMap {
        self.text.prefix_map()
    }

    /// Relocate one file.
    pub fn relocate_file<P: AsRef<Path>>(&self, path: P) -> Result<Relocation, Error> {
        let path = path.as_ref();
        self.do_relocate_file(path).map_err(|e| e.in_file(path))
    }

    /// Relocate files in parallel.
    ///
    /// Each file is processed by exactly one task; the results are in the same order
    /// as `paths`.
    pub fn relocate_files<P: AsRef<Path> + Sync>(
        &self,
        paths: &[P],
    ) -> Vec<Result<Relocation, Error>> {
        paths
            .par_iter()
            .map(|path| self.relocate_file(path))
            .collect()
    }

    /// Nothing can change, files are not even opened.
    fn is_noop(&self) -> bool {
        self.prefix_map().is_empty()
            && (!self.rpaths || (self.force.is_none() && self.layout.is_none()))
    }

    fn do_relocate_file(&self, path: &Path) -> Result<Relocation, Error> {
        if self.is_noop() {
            log::trace!("Nothing to relocate in {path:?}");
            return Ok(Relocation {
                path: path.to_path_buf(),
                kind: None,
                changes: Changes::empty(),
            });
        }
        let mut file = fs::OpenOptions::new().read(true).write(true).open(path)?;
        let kind = detect_file_kind(&mut file)?;
        let mut changes = Changes::empty();
        match kind {
            ContentKind::Elf => {
                if self.rpaths && self.relocate_rpaths(&mut file, path)? {
                    changes |= Changes::RPATH;
                }
                if self.binary.apply_to_file(&mut file)? {
                    changes |= Changes::BINARY;
                }
            }
            ContentKind::MachO | ContentKind::Binary => {
                if self.binary.apply_to_file(&mut file)? {
                    changes |= Changes::BINARY;
                }
            }
            ContentKind::Text => {
                if self.text.apply_to_file(&mut file)? {
                    changes |= Changes::TEXT;
                }
            }
        }
        log::debug!("Relocated {path:?}: {kind:?}, {changes:?}");
        Ok(Relocation {
            path: path.to_path_buf(),
            kind: Some(kind),
            changes,
        })
    }

    fn relocate_rpaths<F: Read + Write + Seek>(
        &self,
        file: &mut F,
        path: &Path,
    ) -> Result<bool, Error> {
        match self.layout.as_ref() {
            Some(layout) => {
                let old_path = self.original_path(path);
                relocate_relative_rpaths(
                    file,
                    &old_path,
                    path,
                    layout,
                    self.prefix_map(),
                    self.force,
                )
            }
            None => substitute_rpaths(file, self.prefix_map(), self.force),
        }
    }

    /// Map the path back through the first new prefix it starts with.
    fn original_path(&self, path: &Path) -> PathBuf {
        let bytes = path.as_os_str().as_bytes();
        let Some((old, new)) = self
            .prefix_map()
            .iter()
            .find(|(_, new)| !new.is_empty() && bytes.starts_with(new))
        else {
            return path.to_path_buf();
        };
        let mut original = old.to_vec();
        original.extend_from_slice(&bytes[new.len()..]);
        PathBuf::from(OsString::from_vec(original))
    }
}

/// Re-point symbolic links whose target starts with one of the old prefixes.
///
/// Links with other absolute targets can't be relocated and are reported in the log.
/// Returns the links that were changed.
pub fn relocate_links<I, P>(links: I, prefix_map: &PrefixMap) -> Result<Vec<PathBuf>, Error>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut changed = Vec::new();
    for link in links {
        let link = link.as_ref();
        if relocate_link(link, prefix_map).map_err(|e| e.in_file(link))? {
            changed.push(link.to_path_buf());
        }
    }
    Ok(changed)
}

fn relocate_link(link: &Path, prefix_map: &PrefixMap) -> Result<bool, Error> {
    let old_target = fs::read_link(link)?;
    let old_bytes = old_target.as_os_str().as_bytes();
    let Some((old, new)) = prefix_map.find_prefix_of(old_bytes) else {
        if old_target.is_absolute() {
            log::warn!("Symbolic link at {link:?} to {old_target:?} cannot be relocated");
        }
        return Ok(false);
    };
    let mut new_target = new.to_vec();
    new_target.extend_from_slice(&old_bytes[old.len()..]);
    let new_target = Path::new(OsStr::from_bytes(&new_target));
    log::trace!("Re-pointing {link:?} from {old_target:?} to {new_target:?}");
    fs::remove_file(link)?;
    std::os::unix::fs::symlink(new_target, link)?;
    Ok(true)
}

/// Make symbolic links relative to their own directories.
///
/// Each item is a pair of the link to rewrite and the link whose target is made relative;
/// the latter is the original location of the link if the tree was moved, or the same link.
/// Returns the links that were changed.
pub fn make_links_relative<I, P, Q>(links: I) -> Result<Vec<PathBuf>, Error>
where
    I: IntoIterator<Item = (P, Q)>,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let mut changed = Vec::new();
    for (link, original) in links {
        let link = link.as_ref();
        if make_link_relative(link, original.as_ref()).map_err(|e| e.in_file(link))? {
            changed.push(link.to_path_buf());
        }
    }
    Ok(changed)
}

fn make_link_relative(link: &Path, original: &Path) -> Result<bool, Error> {
    let target = fs::read_link(original)?;
    let directory = parent_dir(original);
    let mut new_target = relative_path(&directory.join(&target), directory);
    if new_target.as_os_str().is_empty() {
        new_target.push(".");
    }
    if fs::read_link(link)? == new_target {
        return Ok(false);
    }
    log::trace!("Re-pointing {link:?} from {target:?} to {new_target:?}");
    fs::remove_file(link)?;
    std::os::unix::fs::symlink(&new_target, link)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use crate::test::ElfBuilder;
    use crate::ByteOrder;
    use crate::Class;

    #[test]
    fn file_kinds() {
        let elf = ElfBuilder::new(Class::Elf64, ByteOrder::LittleEndian).build();
        let cases: [(&[u8], ContentKind); 8] = [
            (&elf, ContentKind::Elf),
            (b"\xcf\xfa\xed\xfe\x07\x00\x00\x01", ContentKind::MachO),
            (b"\xca\xfe\xba\xbe", ContentKind::MachO),
            (b"text\0with NUL", ContentKind::Binary),
            (b"latin-1 \xe9t\xe9", ContentKind::Binary),
            (b"#!/bin/sh\necho ok\n", ContentKind::Text),
            ("UTF-8: été".as_bytes(), ContentKind::Text),
            (b"", ContentKind::Text),
        ];
        for (bytes, expected) in cases {
            let mut cursor = Cursor::new(bytes.to_vec());
            assert_eq!(
                expected,
                detect_file_kind(&mut cursor).unwrap(),
                "{:?}",
                bytes.escape_ascii().to_string()
            );
        }
    }

    #[test]
    fn truncated_character_is_text() {
        let mut text = "x".repeat(SNIFF_LEN - 1).into_bytes();
        text.extend_from_slice("é".as_bytes());
        assert_eq!(
            ContentKind::Text,
            detect_file_kind(&mut Cursor::new(text)).unwrap()
        );
    }
}
