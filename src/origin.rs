//! `$ORIGIN`-relative library search paths.
//!
//! The dynamic linker expands `$ORIGIN` to the directory of the object being loaded.
//! Search path entries under a layout root can be rewritten relative to that directory
//! and back, so that a tree of installed files keeps working after it is moved.

use std::ffi::OsStr;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::ffi::OsStringExt;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use path_clean::PathClean;

use crate::rpath::rewrite_rpaths;
use crate::Error;
use crate::PrefixMap;
use crate::RpathKind;

/// The token that the dynamic linker replaces with the directory of the object.
pub const ORIGIN: &[u8] = b"$ORIGIN";

const ORIGIN_BRACED: &[u8] = b"${ORIGIN}";

/// The roots of the directory layout before and after relocation.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Layout {
    /// Where the files were installed.
    pub old_root: PathBuf,
    /// Where the files are now.
    pub new_root: PathBuf,
}

impl Layout {
    /// Create new layout.
    pub fn new(old_root: impl Into<PathBuf>, new_root: impl Into<PathBuf>) -> Self {
        Self {
            old_root: old_root.into(),
            new_root: new_root.into(),
        }
    }
}

/// Compute `path` relative to `start` without touching the file system.
///
/// Both paths are normalized lexically first.
pub fn relative_path(path: &Path, start: &Path) -> PathBuf {
    let path = path.clean();
    let start = start.clean();
    let mut path_components = path.components().peekable();
    let mut start_components = start.components().peekable();
    while let (Some(a), Some(b)) = (path_components.peek(), start_components.peek()) {
        if a != b {
            break;
        }
        path_components.next();
        start_components.next();
    }
    let mut relative = PathBuf::new();
    for component in start_components {
        if matches!(component, Component::Normal(..)) {
            relative.push("..");
        }
    }
    relative.extend(path_components);
    relative
}

/// Rewrite the entries under `root` relative to the directory of `file` and prefix them
/// with `$ORIGIN`. Other entries are kept as is.
pub fn make_relative<B: AsRef<[u8]>>(file: &Path, root: &Path, rpaths: &[B]) -> Vec<Vec<u8>> {
    let directory = parent_dir(file);
    rpaths
        .iter()
        .map(|rpath| {
            let rpath = rpath.as_ref();
            let path = Path::new(OsStr::from_bytes(rpath));
            if !path.starts_with(root) {
                return rpath.to_vec();
            }
            let relative = relative_path(path, directory);
            let mut new = ORIGIN.to_vec();
            if !relative.as_os_str().is_empty() {
                new.push(b'/');
                new.extend_from_slice(relative.as_os_str().as_bytes());
            }
            new
        })
        .collect()
}

/// Expand `$ORIGIN` (or `${ORIGIN}`) at the start of the entries to the directory of `file`
/// and normalize the result. Other entries are kept as is.
pub fn normalize_relative<B: AsRef<[u8]>>(file: &Path, rpaths: &[B]) -> Vec<Vec<u8>> {
    let directory = parent_dir(file).as_os_str().as_bytes();
    rpaths
        .iter()
        .map(|rpath| {
            let rpath = rpath.as_ref();
            let Some(rest) = strip_origin(rpath) else {
                return rpath.to_vec();
            };
            let mut path = directory.to_vec();
            path.extend_from_slice(rest);
            Path::new(OsStr::from_bytes(&path))
                .clean()
                .into_os_string()
                .into_vec()
        })
        .collect()
}

/// Map the entries under `old_root` to their new prefixes.
///
/// Entries outside of `old_root` are kept as is, entries under `old_root` that none of
/// the prefixes match are dropped. Duplicates are removed.
pub fn transform_rpaths<B: AsRef<[u8]>>(
    rpaths: &[B],
    old_root: &Path,
    prefixes: &PrefixMap,
) -> Vec<Vec<u8>> {
    let mut new_rpaths: Vec<Vec<u8>> = Vec::with_capacity(rpaths.len());
    for rpath in rpaths {
        let rpath = rpath.as_ref();
        if !Path::new(OsStr::from_bytes(rpath)).starts_with(old_root) {
            new_rpaths.push(rpath.to_vec());
            continue;
        }
        let Some((old, new)) = prefixes.find_prefix_of(rpath) else {
            log::debug!(
                "Dropping {:?}: no prefix matches",
                rpath.escape_ascii().to_string()
            );
            continue;
        };
        let mut new_rpath = new.to_vec();
        new_rpath.extend_from_slice(&rpath[old.len()..]);
        if !new_rpaths.contains(&new_rpath) {
            new_rpaths.push(new_rpath);
        }
    }
    new_rpaths
}

/// Make the search path entries under `root` relative to the directory of `original`,
/// i.e. the path the file had when its search path was computed.
///
/// Returns `false` if the file is not an ELF file, or has no search path, or nothing changed.
pub fn make_rpaths_relative<F: Read + Write + Seek>(
    file: &mut F,
    original: &Path,
    root: &Path,
    force: Option<RpathKind>,
) -> Result<bool, Error> {
    rewrite_rpaths(file, force, |rpaths| make_relative(original, root, rpaths))
}

/// Relocate `$ORIGIN`-relative search path of the file that was moved
/// from `old_path` to `new_path`.
///
/// The entries are expanded relative to `old_path`, mapped to the new prefixes,
/// then made relative to `new_path` again.
pub fn relocate_relative_rpaths<F: Read + Write + Seek>(
    file: &mut F,
    old_path: &Path,
    new_path: &Path,
    layout: &Layout,
    prefixes: &PrefixMap,
    force: Option<RpathKind>,
) -> Result<bool, Error> {
    rewrite_rpaths(file, force, |rpaths| {
        let absolute = normalize_relative(old_path, rpaths);
        let relocated = transform_rpaths(&absolute, &layout.old_root, prefixes);
        make_relative(new_path, &layout.new_root, &relocated)
    })
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new(""))
}

fn strip_origin(rpath: &[u8]) -> Option<&[u8]> {
    rpath
        .strip_prefix(ORIGIN_BRACED)
        .or_else(|| rpath.strip_prefix(ORIGIN))
        .filter(|rest| rest.is_empty() || rest.starts_with(b"/"))
}
