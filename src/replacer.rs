use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::fs;
use crate::Error;
use crate::PrefixMap;
use crate::Truncate;

/// Common interface of text and binary replacers.
pub trait PrefixReplacer {
    /// The mapping this replacer applies.
    fn prefix_map(&self) -> &PrefixMap;

    /// Replace prefixes in the file that is known to need it.
    ///
    /// Use [`apply_to_file`](PrefixReplacer::apply_to_file) instead.
    fn replace<F: Read + Write + Seek + Truncate>(&self, file: &mut F) -> Result<bool, Error>;

    /// Nothing to replace.
    fn is_noop(&self) -> bool {
        self.prefix_map().is_empty()
    }

    /// Replace prefixes in the file.
    ///
    /// Returns `true` if the file was modified.
    fn apply_to_file<F: Read + Write + Seek + Truncate>(&self, file: &mut F) -> Result<bool, Error> {
        if self.is_noop() {
            return Ok(false);
        }
        self.replace(file)
    }

    /// Replace prefixes in the file at `path`.
    ///
    /// The file is not opened if there is nothing to replace.
    fn apply_to_filename<P: AsRef<Path>>(&self, path: P) -> Result<bool, Error> {
        if self.is_noop() {
            return Ok(false);
        }
        let path = path.as_ref();
        let mut file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| Error::from(e).in_file(path))?;
        let changed = self
            .apply_to_file(&mut file)
            .map_err(|e| e.in_file(path))?;
        if changed {
            log::debug!("Replaced prefixes in {path:?}");
        }
        Ok(changed)
    }

    /// Replace prefixes in each file.
    ///
    /// Returns the files that were modified. Stops at the first error.
    fn apply<I, P>(&self, paths: I) -> Result<Vec<PathBuf>, Error>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut changed = Vec::new();
        if self.is_noop() {
            return Ok(changed);
        }
        for path in paths {
            let path = path.as_ref();
            if self.apply_to_filename(path)? {
                changed.push(path.to_path_buf());
            }
        }
        Ok(changed)
    }
}
