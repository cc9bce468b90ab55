use std::io::Read;
use std::io::Seek;
use std::io::Write;

use crate::multi_path_regex;
use crate::ElfSeek;
use crate::Error;
use crate::PathRegex;
use crate::PrefixMap;
use crate::PrefixReplacer;
use crate::Truncate;

/// Replaces prefixes in text files.
///
/// Replacements may have any length, and the file is rewritten as a whole.
#[derive(Clone, Debug)]
pub struct TextFilePrefixReplacer {
    prefix_map: PrefixMap,
    regex: PathRegex,
}

impl TextFilePrefixReplacer {
    /// Create new replacer.
    pub fn new(prefix_map: PrefixMap) -> Result<Self, Error> {
        let regex = multi_path_regex(prefix_map.keys())?;
        Ok(Self { prefix_map, regex })
    }

    /// Create new replacer from string or byte string pairs.
    pub fn from_strings_or_bytes<I, K, V>(pairs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        Self::new(PrefixMap::from_strings_or_bytes(pairs))
    }

    /// Replace prefixes in `data`.
    ///
    /// Returns `None` if nothing matched.
    pub fn replace_bytes(&self, data: &[u8]) -> Option<Vec<u8>> {
        let mut output = Vec::new();
        let mut last = 0;
        let mut changed = false;
        for m in self.regex.find_iter(data) {
            let old = &data[m.prefix.clone()];
            let Some(new) = self.prefix_map.get(old) else {
                continue;
            };
            log::trace!(
                "Replacing {:?} with {:?} at offset {}",
                old.escape_ascii().to_string(),
                new.escape_ascii().to_string(),
                m.prefix.start
            );
            output.extend_from_slice(&data[last..m.prefix.start]);
            output.extend_from_slice(new);
            last = m.prefix.end;
            changed = true;
        }
        if !changed {
            return None;
        }
        output.extend_from_slice(&data[last..]);
        Some(output)
    }
}

impl PrefixReplacer for TextFilePrefixReplacer {
    fn prefix_map(&self) -> &PrefixMap {
        &self.prefix_map
    }

    fn replace<F: Read + Write + Seek + Truncate>(&self, file: &mut F) -> Result<bool, Error> {
        file.seek_to(0)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        let Some(output) = self.replace_bytes(&data) else {
            return Ok(false);
        };
        file.seek_to(0)?;
        file.write_all(&output)?;
        file.truncate(output.len() as u64)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use arbtest::arbtest;
    use tempfile::TempDir;

    fn replace_and_expect(pairs: &[(&str, &str)], before: &str, after: &str) {
        let replacer =
            TextFilePrefixReplacer::from_strings_or_bytes(pairs.iter().copied()).unwrap();
        let mut cursor = Cursor::new(before.as_bytes().to_vec());
        let changed = replacer.apply_to_file(&mut cursor).unwrap();
        assert_eq!(before != after, changed);
        assert_eq!(after.as_bytes(), cursor.get_ref().as_slice());
    }

    #[test]
    fn in_place_replacement() {
        replace_and_expect(
            &[
                ("/first/prefix", "/first-replacement/prefix"),
                ("/second/prefix", "/second-replacement/prefix"),
            ],
            "Example: /first/prefix/subdir and /second/prefix/subdir",
            "Example: /first-replacement/prefix/subdir and /second-replacement/prefix/subdir",
        );
        replace_and_expect(
            &[("/my/prefix", "/replacement")],
            "/dont/replace/my/prefix #!/dont/replace/my/prefix",
            "/dont/replace/my/prefix #!/dont/replace/my/prefix",
        );
        replace_and_expect(
            &[("/my/prefix", "/replacement")],
            "Install path: /my/prefix.",
            "Install path: /replacement.",
        );
        replace_and_expect(&[("/my/prefix", "/replacement")], "#!/my/prefix", "#!/replacement");
    }

    #[test]
    fn order_matters() {
        replace_and_expect(
            &[
                ("/replace/in/order", "/first"),
                ("/replace/in", "/second"),
                ("/replace", "/third"),
            ],
            "/replace/in/order/x /replace/in/y /replace/z",
            "/first/x /second/y /third/z",
        );
        replace_and_expect(
            &[
                ("/replace", "/third"),
                ("/replace/in", "/second"),
                ("/replace/in/order", "/first"),
            ],
            "/replace/in/order/x /replace/in/y /replace/z",
            "/third/in/order/x /third/in/y /third/z",
        );
    }

    #[test]
    fn file_is_truncated() {
        replace_and_expect(
            &[("/a/very/long/prefix", "/p")],
            "PATH=/a/very/long/prefix/bin\n",
            "PATH=/p/bin\n",
        );
    }

    #[test]
    fn identity_mappings_are_noop() {
        let replacer = TextFilePrefixReplacer::from_strings_or_bytes([
            ("/hello", "/hello"),
            ("/world", "/world"),
        ])
        .unwrap();
        assert!(replacer.is_noop());
        assert!(replacer.prefix_map().is_empty());
        // The file is never opened.
        let workdir = TempDir::new().unwrap();
        let missing = workdir.path().join("missing");
        assert!(!replacer.apply_to_filename(&missing).unwrap());
        assert!(replacer.apply([&missing]).unwrap().is_empty());
    }

    #[test]
    fn apply_reports_changed_files() {
        let workdir = TempDir::new().unwrap();
        let script = workdir.path().join("script.sh");
        let readme = workdir.path().join("README");
        fs_err::write(&script, "#!/old/prefix/bin/python3\n").unwrap();
        fs_err::write(&readme, "nothing to see here\n").unwrap();
        let replacer =
            TextFilePrefixReplacer::from_strings_or_bytes([("/old/prefix", "/new")]).unwrap();
        let changed = replacer.apply([&script, &readme]).unwrap();
        assert_eq!(vec![script.clone()], changed);
        assert_eq!("#!/new/bin/python3\n", fs_err::read_to_string(&script).unwrap());
        let missing = workdir.path().join("missing");
        let error = replacer.apply_to_filename(&missing).unwrap_err();
        assert!(matches!(error, Error::File { ref path, .. } if *path == missing));
    }

    #[test]
    fn relocation_is_idempotent() {
        arbtest(|u| {
            let words = ["/old/store/pkg", "/old/store", " ", "/", "lib", "-", ":", "\n", "x_"];
            let mut before = String::new();
            for _ in 0..u.int_in_range(0..=20)? {
                before.push_str(u.choose(&words)?);
            }
            let replacer = TextFilePrefixReplacer::from_strings_or_bytes([
                ("/old/store/pkg", "/new/pkg"),
                ("/old/store", "/new/store"),
            ])
            .unwrap();
            let mut cursor = Cursor::new(before.into_bytes());
            replacer.apply_to_file(&mut cursor).unwrap();
            let once = cursor.get_ref().clone();
            assert!(!replacer.apply_to_file(&mut cursor).unwrap());
            assert_eq!(&once, cursor.get_ref());
            Ok(())
        });
    }
}
