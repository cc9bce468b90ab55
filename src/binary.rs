use std::io::Read;
use std::io::Seek;
use std::io::Write;

use regex::bytes::Captures;
use regex::bytes::Regex;

use crate::binary_cstring_regex;
use crate::constants::*;
use crate::ElfSeek;
use crate::ElfWrite;
use crate::Error;
use crate::PrefixMap;
use crate::PrefixReplacer;
use crate::Truncate;

/// Replaces prefixes in binary files without changing their size.
///
/// New prefixes have to be no longer than the old ones.
/// Compilers and linkers merge read-only C-strings that share a common suffix, i.e. a
/// string might be referenced from the middle. To not break such strings the replacer looks
/// for the NUL terminator in a window of `suffix_safety_size + 1` bytes after each prefix:
///
/// - If there is no terminator, the replacement is left-padded with `/`.
/// - If there is a terminator, and the last `suffix_safety_size` bytes of the string don't
///   change, the replacement is left-padded with `/` as well.
/// - Otherwise, the new string is shifted to the left and terminated early, provided that it
///   leaves more than `suffix_safety_size` bytes of the old string intact.
///
/// In any other case the replacement fails.
#[derive(Clone, Debug)]
pub struct BinaryFilePrefixReplacer {
    prefix_map: PrefixMap,
    suffix_safety_size: usize,
    regex: Regex,
}

impl BinaryFilePrefixReplacer {
    /// Create new replacer with the specified C-string suffix size.
    pub fn new(prefix_map: PrefixMap, suffix_safety_size: usize) -> Result<Self, Error> {
        let regex = binary_cstring_regex(prefix_map.keys(), suffix_safety_size)?;
        Ok(Self {
            prefix_map,
            suffix_safety_size,
            regex,
        })
    }

    /// Create new replacer from string or byte string pairs with the default C-string suffix
    /// size.
    pub fn from_strings_or_bytes<I, K, V>(pairs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        Self::new(
            PrefixMap::from_strings_or_bytes(pairs),
            DEFAULT_SUFFIX_SAFETY_SIZE,
        )
    }

    /// The number of trailing C-string bytes that are never moved.
    pub fn suffix_safety_size(&self) -> usize {
        self.suffix_safety_size
    }

    /// Compute all replacements in `data`.
    ///
    /// Returns `(offset, bytes)` pairs. Each replacement has the same length as the bytes
    /// it replaces, so the pairs can be applied in any order.
    pub fn replacements(&self, data: &[u8]) -> Result<Vec<(usize, Vec<u8>)>, Error> {
        let mut replacements = Vec::new();
        for captures in self.regex.captures_iter(data) {
            if let Some(replacement) = self.replacement(&captures)? {
                replacements.push(replacement);
            }
        }
        Ok(replacements)
    }

    fn replacement(&self, captures: &Captures) -> Result<Option<(usize, Vec<u8>)>, Error> {
        let (Some(whole), Some(old)) = (captures.get(0), captures.get(1)) else {
            return Ok(None);
        };
        let old = old.as_bytes();
        let Some(new) = self.prefix_map.get(old) else {
            return Ok(None);
        };
        if new.len() > old.len() {
            return Err(Error::CannotGrowString {
                old: old.to_vec(),
                new: new.to_vec(),
            });
        }
        let bytes_shorter = old.len() - new.len();
        let suffix_safety_size = self.suffix_safety_size;
        // The C-string tail including the NUL byte.
        let tail = captures.get(2).map(|m| m.as_bytes());
        let pad = match tail {
            None => true,
            Some(tail) => {
                let suffix_len = tail.len() - 1;
                suffix_len >= suffix_safety_size || {
                    let n = suffix_safety_size - suffix_len;
                    last_bytes(old, n) == last_bytes(new, n)
                }
            }
        };
        let (replacement, expected_len) = if pad {
            let mut replacement = vec![PATH_SEPARATOR; bytes_shorter];
            replacement.extend_from_slice(new);
            (replacement, old.len())
        } else if bytes_shorter > suffix_safety_size {
            // Terminate the new string early and leave the rest of the old string in place.
            let whole = whole.as_bytes();
            let mut replacement = new.to_vec();
            replacement.extend_from_slice(tail.unwrap_or_default());
            let rest = whole.get(replacement.len()..).unwrap_or_default();
            replacement.extend_from_slice(rest);
            (replacement, whole.len())
        } else {
            let whole = whole.as_bytes();
            return Err(Error::CannotShrinkCString {
                old: old.to_vec(),
                new: new.to_vec(),
                c_string: whole[..whole.len() - 1].to_vec(),
            });
        };
        if replacement.len() != expected_len {
            return Err(Error::ReplacementLength {
                expected: expected_len,
                actual: replacement.len(),
            });
        }
        log::trace!(
            "Replacing {:?} with {:?} at offset {}",
            old.escape_ascii().to_string(),
            replacement.escape_ascii().to_string(),
            whole.start()
        );
        Ok(Some((whole.start(), replacement)))
    }
}

impl PrefixReplacer for BinaryFilePrefixReplacer {
    fn prefix_map(&self) -> &PrefixMap {
        &self.prefix_map
    }

    fn replace<F: Read + Write + Seek + Truncate>(&self, file: &mut F) -> Result<bool, Error> {
        file.seek_to(0)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        // All replacements are computed upfront, so that an error leaves the file intact.
        let replacements = self.replacements(&data)?;
        if replacements.is_empty() {
            return Ok(false);
        }
        for (offset, replacement) in replacements.iter() {
            file.write_at(*offset as u64, replacement)?;
        }
        let old_len = data.len() as u64;
        let new_len = file.file_len()?;
        if old_len != new_len {
            return Err(Error::FileSizeChanged { old_len, new_len });
        }
        Ok(true)
    }
}

fn last_bytes(s: &[u8], n: usize) -> &[u8] {
    &s[s.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use arbtest::arbtest;

    fn replace(
        pairs: &[(&str, &str)],
        before: &[u8],
        suffix_safety_size: usize,
    ) -> Result<Vec<u8>, Error> {
        let replacer = BinaryFilePrefixReplacer::new(
            PrefixMap::from_strings_or_bytes(pairs.iter().copied()),
            suffix_safety_size,
        )
        .unwrap();
        let mut cursor = Cursor::new(before.to_vec());
        replacer.apply_to_file(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    fn replace_and_expect(pairs: &[(&str, &str)], before: &[u8], after: &[u8]) {
        replace_and_expect_with(pairs, before, after, DEFAULT_SUFFIX_SAFETY_SIZE);
    }

    fn replace_and_expect_with(
        pairs: &[(&str, &str)],
        before: &[u8],
        after: &[u8],
        suffix_safety_size: usize,
    ) {
        let actual = replace(pairs, before, suffix_safety_size).unwrap();
        assert_eq!(
            after.escape_ascii().to_string(),
            actual.escape_ascii().to_string()
        );
    }

    fn expect_shrink_error(
        pairs: &[(&str, &str)],
        before: &[u8],
        expected_c_string: &[u8],
    ) {
        match replace(pairs, before, DEFAULT_SUFFIX_SAFETY_SIZE) {
            Err(Error::CannotShrinkCString { old, new, c_string }) => {
                assert_eq!(pairs[0].0.as_bytes(), old.as_slice());
                assert_eq!(pairs[0].1.as_bytes(), new.as_slice());
                assert_eq!(expected_c_string, c_string.as_slice());
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn common_suffix_is_padded() {
        let pairs: &[(&str, &str)] = &[
            ("/old-spack/opt/specific-package", "/first/specific-package"),
            ("/old-spack/opt", "/sec/spack/opt"),
        ];
        replace_and_expect(
            pairs,
            b"Binary with /old-spack/opt/specific-package and /old-spack/opt",
            b"Binary with /////////first/specific-package and /sec/spack/opt",
        );
        replace_and_expect(
            pairs,
            b"Binary with /old-spack/opt/specific-package\0 and /old-spack/opt\0",
            b"Binary with /////////first/specific-package\0 and /sec/spack/opt\0",
        );
    }

    #[test]
    fn order_matters() {
        let pairs: &[(&str, &str)] = &[
            ("/old-spack/opt", "/s/spack/opt"),
            ("/old-spack/opt/specific-package", "/first/specific-package"),
        ];
        replace_and_expect(
            pairs,
            b"Binary with /old-spack/opt/specific-package and /old-spack/opt",
            b"Binary with ///s/spack/opt/specific-package and ///s/spack/opt",
        );
        replace_and_expect(
            pairs,
            b"Binary with /old-spack/opt/specific-package\0 and /old-spack/opt\0",
            b"Binary with ///s/spack/opt/specific-package\0 and ///s/spack/opt\0",
        );
    }

    #[test]
    fn terminated_within_window() {
        let before = b"Binary with /old-spack/opt/specific-package/sub\0 data";
        // Common suffix is long enough.
        replace_and_expect(
            &[("/old-spack/opt/specific-package", "/opt/specific-XXXXage")],
            before,
            b"Binary with ///////////opt/specific-XXXXage/sub\0 data",
        );
        // Common suffix is too short, but shortening spares more than 7 bytes.
        replace_and_expect(
            &[("/old-spack/opt/specific-package", "/opt/specific-XXXXXge")],
            before,
            b"Binary with /opt/specific-XXXXXge/sub\0ckage/sub\0 data",
        );
        // Shortening leaves exactly 7 bytes.
        replace_and_expect(
            &[("/old-spack/opt/specific-package", "/spack/specific-XXXXXge")],
            before,
            b"Binary with /spack/specific-XXXXXge/sub\0age/sub\0 data",
        );
        // Shortening leaves too few bytes.
        expect_shrink_error(
            &[("/old-spack/opt/specific-package", "/snacks/specific-XXXXXge")],
            before,
            b"/old-spack/opt/specific-package/sub",
        );
        // Unless the safety size is smaller.
        replace_and_expect_with(
            &[("/old-spack/opt/specific-package", "/snacks/specific-XXXXXXe")],
            before,
            b"Binary with /snacks/specific-XXXXXXe/sub\0ge/sub\0 data",
            6,
        );
    }

    #[test]
    fn same_length() {
        replace_and_expect(
            &[("pkg-gwixwaalgczp6", "pkg-zkesfralgczp6")],
            b"Binary with pkg-gwixwaalgczp6/config\0 data",
            b"Binary with pkg-zkesfralgczp6/config\0 data",
        );
        expect_shrink_error(
            &[("pkg-gwixwaxlgczp6", "pkg-zkesfrzlgczp6")],
            b"Binary with pkg-gwixwaxlgczp6\0 data",
            b"pkg-gwixwaxlgczp6",
        );
    }

    #[test]
    fn first_nul_byte_is_used() {
        // `def\0/xx` is 7 bytes, but the string ends at the first NUL byte.
        expect_shrink_error(
            &[("pkg-abcdef", "pkg-xyzabc")],
            b"Binary with pkg-abcdef\0/xx\0",
            b"pkg-abcdef",
        );
    }

    #[test]
    fn errors_leave_file_intact() {
        let before = b"/old/prefix\0 and /old/prefix/lib";
        let mut cursor = Cursor::new(before.to_vec());
        let replacer =
            BinaryFilePrefixReplacer::from_strings_or_bytes([("/old/prefix", "/new/prefiy")])
                .unwrap();
        assert!(matches!(
            replacer.apply_to_file(&mut cursor),
            Err(Error::CannotShrinkCString { .. })
        ));
        assert_eq!(&before[..], cursor.get_ref().as_slice());
        let replacer =
            BinaryFilePrefixReplacer::from_strings_or_bytes([("/old", "/longer")]).unwrap();
        let error = replacer.apply_to_file(&mut cursor).unwrap_err();
        assert!(error.is_binary_text_replace());
        assert!(matches!(error, Error::CannotGrowString { .. }));
        assert_eq!(&before[..], cursor.get_ref().as_slice());
    }

    #[test]
    fn no_match_is_not_a_change() {
        let replacer = BinaryFilePrefixReplacer::from_strings_or_bytes([("/a", "/b")]).unwrap();
        let mut cursor = Cursor::new(b"\x7fELF\0\0\0".to_vec());
        assert!(!replacer.apply_to_file(&mut cursor).unwrap());
        assert_eq!(DEFAULT_SUFFIX_SAFETY_SIZE, replacer.suffix_safety_size());
    }

    #[test]
    fn length_is_invariant() {
        arbtest(|u| {
            let old = "/old/store/padding";
            let new_len = u.int_in_range(1..=old.len())?;
            let new: String = (0..new_len)
                .map(|_| u.choose(&['/', 'n', 'e', 'w', 'x', '\0']).copied())
                .collect::<Result<_, _>>()?;
            let suffix_safety_size = u.int_in_range(0..=10)?;
            let chunks: [&[u8]; 5] = [old.as_bytes(), b"\0", b"/lib", b"xyz", b"/"];
            let mut before = Vec::new();
            for _ in 0..u.int_in_range(0..=20)? {
                before.extend_from_slice(u.choose(&chunks)?);
            }
            let result = replace(&[(old, new.as_str())], &before, suffix_safety_size);
            match result {
                Ok(after) => assert_eq!(before.len(), after.len()),
                Err(e) => assert!(
                    matches!(e, Error::CannotShrinkCString { .. }),
                    "{e:?}"
                ),
            }
            Ok(())
        });
    }

    #[test]
    fn growth_is_rejected() {
        arbtest(|u| {
            let old = "/old";
            let extra = u.int_in_range(1..=10)?;
            let new = format!("/new{}", "x".repeat(extra));
            let mut before: Vec<u8> = u.arbitrary()?;
            let at = u.int_in_range(0..=before.len())?;
            let rest = before.split_off(at);
            before.extend_from_slice(old.as_bytes());
            before.extend_from_slice(&rest);
            let result = replace(&[(old, new.as_str())], &before, DEFAULT_SUFFIX_SAFETY_SIZE);
            assert!(
                matches!(result, Err(Error::CannotGrowString { .. })),
                "{result:?}"
            );
            Ok(())
        });
    }
}
