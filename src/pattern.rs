//! Byte-oriented regular expressions that match prefixes.
//!
//! All patterns are compiled with Unicode mode off and operate on raw bytes.

use std::fmt::Write;
use std::ops::Range;

use regex::bytes::Regex;
use regex::bytes::RegexBuilder;

use crate::Error;

/// Bytes that are allowed around the prefix in a path-like word.
const WORD_CLASS: &str = r"[\w\-]";
const PATH_CLASS: &str = r"[\w\-/]";

/// Escape bytes so that they are matched literally.
///
/// Non-printable and non-ASCII bytes are escaped as `\xHH`.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut escaped = String::with_capacity(bytes.len());
    for b in bytes.iter().copied() {
        if b.is_ascii_graphic() || b == b' ' {
            if is_meta_character(b) {
                escaped.push('\\');
            }
            escaped.push(b as char);
        } else {
            let _ = write!(&mut escaped, "\\x{b:02X}");
        }
    }
    escaped
}

fn is_meta_character(b: u8) -> bool {
    matches!(
        b,
        b'\\'
            | b'.'
            | b'+'
            | b'*'
            | b'?'
            | b'('
            | b')'
            | b'|'
            | b'['
            | b']'
            | b'{'
            | b'}'
            | b'^'
            | b'$'
            | b'#'
            | b'&'
            | b'-'
            | b'~'
    )
}

/// The byte can be a part of a path-like word.
fn is_path_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'/')
}

fn alternation<I, P>(paths: I) -> String
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    let mut pattern = String::new();
    for (i, path) in paths.into_iter().enumerate() {
        if i != 0 {
            pattern.push('|');
        }
        pattern.push_str(&escape_bytes(path.as_ref()));
    }
    pattern
}

fn compile(pattern: &str) -> Result<Regex, Error> {
    log::trace!("Compiling {pattern:?}");
    Ok(RegexBuilder::new(pattern).unicode(false).build()?)
}

/// Match the path.
///
/// See [`multi_path_regex`].
pub fn single_path_regex<P: AsRef<[u8]>>(path: P) -> Result<PathRegex, Error> {
    multi_path_regex([path])
}

/// Match any of the paths.
///
/// The path is matched only at the beginning of a path-like word, i.e. when it is not
/// preceded by `[A-Za-z0-9_\-/]`. The match is extended to the left with `[A-Za-z0-9_\-]`
/// and to the right with `[A-Za-z0-9_\-/]`. When several paths match at the same position,
/// the first one in `paths` wins.
pub fn multi_path_regex<I, P>(paths: I) -> Result<PathRegex, Error>
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    let pattern = format!("({WORD_CLASS}*?)({}){PATH_CLASS}*", alternation(paths));
    Ok(PathRegex {
        regex: compile(&pattern)?,
    })
}

/// Match any of the paths followed by an optional C-string tail.
///
/// The tail is at most `suffix_safety_size` non-NUL bytes and a NUL byte. Group 1 is the path,
/// group 2 is the tail.
pub fn binary_cstring_regex<I, P>(paths: I, suffix_safety_size: usize) -> Result<Regex, Error>
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    let pattern = format!(
        r"({})([^\x00]{{0,{suffix_safety_size}}}\x00)?",
        alternation(paths)
    );
    compile(&pattern)
}

/// Path regex with the left word boundary.
#[derive(Clone, Debug)]
pub struct PathRegex {
    regex: Regex,
}

impl PathRegex {
    /// Find the first match.
    pub fn search(&self, haystack: &[u8]) -> Option<PathMatch> {
        self.find_at(haystack, 0)
    }

    /// Iterate over non-overlapping matches.
    pub fn find_iter<'r, 'h>(&'r self, haystack: &'h [u8]) -> PathMatches<'r, 'h> {
        PathMatches {
            regex: self,
            haystack,
            pos: 0,
        }
    }

    fn find_at(&self, haystack: &[u8], mut pos: usize) -> Option<PathMatch> {
        while pos <= haystack.len() {
            let captures = self.regex.captures_at(haystack, pos)?;
            let (Some(whole), Some(prefix)) = (captures.get(0), captures.get(2)) else {
                return None;
            };
            if whole.start() != 0 && is_path_byte(haystack[whole.start() - 1]) {
                // Any start up to the prefix itself is preceded by a path byte as well.
                pos = prefix.start() + 1;
                continue;
            }
            return Some(PathMatch {
                range: whole.range(),
                prefix: prefix.range(),
            });
        }
        None
    }
}

/// Path match.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PathMatch {
    /// The whole match.
    pub range: Range<usize>,
    /// The matched prefix.
    pub prefix: Range<usize>,
}

impl PathMatch {
    /// The bytes before the prefix.
    pub fn leading(&self) -> Range<usize> {
        self.range.start..self.prefix.start
    }

    /// The bytes after the prefix.
    pub fn trailing(&self) -> Range<usize> {
        self.prefix.end..self.range.end
    }
}

/// Iterator over path matches.
pub struct PathMatches<'r, 'h> {
    regex: &'r PathRegex,
    haystack: &'h [u8],
    pos: usize,
}

impl Iterator for PathMatches<'_, '_> {
    type Item = PathMatch;

    fn next(&mut self) -> Option<Self::Item> {
        let m = self.regex.find_at(self.haystack, self.pos)?;
        self.pos = if m.range.is_empty() {
            m.range.end + 1
        } else {
            m.range.end
        };
        Some(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use arbtest::arbtest;

    fn search<'h>(regex: &PathRegex, haystack: &'h [u8]) -> Option<&'h [u8]> {
        regex.search(haystack).map(|m| &haystack[m.range])
    }

    #[test]
    fn metacharacters_are_escaped() {
        let regex = single_path_regex("/[a-z]/").unwrap();
        assert_eq!(
            Some(&b"/[a-z]/"[..]),
            search(&regex, b"This does not match /a/, but this does: /[a-z]/.")
        );
        assert_eq!(r"\x00\xFF\.\-a b", escape_bytes(b"\0\xff.-a b"));
    }

    #[test]
    fn escaped_bytes_match_literally() {
        arbtest(|u| {
            let literal: Vec<u8> = u.arbitrary()?;
            let regex = compile(&format!("^{}$", escape_bytes(&literal))).unwrap();
            assert!(regex.is_match(&literal));
            Ok(())
        });
    }

    #[test]
    fn left_boundary() {
        let regex = multi_path_regex(["/first/path", "/second/path", "/safe/[a-z]"]).unwrap();
        assert_eq!(
            None,
            search(&regex, b"text /neither/first/path text /the/second/path text")
        );
        assert_eq!(
            Some(&b"/first/path/subdir"[..]),
            search(&regex, b"contains both /first/path/subdir and /second/path/sub")
        );
        assert_eq!(
            Some(&b"/second/path/subdir"[..]),
            search(
                &regex,
                b"contains both /not/first/path/subdir but /second/path/subdir"
            )
        );
        assert_eq!(
            Some(&b"/safe/[a-z]/file"[..]),
            search(&regex, b"don't match /safe/a/path but do match /safe/[a-z]/file")
        );
    }

    #[test]
    fn leading_and_trailing_words() {
        let regex = single_path_regex("/prefix").unwrap();
        let haystack = b"x=lib-/prefix/lib64:bin_/prefix.";
        let matches: Vec<_> = regex.find_iter(haystack).collect();
        assert_eq!(2, matches.len());
        assert_eq!(b"lib-", &haystack[matches[0].leading()]);
        assert_eq!(b"/lib64", &haystack[matches[0].trailing()]);
        assert_eq!(b"bin_/prefix", &haystack[matches[1].range.clone()]);
        assert!(matches[1].trailing().is_empty());
        for haystack in [&b"/opt/prefix"[..], b"#!/usr/prefix", b"a/b/prefix"] {
            assert_eq!(None, regex.search(haystack), "{:?}", haystack.escape_ascii());
        }
        assert_eq!(Some(&b"a-b_c/prefix"[..]), search(&regex, b"a-b_c/prefix"));
    }

    #[test]
    fn cstring_tail() {
        let regex = binary_cstring_regex(["pkg-abcdef"], 7).unwrap();
        let haystack = b"Binary with pkg-abcdef\0/xx\0";
        let captures = regex.captures(haystack).unwrap();
        // The first NUL byte terminates the tail.
        assert_eq!(b"\0", captures.get(2).unwrap().as_bytes());
        let haystack = b"pkg-abcdef/too/long/tail\0";
        let captures = regex.captures(haystack).unwrap();
        assert!(captures.get(2).is_none());
    }
}
