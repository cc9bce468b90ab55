use colored::Colorize;
use std::io::BufWriter;
use std::io::Stdout;
use std::io::Write;

use reloc::Changes;

pub struct Printer {
    first_title: bool,
    writer: BufWriter<Stdout>,
}

impl Printer {
    pub fn new() -> Self {
        Self {
            first_title: true,
            writer: BufWriter::new(std::io::stdout()),
        }
    }

    pub fn title(&mut self, title: &str) {
        let newline = if !self.first_title {
            "\n"
        } else {
            self.first_title = false;
            ""
        };
        let _ = writeln!(self.writer, "{}{}", newline, title.bold().underline());
    }

    pub fn kv<V: std::fmt::Display>(&mut self, key: &str, value: V) {
        let _ = writeln!(self.writer, "  {}: {}", key.bold().blue(), value);
    }

    pub fn row<V: std::fmt::Display>(&mut self, value: V) {
        let _ = writeln!(self.writer, "  {}", value);
    }
}

pub struct ChangesStr(pub Changes);

impl std::fmt::Display for ChangesStr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut flags_str = [b'-', b'-', b'-'];
        for flag in self.0.iter() {
            match flag {
                Changes::TEXT => flags_str[0] = b't',
                Changes::BINARY => flags_str[1] = b'b',
                Changes::RPATH => flags_str[2] = b'r',
                _ => {}
            }
        }
        f.write_str(&String::from_utf8_lossy(&flags_str[..]))
    }
}

/// Byte string with non-printable characters escaped.
pub struct BytesStr<'a>(pub &'a [u8]);

impl std::fmt::Display for BytesStr<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0.escape_ascii())
    }
}
