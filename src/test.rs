#![allow(missing_docs)]

//! Synthetic ELF images for tests.

use crate::ByteOrder;
use crate::Class;
use crate::DynamicTag;
use crate::Field;
use crate::FileKind;
use crate::RpathKind;
use crate::Schema;
use crate::SectionKind;
use crate::SegmentKind;

/// Virtual address of the only `LOAD` segment.
pub const BASE_ADDRESS: u64 = 0x10000;

/// Builds minimal ELF images: one `LOAD` segment that covers the whole file,
/// optional `INTERP` and `DYNAMIC` segments, a `.dynstr`-like string table and a section
/// header with a `NULL` section and a `STRTAB` section.
pub struct ElfBuilder {
    class: Class,
    byte_order: ByteOrder,
    kind: FileKind,
    interpreter: Option<Vec<u8>>,
    dynamic: bool,
    rpaths: Vec<(RpathKind, Vec<u8>)>,
    needed: Vec<Vec<u8>>,
    soname: Option<Vec<u8>>,
    num_string_tables: usize,
    string_table_section: bool,
}

impl ElfBuilder {
    pub fn new(class: Class, byte_order: ByteOrder) -> Self {
        Self {
            class,
            byte_order,
            kind: FileKind::Shared,
            interpreter: None,
            dynamic: true,
            rpaths: Vec::new(),
            needed: Vec::new(),
            soname: None,
            num_string_tables: 1,
            string_table_section: true,
        }
    }

    pub fn kind(mut self, kind: FileKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn interpreter(mut self, interpreter: &[u8]) -> Self {
        self.interpreter = Some(interpreter.to_vec());
        self
    }

    /// Omit `DYNAMIC` segment, i.e. build a statically linked file.
    pub fn no_dynamic(mut self) -> Self {
        self.dynamic = false;
        self
    }

    pub fn rpath(mut self, kind: RpathKind, value: &[u8]) -> Self {
        self.rpaths.push((kind, value.to_vec()));
        self
    }

    pub fn needed(mut self, name: &[u8]) -> Self {
        self.needed.push(name.to_vec());
        self
    }

    pub fn soname(mut self, name: &[u8]) -> Self {
        self.soname = Some(name.to_vec());
        self
    }

    pub fn num_string_tables(mut self, n: usize) -> Self {
        self.num_string_tables = n;
        self
    }

    /// Omit `STRTAB` section that describes the dynamic string table.
    pub fn no_string_table_section(mut self) -> Self {
        self.string_table_section = false;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let schema = Schema::get(self.class);
        let word_len = self.class.word_len();
        // Program header goes right after the file header.
        let program_header_offset = schema.header_len;
        let mut segments = vec![SegmentKind::Loadable];
        if self.interpreter.is_some() {
            segments.push(SegmentKind::Interpreter);
        }
        if self.dynamic {
            segments.push(SegmentKind::Dynamic);
        }
        let mut offset = program_header_offset + segments.len() * schema.segment_len;
        let interpreter_offset = offset;
        if let Some(interpreter) = self.interpreter.as_ref() {
            offset += interpreter.len() + 1;
        }
        // String table.
        let strings_offset = offset;
        let mut strings = vec![0_u8];
        let mut entries: Vec<(DynamicTag, u64)> = Vec::new();
        let mut add_string = |tag: DynamicTag, value: &[u8], entries: &mut Vec<_>| {
            let string_offset = strings.len() as u64;
            strings.extend_from_slice(value);
            strings.push(0);
            entries.push((tag, string_offset));
        };
        for name in self.needed.iter() {
            add_string(DynamicTag::Needed, name, &mut entries);
        }
        if let Some(soname) = self.soname.as_ref() {
            add_string(DynamicTag::SharedObjectName, soname, &mut entries);
        }
        for (kind, value) in self.rpaths.iter() {
            add_string(kind.tag(), value, &mut entries);
        }
        let strings_vaddr = BASE_ADDRESS + strings_offset as u64;
        for _ in 0..self.num_string_tables {
            entries.push((DynamicTag::StringTableAddress, strings_vaddr));
        }
        entries.push((DynamicTag::Null, 0));
        offset += strings.len();
        offset = offset.next_multiple_of(word_len);
        let dynamic_offset = offset;
        let dynamic_len = if self.dynamic {
            entries.len() * schema.dynamic_len
        } else {
            0
        };
        offset += dynamic_len;
        offset = offset.next_multiple_of(word_len);
        let section_header_offset = offset;
        let num_sections = if self.string_table_section { 2 } else { 1 };
        let file_len = section_header_offset + num_sections * schema.section_len;

        let mut buf = vec![0_u8; file_len];
        let mut put = |base: usize, field: Field, value: u64| {
            let bytes = field.encode(value, self.byte_order);
            buf[base + field.offset..base + field.offset + field.len].copy_from_slice(&bytes);
        };
        // File header.
        let header = &schema.header;
        put(0, header.kind, self.kind.as_number().into());
        put(0, header.program_header_offset, program_header_offset as u64);
        put(0, header.section_header_offset, section_header_offset as u64);
        put(0, header.segment_len, schema.segment_len as u64);
        put(0, header.num_segments, segments.len() as u64);
        put(0, header.section_len, schema.section_len as u64);
        put(0, header.num_sections, num_sections as u64);
        // Segments.
        for (i, kind) in segments.iter().enumerate() {
            let base = program_header_offset + i * schema.segment_len;
            let (offset, len) = match kind {
                SegmentKind::Loadable => (0, file_len),
                SegmentKind::Interpreter => (
                    interpreter_offset,
                    self.interpreter.as_ref().map(|s| s.len() + 1).unwrap_or(0),
                ),
                _ => (dynamic_offset, dynamic_len),
            };
            let fields = &schema.segment;
            put(base, fields.kind, kind.as_number().into());
            put(base, fields.offset, offset as u64);
            put(base, fields.virtual_address, BASE_ADDRESS + offset as u64);
            put(base, fields.file_size, len as u64);
        }
        // Sections.
        if self.string_table_section {
            let base = section_header_offset + schema.section_len;
            let fields = &schema.section;
            put(base, fields.kind, SectionKind::StringTable.as_number().into());
            put(base, fields.offset, strings_offset as u64);
            put(base, fields.size, strings.len() as u64);
        }
        // Dynamic table.
        if self.dynamic {
            for (i, (tag, value)) in entries.iter().enumerate() {
                let base = dynamic_offset + i * schema.dynamic_len;
                put(base, schema.dynamic.tag, tag.as_number());
                put(base, schema.dynamic.value, *value);
            }
        }
        buf[..4].copy_from_slice(b"\x7fELF");
        buf[4] = self.class as u8;
        buf[5] = self.byte_order as u8;
        buf[6] = 1;
        if let Some(interpreter) = self.interpreter.as_ref() {
            buf[interpreter_offset..interpreter_offset + interpreter.len()]
                .copy_from_slice(interpreter);
        }
        buf[strings_offset..strings_offset + strings.len()].copy_from_slice(&strings);
        buf
    }
}
