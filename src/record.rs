//! On-disk record schemas.
//!
//! 32-bit and 64-bit ELF files store the same fields at different offsets and with
//! different widths. Instead of threading per-class offsets through the parser,
//! each class has a named [`Schema`], and fields are decoded by name from a [`Record`].

use crate::constants::*;
use crate::ByteOrder;
use crate::Class;
use crate::Error;

/// A fixed-size integer field within a record.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Field {
    /// Byte offset from the start of the record.
    pub offset: usize,
    /// Field width in bytes.
    pub len: usize,
}

impl Field {
    const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// Encode `value` using the field's width.
    pub fn encode(self, value: u64, byte_order: ByteOrder) -> Vec<u8> {
        byte_order.put_uint(value, self.len)
    }
}

/// ELF header fields.
#[derive(Debug)]
#[allow(missing_docs)]
pub struct HeaderSchema {
    pub kind: Field,
    pub program_header_offset: Field,
    pub section_header_offset: Field,
    pub segment_len: Field,
    pub num_segments: Field,
    pub section_len: Field,
    pub num_sections: Field,
}

/// Program header entry fields.
#[derive(Debug)]
#[allow(missing_docs)]
pub struct SegmentSchema {
    pub kind: Field,
    pub offset: Field,
    pub virtual_address: Field,
    pub file_size: Field,
}

/// Section header entry fields.
#[derive(Debug)]
#[allow(missing_docs)]
pub struct SectionSchema {
    pub kind: Field,
    pub offset: Field,
    pub size: Field,
}

/// Dynamic array entry fields.
#[derive(Debug)]
#[allow(missing_docs)]
pub struct DynamicSchema {
    pub tag: Field,
    pub value: Field,
}

/// Record layouts of one ELF class.
#[derive(Debug)]
#[allow(missing_docs)]
pub struct Schema {
    pub header_len: usize,
    pub header: HeaderSchema,
    pub segment_len: usize,
    pub segment: SegmentSchema,
    pub section_len: usize,
    pub section: SectionSchema,
    pub dynamic_len: usize,
    pub dynamic: DynamicSchema,
}

impl Schema {
    /// `Elf32_Ehdr`, `Elf32_Phdr`, `Elf32_Shdr`, `Elf32_Dyn`.
    pub const ELF32: Schema = Schema {
        header_len: HEADER_LEN_32,
        header: HeaderSchema {
            kind: Field::new(16, 2),
            program_header_offset: Field::new(28, 4),
            section_header_offset: Field::new(32, 4),
            segment_len: Field::new(42, 2),
            num_segments: Field::new(44, 2),
            section_len: Field::new(46, 2),
            num_sections: Field::new(48, 2),
        },
        segment_len: SEGMENT_LEN_32,
        segment: SegmentSchema {
            kind: Field::new(0, 4),
            offset: Field::new(4, 4),
            virtual_address: Field::new(8, 4),
            file_size: Field::new(16, 4),
        },
        section_len: SECTION_LEN_32,
        section: SectionSchema {
            kind: Field::new(4, 4),
            offset: Field::new(16, 4),
            size: Field::new(20, 4),
        },
        dynamic_len: DYNAMIC_LEN_32,
        dynamic: DynamicSchema {
            tag: Field::new(0, 4),
            value: Field::new(4, 4),
        },
    };

    /// `Elf64_Ehdr`, `Elf64_Phdr`, `Elf64_Shdr`, `Elf64_Dyn`.
    pub const ELF64: Schema = Schema {
        header_len: HEADER_LEN_64,
        header: HeaderSchema {
            kind: Field::new(16, 2),
            program_header_offset: Field::new(32, 8),
            section_header_offset: Field::new(40, 8),
            segment_len: Field::new(54, 2),
            num_segments: Field::new(56, 2),
            section_len: Field::new(58, 2),
            num_sections: Field::new(60, 2),
        },
        segment_len: SEGMENT_LEN_64,
        segment: SegmentSchema {
            kind: Field::new(0, 4),
            offset: Field::new(8, 8),
            virtual_address: Field::new(16, 8),
            file_size: Field::new(32, 8),
        },
        section_len: SECTION_LEN_64,
        section: SectionSchema {
            kind: Field::new(4, 4),
            offset: Field::new(24, 8),
            size: Field::new(32, 8),
        },
        dynamic_len: DYNAMIC_LEN_64,
        dynamic: DynamicSchema {
            tag: Field::new(0, 8),
            value: Field::new(8, 8),
        },
    };

    /// Schema of the specified class.
    pub const fn get(class: Class) -> &'static Schema {
        match class {
            Class::Elf32 => &Self::ELF32,
            Class::Elf64 => &Self::ELF64,
        }
    }
}

/// Raw bytes of one record.
pub struct Record<'a> {
    bytes: &'a [u8],
    byte_order: ByteOrder,
}

impl<'a> Record<'a> {
    /// Wrap `bytes` read from the file.
    pub fn new(bytes: &'a [u8], byte_order: ByteOrder) -> Self {
        Self { bytes, byte_order }
    }

    /// Decode the field.
    pub fn get(&self, field: Field) -> Result<u64, Error> {
        let bytes = self
            .bytes
            .get(field.offset..field.offset + field.len)
            .ok_or(Error::Malformed("Record is too short"))?;
        Ok(self.byte_order.get_uint(bytes))
    }
}
