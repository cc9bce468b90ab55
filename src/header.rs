use crate::constants::*;
use crate::ByteOrder;
use crate::Class;
use crate::ElfRead;
use crate::ElfSeek;
use crate::Error;
use crate::FileKind;
use crate::Record;
use crate::Schema;

/// ELF header.
///
/// Only the fields needed to locate segments and sections are kept.
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Header {
    /// Bitness.
    pub class: Class,
    /// Data format.
    pub byte_order: ByteOrder,
    /// File type.
    pub kind: FileKind,
    /// Program header (the list of segments) offset within the file.
    pub program_header_offset: u64,
    /// The length of each segment's metadata entry.
    pub segment_len: u16,
    /// The number of segments.
    pub num_segments: u16,
    /// Section header (the list of sections) offset within the file.
    pub section_header_offset: u64,
    /// The length of each section's metadata entry.
    pub section_len: u16,
    /// The number of sections.
    pub num_sections: u16,
}

impl Header {
    /// Read header from the beginning of `reader`.
    pub fn read<R: ElfRead + ElfSeek>(reader: &mut R) -> Result<Self, Error> {
        reader.seek_to(0)?;
        let ident = reader
            .read_record(IDENT_LEN, "Short identification")
            .map_err(|e| match e {
                Error::Malformed(..) => Error::NotElf,
                e => e,
            })?;
        if ident[..MAGIC.len()] != MAGIC {
            return Err(Error::NotElf);
        }
        let class: Class = ident[4].try_into()?;
        let byte_order: ByteOrder = ident[5].try_into()?;
        let schema = Schema::get(class);
        let rest = reader.read_record(schema.header_len - IDENT_LEN, "ELF header malformed")?;
        let mut buf = ident;
        buf.extend_from_slice(&rest);
        let record = Record::new(&buf, byte_order);
        let fields = &schema.header;
        let header = Self {
            class,
            byte_order,
            kind: (record.get(fields.kind)? as u16).into(),
            program_header_offset: record.get(fields.program_header_offset)?,
            segment_len: record.get(fields.segment_len)? as u16,
            num_segments: record.get(fields.num_segments)? as u16,
            section_header_offset: record.get(fields.section_header_offset)?,
            section_len: record.get(fields.section_len)? as u16,
            num_sections: record.get(fields.num_sections)? as u16,
        };
        header.check(schema)?;
        Ok(header)
    }

    /// Entries have to be at least as large as the records we decode.
    fn check(&self, schema: &Schema) -> Result<(), Error> {
        if self.num_segments != 0 && (self.segment_len as usize) < schema.segment_len {
            return Err(Error::Malformed("Program header entry is too small"));
        }
        if self.num_sections != 0 && (self.section_len as usize) < schema.section_len {
            return Err(Error::Malformed("Section header entry is too small"));
        }
        Ok(())
    }
}
