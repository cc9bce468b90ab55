use crate::Block;
use crate::DynamicTag;
use crate::ElfRead;
use crate::ElfSeek;
use crate::Error;
use crate::Header;
use crate::Record;
use crate::Schema;

/// Dynamic table entry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DynamicEntry {
    /// Tag.
    pub tag: DynamicTag,
    /// Value or address.
    pub value: u64,
    /// File offset of the entry's tag word.
    pub offset: u64,
}

/// Dynamic linking information.
#[derive(Default, Debug)]
pub struct DynamicTable {
    entries: Vec<DynamicEntry>,
}

impl DynamicTable {
    /// Read the entries of the `DYNAMIC` segment up to the `NULL` entry or the end of the segment.
    pub fn read<R: ElfRead + ElfSeek>(
        reader: &mut R,
        header: &Header,
        block: Block,
    ) -> Result<Self, Error> {
        let schema = Schema::get(header.class);
        let step = schema.dynamic_len as u64;
        let mut entries = Vec::new();
        reader.seek_to(block.offset)?;
        for i in 0..block.len / step {
            let data = reader.read_record(schema.dynamic_len, "Malformed dynamic table")?;
            let record = Record::new(&data, header.byte_order);
            let tag: DynamicTag = record.get(schema.dynamic.tag)?.into();
            if tag == DynamicTag::Null {
                // NULL entry marks the end of the section.
                break;
            }
            let value = record.get(schema.dynamic.value)?;
            entries.push(DynamicEntry {
                tag,
                value,
                offset: block.offset + i * step,
            });
        }
        Ok(Self { entries })
    }

    /// All entries with the specified tag.
    pub fn get_all(&self, tag: DynamicTag) -> impl Iterator<Item = &DynamicEntry> {
        self.entries.iter().filter(move |entry| entry.tag == tag)
    }

    /// Library search path entries, both `RPATH` and `RUNPATH`.
    pub fn rpaths(&self) -> impl Iterator<Item = &DynamicEntry> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.tag, DynamicTag::Rpath | DynamicTag::Runpath))
    }

    /// The number of entries before the `NULL` entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No entries before the `NULL` entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use crate::test::ElfBuilder;
    use crate::ByteOrder;
    use crate::Class;
    use crate::ProgramHeader;
    use crate::RpathKind;

    #[test]
    fn entries_stop_at_null() {
        let bytes = ElfBuilder::new(Class::Elf32, ByteOrder::BigEndian)
            .needed(b"libc.so.6")
            .needed(b"libm.so.6")
            .rpath(RpathKind::Runpath, b"/opt/lib")
            .build();
        let mut cursor = Cursor::new(bytes);
        let header = Header::read(&mut cursor).unwrap();
        let program_header = ProgramHeader::read(&mut cursor, &header).unwrap();
        let block = program_header.dynamic.unwrap();
        let table = DynamicTable::read(&mut cursor, &header, block).unwrap();
        // needed x2, runpath, strtab
        assert_eq!(4, table.len());
        assert_eq!(2, table.get_all(DynamicTag::Needed).count());
        let rpaths: Vec<_> = table.rpaths().collect();
        assert_eq!(1, rpaths.len());
        assert_eq!(DynamicTag::Runpath, rpaths[0].tag);
        assert_eq!(block.offset + 2 * 8, rpaths[0].offset);
    }
}
