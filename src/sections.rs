use crate::ElfRead;
use crate::ElfSeek;
use crate::Error;
use crate::Header;
use crate::Record;
use crate::Schema;
use crate::SectionKind;

/// Find the size of the string table that starts at `offset`.
///
/// The dynamic array stores only the address of the string table, the size comes from the
/// `STRTAB` section that occupies the same file offset.
pub fn string_table_size<R: ElfRead + ElfSeek>(
    reader: &mut R,
    header: &Header,
    offset: u64,
) -> Result<u64, Error> {
    if header.num_sections == 0 {
        return Err(Error::StringTableNotFound(offset));
    }
    let schema = Schema::get(header.class);
    let entry_len = header.section_len as usize;
    let len = entry_len * header.num_sections as usize;
    reader.check_block(
        header.section_header_offset,
        len as u64,
        "Section header is out of bounds",
    )?;
    reader.seek_to(header.section_header_offset)?;
    let data = reader.read_record(len, "Malformed section header")?;
    let fields = &schema.section;
    for entry in data.chunks_exact(entry_len) {
        let record = Record::new(entry, header.byte_order);
        let kind: SectionKind = (record.get(fields.kind)? as u32).into();
        if kind == SectionKind::StringTable && record.get(fields.offset)? == offset {
            return record.get(fields.size);
        }
    }
    Err(Error::StringTableNotFound(offset))
}
