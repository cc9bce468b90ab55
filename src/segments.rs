use crate::ElfRead;
use crate::ElfSeek;
use crate::Error;
use crate::Header;
use crate::Record;
use crate::Schema;
use crate::SegmentKind;

/// File block occupied by a segment.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Block {
    /// Offset within the file.
    pub offset: u64,
    /// Size in bytes.
    pub len: u64,
}

/// The parts of the program header the relocator cares about.
#[derive(Debug, Default)]
pub struct ProgramHeader {
    /// `LOAD` segments.
    pub loads: LoadMap,
    /// `INTERP` segment.
    pub interpreter: Option<Block>,
    /// `DYNAMIC` segment.
    pub dynamic: Option<Block>,
}

impl ProgramHeader {
    /// Read all program header entries in one go.
    pub fn read<R: ElfRead + ElfSeek>(reader: &mut R, header: &Header) -> Result<Self, Error> {
        let schema = Schema::get(header.class);
        let entry_len = header.segment_len as usize;
        let len = entry_len * header.num_segments as usize;
        reader.check_block(
            header.program_header_offset,
            len as u64,
            "Program header is out of bounds",
        )?;
        reader.seek_to(header.program_header_offset)?;
        let data = reader.read_record(len, "Malformed program header")?;
        let mut ret = Self::default();
        let mut loads = Vec::new();
        for i in 0..header.num_segments as usize {
            let record = Record::new(&data[i * entry_len..], header.byte_order);
            let fields = &schema.segment;
            let file_size = record.get(fields.file_size)?;
            // Empty segments are indistinguishable from missing ones.
            if file_size == 0 {
                continue;
            }
            let offset = record.get(fields.offset)?;
            let kind: SegmentKind = (record.get(fields.kind)? as u32).into();
            match kind {
                SegmentKind::Loadable => {
                    let virtual_address = record.get(fields.virtual_address)?;
                    loads.push((virtual_address, offset));
                }
                SegmentKind::Interpreter => {
                    ret.interpreter = Some(Block {
                        offset,
                        len: file_size,
                    });
                }
                SegmentKind::Dynamic => {
                    ret.dynamic = Some(Block {
                        offset,
                        len: file_size,
                    });
                }
                _ => {}
            }
        }
        ret.loads = LoadMap::new(loads);
        Ok(ret)
    }
}

/// Maps virtual addresses to file offsets using `LOAD` segments.
#[derive(Debug, Default)]
pub struct LoadMap {
    /// `(virtual address, file offset)` pairs sorted by virtual address.
    entries: Vec<(u64, u64)>,
}

impl LoadMap {
    /// Create the map from `(virtual address, file offset)` pairs in any order.
    pub fn new(mut entries: Vec<(u64, u64)>) -> Self {
        // Linkers sort LOAD segments, but patching tools might not.
        entries.sort_unstable();
        Self { entries }
    }

    /// Translate virtual address to file offset.
    ///
    /// Uses the segment with the largest virtual address not exceeding `address`.
    pub fn file_offset(&self, address: u64) -> Result<u64, Error> {
        let i = self
            .entries
            .partition_point(|(virtual_address, _)| *virtual_address <= address);
        let (virtual_address, offset) = i
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .ok_or(Error::AddressNotMapped(address))?;
        (address - virtual_address)
            .checked_add(*offset)
            .ok_or(Error::AddressNotMapped(address))
    }

    /// No `LOAD` segments.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
