use crate::string_table_size;
use crate::ByteOrder;
use crate::Class;
use crate::DynamicTable;
use crate::DynamicTag;
use crate::ElfRead;
use crate::ElfSeek;
use crate::Error;
use crate::FileKind;
use crate::Header;
use crate::LoadMap;
use crate::ProgramHeader;
use crate::RpathKind;

/// What to parse besides the header and the `LOAD` segments.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParseOptions {
    interpreter: bool,
    dynamic: bool,
}

impl ParseOptions {
    /// Parse only the header and the program header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the path to the interpreter from `INTERP` segment.
    pub fn interpreter(mut self, value: bool) -> Self {
        self.interpreter = value;
        self
    }

    /// Read rpath, needed libraries and the shared object name from `DYNAMIC` segment.
    pub fn dynamic(mut self, value: bool) -> Self {
        self.dynamic = value;
        self
    }
}

/// Library search path entry.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RpathEntry {
    /// The string without the terminating NUL byte.
    pub value: Vec<u8>,
    /// Which tag holds the string.
    pub kind: RpathKind,
    /// File offset of the string.
    pub string_offset: u64,
    /// File offset of the tag word of the dynamic entry.
    pub entry_offset: u64,
}

/// Strings referenced by the dynamic table.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DynamicInfo {
    /// File offset of the string table.
    ///
    /// Absent when the dynamic table references no strings.
    pub string_table_offset: Option<u64>,
    /// `RPATH` or `RUNPATH`.
    pub rpath: Option<RpathEntry>,
    /// `NEEDED` libraries.
    pub needed: Vec<Vec<u8>>,
    /// `SONAME`.
    pub soname: Option<Vec<u8>>,
}

/// The result of parsing executable or shared object.
#[derive(Debug)]
pub struct ElfFile {
    /// File header.
    pub header: Header,
    /// `LOAD` segments.
    pub loads: LoadMap,
    /// The path to the interpreter.
    pub interpreter: Option<Vec<u8>>,
    /// Dynamic linking information; `None` for statically linked files.
    pub dynamic: Option<DynamicInfo>,
}

impl ElfFile {
    /// Parse the file.
    ///
    /// Only executables and shared objects are supported.
    pub fn parse<R: ElfRead + ElfSeek>(
        reader: &mut R,
        options: ParseOptions,
    ) -> Result<Self, Error> {
        let header = Header::read(reader)?;
        if !header.kind.is_loadable() {
            return Err(Error::InvalidFileKind(header.kind.as_number()));
        }
        let program_header = ProgramHeader::read(reader, &header)?;
        let interpreter = match program_header.interpreter {
            Some(block) if options.interpreter => {
                reader.check_block(block.offset, block.len, "Interpreter is out of bounds")?;
                reader.seek_to(block.offset)?;
                let data = reader.read_record(block.len as usize, "Malformed interpreter")?;
                Some(c_string(&data, 0)?)
            }
            _ => None,
        };
        let loads = program_header.loads;
        let dynamic = match program_header.dynamic {
            Some(block) if options.dynamic && !loads.is_empty() => {
                let table = DynamicTable::read(reader, &header, block)?;
                Some(resolve_strings(reader, &header, &loads, &table)?)
            }
            _ => None,
        };
        Ok(Self {
            header,
            loads,
            interpreter,
            dynamic,
        })
    }

    /// Bitness.
    pub fn class(&self) -> Class {
        self.header.class
    }

    /// Data format.
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// File type.
    pub fn kind(&self) -> FileKind {
        self.header.kind
    }

    /// Library search path entry, if any.
    pub fn rpath(&self) -> Option<&RpathEntry> {
        self.dynamic.as_ref().and_then(|dynamic| dynamic.rpath.as_ref())
    }
}

fn resolve_strings<R: ElfRead + ElfSeek>(
    reader: &mut R,
    header: &Header,
    loads: &LoadMap,
    table: &DynamicTable,
) -> Result<DynamicInfo, Error> {
    let rpaths: Vec<_> = table.rpaths().collect();
    if rpaths.len() > 1 {
        return Err(Error::MultipleRpaths(rpaths.len()));
    }
    let string_tables: Vec<_> = table.get_all(DynamicTag::StringTableAddress).collect();
    let [string_table] = string_tables[..] else {
        return Err(Error::NoUniqueStringTable(string_tables.len()));
    };
    let needed: Vec<_> = table.get_all(DynamicTag::Needed).collect();
    let soname = table.get_all(DynamicTag::SharedObjectName).next();
    if rpaths.is_empty() && needed.is_empty() && soname.is_none() {
        // Nothing to look up.
        return Ok(Default::default());
    }
    let offset = loads.file_offset(string_table.value)?;
    let size = string_table_size(reader, header, offset)?;
    reader.check_block(offset, size, "String table is out of bounds")?;
    reader.seek_to(offset)?;
    let strings = reader.read_record(size as usize, "Malformed string table")?;
    let rpath = match rpaths.first() {
        Some(entry) => {
            let kind = if entry.tag == DynamicTag::Runpath {
                RpathKind::Runpath
            } else {
                RpathKind::Rpath
            };
            let value = c_string(&strings, entry.value)?;
            log::trace!(
                "Found {kind:?} {:?} at string table offset {:#x}",
                value.escape_ascii().to_string(),
                entry.value
            );
            Some(RpathEntry {
                value,
                kind,
                string_offset: offset + entry.value,
                entry_offset: entry.offset,
            })
        }
        None => None,
    };
    Ok(DynamicInfo {
        string_table_offset: Some(offset),
        rpath,
        needed: needed
            .iter()
            .map(|entry| c_string(&strings, entry.value))
            .collect::<Result<_, _>>()?,
        soname: soname
            .map(|entry| c_string(&strings, entry.value))
            .transpose()?,
    })
}

/// Read NUL-terminated string that starts at `offset`.
fn c_string(strings: &[u8], offset: u64) -> Result<Vec<u8>, Error> {
    let tail = usize::try_from(offset)
        .ok()
        .and_then(|i| strings.get(i..))
        .ok_or(Error::UnterminatedString(offset))?;
    let len = tail
        .iter()
        .position(|b| *b == 0)
        .ok_or(Error::UnterminatedString(offset))?;
    Ok(tail[..len].to_vec())
}
