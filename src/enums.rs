use crate::elf_enum;

elf_enum! {
    /// ELF file type.
    pub enum FileKind: u16 {
        /// Unknown file type.
        None = 0,
        /// Relocatable file.
        Relocatable = 1,
        /// Executable file.
        Executable = 2,
        /// Shared object.
        Shared = 3,
        /// Core dump.
        Core = 4,
    }
}

impl FileKind {
    /// Only executables and shared objects carry relocatable dynamic sections.
    pub const fn is_loadable(self) -> bool {
        matches!(self, Self::Executable | Self::Shared)
    }
}

elf_enum! {
    /// Segment type.
    pub enum SegmentKind: u32 {
        /// Unused entry.
        Null = 0,
        /// Loadable segment.
        Loadable = 1,
        /// Dynamic linking information.
        Dynamic = 2,
        /// The path to the interpreter.
        Interpreter = 3,
        /// Auxiliary information.
        Note = 4,
        /// Reserved.
        Shlib = 5,
        /// Program header.
        ProgramHeader = 6,
        /// Thread-local storage template.
        Tls = 7,
    }
}

elf_enum! {
    /// Section type.
    pub enum SectionKind: u32 {
        /// Inactive section.
        Null = 0,
        /// Program-defined contents.
        ProgramBits = 1,
        /// Symbol table.
        SymbolTable = 2,
        /// String table.
        StringTable = 3,
        /// Relocations with addends.
        RelaTable = 4,
        /// Symbol hash table.
        Hash = 5,
        /// Dynamic linking information.
        Dynamic = 6,
        /// Auxiliary information.
        Note = 7,
        /// Occupies no space in the file.
        NoBits = 8,
        /// Relocations without addends.
        RelTable = 9,
        /// Dynamic linker symbol table.
        DynamicSymbolTable = 11,
    }
}

elf_enum! {
    /// Dynamic table tag.
    pub enum DynamicTag: u64 {
        /// Marks the end of the dynamic array.
        Null = 0,
        /// String table offset of a needed library name.
        Needed = 1,
        /// Address of the string table.
        StringTableAddress = 5,
        /// The size of the string table.
        StringTableSize = 10,
        /// String table offset of the shared object name.
        SharedObjectName = 14,
        /// String table offset of the library search path (deprecated).
        Rpath = 15,
        /// String table offset of the library search path.
        Runpath = 29,
    }
}

/// Which dynamic table tag holds the library search path.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(test, derive(arbitrary::Arbitrary))]
pub enum RpathKind {
    /// `DT_RPATH`: searched before `LD_LIBRARY_PATH`.
    Rpath,
    /// `DT_RUNPATH`: searched after `LD_LIBRARY_PATH`, direct dependencies only.
    Runpath,
}

impl RpathKind {
    /// The dynamic table tag of this kind.
    pub const fn tag(self) -> DynamicTag {
        match self {
            Self::Rpath => DynamicTag::Rpath,
            Self::Runpath => DynamicTag::Runpath,
        }
    }
}
