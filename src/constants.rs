/// The first bytes of every ELF file.
pub const MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// The size of `e_ident`: magic, class, byte order, version, OS ABI and padding.
pub const IDENT_LEN: usize = 16;

/// File header size, 32-bit.
pub const HEADER_LEN_32: usize = 52;
/// File header size, 64-bit.
pub const HEADER_LEN_64: usize = 64;

/// Program header entry size, 32-bit.
pub const SEGMENT_LEN_32: usize = 32;
/// Program header entry size, 64-bit.
pub const SEGMENT_LEN_64: usize = 56;

/// Section header entry size, 32-bit.
pub const SECTION_LEN_32: usize = 40;
/// Section header entry size, 64-bit.
pub const SECTION_LEN_64: usize = 64;

/// Dynamic entry size, 32-bit.
pub const DYNAMIC_LEN_32: usize = 8;
/// Dynamic entry size, 64-bit.
pub const DYNAMIC_LEN_64: usize = 16;

/// Default number of trailing C-string bytes that have to stay in place.
pub const DEFAULT_SUFFIX_SAFETY_SIZE: usize = 7;

/// Rpath entries are separated by colons.
pub const RPATH_SEPARATOR: u8 = b':';

/// The byte used to left-pad shortened paths.
pub const PATH_SEPARATOR: u8 = b'/';

/// How many leading bytes are inspected to tell text from binary files.
pub const SNIFF_LEN: usize = 4096;
