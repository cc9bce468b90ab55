#![doc = include_str!("../README.md")]

pub(crate) mod constants;
mod binary;
mod byte_order;
mod class;
mod dynamic;
mod elf;
mod enums;
mod error;
mod header;
mod io;
mod macros;
mod origin;
mod pattern;
mod prefix_map;
mod record;
mod relocate;
mod replacer;
mod rpath;
mod sections;
mod segments;
mod text;

#[cfg(test)]
mod test;

pub use self::binary::*;
pub use self::byte_order::*;
pub use self::class::*;
pub use self::dynamic::*;
pub use self::elf::*;
pub use self::enums::*;
pub use self::error::*;
pub use self::header::*;
pub use self::io::*;
pub(crate) use self::macros::*;
pub use self::origin::*;
pub use self::pattern::*;
pub use self::prefix_map::*;
pub use self::record::*;
pub use self::relocate::*;
pub use self::replacer::*;
pub use self::rpath::*;
pub use self::sections::*;
pub use self::segments::*;
pub use self::text::*;

#[cfg(feature = "fs-err")]
pub(crate) use fs_err as fs;
#[cfg(not(feature = "fs-err"))]
pub(crate) use std::fs;

pub use constants::DEFAULT_SUFFIX_SAFETY_SIZE;
