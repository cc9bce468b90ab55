use std::io::Cursor;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;

use crate::Error;

/// ELF-specific read functions.
pub trait ElfRead {
    /// Read exactly `len` bytes.
    ///
    /// Short reads are reported as [`Error::Malformed`] with the supplied description,
    /// other I/O errors are propagated as is.
    fn read_record(&mut self, len: usize, what: &'static str) -> Result<Vec<u8>, Error>;
}

impl<R: Read + ?Sized> ElfRead for R {
    fn read_record(&mut self, len: usize, what: &'static str) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0_u8; len];
        self.read_exact(&mut buf[..]).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => Error::Malformed(what),
            _ => Error::Io(e),
        })?;
        Ok(buf)
    }
}

/// ELF-specific write functions.
pub trait ElfWrite {
    /// Write all the bytes at the specified offset.
    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<(), Error>;
}

impl<W: Write + Seek + ?Sized> ElfWrite for W {
    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<(), Error> {
        self.seek(SeekFrom::Start(offset))?;
        self.write_all(bytes)?;
        Ok(())
    }
}

/// ELF-specific seek functions.
pub trait ElfSeek {
    /// Seek to an absolute offset.
    fn seek_to(&mut self, offset: u64) -> Result<(), Error>;

    /// Measure the size of the underlying file.
    fn file_len(&mut self) -> Result<u64, Error>;

    /// Make sure that `len` bytes at `offset` are within the file.
    fn check_block(&mut self, offset: u64, len: u64, what: &'static str) -> Result<(), Error> {
        let file_len = self.file_len()?;
        match offset.checked_add(len) {
            Some(end) if end <= file_len => Ok(()),
            _ => Err(Error::Malformed(what)),
        }
    }
}

impl<S: Seek + ?Sized> ElfSeek for S {
    fn seek_to(&mut self, offset: u64) -> Result<(), Error> {
        self.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn file_len(&mut self) -> Result<u64, Error> {
        Ok(self.seek(SeekFrom::End(0))?)
    }
}

/// Files that can be cut to the specified length.
///
/// Text relocation rewrites the whole file and may make it shorter.
pub trait Truncate {
    /// Set the length of the file to `len` bytes.
    fn truncate(&mut self, len: u64) -> std::io::Result<()>;
}

impl Truncate for std::fs::File {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len)
    }
}

#[cfg(feature = "fs-err")]
impl Truncate for fs_err::File {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len)
    }
}

impl Truncate for Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        let len = usize::try_from(len).map_err(|_| ErrorKind::InvalidInput)?;
        self.get_mut().truncate(len);
        Ok(())
    }
}

impl Truncate for Cursor<&mut Vec<u8>> {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        let len = usize::try_from(len).map_err(|_| ErrorKind::InvalidInput)?;
        self.get_mut().truncate(len);
        Ok(())
    }
}

impl<T: Truncate + ?Sized> Truncate for &mut T {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        (**self).truncate(len)
    }
}
