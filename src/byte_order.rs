use crate::Error;

/// Data format.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(test, derive(arbitrary::Arbitrary))]
#[repr(u8)]
pub enum ByteOrder {
    /// Two's complement, little-endian.
    LittleEndian = 1,
    /// Two's complement, big-endian.
    BigEndian = 2,
}

impl ByteOrder {
    /// Decode unsigned integer of `data.len()` bytes (at most 8).
    pub(crate) fn get_uint(self, data: &[u8]) -> u64 {
        debug_assert!(data.len() <= 8);
        let mut bytes = [0_u8; 8];
        match self {
            Self::LittleEndian => {
                bytes[..data.len()].copy_from_slice(data);
                u64::from_le_bytes(bytes)
            }
            Self::BigEndian => {
                bytes[8 - data.len()..].copy_from_slice(data);
                u64::from_be_bytes(bytes)
            }
        }
    }

    /// Encode the lowest `len` bytes (at most 8) of `value`.
    pub(crate) fn put_uint(self, value: u64, len: usize) -> Vec<u8> {
        debug_assert!(len <= 8);
        match self {
            Self::LittleEndian => value.to_le_bytes()[..len].to_vec(),
            Self::BigEndian => value.to_be_bytes()[8 - len..].to_vec(),
        }
    }
}

impl TryFrom<u8> for ByteOrder {
    type Error = Error;
    fn try_from(other: u8) -> Result<Self, Self::Error> {
        match other {
            1 => Ok(Self::LittleEndian),
            2 => Ok(Self::BigEndian),
            n => Err(Error::InvalidByteOrder(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_layout() {
        assert_eq!(vec![0, 0, 0, 15], ByteOrder::BigEndian.put_uint(15, 4));
        assert_eq!(vec![29, 0, 0, 0], ByteOrder::LittleEndian.put_uint(29, 4));
        assert_eq!(0x0102, ByteOrder::BigEndian.get_uint(&[1, 2]));
        assert_eq!(0x0201, ByteOrder::LittleEndian.get_uint(&[1, 2]));
    }
}
