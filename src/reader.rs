use crate::errors::{MapError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Upper bound on a single string payload; anything longer is a corrupt prefix.
const MAX_STRING_BYTES: usize = 64 * 1024 * 1024;

pub trait MapReader {
    fn read_7bit_len(&mut self) -> Result<usize>;
    fn read_prefixed_string(&mut self) -> Result<String>;
    fn read_count(&mut self, max_elements: usize) -> Result<usize>;
    fn read_array<T, F>(&mut self, reader_fn: F, max_elements: usize) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>;
}

impl<R: Read> MapReader for R {
    fn read_7bit_len(&mut self) -> Result<usize> {
        let mut value: u32 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.read_u8()?;
            if shift == 28 && byte > 0x0F {
                return Err(MapError::InvalidStringLength);
            }
            value |= u32::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value as usize);
            }
        }
        Err(MapError::InvalidStringLength)
    }

    fn read_prefixed_string(&mut self) -> Result<String> {
        let size = self.read_7bit_len()?;

        if size == 0 {
            return Ok(String::new());
        }
        if size > MAX_STRING_BYTES {
            return Err(MapError::InvalidStringLength);
        }

        let mut buffer = vec![0u8; size];
        self.read_exact(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| e.into())
    }

    fn read_count(&mut self, max_elements: usize) -> Result<usize> {
        let n = self.read_i32::<LittleEndian>()?;

        if n < 0 || n as usize > max_elements {
            return Err(MapError::InvalidCount(n));
        }
        Ok(n as usize)
    }

    fn read_array<T, F>(&mut self, mut reader_fn: F, max_elements: usize) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let n = self.read_count(max_elements)?;

        // Cap the up-front reservation; the count is untrusted.
        let mut array = Vec::with_capacity(n.min(1024));
        for _ in 0..n {
            array.push(reader_fn(self)?);
        }
        Ok(array)
    }
}

pub trait MapWriter {
    fn write_7bit_len(&mut self, len: usize) -> Result<()>;
    fn write_prefixed_string(&mut self, value: &str) -> Result<()>;
    fn write_count(&mut self, count: usize) -> Result<()>;
}

impl<W: Write> MapWriter for W {
    fn write_7bit_len(&mut self, len: usize) -> Result<()> {
        let mut value = u32::try_from(len).map_err(|_| MapError::InvalidStringLength)?;
        while value >= 0x80 {
            self.write_u8((value as u8) | 0x80)?;
            value >>= 7;
        }
        self.write_u8(value as u8)?;
        Ok(())
    }

    fn write_prefixed_string(&mut self, value: &str) -> Result<()> {
        self.write_7bit_len(value.len())?;
        self.write_all(value.as_bytes())?;
        Ok(())
    }

    fn write_count(&mut self, count: usize) -> Result<()> {
        let n = i32::try_from(count).map_err(|_| MapError::InvalidCount(i32::MAX))?;
        self.write_i32::<LittleEndian>(n)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn short_string_uses_single_byte_prefix() {
        let mut buf = Vec::new();
        buf.write_prefixed_string("cab-1").unwrap();
        assert_eq!(buf[0], 5);
        assert_eq!(&buf[1..], b"cab-1");
    }

    #[test]
    fn long_string_prefix_spans_bytes() {
        let value = "x".repeat(300);
        let mut buf = Vec::new();
        buf.write_prefixed_string(&value).unwrap();
        // 300 = 0b10_0101100 -> 0xAC 0x02
        assert_eq!(&buf[..2], &[0xAC, 0x02]);

        let mut cursor = Cursor::new(buf);
        assert_eq!(cursor.read_prefixed_string().unwrap(), value);
    }

    #[test]
    fn multibyte_utf8_length_counts_bytes() {
        let mut buf = Vec::new();
        buf.write_prefixed_string("é").unwrap();
        assert_eq!(buf, vec![2, 0xC3, 0xA9]);
    }

    #[test]
    fn overlong_prefix_is_rejected() {
        let mut cursor = Cursor::new(vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        assert!(matches!(
            cursor.read_7bit_len(),
            Err(MapError::InvalidStringLength)
        ));
    }

    #[test]
    fn negative_count_is_rejected() {
        let mut cursor = Cursor::new((-3i32).to_le_bytes().to_vec());
        assert!(matches!(cursor.read_count(10), Err(MapError::InvalidCount(-3))));
    }

    #[test]
    fn truncated_string_is_io_error() {
        let mut cursor = Cursor::new(vec![4, b'a', b'b']);
        assert!(matches!(cursor.read_prefixed_string(), Err(MapError::Io(_))));
    }
}
