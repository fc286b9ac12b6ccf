use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt};

use crate::{ClassFileError, Result};

type Endian = BigEndian;

/// Forward-only big-endian reader that counts the bytes it has consumed.
///
/// Every read either yields exactly the requested width or fails with
/// [`ClassFileError::TruncatedInput`]. Nothing is buffered, so the wrapped
/// reader is never advanced past the last byte that was asked for.
pub struct ByteReader<R> {
    r: R,
    offset: u64,
}
impl<R: Read> ByteReader<R> {
    pub fn new(r: R) -> Self {
        Self { r, offset: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_inner(self) -> R {
        self.r
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let res = self.r.read_u8();
        self.track(1, res)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let res = self.r.read_u16::<Endian>();
        self.track(2, res)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let res = self.r.read_u32::<Endian>();
        self.track(4, res)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let res = self.r.read_u64::<Endian>();
        self.track(8, res)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    pub fn read_u16_vec(&mut self, count: u16) -> Result<Vec<u16>> {
        let mut values = vec![0u16; count as usize];
        let res = self.r.read_u16_into::<Endian>(&mut values);
        self.track(values.len() * 2, res)?;
        Ok(values)
    }

    /// Reads exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        // Lengths come straight from the input, so grow the buffer as bytes
        // arrive instead of allocating `len` up front.
        let mut bytes = Vec::new();
        let read = (&mut self.r).take(len as u64).read_to_end(&mut bytes)?;
        self.offset += read as u64;

        if read < len {
            return Err(ClassFileError::TruncatedInput {
                offset: self.offset,
                needed: len - read,
            });
        }

        Ok(bytes)
    }

    fn track<T>(&mut self, width: usize, res: io::Result<T>) -> Result<T> {
        match res {
            Ok(value) => {
                self.offset += width as u64;
                Ok(value)
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(ClassFileError::TruncatedInput {
                    offset: self.offset,
                    needed: width,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl<'a> ByteReader<&'a [u8]> {
    /// Borrows the next `len` bytes instead of copying them.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        let available = self.r.len();
        if available < len {
            self.r = &[];
            self.offset += available as u64;
            return Err(ClassFileError::TruncatedInput {
                offset: self.offset,
                needed: len - available,
            });
        }

        let (head, tail) = self.r.split_at(len);
        self.r = tail;
        self.offset += len as u64;
        Ok(head)
    }
}

#[cfg(test)]
mod byte_reader_tests {
    use super::*;

    #[test]
    fn it_should_read_big_endian_values() {
        let mut r = ByteReader::new(&[0x12, 0x34, 0xca, 0xfe, 0xba, 0xbe, 0x7f][..]);

        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0xcafebabe);
        assert_eq!(r.read_u8().unwrap(), 0x7f);
        assert_eq!(r.offset(), 7);
    }

    #[test]
    fn it_should_reinterpret_floating_point_bits() {
        let mut r = ByteReader::new(
            &[
                0x3f, 0xc0, 0x00, 0x00, // 1.5f
                0x7f, 0x80, 0x00, 0x00, // +inf
                0xc0, 0x09, 0x21, 0xfb, 0x54, 0x44, 0x2d, 0x18, // -pi
            ][..],
        );

        assert_eq!(r.read_f32().unwrap(), 1.5);
        assert_eq!(r.read_f32().unwrap(), f32::INFINITY);
        assert_eq!(r.read_f64().unwrap(), -std::f64::consts::PI);
    }

    #[test]
    fn it_should_read_signed_values() {
        let mut r = ByteReader::new(
            &[
                0xff, 0xff, 0xff, 0xfe, //
                0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            ][..],
        );

        assert_eq!(r.read_i32().unwrap(), -2);
        assert_eq!(r.read_i64().unwrap(), i64::MIN);
    }

    #[test]
    fn it_should_fail_on_a_short_read() {
        let mut r = ByteReader::new(&[0xca, 0xfe, 0xba][..]);

        assert!(matches!(
            r.read_u32(),
            Err(ClassFileError::TruncatedInput { needed: 4, .. })
        ));
    }

    #[test]
    fn it_should_fail_when_raw_bytes_run_out() {
        let mut r = ByteReader::new(&[1, 2, 3][..]);

        assert!(matches!(
            r.read_bytes(5),
            Err(ClassFileError::TruncatedInput {
                offset: 3,
                needed: 2
            })
        ));
    }

    #[test]
    fn it_should_borrow_slices_from_the_input() {
        let data = [0x00, 0x01, 0x2a, 0xb1, 0xff];
        let mut r = ByteReader::new(&data[..]);

        assert_eq!(r.read_u16().unwrap(), 1);
        let code = r.read_slice(2).unwrap();
        assert_eq!(code, &[0x2a, 0xb1]);
        assert!(std::ptr::eq(code.as_ptr(), data[2..].as_ptr()));
        assert_eq!(r.offset(), 4);
        assert_eq!(r.read_u8().unwrap(), 0xff);
    }

    #[test]
    fn it_should_fail_when_a_slice_runs_out() {
        let mut r = ByteReader::new(&[1, 2, 3][..]);

        assert!(matches!(
            r.read_slice(5),
            Err(ClassFileError::TruncatedInput {
                offset: 3,
                needed: 2
            })
        ));
    }

    #[test]
    fn it_should_not_read_past_what_was_asked_for() {
        let data = [0x00, 0x02, 0x00, 0x03, 0xff];
        let mut input = &data[..];

        let mut r = ByteReader::new(&mut input);
        assert_eq!(r.read_u16_vec(2).unwrap(), vec![2, 3]);
        assert_eq!(r.offset(), 4);

        assert_eq!(input, &[0xff]);
    }
}
