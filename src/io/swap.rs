//! Byte-swapping block transfer for the big-endian SEVIRI formats.
//!
//! Every record in a native or HRIT product is a fixed sequence of
//! big-endian primitives. A [`Transfer`] moves one block of elements in
//! either direction and swaps each element in place when the host is
//! little-endian. Records implement [`Record`] once and use the same code
//! path for reading and writing.

use crate::types::{SeviriError, SeviriResult};
use byteorder::{ByteOrder, NativeEndian};
use std::io::{Read, Seek, SeekFrom, Write};

/// Largest repeat count of any array in the native format (the generalized
/// time blobs of the celestial events record).
pub const MAX_TRANSFER_ELEMENTS: usize = 134915;

/// Direction of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Runtime host endianness
pub fn host_is_little_endian() -> bool {
    cfg!(target_endian = "little")
}

fn valid_element_size(size: usize) -> bool {
    matches!(size, 1 | 2 | 4 | 8)
}

fn swap_elements(buf: &mut [u8], size: usize) {
    if size > 1 {
        for element in buf.chunks_exact_mut(size) {
            element.reverse();
        }
    }
}

/// Block transfer of fixed-size elements with conditional byte swapping.
///
/// `transfer` moves `count` elements of `size` bytes held in `buf` and
/// returns the number of elements transferred. Element sizes other than
/// 1, 2, 4 and 8 are reported and transfer nothing.
pub trait Transfer {
    fn direction(&self) -> Direction;

    fn swap_bytes(&self) -> bool;

    fn set_swap_bytes(&mut self, swap: bool);

    fn transfer(&mut self, buf: &mut [u8], size: usize, count: usize) -> SeviriResult<usize>;

    /// Run `f` with swapping forced to `swap`, restoring the previous
    /// setting afterwards. Packet headers are stored in host order.
    fn with_swap<F>(&mut self, swap: bool, f: F) -> SeviriResult<()>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> SeviriResult<()>,
    {
        let previous = self.swap_bytes();
        self.set_swap_bytes(swap);
        let result = f(self);
        self.set_swap_bytes(previous);
        result
    }

    fn u8(&mut self, v: &mut u8) -> SeviriResult<()> {
        let mut b = [*v];
        self.transfer(&mut b, 1, 1)?;
        *v = b[0];
        Ok(())
    }

    /// Raw bytes: character fields, flag arrays and opaque blobs
    fn bytes(&mut self, v: &mut [u8]) -> SeviriResult<()> {
        let n = v.len();
        self.transfer(v, 1, n)?;
        Ok(())
    }

    fn i16(&mut self, v: &mut i16) -> SeviriResult<()> {
        let mut b = [0u8; 2];
        NativeEndian::write_i16(&mut b, *v);
        self.transfer(&mut b, 2, 1)?;
        *v = NativeEndian::read_i16(&b);
        Ok(())
    }

    fn u16(&mut self, v: &mut u16) -> SeviriResult<()> {
        let mut b = [0u8; 2];
        NativeEndian::write_u16(&mut b, *v);
        self.transfer(&mut b, 2, 1)?;
        *v = NativeEndian::read_u16(&b);
        Ok(())
    }

    fn i32(&mut self, v: &mut i32) -> SeviriResult<()> {
        let mut b = [0u8; 4];
        NativeEndian::write_i32(&mut b, *v);
        self.transfer(&mut b, 4, 1)?;
        *v = NativeEndian::read_i32(&b);
        Ok(())
    }

    fn u32(&mut self, v: &mut u32) -> SeviriResult<()> {
        let mut b = [0u8; 4];
        NativeEndian::write_u32(&mut b, *v);
        self.transfer(&mut b, 4, 1)?;
        *v = NativeEndian::read_u32(&b);
        Ok(())
    }

    fn f32(&mut self, v: &mut f32) -> SeviriResult<()> {
        let mut b = [0u8; 4];
        NativeEndian::write_f32(&mut b, *v);
        self.transfer(&mut b, 4, 1)?;
        *v = NativeEndian::read_f32(&b);
        Ok(())
    }

    fn f64(&mut self, v: &mut f64) -> SeviriResult<()> {
        let mut b = [0u8; 8];
        NativeEndian::write_f64(&mut b, *v);
        self.transfer(&mut b, 8, 1)?;
        *v = NativeEndian::read_f64(&b);
        Ok(())
    }

    fn i16s(&mut self, v: &mut [i16]) -> SeviriResult<()> {
        let mut b = vec![0u8; v.len() * 2];
        NativeEndian::write_i16_into(v, &mut b);
        self.transfer(&mut b, 2, v.len())?;
        NativeEndian::read_i16_into(&b, v);
        Ok(())
    }

    fn u16s(&mut self, v: &mut [u16]) -> SeviriResult<()> {
        let mut b = vec![0u8; v.len() * 2];
        NativeEndian::write_u16_into(v, &mut b);
        self.transfer(&mut b, 2, v.len())?;
        NativeEndian::read_u16_into(&b, v);
        Ok(())
    }

    fn i32s(&mut self, v: &mut [i32]) -> SeviriResult<()> {
        let mut b = vec![0u8; v.len() * 4];
        NativeEndian::write_i32_into(v, &mut b);
        self.transfer(&mut b, 4, v.len())?;
        NativeEndian::read_i32_into(&b, v);
        Ok(())
    }

    fn u32s(&mut self, v: &mut [u32]) -> SeviriResult<()> {
        let mut b = vec![0u8; v.len() * 4];
        NativeEndian::write_u32_into(v, &mut b);
        self.transfer(&mut b, 4, v.len())?;
        NativeEndian::read_u32_into(&b, v);
        Ok(())
    }

    fn f32s(&mut self, v: &mut [f32]) -> SeviriResult<()> {
        let mut b = vec![0u8; v.len() * 4];
        NativeEndian::write_f32_into(v, &mut b);
        self.transfer(&mut b, 4, v.len())?;
        NativeEndian::read_f32_into(&b, v);
        Ok(())
    }

    fn f64s(&mut self, v: &mut [f64]) -> SeviriResult<()> {
        let mut b = vec![0u8; v.len() * 8];
        NativeEndian::write_f64_into(v, &mut b);
        self.transfer(&mut b, 8, v.len())?;
        NativeEndian::read_f64_into(&b, v);
        Ok(())
    }

    /// Transfer every record of a fixed-length table in order
    fn records<R: Record>(&mut self, v: &mut [R]) -> SeviriResult<()>
    where
        Self: Sized,
    {
        for record in v.iter_mut() {
            record.transfer(self)?;
        }
        Ok(())
    }
}

/// A fixed-layout record that is read and written by the same field walk.
pub trait Record {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()>;
}

/// Read a default-initialized record from `io`
pub fn read_record<R: Record + Default, T: Transfer>(io: &mut T) -> SeviriResult<R> {
    let mut record = R::default();
    record.transfer(io)?;
    Ok(record)
}

fn transfer_failed(e: std::io::Error, direction: Direction, wanted: usize) -> SeviriError {
    match (e.kind(), direction) {
        (std::io::ErrorKind::UnexpectedEof, Direction::Read) => {
            log::error!("end of file reached while reading {} bytes", wanted)
        }
        (_, Direction::Read) => log::error!("error reading {} bytes: {}", wanted, e),
        (_, Direction::Write) => log::error!("error writing {} bytes: {}", wanted, e),
    }
    SeviriError::Io(e)
}

/// Reading side of the adapter
pub struct SwapReader<R: Read> {
    inner: R,
    swap_bytes: bool,
}

impl<R: Read> SwapReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            swap_bytes: host_is_little_endian(),
        }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> SwapReader<R> {
    pub fn seek(&mut self, pos: SeekFrom) -> SeviriResult<u64> {
        Ok(self.inner.seek(pos)?)
    }

    pub fn position(&mut self) -> SeviriResult<u64> {
        Ok(self.inner.stream_position()?)
    }
}

impl<R: Read> Transfer for SwapReader<R> {
    fn direction(&self) -> Direction {
        Direction::Read
    }

    fn swap_bytes(&self) -> bool {
        self.swap_bytes
    }

    fn set_swap_bytes(&mut self, swap: bool) {
        self.swap_bytes = swap;
    }

    fn transfer(&mut self, buf: &mut [u8], size: usize, count: usize) -> SeviriResult<usize> {
        if !valid_element_size(size) {
            log::error!("invalid element size for transfer: {}", size);
            return Ok(0);
        }
        let n = size * count;
        self.inner
            .read_exact(&mut buf[..n])
            .map_err(|e| transfer_failed(e, Direction::Read, n))?;
        if self.swap_bytes {
            swap_elements(&mut buf[..n], size);
        }
        Ok(count)
    }
}

/// Writing side of the adapter. Swapping goes through a scratch buffer so
/// the caller's data is never modified.
pub struct SwapWriter<W: Write> {
    inner: W,
    swap_bytes: bool,
    scratch: Vec<u8>,
}

impl<W: Write> SwapWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            swap_bytes: host_is_little_endian(),
            scratch: Vec::with_capacity(MAX_TRANSFER_ELEMENTS),
        }
    }

    pub fn flush(&mut self) -> SeviriResult<()> {
        Ok(self.inner.flush()?)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Transfer for SwapWriter<W> {
    fn direction(&self) -> Direction {
        Direction::Write
    }

    fn swap_bytes(&self) -> bool {
        self.swap_bytes
    }

    fn set_swap_bytes(&mut self, swap: bool) {
        self.swap_bytes = swap;
    }

    fn transfer(&mut self, buf: &mut [u8], size: usize, count: usize) -> SeviriResult<usize> {
        if !valid_element_size(size) {
            log::error!("invalid element size for transfer: {}", size);
            return Ok(0);
        }
        let n = size * count;
        let result = if self.swap_bytes && size > 1 {
            self.scratch.clear();
            self.scratch.extend_from_slice(&buf[..n]);
            swap_elements(&mut self.scratch, size);
            self.inner.write_all(&self.scratch)
        } else {
            self.inner.write_all(&buf[..n])
        };
        result.map_err(|e| transfer_failed(e, Direction::Write, n))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reader_decodes_big_endian() {
        let bytes = vec![0x01, 0x02, 0x00, 0x00, 0x00, 0x2A, 0x3F, 0x80, 0x00, 0x00];
        let mut io = SwapReader::new(Cursor::new(bytes));
        io.set_swap_bytes(host_is_little_endian());

        let mut a = 0u16;
        let mut b = 0u32;
        let mut c = 0f32;
        io.u16(&mut a).unwrap();
        io.u32(&mut b).unwrap();
        io.f32(&mut c).unwrap();

        assert_eq!(a, 0x0102);
        assert_eq!(b, 42);
        assert_eq!(c, 1.0);
    }

    #[test]
    fn test_writer_leaves_caller_buffer_untouched() {
        let mut io = SwapWriter::new(Vec::new());
        io.set_swap_bytes(true);
        let mut buf = [1u8, 2, 3, 4];
        assert_eq!(io.transfer(&mut buf, 2, 2).unwrap(), 2);
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(io.into_inner(), vec![2, 1, 4, 3]);
    }

    #[test]
    fn test_short_read_is_an_error() {
        let mut io = SwapReader::new(Cursor::new(vec![0u8; 3]));
        let mut v = 0u32;
        assert!(matches!(io.u32(&mut v), Err(SeviriError::Io(_))));
    }

    #[test]
    fn test_invalid_element_size_transfers_nothing() {
        let mut io = SwapReader::new(Cursor::new(vec![0u8; 16]));
        let mut buf = [0u8; 6];
        assert_eq!(io.transfer(&mut buf, 3, 2).unwrap(), 0);
        assert_eq!(io.position().unwrap(), 0);
    }

    #[test]
    fn test_with_swap_restores_setting() {
        let mut io = SwapReader::new(Cursor::new(vec![0x01, 0x00]));
        io.set_swap_bytes(true);
        let mut v = 0u16;
        io.with_swap(false, |io| io.u16(&mut v)).unwrap();
        assert!(io.swap_bytes());
        assert_eq!(v, u16::from_ne_bytes([0x01, 0x00]));
    }
}
