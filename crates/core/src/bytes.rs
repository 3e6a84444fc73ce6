//! Little-endian accessors over byte slices.
//!
//! Every multi-byte field the guest can see is stored little-endian no matter
//! what the host CPU uses, so all reads and writes of shared memory go through
//! these helpers instead of casting pointers.

#[inline(always)]
pub fn read_u16_le(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

#[inline(always)]
pub fn read_i16_le(buf: &[u8], offset: usize) -> i16 {
    read_u16_le(buf, offset) as i16
}

#[inline(always)]
pub fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

#[inline(always)]
pub fn read_i32_le(buf: &[u8], offset: usize) -> i32 {
    read_u32_le(buf, offset) as i32
}

/// Read a little-endian IEEE 754 double.
#[inline(always)]
pub fn read_f64_le(buf: &[u8], offset: usize) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    f64::from_le_bytes(raw)
}

#[inline(always)]
pub fn write_u16_le(buf: &mut [u8], offset: usize, v: u16) {
    buf[offset..offset + 2].copy_from_slice(&v.to_le_bytes());
}

#[inline(always)]
pub fn write_i16_le(buf: &mut [u8], offset: usize, v: i16) {
    write_u16_le(buf, offset, v as u16);
}

#[inline(always)]
pub fn write_u32_le(buf: &mut [u8], offset: usize, v: u32) {
    buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u16_layout() {
        let mut buf = [0u8; 4];
        write_u16_le(&mut buf, 1, 0x1203);
        assert_eq!(buf, [0x00, 0x03, 0x12, 0x00]);
        assert_eq!(read_u16_le(&buf, 1), 0x1203);
    }

    #[test]
    fn test_u32_layout() {
        let mut buf = [0u8; 4];
        write_u32_le(&mut buf, 0, 0x00e0f8cf);
        assert_eq!(buf, [0xcf, 0xf8, 0xe0, 0x00]);
        assert_eq!(read_u32_le(&buf, 0), 0x00e0f8cf);
    }

    #[test]
    fn test_signed_values() {
        let mut buf = [0u8; 8];
        write_i16_le(&mut buf, 0, -2);
        assert_eq!(buf[..2], [0xfe, 0xff]);
        assert_eq!(read_i16_le(&buf, 0), -2);
        buf[4..8].copy_from_slice(&(-7i32).to_le_bytes());
        assert_eq!(read_i32_le(&buf, 4), -7);
    }

    #[test]
    fn test_f64() {
        let buf = 1.5f64.to_le_bytes();
        assert_eq!(read_f64_le(&buf, 0), 1.5);
    }
}
