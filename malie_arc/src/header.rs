//! LIBP container header (spec §3, §4.4).

pub const MAGIC: &[u8; 4] = b"LIBP";

/// Physical on-disk size of the header. The index table begins at this
/// absolute offset. See DESIGN.md for why this is 0x10 rather than the
/// 0x30/0x28 figures that appear elsewhere in the distilled description —
/// every concrete byte layout and the writer's `base_offset` arithmetic
/// agree on 0x10.
pub const HEADER_LEN: u64 = 0x10;

/// Index table entries are addressed in these units for the offset table.
pub const OFFSET_UNIT: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub total_entry_count: u32,
    pub file_entry_count: u32,
}

impl Header {
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_LEN as usize || &buf[0..4] != MAGIC {
            return None;
        }
        let total_entry_count = u32::from_le_bytes(buf[4..8].try_into().ok()?);
        let file_entry_count = u32::from_le_bytes(buf[8..12].try_into().ok()?);
        Some(Self {
            total_entry_count,
            file_entry_count,
        })
    }

    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&self.total_entry_count.to_le_bytes());
        buf.extend_from_slice(&self.file_entry_count.to_le_bytes());
        buf.extend_from_slice(&[0u8; 4]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let header = Header {
            total_entry_count: 3,
            file_entry_count: 2,
        };
        let mut buf = Vec::new();
        header.write_to(&mut buf);
        assert_eq!(buf.len(), HEADER_LEN as usize);
        assert_eq!(Header::parse(&buf), Some(header));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = vec![0u8; HEADER_LEN as usize];
        buf[0..4].copy_from_slice(b"NOPE");
        assert_eq!(Header::parse(&buf), None);
    }
}
