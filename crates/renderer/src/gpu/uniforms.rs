use crate::device::{UniformLocation, UniformValue};

/// CPU mirror of one program's uniform block.
///
/// Values persist between frames the way GL program state does; the whole
/// block is copied to the GPU before each draw.
#[derive(Debug, Clone)]
pub(crate) struct UniformStorage {
    bytes: Vec<u8>,
}

impl UniformStorage {
    /// Zeroed storage for a block of `size` bytes, rounded up to 16.
    pub fn new(size: u32) -> Self {
        let padded = (size.max(16) + 15) & !15;
        Self {
            bytes: vec![0; padded as usize],
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Writes `value` at `location`. Values larger than the member are
    /// truncated to the member size; writes past the block are dropped.
    pub fn write(&mut self, location: UniformLocation, value: UniformValue) -> bool {
        let encoded = value.to_bytes();
        let len = encoded.len().min(location.size as usize);
        let start = location.offset as usize;
        let Some(slot) = self.bytes.get_mut(start..start + len) else {
            tracing::warn!(
                offset = location.offset,
                len,
                block = self.bytes.len(),
                "uniform write outside block ignored"
            );
            return false;
        };
        slot.copy_from_slice(&encoded[..len]);
        true
    }
}
