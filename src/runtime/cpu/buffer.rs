//! CPU device buffers

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use crate::runtime::{ContextId, DeviceBuffer};

/// Host-resident buffer of `u32` words
///
/// Clones share storage, like a device memory handle.
#[derive(Clone)]
pub struct CpuBuffer {
    context: ContextId,
    data: Arc<RwLock<Vec<u32>>>,
}

impl CpuBuffer {
    pub(crate) fn zeroed(context: ContextId, len: usize) -> Self {
        Self {
            context,
            data: Arc::new(RwLock::new(vec![0; len])),
        }
    }

    pub(crate) fn from_slice(context: ContextId, data: &[u32]) -> Self {
        Self {
            context,
            data: Arc::new(RwLock::new(data.to_vec())),
        }
    }

    /// Copy the buffer contents to the host
    ///
    /// Does not wait for pending work; finish the queue first.
    pub fn to_vec(&self) -> Vec<u32> {
        self.data.read().clone()
    }

    /// Overwrite the buffer starting at word 0
    ///
    /// Words past `data.len()` are left unchanged; excess input is ignored.
    pub fn write(&self, data: &[u32]) {
        let mut guard = self.data.write();
        let n = guard.len().min(data.len());
        guard[..n].copy_from_slice(&data[..n]);
    }

    /// Copy words `[start, end)` out of the buffer, clamped to its length
    pub(crate) fn read_range(&self, start: usize, end: usize) -> Vec<u32> {
        let guard = self.data.read();
        let end = end.min(guard.len());
        let start = start.min(end);
        guard[start..end].to_vec()
    }

    /// Write `words` at word offset `start`, clamped to the buffer length
    pub(crate) fn write_at(&self, start: usize, words: &[u32]) {
        let mut guard = self.data.write();
        let end = (start + words.len()).min(guard.len());
        if start < end {
            guard[start..end].copy_from_slice(&words[..end - start]);
        }
    }
}

impl DeviceBuffer for CpuBuffer {
    fn len(&self) -> usize {
        self.data.read().len()
    }

    fn context_id(&self) -> ContextId {
        self.context
    }
}

impl fmt::Debug for CpuBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuBuffer")
            .field("context", &self.context)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_storage() {
        let buf = CpuBuffer::zeroed(ContextId::next(), 4);
        let alias = buf.clone();
        alias.write(&[1, 2, 3, 4, 5]);
        assert_eq!(buf.to_vec(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_ranges_are_clamped() {
        let buf = CpuBuffer::from_slice(ContextId::next(), &[1, 2, 3]);
        assert_eq!(buf.read_range(1, 10), vec![2, 3]);
        assert!(buf.read_range(5, 10).is_empty());
        buf.write_at(2, &[9, 9]);
        assert_eq!(buf.to_vec(), vec![1, 2, 9]);
    }
}
