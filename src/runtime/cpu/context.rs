//! CPU context

use std::fmt;
use std::sync::Arc;

use super::{CpuBuffer, CpuProgram, CpuQueue};
use crate::runtime::{ComputeContext, ContextId, ProgramCache};

struct ContextInner {
    id: ContextId,
    cache: ProgramCache<CpuProgram>,
}

/// Host execution domain
///
/// Cloning the handle shares the context and its program cache; two
/// contexts created with [`CpuContext::new`] are distinct and never share
/// compiled programs.
#[derive(Clone)]
pub struct CpuContext {
    inner: Arc<ContextInner>,
}

impl CpuContext {
    /// Create a new, empty context
    pub fn new() -> Self {
        let id = ContextId::next();
        tracing::debug!(%id, "created cpu context");
        Self {
            inner: Arc::new(ContextInner {
                id,
                cache: ProgramCache::new(),
            }),
        }
    }

    /// The program cache owned by this context
    pub fn program_cache(&self) -> &ProgramCache<CpuProgram> {
        &self.inner.cache
    }

    /// Create an in-order queue bound to this context
    pub fn create_queue(&self) -> CpuQueue {
        CpuQueue::new(self.clone())
    }

    /// Allocate a zeroed buffer of `len` words
    pub fn create_buffer(&self, len: usize) -> CpuBuffer {
        CpuBuffer::zeroed(self.inner.id, len)
    }

    /// Allocate a buffer initialized from `data`
    pub fn buffer_from_slice(&self, data: &[u32]) -> CpuBuffer {
        CpuBuffer::from_slice(self.inner.id, data)
    }
}

impl Default for CpuContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeContext for CpuContext {
    fn id(&self) -> ContextId {
        self.inner.id
    }
}

impl fmt::Debug for CpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuContext")
            .field("id", &self.inner.id)
            .field("programs", &self.inner.cache.len())
            .finish()
    }
}
