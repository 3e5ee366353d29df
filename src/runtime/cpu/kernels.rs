//! Native host kernels
//!
//! Each kernel mirrors one `__kernel` entry point of the synthesized source
//! and is resolved by name when a program is built.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use super::CpuBuffer;
use crate::cipher::{Rounds, threefry2x32};
use crate::kernel::{ENTRY_POINT, arg};

/// Kind of a positional kernel parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ParamKind {
    /// `__global uint *`
    Buffer,
    /// `const uint`
    U32,
}

/// A bound argument value
#[derive(Clone, Debug)]
pub(crate) enum ArgValue {
    Buffer(CpuBuffer),
    U32(u32),
}

impl ArgValue {
    fn buffer(&self) -> Option<&CpuBuffer> {
        match self {
            ArgValue::Buffer(b) => Some(b),
            ArgValue::U32(_) => None,
        }
    }

    fn scalar(&self) -> Option<u32> {
        match self {
            ArgValue::U32(v) => Some(*v),
            ArgValue::Buffer(_) => None,
        }
    }
}

/// A native implementation of an entry point
#[derive(Clone, Copy)]
pub(crate) struct HostKernel {
    pub name: &'static str,
    pub params: &'static [ParamKind],
    pub run: fn(&[ArgValue], u32),
}

impl std::fmt::Debug for HostKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostKernel")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

const GENERATE_RNG_PARAMS: [ParamKind; 6] = [
    ParamKind::Buffer,
    ParamKind::Buffer,
    ParamKind::Buffer,
    ParamKind::U32,
    ParamKind::U32,
    ParamKind::U32,
];

/// Host kernels available to program builds
pub(crate) const HOST_KERNELS: &[HostKernel] = &[HostKernel {
    name: ENTRY_POINT,
    params: &GENERATE_RNG_PARAMS,
    run: generate_rng,
}];

/// Resolve an entry point name to its host kernel
pub(crate) fn lookup(name: &str) -> Option<HostKernel> {
    HOST_KERNELS.iter().find(|k| k.name == name).copied()
}

/// Host `generate_rng`: Threefry-2x32 over blocks `[offset, offset + count)`
///
/// Work items past the end of either buffer are skipped, where a device
/// would read or write out of bounds. Out-of-range round counts make the
/// launch a no-op, matching the device guard.
fn generate_rng(args: &[ArgValue], global_size: u32) {
    let (Some(ctr), Some(key), Some(out)) = (
        args[arg::COUNTERS as usize].buffer(),
        args[arg::KEY as usize].buffer(),
        args[arg::OUTPUT as usize].buffer(),
    ) else {
        return;
    };
    let (Some(offset), Some(count), Some(rounds)) = (
        args[arg::OFFSET as usize].scalar(),
        args[arg::COUNT as usize].scalar(),
        args[arg::ROUNDS as usize].scalar(),
    ) else {
        return;
    };
    let Ok(rounds) = Rounds::try_from(rounds) else {
        return;
    };

    let key_words = key.read_range(0, 2);
    if key_words.len() < 2 {
        return;
    }
    let key = [key_words[0], key_words[1]];

    let items = global_size.min(count) as usize;
    let start = 2 * offset as usize;
    let counters = ctr.read_range(start, start + 2 * items);
    let mut mixed = vec![0u32; counters.len() & !1];

    #[cfg(feature = "rayon")]
    mixed
        .par_chunks_mut(2)
        .zip(counters.par_chunks_exact(2))
        .for_each(|(o, c)| o.copy_from_slice(&threefry2x32([c[0], c[1]], key, rounds)));

    #[cfg(not(feature = "rayon"))]
    mixed
        .chunks_mut(2)
        .zip(counters.chunks_exact(2))
        .for_each(|(o, c)| o.copy_from_slice(&threefry2x32([c[0], c[1]], key, rounds)));

    out.write_at(start, &mixed);
}
