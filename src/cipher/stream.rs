//! Host-side counter-mode stream over Threefry-2x32

use rand_core::{RngCore, SeedableRng, impls};

use super::{Counter, Key, Rounds, counter2x32, threefry2x32};

/// Sequential generator built on Threefry-2x32
///
/// Block `n` of the stream is `threefry2x32(counter2x32(n), key, rounds)`,
/// which is exactly what the device kernel writes for block `n`, so a host
/// stream positioned with [`ThreefryRng::set_counter`] reproduces a device
/// range word for word. Words are served low word first.
#[derive(Clone, Debug)]
pub struct ThreefryRng {
    key: Key<u32>,
    rounds: Rounds,
    counter: u64,
    block: [u32; 2],
    index: usize,
}

impl ThreefryRng {
    /// Create a stream for `key` starting at counter zero
    pub fn new(key: Key<u32>) -> Self {
        Self::with_rounds(key, Rounds::DEFAULT)
    }

    /// Create a stream with a non-default round count
    pub fn with_rounds(key: Key<u32>, rounds: Rounds) -> Self {
        Self {
            key,
            rounds,
            counter: 0,
            block: [0; 2],
            index: 2,
        }
    }

    /// The key selecting this stream
    pub fn key(&self) -> Key<u32> {
        self.key
    }

    /// Counter of the next block to be generated
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Jump to block `counter`, discarding any buffered words
    pub fn set_counter(&mut self, counter: u64) {
        self.counter = counter;
        self.index = 2;
    }

    /// Generate the next full block, bypassing the word buffer
    pub fn next_block(&mut self) -> [u32; 2] {
        let ctr: Counter<u32> = counter2x32(self.counter);
        self.counter = self.counter.wrapping_add(1);
        threefry2x32(ctr, self.key, self.rounds)
    }
}

impl RngCore for ThreefryRng {
    fn next_u32(&mut self) -> u32 {
        if self.index >= 2 {
            self.block = self.next_block();
            self.index = 0;
        }
        let v = self.block[self.index];
        self.index += 1;
        v
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        impls::fill_bytes_via_next(self, dst)
    }
}

impl SeedableRng for ThreefryRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        let k0 = u32::from_le_bytes([seed[0], seed[1], seed[2], seed[3]]);
        let k1 = u32::from_le_bytes([seed[4], seed[5], seed[6], seed[7]]);
        Self::new([k0, k1])
    }
}
