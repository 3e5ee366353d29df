//! Engine configuration

use crate::cipher::Rounds;
use crate::error::{Error, Result};
use crate::kernel::WORKGROUP_SIZE;

/// Runtime configuration for a [`ThreefryEngine`](super::ThreefryEngine)
///
/// The round count is a kernel argument, not part of the compiled program,
/// so engines with different configurations still share one cached build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Mixing rounds per block
    pub rounds: Rounds,
    /// Local work size for dispatches
    pub local_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rounds: Rounds::DEFAULT,
            local_size: WORKGROUP_SIZE,
        }
    }
}

impl EngineConfig {
    /// Set the round count
    ///
    /// # Errors
    ///
    /// Returns `InvalidRoundCount` for values outside `[0, 32]`.
    pub fn rounds(mut self, rounds: i64) -> Result<Self> {
        self.rounds = Rounds::new(rounds)?;
        Ok(self)
    }

    /// Set the local work size
    ///
    /// WGSL fixes the workgroup size at compile time, so the wgpu backend
    /// only accepts [`WORKGROUP_SIZE`].
    pub fn local_size(mut self, local_size: u32) -> Result<Self> {
        if local_size == 0 {
            return Err(Error::argument("local_size", "must be non-zero"));
        }
        self.local_size = local_size;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.rounds.get(), 20);
        assert_eq!(cfg.local_size, 256);
    }

    #[test]
    fn test_builder_validates() {
        let cfg = EngineConfig::default().rounds(13).unwrap().local_size(64).unwrap();
        assert_eq!(cfg.rounds.get(), 13);
        assert_eq!(cfg.local_size, 64);

        assert!(matches!(
            EngineConfig::default().rounds(33),
            Err(Error::InvalidRoundCount { rounds: 33 })
        ));
        assert!(EngineConfig::default().local_size(0).is_err());
    }
}
