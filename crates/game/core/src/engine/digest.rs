use std::fmt;

use arrayvec::ArrayVec;
use sha2::{Digest, Sha256};

use crate::config::EngineConfig;
use crate::effect::{ActiveEffects, EffectInstance};

/// SHA-256 over the active-effect state at the end of a frame.
///
/// Two runs that feed identical requests through identical content produce
/// identical digests; replay tooling compares these frame by frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameDigest(pub [u8; 32]);

impl FrameDigest {
    pub fn compute(frame: u64, active: &ActiveEffects) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(frame.to_le_bytes());

        // Hash order is id order, independent of how the container was shuffled.
        let mut instances: ArrayVec<&EffectInstance, { EngineConfig::MAX_ACTIVE_EFFECTS }> =
            active.iter().collect();
        instances.sort_unstable_by_key(|instance| instance.id);

        for instance in instances {
            hasher.update(instance.id.0.to_le_bytes());
            hasher.update(instance.template.0.to_le_bytes());
            hasher.update(instance.root.0.to_le_bytes());
            for entity in [instance.source, instance.target] {
                hasher.update(entity.index().to_le_bytes());
                hasher.update(entity.generation().to_le_bytes());
            }
            hasher.update(instance.stacks.to_le_bytes());
            hasher.update(instance.expires_at.map_or(u64::MAX, |tick| tick.0).to_le_bytes());
            hasher.update(instance.next_period.map_or(u64::MAX, |tick| tick.0).to_le_bytes());
            for applied in &instance.applied {
                hasher.update(applied.attribute.0.to_le_bytes());
                hasher.update(applied.delta.to_le_bytes());
            }
            for granted in &instance.granted {
                hasher.update([granted.tag.get()]);
                hasher.update(granted.stacks.to_le_bytes());
            }
        }

        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for FrameDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
