use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tile::Partition;

/// Tunables for the tiled renderer.
///
/// Missing fields fall back to their defaults when loaded from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Worker threads in the render pool. `0` means one per available core.
    #[serde(default)]
    pub workers: usize,
    #[serde(default)]
    pub partition: Partition,
    /// Wall-clock budget for a single render in milliseconds. `0` disables it.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            workers: 0,
            partition: Partition::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RenderSettings {
    /// Resolved pool size.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let s: RenderSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, RenderSettings::default());
        assert_eq!(s.timeout(), Some(Duration::from_secs(30)));
        assert!(s.worker_count() >= 1);
    }

    #[test]
    fn explicit_fields_are_kept() {
        let s: RenderSettings = serde_json::from_str(
            r#"{"workers":3,"partition":{"kind":"quadtree","max_tile_area":500},"timeout_ms":0}"#,
        )
        .unwrap();
        assert_eq!(s.worker_count(), 3);
        assert_eq!(s.partition, Partition::Quadtree { max_tile_area: 500 });
        assert_eq!(s.timeout(), None);
    }
}
