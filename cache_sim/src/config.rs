use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::addr::Geometry;

/// Cycles charged for a backing-store access on a miss.
pub const DEFAULT_MEMORY_PENALTY: u32 = 150;

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum WritePolicy {
    #[default]
    WriteThrough,
    WriteBack,
}

impl WritePolicy {
    /// `"WB"` selects write-back; every other token means write-through.
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "WB" => WritePolicy::WriteBack,
            "WT" => WritePolicy::WriteThrough,
            other => {
                log::warn!("unknown write policy {other:?}, falling back to write-through");
                WritePolicy::WriteThrough
            }
        }
    }
    pub fn token(self) -> &'static str {
        match self {
            WritePolicy::WriteThrough => "WT",
            WritePolicy::WriteBack => "WB",
        }
    }
}

impl From<String> for WritePolicy {
    fn from(s: String) -> Self {
        Self::from_token(&s)
    }
}

impl From<WritePolicy> for &'static str {
    fn from(p: WritePolicy) -> Self {
        p.token()
    }
}

impl fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WritePolicy::WriteThrough => write!(f, "write-through"),
            WritePolicy::WriteBack => write!(f, "write-back"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cache size must be positive")]
    ZeroCacheSize,
    #[error("line size must be positive")]
    ZeroLineSize,
    #[error("line size {line_size} exceeds cache size {cache_size}")]
    LineLargerThanCache { cache_size: u32, line_size: u32 },
    #[error("line size {line_size} does not evenly divide cache size {cache_size}")]
    NotDivisible { cache_size: u32, line_size: u32 },
    #[error("failed to read configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// in bytes
    pub cache_size: u32,
    /// in bytes
    pub line_size: u32,
    pub access_cycles: u32,
    #[serde(default)]
    pub hit_policy: WritePolicy,
    #[serde(default)]
    pub miss_policy: WritePolicy,
    #[serde(default = "default_memory_penalty")]
    pub memory_penalty: u32,
}

fn default_memory_penalty() -> u32 {
    DEFAULT_MEMORY_PENALTY
}

impl CacheConfig {
    pub fn new(
        cache_size: u32,
        line_size: u32,
        access_cycles: u32,
        hit_policy: WritePolicy,
        miss_policy: WritePolicy,
    ) -> Self {
        Self {
            cache_size,
            line_size,
            access_cycles,
            hit_policy,
            miss_policy,
            memory_penalty: DEFAULT_MEMORY_PENALTY,
        }
    }

    pub fn with_memory_penalty(self, memory_penalty: u32) -> Self {
        Self {
            memory_penalty,
            ..self
        }
    }

    /// Checks the geometry and derives the line count from it.
    pub fn geometry(&self) -> Result<Geometry, ConfigError> {
        let Self {
            cache_size,
            line_size,
            ..
        } = *self;
        if cache_size == 0 {
            return Err(ConfigError::ZeroCacheSize);
        }
        if line_size == 0 {
            return Err(ConfigError::ZeroLineSize);
        }
        if line_size > cache_size {
            return Err(ConfigError::LineLargerThanCache {
                cache_size,
                line_size,
            });
        }
        if cache_size % line_size != 0 {
            return Err(ConfigError::NotDivisible {
                cache_size,
                line_size,
            });
        }
        Geometry::new(line_size, cache_size / line_size).map_err(|_| ConfigError::ZeroLineSize)
    }

    pub fn deser(file: impl std::io::Read) -> Result<Self, ConfigError> {
        Ok(serde_json::from_reader(file)?)
    }
}

impl fmt::Display for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  cache size: {:>10} bytes", self.cache_size)?;
        writeln!(f, "   line size: {:>10} bytes", self.line_size)?;
        writeln!(f, "  access time: {:>9} cycles", self.access_cycles)?;
        writeln!(f, "  miss penalty: {:>8} cycles", self.memory_penalty)?;
        writeln!(f, "  on hit write: {}", self.hit_policy)?;
        write!(f, "  on miss write: {}", self.miss_policy)
    }
}
