use serde::Serialize;

use crate::{
    access::{AccessKind, AccessRecord},
    addr::{Addr, Geometry},
    cache::CacheStore,
    config::{CacheConfig, ConfigError, WritePolicy},
    stat::{AddStats, CacheStat, Stats},
};

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct Counters {
    pub accesses: u64,
    pub reads: u64,
    pub writes: u64,
    pub hits: u64,
    pub misses: u64,
}

impl Counters {
    fn record(&mut self, kind: AccessKind, hit: bool) {
        self.accesses += 1;
        match kind {
            AccessKind::Read => self.reads += 1,
            AccessKind::Write => self.writes += 1,
        }
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
}

/// Previous occupant of a line displaced by a conflict miss.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Evicted {
    pub tag: u32,
    pub dirty: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AccessOutcome {
    pub address: Addr,
    pub kind: AccessKind,
    pub index: usize,
    pub tag: u32,
    pub hit: bool,
    /// set when a valid line holding another block was overwritten
    pub evicted: Option<Evicted>,
    wrote_through: bool,
}

impl AccessOutcome {
    /// The write went straight to the backing store.
    pub fn wrote_through(&self) -> bool {
        self.wrote_through
    }
    /// A dirty block was overwritten without being flushed.
    pub fn lost_dirty(&self) -> bool {
        matches!(self.evicted, Some(Evicted { dirty: true, .. }))
    }
}

/// One simulation run: the line table, its counters and the fixed policies.
pub struct Session {
    config: CacheConfig,
    store: CacheStore,
    counters: Counters,
}

impl Session {
    pub fn new(config: CacheConfig) -> Result<Self, ConfigError> {
        let geometry = config.geometry()?;
        log::info!(
            "cache: {} lines of {} bytes, hit write {}, miss write {}",
            geometry.num_lines(),
            geometry.line_size(),
            config.hit_policy,
            config.miss_policy
        );
        Ok(Self {
            config,
            store: CacheStore::new(geometry),
            counters: Counters::default(),
        })
    }
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
    pub fn geometry(&self) -> Geometry {
        self.store.geometry()
    }
    pub fn store(&self) -> &CacheStore {
        &self.store
    }
    pub fn counters(&self) -> Counters {
        self.counters
    }
    pub fn cache_stat(&self) -> CacheStat {
        CacheStat::from_counters(
            self.counters,
            self.config.access_cycles,
            self.config.memory_penalty,
        )
    }

    pub fn access(&mut self, record: AccessRecord) -> AccessOutcome {
        let AccessRecord { address, kind } = record;
        let geometry = self.store.geometry();
        let index = geometry.index_of(address);
        let tag = geometry.tag_of(address);
        let hit = self.store.is_hit(index, tag);
        self.counters.record(kind, hit);

        let line = *self.store.line(index);
        let evicted = (!hit && line.valid).then_some(Evicted {
            tag: line.tag,
            dirty: line.dirty,
        });
        let mut wrote_through = false;
        match (hit, kind) {
            (true, AccessKind::Read) => {}
            (true, AccessKind::Write) => match self.config.hit_policy {
                WritePolicy::WriteBack => self.store.mark_dirty(index),
                // dirty flag stays as it was
                WritePolicy::WriteThrough => wrote_through = true,
            },
            (false, AccessKind::Read) => self.store.load_line(index, tag),
            (false, AccessKind::Write) => {
                self.store.load_line(index, tag);
                match self.config.miss_policy {
                    WritePolicy::WriteBack => self.store.mark_dirty(index),
                    WritePolicy::WriteThrough => wrote_through = true,
                }
            }
        }

        let outcome = AccessOutcome {
            address,
            kind,
            index,
            tag,
            hit,
            evicted,
            wrote_through,
        };
        log::debug!(
            "{record}: line {index}, tag {tag}, {}",
            if hit { "hit" } else { "miss" }
        );
        if outcome.lost_dirty() {
            log::debug!(
                "line {index}: dirty block with tag {} overwritten",
                line.tag
            );
        }
        outcome
    }
}

impl AddStats for Session {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.cache_stat()));
    }
}
