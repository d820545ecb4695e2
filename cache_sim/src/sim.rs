use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::{
    access::{AccessRecord, AccessSequence, ParseError},
    config::{CacheConfig, ConfigError},
    engine::{AccessOutcome, Session},
    stat::{AddStats, CacheStat, FieldsView, Stat, StatView, Stats, Summary},
    trace::Trace,
};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid cache configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("malformed access sequence: {0}")]
    Parse(#[from] ParseError),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Trace(#[from] anyhow::Error),
}

type Result<T, E = SimError> = std::result::Result<T, E>;

/// Reads the access sequence file; a missing file means the run never starts.
pub fn load_accesses(path: impl AsRef<Path>) -> Result<AccessSequence> {
    let path = path.as_ref();
    let io_err = |source| SimError::Io {
        path: path.to_owned(),
        source,
    };
    let mut buf = String::new();
    let mut file = File::open(path).map_err(io_err)?;
    file.read_to_string(&mut buf).map_err(io_err)?;
    let seq = AccessSequence::parse(&buf)?;
    log::info!("loaded {} accesses from {}", seq.len(), path.display());
    Ok(seq)
}

/// Replays an access sequence against one session, reporting to `trace`.
pub struct Simulator<T> {
    session: Session,
    accesses: AccessSequence,
    position: usize,
    trace: T,
    evict_stat: EvictStat,
}

impl<T: Trace> Simulator<T> {
    pub fn new(config: CacheConfig, accesses: AccessSequence, trace: T) -> Result<Self> {
        Ok(Self {
            session: Session::new(config)?,
            accesses,
            position: 0,
            trace,
            evict_stat: Default::default(),
        })
    }

    /// Processes the next access; `None` once the sequence is exhausted.
    pub fn step(&mut self) -> Result<Option<AccessOutcome>> {
        let Some(record) = self.accesses.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;
        Ok(Some(self.apply(record)?))
    }

    /// Processes an access that is not part of the sequence.
    pub fn apply(&mut self, record: AccessRecord) -> Result<AccessOutcome> {
        self.trace.before_access(&record)?;
        let outcome = self.session.access(record);
        if outcome.wrote_through() {
            self.trace.on_write_through(&outcome)?;
        }
        if let Some(evicted) = outcome.evicted {
            self.evict_stat.evictions += 1;
            if evicted.dirty {
                self.evict_stat.dirty_evictions += 1;
            }
            self.trace.on_evict(&outcome, evicted)?;
        }
        self.trace.after_access(&outcome, &self.session)?;
        Ok(outcome)
    }

    /// Runs at most `n` accesses and returns how many were processed.
    pub fn run_steps(&mut self, n: usize) -> Result<usize> {
        let mut done = 0;
        while done < n && self.step()?.is_some() {
            done += 1;
        }
        Ok(done)
    }

    pub fn run(&mut self) -> Result<()> {
        while self.step()?.is_some() {}
        log::info!(
            "finished replaying {} accesses.",
            self.session.counters().accesses
        );
        Ok(())
    }
}

impl<T> Simulator<T> {
    pub fn session(&self) -> &Session {
        &self.session
    }
    pub fn trace_mut(&mut self) -> &mut T {
        &mut self.trace
    }
    pub fn next_access(&self) -> Option<AccessRecord> {
        self.accesses.get(self.position)
    }
    pub fn position(&self) -> usize {
        self.position
    }
    pub fn remaining(&self) -> usize {
        self.accesses.len() - self.position
    }
    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }
    pub fn cache_stat(&self) -> CacheStat {
        self.session.cache_stat()
    }
    pub fn collect_stat(&self) -> Stats {
        let mut ss = Stats::default();
        self.add_stats(&mut ss);
        ss
    }
    pub fn summary(&self) -> Summary {
        Summary::new(
            *self.session.config(),
            self.session.geometry().num_lines(),
            &self.cache_stat(),
        )
    }
    pub fn into_trace(self) -> T {
        self.trace
    }
}

impl<T> AddStats for Simulator<T> {
    fn add_stats(&self, buf: &mut Stats) {
        self.session.add_stats(buf);
        let lines = self.session.store().lines();
        buf.push(Box::new(LineStat {
            num_lines: lines.len(),
            valid: lines.iter().filter(|l| l.valid).count(),
            dirty: lines.iter().filter(|l| l.dirty).count(),
            evict: self.evict_stat,
        }));
    }
}

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub struct EvictStat {
    pub evictions: u64,
    /// dirty blocks discarded without a flush
    pub dirty_evictions: u64,
}

pub struct LineStat {
    num_lines: usize,
    valid: usize,
    dirty: usize,
    evict: EvictStat,
}

impl Stat for LineStat {
    fn view(&self, max_width: usize) -> Box<dyn StatView + '_> {
        let fields = vec![
            ("lines", self.num_lines.to_string()),
            ("valid", self.valid.to_string()),
            ("dirty", self.dirty.to_string()),
            ("evictions", self.evict.evictions.to_string()),
            ("dirty evicted", self.evict.dirty_evictions.to_string()),
        ];
        Box::new(FieldsView::new("line occupancy", fields, max_width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        access::AccessKind,
        config::WritePolicy::{self, *},
        engine::{Counters, Evicted},
        trace::EmptyTrace,
    };

    fn config(cache_size: u32, hit: WritePolicy, miss: WritePolicy) -> CacheConfig {
        CacheConfig::new(cache_size, 64, 1, hit, miss)
    }

    #[derive(Default)]
    struct Recorder {
        before: Vec<AccessRecord>,
        write_through: Vec<usize>,
        evicted: Vec<Evicted>,
        after: Vec<Counters>,
    }

    impl Trace for Recorder {
        fn before_access(&mut self, record: &AccessRecord) -> anyhow::Result<()> {
            self.before.push(*record);
            Ok(())
        }
        fn on_write_through(&mut self, outcome: &AccessOutcome) -> anyhow::Result<()> {
            self.write_through.push(outcome.index);
            Ok(())
        }
        fn on_evict(&mut self, _: &AccessOutcome, evicted: Evicted) -> anyhow::Result<()> {
            self.evicted.push(evicted);
            Ok(())
        }
        fn after_access(&mut self, _: &AccessOutcome, session: &Session) -> anyhow::Result<()> {
            self.after.push(session.counters());
            Ok(())
        }
    }

    #[test]
    fn test_end_to_end() {
        let seq = AccessSequence::parse("0:R,64:R,0:R").unwrap();
        let mut sim = Simulator::new(config(1024, WriteThrough, WriteBack), seq, EmptyTrace::new())
            .unwrap();
        assert_eq!(sim.session().geometry().num_lines(), 16);
        sim.run().unwrap();
        assert!(sim.is_finished());
        assert_eq!(
            sim.session().counters(),
            Counters {
                accesses: 3,
                reads: 3,
                writes: 0,
                hits: 1,
                misses: 2
            }
        );
        let stat = sim.cache_stat();
        assert!((stat.amat().unwrap() - 101.).abs() < 1e-9);
    }

    #[test]
    fn test_trace_hooks() {
        let seq = AccessSequence::parse("0:W,0:W,64:R,0:R").unwrap();
        let mut rec = Recorder::default();
        let mut sim = Simulator::new(config(64, WriteThrough, WriteBack), seq, &mut rec).unwrap();
        sim.run().unwrap();
        assert_eq!(rec.before.len(), 4);
        assert_eq!(rec.before[0].kind, AccessKind::Write);
        // only the write hit goes through
        assert_eq!(rec.write_through, vec![0]);
        assert_eq!(
            rec.evicted,
            vec![
                Evicted {
                    tag: 0,
                    dirty: true
                },
                Evicted {
                    tag: 1,
                    dirty: false
                }
            ]
        );
        assert_eq!(rec.after.len(), 4);
        for c in rec.after {
            assert_eq!(c.accesses, c.reads + c.writes);
            assert_eq!(c.accesses, c.hits + c.misses);
        }
    }

    #[test]
    fn test_run_steps() {
        let seq = AccessSequence::parse("0:R,4:R,8:R").unwrap();
        let mut sim =
            Simulator::new(config(1024, WriteBack, WriteBack), seq, EmptyTrace::new()).unwrap();
        assert_eq!(sim.run_steps(2).unwrap(), 2);
        assert_eq!(sim.remaining(), 1);
        assert_eq!(sim.next_access(), Some(AccessRecord::read(8)));
        assert_eq!(sim.run_steps(5).unwrap(), 1);
        assert!(sim.step().unwrap().is_none());
        assert_eq!(sim.position(), 3);
        assert_eq!(sim.next_access(), None);
        // out-of-sequence accesses do not move the cursor
        assert!(sim.apply(AccessRecord::read(0)).unwrap().hit);
        assert_eq!(sim.position(), 3);
        assert_eq!(sim.session().counters().accesses, 4);
    }

    #[test]
    fn test_empty_sequence() {
        let mut sim = Simulator::new(
            config(1024, WriteBack, WriteBack),
            AccessSequence::default(),
            EmptyTrace::new(),
        )
        .unwrap();
        sim.run().unwrap();
        assert_eq!(sim.cache_stat().amat(), None);
        assert!(sim.summary().amat.is_none());
    }

    #[test]
    fn test_stat_view() {
        let seq = AccessSequence::parse("0:W,64:R").unwrap();
        let mut sim =
            Simulator::new(config(64, WriteBack, WriteBack), seq, EmptyTrace::new()).unwrap();
        sim.run().unwrap();
        let text = sim.collect_stat().view(10).to_string();
        assert!(text.contains("cache stat:"));
        assert!(text.contains("line occupancy:"));
        assert!(text.contains(&format!("  {:>14}: {:>14}\n", "evictions", 1)));
        assert!(text.contains(&format!("  {:>14}: {:>14}\n", "dirty evicted", 1)));
    }

    #[test]
    fn test_bad_config() {
        let r = Simulator::new(
            CacheConfig::new(1024, 0, 1, WriteBack, WriteBack),
            AccessSequence::default(),
            EmptyTrace::new(),
        );
        assert!(matches!(r, Err(SimError::Config(ConfigError::ZeroLineSize))));
    }

    #[test]
    fn test_missing_file() {
        let r = load_accesses("/nonexistent/access_sequence.txt");
        assert!(matches!(r, Err(SimError::Io { .. })));
    }
}
