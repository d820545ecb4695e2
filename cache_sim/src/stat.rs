use std::fmt;

use serde::Serialize;

use crate::{config::CacheConfig, engine::Counters};

pub trait Width {
    fn width_by_chunk_size(chunk_size: usize) -> usize;
    fn chunk_size(max_width: usize) -> usize {
        let mut chunk_size = 2;
        loop {
            if Self::width_by_chunk_size(chunk_size) > max_width {
                break chunk_size - 1;
            }
            chunk_size += 1;
        }
    }
}

pub trait Stat {
    fn view(&self, max_width: usize) -> Box<dyn StatView + '_>;
}

pub trait StatView: fmt::Display {
    /// header of stat
    fn header(&self) -> &'static str;
    /// body width
    fn width(&self) -> usize;
}

pub trait AddStats {
    /// add stat to `buf`.
    fn add_stats(&self, buf: &mut Stats);
}

#[derive(Default)]
pub struct Stats {
    stats: Vec<Box<dyn Stat>>,
}

impl Stats {
    pub fn push(&mut self, stat: Box<dyn Stat>) {
        self.stats.push(stat)
    }
}

pub struct StatAllView<'s> {
    views: Vec<Box<dyn StatView + 's>>,
}

impl Stats {
    pub fn view(&self, max_width: usize) -> StatAllView<'_> {
        StatAllView {
            views: self.stats.iter().map(|s| s.view(max_width)).collect(),
        }
    }
}

impl fmt::Display for StatAllView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .views
            .iter()
            .map(|s| s.header().len().max(s.width()))
            .max()
            .unwrap_or(0);
        writeln!(f, "{:-^width$}", " statistics ")?;
        for sv in &self.views {
            writeln!(f, "{}:", sv.header())?;
            writeln!(f, "{}", sv)?;
        }
        write!(f, "{:-<width$}", "")
    }
}

/// Labelled values, as many to a row as fit in the width given to the view.
pub struct FieldsView {
    header: &'static str,
    fields: Vec<(&'static str, String)>,
    chunk_size: usize,
}

impl FieldsView {
    pub fn new(header: &'static str, fields: Vec<(&'static str, String)>, max_width: usize) -> Self {
        let chunk_size = Self::chunk_size(max_width).min(fields.len().max(1));
        Self {
            header,
            fields,
            chunk_size,
        }
    }
}

impl Width for FieldsView {
    fn width_by_chunk_size(chunk_size: usize) -> usize {
        chunk_size * 30 + (chunk_size - 1) * 2 + 2
    }
}

impl StatView for FieldsView {
    fn header(&self) -> &'static str {
        self.header
    }
    fn width(&self) -> usize {
        Self::width_by_chunk_size(self.chunk_size)
    }
}

impl fmt::Display for FieldsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<_> = self
            .fields
            .chunks(self.chunk_size)
            .map(|chunk| {
                let s: Vec<_> = chunk
                    .iter()
                    .map(|(label, value)| format!("{label:>14}: {value:>14}"))
                    .collect();
                format!("  {}", s.join(", "))
            })
            .collect();
        write!(f, "{}", rows.join("\n"))
    }
}

/// Hit/miss ratios and average memory access time derived from the counters.
///
/// Every ratio is `None` while no access has been made.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CacheStat {
    counters: Counters,
    access_cycles: u32,
    memory_penalty: u32,
}

impl CacheStat {
    pub fn from_counters(counters: Counters, access_cycles: u32, memory_penalty: u32) -> Self {
        Self {
            counters,
            access_cycles,
            memory_penalty,
        }
    }
    pub fn counters(&self) -> Counters {
        self.counters
    }
    fn ratio(&self, n: u64) -> Option<f64> {
        match self.counters.accesses {
            0 => None,
            total => Some(n as f64 / total as f64),
        }
    }
    pub fn hit_ratio(&self) -> Option<f64> {
        self.ratio(self.counters.hits)
    }
    pub fn miss_ratio(&self) -> Option<f64> {
        self.ratio(self.counters.misses)
    }
    /// `access_cycles + miss_ratio * memory_penalty`
    pub fn amat(&self) -> Option<f64> {
        self.miss_ratio()
            .map(|m| self.access_cycles as f64 + m * self.memory_penalty as f64)
    }
}

fn undefined_or(v: Option<f64>, f: impl FnOnce(f64) -> String) -> String {
    v.map(f).unwrap_or_else(|| "undefined".to_owned())
}

impl Stat for CacheStat {
    fn view(&self, max_width: usize) -> Box<dyn StatView + '_> {
        let Counters {
            accesses,
            reads,
            writes,
            hits,
            misses,
        } = self.counters;
        let fields = vec![
            ("accesses", accesses.to_string()),
            ("reads", reads.to_string()),
            ("writes", writes.to_string()),
            ("hits", hits.to_string()),
            ("misses", misses.to_string()),
            ("hit ratio", undefined_or(self.hit_ratio(), |r| format!("{r:.6}"))),
            ("miss ratio", undefined_or(self.miss_ratio(), |r| format!("{r:.6}"))),
            ("AMAT", undefined_or(self.amat(), |a| format!("{a:.4} cycles"))),
        ];
        Box::new(FieldsView::new("cache stat", fields, max_width))
    }
}

/// Final report of a run, for machine consumption.
#[derive(Serialize, Debug)]
pub struct Summary {
    pub config: CacheConfig,
    pub num_lines: u32,
    pub counters: Counters,
    pub hit_ratio: Option<f64>,
    pub miss_ratio: Option<f64>,
    pub amat: Option<f64>,
}

impl Summary {
    pub fn new(config: CacheConfig, num_lines: u32, stat: &CacheStat) -> Self {
        Self {
            config,
            num_lines,
            counters: stat.counters(),
            hit_ratio: stat.hit_ratio(),
            miss_ratio: stat.miss_ratio(),
            amat: stat.amat(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(hits: u64, misses: u64) -> Counters {
        Counters {
            accesses: hits + misses,
            reads: hits + misses,
            writes: 0,
            hits,
            misses,
        }
    }

    #[test]
    fn test_ratios() {
        let s = CacheStat::from_counters(counters(1, 2), 1, 150);
        let hit = s.hit_ratio().unwrap();
        let miss = s.miss_ratio().unwrap();
        assert!((hit - 1. / 3.).abs() < 1e-12);
        assert!((miss - 2. / 3.).abs() < 1e-12);
        assert!((s.amat().unwrap() - 101.).abs() < 1e-9);
    }

    #[test]
    fn test_all_hits() {
        let s = CacheStat::from_counters(counters(4, 0), 3, 150);
        assert_eq!(s.miss_ratio(), Some(0.));
        assert_eq!(s.amat(), Some(3.));
    }

    fn field(label: &str, value: impl fmt::Display) -> String {
        format!("{label:>14}: {value:>14}")
    }

    #[test]
    fn test_zero_accesses_undefined() {
        let s = CacheStat::from_counters(Counters::default(), 1, 150);
        assert_eq!(s.hit_ratio(), None);
        assert_eq!(s.miss_ratio(), None);
        assert_eq!(s.amat(), None);
        let text = s.view(80).to_string();
        assert!(text.contains(&field("AMAT", "undefined")));
        assert!(!text.contains("NaN"));
    }

    #[test]
    fn test_view() {
        let mut ss = Stats::default();
        ss.push(Box::new(CacheStat::from_counters(counters(1, 1), 1, 150)));
        let text = ss.view(80).to_string();
        // two fields to a row at 80 columns
        let width = FieldsView::width_by_chunk_size(2);
        assert_eq!(width, 64);
        assert!(text.starts_with(&format!("{:-^64}\n", " statistics ")));
        assert!(text.contains("cache stat:\n"));
        assert!(text.contains(&format!("  {}, {}\n", field("writes", 0), field("hits", 1))));
        assert!(text.contains(&field("hit ratio", "0.500000")));
        assert!(text.contains(&field("AMAT", "76.0000 cycles")));
        assert!(text.ends_with(&"-".repeat(64)));
    }

    #[test]
    fn test_view_follows_width() {
        let s = CacheStat::from_counters(counters(3, 1), 1, 150);
        let narrow = s.view(10).to_string();
        let wide = s.view(400).to_string();
        assert_ne!(narrow, wide);
        // one field per row when nothing more fits
        assert_eq!(narrow.lines().count(), 8);
        assert_eq!(s.view(10).width(), 32);
        assert!(narrow.lines().all(|l| l.len() <= 32));
        // every field on one row when the width allows it
        assert_eq!(wide.lines().count(), 1);
        assert_eq!(s.view(400).width(), FieldsView::width_by_chunk_size(8));
        assert_eq!(
            FieldsView::new("hits", vec![("hits", "3".into())], 400).width(),
            32
        );
    }

    #[test]
    fn test_summary_json() {
        let config = crate::config::CacheConfig::new(
            1024,
            64,
            1,
            Default::default(),
            Default::default(),
        );
        let stat = CacheStat::from_counters(Counters::default(), 1, 150);
        let json = serde_json::to_value(Summary::new(config, 16, &stat)).unwrap();
        assert_eq!(json["num_lines"], 16);
        assert_eq!(json["config"]["hit_policy"], "WT");
        assert!(json["amat"].is_null());
    }
}
