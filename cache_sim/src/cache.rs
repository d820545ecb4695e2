use std::fmt::Display;

use crate::addr::Geometry;

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub struct CacheLine {
    pub valid: bool,
    pub tag: u32,
    /// only ever set under write-back
    pub dirty: bool,
}

impl CacheLine {
    pub fn holds(&self, tag: u32) -> bool {
        self.valid && self.tag == tag
    }
}

/// Direct-mapped line table.
pub struct CacheStore {
    lines: Vec<CacheLine>,
    geometry: Geometry,
}

impl CacheStore {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            lines: vec![CacheLine::default(); geometry.num_lines() as usize],
            geometry,
        }
    }
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }
    pub fn line(&self, index: usize) -> &CacheLine {
        &self.lines[index]
    }
    pub fn lines(&self) -> &[CacheLine] {
        &self.lines
    }
    pub fn is_hit(&self, index: usize, tag: u32) -> bool {
        self.lines[index].holds(tag)
    }
    /// Overwrites whatever occupied `index` with a clean copy of block `tag`.
    pub fn load_line(&mut self, index: usize, tag: u32) {
        self.lines[index] = CacheLine {
            valid: true,
            tag,
            dirty: false,
        };
    }
    pub fn mark_dirty(&mut self, index: usize) {
        let line = &mut self.lines[index];
        debug_assert!(line.valid, "marking invalid line {index} dirty");
        line.dirty = true;
    }
    pub fn view(&self, chunk_size: usize) -> LineTableView<'_> {
        LineTableView {
            store: self,
            chunk_size: chunk_size.max(1),
        }
    }
}

pub struct LineTableView<'a> {
    store: &'a CacheStore,
    chunk_size: usize,
}

impl<'a> Display for LineTableView<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self.store.num_lines().saturating_sub(1).to_string().len();
        let map: Vec<_> = self
            .store
            .lines()
            .iter()
            .enumerate()
            .map(|(i, l)| {
                format!(
                    "line {i:>width$}: valid = {}, tag = {:>10}, dirty = {}",
                    l.valid as u8, l.tag, l.dirty as u8
                )
            })
            .collect();
        writeln!(f, "cache state:")?;
        for chunk in map.chunks(self.chunk_size) {
            let s = chunk.join(" | ");
            writeln!(f, "  {s}")?;
        }
        Ok(())
    }
}
