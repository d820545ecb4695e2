use std::io::Write;

use anyhow::Result;
use bitmask_enum::bitmask;
use cache_sim::{
    access::{AccessKind, AccessRecord},
    engine::{AccessOutcome, Session},
    stat::AddStats,
    trace::Trace,
};

#[bitmask(u8)]
pub enum Show {
    Processing,
    Notify,
    Lines,
    Stat,
}

/// Prints what happens to every access on `out`.
pub struct ConsoleTrace<W> {
    out: W,
    show: Show,
    chunk_size: usize,
    stat_width: usize,
}

impl<W: Write> ConsoleTrace<W> {
    pub fn new(out: W, show: Show, chunk_size: usize, stat_width: usize) -> Self {
        Self {
            out,
            show,
            chunk_size,
            stat_width,
        }
    }
    pub fn show(&self) -> Show {
        self.show
    }
    pub fn set_show(&mut self, show: Show) {
        self.show = show;
    }
    pub fn print_lines(&mut self, session: &Session) -> Result<()> {
        write!(self.out, "{}", session.store().view(self.chunk_size))?;
        Ok(())
    }
    pub fn print_stat(&mut self, session: &impl AddStats) -> Result<()> {
        let mut stats = Default::default();
        session.add_stats(&mut stats);
        writeln!(self.out, "{}", stats.view(self.stat_width))?;
        Ok(())
    }
    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Trace for ConsoleTrace<W> {
    fn before_access(&mut self, record: &AccessRecord) -> Result<()> {
        if self.show.contains(Show::Processing) {
            writeln!(self.out, "processing {record}")?;
        }
        Ok(())
    }
    fn on_write_through(&mut self, outcome: &AccessOutcome) -> Result<()> {
        if self.show.contains(Show::Notify) {
            if outcome.hit {
                writeln!(self.out, "write-through: writing to memory immediately.")?;
            } else {
                writeln!(self.out, "write-through on miss: writing to memory.")?;
            }
        }
        Ok(())
    }
    fn after_access(&mut self, outcome: &AccessOutcome, session: &Session) -> Result<()> {
        if self.show.contains(Show::Processing) {
            let kind = match outcome.kind {
                AccessKind::Read => "R",
                AccessKind::Write => "W",
            };
            let result = if outcome.hit { "hit" } else { "miss" };
            writeln!(
                self.out,
                "  [{kind}] line {}, tag {}: {result}",
                outcome.index, outcome.tag
            )?;
        }
        if self.show.contains(Show::Lines) {
            self.print_lines(session)?;
        }
        if self.show.contains(Show::Stat) {
            self.print_stat(session)?;
            writeln!(self.out)?;
        }
        Ok(())
    }
}
