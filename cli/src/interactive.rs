use std::io::{stdin, stdout, Write};

use anyhow::Result;
use cache_sim::{
    access::{AccessKind, AccessRecord},
    addr::Addr,
    sim::Simulator,
    stat::AddStats,
};

use crate::console::{ConsoleTrace, Show};

peg::parser!(grammar command() for str {
    rule usize() -> usize
        = n:$(quiet!{['0'..='9']+}) {? n.parse().or(Err("usize")) }
        / expected!("usize")
    rule addr() -> Addr
        = quiet!{"0" ['x' | 'X']} n:$(quiet!{['0'..='9'|'a'..='f'|'A'..='F']+}) {?
            u32::from_str_radix(n, 16).map(Addr::new).or(Err("32-bit address"))
        }
        / n:$(quiet!{['0'..='9']+}) {? n.parse().map(Addr::new).or(Err("32-bit address")) }
        / expected!("address")
    rule on_off() -> bool
        = "on" { true } / "off" { false }
    rule access_kind() -> AccessKind
        = ("write" / "w") { AccessKind::Write }
        / ("read" / "r") { AccessKind::Read }
    rule show_kind() -> ShowKind
        = "lines" { ShowKind::Lines }
        / "line" __ i:usize() { ShowKind::Line(i) }
        / "stat" "s"? { ShowKind::Stat }
        / ("config" / "conf") { ShowKind::Config }
        / "next" { ShowKind::Next }
    rule step_count() -> usize
        = __ n:usize() { n }
    pub(crate) rule parse_command() -> Command
        = _ "show" __ k:show_kind() _ { Command::Show(k) }
        / _ "trace" __ b:on_off() _ { Command::Trace(b) }
        / _ kind:access_kind() __ address:addr() _ { Command::Access(AccessRecord { address, kind }) }
        / _ ("exit" / "quit") _ { Command::Exit }
        / _ "run" _ { Command::Run }
        / _ "step" n:step_count()? _ { Command::Step(n.unwrap_or(1)) }
        / _ { Command::Step(1) }
        / expected!("command")

    rule ws() = quiet!{[' ' | '\t' | '\r' | '\n']}
        / expected!("whitespace")
    rule _() = ws()*
    rule __() = ws()+
});

#[derive(Debug, PartialEq)]
pub(crate) enum Command {
    Step(usize),
    Run,
    Show(ShowKind),
    Trace(bool),
    /// access outside of the loaded sequence
    Access(AccessRecord),
    Exit,
}

#[derive(Debug, PartialEq)]
pub(crate) enum ShowKind {
    Lines,
    Line(usize),
    Stat,
    Config,
    Next,
}

pub fn execute_interactive<W: Write>(
    sim: &mut Simulator<ConsoleTrace<W>>,
    chunk_size: usize,
    stat_width: usize,
) -> Result<()> {
    println!("entering interactive.");
    loop {
        // prompt string
        print!("#{} ", sim.position());
        if sim.is_finished() {
            print!("[done] ");
        }
        if !sim.trace_mut().show().is_none() {
            print!("[trace] ");
        }
        print!("> ");
        stdout().flush()?;
        let mut str = String::new();
        if stdin().read_line(&mut str)? == 0 {
            break;
        }
        let parsed = match command::parse_command(&str) {
            Ok(p) => p,
            Err(e) => {
                println!("parse error: expected {}", e.expected);
                continue;
            }
        };
        match parsed {
            Command::Step(n) => {
                let done = sim.run_steps(n)?;
                if done < n {
                    println!("access sequence exhausted.");
                }
            }
            Command::Run => {
                sim.run()?;
                println!("access sequence exhausted.");
            }
            Command::Access(record) => {
                let outcome = sim.apply(record)?;
                println!(
                    "{record}: line {}, {}",
                    outcome.index,
                    if outcome.hit { "hit" } else { "miss" }
                );
            }
            Command::Trace(b) => {
                let show = if b { Show::all() } else { Show::none() };
                sim.trace_mut().set_show(show);
                println!("trace {}", if b { "enabled" } else { "disabled" });
            }
            Command::Show(k) => match k {
                ShowKind::Lines => {
                    print!("{}", sim.session().store().view(chunk_size));
                }
                ShowKind::Line(i) => {
                    let store = sim.session().store();
                    if i < store.num_lines() {
                        let l = store.line(i);
                        println!(
                            "line {i}: valid = {}, tag = {}, dirty = {}",
                            l.valid as u8, l.tag, l.dirty as u8
                        );
                    } else {
                        println!("no line {i}; the cache has {} lines", store.num_lines());
                    }
                }
                ShowKind::Stat => {
                    let mut stats = Default::default();
                    sim.add_stats(&mut stats);
                    println!("{}", stats.view(stat_width));
                }
                ShowKind::Config => {
                    println!("{}", sim.session().config());
                }
                ShowKind::Next => match sim.next_access() {
                    Some(r) => println!("next: {r}"),
                    None => println!("no accesses left."),
                },
            },
            Command::Exit => break,
        }
    }
    println!("exiting interactive.");
    Ok(())
}
