use super::{DeadlockReport, Report, ReportWriter, Summary};
use colored::*;
use std::io::Write;

pub struct TerminalWriter<W: Write> {
    writer: W,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn header(&mut self, summary: &Summary) -> std::io::Result<()> {
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", "═══════════════════════════════════════════".cyan())?;
        writeln!(self.writer, "{}", "          LOCKSCOPE DEADLOCK REPORT".bold().cyan())?;
        writeln!(self.writer, "{}", "═══════════════════════════════════════════".cyan())?;
        writeln!(
            self.writer,
            "{} {} files ({} skipped), {} classes, {} functions, {} locks",
            summary.language.bold(),
            summary.files,
            summary.skipped_files,
            summary.classes,
            summary.functions,
            summary.locks
        )?;
        writeln!(self.writer)
    }

    fn deadlock(&mut self, index: usize, deadlock: &DeadlockReport) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "{} {}",
            format!("#{}", index + 1).red().bold(),
            deadlock.locks.join(" <-> ").bold()
        )?;
        for edge in &deadlock.edges {
            writeln!(
                self.writer,
                "    {} held in {}, then {} acquired in {}",
                edge.from.yellow(),
                edge.held_since,
                edge.to.yellow(),
                edge.acquired_in
            )?;
            writeln!(self.writer, "      via {}", edge.path.join(" -> ").dimmed())?;
        }
        writeln!(self.writer)
    }

    fn footer(&mut self, summary: &Summary) -> std::io::Result<()> {
        writeln!(self.writer, "───────────────────────────────────────────")?;
        let deadlocks = if summary.deadlocks == 0 {
            summary.deadlocks.to_string().green()
        } else {
            summary.deadlocks.to_string().red()
        };
        writeln!(
            self.writer,
            "Deadlocks: {}  Reentrant acquisitions: {}  Order edges: {}  Unresolved calls: {}",
            deadlocks, summary.reentrancies, summary.order_edges, summary.diagnostics
        )?;
        if summary.truncated {
            writeln!(
                self.writer,
                "{}",
                "Some call paths exceeded max_exit_states; results may be incomplete.".yellow()
            )?;
        }
        Ok(())
    }
}

impl<W: Write> ReportWriter for TerminalWriter<W> {
    fn write_report(&mut self, report: &Report) -> anyhow::Result<()> {
        self.header(&report.summary)?;

        if report.deadlocks.is_empty() {
            writeln!(self.writer, "{}", "No lock-order cycles found.".green())?;
            writeln!(self.writer)?;
        } else {
            writeln!(self.writer, "{}", "POTENTIAL DEADLOCKS".bold().red())?;
            for (index, deadlock) in report.deadlocks.iter().enumerate() {
                self.deadlock(index, deadlock)?;
            }
        }

        if !report.reentrancies.is_empty() {
            writeln!(self.writer, "{}", "REENTRANT ACQUISITIONS".bold().yellow())?;
            for reentrancy in &report.reentrancies {
                writeln!(
                    self.writer,
                    "  {} re-acquired in {} (held since {})",
                    reentrancy.lock.yellow(),
                    reentrancy.acquired_in,
                    reentrancy.held_since
                )?;
                writeln!(self.writer, "      via {}", reentrancy.path.join(" -> ").dimmed())?;
            }
            writeln!(self.writer)?;
        }

        self.footer(&report.summary)?;
        self.writer.flush()?;
        Ok(())
    }
}
