//! Fixed-width text report writer.

use std::cell::RefCell;
use std::io::Write;

use crate::domain::error::SpotrunnerError;
use crate::domain::report::{DisplayOptions, Report};
use crate::ports::report_port::ReportPort;

/// Writes rendered reports to any `Write` sink, stdout in the CLI.
pub struct TerminalReportAdapter<W: Write> {
    out: RefCell<W>,
    options: DisplayOptions,
}

impl<W: Write> TerminalReportAdapter<W> {
    pub fn new(out: W, options: DisplayOptions) -> Self {
        Self {
            out: RefCell::new(out),
            options,
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> ReportPort for TerminalReportAdapter<W> {
    fn write(&self, report: &Report) -> Result<(), SpotrunnerError> {
        let mut out = self.out.borrow_mut();
        writeln!(out, "{}", report.render(&self.options))?;
        out.flush()?;
        Ok(())
    }
}
