//! Report output port trait.

use crate::domain::error::SpotrunnerError;
use crate::domain::report::Report;

/// Port for emitting backtest reports.
pub trait ReportPort {
    fn write(&self, report: &Report) -> Result<(), SpotrunnerError>;

    /// Default implementation: writes each report in order.
    fn write_all(&self, reports: &[Report]) -> Result<(), SpotrunnerError> {
        for report in reports {
            self.write(report)?;
        }
        Ok(())
    }
}
