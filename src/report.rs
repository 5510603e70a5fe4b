use crate::errors::AnalysisError;
use crate::payment_status::{round_two_decimals, AggregationResult};
use serde::Serialize;
use std::fmt;

/// One row of the status distribution table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionRow {
    pub status: String,
    pub count: u64,
    /// Share of all records, rounded to two decimals.
    pub percentage: f64,
}

/// Human-facing view of an [`AggregationResult`].
///
/// Built once from the final counts and never mutated. `Display` renders
/// the textual report printed by the CLI; the HTTP service returns the
/// same structure as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentStatusReport {
    /// Sorted by descending count, ties in first-encountered order.
    pub distribution: Vec<DistributionRow>,
    pub total_records: u64,
    pub xxx_count: u64,
    pub std_count: u64,
    pub total_payments: u64,
    pub on_time_payments: u64,
    pub non_timely_payments: u64,
    /// `None` when there were no payments to divide by.
    pub on_time_percentage: Option<f64>,
    /// Problems that did not prevent the report from being built.
    pub warnings: Vec<String>,
}

impl PaymentStatusReport {
    pub fn from_aggregation(result: &AggregationResult) -> Self {
        let total_records = result.total_records();

        let mut distribution: Vec<DistributionRow> = result
            .status_counts
            .iter()
            .map(|c| DistributionRow {
                status: c.status.clone(),
                count: c.count,
                percentage: round_two_decimals(c.count as f64 / total_records as f64 * 100.0),
            })
            .collect();
        // sort_by is stable: equal counts keep encounter order
        distribution.sort_by(|a, b| b.count.cmp(&a.count));

        let (on_time_percentage, warnings) = match result.on_time_percentage() {
            Ok(pct) => (Some(pct), Vec::new()),
            Err(e) => (None, vec![e.to_string()]),
        };

        Self {
            distribution,
            total_records,
            xxx_count: result.xxx_count,
            std_count: result.std_count,
            total_payments: result.total_payments,
            on_time_payments: result.on_time_payments,
            non_timely_payments: result.non_timely_payments(),
            on_time_percentage,
            warnings,
        }
    }

    /// The final on-time percentage, or the reason it is undefined.
    pub fn require_on_time_percentage(&self) -> Result<f64, AnalysisError> {
        self.on_time_percentage.ok_or(AnalysisError::NoPaymentData)
    }
}

impl fmt::Display for PaymentStatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Payment status distribution:")?;
        writeln!(f, "{:<10} {:>8} {:>10}", "Status", "Count", "Percent")?;
        for row in &self.distribution {
            writeln!(
                f,
                "{:<10} {:>8} {:>9.2}%",
                row.status, row.count, row.percentage
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Summary:")?;
        writeln!(f, "  Total records:          {}", self.total_records)?;
        writeln!(f, "  XXX (no data) records:  {}", self.xxx_count)?;
        writeln!(f, "  STD records:            {}", self.std_count)?;
        writeln!(f, "  Total payments:         {}", self.total_payments)?;
        writeln!(f, "  On-time payments:       {}", self.on_time_payments)?;
        writeln!(f, "  Non-timely payments:    {}", self.non_timely_payments)?;
        writeln!(f)?;

        match self.on_time_percentage {
            Some(pct) => writeln!(f, "On-time payment percentage: {:.2}%", pct),
            None => writeln!(
                f,
                "On-time payment percentage: undefined (no payment data)"
            ),
        }
    }
}
