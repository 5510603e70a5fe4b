/// Monthly pay-status classification over TrueLink credit reports.
///
/// The analysis is a single pass:
/// 1. Locate the trade-line partition sequence (mandatory path)
/// 2. Normalize each entry's `MonthlyPayStatus` into a flat record list
/// 3. Classify every record by its status code and accumulate counts
///
/// Everything below the partition level is optional and never fails.
use crate::errors::AnalysisError;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

/// Path from the document root to the trade-line partition sequence.
pub const TRADE_LINE_PARTITION_PATH: [&str; 6] = [
    "data",
    "GetCustomerAssetsResponse",
    "GetCustomerAssetsSuccess",
    "Asset",
    "TrueLinkCreditReport",
    "TradeLinePartition",
];

/// Path from a partition entry to its monthly pay-status collection.
pub const MONTHLY_PAY_STATUS_PATH: [&str; 4] = [
    "Tradeline",
    "GrantedTrade",
    "PayStatusHistory",
    "MonthlyPayStatus",
];

/// Paid as agreed.
pub const ON_TIME_STATUS: &str = "0";
/// No data reported for the month.
pub const NO_DATA_STATUS: &str = "XXX";
/// Standard / inactive month.
pub const STANDARD_STATUS: &str = "STD";

/// Occurrences of a single status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

/// Counts accumulated over every monthly pay-status record of a report.
///
/// `status_counts` is kept in first-encountered order, which the report
/// uses to break ties between equal counts. Two results compare equal when
/// their counts match regardless of that order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregationResult {
    /// Occurrences per status code, in first-encountered order.
    pub status_counts: Vec<StatusCount>,
    /// On-time records plus records with any non-special code.
    pub total_payments: u64,
    /// Records with status `"0"`.
    pub on_time_payments: u64,
    /// Records with status `"XXX"`.
    pub xxx_count: u64,
    /// Records with status `"STD"`.
    pub std_count: u64,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl AggregationResult {
    /// Classifies one status code and updates every counter it affects.
    pub fn record(&mut self, status: &str) {
        match self.positions.get(status) {
            Some(&idx) => self.status_counts[idx].count += 1,
            None => {
                self.positions
                    .insert(status.to_string(), self.status_counts.len());
                self.status_counts.push(StatusCount {
                    status: status.to_string(),
                    count: 1,
                });
            }
        }

        match status {
            ON_TIME_STATUS => {
                self.on_time_payments += 1;
                self.total_payments += 1;
            }
            NO_DATA_STATUS => self.xxx_count += 1,
            STANDARD_STATUS => self.std_count += 1,
            _ => self.total_payments += 1,
        }
    }

    /// Number of records processed.
    pub fn total_records(&self) -> u64 {
        self.status_counts.iter().map(|c| c.count).sum()
    }

    /// Occurrences of `status`, zero when it never appeared.
    pub fn count_for(&self, status: &str) -> u64 {
        self.positions
            .get(status)
            .map(|&idx| self.status_counts[idx].count)
            .unwrap_or(0)
    }

    pub fn non_timely_payments(&self) -> u64 {
        self.total_payments - self.on_time_payments
    }

    /// Status counts keyed by code, independent of encounter order.
    pub fn counts_by_status(&self) -> BTreeMap<&str, u64> {
        self.status_counts
            .iter()
            .map(|c| (c.status.as_str(), c.count))
            .collect()
    }

    /// Percentage of payments made on time, rounded to two decimals.
    ///
    /// # Errors
    ///
    /// * `AnalysisError::NoPaymentData` - when no record counted as a payment.
    pub fn on_time_percentage(&self) -> Result<f64, AnalysisError> {
        if self.total_payments == 0 {
            return Err(AnalysisError::NoPaymentData);
        }
        Ok(round_two_decimals(
            self.on_time_payments as f64 / self.total_payments as f64 * 100.0,
        ))
    }
}

impl PartialEq for AggregationResult {
    fn eq(&self, other: &Self) -> bool {
        self.total_payments == other.total_payments
            && self.on_time_payments == other.on_time_payments
            && self.xxx_count == other.xxx_count
            && self.std_count == other.std_count
            && self.counts_by_status() == other.counts_by_status()
    }
}

impl Eq for AggregationResult {}

/// Rounds half away from zero to two decimal places.
pub fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Returns the trade-line partition sequence of a credit report.
///
/// # Errors
///
/// * `AnalysisError::MalformedDocument` - if any segment of
///   [`TRADE_LINE_PARTITION_PATH`] is missing, or the partition is not a sequence.
pub fn trade_line_partitions(document: &Value) -> Result<&[Value], AnalysisError> {
    let mut current = document;
    for (depth, segment) in TRADE_LINE_PARTITION_PATH.iter().enumerate() {
        let path = || TRADE_LINE_PARTITION_PATH[..=depth].join(".");
        let object = current
            .as_object()
            .ok_or_else(|| AnalysisError::MalformedDocument {
                path: path(),
                reason: "parent is not an object".to_string(),
            })?;
        current = object
            .get(*segment)
            .ok_or_else(|| AnalysisError::MalformedDocument {
                path: path(),
                reason: "field is missing".to_string(),
            })?;
    }

    current
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| AnalysisError::MalformedDocument {
            path: TRADE_LINE_PARTITION_PATH.join("."),
            reason: format!("expected a sequence, found {}", json_kind(current)),
        })
}

/// Flattens a `MonthlyPayStatus` value into its records.
///
/// A sequence yields its items, a keyed mapping yields its values in
/// document order. Anything else (including absence) yields nothing.
pub fn normalize_monthly_pay_status(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(keyed)) => keyed.values().collect(),
        _ => Vec::new(),
    }
}

/// Monthly pay-status records of one partition entry.
///
/// A missing `Tradeline`, `GrantedTrade`, `PayStatusHistory` or
/// `MonthlyPayStatus` means the entry has no records.
pub fn monthly_pay_status_records(entry: &Value) -> Vec<&Value> {
    let value = MONTHLY_PAY_STATUS_PATH
        .iter()
        .try_fold(entry, |node, segment| node.get(*segment));
    normalize_monthly_pay_status(value)
}

/// Status code of a record, defaulting to `"0"`.
///
/// Non-empty strings are taken verbatim and numbers by their decimal text.
/// Missing, empty, or otherwise shaped values count as on-time.
pub fn record_status(record: &Value) -> Cow<'_, str> {
    match record.get("status") {
        Some(Value::String(s)) if !s.is_empty() => Cow::Borrowed(s.as_str()),
        Some(Value::Number(n)) => Cow::Owned(n.to_string()),
        _ => Cow::Borrowed(ON_TIME_STATUS),
    }
}

/// Classifies every record of the given partition entries.
pub fn classify_partitions(partitions: &[Value]) -> AggregationResult {
    let mut result = AggregationResult::default();
    for entry in partitions {
        for record in monthly_pay_status_records(entry) {
            result.record(&record_status(record));
        }
    }
    result
}

/// Runs the full classification over a credit report document.
///
/// # Errors
///
/// * `AnalysisError::MalformedDocument` - if the partition sequence cannot be reached.
pub fn classify_document(document: &Value) -> Result<AggregationResult, AnalysisError> {
    let partitions = trade_line_partitions(document)?;
    let result = classify_partitions(partitions);

    tracing::debug!(
        partitions = partitions.len(),
        records = result.total_records(),
        total_payments = result.total_payments,
        on_time_payments = result.on_time_payments,
        "Classified monthly pay statuses"
    );

    Ok(result)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_status_defaults() {
        assert_eq!(record_status(&json!({"status": "30"})), "30");
        assert_eq!(record_status(&json!({"status": ""})), "0");
        assert_eq!(record_status(&json!({"status": null})), "0");
        assert_eq!(record_status(&json!({})), "0");
        assert_eq!(record_status(&json!("XXX")), "0");
        assert_eq!(record_status(&json!({"status": 60})), "60");
    }

    #[test]
    fn test_normalize_sequence_and_mapping() {
        let seq = json!([{"status": "0"}, {"status": "30"}]);
        let map = json!({"m1": {"status": "0"}, "m2": {"status": "30"}});

        assert_eq!(normalize_monthly_pay_status(Some(&seq)).len(), 2);
        assert_eq!(normalize_monthly_pay_status(Some(&map)).len(), 2);
        assert!(normalize_monthly_pay_status(None).is_empty());
        assert!(normalize_monthly_pay_status(Some(&json!("0"))).is_empty());
    }

    #[test]
    fn test_mapping_keeps_document_order() {
        let map = json!({"z": {"status": "30"}, "a": {"status": "0"}});
        let records = normalize_monthly_pay_status(Some(&map));
        assert_eq!(record_status(records[0]), "30");
        assert_eq!(record_status(records[1]), "0");
    }

    #[test]
    fn test_record_updates_buckets() {
        let mut result = AggregationResult::default();
        for status in ["0", "XXX", "STD", "30", "0", "90"] {
            result.record(status);
        }

        assert_eq!(result.on_time_payments, 2);
        assert_eq!(result.total_payments, 4);
        assert_eq!(result.xxx_count, 1);
        assert_eq!(result.std_count, 1);
        assert_eq!(result.total_records(), 6);
        assert_eq!(result.non_timely_payments(), 2);
        assert_eq!(result.count_for("0"), 2);
        assert_eq!(result.count_for("120"), 0);
        let order: Vec<&str> = result
            .status_counts
            .iter()
            .map(|c| c.status.as_str())
            .collect();
        assert_eq!(order, vec!["0", "XXX", "STD", "30", "90"]);
    }

    #[test]
    fn test_status_match_is_textual() {
        let mut result = AggregationResult::default();
        result.record("00");
        result.record("xxx");

        assert_eq!(result.on_time_payments, 0);
        assert_eq!(result.xxx_count, 0);
        assert_eq!(result.total_payments, 2);
    }

    #[test]
    fn test_percentage_rounding() {
        let mut result = AggregationResult::default();
        result.record("0");
        result.record("0");
        result.record("30");

        assert_eq!(result.on_time_percentage(), Ok(66.67));
    }

    #[test]
    fn test_percentage_without_payments() {
        let mut result = AggregationResult::default();
        result.record("XXX");
        result.record("STD");

        assert_eq!(result.on_time_percentage(), Err(AnalysisError::NoPaymentData));
    }

    #[test]
    fn test_missing_ancestor_names_path() {
        let doc = json!({"data": {"GetCustomerAssetsResponse": {}}});
        let err = trade_line_partitions(&doc).unwrap_err();

        assert_eq!(
            err,
            AnalysisError::MalformedDocument {
                path: "data.GetCustomerAssetsResponse.GetCustomerAssetsSuccess".to_string(),
                reason: "field is missing".to_string(),
            }
        );
    }

    #[test]
    fn test_partition_must_be_sequence() {
        let doc = json!({"data": {"GetCustomerAssetsResponse": {"GetCustomerAssetsSuccess": {
            "Asset": {"TrueLinkCreditReport": {"TradeLinePartition": {"Tradeline": {}}}}
        }}}});

        match trade_line_partitions(&doc) {
            Err(AnalysisError::MalformedDocument { reason, .. }) => {
                assert_eq!(reason, "expected a sequence, found an object");
            }
            other => panic!("expected malformed document, got {:?}", other),
        }
    }

    #[test]
    fn test_non_object_root() {
        let err = trade_line_partitions(&json!([1, 2, 3])).unwrap_err();
        match err {
            AnalysisError::MalformedDocument { path, reason } => {
                assert_eq!(path, "data");
                assert_eq!(reason, "parent is not an object");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
