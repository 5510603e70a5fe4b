/// Property-based tests using proptest
/// Tests invariants that should hold for every credit report shape
use proptest::prelude::*;
use rust_credit_api::payment_status::{classify_document, AggregationResult};
use rust_credit_api::report::PaymentStatusReport;
use serde_json::{json, Map, Value};

fn credit_report(partitions: Vec<Value>) -> Value {
    json!({
        "data": {
            "GetCustomerAssetsResponse": {
                "GetCustomerAssetsSuccess": {
                    "Asset": {
                        "TrueLinkCreditReport": {
                            "TradeLinePartition": partitions
                        }
                    }
                }
            }
        }
    })
}

fn record(status: &Option<String>) -> Value {
    match status {
        Some(s) => json!({ "status": s }),
        None => json!({ "month": "2024-01" }),
    }
}

/// Partition entry with its records as a sequence or as a keyed mapping.
fn partition(statuses: &[Option<String>], keyed: bool) -> Value {
    let monthly = if keyed {
        let map: Map<String, Value> = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| (format!("month{}", i), record(s)))
            .collect();
        Value::Object(map)
    } else {
        Value::Array(statuses.iter().map(record).collect())
    };
    json!({
        "Tradeline": {
            "GrantedTrade": {
                "PayStatusHistory": { "MonthlyPayStatus": monthly }
            }
        }
    })
}

fn build(partitions: &[Vec<Option<String>>], keyed: &[bool]) -> Value {
    credit_report(
        partitions
            .iter()
            .zip(keyed.iter().cycle())
            .map(|(statuses, keyed)| partition(statuses, *keyed))
            .collect(),
    )
}

fn classify(document: &Value) -> AggregationResult {
    classify_document(document).expect("generated documents are well formed")
}

fn status_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        4 => Just(Some("0".to_string())),
        1 => Just(Some("XXX".to_string())),
        1 => Just(Some("STD".to_string())),
        1 => Just(Some("".to_string())),
        1 => Just(None),
        2 => "[0-9A-Z]{1,3}".prop_map(Some),
    ]
}

fn partitions_strategy() -> impl Strategy<Value = Vec<Vec<Option<String>>>> {
    prop::collection::vec(prop::collection::vec(status_strategy(), 0..12), 0..6)
}

// Property: every record lands in exactly one bucket
proptest! {
    #[test]
    fn counts_sum_to_record_count(partitions in partitions_strategy()) {
        let records: usize = partitions.iter().map(Vec::len).sum();
        let result = classify(&build(&partitions, &[false]));

        prop_assert_eq!(result.total_records(), records as u64);
    }

    #[test]
    fn on_time_equals_zero_bucket(partitions in partitions_strategy()) {
        let result = classify(&build(&partitions, &[false]));

        prop_assert_eq!(result.on_time_payments, result.count_for("0"));
    }

    #[test]
    fn total_payments_excludes_only_special_codes(partitions in partitions_strategy()) {
        let result = classify(&build(&partitions, &[false]));
        let others: u64 = result
            .status_counts
            .iter()
            .filter(|c| !["0", "XXX", "STD"].contains(&c.status.as_str()))
            .map(|c| c.count)
            .sum();

        prop_assert_eq!(result.total_payments, result.on_time_payments + others);
        prop_assert!(result.on_time_payments <= result.total_payments);
        prop_assert_eq!(result.xxx_count, result.count_for("XXX"));
        prop_assert_eq!(result.std_count, result.count_for("STD"));
    }
}

// Property: the classification is deterministic and order independent
proptest! {
    #[test]
    fn classification_is_idempotent(partitions in partitions_strategy()) {
        let document = build(&partitions, &[false, true]);

        prop_assert_eq!(classify(&document), classify(&document));
    }

    #[test]
    fn permuting_partitions_preserves_result(partitions in partitions_strategy()) {
        let mut reversed = partitions.clone();
        reversed.reverse();

        prop_assert_eq!(
            classify(&build(&partitions, &[false])),
            classify(&build(&reversed, &[false]))
        );
    }

    #[test]
    fn mapping_and_sequence_are_equivalent(
        partitions in partitions_strategy(),
        keyed in prop::collection::vec(proptest::bool::ANY, 1..6)
    ) {
        prop_assert_eq!(
            classify(&build(&partitions, &[false])),
            classify(&build(&partitions, &keyed))
        );
    }
}

// Property: the report never emits a non-finite percentage
proptest! {
    #[test]
    fn report_percentages_are_finite(partitions in partitions_strategy()) {
        let report = PaymentStatusReport::from_aggregation(&classify(&build(&partitions, &[false])));

        for row in &report.distribution {
            prop_assert!(row.percentage.is_finite());
            prop_assert!((0.0..=100.0).contains(&row.percentage));
        }
        match report.on_time_percentage {
            Some(pct) => {
                prop_assert!(pct.is_finite());
                prop_assert!(report.total_payments > 0);
            }
            None => prop_assert_eq!(report.total_payments, 0),
        }
        for pair in report.distribution.windows(2) {
            prop_assert!(pair[0].count >= pair[1].count);
        }
    }
}
