//! Per-control aggregation across annotations.
//!
//! This module groups annotation results by control and reduces them
//! into an [`Aggregation`]: label counts, choice and taxonomy shares,
//! pairwise counts, averages, or ranker buckets.

use crate::extract::{typed_value, ResultValue};
use crate::models::{
    Aggregation, Annotation, Control, ControlKind, ControlSummary, Count, LabelCount,
    RawResult, Share, TaskSnapshot,
};
use std::cmp::Reverse;
use std::collections::HashMap;
use tracing::debug;

/// Collect the results of one control across annotations, in annotation order.
pub fn group_by_control<'a>(annotations: &'a [Annotation], control: &'a str) -> Vec<&'a RawResult> {
    annotations
        .iter()
        .flat_map(|a| a.results_for(control))
        .collect()
}

/// Aggregate every control of a task, in schema order.
pub fn summarize(snapshot: &TaskSnapshot) -> Vec<ControlSummary> {
    let total = snapshot.annotations.len();

    snapshot
        .controls
        .iter()
        .map(|control| {
            let results = group_by_control(&snapshot.annotations, &control.name);
            let aggregation = aggregate(control, &results, total);
            debug!(
                "Aggregated '{}' ({}): {} results, empty={}",
                control.name,
                control.kind,
                results.len(),
                aggregation.is_empty()
            );

            ControlSummary {
                control: control.name.clone(),
                kind: control.kind.clone(),
                result_count: results.len(),
                aggregation,
            }
        })
        .collect()
}

/// Aggregate the results of one control.
///
/// `total_annotations` is the number of annotations on the task, which is
/// the denominator for percentages and averages.
pub fn aggregate(control: &Control, results: &[&RawResult], total_annotations: usize) -> Aggregation {
    if results.is_empty() || total_annotations == 0 {
        return Aggregation::NoData;
    }

    let values: Vec<ResultValue> = results.iter().map(|r| typed_value(r)).collect();

    match &control.kind {
        ControlKind::Labels(_) => label_counts(control, &values),
        ControlKind::Choices => {
            let choices = values.iter().flat_map(|v| match v {
                ResultValue::Choices(choices) => choices.clone(),
                _ => Vec::new(),
            });
            Aggregation::ChoicePercentages(shares(choices, total_annotations, |choice| {
                control.attrs_for(choice).and_then(|a| a.background.clone())
            }))
        }
        ControlKind::Taxonomy => {
            // Each selected path counts toward its leaf.
            let leaves = values.iter().flat_map(|v| match v {
                ResultValue::Taxonomy(paths) => {
                    paths.iter().filter_map(|p| p.last().cloned()).collect::<Vec<_>>()
                }
                _ => Vec::new(),
            });
            Aggregation::TaxonomyPathPercentages(shares(leaves, total_annotations, |_| None))
        }
        ControlKind::Pairwise => {
            let sides = values.iter().flat_map(|v| match v {
                ResultValue::Pairwise(sides) => sides.clone(),
                _ => Vec::new(),
            });
            Aggregation::PairwiseCounts(
                sorted_counts(sides)
                    .into_iter()
                    .map(|(value, count)| Count { value, count })
                    .collect(),
            )
        }
        ControlKind::Rating => {
            let ratings: Vec<f64> = values
                .iter()
                .filter_map(|v| match v {
                    ResultValue::Rating(r) if *r != 0.0 => Some(*r),
                    _ => None,
                })
                .collect();

            if ratings.is_empty() {
                Aggregation::NoRatings
            } else {
                Aggregation::RatingAverage(average(&ratings, total_annotations))
            }
        }
        ControlKind::Number => {
            let numbers: Vec<f64> = values
                .iter()
                .filter_map(|v| match v {
                    ResultValue::Number(n) => Some(*n),
                    _ => None,
                })
                .collect();

            if numbers.is_empty() {
                Aggregation::NoData
            } else {
                Aggregation::NumberAverage(average(&numbers, total_annotations))
            }
        }
        ControlKind::Ranker => values
            .into_iter()
            .find_map(|v| match v {
                ResultValue::Ranker(buckets) => Some(buckets),
                _ => None,
            })
            .map_or(Aggregation::NoData, Aggregation::RankerBuckets),
        ControlKind::TextArea | ControlKind::DateTime | ControlKind::Other(_) => {
            Aggregation::NotApplicable
        }
    }
}

fn label_counts(control: &Control, values: &[ResultValue]) -> Aggregation {
    let labels = values.iter().flat_map(|v| match v {
        ResultValue::Labels(labels) => labels.clone(),
        _ => Vec::new(),
    });

    Aggregation::LabelCounts(
        sorted_counts(labels)
            .into_iter()
            .map(|(label, count)| LabelCount {
                colors: control.attrs_for(&label).cloned().unwrap_or_default(),
                label,
                count,
            })
            .collect(),
    )
}

fn shares<I, F>(values: I, total: usize, background: F) -> Vec<Share>
where
    I: IntoIterator<Item = String>,
    F: Fn(&str) -> Option<String>,
{
    sorted_counts(values.into_iter().filter(|v| !v.is_empty()))
        .into_iter()
        .map(|(value, count)| Share {
            background: background(&value),
            percentage: percentage(count, total),
            value,
            count,
        })
        .collect()
}

/// Count occurrences in first-seen order.
pub fn count_in_order<I>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = String>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for value in values {
        match index.get(&value) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value.clone(), counts.len());
                counts.push((value, 1));
            }
        }
    }

    counts
}

/// Count occurrences, sorted by count descending. Ties keep first-seen order.
pub fn sorted_counts<I>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = String>,
{
    let mut counts = count_in_order(values);
    counts.sort_by_key(|(_, count)| Reverse(*count));
    counts
}

/// Percentage of `total`, rounded to one decimal. Callers guard `total > 0`.
fn percentage(count: usize, total: usize) -> f64 {
    round1(count as f64 / total as f64 * 100.0)
}

/// Sum divided by the annotation count, not by the number of values.
fn average(values: &[f64], total: usize) -> f64 {
    round1(values.iter().sum::<f64>() / total as f64)
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bucket, LabelAttrs};
    use serde_json::{json, Value};

    fn results(from_name: &str, result_type: &str, values: Vec<Value>) -> Vec<RawResult> {
        values
            .into_iter()
            .map(|v| RawResult::new(from_name, result_type, json!({ result_type: v })))
            .collect()
    }

    fn refs(results: &[RawResult]) -> Vec<&RawResult> {
        results.iter().collect()
    }

    #[test]
    fn test_empty_results_are_no_data() {
        for kind in [
            "labels", "choices", "taxonomy", "rating", "number", "pairwise", "ranker",
            "textarea", "datetime", "unknown",
        ] {
            let control = Control::new("c", kind);
            assert_eq!(aggregate(&control, &[], 3), Aggregation::NoData, "{}", kind);
        }
    }

    #[test]
    fn test_zero_total_is_no_data() {
        let control = Control::new("c", "rating");
        let rs = results("c", "rating", vec![json!(5)]);
        assert_eq!(aggregate(&control, &refs(&rs), 0), Aggregation::NoData);
    }

    #[test]
    fn test_choice_percentages() {
        let control = Control::new("c", "choices");
        let rs = results("c", "choices", vec![json!(["a"]), json!(["b"]), json!(["a"])]);

        let Aggregation::ChoicePercentages(shares) = aggregate(&control, &refs(&rs), 3) else {
            panic!("expected choice percentages");
        };

        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].value, "a");
        assert_eq!(shares[0].count, 2);
        assert_eq!(shares[0].percentage, 66.7);
        assert_eq!(shares[1].value, "b");
        assert_eq!(shares[1].percentage, 33.3);
    }

    #[test]
    fn test_choice_percentages_sum_to_hundred() {
        let control = Control::new("c", "choices");
        let rs = results(
            "c",
            "choices",
            vec![json!(["x"]), json!(["y"]), json!(["z"]), json!(["x"]), json!(["y"]), json!(["w"])],
        );

        let Aggregation::ChoicePercentages(shares) = aggregate(&control, &refs(&rs), 6) else {
            panic!("expected choice percentages");
        };

        let sum: f64 = shares.iter().map(|s| s.percentage).sum();
        assert!((sum - 100.0).abs() <= 0.1 + f64::EPSILON, "sum was {}", sum);
    }

    #[test]
    fn test_choice_background_color() {
        let mut control = Control::new("c", "choices");
        control.label_attrs.insert(
            "a".to_string(),
            LabelAttrs {
                background: Some("#abc".to_string()),
                border: Some("#000".to_string()),
                color: None,
            },
        );
        let rs = results("c", "choices", vec![json!(["a"])]);

        let Aggregation::ChoicePercentages(shares) = aggregate(&control, &refs(&rs), 1) else {
            panic!("expected choice percentages");
        };
        assert_eq!(shares[0].background.as_deref(), Some("#abc"));
        assert_eq!(shares[0].percentage, 100.0);
    }

    #[test]
    fn test_label_counts_sorted_stable() {
        let mut control = Control::new("label", "rectanglelabels");
        control.label_attrs.insert(
            "Person".to_string(),
            LabelAttrs {
                background: Some("#0f0".to_string()),
                ..Default::default()
            },
        );
        let rs = results(
            "label",
            "rectanglelabels",
            vec![json!(["Car"]), json!(["Person"]), json!(["Tree", "Person"]), json!(["Car"])],
        );

        let Aggregation::LabelCounts(counts) = aggregate(&control, &refs(&rs), 2) else {
            panic!("expected label counts");
        };

        let order: Vec<_> = counts.iter().map(|c| (c.label.as_str(), c.count)).collect();
        assert_eq!(order, vec![("Car", 2), ("Person", 2), ("Tree", 1)]);
        assert_eq!(counts[1].colors.background.as_deref(), Some("#0f0"));
        assert_eq!(counts[0].colors, LabelAttrs::default());
    }

    #[test]
    fn test_malformed_labels_degrade_to_empty() {
        let control = Control::new("label", "labels");
        let rs = vec![RawResult::new("label", "labels", json!({"labels": {"not": "a list"}}))];

        assert_eq!(
            aggregate(&control, &refs(&rs), 1),
            Aggregation::LabelCounts(vec![])
        );
    }

    #[test]
    fn test_taxonomy_leaves() {
        let control = Control::new("tax", "taxonomy");
        let rs = results(
            "tax",
            "taxonomy",
            vec![json!([["Animal", "Cat"]]), json!([["Animal", "Cat"], ["Plant"]])],
        );

        let Aggregation::TaxonomyPathPercentages(shares) = aggregate(&control, &refs(&rs), 2)
        else {
            panic!("expected taxonomy shares");
        };

        assert_eq!(shares[0].value, "Cat");
        assert_eq!(shares[0].percentage, 100.0);
        assert_eq!(shares[1].value, "Plant");
        assert_eq!(shares[1].percentage, 50.0);
    }

    #[test]
    fn test_taxonomy_same_leaf_merges() {
        let control = Control::new("tax", "taxonomy");
        let rs = results(
            "tax",
            "taxonomy",
            vec![json!([["Animal", "Cat"]]), json!([["Pet", "Cat"]])],
        );

        assert_eq!(
            aggregate(&control, &refs(&rs), 2),
            Aggregation::TaxonomyPathPercentages(vec![Share {
                value: "Cat".to_string(),
                count: 2,
                percentage: 100.0,
                background: None,
            }])
        );
    }

    #[test]
    fn test_taxonomy_percentages_sum_to_hundred() {
        let control = Control::new("tax", "taxonomy");
        let rs = results(
            "tax",
            "taxonomy",
            vec![
                json!([["A", "x"]]),
                json!([["A", "y"]]),
                json!([["B", "z"]]),
                json!([["A", "x"]]),
                json!([["B", "y"]]),
                json!([["C"]]),
            ],
        );

        let Aggregation::TaxonomyPathPercentages(shares) = aggregate(&control, &refs(&rs), 6)
        else {
            panic!("expected taxonomy shares");
        };

        let sum: f64 = shares.iter().map(|s| s.percentage).sum();
        assert!((sum - 100.0).abs() <= 0.1 + f64::EPSILON, "sum was {}", sum);
    }

    #[test]
    fn test_choice_ties_keep_first_seen_order() {
        let control = Control::new("c", "choices");
        let rs = results(
            "c",
            "choices",
            vec![json!(["b"]), json!(["a"]), json!(["c"]), json!(["a"]), json!(["b"])],
        );

        let Aggregation::ChoicePercentages(shares) = aggregate(&control, &refs(&rs), 5) else {
            panic!("expected choice percentages");
        };

        let order: Vec<_> = shares.iter().map(|s| (s.value.as_str(), s.count)).collect();
        assert_eq!(order, vec![("b", 2), ("a", 2), ("c", 1)]);
    }

    #[test]
    fn test_pairwise_ties_keep_first_seen_order() {
        let control = Control::new("cmp", "pairwise");
        let rs = vec![
            RawResult::new("cmp", "pairwise", json!({"selected": "right"})),
            RawResult::new("cmp", "pairwise", json!({"selected": "left"})),
        ];

        assert_eq!(
            aggregate(&control, &refs(&rs), 2),
            Aggregation::PairwiseCounts(vec![
                Count { value: "right".to_string(), count: 1 },
                Count { value: "left".to_string(), count: 1 },
            ])
        );
    }

    #[test]
    fn test_pairwise_counts() {
        let control = Control::new("cmp", "pairwise");
        let rs = vec![
            RawResult::new("cmp", "pairwise", json!({"selected": "right"})),
            RawResult::new("cmp", "pairwise", json!({"selected": "left"})),
            RawResult::new("cmp", "pairwise", json!({"selected": "left"})),
        ];

        assert_eq!(
            aggregate(&control, &refs(&rs), 3),
            Aggregation::PairwiseCounts(vec![
                Count { value: "left".to_string(), count: 2 },
                Count { value: "right".to_string(), count: 1 },
            ])
        );
    }

    #[test]
    fn test_rating_average_uses_total() {
        let control = Control::new("score", "rating");
        let rs = results("score", "rating", vec![json!(4), json!(5)]);
        assert_eq!(aggregate(&control, &refs(&rs), 2), Aggregation::RatingAverage(4.5));

        // three annotations, only two rated
        assert_eq!(aggregate(&control, &refs(&rs), 3), Aggregation::RatingAverage(3.0));
    }

    #[test]
    fn test_rating_without_values() {
        let control = Control::new("score", "rating");
        let rs = results("score", "rating", vec![json!(0), Value::Null]);
        assert_eq!(aggregate(&control, &refs(&rs), 2), Aggregation::NoRatings);
    }

    #[test]
    fn test_number_zero_is_not_no_data() {
        let control = Control::new("n", "number");
        let rs = results("n", "number", vec![json!(0)]);
        assert_eq!(aggregate(&control, &refs(&rs), 1), Aggregation::NumberAverage(0.0));

        let rs = results("n", "number", vec![Value::Null]);
        assert_eq!(aggregate(&control, &refs(&rs), 1), Aggregation::NoData);
    }

    #[test]
    fn test_ranker_passes_first_buckets() {
        let control = Control::new("rank", "ranker");
        let rs = results(
            "rank",
            "ranker",
            vec![json!({"top": ["2", "1"], "rest": ["3"]}), json!({"top": ["3"]})],
        );

        assert_eq!(
            aggregate(&control, &refs(&rs), 2),
            Aggregation::RankerBuckets(vec![
                Bucket { name: "top".to_string(), items: vec!["2".to_string(), "1".to_string()] },
                Bucket { name: "rest".to_string(), items: vec!["3".to_string()] },
            ])
        );
    }

    #[test]
    fn test_textarea_not_applicable() {
        let control = Control::new("c", "textarea");
        let rs = vec![RawResult::new("c", "textarea", json!({"text": ["hi"]}))];
        assert_eq!(aggregate(&control, &refs(&rs), 1), Aggregation::NotApplicable);
    }

    #[test]
    fn test_group_by_control_and_summarize() {
        let snapshot: TaskSnapshot = serde_json::from_value(json!({
            "controls": [
                {"name": "sentiment", "type": "choices"},
                {"name": "score", "type": "rating"},
            ],
            "annotations": [
                {"result": [
                    {"from_name": "sentiment", "type": "choices", "value": {"choices": ["pos"]}},
                    {"from_name": "score", "type": "rating", "value": {"rating": 3}},
                ]},
                {"result": [
                    {"from_name": "sentiment", "type": "choices", "value": {"choices": ["neg"]}},
                ]},
            ],
        }))
        .unwrap();

        assert_eq!(group_by_control(&snapshot.annotations, "sentiment").len(), 2);
        assert_eq!(group_by_control(&snapshot.annotations, "score").len(), 1);

        let summaries = summarize(&snapshot);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].control, "sentiment");
        assert_eq!(summaries[0].result_count, 2);
        assert_eq!(summaries[1].aggregation, Aggregation::RatingAverage(1.5));
    }
}
