//! Per-annotation cell rendering.
//!
//! Renders one annotation's results for one control, as shown in the
//! annotation rows of the summary table. `None` means an empty cell.

use crate::analysis::count_in_order;
use crate::extract::{typed_value, ResultValue};
use crate::models::{Control, ControlKind, RawResult};
use crate::report::present::{Chip, Presentation, STAR};

/// Ratings beyond this many stars are clamped.
const MAX_STARS: usize = 10;

/// Render the results one annotation gave for one control.
pub fn render_cell(control: &Control, results: &[&RawResult]) -> Option<Presentation> {
    let first = results.first()?;

    match &control.kind {
        ControlKind::Labels(_) => {
            let labels = results.iter().flat_map(|r| match typed_value(r) {
                ResultValue::Labels(labels) => labels,
                _ => Vec::new(),
            });
            let chips: Vec<Chip> = count_in_order(labels)
                .into_iter()
                .map(|(label, count)| Chip {
                    thick_border: true,
                    ..Chip::plain(&label)
                        .with_prefix(count.to_string())
                        .with_colors(control.attrs_for(&label).cloned().unwrap_or_default())
                })
                .collect();
            non_empty(chips)
        }
        ControlKind::Choices => {
            let choices = results.iter().flat_map(|r| match typed_value(r) {
                ResultValue::Choices(choices) => choices,
                _ => Vec::new(),
            });
            let chips: Vec<Chip> = count_in_order(choices)
                .into_iter()
                .map(|(choice, _)| {
                    let colors = control
                        .attrs_for(&choice)
                        .map(|a| a.background_only())
                        .unwrap_or_default();
                    Chip::plain(&choice).with_colors(colors)
                })
                .collect();
            non_empty(chips)
        }
        ControlKind::Pairwise => match typed_value(first) {
            ResultValue::Pairwise(sides) => {
                non_empty(sides.iter().map(|side| Chip::plain(side)).collect())
            }
            _ => None,
        },
        ControlKind::Ranker => match typed_value(first) {
            ResultValue::Ranker(buckets) => Some(Presentation::Buckets(
                buckets
                    .into_iter()
                    .map(|b| (b.name, b.items.iter().map(|i| Chip::plain(i)).collect()))
                    .collect(),
            )),
            _ => None,
        },
        _ if control.per_region => None,
        ControlKind::DateTime => match typed_value(first) {
            ResultValue::DateTime(value) => Some(Presentation::Text(value)),
            _ => None,
        },
        ControlKind::Number => match typed_value(first) {
            ResultValue::Number(value) => Some(Presentation::Text(format_number(value))),
            _ => None,
        },
        ControlKind::Taxonomy => match typed_value(first) {
            ResultValue::Taxonomy(paths) => non_empty(
                paths
                    .iter()
                    .map(|path| Chip::plain(&path.join(control.path_separator())))
                    .collect(),
            ),
            _ => None,
        },
        ControlKind::TextArea => match typed_value(first) {
            ResultValue::TextArea(texts) if !texts.is_empty() => {
                Some(Presentation::Paragraphs(texts))
            }
            _ => None,
        },
        ControlKind::Rating => match typed_value(first) {
            ResultValue::Rating(value) if value > 0.0 => {
                let stars = (value.round() as usize).min(MAX_STARS);
                Some(Presentation::Text(STAR.repeat(stars)))
            }
            _ => None,
        },
        ControlKind::Other(_) => None,
    }
}

fn non_empty(chips: Vec<Chip>) -> Option<Presentation> {
    if chips.is_empty() {
        None
    } else {
        Some(Presentation::Chips(chips))
    }
}

/// Integers print without a fractional part.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabelAttrs;
    use serde_json::json;

    fn one(from_name: &str, result_type: &str, value: serde_json::Value) -> RawResult {
        RawResult::new(from_name, result_type, value)
    }

    #[test]
    fn test_empty_results_render_nothing() {
        let control = Control::new("c", "choices");
        assert_eq!(render_cell(&control, &[]), None);
    }

    #[test]
    fn test_labels_counted_per_annotation() {
        let mut control = Control::new("label", "rectanglelabels");
        control.label_attrs.insert(
            "Car".to_string(),
            LabelAttrs {
                background: Some("#f00".into()),
                border: Some("#a00".into()),
                color: Some("#fff".into()),
            },
        );
        let a = one("label", "rectanglelabels", json!({"rectanglelabels": ["Car"]}));
        let b = one("label", "rectanglelabels", json!({"rectanglelabels": ["Person"]}));
        let c = one("label", "rectanglelabels", json!({"rectanglelabels": ["Car"]}));

        let cell = render_cell(&control, &[&a, &b, &c]).unwrap();
        assert_eq!(cell.to_plain_text(), "2 Car, 1 Person");

        let Presentation::Chips(chips) = cell else {
            panic!("expected chips");
        };
        assert_eq!(chips[0].colors.border.as_deref(), Some("#a00"));
    }

    #[test]
    fn test_choices_unique_with_background() {
        let mut control = Control::new("c", "choices");
        control.label_attrs.insert(
            "pos".to_string(),
            LabelAttrs {
                background: Some("#0f0".into()),
                border: Some("#000".into()),
                color: None,
            },
        );
        let a = one("c", "choices", json!({"choices": ["pos", "neu", "pos"]}));

        let Some(Presentation::Chips(chips)) = render_cell(&control, &[&a]) else {
            panic!("expected chips");
        };
        assert_eq!(chips.len(), 2);
        assert_eq!(chips[0].label, "pos");
        assert_eq!(chips[0].colors.background.as_deref(), Some("#0f0"));
        assert_eq!(chips[0].colors.border, None);
        assert_eq!(chips[1].prefix, None);
    }

    #[test]
    fn test_per_region_skips_scalar_kinds() {
        let mut control = Control::new("n", "number");
        let a = one("n", "number", json!({"number": 3}));
        assert_eq!(
            render_cell(&control, &[&a]),
            Some(Presentation::Text("3".to_string()))
        );

        control.per_region = true;
        assert_eq!(render_cell(&control, &[&a]), None);
    }

    #[test]
    fn test_per_region_labels_still_render() {
        let mut control = Control::new("label", "labels");
        control.per_region = true;
        let a = one("label", "labels", json!({"labels": ["Car"]}));
        assert!(render_cell(&control, &[&a]).is_some());
    }

    #[test]
    fn test_taxonomy_full_paths() {
        let control = Control::new("tax", "taxonomy");
        let a = one("tax", "taxonomy", json!({"taxonomy": [["Animal", "Cat"], ["Plant"]]}));
        assert_eq!(
            render_cell(&control, &[&a]).unwrap().to_plain_text(),
            "Animal / Cat, Plant"
        );

        let mut control = Control::new("tax", "taxonomy");
        control.path_separator = Some(" > ".to_string());
        assert_eq!(
            render_cell(&control, &[&a]).unwrap().to_plain_text(),
            "Animal > Cat, Plant"
        );
    }

    #[test]
    fn test_textarea_paragraphs() {
        let control = Control::new("c", "textarea");
        let a = one("c", "textarea", json!({"text": ["first", "second"]}));
        assert_eq!(
            render_cell(&control, &[&a]),
            Some(Presentation::Paragraphs(vec!["first".into(), "second".into()]))
        );

        let empty = one("c", "textarea", json!({}));
        assert_eq!(render_cell(&control, &[&empty]), None);
    }

    #[test]
    fn test_rating_stars() {
        let control = Control::new("r", "rating");
        let a = one("r", "rating", json!({"rating": 3}));
        assert_eq!(render_cell(&control, &[&a]).unwrap().to_plain_text(), "★★★");

        let zero = one("r", "rating", json!({"rating": 0}));
        assert_eq!(render_cell(&control, &[&zero]), None);
    }

    #[test]
    fn test_datetime_ranker_pairwise() {
        let control = Control::new("d", "datetime");
        let a = one("d", "datetime", json!({"datetime": "2024-05-01T10:00"}));
        assert_eq!(render_cell(&control, &[&a]).unwrap().to_plain_text(), "2024-05-01T10:00");

        let control = Control::new("rank", "ranker");
        let a = one("rank", "ranker", json!({"ranker": {"best": [2, 1]}}));
        assert_eq!(render_cell(&control, &[&a]).unwrap().to_plain_text(), "best: 2, 1");

        let control = Control::new("cmp", "pairwise");
        let a = one("cmp", "pairwise", json!({"selected": "left"}));
        assert_eq!(render_cell(&control, &[&a]).unwrap().to_plain_text(), "left");
    }

    #[test]
    fn test_unknown_kind_renders_nothing() {
        let control = Control::new("v", "videorectangle");
        let a = one("v", "videorectangle", json!({"videorectangle": []}));
        assert_eq!(render_cell(&control, &[&a]), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-1.0), "-1");
    }
}
