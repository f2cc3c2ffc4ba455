//! Presentation of aggregation outcomes.
//!
//! Turns an [`Aggregation`] into display chips or text. Presentation is
//! deterministic: the same outcome always yields the same chips.

use crate::models::{Aggregation, LabelAttrs};
use serde::{Deserialize, Serialize};

pub const NO_DATA: &str = "No data";
pub const NO_RATINGS: &str = "No ratings";
pub const NOT_APPLICABLE: &str = "N/A";
pub const STAR: &str = "★";

/// A small label display element with an optional count or percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chip {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default)]
    pub colors: LabelAttrs,
    #[serde(default)]
    pub thick_border: bool,
}

impl Chip {
    pub fn plain(label: &str) -> Self {
        Self {
            label: label.to_string(),
            prefix: None,
            colors: LabelAttrs::default(),
            thick_border: false,
        }
    }

    pub fn with_prefix(mut self, prefix: String) -> Self {
        self.prefix = Some(prefix);
        self
    }

    pub fn with_colors(mut self, colors: LabelAttrs) -> Self {
        self.colors = colors;
        self
    }

    /// Chip text, prefix first.
    pub fn text(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{} {}", prefix, self.label),
            None => self.label.clone(),
        }
    }
}

/// Renderable form of a control's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Presentation {
    Chips(Vec<Chip>),
    Text(String),
    Paragraphs(Vec<String>),
    Buckets(Vec<(String, Vec<Chip>)>),
    /// Fallback text for missing or inapplicable values.
    Placeholder(String),
}

impl Presentation {
    /// Flatten into a single line of text.
    pub fn to_plain_text(&self) -> String {
        match self {
            Presentation::Chips(chips) => chips
                .iter()
                .map(Chip::text)
                .collect::<Vec<_>>()
                .join(", "),
            Presentation::Text(text) | Presentation::Placeholder(text) => text.clone(),
            Presentation::Paragraphs(paragraphs) => paragraphs.join(" ¶ "),
            Presentation::Buckets(buckets) => buckets
                .iter()
                .map(|(name, chips)| {
                    let items: Vec<_> = chips.iter().map(Chip::text).collect();
                    format!("{}: {}", name, items.join(", "))
                })
                .collect::<Vec<_>>()
                .join("; "),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Presentation::Placeholder(_))
    }
}

/// Turn an aggregation outcome into chips or text.
pub fn present(aggregation: &Aggregation) -> Presentation {
    match aggregation {
        Aggregation::NoData => Presentation::Placeholder(NO_DATA.to_string()),
        Aggregation::NoRatings => Presentation::Placeholder(NO_RATINGS.to_string()),
        Aggregation::NotApplicable => Presentation::Placeholder(NOT_APPLICABLE.to_string()),
        Aggregation::LabelCounts(counts) => Presentation::Chips(
            counts
                .iter()
                .filter(|c| c.count > 0)
                .map(|c| Chip {
                    thick_border: true,
                    ..Chip::plain(&c.label)
                        .with_prefix(c.count.to_string())
                        .with_colors(c.colors.clone())
                })
                .collect(),
        ),
        Aggregation::ChoicePercentages(shares) | Aggregation::TaxonomyPathPercentages(shares) => {
            Presentation::Chips(
                shares
                    .iter()
                    .map(|s| {
                        Chip::plain(&s.value)
                            .with_prefix(format!("{:.1}%", s.percentage))
                            .with_colors(LabelAttrs {
                                background: s.background.clone(),
                                ..Default::default()
                            })
                    })
                    .collect(),
            )
        }
        Aggregation::PairwiseCounts(counts) => Presentation::Chips(
            counts
                .iter()
                .map(|c| Chip::plain(&c.value).with_prefix(c.count.to_string()))
                .collect(),
        ),
        Aggregation::RatingAverage(avg) => Presentation::Text(format!("Avg: {:.1} {}", avg, STAR)),
        Aggregation::NumberAverage(avg) => Presentation::Text(format!("Avg: {:.1}", avg)),
        Aggregation::RankerBuckets(buckets) => Presentation::Buckets(
            buckets
                .iter()
                .map(|b| {
                    let chips = b.items.iter().map(|item| Chip::plain(item)).collect();
                    (b.name.clone(), chips)
                })
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bucket, Count, LabelCount, Share};

    #[test]
    fn test_present_placeholders() {
        assert_eq!(present(&Aggregation::NoData), Presentation::Placeholder("No data".into()));
        assert_eq!(present(&Aggregation::NoRatings), Presentation::Placeholder("No ratings".into()));
        assert_eq!(present(&Aggregation::NotApplicable), Presentation::Placeholder("N/A".into()));
    }

    #[test]
    fn test_present_averages() {
        assert_eq!(present(&Aggregation::RatingAverage(4.5)).to_plain_text(), "Avg: 4.5 ★");
        assert_eq!(present(&Aggregation::NumberAverage(0.0)).to_plain_text(), "Avg: 0.0");
        assert_ne!(
            present(&Aggregation::NumberAverage(0.0)),
            present(&Aggregation::NoData)
        );
    }

    #[test]
    fn test_present_label_counts() {
        let presentation = present(&Aggregation::LabelCounts(vec![
            LabelCount {
                label: "Car".into(),
                count: 2,
                colors: LabelAttrs {
                    background: Some("#f00".into()),
                    ..Default::default()
                },
            },
            LabelCount {
                label: "Ghost".into(),
                count: 0,
                colors: LabelAttrs::default(),
            },
        ]));

        let Presentation::Chips(chips) = &presentation else {
            panic!("expected chips");
        };
        assert_eq!(chips.len(), 1);
        assert!(chips[0].thick_border);
        assert_eq!(chips[0].colors.background.as_deref(), Some("#f00"));
        assert_eq!(presentation.to_plain_text(), "2 Car");
    }

    #[test]
    fn test_present_shares() {
        let presentation = present(&Aggregation::ChoicePercentages(vec![
            Share { value: "a".into(), count: 2, percentage: 66.7, background: None },
            Share { value: "b".into(), count: 1, percentage: 33.3, background: None },
        ]));
        assert_eq!(presentation.to_plain_text(), "66.7% a, 33.3% b");

        let presentation = present(&Aggregation::TaxonomyPathPercentages(vec![Share {
            value: "A / B".into(),
            count: 1,
            percentage: 100.0,
            background: None,
        }]));
        assert_eq!(presentation.to_plain_text(), "100.0% A / B");
    }

    #[test]
    fn test_present_pairwise_and_ranker() {
        let presentation = present(&Aggregation::PairwiseCounts(vec![Count {
            value: "left".into(),
            count: 3,
        }]));
        assert_eq!(presentation.to_plain_text(), "3 left");

        let presentation = present(&Aggregation::RankerBuckets(vec![
            Bucket { name: "top".into(), items: vec!["1".into(), "2".into()] },
            Bucket { name: "bottom".into(), items: vec!["3".into()] },
        ]));
        assert_eq!(presentation.to_plain_text(), "top: 1, 2; bottom: 3");
    }

    #[test]
    fn test_present_is_deterministic() {
        let aggregation = Aggregation::PairwiseCounts(vec![
            Count { value: "right".into(), count: 2 },
            Count { value: "left".into(), count: 1 },
        ]);
        assert_eq!(present(&aggregation), present(&aggregation));
    }
}
