use std::collections::HashMap;

use rand::Rng;
use serde_json::Value;
use tracing::debug;

use crate::{
    config,
    types::{AggregatedTerm, Palette},
};

/// Category to palette assignment, drawn once per aggregation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PaletteMap {
    entries: HashMap<String, Palette>,
}

impl PaletteMap {
    pub fn get(&self, category: &str) -> Option<Palette> {
        self.entries.get(category).copied()
    }

    /// Palette for `category`, gold when the category was never assigned.
    pub fn resolve(&self, category: &str) -> Palette {
        self.get(category).unwrap_or(Palette::Gold)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Aggregated terms together with the palette draw that belongs to them.
#[derive(Clone, Debug, Default)]
pub struct CloudData {
    pub terms: Vec<AggregatedTerm>,
    pub palettes: PaletteMap,
}

impl CloudData {
    pub fn build<R: Rng + ?Sized>(records: &[Value], rng: &mut R) -> Self {
        let terms = aggregate(records);
        let palettes = assign_palettes(&terms, rng);
        debug!(
            records = records.len(),
            terms = terms.len(),
            categories = palettes.len(),
            "aggregated word cloud terms"
        );
        Self { terms, palettes }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

pub fn aggregate(records: &[Value]) -> Vec<AggregatedTerm> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut terms: Vec<AggregatedTerm> = Vec::new();

    for record in records {
        // A record without a label would fall into the default category,
        // but it also has no term text, so it never reaches the output.
        let Some(label) = resolve_label(record) else {
            continue;
        };
        let text = label.trim();
        if !is_valid_term(text) {
            continue;
        }
        match index.get(text) {
            Some(&idx) => terms[idx].count += 1,
            None => {
                index.insert(text.to_string(), terms.len());
                terms.push(AggregatedTerm {
                    text: text.to_string(),
                    count: 1,
                    category: text.to_string(),
                });
            }
        }
    }

    // Vec::sort_by is stable, so equal counts keep encounter order.
    terms.sort_by(|a, b| b.count.cmp(&a.count));
    terms.truncate(config::MAX_TERMS);
    terms
}

pub fn assign_palettes<R: Rng + ?Sized>(terms: &[AggregatedTerm], rng: &mut R) -> PaletteMap {
    let mut entries = HashMap::new();
    for term in terms {
        if entries.contains_key(&term.category) {
            continue;
        }
        let palette = if rng.gen_bool(0.5) {
            Palette::Gold
        } else {
            Palette::Green
        };
        entries.insert(term.category.clone(), palette);
    }
    PaletteMap { entries }
}

/// First truthy alias field of a record, as text.
fn resolve_label(record: &Value) -> Option<String> {
    let object = record.as_object()?;
    config::LABEL_FIELDS
        .iter()
        .filter_map(|field| object.get(*field))
        .find_map(label_text)
}

fn label_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn is_valid_term(text: &str) -> bool {
    if config::IGNORED_LABELS
        .iter()
        .any(|ignored| ignored.to_lowercase() == text.to_lowercase())
    {
        return false;
    }
    if text.chars().count() < 2 {
        return false;
    }
    // Labels made only of digits, `_` or non-ASCII-word characters are noise.
    text.chars().any(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use serde_json::json;

    fn modules(labels: &[&str]) -> Vec<Value> {
        labels.iter().map(|l| json!({ "module": l })).collect()
    }

    fn term(text: &str, count: u32) -> AggregatedTerm {
        AggregatedTerm {
            text: text.to_string(),
            count,
            category: text.to_string(),
        }
    }

    mod aggregate_fn {
        use super::*;

        #[test]
        fn counts_and_drops_invalid_labels() {
            let records = modules(&["Search", "Search", "Checkout", "N/A", "x"]);
            assert_eq!(
                aggregate(&records),
                vec![term("Search", 2), term("Checkout", 1)]
            );
        }

        #[test]
        fn ignore_list_is_case_insensitive() {
            let records = modules(&[
                "n/a", "NONE", "Unknown", "OTHER", "na", "-", "NULL", "Undefined", "无",
            ]);
            assert!(aggregate(&records).is_empty());
        }

        #[test]
        fn rejects_digits_and_punctuation() {
            let records = modules(&["123", "--", "__", "4.5", "!!", "   "]);
            assert!(aggregate(&records).is_empty());
        }

        #[test]
        fn drops_labels_without_ascii_letters() {
            let records = modules(&["支付", "Поиск", "支付_2"]);
            assert!(aggregate(&records).is_empty());
        }

        #[test]
        fn keeps_mixed_script_labels() {
            let records = modules(&["支付 Pay", "支付 Pay"]);
            assert_eq!(aggregate(&records), vec![term("支付 Pay", 2)]);
        }

        #[test]
        fn trims_labels() {
            let records = modules(&["  Cart ", "Cart"]);
            assert_eq!(aggregate(&records), vec![term("Cart", 2)]);
        }

        #[test]
        fn uses_first_truthy_alias() {
            let records = vec![
                json!({ "feature_module": "Login", "module": "Ignored" }),
                json!({ "feature_module": "", "module": "Profile" }),
                json!({ "feature_module": null, "label": "Profile" }),
                json!({ "module": 0, "type": "Billing" }),
            ];
            assert_eq!(
                aggregate(&records),
                vec![term("Profile", 2), term("Login", 1), term("Billing", 1)]
            );
        }

        #[test]
        fn skips_records_without_label() {
            let records = vec![json!({ "comment": "great app" }), json!("bare"), json!(null)];
            assert!(aggregate(&records).is_empty());
        }

        #[test]
        fn ignores_container_values() {
            let records = vec![json!({ "module": { "name": "Nested" }, "label": "Flat" })];
            assert_eq!(aggregate(&records), vec![term("Flat", 1)]);
        }

        #[test]
        fn keeps_top_terms_in_descending_order() {
            let mut records = Vec::new();
            for i in 0..60u32 {
                let label = format!("term{i}");
                for _ in 0..=i {
                    records.push(json!({ "module": label }));
                }
            }
            let terms = aggregate(&records);
            assert_eq!(terms.len(), config::MAX_TERMS);
            assert!(terms.windows(2).all(|w| w[0].count >= w[1].count));
            assert_eq!(terms[0].text, "term59");
            assert_eq!(terms[0].count, 60);
        }

        #[test]
        fn ties_keep_encounter_order() {
            let records = modules(&["Beta", "Alpha", "Gamma", "Alpha"]);
            let texts: Vec<String> = aggregate(&records).into_iter().map(|t| t.text).collect();
            assert_eq!(texts, vec!["Alpha", "Beta", "Gamma"]);
        }

        #[test]
        fn is_deterministic() {
            let records = modules(&["Search", "Cart", "Search", "Pay", "Cart", "Cart"]);
            assert_eq!(aggregate(&records), aggregate(&records));
        }
    }

    mod assign_palettes_fn {
        use super::*;

        #[test]
        fn one_palette_per_category() {
            let terms = vec![
                AggregatedTerm {
                    text: "Search".into(),
                    count: 3,
                    category: "Discovery".into(),
                },
                AggregatedTerm {
                    text: "Browse".into(),
                    count: 2,
                    category: "Discovery".into(),
                },
                AggregatedTerm {
                    text: "Checkout".into(),
                    count: 1,
                    category: "Payments".into(),
                },
            ];
            for seed in 0..32 {
                let mut rng = StdRng::seed_from_u64(seed);
                let palettes = assign_palettes(&terms, &mut rng);
                assert_eq!(palettes.len(), 2);
                assert!(palettes.get("Discovery").is_some());
                assert!(palettes.get("Payments").is_some());
            }
        }

        #[test]
        fn both_palettes_occur() {
            let terms: Vec<AggregatedTerm> = (0..40).map(|i| term(&format!("t{i}x"), 1)).collect();
            let mut rng = StdRng::seed_from_u64(7);
            let palettes = assign_palettes(&terms, &mut rng);
            let gold = terms
                .iter()
                .filter(|t| palettes.resolve(&t.category) == Palette::Gold)
                .count();
            assert!(gold > 0 && gold < terms.len());
        }

        #[test]
        fn empty_terms_yield_empty_map() {
            let mut rng = StdRng::seed_from_u64(1);
            assert!(assign_palettes(&[], &mut rng).is_empty());
        }
    }

    mod cloud_data_build {
        use super::*;

        #[test]
        fn palettes_cover_every_output_category() {
            let records = modules(&["Search", "Search", "Checkout", "N/A", "x"]);
            let mut rng = StdRng::seed_from_u64(42);
            let data = CloudData::build(&records, &mut rng);
            assert_eq!(data.terms.len(), 2);
            for t in &data.terms {
                assert!(data.palettes.get(&t.category).is_some());
            }
        }

        #[test]
        fn empty_records_give_empty_cloud() {
            let mut rng = StdRng::seed_from_u64(42);
            assert!(CloudData::build(&[], &mut rng).is_empty());
        }
    }
}
