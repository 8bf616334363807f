use std::collections::HashMap;

use crate::analysis::means::Accumulator;
use crate::analysis::{AnalysisError, Means};
use crate::dataset::{Dataset, Row};

/// Render a composite group key the way result consumers expect it:
/// `('first', 'second', ...)`.
pub fn composite_key(parts: &[&str]) -> String {
    let quoted: Vec<String> = parts.iter().map(|part| format!("'{}'", part)).collect();
    format!("({})", quoted.join(", "))
}

/// Mean per (category, stratification) pair of the given rows, keyed by the
/// prefix followed by the pair. Rows missing either field are not grouped.
fn group_means<'a>(
    rows: impl Iterator<Item = &'a Row>,
    prefix: impl Fn(&'a Row) -> Option<&'a str>,
) -> Means {
    let mut index: HashMap<(Option<&str>, &str, &str), usize> = HashMap::new();
    let mut groups: Vec<(String, Accumulator)> = Vec::new();

    for row in rows {
        let (Some(category), Some(stratification)) = (
            row.stratification_category.as_deref(),
            row.stratification.as_deref(),
        ) else {
            continue;
        };
        let lead = prefix(row);
        let slot = *index
            .entry((lead, category, stratification))
            .or_insert_with(|| {
                let key = match lead {
                    Some(lead) => composite_key(&[lead, category, stratification]),
                    None => composite_key(&[category, stratification]),
                };
                groups.push((key, Accumulator::default()));
                groups.len() - 1
            });
        groups[slot].1.push(row.value);
    }

    let mut means: Means = groups
        .into_iter()
        .filter_map(|(key, acc)| acc.mean().map(|m| (key, m)))
        .collect();
    means.sort_by(|a, b| a.0.cmp(&b.0));
    means
}

/// Means of one location's rows grouped by stratification, sorted by key.
pub fn state_mean_by_category(
    dataset: &Dataset,
    question: &str,
    state: &str,
) -> Result<Means, AnalysisError> {
    let mut state_rows = dataset
        .question_rows(question)
        .filter(|row| row.location == state)
        .peekable();

    if state_rows.peek().is_none() {
        return Err(AnalysisError::NoStateData {
            question: question.to_string(),
            state: state.to_string(),
        });
    }

    Ok(group_means(state_rows, |_| None))
}

/// Stratified means across every location, keyed by
/// `('location', 'category', 'stratification')` and sorted by key.
pub fn mean_by_category(dataset: &Dataset, question: &str) -> Result<Means, AnalysisError> {
    let mut rows = dataset.question_rows(question).peekable();

    if rows.peek().is_none() {
        return Err(AnalysisError::NoData {
            question: question.to_string(),
        });
    }

    Ok(group_means(rows, |row| Some(row.location.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stratified(state: &str, category: &str, strat: &str, value: f64) -> Row {
        Row::new("Q", state, value).with_stratification(category, strat)
    }

    fn dataset() -> Dataset {
        Dataset::from_rows(vec![
            stratified("Ohio", "Income", "$50,000 - $74,999", 30.0),
            stratified("Ohio", "Age (years)", "25 - 34", 20.0),
            stratified("Ohio", "Age (years)", "18 - 24", 10.0),
            stratified("Ohio", "Age (years)", "18 - 24", 14.0),
            Row::new("Q", "Ohio", 99.0),
            stratified("Iowa", "Total", "Total", 40.0),
            stratified("Alabama", "Age (years)", "18 - 24", 50.0),
        ])
    }

    #[test]
    fn composite_key_quotes_every_part() {
        assert_eq!(composite_key(&["Age (years)", "18 - 24"]), "('Age (years)', '18 - 24')");
        assert_eq!(composite_key(&["Ohio", "Total", "Total"]), "('Ohio', 'Total', 'Total')");
    }

    #[test]
    fn state_mean_by_category_groups_and_sorts() {
        let means = state_mean_by_category(&dataset(), "Q", "Ohio").unwrap();
        assert_eq!(
            means,
            vec![
                ("('Age (years)', '18 - 24')".to_string(), 12.0),
                ("('Age (years)', '25 - 34')".to_string(), 20.0),
                ("('Income', '$50,000 - $74,999')".to_string(), 30.0),
            ]
        );
    }

    #[test]
    fn state_mean_by_category_unstratified_rows_only() {
        let dataset = Dataset::from_rows(vec![Row::new("Q", "Ohio", 1.0)]);
        assert!(state_mean_by_category(&dataset, "Q", "Ohio")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn state_mean_by_category_unknown_state() {
        assert!(matches!(
            state_mean_by_category(&dataset(), "Q", "Texas"),
            Err(AnalysisError::NoStateData { .. })
        ));
    }

    #[test]
    fn mean_by_category_prefixes_location() {
        let means = mean_by_category(&dataset(), "Q").unwrap();
        let keys: Vec<&str> = means.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "('Alabama', 'Age (years)', '18 - 24')",
                "('Iowa', 'Total', 'Total')",
                "('Ohio', 'Age (years)', '18 - 24')",
                "('Ohio', 'Age (years)', '25 - 34')",
                "('Ohio', 'Income', '$50,000 - $74,999')",
            ]
        );
        assert_eq!(means[2].1, 12.0);
    }

    #[test]
    fn mean_by_category_unknown_question() {
        assert!(matches!(
            mean_by_category(&dataset(), "missing"),
            Err(AnalysisError::NoData { .. })
        ));
    }
}
