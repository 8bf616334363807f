use std::cmp::Ordering;
use std::collections::HashMap;

use crate::analysis::questions::{classify, Preference};
use crate::analysis::{AnalysisError, Means};
use crate::dataset::Dataset;

const RANKING_SIZE: usize = 5;

/// Running sum for one group, folded in table order.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    pub(crate) fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub(crate) fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

fn ascending(a: &(String, f64), b: &(String, f64)) -> Ordering {
    a.1.total_cmp(&b.1)
}

fn descending(a: &(String, f64), b: &(String, f64)) -> Ordering {
    ascending(b, a)
}

pub fn state_mean(dataset: &Dataset, question: &str, state: &str) -> Result<f64, AnalysisError> {
    let mut acc = Accumulator::default();
    dataset
        .question_rows(question)
        .filter(|row| row.location == state)
        .for_each(|row| acc.push(row.value));

    acc.mean().ok_or_else(|| AnalysisError::NoStateData {
        question: question.to_string(),
        state: state.to_string(),
    })
}

/// Mean per location, ascending by value. Equal means keep the order in which
/// their locations first appear in the table.
pub fn states_mean(dataset: &Dataset, question: &str) -> Result<Means, AnalysisError> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Accumulator)> = Vec::new();

    for row in dataset.question_rows(question) {
        let slot = *index.entry(row.location.as_str()).or_insert_with(|| {
            groups.push((row.location.as_str(), Accumulator::default()));
            groups.len() - 1
        });
        groups[slot].1.push(row.value);
    }

    if groups.is_empty() {
        return Err(AnalysisError::NoData {
            question: question.to_string(),
        });
    }

    let mut means: Means = groups
        .into_iter()
        .filter_map(|(location, acc)| acc.mean().map(|m| (location.to_string(), m)))
        .collect();
    means.sort_by(ascending);
    Ok(means)
}

fn head(means: Means) -> Means {
    means.into_iter().take(RANKING_SIZE).collect()
}

fn tail_descending(means: Means) -> Means {
    let skip = means.len().saturating_sub(RANKING_SIZE);
    let mut tail: Means = means.into_iter().skip(skip).collect();
    tail.sort_by(descending);
    tail
}

pub fn best5(dataset: &Dataset, question: &str) -> Result<Means, AnalysisError> {
    let preference = classify(question)
        .ok_or_else(|| AnalysisError::InvalidQuestion(question.to_string()))?;
    let means = states_mean(dataset, question)?;

    Ok(match preference {
        Preference::Min => head(means),
        Preference::Max => tail_descending(means),
    })
}

pub fn worst5(dataset: &Dataset, question: &str) -> Result<Means, AnalysisError> {
    let preference = classify(question)
        .ok_or_else(|| AnalysisError::InvalidQuestion(question.to_string()))?;
    let means = states_mean(dataset, question)?;

    Ok(match preference {
        Preference::Min => tail_descending(means),
        Preference::Max => head(means),
    })
}

pub fn global_mean(dataset: &Dataset, question: &str) -> Result<f64, AnalysisError> {
    let mut acc = Accumulator::default();
    dataset
        .question_rows(question)
        .for_each(|row| acc.push(row.value));

    acc.mean().ok_or_else(|| AnalysisError::NoData {
        question: question.to_string(),
    })
}

/// `global_mean - state_mean` for one location.
pub fn state_diff_from_mean(
    dataset: &Dataset,
    question: &str,
    state: &str,
) -> Result<f64, AnalysisError> {
    let global = global_mean(dataset, question)?;
    let local = state_mean(dataset, question, state)?;
    Ok(global - local)
}

/// Difference from the global mean for every location, in `states_mean` order.
pub fn diff_from_mean(dataset: &Dataset, question: &str) -> Result<Means, AnalysisError> {
    let global = global_mean(dataset, question)?;
    Ok(states_mean(dataset, question)?
        .into_iter()
        .map(|(location, mean)| (location, global - mean))
        .collect())
}
