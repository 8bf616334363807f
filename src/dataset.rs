//! The in-memory table every analysis reads from.
//!
//! A [`Dataset`] is built once at startup and never mutated afterwards, so
//! workers share it through an `Arc` without any locking.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// One measurement for a question at a location.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub question: String,
    pub location: String,
    pub value: f64,
    pub stratification_category: Option<String>,
    pub stratification: Option<String>,
}

impl Row {
    pub fn new(question: impl Into<String>, location: impl Into<String>, value: f64) -> Self {
        Self {
            question: question.into(),
            location: location.into(),
            value,
            stratification_category: None,
            stratification: None,
        }
    }

    pub fn with_stratification(
        mut self,
        category: impl Into<String>,
        stratification: impl Into<String>,
    ) -> Self {
        self.stratification_category = Some(category.into());
        self.stratification = Some(stratification.into());
        self
    }
}

/// CSV record shape. Unlisted columns are ignored.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "Question")]
    question: String,
    #[serde(rename = "LocationDesc")]
    location: String,
    #[serde(rename = "Data_Value", default, deserialize_with = "csv::invalid_option")]
    value: Option<f64>,
    #[serde(rename = "StratificationCategory1", default)]
    stratification_category: Option<String>,
    #[serde(rename = "Stratification1", default)]
    stratification: Option<String>,
}

#[derive(Debug, Default)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let dataset = Self::from_reader(file)?;
        tracing::info!(path = %path.display(), rows = dataset.len(), "Dataset loaded");
        Ok(dataset)
    }

    /// Parse CSV with a header row. Rows without a finite numeric value carry
    /// no measurement and are dropped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut rows = Vec::new();
        let mut skipped = 0usize;

        for record in reader.deserialize::<CsvRecord>() {
            let record = record?;
            let Some(value) = record.value.filter(|v| v.is_finite()) else {
                skipped += 1;
                continue;
            };
            rows.push(Row {
                question: record.question,
                location: record.location,
                value,
                stratification_category: non_empty(record.stratification_category),
                stratification: non_empty(record.stratification),
            });
        }

        if skipped > 0 {
            tracing::debug!(skipped, "Dropped rows without a numeric Data_Value");
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows answering `question`, in table order.
    pub fn question_rows<'a>(&'a self, question: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
        self.rows.iter().filter(move |row| row.question == question)
    }

    /// Distinct locations that have data for `question`, in first-seen order.
    pub fn locations<'a>(&'a self, question: &'a str) -> Vec<&'a str> {
        let mut seen = std::collections::HashSet::new();
        self.question_rows(question)
            .map(|row| row.location.as_str())
            .filter(|location| seen.insert(*location))
            .collect()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
