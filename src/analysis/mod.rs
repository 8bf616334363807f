//! Aggregation engine.
//!
//! Nine pure computations over a shared, read-only [`Dataset`]:
//!
//! - [`means`]: per-location means, rankings and differences from the global mean
//! - [`category`]: means grouped by stratification category and value
//! - [`questions`]: which questions rank "lower is better" vs "higher is better"
//!
//! Requests arrive as an [`Analysis`], a closed enum carrying exactly the
//! parameters each kind needs. [`Analysis::run`] dispatches to the matching
//! function and renders the result as an ordered JSON object, which is the
//! contract pollers receive.

pub mod category;
pub mod means;
pub mod questions;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::dataset::Dataset;

/// Ordered `(key, value)` pairs. Order is part of the output contract.
pub type Means = Vec<(String, f64)>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("invalid question for ranking: {0}")]
    InvalidQuestion(String),

    #[error("no data for question '{question}'")]
    NoData { question: String },

    #[error("no data for question '{question}' in state '{state}'")]
    NoStateData { question: String, state: String },

    #[error("result for question '{question}' is not a finite number")]
    NonFinite { question: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    #[error("missing required parameter 'question'")]
    MissingQuestion,

    #[error("missing required parameter 'state' for {0}")]
    MissingState(AnalysisKind),

    #[error("unknown analysis kind '{0}'")]
    UnknownKind(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    StateMean,
    StatesMean,
    Best5,
    Worst5,
    GlobalMean,
    StateDiffFromMean,
    DiffFromMean,
    StateMeanByCategory,
    MeanByCategory,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 9] = [
        AnalysisKind::StatesMean,
        AnalysisKind::StateMean,
        AnalysisKind::Best5,
        AnalysisKind::Worst5,
        AnalysisKind::GlobalMean,
        AnalysisKind::DiffFromMean,
        AnalysisKind::StateDiffFromMean,
        AnalysisKind::MeanByCategory,
        AnalysisKind::StateMeanByCategory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::StateMean => "state_mean",
            AnalysisKind::StatesMean => "states_mean",
            AnalysisKind::Best5 => "best5",
            AnalysisKind::Worst5 => "worst5",
            AnalysisKind::GlobalMean => "global_mean",
            AnalysisKind::StateDiffFromMean => "state_diff_from_mean",
            AnalysisKind::DiffFromMean => "diff_from_mean",
            AnalysisKind::StateMeanByCategory => "state_mean_by_category",
            AnalysisKind::MeanByCategory => "mean_by_category",
        }
    }

    /// Whether the kind is scoped to a single location.
    pub fn requires_state(&self) -> bool {
        matches!(
            self,
            AnalysisKind::StateMean
                | AnalysisKind::StateDiffFromMean
                | AnalysisKind::StateMeanByCategory
        )
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParameterError::UnknownKind(s.to_string()))
    }
}

/// Request body as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    #[serde(default)]
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Parameters {
    pub fn question(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            state: None,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}

/// A validated aggregation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analysis {
    StateMean { question: String, state: String },
    StatesMean { question: String },
    Best5 { question: String },
    Worst5 { question: String },
    GlobalMean { question: String },
    StateDiffFromMean { question: String, state: String },
    DiffFromMean { question: String },
    StateMeanByCategory { question: String, state: String },
    MeanByCategory { question: String },
}

impl Analysis {
    /// Validate raw parameters for `kind`. A `state` sent to a kind that does
    /// not use one is ignored.
    pub fn from_request(kind: AnalysisKind, params: Parameters) -> Result<Self, ParameterError> {
        let question = params.question;
        if question.trim().is_empty() {
            return Err(ParameterError::MissingQuestion);
        }

        let state = if kind.requires_state() {
            match params.state {
                Some(state) if !state.trim().is_empty() => state,
                _ => return Err(ParameterError::MissingState(kind)),
            }
        } else {
            String::new()
        };

        Ok(match kind {
            AnalysisKind::StateMean => Analysis::StateMean { question, state },
            AnalysisKind::StatesMean => Analysis::StatesMean { question },
            AnalysisKind::Best5 => Analysis::Best5 { question },
            AnalysisKind::Worst5 => Analysis::Worst5 { question },
            AnalysisKind::GlobalMean => Analysis::GlobalMean { question },
            AnalysisKind::StateDiffFromMean => Analysis::StateDiffFromMean { question, state },
            AnalysisKind::DiffFromMean => Analysis::DiffFromMean { question },
            AnalysisKind::StateMeanByCategory => Analysis::StateMeanByCategory { question, state },
            AnalysisKind::MeanByCategory => Analysis::MeanByCategory { question },
        })
    }

    pub fn kind(&self) -> AnalysisKind {
        match self {
            Analysis::StateMean { .. } => AnalysisKind::StateMean,
            Analysis::StatesMean { .. } => AnalysisKind::StatesMean,
            Analysis::Best5 { .. } => AnalysisKind::Best5,
            Analysis::Worst5 { .. } => AnalysisKind::Worst5,
            Analysis::GlobalMean { .. } => AnalysisKind::GlobalMean,
            Analysis::StateDiffFromMean { .. } => AnalysisKind::StateDiffFromMean,
            Analysis::DiffFromMean { .. } => AnalysisKind::DiffFromMean,
            Analysis::StateMeanByCategory { .. } => AnalysisKind::StateMeanByCategory,
            Analysis::MeanByCategory { .. } => AnalysisKind::MeanByCategory,
        }
    }

    pub fn question(&self) -> &str {
        match self {
            Analysis::StateMean { question, .. }
            | Analysis::StatesMean { question }
            | Analysis::Best5 { question }
            | Analysis::Worst5 { question }
            | Analysis::GlobalMean { question }
            | Analysis::StateDiffFromMean { question, .. }
            | Analysis::DiffFromMean { question }
            | Analysis::StateMeanByCategory { question, .. }
            | Analysis::MeanByCategory { question } => question,
        }
    }

    /// Compute the result over `dataset` as the JSON object stored for pollers.
    /// Means that overflow to infinity or NaN are reported as errors rather
    /// than rendered as `null`.
    pub fn run(&self, dataset: &Dataset) -> Result<Value, AnalysisError> {
        let number = |value: f64| finite(self.question(), value);
        let value = match self {
            Analysis::StateMean { question, state } => {
                let mean = means::state_mean(dataset, question, state)?;
                object([(state.clone(), number(mean)?)])
            }
            Analysis::StatesMean { question } => {
                means_object(question, means::states_mean(dataset, question)?)?
            }
            Analysis::Best5 { question } => means_object(question, means::best5(dataset, question)?)?,
            Analysis::Worst5 { question } => {
                means_object(question, means::worst5(dataset, question)?)?
            }
            Analysis::GlobalMean { question } => {
                let mean = means::global_mean(dataset, question)?;
                object([("global_mean".to_string(), number(mean)?)])
            }
            Analysis::StateDiffFromMean { question, state } => {
                let diff = means::state_diff_from_mean(dataset, question, state)?;
                object([(state.clone(), number(diff)?)])
            }
            Analysis::DiffFromMean { question } => {
                means_object(question, means::diff_from_mean(dataset, question)?)?
            }
            Analysis::StateMeanByCategory { question, state } => {
                let groups = category::state_mean_by_category(dataset, question, state)?;
                object([(state.clone(), means_object(question, groups)?)])
            }
            Analysis::MeanByCategory { question } => {
                means_object(question, category::mean_by_category(dataset, question)?)?
            }
        };
        Ok(value)
    }
}

fn finite(question: &str, value: f64) -> Result<Value, AnalysisError> {
    if value.is_finite() {
        Ok(Value::from(value))
    } else {
        Err(AnalysisError::NonFinite {
            question: question.to_string(),
        })
    }
}

fn object(entries: impl IntoIterator<Item = (String, Value)>) -> Value {
    Value::Object(entries.into_iter().collect::<Map<String, Value>>())
}

fn means_object(question: &str, means: Means) -> Result<Value, AnalysisError> {
    let entries = means
        .into_iter()
        .map(|(key, value)| Ok((key, finite(question, value)?)))
        .collect::<Result<Vec<_>, AnalysisError>>()?;
    Ok(object(entries))
}
