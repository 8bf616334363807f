/// Which direction counts as "better" for a question's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    /// Lower values are better
    Min,
    /// Higher values are better
    Max,
}

pub const QUESTIONS_BEST_IS_MIN: [&str; 5] = [
    "Percent of adults aged 18 years and older who have an overweight classification",
    "Percent of adults aged 18 years and older who have obesity",
    "Percent of adults who engage in no leisure-time physical activity",
    "Percent of adults who report consuming fruit less than one time daily",
    "Percent of adults who report consuming vegetables less than one time daily",
];

pub const QUESTIONS_BEST_IS_MAX: [&str; 4] = [
    "Percent of adults who achieve at least 150 minutes a week of moderate-intensity aerobic physical activity or 75 minutes a week of vigorous-intensity aerobic activity (or an equivalent combination)",
    "Percent of adults who achieve at least 150 minutes a week of moderate-intensity aerobic physical activity or 75 minutes a week of vigorous-intensity aerobic physical activity and engage in muscle-strengthening activities on 2 or more days a week",
    "Percent of adults who achieve at least 300 minutes a week of moderate-intensity aerobic physical activity or 150 minutes a week of vigorous-intensity aerobic activity (or an equivalent combination)",
    "Percent of adults who engage in muscle-strengthening activities on 2 or more days a week",
];

/// Look up the ranking direction of a question. Unclassified questions cannot
/// be ranked.
pub fn classify(question: &str) -> Option<Preference> {
    if QUESTIONS_BEST_IS_MIN.contains(&question) {
        Some(Preference::Min)
    } else if QUESTIONS_BEST_IS_MAX.contains(&question) {
        Some(Preference::Max)
    } else {
        None
    }
}
