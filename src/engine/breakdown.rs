//! Per-category breakdowns behind the dashboard charts.

use serde::Serialize;

use crate::census::{AGE, EDUCATION, NATIVE_COUNTRY};
use crate::engine::{
    Bins, Counts, binned_histogram, conditional_mean, group_ratios, report::high_income, round1,
};
use crate::processor::{ComputationError, Condition, dataset::Dataset};

pub const DEFAULT_COUNTRY_LIMIT: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationSummary {
    pub education: String,
    pub total: usize,
    pub rich_count: usize,
    pub rich_percentage: f64,
    pub average_age: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountrySummary {
    pub country: String,
    pub total: usize,
    pub rich_percentage: f64,
}

/// One entry per education label, largest groups first
pub fn education_breakdown(dataset: &Dataset) -> Result<Vec<EducationSummary>, ComputationError> {
    let mut out = group_ratios(dataset, EDUCATION, &high_income())?
        .into_iter()
        .map(|ratio| {
            let average_age =
                conditional_mean(dataset, &Condition::equals(EDUCATION, &ratio.group), AGE)?;
            Ok(EducationSummary {
                rich_percentage: round1(ratio.percentage()),
                total: ratio.total,
                rich_count: ratio.matching,
                education: ratio.group,
                average_age,
            })
        })
        .collect::<Result<Vec<_>, ComputationError>>()?;

    out.sort_by(|a, b| b.total.cmp(&a.total));
    Ok(out)
}

/// The `limit` most populous countries, highest >50K share first
pub fn country_analysis(
    dataset: &Dataset,
    limit: usize,
) -> Result<Vec<CountrySummary>, ComputationError> {
    let mut ratios = group_ratios(dataset, NATIVE_COUNTRY, &high_income())?;
    ratios.sort_by(|a, b| b.total.cmp(&a.total));
    ratios.truncate(limit);

    let mut out: Vec<CountrySummary> = ratios
        .into_iter()
        .map(|ratio| CountrySummary {
            rich_percentage: round1(ratio.percentage()),
            total: ratio.total,
            country: ratio.group,
        })
        .collect();

    out.sort_by(|a, b| b.rich_percentage.total_cmp(&a.rich_percentage));
    Ok(out)
}

/// Age histogram over the dashboard age groups
pub fn age_distribution(dataset: &Dataset) -> Result<Counts, ComputationError> {
    binned_histogram(dataset, AGE, &Bins::age_groups())
}
