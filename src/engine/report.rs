use serde::{Deserialize, Serialize};
use std::fmt;

use crate::census::{
    ADVANCED_EDUCATION, AGE, BACHELORS, EDUCATION, HIGH_INCOME, HOURS_PER_WEEK, MALE,
    NATIVE_COUNTRY, OCCUPATION, RACE, SALARY, SEX,
};
use crate::engine::{
    Counts, conditional_mean, conditional_percentage, distribution_count, grouped_ratio_argmax,
    minimum, most_frequent,
};
use crate::processor::{
    AggregateResult, ComputationError, Condition, FilterPredicate, Value, dataset::Dataset,
};

pub const DEFAULT_COUNTRY_OF_INTEREST: &str = "India";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Country whose top high-income occupation is reported
    pub country_of_interest: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            country_of_interest: DEFAULT_COUNTRY_OF_INTEREST.to_string(),
        }
    }
}

/// Summary statistics for one dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsResult {
    pub total_records: usize,
    pub race_count: Counts,
    pub average_age_men: f64,
    pub percentage_bachelors: f64,
    /// Share earning >50K among Bachelors, Masters and Doctorate holders
    pub higher_education_rich: f64,
    /// Share earning >50K among everyone else
    pub lower_education_rich: f64,
    pub min_work_hours: i64,
    /// Share earning >50K among those working `min_work_hours`
    pub rich_percentage: f64,
    pub highest_earning_country: String,
    pub highest_earning_country_percentage: f64,
    pub country_of_interest: String,
    /// Most common occupation among >50K earners from `country_of_interest`, or "N/A"
    pub top_occupation: String,
}

pub(crate) fn high_income() -> Condition {
    Condition::equals(SALARY, HIGH_INCOME)
}

fn advanced_education() -> Vec<Value> {
    ADVANCED_EDUCATION.iter().map(|&e| Value::from(e)).collect()
}

/// Computes the full summary. Fails on the first statistic that is undefined.
pub fn full_report(
    dataset: &Dataset,
    options: &ReportOptions,
) -> Result<StatisticsResult, ComputationError> {
    let rich = high_income();

    let race_count = distribution_count(dataset, RACE)?;
    let average_age_men = conditional_mean(dataset, &Condition::equals(SEX, MALE), AGE)?;
    let percentage_bachelors = conditional_percentage(
        dataset,
        &Condition::equals(EDUCATION, BACHELORS),
        &Condition::all(),
    )?;

    let higher_education_rich = conditional_percentage(
        dataset,
        &rich,
        &Condition::new(EDUCATION, FilterPredicate::OneOf(advanced_education())),
    )?;
    let lower_education_rich = conditional_percentage(
        dataset,
        &rich,
        &Condition::new(EDUCATION, FilterPredicate::NoneOf(advanced_education())),
    )?;

    let min_work_hours = match minimum(dataset, HOURS_PER_WEEK)? {
        AggregateResult::Int(v) => v,
        AggregateResult::Float(_) => {
            return Err(ComputationError::TypeMismatch {
                column: HOURS_PER_WEEK.to_string(),
                expected: "an integer column",
            });
        }
    };
    let rich_percentage = conditional_percentage(
        dataset,
        &rich,
        &Condition::new(
            HOURS_PER_WEEK,
            FilterPredicate::Equals(Value::Int(min_work_hours)),
        ),
    )?;

    let top_country = grouped_ratio_argmax(dataset, NATIVE_COUNTRY, &rich)?;

    let top_occupation = most_frequent(
        dataset,
        &Condition::equals(NATIVE_COUNTRY, &options.country_of_interest)
            .and(SALARY, FilterPredicate::Equals(Value::from(HIGH_INCOME))),
        OCCUPATION,
    )?;

    Ok(StatisticsResult {
        total_records: dataset.len(),
        race_count,
        average_age_men,
        percentage_bachelors,
        higher_education_rich,
        lower_education_rich,
        min_work_hours,
        rich_percentage,
        highest_earning_country: top_country.group,
        highest_earning_country_percentage: top_country.percentage,
        country_of_interest: options.country_of_interest.clone(),
        top_occupation,
    })
}

impl fmt::Display for StatisticsResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.race_count.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
        writeln!(f, "Number of each race:")?;
        for (race, count) in self.race_count.iter() {
            writeln!(f, "  {race:<width$}  {count}")?;
        }
        writeln!(f, "Average age of men: {:.1}", self.average_age_men)?;
        writeln!(f, "Percentage with Bachelors degrees: {:.1}%", self.percentage_bachelors)?;
        writeln!(
            f,
            "Percentage with higher education that earn >50K: {:.1}%",
            self.higher_education_rich
        )?;
        writeln!(
            f,
            "Percentage without higher education that earn >50K: {:.1}%",
            self.lower_education_rich
        )?;
        writeln!(f, "Min work time: {} hours/week", self.min_work_hours)?;
        writeln!(
            f,
            "Percentage of rich among those who work fewest hours: {:.1}%",
            self.rich_percentage
        )?;
        writeln!(
            f,
            "Country with highest percentage of rich: {}",
            self.highest_earning_country
        )?;
        writeln!(
            f,
            "Highest percentage of rich people in country: {:.1}%",
            self.highest_earning_country_percentage
        )?;
        write!(
            f,
            "Top occupations in {}: {}",
            self.country_of_interest, self.top_occupation
        )
    }
}
