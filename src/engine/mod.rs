//! Aggregation engine
//!
//! Every statistic is a pure function of a [`Dataset`] view. Rates and means
//! over an empty subgroup fail with [`ComputationError::EmptySubgroup`]; the
//! categorical mode ([`most_frequent`]) degrades to [`NOT_APPLICABLE`] instead.
//!
//! Rounding: one decimal place, half away from zero (see [`round1`]).

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

use crate::processor::{
    AggregateResult, ComputationError, Condition, column::Column, dataset::Dataset,
};

pub mod breakdown;
pub mod histogram;
pub mod report;

pub use breakdown::{
    CountrySummary, EducationSummary, age_distribution, country_analysis, education_breakdown,
};
pub use histogram::{Bins, binned_histogram};
pub use report::{ReportOptions, StatisticsResult, full_report};

/// Returned by [`most_frequent`] when no record matches the filter
pub const NOT_APPLICABLE: &str = "N/A";

/// Rounds to one decimal place, ties away from zero
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Ordered `(label, count)` pairs, serialized as a JSON object in the same order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counts(Vec<(String, u64)>);

impl Counts {
    pub fn new(entries: Vec<(String, u64)>) -> Self {
        Counts(entries)
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, c)| *c)
    }

    pub fn first(&self) -> Option<(&str, u64)> {
        self.0.first().map(|(l, c)| (l.as_str(), *c))
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|(_, c)| c).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(l, c)| (l.as_str(), *c))
    }

    pub fn labels(&self) -> Vec<&str> {
        self.0.iter().map(|(l, _)| l.as_str()).collect()
    }
}

impl Serialize for Counts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, count) in &self.0 {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

/// Members of one group and how many of them satisfy a condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRatio {
    pub group: String,
    pub total: usize,
    pub matching: usize,
}

impl GroupRatio {
    /// Unrounded share of matching members, in percent
    pub fn percentage(&self) -> f64 {
        100.0 * self.matching as f64 / self.total as f64
    }

    /// `true` if this group's ratio is strictly greater than `other`'s.
    /// Compared on exact counts so float noise cannot break ties.
    fn beats(&self, other: &GroupRatio) -> bool {
        (self.matching as u128) * (other.total as u128)
            > (other.matching as u128) * (self.total as u128)
    }
}

/// Group with the highest matching ratio
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMax {
    pub group: String,
    pub percentage: f64,
}

/// Distinct values of `column` in first-seen order, each with the rows holding it
fn group_rows<'a>(
    dataset: &'a Dataset,
    column: &str,
) -> Result<Vec<(&'a str, Vec<usize>)>, ComputationError> {
    let values = dataset.categorical(column)?;
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();

    for &row in dataset.rows() {
        let key = values.get(row);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row);
    }

    Ok(groups)
}

/// Occurrences of each distinct value of a string column
///
/// Ordered by descending count; ties keep first-seen order. Only values present
/// in the data appear.
pub fn distribution_count(dataset: &Dataset, column: &str) -> Result<Counts, ComputationError> {
    let mut counts: Vec<(String, u64)> = group_rows(dataset, column)?
        .into_iter()
        .map(|(label, rows)| (label.to_string(), rows.len() as u64))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(Counts(counts))
}

/// Mean of a numeric column over the records satisfying `condition`, rounded
///
/// Missing (NaN) cells are left out of both the sum and the count.
///
/// # Errors
/// [`ComputationError::EmptySubgroup`] when no record matches, or every match is missing.
pub fn conditional_mean(
    dataset: &Dataset,
    condition: &Condition,
    column: &str,
) -> Result<f64, ComputationError> {
    dataset.table().get_col(column)?;
    let subset = dataset.select(condition)?;
    if subset.is_empty() {
        return Err(ComputationError::empty(format!("mean of '{column}'")));
    }

    let values = subset.numeric(column)?;
    let (sum, n) = subset
        .rows()
        .iter()
        .filter_map(|&row| values.get_f64(row))
        .filter(|x| !x.is_nan())
        .fold((0.0, 0usize), |(sum, n), x| (sum + x, n + 1));
    if n == 0 {
        return Err(ComputationError::empty(format!("mean of '{column}'")));
    }
    Ok(round1(sum / n as f64))
}

/// `100 * |numerator ∧ denominator| / |denominator|`, rounded
///
/// # Errors
/// [`ComputationError::EmptySubgroup`] when nothing satisfies `denominator`.
pub fn conditional_percentage(
    dataset: &Dataset,
    numerator: &Condition,
    denominator: &Condition,
) -> Result<f64, ComputationError> {
    let base = dataset.select(denominator)?;
    let hits = base.count(numerator)?;
    if base.is_empty() {
        return Err(ComputationError::empty("percentage base"));
    }
    Ok(round1(100.0 * hits as f64 / base.len() as f64))
}

/// Per-group totals and matches of `condition`, groups in first-seen order
pub fn group_ratios(
    dataset: &Dataset,
    group_column: &str,
    condition: &Condition,
) -> Result<Vec<GroupRatio>, ComputationError> {
    let bound = dataset.bind(condition)?;
    Ok(group_rows(dataset, group_column)?
        .into_iter()
        .map(|(group, rows)| GroupRatio {
            group: group.to_string(),
            total: rows.len(),
            matching: rows.iter().filter(|&&row| bound.matches(row)).count(),
        })
        .collect())
}

/// Group of `group_column` with the largest share of records satisfying `condition`
///
/// Ties go to the group seen first.
///
/// # Errors
/// [`ComputationError::EmptySubgroup`] on an empty dataset.
pub fn grouped_ratio_argmax(
    dataset: &Dataset,
    group_column: &str,
    condition: &Condition,
) -> Result<GroupMax, ComputationError> {
    let ratios = group_ratios(dataset, group_column, condition)?;

    let mut best: Option<&GroupRatio> = None;
    for ratio in &ratios {
        if best.is_none_or(|b| ratio.beats(b)) {
            best = Some(ratio);
        }
    }

    best.map(|b| GroupMax {
        group: b.group.clone(),
        percentage: round1(b.percentage()),
    })
    .ok_or_else(|| ComputationError::empty(format!("no groups in '{group_column}'")))
}

/// Most frequent value of `column` among records matching `filter`
///
/// Ties go to the value seen first. Returns [`NOT_APPLICABLE`] when nothing matches.
pub fn most_frequent(
    dataset: &Dataset,
    filter: &Condition,
    column: &str,
) -> Result<String, ComputationError> {
    let subset = dataset.select(filter)?;
    let counts = distribution_count(&subset, column)?;
    Ok(counts
        .first()
        .map_or_else(|| NOT_APPLICABLE.to_string(), |(label, _)| label.to_string()))
}

/// Smallest value of a numeric column
///
/// # Errors
/// [`ComputationError::EmptySubgroup`] on an empty dataset.
pub fn minimum(dataset: &Dataset, column: &str) -> Result<AggregateResult, ComputationError> {
    dataset.table().get_col(column)?;
    if dataset.is_empty() {
        return Err(ComputationError::empty(format!("minimum of '{column}'")));
    }

    let rows = dataset.rows();
    let min = match dataset.numeric(column)? {
        Column::Int64(values) => rows
            .iter()
            .filter_map(|&r| values.get(r).copied())
            .min()
            .map(AggregateResult::Int),
        Column::Float64(values) => rows
            .iter()
            .filter_map(|&r| values.get(r).copied())
            .filter(|x| !x.is_nan())
            .reduce(f64::min)
            .map(AggregateResult::Float),
        Column::Str(_) => None,
    };
    min.ok_or_else(|| ComputationError::empty(format!("minimum of '{column}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{FilterPredicate, Value};

    fn dataset(csv: &str) -> Dataset {
        Dataset::from_bytes(csv.as_bytes().to_vec()).unwrap()
    }

    fn workers() -> Dataset {
        dataset(
            "country,job,salary,hours,score\n\
             Peru,cook,>50K,40,1.5\n\
             Chad,smith,<=50K,20,2.5\n\
             Peru,cook,<=50K,20,4.0\n\
             Fiji,pilot,>50K,60,0.5\n\
             Chad,cook,>50K,35,3.0\n\
             Fiji,smith,<=50K,40,2.0\n",
        )
    }

    fn empty() -> Dataset {
        workers()
            .select(&Condition::equals("country", "Atlantis"))
            .unwrap()
    }

    fn rich() -> Condition {
        Condition::equals("salary", ">50K")
    }

    #[test]
    fn round1_is_half_away_from_zero() {
        assert_eq!(round1(0.25), 0.3);
        assert_eq!(round1(-0.25), -0.3);
        assert_eq!(round1(66.666_666), 66.7);
        assert_eq!(round1(12.34), 12.3);
        assert_eq!(round1(40.0), 40.0);
    }

    #[test]
    fn distribution_is_ordered_by_count_then_first_seen() {
        let counts = distribution_count(&workers(), "job").unwrap();
        assert_eq!(counts.labels(), ["cook", "smith", "pilot"]);
        assert_eq!(counts.get("cook"), Some(3));

        // Peru, Chad and Fiji all have two rows
        let countries = distribution_count(&workers(), "country").unwrap();
        assert_eq!(countries.labels(), ["Peru", "Chad", "Fiji"]);
    }

    #[test]
    fn distribution_sums_to_dataset_len() {
        let ds = workers();
        for column in ["country", "job", "salary"] {
            assert_eq!(distribution_count(&ds, column).unwrap().total(), ds.len() as u64);
        }
        assert!(distribution_count(&empty(), "job").unwrap().is_empty());
    }

    #[test]
    fn distribution_requires_string_column() {
        assert!(matches!(
            distribution_count(&workers(), "hours"),
            Err(ComputationError::TypeMismatch { .. })
        ));
        assert_eq!(
            distribution_count(&workers(), "nope").unwrap_err(),
            ComputationError::MissingColumn("nope".into())
        );
    }

    #[test]
    fn counts_serialize_in_order() {
        let counts = Counts::new(vec![("b".into(), 2), ("a".into(), 1)]);
        assert_eq!(serde_json::to_string(&counts).unwrap(), r#"{"b":2,"a":1}"#);
    }

    #[test]
    fn conditional_mean_over_subgroup() {
        let ds = workers();
        assert_eq!(conditional_mean(&ds, &rich(), "hours").unwrap(), 45.0);
        assert_eq!(
            conditional_mean(&ds, &Condition::equals("country", "Chad"), "score").unwrap(),
            2.8
        );
    }

    #[test]
    fn conditional_mean_stays_within_range() {
        let ds = workers();
        let mean = conditional_mean(&ds, &Condition::all(), "score").unwrap();
        assert!((0.5..=4.0).contains(&mean));
    }

    #[test]
    fn conditional_mean_of_empty_subgroup_fails() {
        let err = conditional_mean(&workers(), &Condition::equals("job", "astronaut"), "hours")
            .unwrap_err();
        assert!(matches!(err, ComputationError::EmptySubgroup(_)));
        assert!(err.to_string().starts_with("empty subgroup"));
        assert!(conditional_mean(&empty(), &Condition::all(), "hours").is_err());
    }

    #[test]
    fn conditional_percentage_bounds() {
        let ds = workers();
        let peru = Condition::equals("country", "Peru");
        assert_eq!(conditional_percentage(&ds, &rich(), &peru).unwrap(), 50.0);
        assert_eq!(conditional_percentage(&ds, &rich(), &Condition::all()).unwrap(), 50.0);

        let long_hours = Condition::new("hours", FilterPredicate::AtLeast(Value::Int(60)));
        assert_eq!(conditional_percentage(&ds, &rich(), &long_hours).unwrap(), 100.0);
        let pilots_among_smiths = Condition::equals("job", "pilot");
        assert_eq!(
            conditional_percentage(&ds, &pilots_among_smiths, &Condition::equals("job", "smith"))
                .unwrap(),
            0.0
        );
    }

    #[test]
    fn conditional_percentage_rounds_one_decimal() {
        let ds = workers();
        let cooks = Condition::equals("job", "cook");
        // 2 of 3 cooks earn >50K
        assert_eq!(conditional_percentage(&ds, &rich(), &cooks).unwrap(), 66.7);
    }

    #[test]
    fn conditional_percentage_with_empty_base_fails() {
        let astronauts = Condition::equals("job", "astronaut");
        let err = conditional_percentage(&workers(), &rich(), &astronauts).unwrap_err();
        assert!(matches!(err, ComputationError::EmptySubgroup(_)));
        assert!(conditional_percentage(&empty(), &rich(), &Condition::all()).is_err());
    }

    #[test]
    fn argmax_picks_highest_ratio() {
        let ds = workers();
        let best = grouped_ratio_argmax(&ds, "job", &rich()).unwrap();
        assert_eq!(best.group, "pilot");
        assert_eq!(best.percentage, 100.0);
    }

    #[test]
    fn argmax_ties_go_to_first_seen_group() {
        // Peru, Chad and Fiji are all at 50%
        let best = grouped_ratio_argmax(&workers(), "country", &rich()).unwrap();
        assert_eq!(best, GroupMax { group: "Peru".into(), percentage: 50.0 });
    }

    #[test]
    fn argmax_matches_best_per_group_percentage() {
        let ds = workers();
        let best = grouped_ratio_argmax(&ds, "job", &rich()).unwrap();
        let per_group_max = distribution_count(&ds, "job")
            .unwrap()
            .labels()
            .into_iter()
            .map(|job| {
                conditional_percentage(&ds, &rich(), &Condition::equals("job", job)).unwrap()
            })
            .fold(f64::MIN, f64::max);
        assert_eq!(best.percentage, per_group_max);
    }

    #[test]
    fn argmax_on_empty_dataset_fails() {
        assert!(matches!(
            grouped_ratio_argmax(&empty(), "country", &rich()),
            Err(ComputationError::EmptySubgroup(_))
        ));
    }

    #[test]
    fn group_ratios_keep_first_seen_order() {
        let ratios = group_ratios(&workers(), "job", &rich()).unwrap();
        let summary: Vec<(&str, usize, usize)> = ratios
            .iter()
            .map(|r| (r.group.as_str(), r.total, r.matching))
            .collect();
        assert_eq!(summary, [("cook", 3, 2), ("smith", 2, 0), ("pilot", 1, 1)]);
    }

    #[test]
    fn most_frequent_under_compound_filter() {
        let ds = workers();
        let filter = Condition::equals("country", "Peru")
            .and("salary", FilterPredicate::Equals(">50K".into()));
        assert_eq!(most_frequent(&ds, &filter, "job").unwrap(), "cook");
    }

    #[test]
    fn most_frequent_ties_go_to_first_seen() {
        let fiji = Condition::equals("country", "Fiji");
        assert_eq!(most_frequent(&workers(), &fiji, "job").unwrap(), "pilot");
    }

    #[test]
    fn most_frequent_without_matches_is_not_applicable() {
        let filter = Condition::equals("country", "Atlantis");
        assert_eq!(most_frequent(&workers(), &filter, "job").unwrap(), NOT_APPLICABLE);
        assert_eq!(most_frequent(&empty(), &Condition::all(), "job").unwrap(), NOT_APPLICABLE);
    }

    #[test]
    fn minimum_of_int_and_float_columns() {
        let ds = workers();
        assert_eq!(minimum(&ds, "hours").unwrap(), AggregateResult::Int(20));
        assert_eq!(minimum(&ds, "score").unwrap(), AggregateResult::Float(0.5));
    }

    #[test]
    fn missing_cells_are_skipped() {
        let ds = dataset("job,gain\nclerk,4\nclerk,\nchef,2\nchef,\n");
        assert_eq!(conditional_mean(&ds, &Condition::all(), "gain").unwrap(), 3.0);
        assert_eq!(minimum(&ds, "gain").unwrap(), AggregateResult::Float(2.0));

        let unknown = dataset("job,gain\nclerk,\n");
        assert!(matches!(
            conditional_mean(&unknown, &Condition::all(), "gain"),
            Err(ComputationError::EmptySubgroup(_))
        ));
        assert!(minimum(&unknown, "gain").is_err());
    }

    #[test]
    fn minimum_of_empty_dataset_fails() {
        assert!(matches!(
            minimum(&empty(), "hours"),
            Err(ComputationError::EmptySubgroup(_))
        ));
        assert!(matches!(
            minimum(&empty(), "nope"),
            Err(ComputationError::MissingColumn(_))
        ));
    }
}
