use serde::{Deserialize, Serialize};

use crate::census::{AGE, EDUCATION, NATIVE_COUNTRY, SEX};
use crate::processor::{ComputationError, Condition, FilterPredicate, Value, dataset::Dataset};

/// Categorical filter value meaning "no filter"
pub const ALL: &str = "all";

/// Dashboard filters. Absent fields, unknown keys and `"all"` are no-ops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetFilters {
    /// Inclusive lower bound on age
    pub min_age: Option<i64>,
    /// Inclusive upper bound on age
    pub max_age: Option<i64>,
    pub education: Option<String>,
    pub country: Option<String>,
    pub sex: Option<String>,
}

impl DatasetFilters {
    pub fn to_condition(&self) -> Condition {
        let mut condition = Condition::all();

        if let Some(min) = self.min_age {
            condition = condition.and(AGE, FilterPredicate::AtLeast(Value::Int(min)));
        }
        if let Some(max) = self.max_age {
            condition = condition.and(AGE, FilterPredicate::AtMost(Value::Int(max)));
        }

        let categorical = [
            (EDUCATION, &self.education),
            (NATIVE_COUNTRY, &self.country),
            (SEX, &self.sex),
        ];
        for (column, value) in categorical {
            if let Some(v) = value.as_deref().filter(|v| *v != ALL) {
                condition = condition.and(column, FilterPredicate::Equals(Value::from(v)));
            }
        }

        condition
    }
}

/// Applies `filters` to `dataset`, returning a new view
pub fn apply_filters(
    dataset: &Dataset,
    filters: &DatasetFilters,
) -> Result<Dataset, ComputationError> {
    dataset.select(&filters.to_condition())
}
