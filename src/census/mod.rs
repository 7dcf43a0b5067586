//! Census schema: column names, required-column validation and loading.

use std::path::PathBuf;

use crate::processor::{LoadError, column::ColumnType, dataset::Dataset, table::Table};

pub mod filters;

pub use filters::{DatasetFilters, apply_filters};

pub const AGE: &str = "age";
pub const EDUCATION: &str = "education";
pub const SALARY: &str = "salary";
pub const SEX: &str = "sex";
pub const RACE: &str = "race";
pub const NATIVE_COUNTRY: &str = "native-country";
pub const OCCUPATION: &str = "occupation";
pub const HOURS_PER_WEEK: &str = "hours-per-week";

/// Columns every census dataset must carry, in the order they are reported when missing
pub const REQUIRED_COLUMNS: [&str; 8] = [
    AGE,
    EDUCATION,
    SALARY,
    SEX,
    RACE,
    NATIVE_COUNTRY,
    OCCUPATION,
    HOURS_PER_WEEK,
];

/// Columns that must be integers whenever the dataset has rows
pub const INTEGER_COLUMNS: [&str; 2] = [AGE, HOURS_PER_WEEK];

/// Salary label for the "above 50K" bracket
pub const HIGH_INCOME: &str = ">50K";

pub const MALE: &str = "Male";
pub const BACHELORS: &str = "Bachelors";

/// Education labels counted as advanced education
pub const ADVANCED_EDUCATION: [&str; 3] = ["Bachelors", "Masters", "Doctorate"];

/// Where a dataset comes from
#[derive(Debug, Clone)]
pub enum TabularSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// Parses `source` and checks it against the census schema
pub fn load(source: TabularSource) -> Result<Dataset, LoadError> {
    let dataset = match source {
        TabularSource::Path(path) => Dataset::load_csv(&path)?,
        TabularSource::Bytes(bytes) => Dataset::from_bytes(bytes)?,
    };
    validate(dataset.table())?;
    Ok(dataset)
}

/// Rejects tables missing a required column or carrying non-integer ages or hours
pub fn validate(table: &Table) -> Result<(), LoadError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| !table.has_column(name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    if table.row_count() > 0 {
        for name in INTEGER_COLUMNS {
            let is_int = table
                .get_col(name)
                .is_ok_and(|c| c.column_type() == ColumnType::Int64);
            if !is_int {
                return Err(LoadError::ColumnType {
                    column: name.to_string(),
                    expected: ColumnType::Int64,
                });
            }
        }
    }

    Ok(())
}
