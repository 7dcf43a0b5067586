use std::path::Path;
use std::sync::Arc;

use crate::processor::{
    ComputationError, Condition, FilterPredicate, LoadError, Value, column::Column, table::Table,
};

/// Ordered selection of rows over a shared, immutable [`Table`]
///
/// Cloning is cheap. Filtering always yields a new `Dataset` and never touches
/// the underlying table.
#[derive(Debug, Clone)]
pub struct Dataset {
    table: Arc<Table>,
    rows: Arc<[usize]>,
}

impl Dataset {
    /// View over every row of `table`
    pub fn new(table: Table) -> Self {
        let rows: Arc<[usize]> = (0..table.row_count()).collect();
        Dataset {
            table: Arc::new(table),
            rows,
        }
    }

    pub fn load_csv(path: &Path) -> Result<Self, LoadError> {
        Ok(Self::new(Table::load_csv(path)?))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, LoadError> {
        Ok(Self::new(Table::from_bytes(bytes)?))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Indices into the table of the selected rows, in order
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    fn with_rows(&self, rows: Vec<usize>) -> Dataset {
        Dataset {
            table: Arc::clone(&self.table),
            rows: rows.into(),
        }
    }

    /// Rows satisfying `predicate` on `column`
    pub fn filter(
        &self,
        column: &str,
        predicate: &FilterPredicate,
    ) -> Result<Dataset, ComputationError> {
        self.select(&Condition::new(column, predicate.clone()))
    }

    /// Rows satisfying every clause of `condition`
    pub fn select(&self, condition: &Condition) -> Result<Dataset, ComputationError> {
        if condition.is_empty() {
            return Ok(self.clone());
        }
        let bound = self.bind(condition)?;
        Ok(self.with_rows(
            self.rows
                .iter()
                .copied()
                .filter(|&row| bound.matches(row))
                .collect(),
        ))
    }

    /// Number of rows satisfying `condition`
    pub fn count(&self, condition: &Condition) -> Result<usize, ComputationError> {
        let bound = self.bind(condition)?;
        Ok(self.rows.iter().filter(|&&row| bound.matches(row)).count())
    }

    /// Resolves the condition's columns once so it can be tested row by row
    pub fn bind<'a>(
        &'a self,
        condition: &'a Condition,
    ) -> Result<BoundCondition<'a>, ComputationError> {
        let clauses = condition
            .clauses()
            .iter()
            .map(|(name, predicate)| {
                let column = self.table.get_col(name)?;
                check_predicate(name, column, predicate)?;
                Ok((column, predicate))
            })
            .collect::<Result<Vec<_>, ComputationError>>()?;

        Ok(BoundCondition {
            table: &self.table,
            clauses,
        })
    }

    /// String column accessor
    pub fn categorical(&self, name: &str) -> Result<Categorical<'_>, ComputationError> {
        let column = self.table.get_col(name)?;
        match column {
            Column::Str(_) => Ok(Categorical {
                table: &self.table,
                column,
            }),
            _ => Err(ComputationError::TypeMismatch {
                column: name.to_string(),
                expected: "a string column",
            }),
        }
    }

    /// Numeric column accessor
    pub fn numeric(&self, name: &str) -> Result<&Column, ComputationError> {
        let column = self.table.get_col(name)?;
        if column.is_numeric() {
            Ok(column)
        } else {
            Err(ComputationError::TypeMismatch {
                column: name.to_string(),
                expected: "a numeric column",
            })
        }
    }
}

/// A string column bound to its table
#[derive(Debug, Clone, Copy)]
pub struct Categorical<'a> {
    table: &'a Table,
    column: &'a Column,
}

impl<'a> Categorical<'a> {
    pub fn get(&self, row: usize) -> &'a str {
        self.table.str_at(self.column, row).unwrap_or("")
    }
}

/// A [`Condition`] with its columns resolved against a table
#[derive(Debug)]
pub struct BoundCondition<'a> {
    table: &'a Table,
    clauses: Vec<(&'a Column, &'a FilterPredicate)>,
}

impl BoundCondition<'_> {
    pub fn matches(&self, row: usize) -> bool {
        self.clauses
            .iter()
            .all(|(column, predicate)| match column {
                Column::Str(_) => self
                    .table
                    .str_at(column, row)
                    .is_some_and(|s| matches_str(s, predicate)),
                _ => column
                    .get_f64(row)
                    .is_some_and(|v| matches_number(v, predicate)),
            })
    }
}

fn check_predicate(
    name: &str,
    column: &Column,
    predicate: &FilterPredicate,
) -> Result<(), ComputationError> {
    let values: Vec<&Value> = match predicate {
        FilterPredicate::Equals(v)
        | FilterPredicate::GreaterThan(v)
        | FilterPredicate::LessThan(v)
        | FilterPredicate::AtLeast(v)
        | FilterPredicate::AtMost(v) => vec![v],
        FilterPredicate::Between(lo, hi) => vec![lo, hi],
        FilterPredicate::OneOf(vs) | FilterPredicate::NoneOf(vs) => vs.iter().collect(),
    };

    let supported = match column {
        Column::Str(_) => {
            matches!(
                predicate,
                FilterPredicate::Equals(_) | FilterPredicate::OneOf(_) | FilterPredicate::NoneOf(_)
            ) && values.iter().all(|v| v.as_str().is_some())
        }
        _ => values.iter().all(|v| v.as_f64().is_some()),
    };

    if supported {
        Ok(())
    } else {
        Err(ComputationError::UnsupportedPredicate(name.to_string()))
    }
}

fn matches_str(s: &str, predicate: &FilterPredicate) -> bool {
    let is = |v: &Value| v.as_str() == Some(s);
    match predicate {
        FilterPredicate::Equals(v) => is(v),
        FilterPredicate::OneOf(vs) => vs.iter().any(is),
        FilterPredicate::NoneOf(vs) => !vs.iter().any(is),
        _ => false,
    }
}

fn matches_number(x: f64, predicate: &FilterPredicate) -> bool {
    let num = |v: &Value| v.as_f64().unwrap_or(f64::NAN);
    match predicate {
        FilterPredicate::Equals(v) => x == num(v),
        FilterPredicate::GreaterThan(v) => x > num(v),
        FilterPredicate::LessThan(v) => x < num(v),
        FilterPredicate::AtLeast(v) => x >= num(v),
        FilterPredicate::AtMost(v) => x <= num(v),
        FilterPredicate::Between(lo, hi) => num(lo) <= x && x <= num(hi),
        FilterPredicate::OneOf(vs) => vs.iter().any(|v| x == num(v)),
        FilterPredicate::NoneOf(vs) => !vs.iter().any(|v| x == num(v)),
    }
}
