use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Float64,
    Str,
}

impl ColumnType {
    /// Narrowest type holding `field`. An empty cell is a missing float.
    pub fn infer(field: &[u8]) -> ColumnType {
        if atoi_simd::parse::<i64>(field).is_ok() {
            ColumnType::Int64
        } else if field.is_empty() || fast_float::parse::<f64, _>(field).is_ok() {
            ColumnType::Float64
        } else {
            ColumnType::Str
        }
    }

    /// Narrowest type holding values of both `self` and `other`
    pub fn widen(self, other: ColumnType) -> ColumnType {
        match (self, other) {
            (ColumnType::Str, _) | (_, ColumnType::Str) => ColumnType::Str,
            (ColumnType::Float64, _) | (_, ColumnType::Float64) => ColumnType::Float64,
            _ => ColumnType::Int64,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Int64 => "integer",
            ColumnType::Float64 => "float",
            ColumnType::Str => "string",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub enum Column {
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Str(Vec<(usize, usize)>), // Absolute offsets into the table buffer
}

impl Column {
    pub fn new(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Int64 => Column::Int64(Vec::new()),
            ColumnType::Float64 => Column::Float64(Vec::new()),
            ColumnType::Str => Column::Str(Vec::new()),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Int64(_) => ColumnType::Int64,
            Column::Float64(_) => ColumnType::Float64,
            Column::Str(_) => ColumnType::Str,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Int64(v) => v.len(),
            Column::Float64(v) => v.len(),
            Column::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Column::Str(_))
    }

    /// Numeric value at `idx`, widened to `f64`. `None` for string columns.
    pub fn get_f64(&self, idx: usize) -> Option<f64> {
        match self {
            Column::Int64(v) => v.get(idx).map(|&x| x as f64),
            Column::Float64(v) => v.get(idx).copied(),
            Column::Str(_) => None,
        }
    }

    pub fn get_i64(&self, idx: usize) -> Option<i64> {
        match self {
            Column::Int64(v) => v.get(idx).copied(),
            _ => None,
        }
    }

    pub fn span(&self, idx: usize) -> Option<(usize, usize)> {
        match self {
            Column::Str(v) => v.get(idx).copied(),
            _ => None,
        }
    }

    /// Moves the per-chunk vectors produced by parallel parsing into one column.
    pub fn from_chunks(column_type: ColumnType, chunks: Vec<Column>) -> Self {
        let total: usize = chunks.iter().map(Column::len).sum();
        let mut merged = match column_type {
            ColumnType::Int64 => Column::Int64(Vec::with_capacity(total)),
            ColumnType::Float64 => Column::Float64(Vec::with_capacity(total)),
            ColumnType::Str => Column::Str(Vec::with_capacity(total)),
        };

        for chunk in chunks {
            match (&mut merged, chunk) {
                (Column::Int64(out), Column::Int64(part)) => out.extend(part),
                (Column::Float64(out), Column::Float64(part)) => out.extend(part),
                (Column::Str(out), Column::Str(part)) => out.extend(part),
                // Every chunk is built from the same schema
                _ => unreachable!("chunk column type differs from schema"),
            }
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_chunks_in_order() {
        let merged = Column::from_chunks(
            ColumnType::Int64,
            vec![Column::Int64(vec![1, 2]), Column::Int64(vec![]), Column::Int64(vec![3])],
        );
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get_i64(2), Some(3));
        assert_eq!(merged.get_f64(0), Some(1.0));
    }

    #[test]
    fn infers_narrowest_type() {
        assert_eq!(ColumnType::infer(b"-42"), ColumnType::Int64);
        assert_eq!(ColumnType::infer(b"12.5"), ColumnType::Float64);
        assert_eq!(ColumnType::infer(b""), ColumnType::Float64);
        assert_eq!(ColumnType::infer(b"n/a"), ColumnType::Str);
    }

    #[test]
    fn widening_only_moves_towards_string() {
        use ColumnType::*;
        assert_eq!(Int64.widen(Int64), Int64);
        assert_eq!(Int64.widen(Float64), Float64);
        assert_eq!(Float64.widen(Int64), Float64);
        assert_eq!(Float64.widen(Str), Str);
        assert_eq!(Str.widen(Int64), Str);
    }

    #[test]
    fn string_columns_are_not_numeric() {
        let col = Column::Str(vec![(0, 3)]);
        assert!(!col.is_numeric());
        assert_eq!(col.get_f64(0), None);
        assert_eq!(col.span(0), Some((0, 3)));
    }
}
