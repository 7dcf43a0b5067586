use memchr::{memchr, memchr_iter};
use memmap2::Mmap;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::{fs::File, ops::Deref, path::Path, str};
use tracing::debug;

use crate::processor::{
    ComputationError, LoadError, ParseError,
    column::{Column, ColumnType},
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Bytes backing a table: a file mapping or an in-memory upload
#[derive(Debug)]
enum Buffer {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Buffer::Mapped(mmap) => &mmap[..],
            Buffer::Owned(bytes) => bytes,
        }
    }
}

/// Column types and malformed rows found in one newline-aligned chunk
struct SchemaScan {
    types: Vec<Option<ColumnType>>,
    line_count: usize,
    errors: Vec<ParseError>, // `row` is the 0-based line index within the chunk
}

/// Immutable columnar table parsed from comma-delimited text
///
/// String cells are stored as byte offsets into the owned buffer, numeric
/// cells are parsed eagerly. Each column gets the narrowest type holding every
/// one of its cells: integer, then float (empty cells are missing floats), then string.
///
/// # Examples
///
/// ```rust
/// # use census_stats::processor::table::Table;
/// let table = Table::from_bytes(b"name,age\nalice,30\nbob,41\n".to_vec()).unwrap();
/// assert_eq!(table.row_count(), 2);
/// assert_eq!(table.headers(), ["name", "age"]);
/// ```
#[derive(Debug)]
pub struct Table {
    buffer: Buffer,
    columns: Vec<Column>,
    headers: Vec<String>,
    row_count: usize,
}

impl Table {
    /// Loads a CSV file through a read-only memory mapping
    ///
    /// # Errors
    /// Returns a [`LoadError`] if:
    /// - File cannot be opened or mapped
    /// - The file is empty or not UTF-8
    /// - A row has the wrong number of fields
    pub fn load_csv(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(LoadError::MissingHeader);
        }
        let mmap = unsafe { Mmap::map(&file)? };
        debug!(path = %path.display(), bytes = mmap.len(), "mapped dataset");
        Self::parse(Buffer::Mapped(mmap))
    }

    /// Parses an in-memory CSV buffer, e.g. an uploaded file
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, LoadError> {
        Self::parse(Buffer::Owned(bytes))
    }

    fn parse(buffer: Buffer) -> Result<Self, LoadError> {
        let buf: &[u8] = &buffer;
        str::from_utf8(buf)?;

        let header_start = if buf.starts_with(UTF8_BOM) {
            UTF8_BOM.len()
        } else {
            0
        };
        let header_end = memchr(b'\n', &buf[header_start..])
            .map_or(buf.len(), |pos| header_start + pos);

        let headers: Vec<String> = split_fields(buf, header_start, header_end)
            .into_iter()
            .map(|(s, e)| String::from_utf8_lossy(&buf[s..e]).into_owned())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(LoadError::MissingHeader);
        }

        let data_start = (header_end + 1).min(buf.len());
        let chunks: Vec<(usize, usize)> =
            Self::find_chunk_boundaries(&buf[data_start..], rayon::current_num_threads())
                .into_iter()
                .map(|(start, end)| (data_start + start, data_start + end))
                .collect();

        let scans: Vec<SchemaScan> = chunks
            .par_iter()
            .map(|&(start, end)| Self::scan_chunk(buf, start, end, headers.len()))
            .collect();
        let schema = Self::merge_scans(scans, headers.len())?;

        let batches: Vec<Vec<Column>> = chunks
            .par_iter()
            .map(|&(start, end)| Self::parse_chunk(buf, start, end, &schema))
            .collect();

        let mut per_column: Vec<Vec<Column>> = (0..schema.len()).map(|_| Vec::new()).collect();
        for batch in batches {
            for (col_idx, col) in batch.into_iter().enumerate() {
                per_column[col_idx].push(col);
            }
        }

        let columns: Vec<Column> = schema
            .iter()
            .zip(per_column)
            .map(|(col_type, chunks)| Column::from_chunks(*col_type, chunks))
            .collect();
        let row_count = columns.first().map_or(0, Column::len);
        debug!(rows = row_count, columns = headers.len(), "parsed dataset");

        Ok(Table {
            buffer,
            columns,
            headers,
            row_count,
        })
    }

    /// Checks field counts and finds the narrowest type of every column in one chunk
    fn scan_chunk(buf: &[u8], chunk_start: usize, chunk_end: usize, width: usize) -> SchemaScan {
        let mut types: Vec<Option<ColumnType>> = vec![None; width];
        let mut errors = Vec::new();
        let mut line_count = 0;

        for (line_idx, (start, end)) in line_spans(buf, chunk_start, chunk_end).enumerate() {
            line_count += 1;
            if is_blank(&buf[start..end]) {
                continue;
            }

            let fields = split_fields(buf, start, end);
            if fields.len() != width {
                errors.push(field_count_error(line_idx, width, fields.len()));
                continue;
            }

            for (slot, &(s, e)) in types.iter_mut().zip(&fields) {
                if *slot == Some(ColumnType::Str) {
                    continue;
                }
                let found = ColumnType::infer(&buf[s..e]);
                *slot = Some(slot.map_or(found, |t| t.widen(found)));
            }
        }

        SchemaScan {
            types,
            line_count,
            errors,
        }
    }

    /// Widens the per-chunk types into the table schema. Columns without a
    /// single data row are strings.
    fn merge_scans(scans: Vec<SchemaScan>, width: usize) -> Result<Vec<ColumnType>, LoadError> {
        let mut types: Vec<Option<ColumnType>> = vec![None; width];
        let mut errors = Vec::new();
        let mut lines_before = 1; // header

        for scan in scans {
            for mut err in scan.errors {
                err.row += lines_before + 1;
                errors.push(err);
            }
            lines_before += scan.line_count;
            for (merged, found) in types.iter_mut().zip(scan.types) {
                *merged = match (*merged, found) {
                    (Some(a), Some(b)) => Some(a.widen(b)),
                    (a, b) => a.or(b),
                };
            }
        }

        if let Some(first) = errors.first() {
            debug!(bad_rows = errors.len(), "rejecting malformed dataset");
            return Err(LoadError::Malformed(first.clone()));
        }
        Ok(types
            .into_iter()
            .map(|t| t.unwrap_or(ColumnType::Str))
            .collect())
    }

    fn find_chunk_boundaries(data: &[u8], num_chunks: usize) -> Vec<(usize, usize)> {
        if data.is_empty() {
            return vec![];
        }

        let num_chunks = num_chunks.max(1);
        let chunk_size = data.len() / num_chunks;
        let mut boundaries = Vec::with_capacity(num_chunks);
        let mut start = 0;

        for i in 0..num_chunks - 1 {
            let mut end = ((i + 1) * chunk_size).max(start);

            // Find next newline
            while end < data.len() && data[end] != b'\n' {
                end += 1;
            }

            if end < data.len() {
                end += 1; // Include the newline
            }

            if start < end {
                boundaries.push((start, end));
            }
            start = end;
        }

        // Last chunk gets everything remaining
        if start < data.len() {
            boundaries.push((start, data.len()));
        }

        boundaries
    }

    /// Fills one chunk's columns. Field counts and types were settled by `scan_chunk`.
    fn parse_chunk(
        buf: &[u8],
        chunk_start: usize,
        chunk_end: usize,
        schema: &[ColumnType],
    ) -> Vec<Column> {
        let mut columns: Vec<Column> = schema.iter().map(|t| Column::new(*t)).collect();

        for (start, end) in line_spans(buf, chunk_start, chunk_end) {
            if is_blank(&buf[start..end]) {
                continue;
            }
            for (col, (s, e)) in columns.iter_mut().zip(split_fields(buf, start, end)) {
                let field = &buf[s..e];
                match col {
                    Column::Int64(values) => {
                        values.push(atoi_simd::parse::<i64>(field).unwrap_or_default())
                    }
                    // Empty cells are missing values
                    Column::Float64(values) => {
                        values.push(fast_float::parse::<f64, _>(field).unwrap_or(f64::NAN))
                    }
                    Column::Str(spans) => spans.push((s, e)),
                }
            }
        }

        columns
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn get_col(&self, col_name: &str) -> Result<&Column, ComputationError> {
        self.headers
            .iter()
            .position(|cn| cn == col_name)
            .and_then(|pos| self.columns.get(pos))
            .ok_or_else(|| ComputationError::MissingColumn(col_name.to_string()))
    }

    /// Text of a string cell. The buffer is validated as UTF-8 on load and
    /// spans always fall on ASCII delimiters.
    pub fn text(&self, (start, end): (usize, usize)) -> &str {
        str::from_utf8(&self.buffer[start..end]).unwrap_or("")
    }

    pub fn str_at(&self, column: &Column, row: usize) -> Option<&str> {
        column.span(row).map(|span| self.text(span))
    }
}

/// `(start, end)` of every line in `buf[start..end]`, blank ones included
fn line_spans(buf: &[u8], start: usize, end: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
    let mut pos = start;
    std::iter::from_fn(move || {
        if pos >= end {
            return None;
        }
        let line_end = memchr(b'\n', &buf[pos..end]).map_or(end, |p| pos + p);
        let span = (pos, line_end);
        pos = line_end + 1;
        Some(span)
    })
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Splits `buf[start..end]` on commas and returns trimmed absolute spans.
fn split_fields(buf: &[u8], start: usize, end: usize) -> Vec<(usize, usize)> {
    let line = &buf[start..end];
    let mut fields = Vec::new();
    let mut field_start = 0;
    for comma_pos in memchr_iter(b',', line) {
        fields.push(trim_field(buf, start + field_start, start + comma_pos));
        field_start = comma_pos + 1;
    }
    fields.push(trim_field(buf, start + field_start, end));
    fields
}

/// Strips surrounding ASCII whitespace (including `\r`) and one pair of double quotes.
fn trim_field(buf: &[u8], mut start: usize, mut end: usize) -> (usize, usize) {
    while start < end && buf[start].is_ascii_whitespace() {
        start += 1;
    }
    while end > start && buf[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    if end - start >= 2 && buf[start] == b'"' && buf[end - 1] == b'"' {
        start += 1;
        end -= 1;
    }
    (start, end)
}

fn field_count_error(row: usize, expected: usize, got: usize) -> ParseError {
    ParseError {
        row,
        reason: format!("expected {} fields, got {}", expected, got),
    }
}
