use std::{fs::File, path::Path, time::Instant};

use memchr::{memchr, memchr_iter};
use memmap2::Mmap;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, warn};

use crate::dataset::{
    Buffer, Dataset, DatasetError, LoadOptions, ParseError, ParseSummary, Record,
    column::{Column, Span},
    schema::{ColumnType, Field, HeaderLayout},
    write_csv,
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Malformed rows reported individually before the rest are only counted.
const MAX_LOGGED_ROW_ERRORS: usize = 10;

/// Per-chunk parse output, merged in chunk order.
struct BatchResult {
    work_years: Vec<i64>,
    salaries: Vec<f64>,
    spans: Vec<Vec<Span>>, // indexed by `Field::index`, empty for numeric fields
    row_count: usize,
    line_count: usize,
    errors: Vec<ParseError>,
}

impl BatchResult {
    fn with_capacity(rows: usize) -> Self {
        BatchResult {
            work_years: Vec::with_capacity(rows),
            salaries: Vec::with_capacity(rows),
            spans: Field::ALL
                .iter()
                .map(|f| match f.column_type() {
                    ColumnType::Str => Vec::with_capacity(rows),
                    _ => Vec::new(),
                })
                .collect(),
            row_count: 0,
            line_count: 0,
            errors: Vec::new(),
        }
    }
}

struct ParsedRow {
    work_year: i64,
    salary_in_usd: f64,
    spans: [Span; 8],
}

impl Dataset {
    /// Loads a CSV file using memory mapping.
    ///
    /// Columns are matched by header name; columns the dataset does not know are ignored.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if:
    /// - the file cannot be opened or mapped
    /// - the header is missing or lacks a required column
    /// - any row is malformed and `options.strict` is set
    ///
    /// # Example
    /// ```no_run
    /// # use salary_dashboard::dataset::{Dataset, LoadOptions};
    /// let dataset = Dataset::open("docs/data_imersao_2026.csv".as_ref(), LoadOptions::default()).unwrap();
    /// println!("{} records", dataset.len());
    /// ```
    pub fn open(path: &Path, options: LoadOptions) -> Result<Self, DatasetError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        info!(path = %path.display(), bytes = len, "loading dataset");

        // Mapping a zero-length file is an error on some platforms
        let buffer = if len == 0 {
            Buffer::Owned(Vec::new())
        } else {
            // The file must not be truncated while the dataset is alive
            Buffer::Mapped(unsafe { Mmap::map(&file)? })
        };
        Self::parse(buffer, options)
    }

    /// Parses CSV bytes held in memory.
    pub fn from_csv_bytes(bytes: Vec<u8>, options: LoadOptions) -> Result<Self, DatasetError> {
        Self::parse(Buffer::Owned(bytes), options)
    }

    /// Builds a dataset from owned records.
    pub fn from_records(records: &[Record]) -> Result<Self, DatasetError> {
        let mut bytes = Vec::with_capacity(records.len() * 64);
        write_csv(&mut bytes, records)?;
        Self::from_csv_bytes(bytes, LoadOptions::default())
    }

    fn parse(buffer: Buffer, options: LoadOptions) -> Result<Self, DatasetError> {
        let started = Instant::now();
        let buf: &[u8] = &buffer;

        let body_start = if buf.starts_with(UTF8_BOM) {
            UTF8_BOM.len()
        } else {
            0
        };
        let body = &buf[body_start..];

        // Parse header
        let header_end = memchr(b'\n', body).unwrap_or(body.len());
        let header_line = trim_cr(&body[..header_end]);
        if header_line.iter().all(u8::is_ascii_whitespace) {
            return Err(DatasetError::MissingHeader);
        }

        let mut header_fields = Vec::new();
        split_fields(header_line, &mut header_fields).map_err(|e| {
            DatasetError::MalformedHeader(e.to_string())
        })?;
        let headers: Vec<String> = header_fields
            .iter()
            .map(|&(s, e)| String::from_utf8_lossy(&header_line[s..e]).trim().to_string())
            .collect();
        let layout = HeaderLayout::resolve(&headers).map_err(DatasetError::MissingColumn)?;

        let data_start = (body_start + header_end + 1).min(buf.len());
        let data = &buf[data_start..];

        // Find chunk boundaries (split by newlines)
        let num_threads = rayon::current_num_threads();
        let chunks = find_chunk_boundaries(data, num_threads);

        let estimated_rows_per_chunk = {
            let avg_line_len = header_line.len().max(16);
            data.len() / num_threads.max(1) / avg_line_len + 16
        };

        // Parse chunks in parallel
        let batch_results: Vec<BatchResult> = chunks
            .par_iter()
            .map(|&(start, end)| {
                parse_chunk(
                    &data[start..end],
                    data_start + start, // Absolute offset in the buffer
                    &layout,
                    &headers,
                    estimated_rows_per_chunk,
                )
            })
            .collect();

        // Merge batch results into chunked columns
        let mut columns: Vec<Column> = Field::ALL
            .iter()
            .map(|f| Column::new(f.column_type()))
            .collect();

        let mut total_rows = 0;
        let mut lines_before = 1; // header
        let mut all_errors = Vec::new();

        for mut batch in batch_results {
            total_rows += batch.row_count;
            all_errors.extend(batch.errors.drain(..).map(|mut e| {
                e.line += lines_before;
                e
            }));
            lines_before += batch.line_count;

            for field in Field::ALL {
                match &mut columns[field.index()] {
                    Column::Int64(chunks) => chunks.push(std::mem::take(&mut batch.work_years)),
                    Column::Float64(chunks) => chunks.push(std::mem::take(&mut batch.salaries)),
                    Column::Str(chunks) => {
                        chunks.push(std::mem::take(&mut batch.spans[field.index()]))
                    }
                }
            }
        }

        if let Some(first) = all_errors.first() {
            if options.strict {
                return Err(DatasetError::MalformedRows {
                    count: all_errors.len(),
                    first: first.clone(),
                });
            }
            for error in all_errors.iter().take(MAX_LOGGED_ROW_ERRORS) {
                warn!(%error, "skipping malformed row");
            }
            if all_errors.len() > MAX_LOGGED_ROW_ERRORS {
                warn!(
                    more = all_errors.len() - MAX_LOGGED_ROW_ERRORS,
                    "further malformed rows skipped"
                );
            }
        }

        for column in &mut columns {
            column.flatten_in_place();
        }

        let dataset = Dataset {
            buffer,
            columns,
            row_count: total_rows,
            headers,
            summary: ParseSummary {
                rows_processed: total_rows,
                errors: all_errors,
            },
        };

        info!(
            rows = dataset.row_count,
            skipped = dataset.summary.rows_skipped(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dataset loaded"
        );
        for record in dataset.records().take(5) {
            debug!(?record, "head");
        }

        Ok(dataset)
    }
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    bytes.trim_ascii()
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
        match memchr(b'\n', &data[end..]) {
            Some(pos) => end += pos + 1, // Include the newline
            None => end = data.len(),
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

/// Splits one CSV line into field spans relative to the line.
///
/// Fields may be wrapped in double quotes; the span then excludes the quotes.
/// Escaped quotes inside a field are not supported.
fn split_fields(line: &[u8], out: &mut Vec<Span>) -> Result<(), &'static str> {
    out.clear();

    if memchr(b'"', line).is_none() {
        let mut field_start = 0;
        for comma_pos in memchr_iter(b',', line) {
            out.push((field_start, comma_pos));
            field_start = comma_pos + 1;
        }
        out.push((field_start, line.len()));
        return Ok(());
    }

    let mut pos = 0;
    loop {
        if line.get(pos) == Some(&b'"') {
            let content_start = pos + 1;
            let close = memchr(b'"', &line[content_start..])
                .map(|p| content_start + p)
                .ok_or("unterminated quoted field")?;
            out.push((content_start, close));

            pos = close + 1;
            match line.get(pos) {
                None => return Ok(()),
                Some(b',') => pos += 1,
                Some(b'"') => return Err("escaped quotes are not supported"),
                Some(_) => return Err("unexpected character after closing quote"),
            }
            if pos == line.len() {
                out.push((pos, pos));
                return Ok(());
            }
        } else {
            let end = memchr(b',', &line[pos..]).map_or(line.len(), |p| pos + p);
            if memchr(b'"', &line[pos..end]).is_some() {
                return Err("quote inside unquoted field");
            }
            out.push((pos, end));
            if end == line.len() {
                return Ok(());
            }
            pos = end + 1;
        }
    }
}

fn parse_chunk(
    chunk: &[u8],
    chunk_offset: usize, // Absolute offset of this chunk in the buffer
    layout: &HeaderLayout,
    headers: &[String],
    estimated_rows: usize,
) -> BatchResult {
    let mut batch = BatchResult::with_capacity(estimated_rows);
    let mut fields = Vec::with_capacity(layout.width());

    let mut start = 0;
    for end in memchr_iter(b'\n', chunk).chain(std::iter::once(chunk.len())) {
        if start >= chunk.len() {
            break; // trailing newline, no further line
        }
        let line = trim_cr(&chunk[start..end]);
        let line_offset = chunk_offset + start;
        start = end + 1;

        batch.line_count += 1;
        let line_no = batch.line_count;

        if trim_ascii(line).is_empty() {
            continue;
        }

        if let Err(reason) = split_fields(line, &mut fields) {
            batch.errors.push(ParseError {
                line: line_no,
                column: String::new(),
                value: String::from_utf8_lossy(line).to_string(),
                error: reason.to_string(),
            });
            continue;
        }

        if fields.len() != layout.width() {
            batch.errors.push(ParseError {
                line: line_no,
                column: String::new(),
                value: String::from_utf8_lossy(line).to_string(),
                error: format!("expected {} fields, got {}", layout.width(), fields.len()),
            });
            continue;
        }

        match parse_row(line, line_offset, &fields, layout) {
            Ok(row) => {
                batch.work_years.push(row.work_year);
                batch.salaries.push(row.salary_in_usd);
                for field in Field::ALL {
                    if field.column_type() == ColumnType::Str {
                        batch.spans[field.index()].push(row.spans[field.index()]);
                    }
                }
                batch.row_count += 1;
            }
            Err((field_pos, value, error)) => batch.errors.push(ParseError {
                line: line_no,
                column: headers.get(field_pos).cloned().unwrap_or_default(),
                value,
                error: error.to_string(),
            }),
        }
    }

    batch
}

/// Parses a split line. On failure returns the header position of the bad field,
/// its raw value and the reason.
fn parse_row(
    line: &[u8],
    line_offset: usize,
    fields: &[Span],
    layout: &HeaderLayout,
) -> Result<ParsedRow, (usize, String, &'static str)> {
    let mut row = ParsedRow {
        work_year: 0,
        salary_in_usd: 0.0,
        spans: [(0, 0); 8],
    };

    for field in Field::ALL {
        let Some(pos) = layout.position(field) else {
            continue; // optional column absent, text stays ""
        };
        let (s, e) = fields[pos];
        let raw = &line[s..e];
        let fail = |reason| (pos, String::from_utf8_lossy(raw).to_string(), reason);

        match field.column_type() {
            ColumnType::Int64 => {
                row.work_year =
                    atoi_simd::parse::<i64>(trim_ascii(raw)).map_err(|_| fail("invalid integer"))?;
            }
            ColumnType::Float64 => {
                let salary = fast_float::parse::<f64, _>(trim_ascii(raw))
                    .map_err(|_| fail("invalid number"))?;
                if !salary.is_finite() || salary < 0.0 {
                    return Err(fail("salary must be a non-negative number"));
                }
                row.salary_in_usd = salary;
            }
            ColumnType::Str => {
                if std::str::from_utf8(raw).is_err() {
                    return Err(fail("invalid UTF-8"));
                }
                row.spans[field.index()] = (line_offset + s, line_offset + e);
            }
        }
    }

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "work_year,experience_level,employment_type,job_title,salary_in_usd,remote_ratio,company_size,employee_country\n";

    fn load(body: &str) -> Result<Dataset, DatasetError> {
        Dataset::from_csv_bytes(format!("{HEADER}{body}").into_bytes(), LoadOptions::default())
    }

    fn split(line: &str) -> Result<Vec<&str>, &'static str> {
        let mut spans = Vec::new();
        split_fields(line.as_bytes(), &mut spans)?;
        Ok(spans.iter().map(|&(s, e)| &line[s..e]).collect())
    }

    #[test]
    fn test_row_count() {
        let ds = load("2024,SE,FT,Data Scientist,150000,100,M,US\n2023,MI,FT,Data Analyst,80000,0,L,BR\n")
            .unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.parse_summary().rows_processed, 2);
    }

    #[test]
    fn test_record_fields() {
        let ds = load("2024,SE,FT,Data Scientist,150000.5,100,M,US\n").unwrap();
        let r = ds.record(0);
        assert_eq!(r.work_year, 2024);
        assert_eq!(r.experience_level, "SE");
        assert_eq!(r.employment_type, "FT");
        assert_eq!(r.job_title, "Data Scientist");
        assert_eq!(r.salary_in_usd, 150000.5);
        assert_eq!(r.remote_ratio, "100");
        assert_eq!(r.company_size, "M");
        assert_eq!(r.employee_country, "US");
    }

    #[test]
    fn test_crlf_bom_and_missing_final_newline() {
        let csv = format!(
            "\u{feff}{}2024,SE,FT,ML Engineer,1,50,S,DE\r\n\r\n2022,EN,PT,BI Analyst,2,0,L,FR",
            HEADER.replace('\n', "\r\n")
        );
        let ds = Dataset::from_csv_bytes(csv.into_bytes(), LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.record(0).employee_country, "DE");
        assert_eq!(ds.record(1).job_title, "BI Analyst");
        assert_eq!(ds.record(1).employee_country, "FR");
    }

    #[test]
    fn test_header_only_is_empty_dataset() {
        let ds = load("").unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.records().count(), 0);
    }

    #[test]
    fn test_empty_input_is_missing_header() {
        let err = Dataset::from_csv_bytes(Vec::new(), LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingHeader));
    }

    #[test]
    fn test_columns_matched_by_name() {
        let csv = "job_title,salary,salary_in_usd,work_year,experience_level,remote_ratio,company_size,employee_country\n\
                   Data Engineer,999,120000,2024,SE,100,M,PT\n";
        let ds = Dataset::from_csv_bytes(csv.as_bytes().to_vec(), LoadOptions::default()).unwrap();
        let r = ds.record(0);
        assert_eq!(r.job_title, "Data Engineer");
        assert_eq!(r.salary_in_usd, 120000.0);
        assert_eq!(r.work_year, 2024);
        assert_eq!(r.employment_type, "");
        assert_eq!(ds.headers().len(), 8);
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "work_year,experience_level,job_title\n2024,SE,X\n";
        let err = Dataset::from_csv_bytes(csv.as_bytes().to_vec(), LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn(Field::SalaryInUsd)));
    }

    #[test]
    fn test_strict_rejects_malformed_row() {
        let err = load("2024,SE,FT,Data Scientist,150000,100,M,US\n2024,SE,FT,Broken,-5,100,M,US\n")
            .unwrap_err();
        match err {
            DatasetError::MalformedRows { count, first } => {
                assert_eq!(count, 1);
                assert_eq!(first.line, 3);
                assert_eq!(first.column, "salary_in_usd");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_lenient_skips_malformed_rows() {
        let csv = format!(
            "{HEADER}2024,SE,FT,A,100,0,M,US\nnot,a,row\n20x4,SE,FT,B,100,0,M,US\n2023,MI,FT,C,200,50,S,BR\n"
        );
        let ds = Dataset::from_csv_bytes(csv.into_bytes(), LoadOptions::lenient()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.record(1).job_title, "C");

        let errors = &ds.parse_summary().errors;
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 3);
        assert_eq!(errors[0].column, "");
        assert_eq!(errors[1].line, 4);
        assert_eq!(errors[1].column, "work_year");
    }

    #[test]
    fn test_quoted_field_with_comma() {
        let ds = load("2024,SE,FT,\"Head of Data, EMEA\",250000,100,L,GB\n").unwrap();
        assert_eq!(ds.record(0).job_title, "Head of Data, EMEA");
        assert_eq!(ds.record(0).company_size, "L");
    }

    #[test]
    fn test_split_fields() {
        assert_eq!(split("a,b,,c").unwrap(), vec!["a", "b", "", "c"]);
        assert_eq!(split("a,").unwrap(), vec!["a", ""]);
        assert_eq!(split("\"x,y\",z").unwrap(), vec!["x,y", "z"]);
        assert_eq!(split("z,\"x,y\"").unwrap(), vec!["z", "x,y"]);
        assert_eq!(split("\"x\",").unwrap(), vec!["x", ""]);
        assert!(split("\"open,b").is_err());
        assert!(split("\"a\"\"b\"").is_err());
        assert!(split("a\"b,c").is_err());
    }

    #[test]
    fn test_chunk_boundaries_cover_data() {
        let data = b"aaa\nbb\nc\ndddd\ne\n";
        for n in 1..8 {
            let chunks = find_chunk_boundaries(data, n);
            assert_eq!(chunks.first().map(|c| c.0), Some(0));
            assert_eq!(chunks.last().map(|c| c.1), Some(data.len()));
            for pair in chunks.windows(2) {
                assert_eq!(pair[0].1, pair[1].0);
                assert_eq!(data[pair[0].1 - 1], b'\n');
            }
        }
    }

    #[test]
    fn test_parallel_chunks_preserve_order_and_line_numbers() {
        let mut body = String::new();
        for i in 0..500 {
            body.push_str(&format!("{},SE,FT,Title {},{},0,M,US\n", 2000 + i, i, i * 10));
        }
        body.push_str("2024,SE,FT,Bad,oops,0,M,US\n");

        let csv = format!("{HEADER}{body}");
        let ds = Dataset::from_csv_bytes(csv.into_bytes(), LoadOptions::lenient()).unwrap();
        assert_eq!(ds.len(), 500);
        assert!(ds.work_years().iter().copied().eq(2000..2500));
        assert_eq!(ds.record(499).job_title, "Title 499");
        assert_eq!(ds.parse_summary().errors[0].line, 502);
    }
}
