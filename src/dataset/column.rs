use crate::dataset::schema::ColumnType;

/// Byte range of a text value inside the dataset buffer.
pub type Span = (usize, usize);

/// A dataset column. Parsing produces one chunk per worker; [`Column::flatten_in_place`]
/// collapses them so values can be addressed by row index.
#[derive(Debug, Clone)]
pub enum Column {
    Int64(Vec<Vec<i64>>),
    Float64(Vec<Vec<f64>>),
    Str(Vec<Vec<Span>>), // Absolute offsets into the buffer
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

    pub fn total_len(&self) -> usize {
        match self {
            Column::Int64(chunks) => chunks.iter().map(|c| c.len()).sum(),
            Column::Float64(chunks) => chunks.iter().map(|c| c.len()).sum(),
            Column::Str(chunks) => chunks.iter().map(|c| c.len()).sum(),
        }
    }

    /// Values of an `Int64` column. Empty for other types or before flattening.
    pub fn as_i64(&self) -> &[i64] {
        match self {
            Column::Int64(chunks) => first_chunk(chunks),
            _ => &[],
        }
    }

    pub fn as_f64(&self) -> &[f64] {
        match self {
            Column::Float64(chunks) => first_chunk(chunks),
            _ => &[],
        }
    }

    pub fn as_spans(&self) -> &[Span] {
        match self {
            Column::Str(chunks) => first_chunk(chunks),
            _ => &[],
        }
    }

    pub fn flatten_in_place(&mut self) {
        match self {
            Column::Int64(chunks) => flatten_chunks(chunks),
            Column::Float64(chunks) => flatten_chunks(chunks),
            Column::Str(chunks) => flatten_chunks(chunks),
        }
    }
}

fn first_chunk<T>(chunks: &[Vec<T>]) -> &[T] {
    debug_assert!(chunks.len() <= 1, "column read before flattening");
    chunks.first().map(Vec::as_slice).unwrap_or(&[])
}

fn flatten_chunks<T>(chunks: &mut Vec<Vec<T>>) {
    if chunks.len() <= 1 {
        return; // Already flat
    }

    // Reuse the first chunk's allocation as the base
    let mut owned_chunks = std::mem::take(chunks);
    let mut flattened = owned_chunks.remove(0);

    let total: usize = owned_chunks.iter().map(|c| c.len()).sum();
    flattened.reserve(total);

    for chunk in owned_chunks {
        flattened.extend(chunk);
    }

    chunks.push(flattened);
}
