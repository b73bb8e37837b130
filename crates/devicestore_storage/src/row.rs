//! Rows, cells and scan descriptions.

use std::collections::BTreeMap;

/// A column qualifier within the table's column family.
pub type Column = Vec<u8>;

/// A single column value to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Column qualifier.
    pub column: Column,
    /// Raw value bytes.
    pub value: Vec<u8>,
}

impl Cell {
    /// Creates a cell.
    pub fn new(column: impl Into<Column>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// The columns of one row, ordered by qualifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: BTreeMap<Column, Vec<u8>>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of a column.
    #[must_use]
    pub fn get(&self, column: &[u8]) -> Option<&[u8]> {
        self.columns.get(column).map(Vec::as_slice)
    }

    /// Returns true if the column is present.
    #[must_use]
    pub fn contains(&self, column: &[u8]) -> bool {
        self.columns.contains_key(column)
    }

    /// Sets a column value, replacing any previous value.
    pub fn insert(&mut self, column: impl Into<Column>, value: impl Into<Vec<u8>>) {
        self.columns.insert(column.into(), value.into());
    }

    /// Removes a column, returning its previous value.
    pub fn remove(&mut self, column: &[u8]) -> Option<Vec<u8>> {
        self.columns.remove(column)
    }

    /// Iterates over all columns whose qualifier starts with `prefix`.
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        self.columns
            .range(prefix.to_vec()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Iterates over all columns.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.columns.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the row holds no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Keeps only the requested columns. An empty selection keeps everything.
    #[must_use]
    pub fn project(mut self, columns: &[Column]) -> Self {
        if !columns.is_empty() {
            self.columns.retain(|k, _| columns.iter().any(|c| c == k));
        }
        self
    }
}

/// A server-side filter applied to row keys during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFilter {
    /// Key starts with the given bytes.
    Prefix(Vec<u8>),
    /// Key has exactly this many bytes.
    KeyLength(usize),
    /// Key holds `value` at byte `offset`.
    DiscriminatorAt {
        /// Byte offset into the key.
        offset: usize,
        /// Expected discriminator value.
        value: u8,
    },
    /// Every nested filter matches.
    All(Vec<RowFilter>),
}

impl RowFilter {
    /// Evaluates the filter against a row key.
    #[must_use]
    pub fn matches(&self, key: &[u8]) -> bool {
        match self {
            Self::Prefix(prefix) => key.starts_with(prefix),
            Self::KeyLength(len) => key.len() == *len,
            Self::DiscriminatorAt { offset, value } => key.get(*offset) == Some(value),
            Self::All(filters) => filters.iter().all(|f| f.matches(key)),
        }
    }
}

/// A range scan over `[start, stop)` with an optional row filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scan {
    /// Inclusive start key.
    pub start: Vec<u8>,
    /// Exclusive stop key (`None` scans to the end of the table).
    pub stop: Option<Vec<u8>>,
    /// Optional key filter.
    pub filter: Option<RowFilter>,
    /// Columns to return (empty returns all columns).
    pub columns: Vec<Column>,
}

impl Scan {
    /// Scans the whole table.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Scans `[start, stop)`.
    #[must_use]
    pub fn range(start: impl Into<Vec<u8>>, stop: impl Into<Vec<u8>>) -> Self {
        Self {
            start: start.into(),
            stop: Some(stop.into()),
            ..Self::default()
        }
    }

    /// Sets the row filter.
    #[must_use]
    pub fn with_filter(mut self, filter: RowFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Restricts the returned columns.
    #[must_use]
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    /// Returns true if `key` falls inside the scan range.
    #[must_use]
    pub fn in_range(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && self.stop.as_deref().map_or(true, |stop| key < stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_prefix_iteration() {
        let mut row = Row::new();
        row.insert(b"h\x01".to_vec(), b"a".to_vec());
        row.insert(b"h\x02".to_vec(), b"b".to_vec());
        row.insert(b"p".to_vec(), b"payload".to_vec());

        let history: Vec<_> = row.with_prefix(b"h").map(|(_, v)| v.to_vec()).collect();
        assert_eq!(history, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn row_projection() {
        let mut row = Row::new();
        row.insert(b"p".to_vec(), b"1".to_vec());
        row.insert(b"t".to_vec(), b"2".to_vec());

        let projected = row.clone().project(&[b"p".to_vec()]);
        assert_eq!(projected.len(), 1);
        assert!(projected.contains(b"p"));
        assert_eq!(row.project(&[]).len(), 2);
    }

    #[test]
    fn filter_discriminator_and_length() {
        let filter = RowFilter::All(vec![
            RowFilter::DiscriminatorAt {
                offset: 4,
                value: 0,
            },
            RowFilter::KeyLength(5),
        ]);
        assert!(filter.matches(&[1, 2, 3, 4, 0]));
        assert!(!filter.matches(&[1, 2, 3, 4, 1]));
        assert!(!filter.matches(&[1, 2, 3, 4, 0, 9]));
        assert!(!filter.matches(&[1, 2]));
    }

    #[test]
    fn scan_range_is_half_open() {
        let scan = Scan::range(vec![1, 1], vec![1, 3]);
        assert!(scan.in_range(&[1, 1]));
        assert!(scan.in_range(&[1, 2, 0xff]));
        assert!(!scan.in_range(&[1, 3]));
        assert!(!scan.in_range(&[1, 0, 0xff]));
        assert!(Scan::all().in_range(&[0xff; 9]));
    }
}
