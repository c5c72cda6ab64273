//! Row selection: which field is matched, which field is the identifier.

/// Predicate applied to the match field of each row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every row is selected.
    All,

    /// Rows whose match field starts with this literal.
    ///
    /// Case-sensitive and anchored at the first byte; no whitespace, case or
    /// unicode normalisation is applied to either side.
    Prefix(String),
}

impl Selection {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Selection::Prefix(prefix.into())
    }

    /// Returns `true` if `value` is selected.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Prefix(prefix) => value.starts_with(prefix.as_str()),
        }
    }
}

/// Positional layout of the rows a pipeline consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    /// Drop the first row before selection.
    pub header_skip: bool,

    /// Field tested by the selection; `None` means the selection is not
    /// consulted and every row passes.
    pub match_field: Option<usize>,

    /// Field holding the identifier passed to the remote operation.
    pub id_field: usize,
}

impl FieldMapping {
    /// Mapping for an exported table with a header row.
    pub fn with_header(match_field: usize, id_field: usize) -> Self {
        FieldMapping {
            header_skip: true,
            match_field: Some(match_field),
            id_field,
        }
    }

    /// Mapping for a headerless single-purpose list where every row counts.
    pub fn every_row(id_field: usize) -> Self {
        FieldMapping {
            header_skip: false,
            match_field: None,
            id_field,
        }
    }
}
