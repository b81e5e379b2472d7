use std::fmt;
use std::str::FromStr;

use crate::document::IndexDocument;
use crate::error::{IndexError, IndexResult};

/// Sort order of one sort clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One `field asc|desc` sort clause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{} {dir}", self.field)
    }
}

impl FromStr for SortSpec {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let field = parts.next().ok_or_else(|| IndexError::InvalidSort(s.to_string()))?;
        let direction = match parts.next() {
            None | Some("asc") => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            Some(_) => return Err(IndexError::InvalidSort(s.to_string())),
        };
        if parts.next().is_some() {
            return Err(IndexError::InvalidSort(s.to_string()));
        }
        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// Parameters of one paginated index query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryParams {
    /// Page size. `0` asks for the count only.
    pub rows: usize,
    /// 1-based page number.
    pub page: usize,
    /// Sort clauses in wire form (`system_create_dtsi asc`).
    pub sort: Vec<String>,
    /// Fields to return; `None` returns every stored field.
    pub field_list: Option<Vec<String>>,
}

impl QueryParams {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            page: 1,
            sort: Vec::new(),
            field_list: None,
        }
    }

    /// Parameters of a count-only query.
    pub fn count_only() -> Self {
        Self::new(0)
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn sort(mut self, sort: Vec<String>) -> Self {
        self.sort = sort;
        self
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.field_list = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }
}

/// One page of query results.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryResponse {
    pub docs: Vec<IndexDocument>,
    /// Total number of matching documents across all pages.
    pub num_found: u64,
    /// Whether a further page exists after this one.
    pub has_next: bool,
}

/// Client for the search index.
///
/// Implementations must be `Send + Sync`. Calls are blocking; timeouts and
/// retries belong to the implementation.
pub trait IndexClient: Send + Sync {
    /// Run a query in the clause grammar and return one page.
    fn query(&self, q: &str, params: &QueryParams) -> IndexResult<QueryResponse>;

    /// Add or replace a document (keyed by its `id`).
    fn add(&self, doc: IndexDocument) -> IndexResult<()>;

    /// Delete a document by id. Returns `true` if it existed.
    fn delete(&self, id: &str) -> IndexResult<bool>;

    /// Number of documents matching `q`.
    ///
    /// Default implementation issues a zero-row query.
    fn count(&self, q: &str) -> IndexResult<u64> {
        Ok(self.query(q, &QueryParams::count_only())?.num_found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_spec_parse_and_display() {
        let spec: SortSpec = "system_create_dtsi asc".parse().unwrap();
        assert_eq!(spec, SortSpec::asc("system_create_dtsi"));
        assert_eq!(spec.to_string(), "system_create_dtsi asc");
        assert_eq!("id desc".parse::<SortSpec>().unwrap(), SortSpec::desc("id"));
        assert_eq!("title_t".parse::<SortSpec>().unwrap().direction, SortDirection::Asc);
        assert!("id sideways".parse::<SortSpec>().is_err());
        assert!("".parse::<SortSpec>().is_err());
    }

    #[test]
    fn params_builders() {
        let params = QueryParams::new(1000).page(2).sort(vec!["id asc".into()]).fields(&["id"]);
        assert_eq!(params.rows, 1000);
        assert_eq!(params.page, 2);
        assert_eq!(params.field_list.as_deref(), Some(&["id".to_string()][..]));
        assert_eq!(QueryParams::count_only().rows, 0);
    }
}
