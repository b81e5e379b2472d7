//! In-memory index for tests and embedding.
//!
//! [`InMemoryIndex`] keeps documents in a `BTreeMap` keyed by id behind a
//! `RwLock`, evaluates queries with [`Query`], and records every query it
//! receives so callers can inspect exactly what was asked.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::debug;

use crate::document::IndexDocument;
use crate::error::{IndexError, IndexResult};
use crate::query::Query;
use crate::traits::{IndexClient, QueryParams, QueryResponse, SortDirection, SortSpec};

/// An in-memory implementation of [`IndexClient`].
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    docs: RwLock<BTreeMap<String, IndexDocument>>,
    log: RwLock<Vec<(String, QueryParams)>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch a stored document by id.
    pub fn get(&self, id: &str) -> IndexResult<Option<IndexDocument>> {
        let docs = self.docs.read().map_err(|e| IndexError::Poisoned(e.to_string()))?;
        Ok(docs.get(id).cloned())
    }

    /// Every query received so far, oldest first.
    pub fn query_log(&self) -> Vec<(String, QueryParams)> {
        self.log.read().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn clear_query_log(&self) {
        if let Ok(mut log) = self.log.write() {
            log.clear();
        }
    }
}

fn compare_docs(a: &IndexDocument, b: &IndexDocument, sort: &[SortSpec]) -> Ordering {
    for spec in sort {
        let ord = match (a.first(&spec.field), b.first(&spec.field)) {
            (Some(x), Some(y)) => match spec.direction {
                SortDirection::Asc => x.cmp(y),
                SortDirection::Desc => y.cmp(x),
            },
            // Documents missing the sort field go last in either direction.
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl IndexClient for InMemoryIndex {
    fn query(&self, q: &str, params: &QueryParams) -> IndexResult<QueryResponse> {
        self.log
            .write()
            .map_err(|e| IndexError::Poisoned(e.to_string()))?
            .push((q.to_string(), params.clone()));

        let query = Query::parse(q)?;
        let sort = params
            .sort
            .iter()
            .map(|s| s.parse::<SortSpec>())
            .collect::<IndexResult<Vec<_>>>()?;

        let docs = self.docs.read().map_err(|e| IndexError::Poisoned(e.to_string()))?;
        let mut matched: Vec<&IndexDocument> = docs.values().filter(|d| query.matches(d)).collect();
        matched.sort_by(|a, b| compare_docs(a, b, &sort));

        let num_found = matched.len() as u64;
        let start = params.page.saturating_sub(1).saturating_mul(params.rows);
        let page: Vec<IndexDocument> = matched
            .into_iter()
            .skip(start)
            .take(params.rows)
            .map(|d| match &params.field_list {
                Some(fl) => d.project(fl),
                None => d.clone(),
            })
            .collect();
        let has_next = params.rows > 0 && (start + params.rows) < num_found as usize;

        debug!(query = q, num_found, page = params.page, "index query");
        Ok(QueryResponse {
            docs: page,
            num_found,
            has_next,
        })
    }

    fn add(&self, doc: IndexDocument) -> IndexResult<()> {
        let id = doc.id().ok_or(IndexError::MissingId)?.to_string();
        self.docs
            .write()
            .map_err(|e| IndexError::Poisoned(e.to_string()))?
            .insert(id, doc);
        Ok(())
    }

    fn delete(&self, id: &str) -> IndexResult<bool> {
        Ok(self
            .docs
            .write()
            .map_err(|e| IndexError::Poisoned(e.to_string()))?
            .remove(id)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> InMemoryIndex {
        let index = InMemoryIndex::new();
        for (id, created, baz) in [
            ("changeme:30", "2024-01-03", "quix"),
            ("changeme:22", "2024-01-01", "quack"),
            ("changeme:25", "2024-01-02", "quix"),
        ] {
            let mut doc = IndexDocument::with_id(id);
            doc.push("system_create_dtsi", created);
            doc.push("baz", baz);
            index.add(doc).unwrap();
        }
        index
    }

    #[test]
    fn add_requires_id() {
        let index = InMemoryIndex::new();
        assert!(matches!(index.add(IndexDocument::new()), Err(IndexError::MissingId)));
    }

    #[test]
    fn add_replaces_by_id() {
        let index = seeded();
        index.add(IndexDocument::with_id("changeme:30")).unwrap();
        assert_eq!(index.len(), 3);
        assert!(!index.get("changeme:30").unwrap().unwrap().contains("baz"));
    }

    #[test]
    fn query_sorts_and_projects() {
        let index = seeded();
        let params = QueryParams::new(10)
            .sort(vec!["system_create_dtsi asc".into()])
            .fields(&["id"]);
        let resp = index.query("*:*", &params).unwrap();
        let ids: Vec<_> = resp.docs.iter().map(|d| d.id().unwrap()).collect();
        assert_eq!(ids, ["changeme:22", "changeme:25", "changeme:30"]);
        assert_eq!(resp.docs[0].len(), 1);
        assert!(!resp.has_next);
    }

    #[test]
    fn pagination_reports_has_next() {
        let index = seeded();
        let sort = vec!["id asc".to_string()];
        let first = index.query("*:*", &QueryParams::new(2).sort(sort.clone())).unwrap();
        assert_eq!(first.docs.len(), 2);
        assert!(first.has_next);
        let second = index.query("*:*", &QueryParams::new(2).page(2).sort(sort)).unwrap();
        assert_eq!(second.docs.len(), 1);
        assert!(!second.has_next);
        assert_eq!(second.num_found, 3);
    }

    #[test]
    fn count_uses_zero_rows() {
        let index = seeded();
        assert_eq!(index.count("baz:\"quix\"").unwrap(), 2);
        let (q, params) = index.query_log().pop().unwrap();
        assert_eq!(q, "baz:\"quix\"");
        assert_eq!(params.rows, 0);
    }

    #[test]
    fn delete_and_log_reset() {
        let index = seeded();
        assert!(index.delete("changeme:22").unwrap());
        assert!(!index.delete("changeme:22").unwrap());
        index.count("*:*").unwrap();
        index.clear_query_log();
        assert!(index.query_log().is_empty());
    }

    #[test]
    fn missing_sort_field_goes_last() {
        let index = seeded();
        index.add(IndexDocument::with_id("changeme:1")).unwrap();
        let resp = index
            .query("*:*", &QueryParams::new(10).sort(vec!["system_create_dtsi desc".into()]))
            .unwrap();
        assert_eq!(resp.docs.last().unwrap().id(), Some("changeme:1"));
    }
}
