//! Finder operations on [`DocMap`].
//!
//! Collection lookups page through the index sorted by creation time and
//! resolve each hit either by fetching and materializing it from the
//! repository or, under index resolution, as a frozen [`IndexedObject`].

use docmap_index::{term_clause, IndexDocument, QueryParams, QueryResponse, SortSpec, ID_FIELD};
use docmap_types::{ModelName, Pid};
use tracing::{debug, warn};

use crate::config::Resolution;
use crate::docmap::DocMap;
use crate::error::{ModelError, ModelResult};
use crate::object::DigitalObject;
use crate::proxy::{IndexedObject, ObjectView};
use crate::query::{Conditions, Filter, Lookup};

const ROOT_FIND_DEPRECATION: &str =
    "find_one on the root model without an explicit cast is deprecated; pass cast = Some(true) to keep casting";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Cast identifier lookups to the most specific asserted model.
    /// Unset means cast on the root model (with a deprecation notice) and
    /// no cast elsewhere.
    pub cast: Option<bool>,
}

impl FindOptions {
    pub fn cast(cast: bool) -> Self {
        Self { cast: Some(cast) }
    }
}

/// Paging options for [`DocMap::find_in_batches`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchOptions {
    /// Rows per batch; `0` uses the configured page size.
    pub batch_size: usize,
    /// Stored fields to return for each hit.
    pub fields: Vec<String>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 0,
            fields: vec![ID_FIELD.to_string()],
        }
    }
}

impl BatchOptions {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }
}

impl DocMap {
    // ---- Lookups ----

    pub fn find(&self, model: &str, lookup: Lookup, options: FindOptions) -> ModelResult<Vec<ObjectView>> {
        let model = self.model(model)?;
        match lookup {
            Lookup::Pid(pid) => Ok(vec![ObjectView::Materialized(
                self.find_one_as(&model, &pid, options.cast)?,
            )]),
            Lookup::All => self.collect(&model, &Conditions::new()),
            Lookup::Conditions(conditions) => self.collect(&model, &conditions),
        }
    }

    pub fn find_all(&self, model: &str) -> ModelResult<Vec<ObjectView>> {
        self.find(model, Lookup::All, FindOptions::default())
    }

    pub fn find_where(&self, model: &str, conditions: Conditions) -> ModelResult<Vec<ObjectView>> {
        self.find(model, Lookup::Conditions(conditions), FindOptions::default())
    }

    /// Fetch and materialize one object from the repository.
    ///
    /// On the root model an unset `cast` emits a deprecation notice and
    /// casts; on any other model it means no cast.
    pub fn find_one(&self, model: &str, pid: &Pid, cast: Option<bool>) -> ModelResult<DigitalObject> {
        self.find_one_as(&self.model(model)?, pid, cast)
    }

    fn find_one_as(&self, model: &ModelName, pid: &Pid, cast: Option<bool>) -> ModelResult<DigitalObject> {
        let cast = match cast {
            Some(cast) => cast,
            None if self.registry().is_root(model) => {
                self.deprecations().deprecated(ROOT_FIND_DEPRECATION);
                true
            }
            None => false,
        };
        let record = self.repository().fetch(pid)?;
        let obj = self.materializer().materialize(model, Some(&record))?;
        if !cast {
            return Ok(obj);
        }
        let target = self.materializer().cast_target(&obj, model);
        self.materializer().cast(obj, &target)
    }

    /// Call `f` with each matching object, in creation order. Returns the
    /// number of objects visited.
    pub fn find_each<F>(&self, model: &str, conditions: &Conditions, mut f: F) -> ModelResult<usize>
    where
        F: FnMut(ObjectView) -> ModelResult<()>,
    {
        let model = self.model(model)?;
        let mut visited = 0;
        self.each_page(&model, conditions, self.config().index.page_size, self.result_fields(), |docs| {
            for doc in docs {
                if let Some(view) = self.resolve(&model, doc)? {
                    f(view)?;
                    visited += 1;
                }
            }
            Ok(())
        })?;
        Ok(visited)
    }

    /// Call `f` with each page of raw index hits.
    pub fn find_in_batches<F>(
        &self,
        model: &str,
        conditions: &Conditions,
        options: &BatchOptions,
        mut f: F,
    ) -> ModelResult<()>
    where
        F: FnMut(&[IndexDocument]) -> ModelResult<()>,
    {
        let model = self.model(model)?;
        let rows = match options.batch_size {
            0 => self.config().index.page_size,
            n => n,
        };
        self.each_page(&model, conditions, rows, Some(options.fields.clone()), |docs| f(docs))
    }

    /// Run one query and return the raw index response.
    pub fn find_with_conditions(
        &self,
        model: &str,
        filter: &Filter,
        sort: Option<Vec<String>>,
    ) -> ModelResult<QueryResponse> {
        let model = self.model(model)?;
        let q = self.query_builder().filter_query(&model, filter);
        let params = QueryParams::new(self.config().index.page_size)
            .sort(sort.unwrap_or_else(|| self.creation_sort()));
        Ok(self.index().query(&q, &params)?)
    }

    /// Number of objects of `model` matching a raw query.
    pub fn count(&self, model: &str, conditions: Option<&str>) -> ModelResult<u64> {
        let model = self.model(model)?;
        let q = self.query_builder().raw_query(&model, conditions);
        Ok(self.index().count(&q)?)
    }

    /// The earliest-created object of `model`.
    pub fn first(&self, model: &str) -> ModelResult<Option<DigitalObject>> {
        self.edge(model, true)
    }

    /// The latest-created object of `model`.
    pub fn last(&self, model: &str) -> ModelResult<Option<DigitalObject>> {
        self.edge(model, false)
    }

    /// Whether the index holds a document for `pid`.
    pub fn exists(&self, pid: &Pid) -> ModelResult<bool> {
        Ok(self.index().count(&term_clause(ID_FIELD, pid.as_str()))? > 0)
    }

    // ---- Internals ----

    fn creation_sort(&self) -> Vec<String> {
        vec![SortSpec::asc(&self.fields().created).to_string()]
    }

    /// Fields requested per hit: ids only unless results come from the
    /// index itself.
    fn result_fields(&self) -> Option<Vec<String>> {
        match self.config().resolution {
            Resolution::Repository => Some(vec![ID_FIELD.to_string()]),
            Resolution::Index => None,
        }
    }

    fn collect(&self, model: &ModelName, conditions: &Conditions) -> ModelResult<Vec<ObjectView>> {
        let mut results = Vec::new();
        self.each_page(model, conditions, self.config().index.page_size, self.result_fields(), |docs| {
            for doc in docs {
                results.extend(self.resolve(model, doc)?);
            }
            Ok(())
        })?;
        Ok(results)
    }

    fn each_page<F>(
        &self,
        model: &ModelName,
        conditions: &Conditions,
        rows: usize,
        fields: Option<Vec<String>>,
        mut f: F,
    ) -> ModelResult<()>
    where
        F: FnMut(&[IndexDocument]) -> ModelResult<()>,
    {
        if rows == 0 {
            return Err(ModelError::Config("index.page_size must be positive".into()));
        }
        let q = self.query_builder().conditions_query(model, conditions);
        let mut params = QueryParams::new(rows).sort(self.creation_sort());
        params.field_list = fields;
        loop {
            let response = self.index().query(&q, &params)?;
            debug!(query = %q, page = params.page, hits = response.docs.len(), "finder page");
            f(&response.docs)?;
            if !response.has_next {
                return Ok(());
            }
            params.page += 1;
        }
    }

    fn resolve(&self, model: &ModelName, doc: &IndexDocument) -> ModelResult<Option<ObjectView>> {
        if self.config().resolution == Resolution::Index {
            let mut proxy = IndexedObject::from_document(
                doc.clone(),
                Some(model),
                self.registry(),
                self.namer().as_ref(),
                self.repository().clone(),
            )?;
            proxy.freeze();
            return Ok(Some(ObjectView::Proxy(proxy)));
        }
        let Some(id) = doc.id() else {
            warn!(model = %model, "skipping index document without an id");
            return Ok(None);
        };
        let pid = Pid::new(id)?;
        let obj = self.find_one_as(model, &pid, self.implicit_cast(model))?;
        Ok(Some(ObjectView::Materialized(obj)))
    }

    /// Collection lookups cast explicitly on the root model.
    fn implicit_cast(&self, model: &ModelName) -> Option<bool> {
        self.registry().is_root(model).then_some(true)
    }

    fn edge(&self, model: &str, ascending: bool) -> ModelResult<Option<DigitalObject>> {
        let model = self.model(model)?;
        let q = self.query_builder().conditions_query(&model, &Conditions::new());
        let sort = if ascending {
            [SortSpec::asc(&self.fields().created), SortSpec::asc(ID_FIELD)]
        } else {
            [SortSpec::desc(&self.fields().created), SortSpec::desc(ID_FIELD)]
        };
        let params = QueryParams::new(1)
            .sort(sort.iter().map(ToString::to_string).collect())
            .fields(&[ID_FIELD]);
        let response = self.index().query(&q, &params)?;
        let Some(id) = response.docs.first().and_then(|doc| doc.id()) else {
            return Ok(None);
        };
        let pid = Pid::new(id)?;
        self.find_one_as(&model, &pid, self.implicit_cast(&model)).map(Some)
    }
}
