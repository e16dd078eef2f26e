use std::sync::Arc;

use crate::eval::{EvalContext, QueryOutcome, evaluate};
use crate::index::{CategorizedIndex, FileRecord};
use crate::links::LinkGraph;
use crate::pagination::{Page, paginate};
use crate::query::{QueryTerm, parse_query};
use crate::Result;
use crate::sort::{SortColumn, SortState, sort_files};

/// What the navigator is showing. Updates return a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub raw: String,
    pub terms: Vec<QueryTerm>,
    pub sort: SortState,
    /// 1-based.
    pub page: usize,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new("")
    }
}

impl QueryState {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            terms: parse_query(raw),
            sort: SortState::default(),
            page: 1,
        }
    }

    /// New query text; sort is kept and the page resets.
    pub fn with_query(&self, raw: &str) -> Self {
        Self {
            sort: self.sort,
            ..Self::new(raw)
        }
    }

    pub fn with_sort(&self, sort: SortState) -> Self {
        Self {
            sort,
            ..self.clone()
        }
    }

    pub fn toggle_sort(&self, column: SortColumn) -> Self {
        self.with_sort(self.sort.toggle(column))
    }

    pub fn with_page(&self, page: usize) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }
}

/// Borrowed inputs for one query run.
#[derive(Debug, Clone, Copy)]
pub struct QueryInputs<'a> {
    pub index: &'a CategorizedIndex,
    pub links: &'a LinkGraph,
    pub ctx: &'a EvalContext,
}

#[derive(Debug, Clone)]
pub struct QueryResult {
    /// All matches in display order.
    pub files: Vec<Arc<FileRecord>>,
    pub date_label: String,
    pub page: Page<Arc<FileRecord>>,
}

/// Evaluate, sort, and paginate in one pass.
pub fn execute(
    state: &QueryState,
    inputs: QueryInputs<'_>,
    page_size: usize,
) -> Result<QueryResult> {
    let QueryOutcome {
        mut files,
        date_label,
    } = evaluate(&state.terms, inputs.index.filtered_files(), inputs.ctx);
    sort_files(&mut files, state.sort, inputs.links);
    let page = paginate(&files, page_size, state.page)?;
    Ok(QueryResult {
        files,
        date_label,
        page,
    })
}

/// The single mutable owner of a navigator view's state and current results.
#[derive(Debug, Clone)]
pub struct Navigator {
    state: QueryState,
    page_size: usize,
    outcome: QueryOutcome,
}

impl Navigator {
    pub fn new(page_size: usize) -> Self {
        Self {
            state: QueryState::default(),
            page_size,
            outcome: QueryOutcome::default(),
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn results(&self) -> &[Arc<FileRecord>] {
        &self.outcome.files
    }

    pub fn date_label(&self) -> &str {
        &self.outcome.date_label
    }

    /// Runs a new query over the index, keeping the current sort.
    pub fn search(
        &mut self,
        raw: &str,
        inputs: QueryInputs<'_>,
    ) -> Result<Page<Arc<FileRecord>>> {
        let state = self.state.with_query(raw);
        let mut outcome = evaluate(&state.terms, inputs.index.filtered_files(), inputs.ctx);
        sort_files(&mut outcome.files, state.sort, inputs.links);
        self.state = state;
        self.outcome = outcome;
        self.current_page()
    }

    /// Reorders the current results without re-running the query.
    pub fn sort_by(
        &mut self,
        column: SortColumn,
        links: &LinkGraph,
    ) -> Result<Page<Arc<FileRecord>>> {
        self.state = self.state.toggle_sort(column);
        sort_files(&mut self.outcome.files, self.state.sort, links);
        self.current_page()
    }

    pub fn go_to_page(&mut self, page: usize) -> Result<Page<Arc<FileRecord>>> {
        self.state = self.state.with_page(page);
        self.current_page()
    }

    pub fn current_page(&self) -> Result<Page<Arc<FileRecord>>> {
        paginate(&self.outcome.files, self.page_size, self.state.page)
    }
}
