use log::{debug, warn};

use crate::data::filter::{filtered_indices, FlagFilter, RowFilter};
use crate::data::model::{Row, Table};
use crate::data::paging::Page;
use crate::error::LoadError;
use crate::jobs::LoadTicket;
use crate::stats::tally::{tally_with, AggregateSummary, SentimentLabel};

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Everything that can change a panel.
#[derive(Debug)]
pub enum Action {
    LoadStarted(LoadTicket),
    LoadFinished(LoadTicket, Result<Table, LoadError>),
    SetQuery(String),
    SetFlagFilter(FlagFilter),
    SetLabelFilter(Option<SentimentLabel>),
    SetPage(usize),
    SetPageSize(usize),
}

// ---------------------------------------------------------------------------
// Panel state
// ---------------------------------------------------------------------------

/// State of one data panel, independent of rendering.
#[derive(Debug, Default)]
pub struct PanelState {
    /// Last successfully loaded table.
    pub table: Option<Table>,

    pub filter: RowFilter,

    /// Indices of rows passing `filter` (cached).
    pub visible_indices: Vec<usize>,

    pub page: Page,

    /// Status / error message for the empty state.
    pub status_message: Option<String>,

    pub loading: bool,

    generation: u64,
    current: Option<LoadTicket>,
}

impl PanelState {
    pub fn new(filter: RowFilter, page_size: usize) -> Self {
        Self {
            filter,
            page: Page {
                page: 1,
                page_size: page_size.max(1),
            },
            ..Self::default()
        }
    }

    /// Start a new load: cancels whichever load is in flight and returns the
    /// ticket the new one must carry.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        let ticket = LoadTicket::new(self.generation);
        self.apply(Action::LoadStarted(ticket.clone()));
        ticket
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::LoadStarted(ticket) => {
                if let Some(previous) = self.current.take() {
                    previous.cancel.cancel();
                }
                self.generation = self.generation.max(ticket.generation);
                self.current = Some(ticket);
                self.loading = true;
                self.status_message = None;
            }
            Action::LoadFinished(ticket, result) => {
                if ticket.generation != self.generation {
                    debug!(
                        "Discarding stale load #{} (current #{})",
                        ticket.generation, self.generation
                    );
                    return;
                }
                self.current = None;
                self.loading = false;
                match result {
                    Ok(table) => {
                        self.table = Some(table);
                        self.status_message = None;
                        self.page.page = 1;
                        self.refilter();
                    }
                    Err(LoadError::Cancelled) => {}
                    Err(e) => {
                        warn!("Load failed: {e}");
                        self.status_message = Some(e.to_string());
                    }
                }
            }
            Action::SetQuery(query) => {
                self.filter.query = query;
                self.reset_page_and_refilter();
            }
            Action::SetFlagFilter(flag) => {
                self.filter.flag = flag;
                self.reset_page_and_refilter();
            }
            Action::SetLabelFilter(label) => {
                self.filter.label = label;
                self.reset_page_and_refilter();
            }
            Action::SetPage(page) => {
                self.page = Page { page, ..self.page }.clamped(self.visible_indices.len());
            }
            Action::SetPageSize(size) => {
                self.page.page_size = size.max(1);
                self.page.page = 1;
            }
        }
    }

    /// Recompute `visible_indices` after a filter or table change.
    pub fn refilter(&mut self) {
        self.visible_indices = match &self.table {
            Some(table) => filtered_indices(table, &self.filter),
            None => Vec::new(),
        };
    }

    fn reset_page_and_refilter(&mut self) {
        self.page.page = 1;
        self.refilter();
    }

    /// Rows that pass the current filter.
    pub fn visible_rows(&self) -> Vec<&Row> {
        match &self.table {
            Some(table) => self
                .visible_indices
                .iter()
                .filter_map(|&i| table.rows.get(i))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Rows on the current page.
    pub fn page_rows(&self) -> Vec<&Row> {
        let rows = self.visible_rows();
        self.page.slice(&rows).to_vec()
    }

    /// Sentiment tally over the filtered rows.
    pub fn summary(&self) -> AggregateSummary {
        tally_with(
            self.visible_rows(),
            &self.filter.label_column,
            self.filter.label_mode,
        )
    }
}
