use super::form::FilterForm;
use crate::api::types::{PageRequest, PageResult, Row};
use crate::api::{ApiError, ProteomeApi};
use anyhow::Result;

/// Last server-confirmed page. Starts at 1 and only moves when a result is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    current_page: u32,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self { current_page: 1 }
    }
}

impl PaginationState {
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    fn confirm(&mut self, page: u32) {
        self.current_page = page.max(1);
    }
}

/// What the results table and pagination controls currently show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    /// None until the first page arrives.
    pub count: Option<u64>,
    pub rows: Vec<Row>,
    pub prev_disabled: bool,
    pub next_disabled: bool,
}

impl Default for TableView {
    fn default() -> Self {
        Self {
            count: None,
            rows: Vec::new(),
            prev_disabled: true,
            next_disabled: false,
        }
    }
}

/// An issued page request tagged with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    pub seq: u64,
    pub request: PageRequest,
}

/// A finished page request, ready to be fed back into the controller.
#[derive(Debug)]
pub struct PageResponse {
    pub seq: u64,
    pub result: Result<PageResult, ApiError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Applied { page: u32 },
    /// A newer response already settled; this one was dropped.
    Stale { seq: u64, newest: u64 },
    /// The request failed; table and pagination left as they were.
    Failed,
}

pub struct QueryController {
    page_size: u32,
    state: PaginationState,
    view: TableView,
    next_seq: u64,
    settled_seq: u64,
    in_flight: usize,
}

impl QueryController {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            state: PaginationState::default(),
            view: TableView::default(),
            next_seq: 0,
            settled_seq: 0,
            in_flight: 0,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn current_page(&self) -> u32 {
        self.state.current_page()
    }

    pub fn view(&self) -> &TableView {
        &self.view
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// New filter: always starts over at page 1.
    pub fn submit_filter(&mut self, form: &FilterForm) -> Result<PageTicket> {
        self.issue(form, 1)
    }

    /// Returns None (and sends nothing) when already on page 1.
    pub fn go_to_previous_page(&mut self, form: &FilterForm) -> Result<Option<PageTicket>> {
        let current = self.state.current_page();
        if current <= 1 {
            return Ok(None);
        }
        self.issue(form, current - 1).map(Some)
    }

    /// No upper bound check; the server decides whether the page exists.
    pub fn go_to_next_page(&mut self, form: &FilterForm) -> Result<PageTicket> {
        let next = self.state.current_page().saturating_add(1);
        self.issue(form, next)
    }

    fn issue(&mut self, form: &FilterForm, page: u32) -> Result<PageTicket> {
        let criteria = form.criteria()?;
        self.next_seq += 1;
        self.in_flight += 1;
        let ticket = PageTicket {
            seq: self.next_seq,
            request: PageRequest {
                criteria,
                page,
                page_size: self.page_size,
            },
        };
        tracing::debug!(seq = ticket.seq, page, "page request issued");
        Ok(ticket)
    }

    pub fn handle_response(&mut self, response: PageResponse) -> PageOutcome {
        match response.result {
            Ok(result) => self.handle_page_result(response.seq, result),
            Err(err) => self.handle_page_error(response.seq, &err),
        }
    }

    /// Count a response as settled. Anything at or below the newest settled
    /// sequence, success or failure, is stale.
    fn settle(&mut self, seq: u64) -> Option<PageOutcome> {
        self.in_flight = self.in_flight.saturating_sub(1);
        if seq <= self.settled_seq {
            tracing::debug!(seq, newest = self.settled_seq, "dropping stale page response");
            return Some(PageOutcome::Stale {
                seq,
                newest: self.settled_seq,
            });
        }
        self.settled_seq = seq;
        None
    }

    pub fn handle_page_result(&mut self, seq: u64, result: PageResult) -> PageOutcome {
        if let Some(stale) = self.settle(seq) {
            return stale;
        }

        let short_page = result.preview.len() < self.page_size as usize;
        self.state.confirm(result.page);
        self.view.count = Some(result.count);
        self.view.rows = result
            .preview
            .into_iter()
            .take(self.page_size as usize)
            .collect();
        self.view.prev_disabled = self.state.current_page() == 1;
        self.view.next_disabled = short_page;

        tracing::info!(
            page = self.state.current_page(),
            count = result.count,
            rows = self.view.rows.len(),
            "page applied"
        );
        PageOutcome::Applied {
            page: self.state.current_page(),
        }
    }

    pub fn handle_page_error(&mut self, seq: u64, err: &ApiError) -> PageOutcome {
        if let Some(stale) = self.settle(seq) {
            return stale;
        }
        tracing::warn!(seq, error = %err, "filter request failed, keeping previous table");
        PageOutcome::Failed
    }
}

/// Run one page request against the API.
pub async fn fetch_page(api: &dyn ProteomeApi, ticket: PageTicket) -> PageResponse {
    let result = api.filter(&ticket.request).await;
    PageResponse {
        seq: ticket.seq,
        result,
    }
}
