pub mod render;
pub mod state;

use crate::api::types::RawDownload;
use crate::api::{ApiError, ProteomeApi};
use crate::controller::download::ERROR_REPORT_TITLE;
use crate::controller::query::{fetch_page, PageResponse, PageTicket};
use crate::controller::{DownloadController, DownloadReport, PageOutcome, QueryController};
use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures_util::StreamExt;
use ratatui::prelude::*;
use state::{AppState, FormField};
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Results of spawned network calls, fed back into the UI loop.
#[derive(Debug)]
pub enum AppEvent {
    Page(PageResponse),
    Download(Result<RawDownload, ApiError>),
}

/// User intents decoded from key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    None,
    Submit,
    PreviousPage,
    NextPage,
    Download,
    Quit,
}

/// Owns the controllers and the render state. All mutation happens on the
/// UI loop; network calls run as spawned tasks that report back via `AppEvent`.
pub struct App {
    pub state: AppState,
    query: QueryController,
    download: DownloadController,
    api: Arc<dyn ProteomeApi>,
    events_tx: mpsc::Sender<AppEvent>,
}

impl App {
    pub fn new(
        api: Arc<dyn ProteomeApi>,
        query: QueryController,
        download: DownloadController,
        server: &str,
    ) -> (Self, mpsc::Receiver<AppEvent>) {
        let (events_tx, events_rx) = mpsc::channel(64);
        let state = AppState::new(server, query.page_size());
        let app = Self {
            state,
            query,
            download,
            api,
            events_tx,
        };
        (app, events_rx)
    }

    /// Apply a key press to the form; returns the action it triggers.
    pub fn handle_key(&mut self, key: KeyEvent) -> UiAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        // An open alert swallows everything but dismiss and quit.
        if self.state.alert.is_some() {
            return match key.code {
                KeyCode::Char('c') if ctrl => UiAction::Quit,
                KeyCode::Esc | KeyCode::Enter => {
                    self.state.dismiss_alert();
                    UiAction::None
                }
                _ => UiAction::None,
            };
        }

        if ctrl {
            return match key.code {
                KeyCode::Char('c') => UiAction::Quit,
                KeyCode::Char('d') => UiAction::Download,
                KeyCode::Char('u') => {
                    if let Some(text) = self.state.focused_text_mut() {
                        text.clear();
                    }
                    UiAction::None
                }
                _ => UiAction::None,
            };
        }

        match key.code {
            KeyCode::Esc => UiAction::Quit,
            KeyCode::Tab => {
                self.state.focus = self.state.focus.next();
                UiAction::None
            }
            KeyCode::BackTab => {
                self.state.focus = self.state.focus.prev();
                UiAction::None
            }
            // Consumed here so it never reaches a text field.
            KeyCode::Enter => UiAction::Submit,
            KeyCode::Left | KeyCode::PageUp => UiAction::PreviousPage,
            KeyCode::Right | KeyCode::PageDown => UiAction::NextPage,
            KeyCode::Char(' ') if self.state.focus == FormField::RemoveRedundancy => {
                self.state.form.remove_redundancy = !self.state.form.remove_redundancy;
                UiAction::None
            }
            KeyCode::Char(c) => {
                if let Some(text) = self.state.focused_text_mut() {
                    text.push(c);
                }
                UiAction::None
            }
            KeyCode::Backspace => {
                if let Some(text) = self.state.focused_text_mut() {
                    text.pop();
                }
                UiAction::None
            }
            _ => UiAction::None,
        }
    }

    /// Run an action. Returns false when the app should exit.
    pub fn dispatch(&mut self, action: UiAction) -> bool {
        match action {
            UiAction::None => {}
            UiAction::Quit => return false,
            UiAction::Submit => {
                let ticket = self.query.submit_filter(&self.state.form);
                self.send_page(ticket.map(Some));
            }
            UiAction::PreviousPage => {
                let ticket = self.query.go_to_previous_page(&self.state.form);
                self.send_page(ticket);
            }
            UiAction::NextPage => {
                let ticket = self.query.go_to_next_page(&self.state.form);
                self.send_page(ticket.map(Some));
            }
            UiAction::Download => self.send_download(),
        }
        self.sync();
        true
    }

    fn send_page(&mut self, ticket: Result<Option<PageTicket>>) {
        let ticket = match ticket {
            Ok(Some(ticket)) => ticket,
            Ok(None) => return,
            Err(e) => {
                self.invalid_form(e);
                return;
            }
        };
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let response = fetch_page(api.as_ref(), ticket).await;
            let _ = tx.send(AppEvent::Page(response)).await;
        });
    }

    fn send_download(&mut self) {
        let criteria = match self.download.begin(&self.state.form) {
            Ok(criteria) => criteria,
            Err(e) => {
                self.invalid_form(e);
                return;
            }
        };
        self.state.push_log("INFO", "Requesting FASTA export...".to_string());
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let response = api.download_fasta(&criteria).await;
            let _ = tx.send(AppEvent::Download(response)).await;
        });
    }

    fn invalid_form(&mut self, err: anyhow::Error) {
        let message = format!("{:#}", err);
        tracing::warn!(error = %message, "cannot build filter criteria");
        self.state.push_log("ERROR", message.clone());
        self.state.show_alert("Invalid filter", message);
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Page(response) => {
                let failure = response.result.as_ref().err().map(|e| e.to_string());
                match self.query.handle_response(response) {
                    PageOutcome::Applied { page } => {
                        self.state.status.clear();
                        self.state.push_log("INFO", format!("Loaded page {}", page));
                    }
                    PageOutcome::Stale { seq, newest } => {
                        tracing::debug!(seq, newest, "ignored stale page");
                    }
                    PageOutcome::Failed => {
                        let message = failure.unwrap_or_default();
                        self.state.status = "Listing request failed".to_string();
                        self.state.push_log("ERROR", message);
                    }
                }
            }
            AppEvent::Download(response) => {
                let report = self.download.handle_response(response);
                match &report {
                    DownloadReport::Saved { path, bytes } => {
                        let line = format!("Saved {} ({} bytes)", path.display(), bytes);
                        self.state.push_log("SAVE", line);
                    }
                    DownloadReport::Errors { message } => {
                        self.state.push_log("WARN", "Export reported errors".to_string());
                        self.state.show_alert(ERROR_REPORT_TITLE, message.clone());
                    }
                    DownloadReport::Empty => {
                        self.state.push_log("WARN", "Export returned no file".to_string());
                    }
                    DownloadReport::Failed { message } => {
                        self.state.push_log("ERROR", message.clone());
                        self.state.show_alert("Download failed", message.clone());
                    }
                }
            }
        }
        self.sync();
    }

    fn sync(&mut self) {
        self.state.table = self.query.view().clone();
        self.state.current_page = self.query.current_page();
        self.state.pending_pages = self.query.in_flight();
        self.state.pending_downloads = self.download.in_flight();
    }
}

/// Run the TUI until the user quits. Issues the initial page-1 fetch first.
pub async fn run_tui(mut app: App, events_rx: mpsc::Receiver<AppEvent>) -> Result<()> {
    app.dispatch(UiAction::Submit);

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = tui_loop(&mut terminal, app, events_rx).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    mut app: App,
    mut events_rx: mpsc::Receiver<AppEvent>,
) -> Result<()> {
    let mut keys = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(100));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut spinner_frame: u8 = 0;

    loop {
        terminal.draw(|f| render::draw(f, &app.state, spinner_frame))?;

        tokio::select! {
            maybe_event = keys.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    let action = app.handle_key(key);
                    if !app.dispatch(action) {
                        return Ok(());
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            },
            Some(event) = events_rx.recv() => app.handle_event(event),
            _ = tick.tick() => {
                if app.state.is_busy() {
                    spinner_frame = spinner_frame.wrapping_add(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{FilterCriteria, PageRequest, PageResult};
    use crate::controller::download::{DownloadSink, StagedBlob};
    use async_trait::async_trait;
    use std::path::PathBuf;

    struct EmptyApi;

    #[async_trait]
    impl ProteomeApi for EmptyApi {
        async fn filter(&self, request: &PageRequest) -> Result<PageResult, ApiError> {
            Ok(PageResult {
                count: 0,
                page: request.page,
                page_size: None,
                preview: Vec::new(),
            })
        }

        async fn download_fasta(
            &self,
            _criteria: &FilterCriteria,
        ) -> Result<RawDownload, ApiError> {
            Ok(RawDownload {
                status: 200,
                content_type: Some("application/json".to_string()),
                body: br#"{"errors":["Bad taxon ID: XYZ"]}"#.to_vec(),
            })
        }
    }

    struct NoSink;

    impl DownloadSink for NoSink {
        fn stage(&mut self, _bytes: &[u8]) -> Result<StagedBlob> {
            anyhow::bail!("not used")
        }
        fn save_as(&mut self, _blob: StagedBlob, _file_name: &str) -> Result<PathBuf> {
            anyhow::bail!("not used")
        }
    }

    fn app() -> (App, mpsc::Receiver<AppEvent>) {
        App::new(
            Arc::new(EmptyApi),
            QueryController::new(30),
            DownloadController::new("proteomes.fasta", Box::new(NoSink)),
            "http://test",
        )
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn test_typing_goes_to_focused_field() {
        let (mut app, _rx) = app();
        for c in "P123".chars() {
            assert_eq!(app.handle_key(press(KeyCode::Char(c))), UiAction::None);
        }
        app.handle_key(press(KeyCode::Backspace));
        assert_eq!(app.state.form.taxa_list, "P12");

        app.handle_key(press(KeyCode::Tab));
        app.handle_key(press(KeyCode::Tab));
        app.handle_key(press(KeyCode::Char(' ')));
        assert!(app.state.form.remove_redundancy);
        assert_eq!(app.state.form.taxa_list, "P12");
    }

    #[tokio::test]
    async fn test_enter_submits_without_editing() {
        let (mut app, _rx) = app();
        assert_eq!(app.handle_key(press(KeyCode::Enter)), UiAction::Submit);
        assert!(app.state.form.taxa_list.is_empty());
    }

    #[tokio::test]
    async fn test_control_keys() {
        let (mut app, _rx) = app();
        let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        assert_eq!(app.handle_key(ctrl('d')), UiAction::Download);
        assert_eq!(app.handle_key(ctrl('c')), UiAction::Quit);
        app.state.form.taxa_list = "abc".to_string();
        app.handle_key(ctrl('u'));
        assert!(app.state.form.taxa_list.is_empty());
    }

    #[tokio::test]
    async fn test_alert_swallows_keys_until_dismissed() {
        let (mut app, _rx) = app();
        app.state.show_alert("t", "m".to_string());
        assert_eq!(app.handle_key(press(KeyCode::Right)), UiAction::None);
        assert_eq!(app.handle_key(press(KeyCode::Esc)), UiAction::None);
        assert!(app.state.alert.is_none());
        assert_eq!(app.handle_key(press(KeyCode::Esc)), UiAction::Quit);
    }

    #[tokio::test]
    async fn test_alert_blocks_new_download_but_not_quit() {
        let (mut app, mut rx) = app();
        app.state.show_alert("Download failed", "m".to_string());
        let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);

        assert_eq!(app.handle_key(ctrl('d')), UiAction::None);
        assert!(app.state.alert.is_some());
        assert_eq!(app.state.pending_downloads, 0);
        assert!(rx.try_recv().is_err());

        assert_eq!(app.handle_key(ctrl('c')), UiAction::Quit);
    }

    #[tokio::test]
    async fn test_submit_round_trip_updates_state() {
        let (mut app, mut rx) = app();
        assert!(app.dispatch(UiAction::Submit));
        assert_eq!(app.state.pending_pages, 1);

        let event = rx.recv().await.unwrap();
        app.handle_event(event);
        assert_eq!(app.state.pending_pages, 0);
        assert_eq!(app.state.table.count, Some(0));
        assert!(app.state.table.next_disabled);
        assert!(app.state.table.prev_disabled);
    }

    #[tokio::test]
    async fn test_previous_on_first_page_spawns_nothing() {
        let (mut app, mut rx) = app();
        app.dispatch(UiAction::PreviousPage);
        assert_eq!(app.state.pending_pages, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_download_errors_raise_one_alert() {
        let (mut app, mut rx) = app();
        app.dispatch(UiAction::Download);
        let event = rx.recv().await.unwrap();
        app.handle_event(event);
        let alert = app.state.alert.clone().unwrap();
        assert_eq!(alert.title, ERROR_REPORT_TITLE);
        assert_eq!(alert.message, "Bad taxon ID: XYZ");
        assert_eq!(app.state.pending_downloads, 0);
    }

    #[tokio::test]
    async fn test_unreadable_taxa_file_alerts() {
        let (mut app, _rx) = app();
        app.state.form.taxa_file_path = "/nope/taxa.txt".to_string();
        app.dispatch(UiAction::Submit);
        assert_eq!(app.state.pending_pages, 0);
        assert_eq!(app.state.alert.as_ref().unwrap().title, "Invalid filter");
    }

    #[test]
    fn test_quit_action_stops_dispatch() {
        let (mut app, _rx) = app();
        assert!(!app.dispatch(UiAction::Quit));
    }
}
