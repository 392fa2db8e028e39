// SPDX-License-Identifier: AGPL-3.0
// Estate Finder Core - Search controller
//
// Runs one search field as a task. Input is debounced, settled queries are
// filtered locally and sent to the candidate source, and every visible
// change is published as a SearchUpdate. All search state is owned by the
// task; remote requests report back to it through a channel.

use super::session::{RemoteApplied, RemoteRequest, SearchSession, SearchUpdate};
use crate::debounce::Debouncer;
use crate::source::CandidateSource;
use crate::types::{AppError, Candidate};
use async_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Updates kept for a slow consumer before the oldest is evicted
const UPDATE_QUEUE: usize = 64;

/// Commands accepted by a running search
#[derive(Debug)]
pub enum SearchCommand {
    /// Field text changed
    Input(String),
    /// Field cleared
    Clear,
    /// Fetch the local candidate list again
    Reload,
}

/// Parameters of one search field
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub debounce: Duration,
    /// Remote records from other cities are dropped when set
    pub city_filter: Option<String>,
    pub city_id: Option<i64>,
    /// Issue remote searches on settle
    pub remote: bool,
}

impl SearchConfig {
    /// Configuration matching what `source` can do
    pub fn for_source(source: &dyn CandidateSource, debounce: Duration) -> Self {
        Self {
            debounce,
            city_filter: source.city_filter().map(str::to_string),
            city_id: source.city_id(),
            remote: source.has_remote_search(),
        }
    }
}

struct RemoteOutcome {
    generation: u64,
    result: Result<Vec<Candidate>, AppError>,
}

/// Handle to a running search task
pub struct SearchController {
    command_tx: Sender<SearchCommand>,
    update_rx: Receiver<SearchUpdate>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SearchController {
    /// Start a search task on the current tokio runtime
    pub fn spawn(source: Arc<dyn CandidateSource>, config: SearchConfig) -> Self {
        let (command_tx, command_rx) = async_channel::bounded::<SearchCommand>(32);
        let (update_tx, update_rx) = async_channel::bounded::<SearchUpdate>(UPDATE_QUEUE);
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(run_search(
            source,
            config,
            command_rx,
            update_tx,
            update_rx.clone(),
            shutdown.clone(),
        ));

        Self {
            command_tx,
            update_rx,
            shutdown,
            task: Some(task),
        }
    }

    pub async fn input(&self, text: impl Into<String>) -> Result<(), AppError> {
        self.send(SearchCommand::Input(text.into())).await
    }

    pub async fn clear(&self) -> Result<(), AppError> {
        self.send(SearchCommand::Clear).await
    }

    pub async fn reload(&self) -> Result<(), AppError> {
        self.send(SearchCommand::Reload).await
    }

    async fn send(&self, command: SearchCommand) -> Result<(), AppError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| AppError::Cancelled)
    }

    /// Receiver of display updates
    pub fn updates(&self) -> Receiver<SearchUpdate> {
        self.update_rx.clone()
    }

    /// Wait for the next display update; `None` once the task has stopped
    pub async fn next_update(&self) -> Option<SearchUpdate> {
        self.update_rx.recv().await.ok()
    }

    /// Stop the task, dropping the pending timer and any in-flight search
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Search task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// State owned by the search task
struct SearchTask {
    source: Arc<dyn CandidateSource>,
    session: SearchSession,
    debouncer: Debouncer,
    update_tx: Sender<SearchUpdate>,
    /// Used to evict the oldest update when the queue is full
    update_rx: Receiver<SearchUpdate>,
    settle_tx: Sender<(u64, String)>,
    /// Bumped on every input and clear; only a settle carrying the
    /// current value is acted on
    input_seq: u64,
    result_tx: Sender<RemoteOutcome>,
    shutdown: CancellationToken,
    in_flight: Option<CancellationToken>,
}

async fn run_search(
    source: Arc<dyn CandidateSource>,
    config: SearchConfig,
    command_rx: Receiver<SearchCommand>,
    update_tx: Sender<SearchUpdate>,
    update_rx: Receiver<SearchUpdate>,
    shutdown: CancellationToken,
) {
    let (settle_tx, settle_rx) = async_channel::unbounded::<(u64, String)>();
    let (result_tx, result_rx) = async_channel::unbounded::<RemoteOutcome>();

    let mut session = SearchSession::new(config.city_filter, config.city_id);
    if !config.remote {
        session = session.local_only();
    }

    let kind = source.kind();
    let mut task = SearchTask {
        source,
        session,
        debouncer: Debouncer::new(config.debounce),
        update_tx,
        update_rx,
        settle_tx,
        input_seq: 0,
        result_tx,
        shutdown: shutdown.clone(),
        in_flight: None,
    };

    tracing::debug!("{} search started", kind);
    task.load().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            cmd = command_rx.recv() => {
                match cmd {
                    Ok(cmd) => task.handle_command(cmd).await,
                    Err(_) => break,
                }
            }
            Ok((seq, text)) = settle_rx.recv() => task.handle_settle(seq, text),
            Ok(outcome) = result_rx.recv() => task.handle_outcome(outcome),
        }
    }

    task.debouncer.cancel();
    task.abandon_in_flight();
    tracing::debug!("{} search stopped", kind);
}

impl SearchTask {
    async fn handle_command(&mut self, command: SearchCommand) {
        match command {
            SearchCommand::Input(text) => {
                self.input_seq += 1;
                let seq = self.input_seq;
                let settle_tx = self.settle_tx.clone();
                self.debouncer.schedule(text, move |settled| {
                    let _ = settle_tx.try_send((seq, settled));
                });
            }
            SearchCommand::Clear => {
                // A timer that already fired may have queued its settle
                self.input_seq += 1;
                self.debouncer.cancel();
                self.abandon_in_flight();
                self.session.clear();
                self.publish(None);
            }
            SearchCommand::Reload => self.load().await,
        }
    }

    async fn load(&mut self) {
        let source = self.source.clone();
        let result = tokio::select! {
            _ = self.shutdown.cancelled() => return,
            result = source.load() => result,
        };

        match result {
            Ok(candidates) => {
                tracing::info!("Loaded {} {} candidates", candidates.len(), source.kind());
                self.session.set_local(candidates);
                if !self.session.query().is_empty() {
                    self.publish(None);
                }
            }
            Err(e) => {
                tracing::warn!("Failed to load {} list: {}", source.kind(), e);
                self.publish(Some(format!(
                    "Could not load {} list: {}",
                    source.kind().label().to_lowercase(),
                    e
                )));
            }
        }
    }

    fn handle_settle(&mut self, seq: u64, text: String) {
        if seq != self.input_seq {
            tracing::debug!("Dropping superseded settle for {:?}", text);
            return;
        }
        self.abandon_in_flight();

        let request = self.session.settle(&text);
        self.publish(None);

        if let Some(request) = request {
            self.dispatch(request);
        }
    }

    fn dispatch(&mut self, request: RemoteRequest) {
        let RemoteRequest { generation, query } = request;
        let token = self.shutdown.child_token();
        self.in_flight = Some(token.clone());

        let source = self.source.clone();
        let result_tx = self.result_tx.clone();
        tracing::debug!("Searching {:?} (generation {})", query.name, generation);

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("Search generation {} abandoned", generation);
                    return;
                }
                result = source.search(&query) => result,
            };
            let _ = result_tx.send(RemoteOutcome { generation, result }).await;
        });
    }

    fn handle_outcome(&mut self, outcome: RemoteOutcome) {
        match self.session.apply_remote(outcome.generation, outcome.result) {
            RemoteApplied::Stale => {}
            RemoteApplied::Merged => {
                self.in_flight = None;
                self.publish(None);
            }
            RemoteApplied::Failed(e) => {
                self.in_flight = None;
                tracing::warn!("Search for {:?} failed: {}", self.session.query(), e);
                self.publish(Some(format!("Search failed: {}", e)));
            }
        }
    }

    fn abandon_in_flight(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }

    /// Queue a snapshot; when the receiver lags, the oldest update goes
    fn publish(&self, notice: Option<String>) {
        let mut update = self.session.snapshot(notice);
        loop {
            match self.update_tx.try_send(update) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    if self.update_rx.try_recv().is_ok() {
                        tracing::warn!("Oldest search update dropped, receiver is not keeping up");
                    }
                    update = rejected;
                }
                Err(TrySendError::Closed(_)) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchPhase;
    use crate::types::{CandidateKind, LocationQuery};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn locality(id: i64, name: &str) -> Candidate {
        Candidate::new(CandidateKind::Locality, id, name, "Delhi")
    }

    /// Source with per-query latency and canned results
    #[derive(Default)]
    struct ScriptedSource {
        local: Vec<Candidate>,
        fail_load: bool,
        delays: HashMap<String, Duration>,
        results: HashMap<String, Result<Vec<Candidate>, AppError>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn delhi() -> Self {
            Self {
                local: vec![
                    locality(1, "Sector 1"),
                    locality(4, "Delhi Cantt"),
                    locality(5, "Old Delhi"),
                ],
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CandidateSource for ScriptedSource {
        fn kind(&self) -> CandidateKind {
            CandidateKind::Locality
        }

        fn city_filter(&self) -> Option<&str> {
            Some("Delhi")
        }

        fn city_id(&self) -> Option<i64> {
            Some(3)
        }

        async fn load(&self) -> Result<Vec<Candidate>, AppError> {
            if self.fail_load {
                return Err(AppError::Network("offline".to_string()));
            }
            Ok(self.local.clone())
        }

        async fn search(&self, query: &LocationQuery) -> Result<Vec<Candidate>, AppError> {
            self.calls.lock().unwrap().push(query.name.clone());
            if let Some(delay) = self.delays.get(&query.name) {
                tokio::time::sleep(*delay).await;
            }
            self.results
                .get(&query.name)
                .cloned()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn controller(source: &Arc<ScriptedSource>, debounce_ms: u64) -> SearchController {
        let config = SearchConfig::for_source(source.as_ref(), Duration::from_millis(debounce_ms));
        SearchController::spawn(source.clone(), config)
    }

    fn drain(controller: &SearchController) -> Vec<SearchUpdate> {
        let updates = controller.updates();
        let mut drained = Vec::new();
        while let Ok(update) = updates.try_recv() {
            drained.push(update);
        }
        drained
    }

    async fn pause(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystroke_burst_sends_one_search() {
        let source = Arc::new(ScriptedSource::delhi());
        let search = controller(&source, 300);

        for text in ["d", "de", "del", "delh", "delhi"] {
            search.input(text).await.unwrap();
            pause(50).await;
        }
        pause(1000).await;

        assert_eq!(source.calls(), vec!["delhi".to_string()]);

        let updates = drain(&search);
        let last = updates.last().unwrap();
        assert_eq!(last.query, "delhi");
        assert_eq!(last.phase, SearchPhase::Merged);
        let ids: Vec<i64> = last.candidates.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_result_shown_before_remote() {
        let mut source = ScriptedSource::delhi();
        source
            .delays
            .insert("sector".to_string(), Duration::from_millis(500));
        source.results.insert(
            "sector".to_string(),
            Ok(vec![
                Candidate::new(CandidateKind::Locality, 1, "Sector 1 Extension", "Delhi"),
                locality(2, "Sector 2"),
            ]),
        );
        let source = Arc::new(source);
        let search = controller(&source, 100);

        search.input("sector").await.unwrap();
        pause(200).await;

        let first = search.next_update().await.unwrap();
        assert_eq!(first.phase, SearchPhase::AwaitingRemote);
        assert_eq!(first.candidates, vec![locality(1, "Sector 1")]);

        let merged = search.next_update().await.unwrap();
        assert_eq!(merged.phase, SearchPhase::Merged);
        let names: Vec<&str> = merged.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Sector 1", "Sector 2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_superseded_search_never_shows() {
        let mut source = ScriptedSource::delhi();
        source
            .delays
            .insert("del".to_string(), Duration::from_millis(800));
        source
            .delays
            .insert("delh".to_string(), Duration::from_millis(50));
        source
            .results
            .insert("del".to_string(), Ok(vec![locality(8, "Model Town")]));
        source
            .results
            .insert("delh".to_string(), Ok(vec![locality(9, "Delhi Gate")]));
        let source = Arc::new(source);
        let search = controller(&source, 100);

        search.input("del").await.unwrap();
        pause(150).await;
        search.input("delh").await.unwrap();
        pause(2000).await;

        assert_eq!(source.calls(), vec!["del".to_string(), "delh".to_string()]);

        let updates = drain(&search);
        assert!(updates
            .iter()
            .all(|update| update.candidates.iter().all(|c| c.id != 8)));
        let last = updates.last().unwrap();
        assert_eq!(last.query, "delh");
        let ids: Vec<i64> = last.candidates.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![4, 5, 9]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_search_falls_back_with_notice() {
        let mut source = ScriptedSource::delhi();
        source.results.insert(
            "old".to_string(),
            Err(AppError::Network("connection reset".to_string())),
        );
        let source = Arc::new(source);
        let search = controller(&source, 100);

        search.input("old").await.unwrap();
        pause(500).await;

        let last = drain(&search).pop().unwrap();
        assert_eq!(last.phase, SearchPhase::Error);
        assert_eq!(last.candidates, vec![locality(5, "Old Delhi")]);
        assert!(last.notice.unwrap().contains("connection reset"));

        // Typing again recovers
        search.input("sector").await.unwrap();
        pause(500).await;
        let last = drain(&search).pop().unwrap();
        assert_eq!(last.phase, SearchPhase::Merged);
        assert!(last.notice.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_remote_shows_local_filter() {
        let source = Arc::new(ScriptedSource::delhi());
        let search = controller(&source, 100);

        search.input("xyz").await.unwrap();
        pause(500).await;

        let last = drain(&search).pop().unwrap();
        assert_eq!(last.phase, SearchPhase::Merged);
        assert!(last.candidates.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_pending_search() {
        let source = Arc::new(ScriptedSource::delhi());
        let search = controller(&source, 300);

        search.input("sec").await.unwrap();
        pause(100).await;
        search.clear().await.unwrap();
        pause(1000).await;

        assert!(source.calls().is_empty());
        let last = drain(&search).pop().unwrap();
        assert_eq!(last.phase, SearchPhase::Idle);
        assert!(last.candidates.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_abandons_in_flight_search() {
        let mut source = ScriptedSource::delhi();
        source
            .delays
            .insert("sector".to_string(), Duration::from_millis(500));
        source
            .results
            .insert("sector".to_string(), Ok(vec![locality(2, "Sector 2")]));
        let source = Arc::new(source);
        let search = controller(&source, 100);

        search.input("sector").await.unwrap();
        pause(200).await;
        search.clear().await.unwrap();
        pause(1000).await;

        assert_eq!(source.calls(), vec!["sector".to_string()]);
        let last = drain(&search).pop().unwrap();
        assert_eq!(last.phase, SearchPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_at_settle_instant_ends_idle() {
        for _ in 0..50 {
            let source = Arc::new(ScriptedSource::delhi());
            let search = controller(&source, 300);

            search.input("sec").await.unwrap();
            pause(300).await;
            search.clear().await.unwrap();
            pause(1000).await;

            let last = drain(&search).pop().unwrap();
            assert_eq!(last.phase, SearchPhase::Idle);
            assert!(last.candidates.is_empty());
            search.shutdown().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_settle_of_replaced_input_is_dropped() {
        let mut source = ScriptedSource::delhi();
        source
            .delays
            .insert("del".to_string(), Duration::from_millis(50));
        let source = Arc::new(source);
        let search = controller(&source, 100);

        search.input("sec").await.unwrap();
        pause(100).await;
        search.input("del").await.unwrap();
        pause(500).await;

        // "sec" may have been searched before "del" arrived, never after it
        let calls = source.calls();
        assert_eq!(calls.last().map(String::as_str), Some("del"));
        let last = drain(&search).pop().unwrap();
        assert_eq!(last.query, "del");
        assert_eq!(last.phase, SearchPhase::Merged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lagging_receiver_still_gets_latest_query() {
        let source = Arc::new(ScriptedSource::delhi());
        let search = controller(&source, 100);

        for i in 0..40 {
            search.input(format!("q{}", i)).await.unwrap();
            pause(200).await;
        }
        search.input("final").await.unwrap();
        pause(200).await;

        let updates = drain(&search);
        assert_eq!(updates.len(), UPDATE_QUEUE);
        let last = updates.last().unwrap();
        assert_eq!(last.query, "final");
        assert_eq!(last.phase, SearchPhase::Merged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_controller_stops_timer() {
        let source = Arc::new(ScriptedSource::delhi());
        let search = controller(&source, 300);

        search.input("delhi").await.unwrap();
        pause(10).await;
        drop(search);
        pause(1000).await;

        assert!(source.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_updates() {
        let source = Arc::new(ScriptedSource::delhi());
        let search = controller(&source, 100);
        let updates = search.updates();

        search.shutdown().await;
        assert!(updates.recv().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_failure_is_reported() {
        let source = Arc::new(ScriptedSource {
            fail_load: true,
            ..ScriptedSource::default()
        });
        let search = controller(&source, 100);

        let update = search.next_update().await.unwrap();
        assert_eq!(update.phase, SearchPhase::Idle);
        assert!(update.notice.unwrap().contains("locality list"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_only_config_skips_remote() {
        let source = Arc::new(ScriptedSource::delhi());
        let config = SearchConfig {
            remote: false,
            ..SearchConfig::for_source(source.as_ref(), Duration::from_millis(100))
        };
        let search = SearchController::spawn(source.clone(), config);

        search.input("delhi").await.unwrap();
        pause(500).await;

        assert!(source.calls().is_empty());
        let last = drain(&search).pop().unwrap();
        assert_eq!(last.phase, SearchPhase::Filtering);
        assert_eq!(last.candidates.len(), 2);
    }
}
