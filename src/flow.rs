//! Staged walkthrough of the embed, store and search pipeline.
//!
//! A [`Walkthrough`] owns the session's [`VectorStore`] and a [`FlowStep`]
//! state. Submitting a document or a query does all the computation up
//! front and returns a [`Timeline`]: a list of events, each at an offset
//! from the start of the flow. [`Walkthrough::play`] then replays the
//! timeline on tokio's timer, applying every event to the session and
//! handing it to a [`FlowObserver`] for narration.
//!
//! Only one flow runs at a time. A submission while another flow is in
//! progress is rejected with [`FlowError::Busy`].

use crate::config::Config;
use crate::ranker::{cosine_similarity, ScoredItem};
use crate::store::{StoreError, StoredItem, VectorStore};
use crate::vector::{generate, Vector};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

// Offsets in milliseconds from the start of a flow
const TOKENIZE_AT: u64 = 500;
const EMBED_AT: u64 = 2500;
const DOCUMENT_VECTOR_AT: u64 = 4500;
const STORING_AT: u64 = 5000;
const STORED_AT: u64 = 6000;
const QUERY_VECTOR_AT: u64 = 4000;
const SEARCH_START_AT: u64 = 5000;
const COMPARE_INTERVAL: u64 = 1200;
const RANKING_DELAY: u64 = 1500;
const RESULTS_HOLD: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowStep {
    Idle,
    // document flow
    InputEntered,
    TokenizingInput,
    EmbeddingInput,
    StoringVector,
    // query flow
    QueryEntered,
    TokenizingQuery,
    EmbeddingQuery,
    SearchingStart,
    SearchingCompare,
    SearchingDone,
    ShowingResults,
}

impl FlowStep {
    /// The sentence shown to the user while this step is active
    pub fn narration(self) -> &'static str {
        match self {
            FlowStep::Idle => "Add a document to begin. The system is ready.",
            FlowStep::InputEntered => "A new document has been submitted.",
            FlowStep::TokenizingInput => "First, the raw text is broken down into smaller units called 'tokens'. This helps the model understand the content.",
            FlowStep::EmbeddingInput => "The tokens are fed into an embedding model, which converts their semantic meaning into a numerical vector.",
            FlowStep::StoringVector => "This new vector is stored and indexed in the database, ready to be searched.",
            FlowStep::QueryEntered => "A search query has been entered.",
            FlowStep::TokenizingQuery => "Like a document, the query text is also tokenized before being converted into a vector.",
            FlowStep::EmbeddingQuery => "The query tokens are now being converted into a query vector. The goal is to represent the query's intent in the same vector space.",
            FlowStep::SearchingStart => "The search begins. The query vector will be compared against every vector in the database.",
            FlowStep::SearchingCompare => "Calculating similarity (e.g., Cosine Similarity) between the query vector and a database vector.",
            FlowStep::SearchingDone => "All vectors have been compared. Now ranking the results based on their similarity scores.",
            FlowStep::ShowingResults => "The top results are retrieved and displayed. The higher the score, the closer the match.",
        }
    }

    pub fn is_idle(self) -> bool {
        self == FlowStep::Idle
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    Step(FlowStep),
    Tokens(Vec<String>),
    VectorReady(Vector),
    Stored(StoredItem),
    Comparing { id: u64, similarity: f64 },
    Results(Vec<ScoredItem>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub at: Duration,
    pub event: FlowEvent,
}

/// Events of one flow, ordered by offset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    cues: Vec<Cue>,
}

impl Timeline {
    fn push(&mut self, at_ms: u64, event: FlowEvent) {
        debug_assert!(self.cues.last().is_none_or(|last| last.at <= Duration::from_millis(at_ms)));
        self.cues.push(Cue { at: Duration::from_millis(at_ms), event });
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// Offset of the last cue
    pub fn duration(&self) -> Duration {
        self.cues.last().map(|cue| cue.at).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

impl IntoIterator for Timeline {
    type Item = Cue;
    type IntoIter = std::vec::IntoIter<Cue>;

    fn into_iter(self) -> Self::IntoIter {
        self.cues.into_iter()
    }
}

/// Multiplier applied to every timeline offset during playback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing(f64);

impl Pacing {
    pub const INSTANT: Pacing = Pacing(0.0);
    pub const REAL_TIME: Pacing = Pacing(1.0);

    /// `None` unless `factor` is finite and not negative
    pub fn new(factor: f64) -> Option<Pacing> {
        // adding 0.0 turns -0.0 into 0.0
        (factor.is_finite() && factor >= 0.0).then_some(Pacing(factor + 0.0))
    }

    pub fn factor(self) -> f64 {
        self.0
    }

    pub fn scale(self, offset: Duration) -> Duration {
        offset.mul_f64(self.0)
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing::REAL_TIME
    }
}

/// Receives every event as it is played
pub trait FlowObserver {
    fn on_event(&mut self, event: &FlowEvent);
}

impl FlowObserver for Vec<FlowEvent> {
    fn on_event(&mut self, event: &FlowEvent) {
        self.push(event.clone());
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("another walkthrough is still running (at {0:?})")]
    Busy(FlowStep),
    #[error("text is empty")]
    EmptyText,
    #[error("no documents stored yet, add one first")]
    NoDocuments,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Splits text the way the tokenizing step displays it
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

#[derive(Debug)]
pub struct Walkthrough {
    store: VectorStore,
    step: FlowStep,
    top_k: usize,
    pacing: Pacing,
}

impl Walkthrough {
    pub fn new(top_k: usize, pacing: Pacing) -> Walkthrough {
        Walkthrough {
            store: VectorStore::new(),
            step: FlowStep::Idle,
            top_k,
            pacing,
        }
    }

    pub fn from_config(config: &Config) -> Walkthrough {
        Walkthrough::new(config.top_k, config.pacing)
    }

    pub fn step(&self) -> FlowStep {
        self.step
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    pub fn set_pacing(&mut self, pacing: Pacing) {
        self.pacing = pacing;
    }

    /// Starts the document flow for `text`.
    ///
    /// The vector is generated once, here, and the same vector is both
    /// previewed and stored when the timeline is played.
    ///
    /// # Returns
    ///
    /// * `Ok(Timeline)` - Events to hand to [`play`](Walkthrough::play)
    /// * `Err(FlowError::Busy)` - Another flow has not finished
    /// * `Err(FlowError::EmptyText)` - `text` is blank
    ///
    /// # Examples
    ///
    /// ```
    /// use vecviz::flow::{FlowError, FlowStep, Pacing, Walkthrough};
    ///
    /// let mut walkthrough = Walkthrough::new(3, Pacing::INSTANT);
    /// let timeline = walkthrough.submit_document("The cat sat on the mat").unwrap();
    /// assert_eq!(walkthrough.step(), FlowStep::InputEntered);
    /// assert_eq!(timeline.duration().as_millis(), 6000);
    ///
    /// // the first flow has not been played yet
    /// assert!(matches!(walkthrough.submit_document("another"), Err(FlowError::Busy(_))));
    /// ```
    pub fn submit_document(&mut self, text: &str) -> Result<Timeline, FlowError> {
        self.ensure_idle()?;
        if text.trim().is_empty() {
            return Err(FlowError::EmptyText);
        }

        let item = self.store.prepare(text);
        let mut timeline = Timeline::default();
        timeline.push(0, FlowEvent::Step(FlowStep::InputEntered));
        timeline.push(TOKENIZE_AT, FlowEvent::Step(FlowStep::TokenizingInput));
        timeline.push(TOKENIZE_AT, FlowEvent::Tokens(tokenize(text)));
        timeline.push(EMBED_AT, FlowEvent::Step(FlowStep::EmbeddingInput));
        timeline.push(DOCUMENT_VECTOR_AT, FlowEvent::VectorReady(item.vector().to_vec()));
        timeline.push(STORING_AT, FlowEvent::Step(FlowStep::StoringVector));
        timeline.push(STORED_AT, FlowEvent::Stored(item));
        timeline.push(STORED_AT, FlowEvent::Step(FlowStep::Idle));

        info!("document flow started ({} chars)", text.len());
        self.step = FlowStep::InputEntered;
        Ok(timeline)
    }

    /// Starts the query flow for `text`, returning at most `k` results
    /// (the walkthrough's default when `None`).
    ///
    /// Every stored item is compared once, in insertion order, and the
    /// ranking is computed before playback starts.
    pub fn submit_query(&mut self, text: &str, k: Option<usize>) -> Result<Timeline, FlowError> {
        self.ensure_idle()?;
        if text.trim().is_empty() {
            return Err(FlowError::EmptyText);
        }
        if self.store.is_empty() {
            return Err(FlowError::NoDocuments);
        }

        let k = k.unwrap_or(self.top_k);
        let query = generate(text);

        let mut timeline = Timeline::default();
        timeline.push(0, FlowEvent::Step(FlowStep::QueryEntered));
        timeline.push(TOKENIZE_AT, FlowEvent::Step(FlowStep::TokenizingQuery));
        timeline.push(TOKENIZE_AT, FlowEvent::Tokens(tokenize(text)));
        timeline.push(EMBED_AT, FlowEvent::Step(FlowStep::EmbeddingQuery));
        timeline.push(QUERY_VECTOR_AT, FlowEvent::VectorReady(query.clone()));
        timeline.push(SEARCH_START_AT, FlowEvent::Step(FlowStep::SearchingStart));

        let mut at = SEARCH_START_AT;
        for item in self.store.items() {
            let similarity = cosine_similarity(&query, item.vector());
            timeline.push(at, FlowEvent::Comparing { id: item.id(), similarity });
            timeline.push(at, FlowEvent::Step(FlowStep::SearchingCompare));
            at = at.saturating_add(COMPARE_INTERVAL);
        }

        timeline.push(at, FlowEvent::Step(FlowStep::SearchingDone));
        at = at.saturating_add(RANKING_DELAY);
        timeline.push(at, FlowEvent::Step(FlowStep::ShowingResults));
        timeline.push(at, FlowEvent::Results(self.store.rank(&query, k)));
        at = at.saturating_add(RESULTS_HOLD);
        timeline.push(at, FlowEvent::Step(FlowStep::Idle));

        info!("query flow started over {} items, k = {}", self.store.count(), k);
        self.step = FlowStep::QueryEntered;
        Ok(timeline)
    }

    /// Plays `timeline` in real time, scaled by the current pacing.
    ///
    /// Each cue waits until its offset, is applied to the session, then
    /// goes to `observer`. On error the walkthrough returns to idle.
    pub async fn play<O>(&mut self, timeline: Timeline, observer: &mut O) -> Result<(), FlowError>
    where
        O: FlowObserver + ?Sized,
    {
        let start = Instant::now();
        for cue in timeline {
            sleep_until(start + self.pacing.scale(cue.at)).await;
            if let Err(err) = self.apply(&cue.event) {
                warn!("walkthrough aborted: {}", err);
                self.step = FlowStep::Idle;
                return Err(err);
            }
            observer.on_event(&cue.event);
        }

        Ok(())
    }

    /// Drops a submitted flow that will not be played.
    pub fn cancel(&mut self) {
        if !self.step.is_idle() {
            debug!("cancelling flow at {:?}", self.step);
        }
        self.step = FlowStep::Idle;
    }

    fn apply(&mut self, event: &FlowEvent) -> Result<(), FlowError> {
        match event {
            FlowEvent::Step(step) => {
                debug!("step {:?} -> {:?}", self.step, step);
                self.step = *step;
            }
            FlowEvent::Stored(item) => {
                self.store.commit(item.clone())?;
            }
            _ => {}
        }
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), FlowError> {
        if self.step.is_idle() {
            Ok(())
        } else {
            Err(FlowError::Busy(self.step))
        }
    }
}

#[cfg(test)]
mod flow_test {
    use super::*;

    fn offsets(timeline: &Timeline) -> Vec<(u64, FlowStep)> {
        timeline
            .cues()
            .iter()
            .filter_map(|cue| match cue.event {
                FlowEvent::Step(step) => Some((cue.at.as_millis() as u64, step)),
                _ => None,
            })
            .collect()
    }

    fn steps(events: &[FlowEvent]) -> Vec<FlowStep> {
        events
            .iter()
            .filter_map(|event| match event {
                FlowEvent::Step(step) => Some(*step),
                _ => None,
            })
            .collect()
    }

    fn assert_elapsed(start: Instant, ms: u64) {
        let elapsed = start.elapsed();
        let expected = Duration::from_millis(ms);
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(5),
            "elapsed {:?}, expected {:?}",
            elapsed,
            expected
        );
    }

    async fn ingest(walkthrough: &mut Walkthrough, text: &str) {
        let timeline = walkthrough.submit_document(text).unwrap();
        walkthrough.play(timeline, &mut Vec::<FlowEvent>::new()).await.unwrap();
    }

    // ========== Narration Tests ==========

    #[test]
    fn test_every_step_has_narration() {
        let all = [
            FlowStep::Idle,
            FlowStep::InputEntered,
            FlowStep::TokenizingInput,
            FlowStep::EmbeddingInput,
            FlowStep::StoringVector,
            FlowStep::QueryEntered,
            FlowStep::TokenizingQuery,
            FlowStep::EmbeddingQuery,
            FlowStep::SearchingStart,
            FlowStep::SearchingCompare,
            FlowStep::SearchingDone,
            FlowStep::ShowingResults,
        ];
        for step in all {
            assert!(!step.narration().is_empty());
        }
        assert!(FlowStep::Idle.narration().contains("ready"));
    }

    #[test]
    fn test_tokenize_collapses_whitespace() {
        assert_eq!(tokenize("  the  quick\tbrown\nfox "), vec!["the", "quick", "brown", "fox"]);
        assert!(tokenize("   ").is_empty());
    }

    // ========== Pacing Tests ==========

    #[test]
    fn test_pacing_rejects_bad_factors() {
        assert!(Pacing::new(-1.0).is_none());
        assert!(Pacing::new(f64::NAN).is_none());
        assert!(Pacing::new(f64::INFINITY).is_none());
        assert_eq!(Pacing::new(-0.0), Some(Pacing::INSTANT));
    }

    #[test]
    fn test_pacing_scales_offsets() {
        let half = Pacing::new(0.5).unwrap();
        assert_eq!(half.scale(Duration::from_millis(6000)), Duration::from_millis(3000));
        assert_eq!(Pacing::INSTANT.scale(Duration::from_millis(6000)), Duration::ZERO);
    }

    // ========== Document Flow Tests ==========

    #[test]
    fn test_document_timeline_offsets() {
        let mut walkthrough = Walkthrough::new(3, Pacing::INSTANT);
        let timeline = walkthrough.submit_document("hello world").unwrap();

        assert_eq!(
            offsets(&timeline),
            vec![
                (0, FlowStep::InputEntered),
                (500, FlowStep::TokenizingInput),
                (2500, FlowStep::EmbeddingInput),
                (5000, FlowStep::StoringVector),
                (6000, FlowStep::Idle),
            ]
        );
    }

    #[test]
    fn test_document_timeline_reuses_one_vector() {
        let mut walkthrough = Walkthrough::new(3, Pacing::INSTANT);
        let timeline = walkthrough.submit_document("hello world").unwrap();

        let preview = timeline.cues().iter().find_map(|cue| match &cue.event {
            FlowEvent::VectorReady(v) => Some((cue.at, v.clone())),
            _ => None,
        });
        let stored = timeline.cues().iter().find_map(|cue| match &cue.event {
            FlowEvent::Stored(item) => Some(item.clone()),
            _ => None,
        });

        let (at, preview) = preview.unwrap();
        assert_eq!(at, Duration::from_millis(4500));
        assert_eq!(stored.unwrap().vector(), preview.as_slice());
        assert_eq!(preview, generate("hello world"));
    }

    #[test]
    fn test_document_rejects_blank_text() {
        let mut walkthrough = Walkthrough::new(3, Pacing::INSTANT);
        assert_eq!(walkthrough.submit_document("  \n").unwrap_err(), FlowError::EmptyText);
        assert!(walkthrough.step().is_idle());
    }

    #[test]
    fn test_submit_while_busy() {
        let mut walkthrough = Walkthrough::new(3, Pacing::INSTANT);
        walkthrough.submit_document("first").unwrap();

        assert_eq!(
            walkthrough.submit_document("second").unwrap_err(),
            FlowError::Busy(FlowStep::InputEntered)
        );
        assert_eq!(
            walkthrough.submit_query("first", None).unwrap_err(),
            FlowError::Busy(FlowStep::InputEntered)
        );
    }

    #[test]
    fn test_cancel_returns_to_idle_without_storing() {
        let mut walkthrough = Walkthrough::new(3, Pacing::INSTANT);
        walkthrough.submit_document("first").unwrap();

        walkthrough.cancel();

        assert!(walkthrough.step().is_idle());
        assert!(walkthrough.store().is_empty());
        assert!(walkthrough.submit_document("second").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_document_flow_stores_item() {
        let mut walkthrough = Walkthrough::new(3, Pacing::REAL_TIME);
        let timeline = walkthrough.submit_document("The cat sat on the mat").unwrap();
        let mut events = Vec::new();

        let start = Instant::now();
        walkthrough.play(timeline, &mut events).await.unwrap();

        assert_elapsed(start, 6000);
        assert!(walkthrough.step().is_idle());
        assert_eq!(walkthrough.store().count(), 1);
        assert_eq!(walkthrough.store().get(1).unwrap().text(), "The cat sat on the mat");
        assert_eq!(
            steps(&events),
            vec![
                FlowStep::InputEntered,
                FlowStep::TokenizingInput,
                FlowStep::EmbeddingInput,
                FlowStep::StoringVector,
                FlowStep::Idle,
            ]
        );
        assert!(events.contains(&FlowEvent::Tokens(tokenize("The cat sat on the mat"))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_with_fast_pacing() {
        let mut walkthrough = Walkthrough::new(3, Pacing::new(0.5).unwrap());
        let timeline = walkthrough.submit_document("quick").unwrap();

        let start = Instant::now();
        walkthrough.play(timeline, &mut Vec::<FlowEvent>::new()).await.unwrap();

        assert_elapsed(start, 3000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_stale_timeline_aborts() {
        let mut walkthrough = Walkthrough::new(3, Pacing::INSTANT);
        let stale = walkthrough.submit_document("first").unwrap();
        walkthrough.cancel();
        ingest(&mut walkthrough, "second").await;

        let result = walkthrough.play(stale, &mut Vec::<FlowEvent>::new()).await;

        assert_eq!(
            result,
            Err(FlowError::Store(StoreError::StaleId { expected: 2, got: 1 }))
        );
        assert!(walkthrough.step().is_idle());
        assert_eq!(walkthrough.store().count(), 1);
    }

    // ========== Query Flow Tests ==========

    #[test]
    fn test_query_without_documents() {
        let mut walkthrough = Walkthrough::new(3, Pacing::INSTANT);
        assert_eq!(
            walkthrough.submit_query("anything", None).unwrap_err(),
            FlowError::NoDocuments
        );
        assert!(walkthrough.step().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_rejects_blank_text() {
        let mut walkthrough = Walkthrough::new(3, Pacing::INSTANT);
        ingest(&mut walkthrough, "doc").await;

        assert_eq!(walkthrough.submit_query(" ", None).unwrap_err(), FlowError::EmptyText);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_timeline_offsets() {
        let mut walkthrough = Walkthrough::new(3, Pacing::INSTANT);
        ingest(&mut walkthrough, "one").await;
        ingest(&mut walkthrough, "two").await;

        let timeline = walkthrough.submit_query("one", None).unwrap();

        assert_eq!(
            offsets(&timeline),
            vec![
                (0, FlowStep::QueryEntered),
                (500, FlowStep::TokenizingQuery),
                (2500, FlowStep::EmbeddingQuery),
                (5000, FlowStep::SearchingStart),
                (5000, FlowStep::SearchingCompare),
                (6200, FlowStep::SearchingCompare),
                (7400, FlowStep::SearchingDone),
                (8900, FlowStep::ShowingResults),
                (11900, FlowStep::Idle),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_compares_every_item_in_order() {
        let mut walkthrough = Walkthrough::new(3, Pacing::INSTANT);
        for text in ["alpha", "beta", "gamma", "delta"] {
            ingest(&mut walkthrough, text).await;
        }

        let timeline = walkthrough.submit_query("beta", None).unwrap();
        let compared: Vec<u64> = timeline
            .cues()
            .iter()
            .filter_map(|cue| match cue.event {
                FlowEvent::Comparing { id, .. } => Some(id),
                _ => None,
            })
            .collect();

        assert_eq!(compared, vec![1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_query_flow_returns_top_k() {
        let mut walkthrough = Walkthrough::new(3, Pacing::REAL_TIME);
        for text in ["alpha", "beta", "gamma", "delta"] {
            ingest(&mut walkthrough, text).await;
        }

        let timeline = walkthrough.submit_query("Gamma", None).unwrap();
        let mut events = Vec::new();
        let start = Instant::now();
        walkthrough.play(timeline, &mut events).await.unwrap();

        // 5000 + 4 * 1200 + 1500 + 3000
        assert_elapsed(start, 14300);
        assert!(walkthrough.step().is_idle());

        let results = events
            .iter()
            .find_map(|event| match event {
                FlowEvent::Results(results) => Some(results.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].item.text(), "gamma");
        assert!((results[0].similarity - 1.0).abs() < 1e-9);
        assert_eq!(results, walkthrough.store().search("gamma", 3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_k_override() {
        let mut walkthrough = Walkthrough::new(3, Pacing::INSTANT);
        for text in ["alpha", "beta", "gamma", "delta"] {
            ingest(&mut walkthrough, text).await;
        }

        let mut events = Vec::new();
        let timeline = walkthrough.submit_query("alpha", Some(0)).unwrap();
        walkthrough.play(timeline, &mut events).await.unwrap();

        assert!(events.contains(&FlowEvent::Results(Vec::new())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_leaves_store_untouched() {
        let mut walkthrough = Walkthrough::new(3, Pacing::INSTANT);
        ingest(&mut walkthrough, "alpha").await;
        let before = walkthrough.store().items().to_vec();

        let timeline = walkthrough.submit_query("alpha", None).unwrap();
        walkthrough.play(timeline, &mut Vec::<FlowEvent>::new()).await.unwrap();

        assert_eq!(walkthrough.store().items(), before.as_slice());
    }
}
