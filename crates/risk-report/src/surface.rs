//! Report Surface
//!
//! Owns the run state machine and the committed report:
//!
//! ```text
//! Idle ─▶ Resolving ─┬─▶ NotConnected
//!                    └─▶ Enriching ─┬─▶ AggregateReady        (no holdings)
//!                                   └─▶ Scoring ─┬─▶ Scored ─▶ AggregateReady
//!                                                └─▶ ScoringFailed
//! ```
//!
//! Every trigger gets a fresh `RunId`. A commit only lands if its run is still
//! the latest one, so a slow run can never overwrite a newer one. A run whose
//! `generate` future is dropped before it finishes is abandoned: it releases
//! the in-flight slot and the surface returns to `Idle`.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::aggregate::{TierThresholds, aggregate_with};
use crate::enricher::PriceEnricher;
use crate::model::{AggregateReport, EnrichedHolding, WalletState};
use crate::report::ReportSnapshot;
use crate::resolver::HoldingsResolver;
use crate::scoring::{RiskScorer, ScoreScale};

/// Monotonically increasing run identifier
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RunId(pub u64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum RunState {
    #[default]
    Idle,
    Resolving,
    NotConnected,
    Enriching,
    Scoring,
    Scored,
    ScoringFailed { message: String },
    AggregateReady,
}

impl RunState {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Resolving => "Resolving",
            Self::NotConnected => "NotConnected",
            Self::Enriching => "Enriching",
            Self::Scoring => "Scoring",
            Self::Scored => "Scored",
            Self::ScoringFailed { .. } => "ScoringFailed",
            Self::AggregateReady => "AggregateReady",
        }
    }

    /// Run finished (successfully or not)
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::ScoringFailed { .. } | Self::AggregateReady
        )
    }

    /// A run is between trigger and terminal state
    pub const fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Resolving | Self::Enriching | Self::Scoring | Self::Scored
        )
    }

    /// Legal edges of the run state machine. Any state may restart a run
    /// (`Resolving`) or be reset (`Idle`).
    pub const fn can_transition_to(&self, next: &Self) -> bool {
        match (self, next) {
            (_, Self::Resolving | Self::Idle)
            | (Self::Resolving, Self::NotConnected | Self::Enriching)
            | (Self::Enriching, Self::Scoring | Self::AggregateReady)
            | (Self::Scoring, Self::Scored | Self::ScoringFailed { .. })
            | (Self::Scored, Self::AggregateReady) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one `generate` call
#[derive(Clone, Debug)]
pub enum RunOutcome {
    /// The run committed a fresh report
    Ready(Arc<ReportSnapshot>),
    /// Wallet disconnected; nothing was fetched
    NotConnected,
    /// Scoring failed; no report was committed
    ScoringFailed { run: RunId, message: String },
    /// A newer run or a reset replaced this one; its results were discarded
    Superseded(RunId),
    /// An identical run is already in flight
    Ignored { in_flight: RunId },
}

/// Serializable view of the surface
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceStatus {
    pub run_id: RunId,
    #[serde(flatten)]
    pub state: RunState,
    pub report: Option<Arc<ReportSnapshot>>,
    pub last_ready_report: Option<Arc<ReportSnapshot>>,
}

/// Resolver, enricher and scorer wired together
pub struct ReportPipeline {
    pub resolver: HoldingsResolver,
    pub enricher: PriceEnricher,
    pub scorer: Arc<dyn RiskScorer>,
    /// Rating scale of `scorer`
    pub scale: ScoreScale,
    pub thresholds: TierThresholds,
}

impl ReportPipeline {
    /// Thresholds are derived from the scorer's scale
    pub fn new(enricher: PriceEnricher, scorer: Arc<dyn RiskScorer>) -> Self {
        let scale = scorer.scale();
        Self {
            resolver: HoldingsResolver::default(),
            enricher,
            scorer,
            scale,
            thresholds: TierThresholds::for_scale(scale),
        }
    }

    fn snapshot(&self, run: RunId, holdings: Vec<EnrichedHolding>, report: AggregateReport) -> ReportSnapshot {
        ReportSnapshot::new(run, holdings, report).with_grading(self.scale, self.thresholds)
    }
}

#[derive(Default)]
struct SurfaceInner {
    latest: u64,
    state: RunState,
    in_flight: Option<(RunId, WalletState)>,
    trace: Vec<RunState>,
    current: Option<Arc<ReportSnapshot>>,
    last_ready: Option<Arc<ReportSnapshot>>,
}

impl SurfaceInner {
    /// Release `run` if it is still the in-flight run
    fn abandon(&mut self, run: RunId) {
        if !matches!(&self.in_flight, Some((id, _)) if *id == run) {
            return;
        }
        self.in_flight = None;
        if self.latest == run.0 {
            self.state = RunState::Idle;
            self.trace.clear();
            self.current = None;
        }
        tracing::debug!(%run, "Abandoned report run released");
    }
}

/// Abandons its run when dropped while still armed
struct RunGuard {
    inner: Arc<RwLock<SurfaceInner>>,
    run: RunId,
    armed: bool,
}

impl RunGuard {
    fn new(inner: &Arc<RwLock<SurfaceInner>>, run: RunId) -> Self {
        Self {
            inner: inner.clone(),
            run,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let run = self.run;
        if let Ok(mut inner) = self.inner.try_write() {
            inner.abandon(run);
            return;
        }
        // Lock is busy; finish the release on the runtime
        let inner = self.inner.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { inner.write().await.abandon(run) });
            }
            Err(_) => tracing::warn!(%run, "No runtime to release abandoned report run"),
        }
    }
}

pub struct ReportSurface {
    pipeline: ReportPipeline,
    inner: Arc<RwLock<SurfaceInner>>,
}

impl ReportSurface {
    pub fn new(pipeline: ReportPipeline) -> Self {
        Self {
            pipeline,
            inner: Arc::new(RwLock::new(SurfaceInner::default())),
        }
    }

    pub async fn state(&self) -> RunState {
        self.inner.read().await.state.clone()
    }

    pub async fn latest_run(&self) -> RunId {
        RunId(self.inner.read().await.latest)
    }

    /// Report committed by the latest run, if it reached `AggregateReady`
    pub async fn report(&self) -> Option<Arc<ReportSnapshot>> {
        self.inner.read().await.current.clone()
    }

    /// Most recent successful report, kept across later failed runs
    pub async fn last_ready_report(&self) -> Option<Arc<ReportSnapshot>> {
        self.inner.read().await.last_ready.clone()
    }

    /// States visited by the latest run, in order
    pub async fn trace(&self) -> Vec<RunState> {
        self.inner.read().await.trace.clone()
    }

    pub async fn status(&self) -> SurfaceStatus {
        let inner = self.inner.read().await;
        SurfaceStatus {
            run_id: RunId(inner.latest),
            state: inner.state.clone(),
            report: inner.current.clone(),
            last_ready_report: inner.last_ready.clone(),
        }
    }

    /// Back to `Idle`; any in-flight run is invalidated
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        inner.latest += 1;
        inner.state = RunState::Idle;
        inner.in_flight = None;
        inner.trace.clear();
        inner.current = None;
        inner.last_ready = None;
        tracing::debug!(run_id = inner.latest, "Report surface reset");
    }

    /// Run the whole pipeline for `wallet` and commit the result.
    ///
    /// Dropping the returned future before it completes abandons the run.
    pub async fn generate(&self, wallet: WalletState) -> RunOutcome {
        let run = match self.begin(&wallet).await {
            Ok(run) => run,
            Err(in_flight) => {
                tracing::debug!(%in_flight, "Ignoring duplicate report trigger");
                return RunOutcome::Ignored { in_flight };
            }
        };

        let guard = RunGuard::new(&self.inner, run);
        let outcome = self.execute(run, &wallet).await;
        guard.disarm();
        outcome
    }

    async fn execute(&self, run: RunId, wallet: &WalletState) -> RunOutcome {
        tracing::info!(%run, "AI risk analysis starting");

        let holdings = match self.pipeline.resolver.resolve(wallet) {
            Ok(holdings) => holdings,
            Err(e) => {
                tracing::warn!(%run, error = %e, "Wallet not connected");
                return if self.transition(run, RunState::NotConnected, None).await {
                    RunOutcome::NotConnected
                } else {
                    RunOutcome::Superseded(run)
                };
            }
        };

        if !self.transition(run, RunState::Enriching, None).await {
            return RunOutcome::Superseded(run);
        }

        let enriched = self.pipeline.enricher.enrich(holdings.clone()).await;

        if holdings.is_empty() {
            tracing::warn!(%run, "No supported tokens with non-zero balance found");
            let report = aggregate_with(Vec::new(), self.pipeline.thresholds);
            return self.commit_ready(run, self.pipeline.snapshot(run, enriched, report)).await;
        }

        if !self.transition(run, RunState::Scoring, None).await {
            return RunOutcome::Superseded(run);
        }

        match self.pipeline.scorer.score(&holdings).await {
            Ok(analyses) => {
                if !self.transition(run, RunState::Scored, None).await {
                    return RunOutcome::Superseded(run);
                }
                let report = aggregate_with(analyses, self.pipeline.thresholds);
                tracing::info!(
                    %run,
                    overall_score = report.overall_score(),
                    tier = %report.overall_tier(),
                    "AI risk analysis completed"
                );
                self.commit_ready(run, self.pipeline.snapshot(run, enriched, report)).await
            }
            Err(e) => {
                tracing::error!(%run, scorer = self.pipeline.scorer.name(), error = %e, "AI analysis failed");
                let message = e.user_message().to_string();
                let failed = RunState::ScoringFailed { message: message.clone() };
                if self.transition(run, failed, None).await {
                    RunOutcome::ScoringFailed { run, message }
                } else {
                    RunOutcome::Superseded(run)
                }
            }
        }
    }

    /// Start a run, or return the in-flight run if it is for the same wallet
    async fn begin(&self, wallet: &WalletState) -> Result<RunId, RunId> {
        let mut inner = self.inner.write().await;

        if let Some((in_flight, pending)) = &inner.in_flight {
            if pending == wallet {
                return Err(*in_flight);
            }
            tracing::debug!(superseded = %in_flight, "Wallet changed, superseding in-flight run");
        }

        inner.latest += 1;
        let run = RunId(inner.latest);
        inner.state = RunState::Resolving;
        inner.trace = vec![RunState::Resolving];
        inner.in_flight = Some((run, wallet.clone()));
        inner.current = None;
        Ok(run)
    }

    async fn commit_ready(&self, run: RunId, snapshot: ReportSnapshot) -> RunOutcome {
        let snapshot = Arc::new(snapshot);
        if self.transition(run, RunState::AggregateReady, Some(snapshot.clone())).await {
            RunOutcome::Ready(snapshot)
        } else {
            RunOutcome::Superseded(run)
        }
    }

    /// Apply `next` for `run`. Returns false (and changes nothing) when the
    /// run is stale or the edge is illegal.
    async fn transition(&self, run: RunId, next: RunState, snapshot: Option<Arc<ReportSnapshot>>) -> bool {
        let mut inner = self.inner.write().await;

        if inner.latest != run.0 {
            tracing::debug!(%run, latest = inner.latest, next = %next, "Discarding stale run result");
            return false;
        }

        if !inner.state.can_transition_to(&next) {
            tracing::warn!(%run, from = %inner.state, to = %next, "Illegal report state transition");
            return false;
        }

        tracing::debug!(%run, from = %inner.state, to = %next, "Report state transition");

        if next.is_terminal() {
            inner.in_flight = None;
        }
        if next == RunState::AggregateReady {
            inner.current.clone_from(&snapshot);
            if snapshot.is_some() {
                inner.last_ready = snapshot;
            }
        }
        inner.trace.push(next.clone());
        inner.state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::market::MockMarketClient;
    use crate::model::{Holding, RiskTier, TokenAnalysis};
    use crate::scoring::MockRiskScorer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn surface(market: Arc<MockMarketClient>, scorer: Arc<dyn RiskScorer>) -> ReportSurface {
        ReportSurface::new(ReportPipeline::new(PriceEnricher::new(market), scorer))
    }

    fn wallet(balance: &str) -> WalletState {
        WalletState::connected("0x1234", balance, 1)
    }

    #[tokio::test]
    async fn test_full_run_reaches_aggregate_ready() {
        let market = Arc::new(MockMarketClient::new());
        let scorer = Arc::new(MockRiskScorer::new().with_score("ETH", 2.0));
        let surface = surface(market.clone(), scorer.clone());

        let outcome = surface.generate(wallet("1.5")).await;

        let RunOutcome::Ready(snapshot) = outcome else {
            panic!("expected Ready, got {outcome:?}");
        };
        assert_eq!(snapshot.report.overall_tier(), RiskTier::Low);
        assert!(snapshot.holdings[0].price.is_some());
        assert_eq!(surface.state().await, RunState::AggregateReady);
        assert_eq!(
            surface.trace().await,
            vec![
                RunState::Resolving,
                RunState::Enriching,
                RunState::Scoring,
                RunState::Scored,
                RunState::AggregateReady,
            ]
        );
        assert_eq!(market.calls(), 1);
        assert_eq!(scorer.calls(), 1);
    }

    #[tokio::test]
    async fn test_not_connected_makes_no_network_calls() {
        let market = Arc::new(MockMarketClient::new());
        let scorer = Arc::new(MockRiskScorer::new());
        let surface = surface(market.clone(), scorer.clone());

        let outcome = surface.generate(WalletState::disconnected()).await;

        assert!(matches!(outcome, RunOutcome::NotConnected));
        assert_eq!(surface.state().await, RunState::NotConnected);
        assert!(surface.report().await.is_none());
        assert_eq!(market.calls(), 0);
        assert_eq!(scorer.calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_balance_skips_scoring() {
        let market = Arc::new(MockMarketClient::new());
        let scorer = Arc::new(MockRiskScorer::new());
        let surface = surface(market, scorer.clone());

        let RunOutcome::Ready(snapshot) = surface.generate(wallet("0")).await else {
            panic!("expected Ready");
        };

        assert!(snapshot.report.is_empty_wallet());
        assert!((snapshot.report.overall_score() - 1.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.report.overall_tier(), RiskTier::Low);
        assert_eq!(scorer.calls(), 0);
        assert!(!surface.trace().await.contains(&RunState::Scoring));
    }

    #[tokio::test]
    async fn test_market_failure_does_not_change_scores() {
        let scorer: Arc<dyn RiskScorer> = Arc::new(MockRiskScorer::new());

        let healthy = surface(Arc::new(MockMarketClient::new()), scorer.clone());
        let broken = surface(Arc::new(MockMarketClient::failing()), scorer);

        let RunOutcome::Ready(a) = healthy.generate(wallet("2")).await else { panic!("healthy run failed") };
        let RunOutcome::Ready(b) = broken.generate(wallet("2")).await else { panic!("broken-market run failed") };

        assert_eq!(a.report.per_token(), b.report.per_token());
        assert!(a.holdings[0].price.is_some());
        assert!(b.holdings[0].price.is_none());
    }

    #[tokio::test]
    async fn test_scoring_failure_commits_nothing_then_retry_succeeds() {
        let scorer = Arc::new(MockRiskScorer::failing());
        let surface = surface(Arc::new(MockMarketClient::new()), scorer.clone());

        let outcome = surface.generate(wallet("1")).await;
        let RunOutcome::ScoringFailed { message, .. } = outcome else {
            panic!("expected ScoringFailed, got {outcome:?}");
        };
        assert!(message.contains("try again"));
        assert!(surface.report().await.is_none());
        assert!(matches!(surface.state().await, RunState::ScoringFailed { .. }));

        scorer.set_failing(false);
        let RunOutcome::Ready(snapshot) = surface.generate(wallet("1")).await else {
            panic!("retry should succeed");
        };
        assert_eq!(snapshot.run_id, RunId(2));
        assert_eq!(surface.report().await.unwrap().run_id, RunId(2));
    }

    #[tokio::test]
    async fn test_failed_run_keeps_last_ready_report() {
        let scorer = Arc::new(MockRiskScorer::new());
        let surface = surface(Arc::new(MockMarketClient::new()), scorer.clone());

        assert!(matches!(surface.generate(wallet("1")).await, RunOutcome::Ready(_)));
        scorer.set_failing(true);
        assert!(matches!(surface.generate(wallet("2")).await, RunOutcome::ScoringFailed { .. }));

        assert!(surface.report().await.is_none());
        assert_eq!(surface.last_ready_report().await.unwrap().run_id, RunId(1));
    }

    /// First call parks until released; later calls answer immediately.
    /// Each call scores ETH with its call index so runs are distinguishable.
    struct GatedScorer {
        calls: AtomicUsize,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl RiskScorer for GatedScorer {
        async fn score(&self, holdings: &[Holding]) -> Result<Vec<TokenAnalysis>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                self.entered.notify_one();
                self.release.notified().await;
            }
            #[allow(clippy::cast_precision_loss)]
            let score = (call + 1) as f64;
            Ok(holdings
                .iter()
                .map(|h| TokenAnalysis::new(&h.name, &h.symbol, score, "gated"))
                .collect())
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    #[tokio::test]
    async fn test_stale_run_cannot_overwrite_newer_run() {
        let scorer = Arc::new(GatedScorer {
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let surface = Arc::new(surface(Arc::new(MockMarketClient::new()), scorer.clone()));

        let slow = tokio::spawn({
            let surface = surface.clone();
            async move { surface.generate(wallet("1")).await }
        });
        scorer.entered.notified().await;

        let fresh = surface.generate(wallet("5")).await;
        let RunOutcome::Ready(fresh) = fresh else { panic!("fresh run should finish") };
        assert_eq!(fresh.run_id, RunId(2));

        scorer.release.notify_one();
        let stale = slow.await.unwrap();

        assert!(matches!(stale, RunOutcome::Superseded(RunId(1))));
        let committed = surface.report().await.unwrap();
        assert_eq!(committed.run_id, RunId(2));
        assert!((committed.report.overall_score() - 2.0).abs() < f64::EPSILON);
        assert_eq!(surface.state().await, RunState::AggregateReady);
    }

    #[tokio::test]
    async fn test_duplicate_trigger_is_ignored() {
        let scorer = Arc::new(GatedScorer {
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let surface = Arc::new(surface(Arc::new(MockMarketClient::new()), scorer.clone()));

        let first = tokio::spawn({
            let surface = surface.clone();
            async move { surface.generate(wallet("1")).await }
        });
        scorer.entered.notified().await;

        let duplicate = surface.generate(wallet("1")).await;
        assert!(matches!(duplicate, RunOutcome::Ignored { in_flight: RunId(1) }));

        scorer.release.notify_one();
        assert!(matches!(first.await.unwrap(), RunOutcome::Ready(_)));
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reset_discards_in_flight_run() {
        let scorer = Arc::new(GatedScorer {
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let surface = Arc::new(surface(Arc::new(MockMarketClient::new()), scorer.clone()));

        let run = tokio::spawn({
            let surface = surface.clone();
            async move { surface.generate(wallet("1")).await }
        });
        scorer.entered.notified().await;

        surface.reset().await;
        scorer.release.notify_one();

        assert!(matches!(run.await.unwrap(), RunOutcome::Superseded(_)));
        assert_eq!(surface.state().await, RunState::Idle);
        assert!(surface.report().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_run_releases_in_flight_slot() {
        let scorer = Arc::new(GatedScorer {
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let surface = Arc::new(surface(Arc::new(MockMarketClient::new()), scorer.clone()));

        let abandoned = tokio::spawn({
            let surface = surface.clone();
            async move { surface.generate(wallet("1")).await }
        });
        scorer.entered.notified().await;
        assert_eq!(surface.state().await, RunState::Scoring);

        abandoned.abort();
        assert!(abandoned.await.unwrap_err().is_cancelled());

        assert_eq!(surface.state().await, RunState::Idle);
        let retry = surface.generate(wallet("1")).await;
        let RunOutcome::Ready(snapshot) = retry else {
            panic!("retry after abandoned run should proceed, got {retry:?}");
        };
        assert_eq!(snapshot.run_id, RunId(2));
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_huge_balance_commits_report_without_value() {
        let surface = surface(Arc::new(MockMarketClient::new()), Arc::new(MockRiskScorer::new()));

        let RunOutcome::Ready(snapshot) = surface.generate(wallet("1e26")).await else {
            panic!("expected Ready");
        };

        assert!(snapshot.holdings[0].price.is_some());
        assert_eq!(snapshot.holdings[0].value_usd(), None);
        assert_eq!(snapshot.total_value_usd(), None);
        assert!(snapshot.render_text().contains("Risk Level: Low"));
    }

    #[tokio::test]
    async fn test_scorer_scale_drives_tiers_end_to_end() {
        let scale = ScoreScale { min: 0.0, max: 100.0 };
        let scorer = Arc::new(MockRiskScorer::new().with_scale(scale).with_score("ETH", 45.0));
        let surface = surface(Arc::new(MockMarketClient::new()), scorer);

        let RunOutcome::Ready(snapshot) = surface.generate(wallet("1")).await else {
            panic!("expected Ready");
        };

        assert_eq!(snapshot.report.overall_tier(), RiskTier::Moderate);
        assert_eq!(snapshot.chart()[0].tier, RiskTier::Moderate);
        assert_eq!(snapshot.badge().label, "Moderate Risk");
        assert!(snapshot.render_text().contains("- Ethereum (ETH): 45.0/100"));
    }

    #[test]
    fn test_transition_table() {
        assert!(RunState::Idle.can_transition_to(&RunState::Resolving));
        assert!(RunState::Resolving.can_transition_to(&RunState::NotConnected));
        assert!(RunState::Enriching.can_transition_to(&RunState::AggregateReady));
        assert!(!RunState::Idle.can_transition_to(&RunState::Scoring));
        assert!(!RunState::Scoring.can_transition_to(&RunState::AggregateReady));
        assert!(!RunState::NotConnected.can_transition_to(&RunState::Enriching));
        assert!(RunState::AggregateReady.is_terminal());
        assert!(RunState::Scored.is_in_flight());
    }
}
