//! Pairs trading engine
//!
//! One cycle walks every candidate pair, derives its state from the ledger,
//! reads the latest z-score of its spread and applies the policy's decision
//! through the order router. The ledger is persisted after each change.

use crate::{
    config::BotConfig,
    connectors::{OrderExecutor, OrderTemplate},
    data::{find_hedge_ratio, CointegratedPair, PairKey, PriceTable, SpreadTable},
    ledger::{LedgerStore, OpenLegs, PositionLedger, PositionRecord, PositionType},
    strategy::{
        signal::{PairState, Signal, SignalPolicy},
        zscore::latest_zscore,
    },
    trading::{Leg, LegOutcome, OrderRouter, RateLimiter, RetryPolicy},
    utils::metrics,
    Result,
};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// When an exit counts as done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCompletion {
    /// The record is dropped if either leg closed
    AnyLeg,
    /// The record is dropped only once every open leg closed
    AllLegs,
}

impl Default for ExitCompletion {
    fn default() -> Self {
        ExitCompletion::AllLegs
    }
}

/// Inputs of one cycle
#[derive(Debug, Clone, Copy)]
pub struct CycleInputs<'a> {
    /// Spread table of the ledger being managed
    pub spreads: &'a SpreadTable,
    /// Latest prices, needed only for entries
    pub prices: Option<&'a PriceTable>,
    /// Cointegrated pairs with hedge ratios
    pub pairs: &'a [CointegratedPair],
}

/// What happened to a pair during a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    /// No action taken
    Held,
    /// Both entry legs filled
    Entered(PositionType),
    /// One entry leg filled; recorded as unhedged
    EnteredUnhedged(PositionType),
    /// No entry leg filled
    EntryFailed,
    /// Record removed
    Exited,
    /// Some legs closed; record kept as unhedged
    ExitIncomplete,
    /// No exit leg closed; record unchanged
    ExitFailed,
    /// Inputs missing for this pair
    Skipped,
}

/// Per-pair outcomes of a cycle, in processing order
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Outcome per pair key
    pub outcomes: IndexMap<String, PairOutcome>,
}

impl CycleReport {
    /// Outcome for a pair
    pub fn outcome(&self, key: &str) -> Option<PairOutcome> {
        self.outcomes.get(key).copied()
    }

    /// Number of pairs matching a predicate
    pub fn count(&self, predicate: impl Fn(&PairOutcome) -> bool) -> usize {
        self.outcomes.values().filter(|o| predicate(o)).count()
    }

    fn record(&mut self, key: &str, outcome: PairOutcome) {
        self.outcomes.insert(key.to_string(), outcome);
    }

    fn log_summary(&self, ledger: &str) {
        info!(
            "Cycle on {}: {} pairs, {} entered, {} exited, {} incomplete, {} failed, {} skipped",
            ledger,
            self.outcomes.len(),
            self.count(|o| matches!(o, PairOutcome::Entered(_) | PairOutcome::EnteredUnhedged(_))),
            self.count(|o| *o == PairOutcome::Exited),
            self.count(|o| *o == PairOutcome::ExitIncomplete),
            self.count(|o| matches!(o, PairOutcome::EntryFailed | PairOutcome::ExitFailed)),
            self.count(|o| *o == PairOutcome::Skipped),
        );
    }
}

/// Z-score driven pairs trading engine
pub struct PairsTradingEngine<E> {
    router: OrderRouter<E>,
    policy: SignalPolicy,
    template: OrderTemplate,
    order_size: f64,
    exit_completion: ExitCompletion,
    close_all_interval: Duration,
}

impl<E: OrderExecutor> PairsTradingEngine<E> {
    /// Create an engine
    pub fn new(
        executor: E,
        policy: SignalPolicy,
        template: OrderTemplate,
        order_size: f64,
        retry: RetryPolicy,
        exit_completion: ExitCompletion,
    ) -> Self {
        Self {
            router: OrderRouter::new(executor, retry),
            policy,
            template,
            order_size,
            exit_completion,
            close_all_interval: Duration::ZERO,
        }
    }

    /// Create an engine from configuration with the given policy
    pub fn from_config(executor: E, config: &BotConfig, policy: SignalPolicy) -> Self {
        Self::new(
            executor,
            policy,
            OrderTemplate::from(&config.exchange),
            config.strategy.order_size,
            config.retry_policy(),
            config.execution.exit_completion,
        )
        .with_close_all_interval(config.close_all_interval())
    }

    /// Pause between pairs in [`Self::close_all`]
    pub fn with_close_all_interval(mut self, interval: Duration) -> Self {
        self.close_all_interval = interval;
        self
    }

    /// Signal policy in use
    pub fn policy(&self) -> &SignalPolicy {
        &self.policy
    }

    /// Order executor in use
    pub fn executor(&self) -> &E {
        self.router.executor()
    }

    /// Latest z-score and decision for a pair. Pure.
    pub fn evaluate(&self, record: Option<&PositionRecord>, spread: &[Option<f64>]) -> (Option<f64>, Signal) {
        let zscore = latest_zscore(spread, self.policy.window);
        let signal = self.policy.decide(PairState::from_record(record), zscore);
        (zscore, signal)
    }

    /// Pair keys considered this cycle: pairs table and spread columns when
    /// entries are allowed, plus every ledger key
    pub fn candidates<S: LedgerStore>(&self, ledger: &PositionLedger<S>, inputs: &CycleInputs<'_>) -> Vec<String> {
        let mut keys = IndexSet::new();
        if self.policy.allows_entry() {
            keys.extend(inputs.pairs.iter().map(|p| p.key().to_string()));
            keys.extend(inputs.spreads.pair_keys().map(str::to_string));
        }
        keys.extend(ledger.keys());
        keys.into_iter().collect()
    }

    /// Run one cycle over all candidate pairs
    pub async fn run_cycle<S: LedgerStore>(
        &self,
        ledger: &mut PositionLedger<S>,
        inputs: &CycleInputs<'_>,
    ) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        for key in self.candidates(ledger, inputs) {
            let outcome = self.process_pair(ledger, inputs, &key).await?;
            report.record(&key, outcome);
        }

        ledger.persist()?;
        metrics::record_ledger_size(&ledger.store().describe(), ledger.len());
        report.log_summary(&ledger.store().describe());
        Ok(report)
    }

    /// Exit every record in the ledger regardless of z-score
    pub async fn close_all<S: LedgerStore>(&self, ledger: &mut PositionLedger<S>) -> Result<CycleReport> {
        let mut report = CycleReport::default();
        let mut limiter = RateLimiter::new(self.close_all_interval);

        for key in ledger.keys() {
            let Some(record) = ledger.get(&key).cloned() else {
                continue;
            };
            let Ok(pair) = key.parse::<PairKey>() else {
                warn!("Skipping malformed ledger key {}", key);
                report.record(&key, PairOutcome::Skipped);
                continue;
            };

            limiter.acquire().await;
            crate::log_position!(info, key, record.position_type, "Force closing position");
            let outcome = self.exit(ledger, &key, &pair, record).await?;
            report.record(&key, outcome);
        }

        ledger.persist()?;
        metrics::record_ledger_size(&ledger.store().describe(), ledger.len());
        report.log_summary(&ledger.store().describe());
        Ok(report)
    }

    async fn process_pair<S: LedgerStore>(
        &self,
        ledger: &mut PositionLedger<S>,
        inputs: &CycleInputs<'_>,
        key: &str,
    ) -> Result<PairOutcome> {
        let pair: PairKey = match key.parse() {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Skipping {}: {}", key, e);
                return Ok(PairOutcome::Skipped);
            }
        };

        let Some(spread) = inputs.spreads.series(key) else {
            warn!("No spread column for {}, skipping", key);
            return Ok(PairOutcome::Skipped);
        };

        let record = ledger.get(key).cloned();
        if let Some(closed) = record.clone().filter(PositionRecord::is_closed) {
            return self.exit(ledger, key, &pair, closed).await;
        }
        let (zscore, signal) = self.evaluate(record.as_ref(), spread);

        if let Some(z) = zscore {
            metrics::record_zscore(key, z);
        }
        crate::log_signal!(debug, key, zscore, signal, "Evaluated pair");

        match (signal, record) {
            (Signal::Hold, _) => Ok(PairOutcome::Held),
            (Signal::Enter(position_type), _) => {
                metrics::record_signal(key, &signal.to_string());
                self.enter(ledger, inputs, key, &pair, position_type).await
            }
            (Signal::Exit, Some(record)) => {
                metrics::record_signal(key, &signal.to_string());
                crate::log_signal!(info, key, zscore, signal, "Exiting position");
                self.exit(ledger, key, &pair, record).await
            }
            (Signal::Exit, None) => Ok(PairOutcome::Held),
        }
    }

    async fn enter<S: LedgerStore>(
        &self,
        ledger: &mut PositionLedger<S>,
        inputs: &CycleInputs<'_>,
        key: &str,
        pair: &PairKey,
        position_type: PositionType,
    ) -> Result<PairOutcome> {
        let Some(hedge_ratio) = find_hedge_ratio(inputs.pairs, pair) else {
            warn!("Hedge ratio not found for {}, skipping trade", key);
            return Ok(PairOutcome::Skipped);
        };
        let Some(base_price) = inputs.prices.and_then(|p| p.latest_price(&pair.base)) else {
            warn!("No latest price for {}, skipping trade", pair.base);
            return Ok(PairOutcome::Skipped);
        };
        let Some(entry_spread) = inputs.spreads.latest(key) else {
            warn!("No latest spread for {}, skipping trade", key);
            return Ok(PairOutcome::Skipped);
        };

        let base_size = self.order_size / base_price;
        let quote_size = base_size * hedge_ratio;
        if !(base_size.is_finite() && base_size > 0.0 && quote_size.is_finite() && quote_size > 0.0) {
            warn!(
                "Invalid sizes for {} (base {}, quote {}), skipping trade",
                key, base_size, quote_size
            );
            return Ok(PairOutcome::Skipped);
        }
        for (leg, size) in [(Leg::Base, base_size), (Leg::Quote, quote_size)] {
            if let Err(e) = self.template.format_size(size) {
                warn!("Untradable {} leg size for {}: {}, skipping trade", leg, key, e);
                return Ok(PairOutcome::Skipped);
            }
        }

        crate::log_position!(
            info,
            key,
            position_type,
            base_size = base_size,
            quote_size = quote_size,
            entry_spread = entry_spread,
            "Entering position"
        );

        let base = self
            .router
            .submit_once(Leg::Base, &self.template.market(&pair.base, position_type.entry_side(Leg::Base), base_size))
            .await;
        let quote = self
            .router
            .submit_once(
                Leg::Quote,
                &self.template.market(&pair.quote, position_type.entry_side(Leg::Quote), quote_size),
            )
            .await;

        if !base.succeeded && !quote.succeeded {
            error!("Both entry legs failed for {}, nothing recorded", key);
            return Ok(PairOutcome::EntryFailed);
        }

        let mut record = PositionRecord::new(position_type, entry_spread, base_size, quote_size);
        record.open_legs = OpenLegs {
            base: base.succeeded,
            quote: quote.succeeded,
        };
        ledger.upsert(key, record);
        ledger.persist()?;

        if base.succeeded && quote.succeeded {
            Ok(PairOutcome::Entered(position_type))
        } else {
            warn!("Position {} opened with one leg only, marked unhedged", key);
            Ok(PairOutcome::EnteredUnhedged(position_type))
        }
    }

    async fn exit<S: LedgerStore>(
        &self,
        ledger: &mut PositionLedger<S>,
        key: &str,
        pair: &PairKey,
        record: PositionRecord,
    ) -> Result<PairOutcome> {
        if record.is_closed() {
            ledger.remove(key);
            ledger.persist()?;
            warn!("Position {} had no open legs left, removed", key);
            return Ok(PairOutcome::Exited);
        }

        let mut outcomes: Vec<LegOutcome> = Vec::with_capacity(2);
        for (leg, symbol) in [(Leg::Base, &pair.base), (Leg::Quote, &pair.quote)] {
            if !record.open_legs.is_open(leg) {
                debug!("{} leg of {} already closed", leg, key);
                continue;
            }
            let order = self
                .template
                .market(symbol, record.position_type.exit_side(leg), record.size(leg));
            outcomes.push(self.router.submit_with_retry(leg, &order).await);
        }

        let mut remaining = record.open_legs;
        for outcome in outcomes.iter().filter(|o| o.succeeded) {
            remaining.close(outcome.leg);
        }
        let any_closed = outcomes.iter().any(|o| o.succeeded);

        let outcome = match self.exit_completion {
            ExitCompletion::AnyLeg if any_closed => PairOutcome::Exited,
            ExitCompletion::AllLegs if !remaining.any_open() => PairOutcome::Exited,
            _ if any_closed => PairOutcome::ExitIncomplete,
            _ => PairOutcome::ExitFailed,
        };

        match outcome {
            PairOutcome::Exited => {
                ledger.remove(key);
                crate::log_position!(info, key, record.position_type, "Position closed");
            }
            PairOutcome::ExitIncomplete => {
                let mut updated = record.clone();
                updated.open_legs = remaining;
                ledger.upsert(key, updated);
                warn!("Position {} partially closed, remaining legs kept as unhedged", key);
            }
            _ => error!("No exit leg closed for {}, position kept", key),
        }
        ledger.persist()?;

        Ok(outcome)
    }
}
