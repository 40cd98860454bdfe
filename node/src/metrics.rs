//! # Prometheus Metrics
//!
//! Counters and gauges collected while replaying a script. Registered in a
//! dedicated [`prometheus::Registry`] so they do not collide with any
//! default global registry consumers.

use hodler_ledger::{Amount, EventRecord, LedgerError, LedgerEvent};
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Holds all Prometheus metric handles for a replay.
#[derive(Clone)]
pub struct LedgerMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Operations attempted, by operation name and outcome.
    pub operations_total: IntCounterVec,
    /// Rejected operations, by error kind.
    pub rejections_total: IntCounterVec,
    /// Committed events, by event type.
    pub events_total: IntCounterVec,
    /// Vaults opened by sweeps.
    pub vaults_opened_total: IntCounter,
    /// Value the ledger currently accounts for across all holders.
    pub custodied_value: Gauge,
}

impl LedgerMetrics {
    /// Creates and registers all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("hodler".into()), None)?;

        let operations_total = IntCounterVec::new(
            Opts::new("operations_total", "Ledger operations attempted"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("rejections_total", "Ledger operations rejected, by error kind"),
            &["kind"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let events_total = IntCounterVec::new(
            Opts::new("events_total", "Ledger events committed"),
            &["type"],
        )?;
        registry.register(Box::new(events_total.clone()))?;

        let vaults_opened_total =
            IntCounter::new("vaults_opened_total", "Vaults released by sweeps")?;
        registry.register(Box::new(vaults_opened_total.clone()))?;

        let custodied_value = Gauge::new(
            "custodied_value",
            "Sum of available, locked, staked, voting and vaulted value",
        )?;
        registry.register(Box::new(custodied_value.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            rejections_total,
            events_total,
            vaults_opened_total,
            custodied_value,
        })
    }

    /// Records the outcome of one operation.
    pub fn observe(&self, operation: &str, result: &Result<(), LedgerError>) {
        match result {
            Ok(()) => self
                .operations_total
                .with_label_values(&[operation, "ok"])
                .inc(),
            Err(err) => {
                self.operations_total
                    .with_label_values(&[operation, "error"])
                    .inc();
                let kind = err.kind().to_string();
                self.rejections_total
                    .with_label_values(&[kind.as_str()])
                    .inc();
            }
        }
    }

    /// Records committed events.
    pub fn observe_events(&self, records: &[EventRecord]) {
        for record in records {
            self.events_total
                .with_label_values(&[record.event.name()])
                .inc();
            if let LedgerEvent::VaultsOpened { vaults, .. } = &record.event {
                self.vaults_opened_total.inc_by(*vaults as u64);
            }
        }
    }

    /// Sets the custodied value gauge. Precision beyond f64 is dropped.
    pub fn set_custodied(&self, value: Amount) {
        let approx = value.to_string().parse::<f64>().unwrap_or(f64::MAX);
        self.custodied_value.set(approx);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
