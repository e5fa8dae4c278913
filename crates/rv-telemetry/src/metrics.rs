//! Prometheus metrics for relationship traffic.
//!
//! All metrics follow the naming convention: `rv_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Metrics registry for Rendezvous
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // RELATIONSHIP LIFECYCLE
    // =========================================================================

    /// Relationships created, by role (initiator/receiver)
    pub static ref RELATIONSHIPS_CREATED: CounterVec = CounterVec::new(
        Opts::new("rv_relationships_created_total", "Relationships created by role"),
        &["role"]
    ).expect("metric creation failed");

    /// Relationships currently held in memory
    pub static ref RELATIONSHIPS_ACTIVE: IntGauge = IntGauge::new(
        "rv_relationships_active",
        "Relationships currently held in memory"
    ).expect("metric creation failed");

    // =========================================================================
    // MESSAGE TRAFFIC
    // =========================================================================

    /// Messages broadcast, by kind (initiate/accept/private)
    pub static ref MESSAGES_SENT: CounterVec = CounterVec::new(
        Opts::new("rv_messages_sent_total", "Relationship messages broadcast"),
        &["kind"]
    ).expect("metric creation failed");

    /// Messages decrypted from observed transactions, by kind
    pub static ref MESSAGES_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("rv_messages_received_total", "Relationship messages decrypted"),
        &["kind"]
    ).expect("metric creation failed");

    /// Outputs skipped as not ours or undecryptable
    pub static ref OUTPUTS_SKIPPED: IntCounter = IntCounter::new(
        "rv_outputs_skipped_total",
        "Transaction outputs skipped during scanning"
    ).expect("metric creation failed");

    // =========================================================================
    // KEY CHAIN
    // =========================================================================

    /// Chain steps taken, by party (local/member)
    pub static ref CHAIN_ADVANCES: CounterVec = CounterVec::new(
        Opts::new("rv_chain_advances_total", "Ratchet steps taken"),
        &["party"]
    ).expect("metric creation failed");

    /// Keys located beyond the expected position by the lookahead search
    pub static ref LOOKAHEAD_HITS: IntCounter = IntCounter::new(
        "rv_chain_lookahead_hits_total",
        "Keys located by the bounded lookahead search"
    ).expect("metric creation failed");
}

/// Register all metrics with the registry. Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Lifecycle
        Box::new(RELATIONSHIPS_CREATED.clone()),
        Box::new(RELATIONSHIPS_ACTIVE.clone()),
        // Traffic
        Box::new(MESSAGES_SENT.clone()),
        Box::new(MESSAGES_RECEIVED.clone()),
        Box::new(OUTPUTS_SKIPPED.clone()),
        // Chain
        Box::new(CHAIN_ADVANCES.clone()),
        Box::new(LOOKAHEAD_HITS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
