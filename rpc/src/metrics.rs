//! Governance counters, registered into the node's Prometheus registry.

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry, Encoder,
    IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

pub struct ApiMetrics {
    registry: Registry,
    pub votes_recorded: IntCounter,
    pub proposals_created: IntCounter,
    /// Unconfirmed payment signatures, by step (`burn`, `reward`, `creation`).
    pub payment_failures: IntCounterVec,
    /// Confirmed payments the store refused to record.
    pub ledger_write_failures: IntCounter,
}

impl ApiMetrics {
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let votes_recorded = register_int_counter_with_registry!(
            Opts::new("fomo_votes_recorded_total", "Governance votes recorded"),
            registry
        )?;
        let proposals_created = register_int_counter_with_registry!(
            Opts::new("fomo_proposals_created_total", "Governance proposals created"),
            registry
        )?;
        let payment_failures = register_int_counter_vec_with_registry!(
            Opts::new(
                "fomo_payment_failures_total",
                "Governance payments that did not confirm"
            ),
            &["step"],
            registry
        )?;
        let ledger_write_failures = register_int_counter_with_registry!(
            Opts::new(
                "fomo_ledger_write_failures_total",
                "Confirmed governance payments that could not be recorded"
            ),
            registry
        )?;
        Ok(Self {
            registry: registry.clone(),
            votes_recorded,
            proposals_created,
            payment_failures,
            ledger_write_failures,
        })
    }

    /// Text exposition of the whole registry.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
