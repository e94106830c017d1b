//! Prometheus metrics for the bridge relayer
//!
//! Exposes metrics on /metrics endpoint for Prometheus scraping.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec, CounterVec,
    Gauge, GaugeVec, HistogramVec,
};

lazy_static! {
    // Source log metrics
    pub static ref EVENTS_OBSERVED: CounterVec = register_counter_vec!(
        "relayer_events_observed_total",
        "Total number of burn events observed on a source chain",
        &["direction"]
    ).unwrap();

    pub static ref MALFORMED_EVENTS: CounterVec = register_counter_vec!(
        "relayer_malformed_events_total",
        "Total number of source events skipped as undecodable",
        &["direction"]
    ).unwrap();

    pub static ref CURSOR_POSITION: GaugeVec = register_gauge_vec!(
        "relayer_cursor_position",
        "Last source position fully processed",
        &["direction"]
    ).unwrap();

    // Relay metrics
    pub static ref RELAYS_CONFIRMED: CounterVec = register_counter_vec!(
        "relayer_relays_confirmed_total",
        "Total number of relays that reached a confirmed state",
        &["direction", "outcome"]
    ).unwrap();

    pub static ref RELAYS_FAILED: CounterVec = register_counter_vec!(
        "relayer_relays_failed_total",
        "Total number of relays that failed and need operator attention",
        &["direction", "kind"]
    ).unwrap();

    pub static ref RETRIES: CounterVec = register_counter_vec!(
        "relayer_retries_total",
        "Total number of retried relay attempts",
        &["kind"]
    ).unwrap();

    pub static ref SIGNATURES_COLLECTED: CounterVec = register_counter_vec!(
        "relayer_signatures_collected_total",
        "Validator signatures collected for attestations",
        &["direction"]
    ).unwrap();

    pub static ref IN_FLIGHT: GaugeVec = register_gauge_vec!(
        "relayer_in_flight_relays",
        "Relays currently between observation and confirmation",
        &["direction"]
    ).unwrap();

    // Processing latency
    pub static ref RELAY_LATENCY: HistogramVec = register_histogram_vec!(
        "relayer_relay_latency_seconds",
        "Time from observing a burn to a confirmed mint",
        &["direction"],
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    // Health metrics
    pub static ref UP: Gauge = register_gauge!(
        "relayer_up",
        "Whether the relayer is up and running"
    ).unwrap();
}

pub fn record_event_observed(direction: &str) {
    EVENTS_OBSERVED.with_label_values(&[direction]).inc();
}

pub fn record_malformed_event(direction: &str) {
    MALFORMED_EVENTS.with_label_values(&[direction]).inc();
}

pub fn record_cursor(direction: &str, position: u64) {
    CURSOR_POSITION
        .with_label_values(&[direction])
        .set(position as f64);
}

/// `outcome` is `minted` or `already_relayed`
pub fn record_relay_confirmed(direction: &str, outcome: &str, latency_secs: f64) {
    RELAYS_CONFIRMED
        .with_label_values(&[direction, outcome])
        .inc();
    RELAY_LATENCY
        .with_label_values(&[direction])
        .observe(latency_secs);
}

pub fn record_relay_failed(direction: &str, kind: &str) {
    RELAYS_FAILED.with_label_values(&[direction, kind]).inc();
}

pub fn record_retry(kind: &str) {
    RETRIES.with_label_values(&[kind]).inc();
}

pub fn record_signatures(direction: &str, count: usize) {
    SIGNATURES_COLLECTED
        .with_label_values(&[direction])
        .inc_by(count as f64);
}

pub fn set_in_flight(direction: &str, count: usize) {
    IN_FLIGHT.with_label_values(&[direction]).set(count as f64);
}
