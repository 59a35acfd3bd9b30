//! Protocol counters.
//!
//! # Metrics
//! - `gossip_blocks_scanned_total` (counter)
//! - `gossip_candidates_total` (counter): address-matching transactions
//! - `gossip_payloads_skipped_total` (counter, `reason`): candidates not for us
//! - `gossip_discoveries_total` (counter, `outcome`)
//! - `gossip_publishes_total` (counter, `outcome`)
//! - `tunnel_opens_total` (counter, `outcome`)

use metrics::counter;

pub fn record_block_scanned() {
    counter!("gossip_blocks_scanned_total").increment(1);
}

pub fn record_candidate() {
    counter!("gossip_candidates_total").increment(1);
}

pub fn record_payload_skipped(reason: &'static str) {
    counter!("gossip_payloads_skipped_total", "reason" => reason).increment(1);
}

pub fn record_discovery(outcome: &'static str) {
    counter!("gossip_discoveries_total", "outcome" => outcome).increment(1);
}

pub fn record_publish(outcome: &'static str) {
    counter!("gossip_publishes_total", "outcome" => outcome).increment(1);
}

pub fn record_tunnel_open(outcome: &'static str) {
    counter!("tunnel_opens_total", "outcome" => outcome).increment(1);
}
