use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::amount::UnitScale;
use super::types::{NormalizedTransaction, TxDirection};

/// Value moved to and from the queried address within one transaction,
/// in base units.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AddressFlow {
    value_in: i64,
    value_out: i64,
    seen_as_input: bool,
    seen_as_output: bool,
}

impl AddressFlow {
    /// An input spent by the address: funds leaving.
    pub fn record_input(&mut self, value: i64) {
        self.seen_as_input = true;
        self.value_out = self.value_out.saturating_add(value);
    }

    /// An output paying the address: funds arriving.
    pub fn record_output(&mut self, value: i64) {
        self.seen_as_output = true;
        self.value_in = self.value_in.saturating_add(value);
    }

    /// Net effect as `(magnitude, direction)`, or `None` when the address
    /// never appears in the transaction.
    ///
    /// When the address is on both sides the net `value_in - value_out`
    /// decides; a zero net is reported as a zero-amount outgoing.
    pub fn classify(&self) -> Option<(i64, TxDirection)> {
        match (self.seen_as_input, self.seen_as_output) {
            (false, false) => None,
            (true, false) => Some((self.value_out, TxDirection::Outgoing)),
            (false, true) => Some((self.value_in, TxDirection::Incoming)),
            (true, true) => {
                let net = self.value_in.saturating_sub(self.value_out);
                if net > 0 {
                    Some((net, TxDirection::Incoming))
                } else {
                    Some((net.saturating_neg(), TxDirection::Outgoing))
                }
            }
        }
    }
}

/// Provider-reported metadata for one transaction.
#[derive(Debug, Clone, Default)]
pub struct TxMeta {
    pub hash: String,
    pub block_time: Option<DateTime<Utc>>,
    pub fee: Option<i64>,
    pub confirmations: Option<i64>,
    pub block_height: Option<i64>,
}

/// Collects normalized transactions for one address, dropping irrelevant
/// ones and repeated hashes.
pub struct TransactionCollector {
    scale: UnitScale,
    requested_at: DateTime<Utc>,
    seen: HashSet<String>,
    transactions: Vec<NormalizedTransaction>,
}

impl TransactionCollector {
    pub fn new(scale: UnitScale, requested_at: DateTime<Utc>) -> Self {
        Self {
            scale,
            requested_at,
            seen: HashSet::new(),
            transactions: Vec::new(),
        }
    }

    /// Returns true if the transaction was emitted.
    pub fn push(&mut self, meta: TxMeta, flow: AddressFlow) -> bool {
        let Some((amount, direction)) = flow.classify() else {
            tracing::debug!(hash = %meta.hash, "Transaction does not touch address, skipping");
            return false;
        };
        if !self.seen.insert(meta.hash.clone()) {
            tracing::debug!(hash = %meta.hash, "Duplicate transaction in payload, skipping");
            return false;
        }

        let (occurred_at, occurred_at_estimated) = match meta.block_time {
            Some(ts) => (ts, false),
            None => (self.requested_at, true),
        };

        self.transactions.push(NormalizedTransaction {
            hash: meta.hash,
            amount: self.scale.to_major(amount),
            direction,
            occurred_at,
            occurred_at_estimated,
            fee: meta.fee.map(|f| self.scale.to_major(f)),
            confirmations: meta.confirmations,
            block_height: meta.block_height,
        });
        true
    }

    pub fn finish(self) -> Vec<NormalizedTransaction> {
        self.transactions
    }
}

/// Unix seconds to a UTC timestamp. Zero and out-of-range values count as absent.
pub fn unix_time(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.filter(|s| *s > 0)
        .and_then(|s| DateTime::from_timestamp(s, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn collector() -> TransactionCollector {
        TransactionCollector::new(UnitScale::BITCOIN, Utc::now())
    }

    #[test]
    fn test_input_only_is_outgoing() {
        let mut flow = AddressFlow::default();
        flow.record_input(40_000);
        flow.record_input(10_000);
        assert_eq!(flow.classify(), Some((50_000, TxDirection::Outgoing)));
    }

    #[test]
    fn test_output_only_is_incoming() {
        let mut flow = AddressFlow::default();
        flow.record_output(70_000);
        assert_eq!(flow.classify(), Some((70_000, TxDirection::Incoming)));
    }

    #[test]
    fn test_change_output_nets_to_outgoing() {
        // Spends 1.0, gets 0.3 back as change.
        let mut flow = AddressFlow::default();
        flow.record_input(100_000_000);
        flow.record_output(30_000_000);
        assert_eq!(flow.classify(), Some((70_000_000, TxDirection::Outgoing)));
    }

    #[test]
    fn test_self_transaction_net_positive_is_incoming() {
        let mut flow = AddressFlow::default();
        flow.record_input(20_000);
        flow.record_output(50_000);
        assert_eq!(flow.classify(), Some((30_000, TxDirection::Incoming)));
    }

    #[test]
    fn test_self_transaction_zero_net_is_zero_outgoing() {
        let mut flow = AddressFlow::default();
        flow.record_input(25_000);
        flow.record_output(25_000);
        assert_eq!(flow.classify(), Some((0, TxDirection::Outgoing)));

        let mut c = collector();
        assert!(c.push(TxMeta { hash: "aa".into(), ..Default::default() }, flow));
        let txs = c.finish();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].amount, BigDecimal::from(0));
        assert_eq!(txs[0].direction, TxDirection::Outgoing);
    }

    #[test]
    fn test_untouched_transaction_is_dropped() {
        let mut c = collector();
        assert!(!c.push(TxMeta { hash: "bb".into(), ..Default::default() }, AddressFlow::default()));
        assert!(c.finish().is_empty());
    }

    #[test]
    fn test_zero_value_output_still_counts_as_touching() {
        let mut flow = AddressFlow::default();
        flow.record_output(0);
        assert_eq!(flow.classify(), Some((0, TxDirection::Incoming)));
    }

    #[test]
    fn test_duplicate_hash_is_collapsed() {
        let mut flow = AddressFlow::default();
        flow.record_output(1);
        let mut c = collector();
        assert!(c.push(TxMeta { hash: "cc".into(), ..Default::default() }, flow));
        assert!(!c.push(TxMeta { hash: "cc".into(), ..Default::default() }, flow));
        assert_eq!(c.finish().len(), 1);
    }

    #[test]
    fn test_missing_block_time_uses_request_time() {
        let requested_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut c = TransactionCollector::new(UnitScale::BITCOIN, requested_at);
        let mut flow = AddressFlow::default();
        flow.record_output(5);

        c.push(TxMeta { hash: "pending".into(), ..Default::default() }, flow);
        c.push(
            TxMeta {
                hash: "mined".into(),
                block_time: unix_time(Some(1_600_000_000)),
                ..Default::default()
            },
            flow,
        );

        let txs = c.finish();
        assert_eq!(txs[0].occurred_at, requested_at);
        assert!(txs[0].occurred_at_estimated);
        assert_eq!(txs[1].occurred_at.timestamp(), 1_600_000_000);
        assert!(!txs[1].occurred_at_estimated);
    }

    #[test]
    fn test_unix_time_rejects_zero() {
        assert_eq!(unix_time(Some(0)), None);
        assert_eq!(unix_time(None), None);
    }
}
