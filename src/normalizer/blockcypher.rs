use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::providers::ProviderKind;

use super::accounting::{AddressFlow, TransactionCollector, TxMeta};
use super::types::WalletSnapshot;
use super::{parse_entries, parse_required, NormalizeContext, NormalizeError};

const PROVIDER: ProviderKind = ProviderKind::BlockCypher;

#[derive(Debug, Deserialize)]
struct AddressSummary {
    balance: i64,
    total_received: i64,
    total_sent: i64,
    #[serde(default)]
    unconfirmed_balance: i64,
    n_tx: i64,
    final_n_tx: Option<i64>,
    #[serde(default)]
    txrefs: Vec<Value>,
    #[serde(default)]
    unconfirmed_txrefs: Vec<Value>,
}

/// One input or output of a transaction that touches the address.
#[derive(Debug, Deserialize)]
struct TxRef {
    tx_hash: String,
    /// Only present when the provider was asked about several addresses.
    address: Option<String>,
    tx_input_n: i64,
    tx_output_n: i64,
    value: i64,
    block_height: Option<i64>,
    confirmations: Option<i64>,
    confirmed: Option<DateTime<Utc>>,
}

impl TxRef {
    fn is_input(&self) -> bool {
        self.tx_input_n >= 0
    }

    fn is_output(&self) -> bool {
        self.tx_input_n < 0 && self.tx_output_n >= 0
    }
}

pub fn normalize(
    body: &Value,
    address: &str,
    ctx: &NormalizeContext,
) -> Result<WalletSnapshot, NormalizeError> {
    let summary: AddressSummary = parse_required(PROVIDER, body)?;

    // Refs arrive one per input/output; fold them back into transactions.
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, (TxMeta, AddressFlow)> = HashMap::new();

    // A tx can confirm between the two lists being built. The confirmed
    // copy wins so its refs are not counted twice.
    let confirmed = parse_entries::<TxRef>(PROVIDER, &summary.txrefs);
    let mut refs: Vec<TxRef> = {
        let confirmed_hashes: HashSet<&str> =
            confirmed.iter().map(|r| r.tx_hash.as_str()).collect();
        parse_entries::<TxRef>(PROVIDER, &summary.unconfirmed_txrefs)
            .into_iter()
            .filter(|r| !confirmed_hashes.contains(r.tx_hash.as_str()))
            .collect()
    };
    refs.extend(confirmed);
    for txref in refs {
        if txref.address.as_deref().is_some_and(|a| a != address) {
            continue;
        }

        let (_, flow) = grouped.entry(txref.tx_hash.clone()).or_insert_with(|| {
            order.push(txref.tx_hash.clone());
            let block_height = txref.block_height.filter(|h| *h >= 0);
            let meta = TxMeta {
                hash: txref.tx_hash.clone(),
                block_time: txref.confirmed.filter(|_| block_height.is_some()),
                fee: None,
                confirmations: txref.confirmations,
                block_height,
            };
            (meta, AddressFlow::default())
        });

        if txref.is_input() {
            flow.record_input(txref.value);
        } else if txref.is_output() {
            flow.record_output(txref.value);
        }
    }

    let mut collector = TransactionCollector::new(ctx.scale, ctx.requested_at);
    for hash in order {
        if let Some((meta, flow)) = grouped.remove(&hash) {
            collector.push(meta, flow);
        }
    }

    Ok(WalletSnapshot {
        balance: ctx.scale.to_major(summary.balance),
        total_received: ctx.scale.to_major(summary.total_received),
        total_sent: ctx.scale.to_major(summary.total_sent),
        transaction_count: summary.final_n_tx.unwrap_or(summary.n_tx),
        unconfirmed_balance: ctx.scale.to_major(summary.unconfirmed_balance),
        transactions: collector.finish(),
    })
}
