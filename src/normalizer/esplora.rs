use serde::Deserialize;
use serde_json::Value;

use crate::providers::ProviderKind;

use super::accounting::{unix_time, AddressFlow, TransactionCollector, TxMeta};
use super::types::WalletSnapshot;
use super::{parse_entries, parse_required, NormalizeContext, NormalizeError};

const PROVIDER: ProviderKind = ProviderKind::Esplora;

#[derive(Debug, Deserialize)]
struct AddressStats {
    chain_stats: TxoStats,
    #[serde(default)]
    mempool_stats: TxoStats,
}

#[derive(Debug, Default, Deserialize)]
struct TxoStats {
    funded_txo_sum: i64,
    spent_txo_sum: i64,
    tx_count: i64,
}

#[derive(Debug, Deserialize)]
struct RawTx {
    txid: String,
    fee: Option<i64>,
    #[serde(default)]
    status: TxStatus,
    vin: Vec<Vin>,
    vout: Vec<Vout>,
}

#[derive(Debug, Default, Deserialize)]
struct TxStatus {
    #[serde(default)]
    confirmed: bool,
    block_height: Option<i64>,
    block_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Vin {
    // Null for coinbase inputs.
    prevout: Option<Vout>,
}

#[derive(Debug, Deserialize)]
struct Vout {
    scriptpubkey_address: Option<String>,
    value: i64,
}

pub fn normalize(
    stats: &Value,
    txs: &Value,
    address: &str,
    ctx: &NormalizeContext,
) -> Result<WalletSnapshot, NormalizeError> {
    let stats: AddressStats = parse_required(PROVIDER, stats)?;
    let entries: Vec<Value> = parse_required(PROVIDER, txs)?;

    let mut collector = TransactionCollector::new(ctx.scale, ctx.requested_at);
    for tx in parse_entries::<RawTx>(PROVIDER, &entries) {
        let mut flow = AddressFlow::default();
        for prev in tx.vin.iter().filter_map(|v| v.prevout.as_ref()) {
            if prev.scriptpubkey_address.as_deref() == Some(address) {
                flow.record_input(prev.value);
            }
        }
        for output in &tx.vout {
            if output.scriptpubkey_address.as_deref() == Some(address) {
                flow.record_output(output.value);
            }
        }

        let (block_time, block_height) = if tx.status.confirmed {
            (unix_time(tx.status.block_time), tx.status.block_height)
        } else {
            (None, None)
        };
        let meta = TxMeta {
            hash: tx.txid,
            block_time,
            fee: tx.fee,
            confirmations: None,
            block_height,
        };
        collector.push(meta, flow);
    }

    let chain = &stats.chain_stats;
    let mempool = &stats.mempool_stats;
    let balance = checked(
        chain.funded_txo_sum.checked_sub(chain.spent_txo_sum),
        "chain balance",
    )?;
    let unconfirmed = checked(
        mempool.funded_txo_sum.checked_sub(mempool.spent_txo_sum),
        "mempool balance",
    )?;
    let transaction_count = checked(chain.tx_count.checked_add(mempool.tx_count), "tx_count")?;

    Ok(WalletSnapshot {
        balance: ctx.scale.to_major(balance),
        total_received: ctx.scale.to_major(chain.funded_txo_sum),
        total_sent: ctx.scale.to_major(chain.spent_txo_sum),
        transaction_count,
        unconfirmed_balance: ctx.scale.to_major(unconfirmed),
        transactions: collector.finish(),
    })
}

fn checked(value: Option<i64>, field: &str) -> Result<i64, NormalizeError> {
    value.ok_or_else(|| NormalizeError::Malformed {
        provider: PROVIDER,
        reason: format!("{} overflows i64", field),
    })
}
