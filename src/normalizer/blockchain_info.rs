use serde::Deserialize;
use serde_json::Value;

use crate::providers::ProviderKind;

use super::accounting::{unix_time, AddressFlow, TransactionCollector, TxMeta};
use super::types::WalletSnapshot;
use super::{parse_entries, parse_required, NormalizeContext, NormalizeError};

const PROVIDER: ProviderKind = ProviderKind::BlockchainInfo;

#[derive(Debug, Deserialize)]
struct AddressSummary {
    final_balance: i64,
    total_received: i64,
    total_sent: i64,
    n_tx: i64,
    #[serde(default)]
    txs: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawTx {
    hash: String,
    time: Option<i64>,
    block_height: Option<i64>,
    fee: Option<i64>,
    inputs: Vec<RawInput>,
    out: Vec<RawOutput>,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    // Absent on coinbase inputs.
    prev_out: Option<RawOutput>,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    addr: Option<String>,
    value: i64,
}

pub fn normalize(
    body: &Value,
    address: &str,
    ctx: &NormalizeContext,
) -> Result<WalletSnapshot, NormalizeError> {
    let summary: AddressSummary = parse_required(PROVIDER, body)?;
    let mut collector = TransactionCollector::new(ctx.scale, ctx.requested_at);

    for tx in parse_entries::<RawTx>(PROVIDER, &summary.txs) {
        let mut flow = AddressFlow::default();
        for prev in tx.inputs.iter().filter_map(|i| i.prev_out.as_ref()) {
            if prev.addr.as_deref() == Some(address) {
                flow.record_input(prev.value);
            }
        }
        for output in &tx.out {
            if output.addr.as_deref() == Some(address) {
                flow.record_output(output.value);
            }
        }

        // `time` is first-seen time; only trust it once the tx is mined.
        let block_time = tx.block_height.and_then(|_| unix_time(tx.time));
        let meta = TxMeta {
            hash: tx.hash,
            block_time,
            fee: tx.fee,
            confirmations: None,
            block_height: tx.block_height,
        };
        collector.push(meta, flow);
    }

    Ok(WalletSnapshot {
        balance: ctx.scale.to_major(summary.final_balance),
        total_received: ctx.scale.to_major(summary.total_received),
        total_sent: ctx.scale.to_major(summary.total_sent),
        transaction_count: summary.n_tx,
        unconfirmed_balance: ctx.scale.to_major(0),
        transactions: collector.finish(),
    })
}
