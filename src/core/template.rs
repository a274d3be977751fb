//! Block template as returned by `getblocktemplate`

use serde::{Deserialize, Serialize};

/// Non-coinbase transaction in a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateTransaction {
    /// Raw transaction hex
    pub data: String,
    /// Transaction hash hex (display order)
    pub hash: String,
    /// Fee in base units
    #[serde(default)]
    pub fee: i64,
}

/// Coinbase transaction supplied by the node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinbaseTransaction {
    /// Raw transaction hex
    pub data: String,
    /// Transaction hash hex (display order)
    pub hash: String,
    /// Founders' reward amount
    #[serde(rename = "foundersreward", default)]
    pub founders_reward: i64,
}

/// Upstream block template. Received whole and never updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTemplate {
    /// Block version
    pub version: u32,
    /// Previous block hash hex (display order)
    #[serde(rename = "previousblockhash")]
    pub previous_block_hash: String,
    /// Transactions after the coinbase, in block order
    #[serde(default)]
    pub transactions: Vec<TemplateTransaction>,
    /// Coinbase transaction
    #[serde(rename = "coinbasetxn")]
    pub coinbase_txn: CoinbaseTransaction,
    /// Long poll identifier
    #[serde(rename = "longpollid", default)]
    pub longpoll_id: Option<String>,
    /// Network target hex (big-endian), when the node reports it
    #[serde(default)]
    pub target: Option<String>,
    /// Earliest allowed block time
    #[serde(rename = "mintime", default)]
    pub min_time: Option<u32>,
    /// Nonce range hex
    #[serde(rename = "noncerange", default)]
    pub nonce_range: Option<String>,
    /// Signature operation limit
    #[serde(rename = "sigoplimit", default)]
    pub sigop_limit: Option<u32>,
    /// Block size limit
    #[serde(rename = "sizelimit", default)]
    pub size_limit: Option<u32>,
    /// Current time
    #[serde(rename = "curtime")]
    pub cur_time: u32,
    /// Compact difficulty hex
    pub bits: String,
    /// Block height
    pub height: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_node_response() {
        let json = r#"{
            "version": 4,
            "previousblockhash": "0000000000000000000000000000000000000000000000000000000000000000",
            "transactions": [
                {"data": "00", "hash": "11", "fee": 10}
            ],
            "coinbasetxn": {"data": "01", "hash": "22", "foundersreward": 125000000},
            "longpollid": "abc",
            "target": "0007ffff00000000000000000000000000000000000000000000000000000000",
            "mintime": 1500000000,
            "noncerange": "00000000ffffffff",
            "sigoplimit": 20000,
            "sizelimit": 2000000,
            "curtime": 1500000100,
            "bits": "1f07ffff",
            "height": 42
        }"#;

        let template: BlockTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(template.version, 4);
        assert_eq!(template.transactions.len(), 1);
        assert_eq!(template.transactions[0].fee, 10);
        assert_eq!(template.coinbase_txn.founders_reward, 125000000);
        assert_eq!(template.cur_time, 1500000100);
        assert_eq!(template.bits, "1f07ffff");
        assert_eq!(template.height, 42);
    }

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{
            "version": 4,
            "previousblockhash": "00",
            "coinbasetxn": {"data": "01", "hash": "22"},
            "curtime": 1,
            "bits": "1f07ffff",
            "height": 1
        }"#;

        let template: BlockTemplate = serde_json::from_str(json).unwrap();
        assert!(template.transactions.is_empty());
        assert!(template.target.is_none());
        assert_eq!(template.coinbase_txn.founders_reward, 0);
    }
}
