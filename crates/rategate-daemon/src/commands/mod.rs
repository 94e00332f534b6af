//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category. Shared
//! parameter parsing lives here; 256-bit quantities travel as decimal
//! strings and addresses as `0x`-prefixed hex.

pub mod admin;
pub mod dev;
pub mod query;
pub mod rate;

use rategate_types::{parse_i256, parse_u256, Address, I256, U256};
use serde_json::Value;

use crate::rpc::RpcError;

/// Result type shared by all command handlers.
pub type Result = std::result::Result<Value, RpcError>;

/// Required address parameter.
fn address_param(params: &Value, name: &str) -> std::result::Result<Address, RpcError> {
    let raw = str_param(params, name)?;
    raw.parse()
        .map_err(|e| RpcError::invalid_params(&format!("{name}: {e}")))
}

/// Required unsigned 256-bit parameter.
fn u256_param(params: &Value, name: &str) -> std::result::Result<U256, RpcError> {
    let raw = str_param(params, name)?;
    parse_u256(raw).map_err(|e| RpcError::invalid_params(&format!("{name}: {e}")))
}

/// Required signed 256-bit parameter.
fn i256_param(params: &Value, name: &str) -> std::result::Result<I256, RpcError> {
    let raw = str_param(params, name)?;
    parse_i256(raw).map_err(|e| RpcError::invalid_params(&format!("{name}: {e}")))
}

fn str_param<'a>(params: &'a Value, name: &str) -> std::result::Result<&'a str, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params() {
        let params = serde_json::json!({
            "caller": "0x0000000000000000000000000000000000000003",
            "total_supply": "4690352947360884307563",
            "answer": "-5",
            "number": 5,
        });
        assert_eq!(
            address_param(&params, "caller").expect("caller"),
            Address::from_low_u8(3)
        );
        assert_eq!(
            u256_param(&params, "total_supply").expect("supply"),
            U256::new(4_690_352_947_360_884_307_563)
        );
        assert_eq!(i256_param(&params, "answer").expect("answer"), I256::new(-5));

        let err = u256_param(&params, "number").unwrap_err();
        assert_eq!(err.code, -32602);
        let err = u256_param(&params, "answer").unwrap_err();
        assert_eq!(err.code, -32602);
        let err = address_param(&params, "missing").unwrap_err();
        assert_eq!(err.code, -32602);
    }
}
