use tracing::{info, warn};

use crate::proto::{BankRegisterRequest, BankRegisterResponse};
use crate::rpc::{RpcClient, RpcError, normalize_base_url};

/// Announce `bank_name -> bank_address` to the gateway registry.
pub async fn register_with_gateway(
    rpc: &RpcClient,
    gateway_url: &str,
    bank_name: &str,
    bank_address: &str,
) -> Result<BankRegisterResponse, RpcError> {
    let url = format!("{}/v1/bank_register", normalize_base_url(gateway_url));
    let req = BankRegisterRequest {
        bank_name: bank_name.to_string(),
        bank_address: bank_address.to_string(),
    };
    let resp: BankRegisterResponse = rpc.post_json(&url, &req, None).await?;
    if resp.success {
        info!(bank = %bank_name, address = %bank_address, "Registered with gateway");
    } else {
        warn!(bank = %bank_name, message = %resp.message, "Gateway refused registration");
    }
    Ok(resp)
}
