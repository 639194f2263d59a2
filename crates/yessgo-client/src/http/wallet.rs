/*
[INPUT]:  User id, optional device id, bearer authentication
[OUTPUT]: Wallet balance snapshots and sync results
[POS]:    HTTP layer - wallet endpoints (require bearer auth)
[UPDATE]: When adding wallet endpoints or changing query parameters
*/

use crate::http::{BALANCE_ENDPOINT, RequestInterceptor, Result, WALLET_SYNC_ENDPOINT};
use crate::types::{SyncResult, WalletBalance, WalletSyncRequest};

impl RequestInterceptor {
    /// Query a user's wallet balance
    ///
    /// GET /api/v1/payments/balance?user_id={user_id}
    pub async fn query_balance(&self, user_id: i64) -> Result<WalletBalance> {
        let endpoint = format!("{BALANCE_ENDPOINT}?user_id={user_id}");
        self.get_json(&endpoint).await
    }

    /// Reconcile the wallet for a user/device pair
    ///
    /// POST /api/v1/wallet/sync
    pub async fn sync_wallet(&self, user_id: i64, device_id: Option<&str>) -> Result<SyncResult> {
        let body = WalletSyncRequest {
            user_id,
            device_id: device_id.map(str::to_string),
        };
        self.post_json(WALLET_SYNC_ENDPOINT, &body).await
    }
}
