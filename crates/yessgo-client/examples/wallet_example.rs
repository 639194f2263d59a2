/*
[INPUT]:  Token file written by the app login flow, YessGo API endpoints
[OUTPUT]: Current wallet balance and one sync result
[POS]:    Examples - authenticated wallet flow demonstration
[UPDATE]: When auth or wallet flow changes
*/

use std::env;
use std::sync::Arc;

use yessgo_client::*;

/// Example: restore tokens, fetch the balance and sync once
///
/// Usage: `cargo run --example wallet_example -- <token-file> <user-id>`
#[tokio::main]
async fn main() {
    println!("=== YessGo Wallet Example ===\n");

    let mut args = env::args().skip(1);
    let (Some(token_file), Some(user_id)) = (args.next(), args.next()) else {
        eprintln!("usage: wallet_example <token-file> <user-id>");
        return;
    };
    let Ok(user_id) = user_id.parse::<i64>() else {
        eprintln!("user id must be an integer");
        return;
    };

    let client = match YessClient::new() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };
    println!("✓ HTTP client created");

    let store = match TokenStore::restore(Arc::new(FileTokenStorage::new(&token_file))).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to read {}: {}", token_file, e);
            return;
        }
    };
    let auth = AuthRefreshCoordinator::new(client, store);
    if !auth.is_authenticated() {
        eprintln!("No tokens stored in {}; log in with the app first", token_file);
        return;
    }
    println!("✓ Tokens restored");

    let wallet = WalletSyncCoordinator::new(RequestInterceptor::new(auth));

    match wallet.get_balance(user_id).await {
        Ok(balance) => println!(
            "✓ Balance: {} (bonus {}), updated {}",
            balance.balance, balance.bonus_balance, balance.last_updated
        ),
        Err(e) => eprintln!("Balance request failed: {}", e),
    }

    match wallet.try_sync_balance(user_id, None).await {
        Ok(Some(result)) => println!(
            "✓ Synced: success={} changes={} bonus={}",
            result.success, result.has_changes, result.bonus_balance
        ),
        Ok(None) => println!("Sync already in progress"),
        Err(e) => eprintln!("Sync failed: {}", e),
    }
}
