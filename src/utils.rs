//! Caller-side helpers. Nothing here is reachable from the kernel
//! itself, which treats wallet names as opaque strings.

use bech32::Bech32m;
use uuid7::uuid7;

// Mint a fresh wallet identifier: uuid7 payload under a bech32m hrp.
pub fn new_wallet_address(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encoded = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encoded)
}
