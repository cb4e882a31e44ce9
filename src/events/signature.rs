//! Submission signature verification
//!
//! Binds the request body to the resolved supporter's Ed25519 key. The
//! extension signs the raw body bytes and sends key and signature base58
//! encoded; anything that fails to decode fails verification, there is no
//! distinction worth surfacing to an untrusted client.
//!
//! On success the supporter's `version` field is refreshed from the header
//! value. That is client-version tracking, not validation: it rides along
//! here because this is the last point before the supporter record is
//! trusted and reused.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use tracing::{info, warn};

use crate::alarms::{Alarm, AlarmSink};
use crate::db::schemas::SupporterDoc;
use crate::events::headers::RequestContext;
use crate::types::{CollectorError, Result};

/// Verify the submission and apply the version-tracking side effect.
pub async fn verify_submission(
    ctx: &RequestContext,
    mut supporter: SupporterDoc,
    body: &[u8],
    alarms: &dyn AlarmSink,
) -> Result<SupporterDoc> {
    if ctx.signature.is_empty() || supporter.public_key.is_empty() {
        warn!(
            "validation fail: signature {} bytes, stored public key {} bytes",
            ctx.signature.len(),
            supporter.public_key.len()
        );
        alarms
            .report(Alarm::events(
                "Validation fail",
                serde_json::to_value(ctx).unwrap_or_default(),
            ))
            .await?;
        return Err(CollectorError::Validation(
            "signature or public key missing".to_string(),
        ));
    }

    if !verify_body_signature(body, &ctx.signature, &supporter.public_key) {
        warn!(
            "signature mismatch for supporter {} ({} body bytes)",
            supporter.user_id,
            body.len()
        );
        alarms
            .report(Alarm::events(
                "Signature verification failure",
                serde_json::to_value(ctx).unwrap_or_default(),
            ))
            .await?;
        return Err(CollectorError::Signature(
            "signature does not match request body".to_string(),
        ));
    }

    if supporter.version.as_deref() != Some(ctx.version.as_str()) {
        info!(
            "supporter {} version change {:?} -> {}",
            supporter.user_id, supporter.version, ctx.version
        );
    }
    supporter.version = Some(ctx.version.clone());

    Ok(supporter)
}

/// The opaque verify primitive: `verify(message, signature, publicKey)`.
///
/// Key and signature are base58; decode failures and wrong lengths are
/// verification failures.
pub fn verify_body_signature(message: &[u8], signature_b58: &str, public_key_b58: &str) -> bool {
    let Ok(key_bytes) = bs58::decode(public_key_b58).into_vec() else {
        return false;
    };
    let Ok(key_arr) = <[u8; 32]>::try_from(key_bytes) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_arr) else {
        return false;
    };

    let Ok(sig_bytes) = bs58::decode(signature_b58).into_vec() else {
        return false;
    };
    let Ok(sig_arr) = <[u8; 64]>::try_from(sig_bytes) else {
        return false;
    };
    let signature = Signature::from_bytes(&sig_arr);

    verifying_key.verify(message, &signature).is_ok()
}
