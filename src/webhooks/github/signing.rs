use tracing::trace;

pub(crate) const X_GITHUB_SIGNATURE: &str = "X-Hub-Signature-256";

/// Shared secret for `X-Hub-Signature-256`. `None` disables verification entirely.
pub struct GitHubSecret(pub Option<String>);

type HmacSha256 = hmac::Hmac<sha2::Sha256>;

pub(crate) fn validate_signature(secret: &str, signature: &str, data: &str) -> bool {
    trace!("validating signature...");
    use hmac::{Mac, NewMac};

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };

    mac.update(data.as_bytes());

    // GitHub puts a prefix in front of its hex SHA256
    let signature = match signature.strip_prefix("sha256=") {
        Some(s) => s,
        None => {
            trace!("couldn't strip prefix from signature `{}`", signature);
            return false;
        }
    };

    match hex::decode(signature) {
        Ok(bytes) => mac.verify(&bytes).is_ok(),
        Err(_) => {
            trace!("couldn't decode hex-encoded signature {}", signature);
            false
        }
    }
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, data: &str) -> String {
    use hmac::{Mac, NewMac};

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(data.as_bytes());

    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
