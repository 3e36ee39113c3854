//! Webhook signature verification.
//!
//! Kick signs `<message id>.<timestamp>.<raw body>` with RSASSA-PKCS1-v1_5
//! over SHA-256 and sends the base64 signature in `Kick-Event-Signature`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use sha2::Sha256;
use tracing::debug;

use crate::error::{KickError, Result};

/// Kick's published webhook signing key.
pub const KICK_WEBHOOK_PUBLIC_KEY_PEM: &str = r#"-----BEGIN PUBLIC KEY-----
MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEAq/+l1WnlRrGSolDMA+A8
6rAhMbQGmQ2SapVcGM3zq8ANXjnhDWocMqfWcTd95btDydITa10kDvHzw9WQOqp2
MZI7ZyrfzJuz5nhTPCiJwTwnEtWft7nV14BYRDHvlfqPUaZ+1KR4OCaO/wWIk/rQ
L/TjY0M70gse8rlBkbo2a8rKhu69RQTRsoaf4DVhDPEeSeI5jVrRDGAMGL3cGuyY
6CLKGdjVEM78g3JfYOvDU/RvfqD7L89TZ3iN94jrmWdGz34JNlEI5hqK8dd7C5EF
BEbZ5jgB8s8ReQV8H+MkuffjdAj3ajDDX3DOJMIut1lBrUVD1AaSrGCKHooWoL2e
twIDAQAB
-----END PUBLIC KEY-----
"#;

/// Checks webhook signatures.
pub trait SignatureVerifier: Send + Sync {
    /// Returns `Ok(false)` for a signature that does not match; errors only
    /// on input that cannot be interpreted at all.
    fn verify(
        &self,
        message_id: &str,
        timestamp: &str,
        raw_body: &[u8],
        signature_b64: &str,
    ) -> Result<bool>;
}

/// RSA/SHA-256 verifier bound to one public key.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    key: VerifyingKey<Sha256>,
}

impl WebhookVerifier {
    /// Verifier for Kick's published key.
    pub fn kick() -> Result<Self> {
        Self::from_pem(KICK_WEBHOOK_PUBLIC_KEY_PEM)
    }

    /// Parse an SPKI (`BEGIN PUBLIC KEY`) or PKCS#1 (`BEGIN RSA PUBLIC KEY`) PEM.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let pem = pem.trim();
        let key = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|spki_err| {
                RsaPublicKey::from_pkcs1_pem(pem).map_err(|_| spki_err.to_string())
            })
            .map_err(KickError::InvalidPublicKey)?;
        Ok(Self::new(key))
    }

    pub fn new(key: RsaPublicKey) -> Self {
        Self {
            key: VerifyingKey::new(key),
        }
    }
}

/// The exact byte string Kick signs. Built from the untouched body bytes.
pub fn signed_payload(message_id: &str, timestamp: &str, raw_body: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(message_id.len() + timestamp.len() + raw_body.len() + 2);
    payload.extend_from_slice(message_id.as_bytes());
    payload.push(b'.');
    payload.extend_from_slice(timestamp.as_bytes());
    payload.push(b'.');
    payload.extend_from_slice(raw_body);
    payload
}

impl SignatureVerifier for WebhookVerifier {
    fn verify(
        &self,
        message_id: &str,
        timestamp: &str,
        raw_body: &[u8],
        signature_b64: &str,
    ) -> Result<bool> {
        let raw_signature = STANDARD.decode(signature_b64.trim())?;
        let Ok(signature) = Signature::try_from(raw_signature.as_slice()) else {
            debug!("Signature has an invalid encoding");
            return Ok(false);
        };

        let payload = signed_payload(message_id, timestamp, raw_body);
        Ok(self.key.verify(&payload, &signature).is_ok())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rsa::RsaPrivateKey;
    use rsa::pkcs1v15::SigningKey;
    use rsa::pkcs8::{EncodePublicKey, LineEnding};
    use rsa::rand_core::OsRng;
    use rsa::signature::{SignatureEncoding, Signer};
    use std::sync::OnceLock;

    /// Test key pair shared across the crate's tests (key generation is slow).
    pub(crate) fn test_key() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 1024).unwrap())
    }

    pub(crate) fn test_verifier() -> WebhookVerifier {
        WebhookVerifier::new(test_key().to_public_key())
    }

    pub(crate) fn sign(message_id: &str, timestamp: &str, body: &[u8]) -> String {
        let signing_key = SigningKey::<Sha256>::new(test_key().clone());
        let signature = signing_key.sign(&signed_payload(message_id, timestamp, body));
        STANDARD.encode(signature.to_bytes())
    }

    #[test]
    fn test_kick_key_parses() {
        WebhookVerifier::kick().unwrap();
    }

    #[test]
    fn test_signed_message_verifies() {
        let body = br#"{"x":1}"#;
        let signature = sign("abc123", "1700000000", body);
        assert!(
            test_verifier()
                .verify("abc123", "1700000000", body, &signature)
                .unwrap()
        );
        assert_eq!(
            signed_payload("abc123", "1700000000", body),
            b"abc123.1700000000.{\"x\":1}"
        );
    }

    #[test]
    fn test_any_flipped_byte_fails() {
        let verifier = test_verifier();
        let body = br#"{"x":1}"#;
        let signature = sign("abc123", "1700000000", body);

        assert!(!verifier.verify("abc124", "1700000000", body, &signature).unwrap());
        assert!(!verifier.verify("abc123", "1700000001", body, &signature).unwrap());
        assert!(
            !verifier
                .verify("abc123", "1700000000", br#"{"x":2}"#, &signature)
                .unwrap()
        );
        // Re-serialized JSON is not the signed body.
        assert!(
            !verifier
                .verify("abc123", "1700000000", br#"{ "x": 1 }"#, &signature)
                .unwrap()
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let body = b"{}";
        let signature = sign("m", "t", body);
        let kick = WebhookVerifier::kick().unwrap();
        assert!(!kick.verify("m", "t", body, &signature).unwrap());
    }

    #[test]
    fn test_malformed_base64_is_an_error() {
        let err = test_verifier()
            .verify("m", "t", b"{}", "not base64!!")
            .unwrap_err();
        assert!(matches!(err, KickError::MalformedSignature(_)));
        assert!(err.is_webhook_rejection());
    }

    #[test]
    fn test_from_pem_accepts_spki_and_rejects_garbage() {
        let pem = test_key()
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        let verifier = WebhookVerifier::from_pem(&pem).unwrap();
        let signature = sign("m", "t", b"body");
        assert!(verifier.verify("m", "t", b"body", &signature).unwrap());

        assert!(matches!(
            WebhookVerifier::from_pem("-----BEGIN PUBLIC KEY-----\nnope\n-----END PUBLIC KEY-----"),
            Err(KickError::InvalidPublicKey(_))
        ));
    }
}
