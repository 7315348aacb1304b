use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verifies payment-callback authenticity.
///
/// The gateway signs `"{order_id}|{payment_id}"` with the shared key secret
/// (HMAC-SHA256, hex encoded). This check is the sole authenticity gate on
/// the payment-completion path.
#[derive(Clone)]
pub struct PaymentSignatureVerifier {
    secret: String,
}

impl PaymentSignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Computes the expected signature for a gateway order/payment pair.
    pub fn sign(&self, gateway_order_id: &str, gateway_payment_id: &str) -> String {
        let payload = format!("{}|{}", gateway_order_id, gateway_payment_id);
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Recomputes the expected signature and compares it to the provided one
    /// without early exit on the first differing byte.
    pub fn verify(&self, gateway_order_id: &str, gateway_payment_id: &str, provided: &str) -> bool {
        let expected = self.sign(gateway_order_id, gateway_payment_id);
        constant_time_eq(&expected, provided)
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
