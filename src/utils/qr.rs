use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use uuid::Uuid;

/// Prefixo de todo QR code emitido pelo serviço
pub const QR_PREFIX: &str = "AQRO-";

/// Generates the payload printed on a container's QR sticker.
///
/// The payload is the prefix followed by the url-safe base64 of a random
/// v4 uuid (22 chars), short enough for a low-density QR code.
pub fn generate_qr_code() -> String {
    let id = Uuid::new_v4();
    format!("{}{}", QR_PREFIX, URL_SAFE_NO_PAD.encode(id.as_bytes()))
}

/// Normalizes a scanned code and checks it was issued by us.
///
/// Scanners sometimes hand back surrounding whitespace; anything else that
/// does not decode to 16 bytes is rejected.
pub fn normalize_qr_code(raw: &str) -> Option<String> {
    let code = raw.trim();
    let body = code.strip_prefix(QR_PREFIX)?;
    let bytes = URL_SAFE_NO_PAD.decode(body).ok()?;
    if bytes.len() != 16 {
        return None;
    }
    Some(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_valid_and_unique() {
        let a = generate_qr_code();
        let b = generate_qr_code();
        assert_ne!(a, b);
        assert!(a.starts_with(QR_PREFIX));
        assert_eq!(a.len(), QR_PREFIX.len() + 22);
        assert_eq!(normalize_qr_code(&a), Some(a.clone()));
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        let code = generate_qr_code();
        assert_eq!(normalize_qr_code(&format!("  {}\n", code)), Some(code));
    }

    #[test]
    fn test_foreign_codes_rejected() {
        assert_eq!(normalize_qr_code("https://example.com"), None);
        assert_eq!(normalize_qr_code("AQRO-"), None);
        assert_eq!(normalize_qr_code("AQRO-not*base64"), None);
        assert_eq!(normalize_qr_code("AQRO-AAAA"), None);
    }
}
