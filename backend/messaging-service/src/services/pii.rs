use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Symmetric codec for PII columns (names, email). Applied exactly where
/// those fields cross the serialization boundary; SQL never sees plaintext.
///
/// This is the development codec (keyed XOR + base64). Production builds
/// swap in the KMS-backed codec behind the same two methods.
#[derive(Clone)]
pub struct PiiCodec {
    key: Vec<u8>,
}

impl PiiCodec {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.as_bytes().to_vec(),
        }
    }

    fn xor(&self, bytes: &mut [u8]) {
        if self.key.is_empty() {
            return;
        }
        for (i, b) in bytes.iter_mut().enumerate() {
            *b ^= self.key[i % self.key.len()];
        }
    }

    pub fn encrypt(&self, value: &str) -> String {
        let mut bytes = value.as_bytes().to_vec();
        self.xor(&mut bytes);
        STANDARD.encode(bytes)
    }

    /// Inverse of `encrypt`. Values that don't decode cleanly are returned
    /// unchanged: legacy rows predate the codec and hold plaintext.
    pub fn decrypt(&self, value: &str) -> String {
        let Ok(mut bytes) = STANDARD.decode(value) else {
            return value.to_string();
        };
        self.xor(&mut bytes);
        match String::from_utf8(bytes) {
            Ok(plain) => plain,
            Err(_) => value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let codec = PiiCodec::new("a-development-key");
        let cipher = codec.encrypt("Alice");
        assert_ne!(cipher, "Alice");
        assert_eq!(codec.decrypt(&cipher), "Alice");
    }

    #[test]
    fn legacy_plaintext_passes_through() {
        let codec = PiiCodec::new("a-development-key");
        // Not valid base64 -> treated as a pre-codec row
        assert_eq!(codec.decrypt("Bob O'Neil"), "Bob O'Neil");
    }
}
