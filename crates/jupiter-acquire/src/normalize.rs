use unicode_normalization::UnicodeNormalization;

/// Compose decomposed diacritics to NFC (c + U+0327 becomes ç).
pub fn nfc(input: &str) -> String {
    input.nfc().collect()
}
