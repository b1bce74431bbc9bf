//! The keyed integer <-> string codec.
//!
//! Encoding is not a plain base-N rendering: the internal id is first run
//! through a salt-keyed Feistel permutation of the id domain, so consecutive
//! ids produce unrelated strings, then written with a salt-shuffled alphabet
//! and sealed with one keyed check character. Decoding reverses the steps
//! and rejects anything that is not the exact canonical encoding of an id.

use sha2::{Digest, Sha256};

use crate::error::{CodecError, DecodeError, EncodeError};

/// Lowest valid internal tag id.
pub const MIN_TAG_ID: u64 = 1;

/// One past the highest valid internal tag id. Imposed by QR label size.
pub const MAX_TAG_ID: u64 = 1_000_000_000_000;

/// Alphabet used when none is configured. Digits and uppercase letters,
/// matching what fits on a printed label.
pub const DEFAULT_ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Minimum external id length used when none is configured.
pub const DEFAULT_MIN_LENGTH: usize = 5;

/// Smallest alphabet the codec accepts.
const MIN_ALPHABET_LEN: usize = 16;

/// Supported range for the configured minimum length.
const MIN_LENGTH_FLOOR: usize = 2;
const MIN_LENGTH_CEIL: usize = 24;

/// Feistel permutation domain: 2^40 covers the full id range with one spare
/// bit of headroom (10^12 < 2^40), so cycle-walking terminates quickly.
const DOMAIN_BITS: u32 = 40;
const HALF_BITS: u32 = DOMAIN_BITS / 2;
const HALF_MASK: u64 = (1 << HALF_BITS) - 1;
const FEISTEL_ROUNDS: u8 = 4;

/// The reversible keyed transform between internal ids and bare external
/// strings.
///
/// Construction derives all keyed state from the salt once; the codec itself
/// is immutable and cheap to share.
#[derive(Debug, Clone)]
pub struct TagCodec {
    /// SHA-256 of the salt; drives the permutation, the alphabet shuffle and
    /// the check character.
    key: [u8; 32],
    /// Salt-shuffled alphabet, most significant digit first.
    shuffled: Vec<u8>,
    /// ASCII char -> digit value. Letters map case-insensitively.
    digits: [Option<u8>; 128],
    min_length: usize,
}

impl TagCodec {
    /// Builds a codec from a salt, a minimum external length and an alphabet.
    ///
    /// The salt is the only secret; the alphabet and minimum length are
    /// public label parameters. See [`DEFAULT_ALPHABET`] and
    /// [`DEFAULT_MIN_LENGTH`].
    pub fn new(salt: &str, min_length: usize, alphabet: &str) -> Result<Self, CodecError> {
        if !(MIN_LENGTH_FLOOR..=MIN_LENGTH_CEIL).contains(&min_length) {
            return Err(CodecError::MinLengthOutOfRange {
                value: min_length,
                min: MIN_LENGTH_FLOOR,
                max: MIN_LENGTH_CEIL,
            });
        }

        let mut chars: Vec<u8> = Vec::with_capacity(alphabet.len());
        for ch in alphabet.chars() {
            if !ch.is_ascii_graphic() {
                return Err(CodecError::UnprintableCharacter(ch));
            }
            if ch == '-' {
                return Err(CodecError::SeparatorInAlphabet);
            }
            let b = ch as u8;
            if chars.contains(&b) {
                return Err(CodecError::DuplicateCharacter(ch));
            }
            if ch.is_ascii_alphabetic()
                && chars.contains(&(b ^ 0x20))
            {
                return Err(CodecError::MixedCaseAlphabet(ch.to_ascii_uppercase()));
            }
            chars.push(b);
        }
        if chars.len() < MIN_ALPHABET_LEN {
            return Err(CodecError::AlphabetTooSmall {
                len: chars.len(),
                min: MIN_ALPHABET_LEN,
            });
        }

        let key: [u8; 32] = Sha256::digest(salt.as_bytes()).into();

        let mut shuffled = chars;
        keyed_shuffle(&mut shuffled, &key);

        let mut digits = [None; 128];
        for (value, &b) in shuffled.iter().enumerate() {
            let value = value as u8;
            digits[b as usize] = Some(value);
            if b.is_ascii_alphabetic() {
                digits[(b ^ 0x20) as usize] = Some(value);
            }
        }

        Ok(Self {
            key,
            shuffled,
            digits,
            min_length,
        })
    }

    /// The configured minimum external id length.
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Whether every character of `s` belongs to the codec alphabet
    /// (case-insensitively). Used to classify provider-shaped candidates
    /// without decoding them.
    pub fn spans_alphabet(&self, s: &str) -> bool {
        !s.is_empty() && s.chars().all(|ch| self.digit(ch).is_some())
    }

    /// Encodes an internal id into its canonical external form.
    ///
    /// Deterministic: the same `(salt, id)` always yields the same string.
    pub fn encode(&self, id: u64) -> Result<String, EncodeError> {
        if !(MIN_TAG_ID..MAX_TAG_ID).contains(&id) {
            return Err(EncodeError::IdOutOfRange {
                id,
                min: MIN_TAG_ID,
                max: MAX_TAG_ID,
            });
        }
        Ok(self.render(self.permute_forward(id)))
    }

    /// Decodes an external string back to the internal id that produced it.
    ///
    /// Strict: padding, check character and canonical form are all verified,
    /// so a success means `encode(id)` would reproduce the input (up to
    /// letter case).
    pub fn decode(&self, s: &str) -> Result<u64, DecodeError> {
        if s.is_empty() {
            return Err(DecodeError::Empty);
        }

        let mut values = Vec::with_capacity(s.len());
        for ch in s.chars() {
            match self.digit(ch) {
                Some(v) => values.push(v),
                None => return Err(DecodeError::InvalidCharacter { ch }),
            }
        }
        if values.len() < self.min_length.max(2) {
            return Err(DecodeError::TooShort { len: values.len() });
        }

        let check = values.pop().unwrap_or_default();
        let radix = self.shuffled.len() as u64;
        let mut value: u64 = 0;
        for v in values {
            value = value * radix + u64::from(v);
            // Canonical codewords stay below the id bound; bail before the
            // accumulator can overflow on long garbage input.
            if value >= MAX_TAG_ID {
                return Err(DecodeError::OutOfRange);
            }
        }

        if self.check_digit(value) != check {
            return Err(DecodeError::ChecksumMismatch);
        }

        let id = self.permute_backward(value);
        if !(MIN_TAG_ID..MAX_TAG_ID).contains(&id) {
            return Err(DecodeError::OutOfRange);
        }

        if !self.render(value).eq_ignore_ascii_case(s) {
            return Err(DecodeError::NotCanonical);
        }

        Ok(id)
    }

    fn digit(&self, ch: char) -> Option<u8> {
        if ch.is_ascii() {
            self.digits[ch as usize]
        } else {
            None
        }
    }

    /// Renders an obfuscated value as digits + padding + check character.
    fn render(&self, value: u64) -> String {
        let radix = self.shuffled.len() as u64;
        let mut digits = Vec::new();
        let mut v = value;
        loop {
            digits.push(self.shuffled[(v % radix) as usize]);
            v /= radix;
            if v == 0 {
                break;
            }
        }
        // Reserve one slot for the check character.
        while digits.len() + 1 < self.min_length {
            digits.push(self.shuffled[0]);
        }
        digits.reverse();
        digits.push(self.shuffled[self.check_digit(value) as usize]);

        // Alphabet bytes are printable ASCII by construction.
        String::from_utf8(digits).unwrap_or_default()
    }

    fn check_digit(&self, value: u64) -> u8 {
        let mut hasher = Sha256::new();
        hasher.update(self.key);
        hasher.update(b"check");
        hasher.update(value.to_le_bytes());
        let digest = hasher.finalize();
        let raw = u16::from_be_bytes([digest[0], digest[1]]);
        (raw as usize % self.shuffled.len()) as u8
    }

    /// Keyed permutation of `[0, MAX_TAG_ID)`: a balanced Feistel network
    /// over 40 bits, cycle-walked back into the id range.
    fn permute_forward(&self, mut v: u64) -> u64 {
        loop {
            v = self.feistel(v, false);
            if v < MAX_TAG_ID {
                return v;
            }
        }
    }

    fn permute_backward(&self, mut v: u64) -> u64 {
        loop {
            v = self.feistel(v, true);
            if v < MAX_TAG_ID {
                return v;
            }
        }
    }

    fn feistel(&self, v: u64, inverse: bool) -> u64 {
        let mut left = (v >> HALF_BITS) & HALF_MASK;
        let mut right = v & HALF_MASK;

        if inverse {
            for round in (0..FEISTEL_ROUNDS).rev() {
                let (l, r) = (right ^ self.round_value(round, left), left);
                left = l;
                right = r;
            }
        } else {
            for round in 0..FEISTEL_ROUNDS {
                let (l, r) = (right, left ^ self.round_value(round, right));
                left = l;
                right = r;
            }
        }

        (left << HALF_BITS) | right
    }

    fn round_value(&self, round: u8, half: u64) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.key);
        hasher.update([round]);
        hasher.update(half.to_le_bytes());
        let digest = hasher.finalize();
        let raw = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
        u64::from(raw) & HALF_MASK
    }
}

/// Deterministic Fisher-Yates driven by the key bytes. Keeps the digit
/// assignment itself secret without any runtime randomness.
fn keyed_shuffle(chars: &mut [u8], key: &[u8; 32]) {
    let mut acc = 0usize;
    for i in (1..chars.len()).rev() {
        let step = chars.len() - 1 - i;
        let v = key[step % key.len()] as usize;
        acc += v;
        let j = (v + step + acc) % i;
        chars.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn codec() -> TagCodec {
        TagCodec::new("So salty", DEFAULT_MIN_LENGTH, DEFAULT_ALPHABET).unwrap()
    }

    #[test]
    fn roundtrip_small_ids() {
        let codec = codec();
        for id in 1..=500 {
            let encoded = codec.encode(id).unwrap();
            assert_eq!(codec.decode(&encoded).unwrap(), id, "id {id} -> {encoded}");
        }
    }

    #[test]
    fn roundtrip_edges() {
        let codec = codec();
        for id in [MIN_TAG_ID, MAX_TAG_ID - 1, 999, 1_000, 123_456_789_012] {
            let encoded = codec.encode(id).unwrap();
            assert_eq!(codec.decode(&encoded).unwrap(), id);
        }
    }

    #[test]
    fn minimum_length_is_enforced() {
        let codec = codec();
        for id in 1..=1000 {
            assert!(codec.encode(id).unwrap().len() >= DEFAULT_MIN_LENGTH);
        }
    }

    #[test]
    fn encodings_are_distinct() {
        let codec = codec();
        let mut seen = std::collections::HashSet::new();
        for id in 1..=2000 {
            assert!(seen.insert(codec.encode(id).unwrap()));
        }
    }

    #[test]
    fn encode_rejects_out_of_range() {
        let codec = codec();
        assert!(matches!(
            codec.encode(0),
            Err(EncodeError::IdOutOfRange { .. })
        ));
        assert!(matches!(
            codec.encode(MAX_TAG_ID),
            Err(EncodeError::IdOutOfRange { .. })
        ));
    }

    #[test]
    fn decode_is_case_insensitive() {
        let codec = codec();
        let encoded = codec.encode(42).unwrap();
        assert_eq!(codec.decode(&encoded.to_lowercase()).unwrap(), 42);
    }

    #[test]
    fn decode_rejects_garbage() {
        let codec = codec();
        assert_eq!(codec.decode(""), Err(DecodeError::Empty));
        assert!(matches!(
            codec.decode("ab"),
            Err(DecodeError::TooShort { .. })
        ));
        assert!(matches!(
            codec.decode("AB!DE"),
            Err(DecodeError::InvalidCharacter { ch: '!' })
        ));
        // 60 valid characters cannot be a canonical codeword.
        let long = "Z".repeat(60);
        assert!(codec.decode(&long).is_err());
    }

    #[test]
    fn decode_rejects_tampering() {
        let codec = codec();
        let encoded = codec.encode(7).unwrap();
        // Flip the final (check) character to a different alphabet member.
        let last = encoded.chars().last().unwrap();
        let replacement = DEFAULT_ALPHABET
            .chars()
            .find(|&c| c != last)
            .unwrap();
        let mut tampered: String = encoded[..encoded.len() - 1].to_string();
        tampered.push(replacement);
        assert!(codec.decode(&tampered).is_err());
    }

    #[test]
    fn foreign_salt_never_yields_the_same_id() {
        let ours = codec();
        let theirs = TagCodec::new("another salt", DEFAULT_MIN_LENGTH, DEFAULT_ALPHABET).unwrap();
        for id in 1..=200 {
            let encoded = ours.encode(id).unwrap();
            if let Ok(decoded) = theirs.decode(&encoded) {
                assert_ne!(decoded, id);
            }
        }
    }

    #[test]
    fn consecutive_ids_scatter() {
        // The permutation must break the ordinal relationship: a plain
        // padded base-N rendering of 1..=50 would give every id the same
        // leading padding digit.
        let codec = codec();
        let prefixes: std::collections::HashSet<String> = (1..=50)
            .map(|id| codec.encode(id).unwrap()[..2].to_string())
            .collect();
        assert!(prefixes.len() > 10, "got {} distinct prefixes", prefixes.len());
    }

    #[test]
    fn construction_validates_inputs() {
        assert!(matches!(
            TagCodec::new("s", 5, "0123456789"),
            Err(CodecError::AlphabetTooSmall { .. })
        ));
        assert!(matches!(
            TagCodec::new("s", 5, "0123456789ABCDEFA"),
            Err(CodecError::DuplicateCharacter('A'))
        ));
        assert!(matches!(
            TagCodec::new("s", 5, "0123456789ABCDEFa"),
            Err(CodecError::MixedCaseAlphabet('A'))
        ));
        assert!(matches!(
            TagCodec::new("s", 5, "0123456789ABCDE-"),
            Err(CodecError::SeparatorInAlphabet)
        ));
        assert!(matches!(
            TagCodec::new("s", 1, DEFAULT_ALPHABET),
            Err(CodecError::MinLengthOutOfRange { .. })
        ));
        assert!(matches!(
            TagCodec::new("s", 5, "0123456789ABCDE\u{7f}"),
            Err(CodecError::UnprintableCharacter(_))
        ));
    }

    #[test]
    fn different_salts_produce_different_encodings() {
        let a = codec();
        let b = TagCodec::new("another salt", DEFAULT_MIN_LENGTH, DEFAULT_ALPHABET).unwrap();
        let differing = (1..=100)
            .filter(|&id| a.encode(id).unwrap() != b.encode(id).unwrap())
            .count();
        assert!(differing > 90);
    }

    proptest! {
        #[test]
        fn prop_roundtrip(id in MIN_TAG_ID..MAX_TAG_ID) {
            let codec = codec();
            let encoded = codec.encode(id).unwrap();
            prop_assert_eq!(codec.decode(&encoded).unwrap(), id);
        }

        #[test]
        fn prop_output_shape(id in MIN_TAG_ID..MAX_TAG_ID) {
            let codec = codec();
            let encoded = codec.encode(id).unwrap();
            prop_assert!(encoded.len() >= DEFAULT_MIN_LENGTH);
            prop_assert!(encoded.chars().all(|c| DEFAULT_ALPHABET.contains(c)));
        }
    }
}
