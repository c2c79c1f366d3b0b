//! Register word decoding.
//!
//! Turns raw 16-bit holding-register words into typed values. The decoder is
//! pure: it never logs, never rounds and never fails. Callers check word
//! counts before decoding; a trailing unpaired word under a 2-word encoding
//! is dropped.

use serde::{Deserialize, Serialize};

/// How consecutive register words combine into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Signed 16-bit integer (1 register)
    Int16,
    /// Signed 32-bit integer (2 registers)
    Int32,
    /// IEEE-754 single-precision float (2 registers)
    Float32,
}

impl Encoding {
    /// Number of registers one value occupies.
    pub fn words_per_value(&self) -> u16 {
        match self {
            Encoding::Int16 => 1,
            Encoding::Int32 | Encoding::Float32 => 2,
        }
    }

    /// Whether values of this encoding are integers.
    pub fn is_integer(&self) -> bool {
        matches!(self, Encoding::Int16 | Encoding::Int32)
    }

    /// Return the string name for this encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Int16 => "int16",
            Encoding::Int32 => "int32",
            Encoding::Float32 => "float32",
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which word of a pair carries the high half of a 32-bit value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordOrder {
    /// First register holds the upper 16 bits.
    #[default]
    Standard,
    /// First register holds the lower 16 bits.
    Reverse,
}

impl WordOrder {
    /// Return the string name for this word order.
    pub fn as_str(&self) -> &'static str {
        match self {
            WordOrder::Standard => "standard",
            WordOrder::Reverse => "reverse",
        }
    }
}

/// A decoded register value, tagged with the encoding that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodedValue {
    Int16(i16),
    Int32(i32),
    Float32(f32),
}

impl DecodedValue {
    /// The encoding that produced this value.
    pub fn encoding(&self) -> Encoding {
        match self {
            DecodedValue::Int16(_) => Encoding::Int16,
            DecodedValue::Int32(_) => Encoding::Int32,
            DecodedValue::Float32(_) => Encoding::Float32,
        }
    }

    /// The raw 32-bit pattern of a 2-word value (`None` for `Int16`).
    pub fn bits(&self) -> Option<u32> {
        match self {
            DecodedValue::Int16(_) => None,
            DecodedValue::Int32(v) => Some(*v as u32),
            DecodedValue::Float32(v) => Some(v.to_bits()),
        }
    }
}

/// Combine a register pair into a 32-bit pattern.
pub fn combine(w0: u16, w1: u16, order: WordOrder) -> u32 {
    let (high, low) = match order {
        WordOrder::Standard => (w0, w1),
        WordOrder::Reverse => (w1, w0),
    };
    (u32::from(high) << 16) | u32::from(low)
}

/// Split a 32-bit pattern into the register pair a device would hold.
pub fn encode_pair(bits: u32, order: WordOrder) -> [u16; 2] {
    let high = (bits >> 16) as u16;
    let low = bits as u16;
    match order {
        WordOrder::Standard => [high, low],
        WordOrder::Reverse => [low, high],
    }
}

/// Decode raw register words.
///
/// `Int16` yields one value per word. `Int32` and `Float32` consume words in
/// pairs according to `order`; a trailing unpaired word is ignored.
pub fn decode(words: &[u16], encoding: Encoding, order: WordOrder) -> Vec<DecodedValue> {
    match encoding {
        Encoding::Int16 => words
            .iter()
            .map(|&w| DecodedValue::Int16(w as i16))
            .collect(),
        Encoding::Int32 => words
            .chunks_exact(2)
            .map(|pair| DecodedValue::Int32(combine(pair[0], pair[1], order) as i32))
            .collect(),
        Encoding::Float32 => words
            .chunks_exact(2)
            .map(|pair| DecodedValue::Float32(f32::from_bits(combine(pair[0], pair[1], order))))
            .collect(),
    }
}

/// Encode values back into register words, the inverse of [`decode`].
pub fn encode(values: &[DecodedValue], order: WordOrder) -> Vec<u16> {
    let mut words = Vec::with_capacity(values.len() * 2);
    for value in values {
        match value {
            DecodedValue::Int16(v) => words.push(*v as u16),
            DecodedValue::Int32(v) => words.extend(encode_pair(*v as u32, order)),
            DecodedValue::Float32(v) => words.extend(encode_pair(v.to_bits(), order)),
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int16_twos_complement() {
        let values = decode(&[0xFFFF, 0x8000, 0x7FFF, 0x0000], Encoding::Int16, WordOrder::Standard);
        assert_eq!(
            values,
            vec![
                DecodedValue::Int16(-1),
                DecodedValue::Int16(-32768),
                DecodedValue::Int16(32767),
                DecodedValue::Int16(0),
            ]
        );
    }

    #[test]
    fn test_int16_ignores_word_order() {
        let standard = decode(&[0x1234, 0xFFFE], Encoding::Int16, WordOrder::Standard);
        let reverse = decode(&[0x1234, 0xFFFE], Encoding::Int16, WordOrder::Reverse);
        assert_eq!(standard, reverse);
    }

    #[test]
    fn test_int32_word_orders() {
        let words = [0x0001, 0x0002];
        assert_eq!(
            decode(&words, Encoding::Int32, WordOrder::Standard),
            vec![DecodedValue::Int32(0x0001_0002)]
        );
        assert_eq!(
            decode(&words, Encoding::Int32, WordOrder::Reverse),
            vec![DecodedValue::Int32(0x0002_0001)]
        );
    }

    #[test]
    fn test_int32_negative() {
        assert_eq!(
            decode(&[0xFFFF, 0xFFFF], Encoding::Int32, WordOrder::Standard),
            vec![DecodedValue::Int32(-1)]
        );
        assert_eq!(
            decode(&[0x0000, 0x8000], Encoding::Int32, WordOrder::Reverse),
            vec![DecodedValue::Int32(i32::MIN)]
        );
        assert_eq!(
            decode(&[0xFFFE, 0x7FFF], Encoding::Int32, WordOrder::Reverse),
            vec![DecodedValue::Int32(0x7FFF_FFFE)]
        );
    }

    #[test]
    fn test_float32_known_patterns() {
        // 1000.0 = 0x447A0000
        assert_eq!(
            decode(&[0x447A, 0x0000], Encoding::Float32, WordOrder::Standard),
            vec![DecodedValue::Float32(1000.0)]
        );
        assert_eq!(
            decode(&[0x0000, 0x447A], Encoding::Float32, WordOrder::Reverse),
            vec![DecodedValue::Float32(1000.0)]
        );

        // -2.5 = 0xC0200000, 1.0 = 0x3F800000
        assert_eq!(
            decode(
                &[0x0000, 0xC020, 0x0000, 0x3F80],
                Encoding::Float32,
                WordOrder::Reverse
            ),
            vec![DecodedValue::Float32(-2.5), DecodedValue::Float32(1.0)]
        );
    }

    #[test]
    fn test_float32_reverse_order_misread() {
        // The same words read with the wrong order are a different float.
        let values = decode(&[0x447A, 0x0000], Encoding::Float32, WordOrder::Reverse);
        assert_eq!(values, vec![DecodedValue::Float32(f32::from_bits(0x0000_447A))]);
    }

    #[test]
    fn test_float32_special_values() {
        let values = decode(
            &[0x7F80, 0x0000, 0xFF80, 0x0000, 0x7FC0, 0x0000],
            Encoding::Float32,
            WordOrder::Standard,
        );
        assert!(matches!(values[0], DecodedValue::Float32(v) if v == f32::INFINITY));
        assert!(matches!(values[1], DecodedValue::Float32(v) if v == f32::NEG_INFINITY));
        assert!(matches!(values[2], DecodedValue::Float32(v) if v.is_nan()));
    }

    #[test]
    fn test_odd_word_count_drops_trailing_word() {
        let values = decode(&[0x447A, 0x0000, 0x1234], Encoding::Float32, WordOrder::Standard);
        assert_eq!(values, vec![DecodedValue::Float32(1000.0)]);

        assert!(decode(&[0x1234], Encoding::Int32, WordOrder::Standard).is_empty());
        assert!(decode(&[], Encoding::Int16, WordOrder::Standard).is_empty());
    }

    #[test]
    fn test_pair_roundtrip_over_bit_patterns() {
        let patterns = [
            0x0000_0000u32,
            0xFFFF_FFFF,
            0x8000_0000,
            0x7FFF_FFFF,
            0x447A_0000,
            0x0001_FFFE,
            0xDEAD_BEEF,
            0x1234_5678,
        ];

        for order in [WordOrder::Standard, WordOrder::Reverse] {
            for bits in patterns {
                let [w0, w1] = encode_pair(bits, order);
                assert_eq!(combine(w0, w1, order), bits);

                let int = decode(&[w0, w1], Encoding::Int32, order);
                assert_eq!(int[0].bits(), Some(bits));

                let float = decode(&[w0, w1], Encoding::Float32, order);
                assert_eq!(float[0].bits(), Some(bits));
            }
        }
    }

    #[test]
    fn test_encode_is_inverse_of_decode() {
        let words = vec![0x0000, 0x447A, 0x3333, 0x4049];
        let values = decode(&words, Encoding::Float32, WordOrder::Reverse);
        assert_eq!(encode(&values, WordOrder::Reverse), words);

        let words = vec![0xFFFF, 0x8000];
        let values = decode(&words, Encoding::Int16, WordOrder::Standard);
        assert_eq!(encode(&values, WordOrder::Standard), words);
    }

    #[test]
    fn test_encoding_metadata() {
        assert_eq!(Encoding::Int16.words_per_value(), 1);
        assert_eq!(Encoding::Float32.words_per_value(), 2);
        assert!(Encoding::Int32.is_integer());
        assert!(!Encoding::Float32.is_integer());
        assert_eq!(DecodedValue::Float32(0.5).encoding(), Encoding::Float32);
        assert_eq!(DecodedValue::Int16(1).bits(), None);
        assert_eq!(Encoding::Int32.to_string(), "int32");
        assert_eq!(WordOrder::default(), WordOrder::Standard);
    }
}
