//! Decoding of raw stream words into engineering-unit counts.
//!
//! Layout assumption: each callback carries two 16-bit words, current first,
//! voltage second, with the conversion result in bits 0..=11. This holds for
//! the ADS7957-style converter on the reference board and is not derived from
//! channel metadata, so a different converter needs a different decoder.
use battery_traits::RawSampleWords;

pub const SAMPLE_MASK: u16 = 0x0FFF;
/// Converter reference in millivolts, applied as `(code * SCALE) >> SHIFT`.
pub const SCALE: i32 = 5002;
pub const SHIFT: u32 = 12;

/// Decoded pair, in the same units a fresh channel read reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSamplePair {
    pub current: i32,
    pub voltage: i32,
}

/// Mask a single word to its 12-bit reading and scale it.
#[inline]
pub fn decode_word(word: u16) -> i32 {
    (i32::from(word & SAMPLE_MASK) * SCALE) >> SHIFT
}

#[inline]
pub fn decode_pair(words: &RawSampleWords) -> RawSamplePair {
    RawSamplePair {
        current: decode_word(words[0]),
        voltage: decode_word(words[1]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_nibble_is_ignored() {
        assert_eq!(decode_word(0xF123), decode_word(0x0123));
        assert_eq!(decode_word(0xFFFF), decode_word(0x0FFF));
    }

    #[test]
    fn full_scale_is_just_under_reference() {
        assert_eq!(decode_word(0), 0);
        // 4095 * 5002 >> 12 = 5000
        assert_eq!(decode_word(0x0FFF), 5000);
    }

    #[test]
    fn pair_order_is_current_then_voltage() {
        let pair = decode_pair(&[0x0800, 0x0400]);
        assert_eq!(pair.current, 2501);
        assert_eq!(pair.voltage, (0x400 * 5002) >> 12);
    }
}
