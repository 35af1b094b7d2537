//! Fixed-width field reader over packed coefficient words
//!
//! Fields are packed most-significant first and never straddle a word: when
//! fewer than `n` bits remain in the current word the reader moves on to the
//! next one, discarding the remainder.

/// Sequential reader of fixed-width fields from `u32` words
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    words: &'a [u32],
    word: usize,
    used: u32,
}

impl<'a> BitReader<'a> {
    /// Reader positioned at the first bit of `words`
    pub fn new(words: &'a [u32]) -> Self {
        Self {
            words,
            word: 0,
            used: 0,
        }
    }

    /// Number of `n`-bit fields held by one word
    pub const fn fields_per_word(n: u32) -> u32 {
        32 / n
    }

    /// Total number of `n`-bit fields available
    pub fn capacity(&self, n: u32) -> u64 {
        self.words.len() as u64 * Self::fields_per_word(n) as u64
    }

    /// Next `n`-bit field as an unsigned value, or `None` past the end
    pub fn take_bits(&mut self, n: u32) -> Option<u32> {
        debug_assert!((1..=32).contains(&n));
        if self.used + n > 32 {
            self.word += 1;
            self.used = 0;
        }
        let word = *self.words.get(self.word)?;
        let value = if n == 32 {
            word
        } else {
            (word << self.used) >> (32 - n)
        };
        self.used += n;
        Some(value)
    }

    /// Next `n`-bit field sign-extended from two's complement
    pub fn take_signed(&mut self, n: u32) -> Option<i32> {
        let raw = self.take_bits(n)?;
        let shift = 32 - n;
        Some(((raw << shift) as i32) >> shift)
    }

    /// Position the reader at field number `index` of width `n`
    pub fn seek_field(&mut self, n: u32, index: u64) {
        let per_word = Self::fields_per_word(n) as u64;
        self.word = (index / per_word) as usize;
        self.used = (index % per_word) as u32 * n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_msb_first() {
        let words = [0xABCD_1234u32];
        let mut reader = BitReader::new(&words);
        assert_eq!(reader.take_bits(4), Some(0xA));
        assert_eq!(reader.take_bits(8), Some(0xBC));
        assert_eq!(reader.take_bits(20), Some(0xD_1234));
        assert_eq!(reader.take_bits(1), None);
    }

    #[test]
    fn test_fields_do_not_straddle_words() {
        // Three 10-bit fields per word; the last 2 bits are padding.
        let words: [u32; 2] = [0b1111111111_0000000001_1000000000_11, 0b0000000010 << 22];
        let mut reader = BitReader::new(&words);
        assert_eq!(reader.take_bits(10), Some(0b1111111111));
        assert_eq!(reader.take_bits(10), Some(1));
        assert_eq!(reader.take_bits(10), Some(0b1000000000));
        assert_eq!(reader.take_bits(10), Some(2));
    }

    #[test]
    fn test_signed_fields() {
        let words = [0xF000_0000u32 | 0x0700_0000];
        let mut reader = BitReader::new(&words);
        assert_eq!(reader.take_signed(4), Some(-1));
        assert_eq!(reader.take_signed(4), Some(7));
        assert_eq!(reader.take_signed(32), None);
    }

    #[test]
    fn test_full_word_fields() {
        let words = [u32::MAX, 5];
        let mut reader = BitReader::new(&words);
        assert_eq!(reader.take_signed(32), Some(-1));
        assert_eq!(reader.take_bits(32), Some(5));
        assert_eq!(reader.take_bits(32), None);
    }

    #[test]
    fn test_seek_matches_sequential() {
        let words = [0x1234_5678u32, 0x9ABC_DEF0, 0x0F0F_0F0F];
        let mut sequential = BitReader::new(&words);
        let values: Vec<u32> = (0..15).map(|_| sequential.take_bits(6).unwrap()).collect();
        assert_eq!(BitReader::new(&words).capacity(6), 15);

        for (index, expected) in values.iter().enumerate() {
            let mut reader = BitReader::new(&words);
            reader.seek_field(6, index as u64);
            assert_eq!(reader.take_bits(6), Some(*expected));
        }
    }
}
