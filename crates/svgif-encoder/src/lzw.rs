//! Variable-width LZW coder used by GIF image data

use std::collections::HashMap;

/// Widest code GIF allows
pub const MAX_CODE_SIZE: u8 = 12;

/// The dictionary is reset once this many codes are assigned
const MAX_CODES: u16 = 4095;

/// Smallest valid GIF minimum code size for a palette of `palette_len` entries
pub fn min_code_size(palette_len: usize) -> u8 {
    let mut bits = 2;
    while (1usize << bits) < palette_len {
        bits += 1;
    }
    bits
}

/// Compress palette indices into a packed LZW code stream
///
/// Every index must be below `1 << min_code_size`. The output starts with a
/// clear code and ends with the end-of-information code; it is not yet split
/// into GIF sub-blocks.
pub fn encode(indices: &[u8], min_code_size: u8) -> Vec<u8> {
    let clear = 1u16 << min_code_size;
    let eoi = clear + 1;

    let mut writer = BitWriter::default();
    let mut dict: HashMap<(u16, u8), u16> = HashMap::new();
    let mut next = eoi + 1;
    let mut size = min_code_size + 1;

    writer.write(clear, size);

    let mut symbols = indices.iter().copied();
    let Some(first) = symbols.next() else {
        writer.write(eoi, size);
        return writer.finish();
    };

    let mut prefix = u16::from(first);
    for symbol in symbols {
        if let Some(&code) = dict.get(&(prefix, symbol)) {
            prefix = code;
            continue;
        }

        writer.write(prefix, size);

        if next < MAX_CODES {
            dict.insert((prefix, symbol), next);
            next += 1;
            if next > (1 << size) && size < MAX_CODE_SIZE {
                size += 1;
            }
        } else {
            writer.write(clear, size);
            dict.clear();
            next = eoi + 1;
            size = min_code_size + 1;
        }

        prefix = u16::from(symbol);
    }

    writer.write(prefix, size);
    writer.write(eoi, size);
    writer.finish()
}

/// Packs codes least-significant bit first
#[derive(Default)]
struct BitWriter {
    out: Vec<u8>,
    acc: u32,
    bits: u8,
}

impl BitWriter {
    fn write(&mut self, code: u16, size: u8) {
        self.acc |= u32::from(code) << self.bits;
        self.bits += size;
        while self.bits >= 8 {
            self.out.push(self.acc as u8);
            self.acc >>= 8;
            self.bits -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.out.push(self.acc as u8);
        }
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(data: &[u8], min_code_size: u8) -> Vec<u8> {
        weezl::decode::Decoder::new(weezl::BitOrder::Lsb, min_code_size)
            .decode(data)
            .unwrap()
    }

    /// Deterministic pseudo-random symbols
    fn noise(len: usize, modulus: u32) -> Vec<u8> {
        let mut state = 0x2545_f491u32;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                ((state >> 16) % modulus) as u8
            })
            .collect()
    }

    #[test]
    fn test_min_code_size() {
        assert_eq!(min_code_size(1), 2);
        assert_eq!(min_code_size(4), 2);
        assert_eq!(min_code_size(5), 3);
        assert_eq!(min_code_size(16), 4);
        assert_eq!(min_code_size(17), 5);
        assert_eq!(min_code_size(256), 8);
    }

    #[test]
    fn test_uniform_run() {
        let indices = vec![0u8; 1000];
        let encoded = encode(&indices, 2);
        assert!(encoded.len() < 100);
        assert_eq!(decode(&encoded, 2), indices);
    }

    #[test]
    fn test_small_alphabet() {
        let indices = vec![1, 1, 1, 1, 2, 2, 2, 0, 0, 1, 2, 3, 1, 1, 1, 1];
        assert_eq!(decode(&encode(&indices, 2), 2), indices);
    }

    #[test]
    fn test_single_symbol() {
        assert_eq!(decode(&encode(&[3], 2), 2), vec![3]);
    }

    #[test]
    fn test_dictionary_reset_on_noisy_input() {
        let indices = noise(200_000, 256);
        let encoded = encode(&indices, 8);
        assert_eq!(decode(&encoded, 8), indices);
    }

    #[test]
    fn test_code_growth_mid_width() {
        let indices = noise(20_000, 20);
        let encoded = encode(&indices, 5);
        assert_eq!(decode(&encoded, 5), indices);
    }
}
