//! Id generation for stores that assign ids on first save.

const BASE62: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Produces the id for the `sequence`-th insert of a store.
///
/// Implementations should be deterministic in `sequence`; stores retry with
/// the next sequence number when a generated id is already taken.
pub trait IdGenerator<ID>: Send + Sync {
    fn next_id(&self, sequence: u64) -> ID;
}

/// Plain numeric ids starting at 1.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialIds;

impl IdGenerator<u64> for SequentialIds {
    fn next_id(&self, sequence: u64) -> u64 {
        sequence.saturating_add(1)
    }
}

/// Base62 string ids (`0-9A-Za-z`), left-padded with `'0'` to `min_width`.
///
/// With a fixed width the ids sort in generation order as long as they do
/// not overflow the width.
#[derive(Clone, Copy, Debug)]
pub struct Base62Ids {
    min_width: usize,
}

impl Base62Ids {
    pub fn new(min_width: usize) -> Self {
        Self { min_width }
    }
}

impl IdGenerator<String> for Base62Ids {
    fn next_id(&self, sequence: u64) -> String {
        let digits = encode_base62(sequence);
        format!("{:0>width$}", digits, width = self.min_width)
    }
}

/// Base62 digits of `n`, most significant first. Zero encodes to `"0"`.
pub fn encode_base62(mut n: u64) -> String {
    // 11 digits cover u64::MAX
    let mut digits = Vec::with_capacity(11);
    loop {
        digits.push(char::from(BASE62[(n % 62) as usize]));
        n /= 62;
        if n == 0 {
            break;
        }
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_values() {
        assert_eq!(encode_base62(0), "0");
        assert_eq!(encode_base62(61), "z");
        assert_eq!(encode_base62(62), "10");
        assert_eq!(encode_base62(3843), "zz");
        assert_eq!(encode_base62(u64::MAX).len(), 11);
    }

    #[test]
    fn base62_ids_pad_to_width() {
        let ids = Base62Ids::new(4);
        assert_eq!(ids.next_id(0), "0000");
        assert_eq!(ids.next_id(62), "0010");
        assert_eq!(ids.next_id(3843), "00zz");
        assert_eq!(Base62Ids::new(2).next_id(3843), "zz");
        assert_eq!(Base62Ids::new(0).next_id(5), "5");
    }

    #[test]
    fn fixed_width_ids_sort_in_sequence_order() {
        let ids = Base62Ids::new(3);
        let generated: Vec<String> = (0..200).map(|n| ids.next_id(n)).collect();
        let mut sorted = generated.clone();
        sorted.sort();
        assert_eq!(generated, sorted);
    }

    #[test]
    fn sequential_ids_are_one_based() {
        assert_eq!(SequentialIds.next_id(0), 1);
        assert_eq!(SequentialIds.next_id(41), 42);
    }
}
