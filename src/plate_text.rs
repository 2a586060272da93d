use rand::Rng;

const LETTERS: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8; 10] = b"0123456789";
const LETTER_COUNT: usize = 3;
const DIGIT_COUNT: usize = 4;

/// Length of a plate identifier in the `LLL-DDDD` format.
pub const PLATE_TEXT_LEN: usize = LETTER_COUNT + 1 + DIGIT_COUNT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateRecord {
    pub id: u32,
    pub text: String,
}

/// Draws a plate identifier: three uppercase letters, a hyphen and four
/// digits, every character independent and uniform over its alphabet.
pub fn sample_plate_text<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut text = String::with_capacity(PLATE_TEXT_LEN);
    for _ in 0..LETTER_COUNT {
        text.push(LETTERS[rng.gen_range(0..LETTERS.len())] as char);
    }
    text.push('-');
    for _ in 0..DIGIT_COUNT {
        text.push(DIGITS[rng.gen_range(0..DIGITS.len())] as char);
    }
    text
}

/// Checks the `^[A-Z]{3}-[0-9]{4}$` shape.
pub fn is_plate_text(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == PLATE_TEXT_LEN
        && bytes[..LETTER_COUNT].iter().all(u8::is_ascii_uppercase)
        && bytes[LETTER_COUNT] == b'-'
        && bytes[LETTER_COUNT + 1..].iter().all(u8::is_ascii_digit)
}

/// Hands out plate records with consecutive ids starting at 1.
#[derive(Debug, Default)]
pub struct PlateTextSampler {
    next_id: u32,
}

impl PlateTextSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_record<R: Rng + ?Sized>(&mut self, rng: &mut R) -> PlateRecord {
        self.next_id += 1;
        PlateRecord {
            id: self.next_id,
            text: sample_plate_text(rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_sampled_text_matches_plate_format() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let text = sample_plate_text(&mut rng);
            assert_eq!(text.len(), 8);
            assert!(is_plate_text(&text), "bad plate text {text}");
        }
    }

    #[test]
    fn test_sampler_covers_alphabets() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen_letters = [false; 26];
        let mut seen_digits = [false; 10];
        for _ in 0..2000 {
            let text = sample_plate_text(&mut rng);
            for b in text.bytes() {
                match b {
                    b'A'..=b'Z' => seen_letters[(b - b'A') as usize] = true,
                    b'0'..=b'9' => seen_digits[(b - b'0') as usize] = true,
                    _ => {}
                }
            }
        }
        assert!(seen_letters.iter().all(|&s| s));
        assert!(seen_digits.iter().all(|&s| s));
    }

    #[test]
    fn test_same_seed_same_texts() {
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        for _ in 0..20 {
            assert_eq!(sample_plate_text(&mut a), sample_plate_text(&mut b));
        }
    }

    #[test]
    fn test_is_plate_text_rejects_malformed() {
        assert!(is_plate_text("ABC-1234"));
        assert!(!is_plate_text("abc-1234"));
        assert!(!is_plate_text("ABC1234"));
        assert!(!is_plate_text("AB-12345"));
        assert!(!is_plate_text("ABC-123A"));
        assert!(!is_plate_text(""));
    }

    #[test]
    fn test_sampler_assigns_consecutive_ids() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut sampler = PlateTextSampler::new();
        let ids: Vec<u32> = (0..3).map(|_| sampler.next_record(&mut rng).id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
