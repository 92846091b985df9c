//! Checksum-bearing identifiers: payment cards (Luhn), IBAN (mod-97) and
//! Brazilian CPF (two mod-11 digits).

use rand::RngCore;
use rand::Rng;

use crate::errors::GenerationError;
use crate::generators::ValueGenerator;

const LUHN_PLACEHOLDER: &str = "0000 0000 0000 0000";
const IBAN_PLACEHOLDER: &str = "XX00 XXXX XXXX XXXX XXXX";
const CPF_PLACEHOLDER: &str = "000.000.000-00";

pub struct LuhnGenerator {
    sit_id: String,
    issuers: Vec<Vec<String>>,
    length: usize,
    placeholder: String,
}

impl LuhnGenerator {
    pub fn new(
        sit_id: &str,
        issuers: Vec<Vec<String>>,
        length: usize,
        placeholder: Option<String>,
    ) -> Self {
        Self {
            sit_id: sit_id.to_string(),
            issuers,
            length,
            placeholder: placeholder.unwrap_or_else(|| LUHN_PLACEHOLDER.to_string()),
        }
    }
}

impl ValueGenerator for LuhnGenerator {
    fn kind(&self) -> &'static str {
        "luhn"
    }

    fn valid(&self, rng: &mut dyn RngCore) -> Result<String, GenerationError> {
        let families: Vec<&Vec<String>> = self
            .issuers
            .iter()
            .filter(|family| !family.is_empty())
            .collect();
        if families.is_empty() {
            return Err(self.invalid("no issuer prefixes configured"));
        }
        let family = families[rng.random_range(0..families.len())];
        let prefix = &family[rng.random_range(0..family.len())];
        if !prefix.bytes().all(|b| b.is_ascii_digit()) || prefix.len() >= self.length {
            return Err(self.invalid(&format!(
                "issuer prefix '{prefix}' must be digits shorter than {}",
                self.length
            )));
        }

        let mut body = prefix.clone();
        while body.len() < self.length - 1 {
            body.push(char::from(b'0' + rng.random_range(0..10u8)));
        }
        let check = luhn_check_digit(&body)
            .ok_or_else(|| self.invalid("card body is not numeric"))?;
        body.push(char::from(b'0' + check));
        Ok(group(&body, 4, ' '))
    }

    fn placeholder(&self) -> String {
        self.placeholder.clone()
    }
}

impl LuhnGenerator {
    fn invalid(&self, message: &str) -> GenerationError {
        GenerationError::InvalidGenerator {
            sit_id: self.sit_id.clone(),
            message: message.to_string(),
        }
    }
}

pub struct IbanGenerator {
    sit_id: String,
    country: String,
    body_len: usize,
    placeholder: String,
}

impl IbanGenerator {
    pub fn new(sit_id: &str, country: String, body_len: usize, placeholder: Option<String>) -> Self {
        Self {
            sit_id: sit_id.to_string(),
            country: country.to_ascii_uppercase(),
            body_len,
            placeholder: placeholder.unwrap_or_else(|| IBAN_PLACEHOLDER.to_string()),
        }
    }
}

impl ValueGenerator for IbanGenerator {
    fn kind(&self) -> &'static str {
        "iban"
    }

    fn valid(&self, rng: &mut dyn RngCore) -> Result<String, GenerationError> {
        let body: String = (0..self.body_len)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect();
        let checksum = iban_checksum(&self.country, &body).ok_or_else(|| {
            GenerationError::InvalidGenerator {
                sit_id: self.sit_id.clone(),
                message: format!("country code '{}' must be two letters", self.country),
            }
        })?;
        Ok(format!("{}{checksum}{body}", self.country))
    }

    fn placeholder(&self) -> String {
        self.placeholder.clone()
    }
}

pub struct CpfGenerator {
    placeholder: String,
}

impl CpfGenerator {
    pub fn new(placeholder: Option<String>) -> Self {
        Self {
            placeholder: placeholder.unwrap_or_else(|| CPF_PLACEHOLDER.to_string()),
        }
    }
}

impl ValueGenerator for CpfGenerator {
    fn kind(&self) -> &'static str {
        "cpf"
    }

    fn valid(&self, rng: &mut dyn RngCore) -> Result<String, GenerationError> {
        let mut digits = [0_u8; 11];
        // A leading 1..=9 keeps the value from collapsing to all zeros.
        digits[0] = rng.random_range(1..=9);
        for digit in digits.iter_mut().take(9).skip(1) {
            *digit = rng.random_range(0..=9);
        }
        let d1 = cpf_check_digit(&digits[..9]);
        let d2 = cpf_check_digit(&[&digits[..9], &[d1]].concat());
        digits[9] = d1;
        digits[10] = d2;
        let raw: String = digits.iter().map(|d| char::from(b'0' + *d)).collect();
        Ok(format!(
            "{}.{}.{}-{}",
            &raw[0..3],
            &raw[3..6],
            &raw[6..9],
            &raw[9..11]
        ))
    }

    fn placeholder(&self) -> String {
        self.placeholder.clone()
    }
}

/// Mod-10 check digit for a numeric body (digits only, no check digit yet).
pub fn luhn_check_digit(body: &str) -> Option<u8> {
    let mut total = 0_u32;
    for (idx, ch) in body.chars().rev().enumerate() {
        let digit = ch.to_digit(10)?;
        // Rightmost body digit sits next to the check digit, so it is doubled.
        if idx % 2 == 0 {
            let doubled = digit * 2;
            total += doubled / 10 + doubled % 10;
        } else {
            total += digit;
        }
    }
    Some(((10 - (total % 10)) % 10) as u8)
}

/// True when the digits of `value` (separators ignored) pass the mod-10 check.
pub fn luhn_is_valid(value: &str) -> bool {
    let digits: String = value.chars().filter(|ch| !ch.is_whitespace() && *ch != '-').collect();
    if digits.len() < 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let (body, check) = digits.split_at(digits.len() - 1);
    luhn_check_digit(body).map(|digit| digit.to_string()) == Some(check.to_string())
}

/// Two-digit mod-97 checksum for `country` + `body`.
pub fn iban_checksum(country: &str, body: &str) -> Option<String> {
    if country.len() != 2 || !country.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return None;
    }
    let rearranged = format!("{body}{}00", country.to_ascii_uppercase());
    let remainder = mod97(&rearranged)?;
    Some(format!("{:02}", 98 - remainder))
}

/// True when an IBAN-shaped value (spaces ignored) has remainder 1 under mod-97.
pub fn iban_is_valid(value: &str) -> bool {
    let compact: String = value.chars().filter(|ch| !ch.is_whitespace()).collect();
    if compact.len() < 5 || !compact.is_ascii() {
        return false;
    }
    let (head, body) = compact.split_at(4);
    mod97(&format!("{body}{head}")) == Some(1)
}

/// Letters map to `ord - 55`; reduction runs over 9-digit chunks carrying the remainder.
fn mod97(value: &str) -> Option<u32> {
    let mut numeric = String::with_capacity(value.len() * 2);
    for ch in value.chars() {
        if ch.is_ascii_digit() {
            numeric.push(ch);
        } else if ch.is_ascii_alphabetic() {
            numeric.push_str(&(ch.to_ascii_uppercase() as u32 - 55).to_string());
        } else {
            return None;
        }
    }

    let mut remainder = 0_u64;
    let bytes = numeric.as_bytes();
    for chunk in bytes.chunks(9) {
        let block = format!("{remainder}{}", std::str::from_utf8(chunk).ok()?);
        remainder = block.parse::<u64>().ok()? % 97;
    }
    Some(remainder as u32)
}

fn cpf_check_digit(digits: &[u8]) -> u8 {
    let mut sum = 0_u32;
    let mut weight = digits.len() as u32 + 1;
    for digit in digits {
        sum += (*digit as u32) * weight;
        weight = weight.saturating_sub(1);
    }
    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        (11 - remainder) as u8
    }
}

/// True when a formatted or bare CPF carries both correct check digits.
pub fn cpf_is_valid(value: &str) -> bool {
    let digits: Vec<u8> = value
        .chars()
        .filter_map(|ch| ch.to_digit(10).map(|d| d as u8))
        .collect();
    if digits.len() != 11 {
        return false;
    }
    let d1 = cpf_check_digit(&digits[..9]);
    let d2 = cpf_check_digit(&digits[..10]);
    digits[9] == d1 && digits[10] == d2
}

fn group(value: &str, size: usize, separator: char) -> String {
    let mut out = String::with_capacity(value.len() + value.len() / size);
    for (idx, ch) in value.chars().enumerate() {
        if idx > 0 && idx % size == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sitcorpus_core::catalog::default_luhn_issuers;

    #[test]
    fn luhn_matches_known_numbers() {
        assert!(luhn_is_valid("4111 1111 1111 1111"));
        assert!(luhn_is_valid("5555555555554444"));
        assert!(!luhn_is_valid("4111 1111 1111 1112"));
        assert_eq!(luhn_check_digit("7992739871"), Some(3));
    }

    #[test]
    fn generated_cards_pass_luhn_and_are_grouped() {
        let generator = LuhnGenerator::new("SIT_CCN", default_luhn_issuers(), 16, None);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let value = generator.valid(&mut rng).expect("card");
            assert!(luhn_is_valid(&value), "{value}");
            let groups: Vec<&str> = value.split(' ').collect();
            assert_eq!(groups.len(), 4);
            assert!(groups.iter().all(|group| group.len() == 4));
            assert!(value.starts_with('4') || value.starts_with('5'));
        }
    }

    #[test]
    fn iban_matches_known_value_and_generated_ones_validate() {
        assert!(iban_is_valid("GB82 WEST 1234 5698 7654 32"));
        assert!(!iban_is_valid("GB83 WEST 1234 5698 7654 32"));

        let generator = IbanGenerator::new("SIT_IBAN", "GB".to_string(), 16, None);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let value = generator.valid(&mut rng).expect("iban");
            assert_eq!(value.len(), 20);
            assert!(value.starts_with("GB"));
            assert!(iban_is_valid(&value), "{value}");
        }
    }

    #[test]
    fn cpf_values_carry_check_digits() {
        let generator = CpfGenerator::new(None);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..100 {
            let value = generator.valid(&mut rng).expect("cpf");
            assert_eq!(value.len(), 14);
            assert!(cpf_is_valid(&value), "{value}");
        }
        assert!(!cpf_is_valid("123.456.789-00"));
    }

    #[test]
    fn bad_issuer_prefix_is_an_error() {
        let generator = LuhnGenerator::new("SIT_X", vec![vec!["4x".to_string()]], 16, None);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(generator.valid(&mut rng).is_err());
    }
}
