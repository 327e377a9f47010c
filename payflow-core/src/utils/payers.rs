//! Random payer attributes for issued invoices.

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::gateway::{Payer, PayerGenerator};

const FIRST_NAMES: &[&str] = &[
    "Ana", "Bruno", "Camila", "Diego", "Eduarda", "Felipe", "Gabriela", "Henrique", "Isabela",
    "João", "Larissa", "Mateus", "Natália", "Otávio", "Paula", "Rafael", "Sofia", "Thiago",
];

const LAST_NAMES: &[&str] = &[
    "Almeida", "Barbosa", "Carvalho", "Costa", "Ferreira", "Gomes", "Lima", "Martins",
    "Oliveira", "Pereira", "Ribeiro", "Rodrigues", "Santos", "Silva", "Souza",
];

/// Generates a random full name and a CPF with valid check digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPayers;

impl PayerGenerator for RandomPayers {
    fn payer(&self) -> Payer {
        let mut rng = rand::rng();
        let first = FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Ana");
        let last = LAST_NAMES.choose(&mut rng).copied().unwrap_or("Silva");
        Payer {
            name: format!("{first} {last}"),
            tax_id: random_cpf(&mut rng),
        }
    }
}

/// A formatted CPF (`XXX.XXX.XXX-XX`) with valid check digits.
pub fn random_cpf(rng: &mut impl Rng) -> String {
    loop {
        let mut digits = [0u8; 11];
        for d in digits.iter_mut().take(9) {
            *d = rng.random_range(0..10);
        }
        // repeated-digit numbers pass the checksum but are not valid CPFs
        if digits[..9].iter().all(|&d| d == digits[0]) {
            continue;
        }
        digits[9] = cpf_check_digit(&digits[..9]);
        digits[10] = cpf_check_digit(&digits[..10]);
        return format_cpf(&digits);
    }
}

/// Check digit over `digits`, with weights counting down to 2.
fn cpf_check_digit(digits: &[u8]) -> u8 {
    let top = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| u32::from(d) * (top - i as u32))
        .sum();
    match sum % 11 {
        r if r < 2 => 0,
        r => (11 - r) as u8,
    }
}

fn format_cpf(digits: &[u8; 11]) -> String {
    let s: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
    format!("{}.{}.{}-{}", &s[0..3], &s[3..6], &s[6..9], &s[9..11])
}

/// Whether a formatted or bare CPF has valid check digits.
pub fn is_valid_cpf(cpf: &str) -> bool {
    let digits: Vec<u8> = cpf
        .chars()
        .filter(|c| c.is_ascii_digit())
        .map(|c| c as u8 - b'0')
        .collect();
    if digits.len() != 11 || digits.iter().all(|&d| d == digits[0]) {
        return false;
    }
    cpf_check_digit(&digits[..9]) == digits[9] && cpf_check_digit(&digits[..10]) == digits[10]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_cpf() {
        assert!(is_valid_cpf("529.982.247-25"));
        assert!(!is_valid_cpf("529.982.247-24"));
        assert!(!is_valid_cpf("111.111.111-11"));
        assert!(!is_valid_cpf("123"));
    }

    #[test]
    fn test_generated_cpfs_are_valid() {
        let mut rng = rand::rng();
        for _ in 0..500 {
            let cpf = random_cpf(&mut rng);
            assert_eq!(cpf.len(), 14);
            assert!(is_valid_cpf(&cpf), "{cpf}");
        }
    }

    #[test]
    fn test_payer_has_two_part_name() {
        let payer = RandomPayers.payer();
        assert_eq!(payer.name.split(' ').count(), 2);
        assert!(is_valid_cpf(&payer.tax_id));
    }
}
