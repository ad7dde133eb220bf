//! Synthetic field values

use obsgraph_core::{RandomSource, MAX_SEVERITY};

/// Relative weight of each severity 0..=10; low severities dominate.
pub const SEVERITY_WEIGHTS: [f64; 11] = [10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0, 0.5];

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bruno", "Chiara", "Dmitri", "Elena", "Farid", "Grace", "Hiro", "Ines", "Jonas",
    "Keiko", "Liam", "Marta", "Nadia", "Oscar", "Priya", "Quentin", "Rosa", "Sven", "Tariq",
    "Uma", "Victor", "Wen", "Ximena", "Yusuf", "Zoe",
];

const LAST_NAMES: &[&str] = &[
    "Abbott", "Bianchi", "Castro", "Dubois", "Eriksen", "Fischer", "Garcia", "Haddad", "Ito",
    "Jensen", "Kowalski", "Larsen", "Moreau", "Nakamura", "Okafor", "Petrov", "Quinn", "Rossi",
    "Silva", "Tanaka", "Ueda", "Varga", "Weber", "Yamada", "Zhang",
];

const TLDS: &[&str] = &["com", "net", "org", "io", "gov", "edu", "co", "info"];

const CONSONANTS: &[&str] = &[
    "b", "c", "d", "f", "g", "h", "j", "k", "l", "m", "n", "p", "r", "s", "t", "v", "w", "z",
];

const VOWELS: &[&str] = &["a", "e", "i", "o", "u"];

pub fn severity<R: RandomSource + ?Sized>(rng: &mut R) -> u8 {
    let total: f64 = SEVERITY_WEIGHTS.iter().sum();
    let mut target = rng.next_f64() * total;
    for (severity, weight) in SEVERITY_WEIGHTS.iter().enumerate() {
        if target < *weight {
            return severity as u8;
        }
        target -= weight;
    }
    MAX_SEVERITY
}

pub fn ip<R: RandomSource + ?Sized>(rng: &mut R) -> String {
    let octets: Vec<String> = (0..4).map(|_| rng.below(256).to_string()).collect();
    octets.join(".")
}

pub fn name<R: RandomSource + ?Sized>(rng: &mut R) -> String {
    let first = FIRST_NAMES[rng.below(FIRST_NAMES.len())];
    let last = LAST_NAMES[rng.below(LAST_NAMES.len())];
    format!("{} {}", first, last)
}

/// Pronounceable lowercase word of two or three syllables
pub fn word<R: RandomSource + ?Sized>(rng: &mut R) -> String {
    let syllables = 2 + rng.below(2);
    let mut word = String::with_capacity(syllables * 2);
    for _ in 0..syllables {
        word.push_str(CONSONANTS[rng.below(CONSONANTS.len())]);
        word.push_str(VOWELS[rng.below(VOWELS.len())]);
    }
    word
}

pub fn domain<R: RandomSource + ?Sized>(rng: &mut R) -> String {
    let stem = word(rng);
    format!("{}.{}", stem, TLDS[rng.below(TLDS.len())])
}

pub fn url<R: RandomSource + ?Sized>(rng: &mut R) -> String {
    let host = domain(rng);
    format!("http://{}/{}", host, word(rng))
}

pub fn email<R: RandomSource + ?Sized>(rng: &mut R) -> String {
    let user = word(rng);
    format!("{}@{}", user, domain(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use obsgraph_core::{RngSource, SequenceSource};

    #[test]
    fn test_severity_buckets() {
        assert_eq!(severity(&mut SequenceSource::constant(0.0)), 0);
        // 10 / 55.5 is the upper edge of severity 0
        assert_eq!(severity(&mut SequenceSource::constant(0.19)), 1);
        assert_eq!(severity(&mut SequenceSource::constant(0.999)), 10);
    }

    #[test]
    fn test_severity_favours_low_values() {
        let mut rng = RngSource::seeded(3);
        let draws: Vec<u8> = (0..2000).map(|_| severity(&mut rng)).collect();
        let low = draws.iter().filter(|&&s| s <= 2).count();
        let high = draws.iter().filter(|&&s| s >= 8).count();

        assert!(draws.iter().all(|&s| s <= MAX_SEVERITY));
        assert!(low > high * 3);
    }

    #[test]
    fn test_value_shapes() {
        let mut rng = RngSource::seeded(11);

        let ip = ip(&mut rng);
        assert_eq!(ip.split('.').count(), 4);
        assert!(ip.split('.').all(|o| o.parse::<u8>().is_ok()));

        assert!(name(&mut rng).contains(' '));
        assert!(domain(&mut rng).contains('.'));
        assert!(url(&mut rng).starts_with("http://"));

        let email = email(&mut rng);
        let (user, host) = email.split_once('@').unwrap();
        assert!(!user.is_empty());
        assert!(host.contains('.'));
    }
}
