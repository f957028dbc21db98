use anyhow::{Result, bail};

/// Split a comma-separated CLI value, dropping blanks.
#[must_use]
pub fn split_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Resolve CLI seed tokens into numeric seeds.
///
/// Accepts decimal integers (negative values use their magnitude) and
/// `0x`-prefixed hex. Duplicates are dropped while keeping the first
/// occurrence's position.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds: Vec<u64> = Vec::new();
    for token in tokens {
        let seed = if let Some(hex) = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
        {
            u64::from_str_radix(hex, 16).ok()
        } else if let Ok(value) = token.parse::<i64>() {
            Some(value.unsigned_abs())
        } else {
            token.parse::<u64>().ok()
        };
        let Some(seed) = seed else {
            bail!("unrecognized seed '{token}'");
        };
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    }
    if seeds.is_empty() {
        bail!("no seeds provided");
    }
    Ok(seeds)
}

/// Seed for one iteration of a base seed; iteration zero is the base itself.
#[must_use]
pub const fn iteration_seed(base: u64, iteration: usize) -> u64 {
    base.wrapping_add((iteration as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_parse_decimal_hex_and_negative() {
        let tokens = split_csv("1337, 0xff,-5,,1337");
        assert_eq!(resolve_seed_inputs(&tokens).unwrap(), vec![1337, 255, 5]);
    }

    #[test]
    fn junk_seeds_are_rejected() {
        assert!(resolve_seed_inputs(&split_csv("abc")).is_err());
        assert!(resolve_seed_inputs(&[]).is_err());
    }

    #[test]
    fn iteration_seeds_spread_out() {
        assert_eq!(iteration_seed(7, 0), 7);
        assert_ne!(iteration_seed(7, 1), iteration_seed(7, 2));
    }
}
