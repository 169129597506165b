use anyhow::{Result, bail};

const DEFAULT_SEED: u64 = 1337;

/// Resolve CLI seed tokens into a deduplicated list, preserving order.
///
/// Negative integers map to their magnitude. An empty list falls back to the
/// default seed.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds: Vec<u64> = Vec::new();
    for token in tokens {
        let seed = if let Ok(value) = token.parse::<u64>() {
            value
        } else if let Ok(value) = token.parse::<i64>() {
            value.unsigned_abs()
        } else if let Some(hex) = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            && let Ok(value) = u64::from_str_radix(hex, 16)
        {
            value
        } else {
            bail!("Unrecognized seed token: {token}");
        };
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    }

    if seeds.is_empty() {
        seeds.push(DEFAULT_SEED);
    }
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_decimal_negative_and_hex() {
        let seeds = resolve_seed_inputs(&tokens(&["7", "-7", "0x10", "7"])).unwrap();
        assert_eq!(seeds, vec![7, 16]);
    }

    #[test]
    fn empty_input_uses_default_seed() {
        assert_eq!(resolve_seed_inputs(&[]).unwrap(), vec![DEFAULT_SEED]);
    }

    #[test]
    fn rejects_garbage() {
        let err = resolve_seed_inputs(&tokens(&["orange"])).unwrap_err();
        assert!(err.to_string().contains("orange"));
    }
}
