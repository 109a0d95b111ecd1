use crate::error::{Error, DappResult};
use error_stack::report;
use swap_models::uint::U256;

/// Largest precision whose scale factor still fits in 256 bits.
const MAX_DECIMALS: u8 = 77;

/// Converts a human amount (`"1.5"`) into base units for a token with
/// `decimals` precision. Fraction digits beyond the precision are
/// truncated.
pub fn parse_units(amount: &str, decimals: u8) -> DappResult<U256> {
    if decimals > MAX_DECIMALS {
        return Err(report!(Error::ParseError)
            .attach_printable(format!("Unsupported token precision {decimals}")));
    }
    let amount = amount.trim();
    let (integer_part, fraction_part) = match amount.split_once('.') {
        Some((integer, fraction)) => (integer, fraction),
        None => (amount, ""),
    };
    if (integer_part.is_empty() && fraction_part.is_empty())
        || !integer_part.chars().all(|c| c.is_ascii_digit())
        || !fraction_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(report!(Error::ParseError)
            .attach_printable(format!("Invalid amount \"{amount}\"")));
    }

    let decimals = usize::from(decimals);
    let fraction = &fraction_part[..fraction_part.len().min(decimals)];
    let digits = format!("{integer_part}{fraction:0<decimals$}");

    U256::from_dec_str(&digits).map_err(|e| {
        report!(Error::ParseError).attach_printable(format!("Amount \"{amount}\" out of range: {e:?}"))
    })
}

/// Renders base units with the token precision, trimming trailing zeros:
/// `9950000` with 6 decimals is `"9.95"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{digits:0>width$}", width = decimals + 1)
    } else {
        digits
    };
    let (integer_part, fraction_part) = padded.split_at(padded.len() - decimals);
    let fraction_part = fraction_part.trim_end_matches('0');

    if fraction_part.is_empty() {
        integer_part.to_string()
    } else {
        format!("{integer_part}.{fraction_part}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(
            parse_units("10", 18).unwrap(),
            U256::from(10_000_000_000_000_000_000u128)
        );
        assert_eq!(parse_units("9.95", 6).unwrap(), U256::from(9_950_000u64));
        assert_eq!(parse_units(".5", 6).unwrap(), U256::from(500_000u64));
        assert_eq!(parse_units("5.", 2).unwrap(), U256::from(500u64));
        assert_eq!(parse_units("0", 6).unwrap(), U256::zero());
        assert_eq!(parse_units(" 7 ", 0).unwrap(), U256::from(7u64));
    }

    #[test]
    fn test_parse_units_truncates_extra_precision() {
        assert_eq!(parse_units("1.2345678", 6).unwrap(), U256::from(1_234_567u64));
        assert_eq!(parse_units("1.9", 0).unwrap(), U256::from(1u64));
    }

    #[test]
    fn test_parse_units_rejects_garbage() {
        for input in ["", ".", "-1", "1.2.3", "1e18", "abc", "1,5"] {
            assert!(parse_units(input, 18).is_err(), "{input} should fail");
        }
        assert!(parse_units("1", 78).is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(9_950_000u64), 6), "9.95");
        assert_eq!(format_units(U256::from(10_000_000u64), 6), "10");
        assert_eq!(format_units(U256::from(1u64), 6), "0.000001");
        assert_eq!(format_units(U256::zero(), 18), "0");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
        assert_eq!(
            format_units(U256::from(1_500_000_000_000_000_000u128), 18),
            "1.5"
        );
    }

    #[test]
    fn test_format_then_parse_is_stable() {
        let raw = U256::from(123_456_789u64);
        assert_eq!(parse_units(&format_units(raw, 8), 8).unwrap(), raw);
    }
}
