//!
//! Kaspa value formatting and parsing utilities.
//!

use crate::error::Error;
use crate::result::Result;
use kaspa_addresses::Address;
use kaspa_consensus_core::constants::*;
use kaspa_consensus_core::network::NetworkType;
use separator::{separated_float, separated_int, separated_uint_with_output, Separatable};
use workflow_log::style;

/// Parses a decimal KAS string into sompi. Returns `None` for an empty string.
pub fn try_kaspa_str_to_sompi<S: Into<String>>(s: S) -> Result<Option<u64>> {
    let s: String = s.into();
    let amount = s.trim();
    if amount.is_empty() {
        return Ok(None);
    }

    Ok(Some(str_to_sompi(amount)?))
}

#[inline]
pub fn sompi_to_kaspa(sompi: u64) -> f64 {
    sompi as f64 / SOMPI_PER_KASPA as f64
}

#[inline]
pub fn kaspa_to_sompi(kaspa: f64) -> u64 {
    (kaspa * SOMPI_PER_KASPA as f64) as u64
}

#[inline]
pub fn sompi_to_kaspa_string(sompi: u64) -> String {
    sompi_to_kaspa(sompi).separated_string()
}

#[inline]
pub fn sompi_to_kaspa_string_with_trailing_zeroes(sompi: u64) -> String {
    separated_float!(format!("{:.8}", sompi_to_kaspa(sompi)))
}

#[inline]
pub fn sompi_to_kaspa_string_with_suffix(sompi: u64, network_type: &NetworkType) -> String {
    let kas = sompi_to_kaspa_string(sompi);
    let suffix = network_type.suffix();
    format!("{kas} {suffix}")
}

#[inline]
pub fn sompi_to_kaspa_string_with_trailing_zeroes_and_suffix(sompi: u64, network_type: &NetworkType) -> String {
    let kas = sompi_to_kaspa_string_with_trailing_zeroes(sompi);
    let suffix = network_type.suffix();
    format!("{kas} {suffix}")
}

/// Renders an address with the middle of its payload dimmed.
pub fn format_address_colors(address: &Address, range: Option<usize>) -> String {
    let address = address.to_string();

    let Some((prefix, payload)) = address.split_once(':') else {
        return address;
    };
    let range = range.unwrap_or(6);
    if payload.len() <= range * 2 {
        return format!("{}:{payload}", style(prefix).dim());
    }

    let left = &payload[0..range];
    let center = style(&payload[range..payload.len() - range]).dim();
    let right = &payload[payload.len() - range..];

    format!("{}:{left}:{center}:{right}", style(prefix).dim())
}

fn str_to_sompi(amount: &str) -> Result<u64> {
    let overflow = || Error::InvalidAmount(format!("{amount} exceeds the maximum representable amount"));

    let Some(dot_idx) = amount.find('.') else {
        return amount.parse::<u64>()?.checked_mul(SOMPI_PER_KASPA).ok_or_else(overflow);
    };
    let integer = if dot_idx == 0 { 0 } else { amount[..dot_idx].parse::<u64>()? };
    let integer = integer.checked_mul(SOMPI_PER_KASPA).ok_or_else(overflow)?;
    let decimal = &amount[dot_idx + 1..];
    let decimal_len = decimal.len();
    let decimal = if decimal_len == 0 {
        0
    } else if decimal_len <= 8 {
        if !decimal.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAmount(format!("{amount} is not a decimal number")));
        }
        decimal.parse::<u64>()? * 10u64.pow(8 - decimal_len as u32)
    } else {
        return Err(Error::InvalidAmount(format!("{amount} has more than 8 decimal places")));
    };
    integer.checked_add(decimal).ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kaspa_str_to_sompi() {
        assert_eq!(try_kaspa_str_to_sompi("").unwrap(), None);
        assert_eq!(try_kaspa_str_to_sompi("  ").unwrap(), None);
        assert_eq!(try_kaspa_str_to_sompi("1").unwrap(), Some(SOMPI_PER_KASPA));
        assert_eq!(try_kaspa_str_to_sompi("1.5").unwrap(), Some(150_000_000));
        assert_eq!(try_kaspa_str_to_sompi("0.00000001").unwrap(), Some(1));
        assert_eq!(try_kaspa_str_to_sompi(".25").unwrap(), Some(25_000_000));
        assert_eq!(try_kaspa_str_to_sompi("12.").unwrap(), Some(12 * SOMPI_PER_KASPA));

        assert!(matches!(try_kaspa_str_to_sompi("0.000000001"), Err(Error::InvalidAmount(_))));
        assert!(matches!(try_kaspa_str_to_sompi("1.+5"), Err(Error::InvalidAmount(_))));
        assert!(try_kaspa_str_to_sompi("abc").is_err());
        assert!(try_kaspa_str_to_sompi("999999999999999999").is_err());
    }

    #[test]
    fn test_sompi_formatting() {
        assert_eq!(sompi_to_kaspa(150_000_000), 1.5);
        assert_eq!(kaspa_to_sompi(2.5), 250_000_000);
        assert_eq!(sompi_to_kaspa_string_with_suffix(150_000_000, &NetworkType::Testnet), "1.5 TKAS");
        assert_eq!(sompi_to_kaspa_string_with_trailing_zeroes_and_suffix(100_000_000, &NetworkType::Mainnet), "1.00000000 KAS");
    }
}
