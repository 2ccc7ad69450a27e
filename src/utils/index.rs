/// Render a fixed-point integer amount, e.g. wei with 18 decimals, without trailing zeros.
pub fn format_token_amount(amount: u128, decimals: u32) -> String {
    let scale = 10u128.pow(decimals);
    let whole = amount / scale;
    let fraction = amount % scale;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", fraction, width = decimals as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Render a wei amount in ETH.
pub fn format_eth(wei: u128) -> String {
    format!("{} ETH", format_token_amount(wei, 18))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_fractional_amounts() {
        assert_eq!(format_token_amount(1_500_000, 6), "1.5");
        assert_eq!(format_token_amount(42, 6), "0.000042");
        assert_eq!(format_token_amount(3_000_000, 6), "3");
    }

    #[test]
    fn formats_wei_as_eth() {
        assert_eq!(format_eth(10_000_000_000_000_000), "0.01 ETH");
        assert_eq!(format_eth(0), "0 ETH");
    }
}
