//! Display formatting for token amounts.

/// Formats a base-unit integer amount with `places` fractional digits.
///
/// Rounds half up, matching how balances are shown on the dashboard
/// (`1234500000000000000` wei with 18 decimals and 4 places is `"1.2345"`).
pub fn format_units(value: u128, decimals: u8, places: usize) -> String {
	let decimals = u32::from(decimals);
	let places_u32 = u32::try_from(places).unwrap_or(u32::MAX).min(decimals);
	let drop = decimals - places_u32;

	let scaled = match 10u128.checked_pow(drop) {
		Some(divisor) if drop > 0 => value / divisor + u128::from(value % divisor >= divisor / 2),
		Some(_) => value,
		None => 0,
	};

	// Every u128 is below 10^39, so without a unit the whole part is zero.
	let (whole, frac) = match 10u128.checked_pow(places_u32) {
		Some(unit) => (scaled / unit, scaled % unit),
		None => (0, scaled),
	};
	let mut out = whole.to_string();
	if places > 0 {
		out.push('.');
		if places_u32 > 0 {
			out.push_str(&format!("{frac:0width$}", width = places_u32 as usize));
		}
		for _ in places_u32 as usize..places {
			out.push('0');
		}
	}
	out
}

/// Placeholder shown while a balance is unknown.
pub fn zero_amount(places: usize) -> String {
	format_units(0, 0, places)
}

#[cfg(test)]
mod tests {
	use super::*;

	const ETH: u128 = 1_000_000_000_000_000_000;

	#[test]
	fn four_places_of_ether() {
		assert_eq!(format_units(5 * ETH / 2, 18, 4), "2.5000");
		assert_eq!(format_units(1_234_500_000_000_000_000, 18, 4), "1.2345");
		assert_eq!(format_units(0, 18, 4), "0.0000");
	}

	#[test]
	fn rounds_half_up() {
		assert_eq!(format_units(1_234_550_000_000_000_000, 18, 4), "1.2346");
		assert_eq!(format_units(1_234_549_999_999_999_999, 18, 4), "1.2345");
		assert_eq!(format_units(999_950_000_000_000_000, 18, 4), "1.0000");
	}

	#[test]
	fn more_places_than_decimals_pads() {
		assert_eq!(format_units(1_500_000, 6, 8), "1.50000000");
		assert_eq!(format_units(42, 0, 2), "42.00");
	}

	#[test]
	fn huge_decimals_do_not_overflow() {
		assert_eq!(format_units(0, 40, 39), format!("0.{}", "0".repeat(39)));
		assert_eq!(format_units(5, 39, 39), format!("0.{}5", "0".repeat(38)));
		assert_eq!(format_units(u128::MAX, 200, 100), format!("0.{}", "0".repeat(100)));
	}

	#[test]
	fn zero_places_is_whole_units() {
		assert_eq!(format_units(2 * ETH, 18, 0), "2");
		assert_eq!(zero_amount(4), "0.0000");
	}
}
