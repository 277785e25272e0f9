/*!
# Burnbox: Binary-Coded Decimal
*/



#[must_use]
/// # Encode BCD.
///
/// Pack a decimal value between `0..=99` into a single BCD byte. Larger values
/// are not representable; only their last two digits survive.
pub const fn bcd(d: u8) -> u8 {
	let d = d % 100;
	((d / 10) << 4) | (d % 10)
}

#[must_use]
/// # Decode BCD.
///
/// This reverses [`bcd`], except when either nibble is greater than nine, in
/// which case the byte is returned unchanged. Sub-channel data is noisy, and
/// the raw TOC encoding detection relies on being able to tell the two cases
/// apart (see [`is_bcd`]).
pub const fn bcd2int(b: u8) -> u8 {
	if is_bcd(b) { (b >> 4) * 10 + (b & 0x0F) }
	else { b }
}

#[must_use]
/// # Valid BCD?
///
/// Returns `true` if both nibbles are decimal digits.
pub const fn is_bcd(b: u8) -> bool { (b >> 4) <= 9 && (b & 0x0F) <= 9 }
