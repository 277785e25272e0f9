/*!
# Burnbox: ISRC
*/

use crate::BurnError;
use std::fmt;
use trimothy::TrimSlice;



#[derive(Debug, Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
/// # International Standard Recording Code.
///
/// This holds the twelve ASCII characters of an ISRC, without dashes:
///
/// | Part | Chars | Content |
/// | ---- | ----- | ------- |
/// | Country | 2 | `A-Z0-9` |
/// | Owner | 3 | `A-Z0-9` |
/// | Year | 2 | `0-9` |
/// | Designation | 5 | `0-9` |
///
/// ```
/// use burnbox_core::Isrc;
///
/// let isrc = Isrc::try_from("US-ABC-99-00001").unwrap();
/// assert_eq!(isrc.to_string(), "US-ABC-99-00001");
/// assert_eq!(isrc.as_bytes(), b"USABC9900001");
/// ```
pub struct Isrc([u8; 12]);

impl fmt::Display for Isrc {
	#[allow(unsafe_code)]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// Safety: all values are ASCII alphanumerics.
		let s = unsafe { std::str::from_utf8_unchecked(self.0.as_slice()) };
		write!(f, "{}-{}-{}-{}", &s[..2], &s[2..5], &s[5..7], &s[7..])
	}
}

impl TryFrom<&[u8]> for Isrc {
	type Error = BurnError;

	fn try_from(src: &[u8]) -> Result<Self, Self::Error> {
		let mut out = [0_u8; 12];
		let mut len = 0;
		for &b in src.trim_ascii() {
			if b == b'-' { continue; }
			if len == 12 { return Err(BurnError::Isrc); }
			out[len] = b.to_ascii_uppercase();
			len += 1;
		}

		if
			len == 12 &&
			out[..5].iter().all(u8::is_ascii_alphanumeric) &&
			out[5..].iter().all(u8::is_ascii_digit)
		{
			Ok(Self(out))
		}
		else { Err(BurnError::Isrc) }
	}
}

impl TryFrom<&str> for Isrc {
	type Error = BurnError;

	#[inline]
	fn try_from(src: &str) -> Result<Self, Self::Error> {
		Self::try_from(src.as_bytes())
	}
}

impl Isrc {
	/// # From Q Sub-Channel.
	///
	/// Decode bytes `1..9` of a mode-3 Q frame: five six-bit characters, two
	/// padding bits, then seven BCD digits.
	///
	/// ## Errors
	///
	/// Returns an error if the payload is short or does not decode to a valid
	/// code.
	pub fn from_q(q: &[u8]) -> Result<Self, BurnError> {
		let q = q.get(1..9).ok_or(BurnError::Isrc)?;
		let mut out = [0_u8; 12];

		// The characters.
		let bits = u32::from_be_bytes([q[0], q[1], q[2], q[3]]);
		for (i, v) in out[..5].iter_mut().enumerate() {
			#[allow(clippy::cast_possible_truncation)]
			let code = ((bits >> (26 - 6 * i)) & 0x3F) as u8;
			*v = from_six(code).ok_or(BurnError::Isrc)?;
		}

		// The digits.
		for (i, v) in out[5..].iter_mut().enumerate() {
			let byte = q[4 + i / 2];
			let nibble =
				if 0 == i & 1 { byte >> 4 }
				else { byte & 0x0F };
			if 9 < nibble { return Err(BurnError::Isrc); }
			*v = b'0' + nibble;
		}

		Self::try_from(out.as_slice())
	}

	#[must_use]
	/// # As Bytes.
	pub const fn as_bytes(&self) -> &[u8; 12] { &self.0 }

	#[must_use]
	/// # To Q Payload.
	///
	/// This is the inverse of [`Isrc::from_q`], returning the eight bytes
	/// that occupy positions `1..9` of a mode-3 Q frame.
	pub fn to_q(&self) -> [u8; 8] {
		let mut bits = 0_u32;
		for (i, b) in self.0[..5].iter().copied().enumerate() {
			bits |= u32::from(to_six(b)) << (26 - 6 * i);
		}

		let mut out = [0_u8; 8];
		out[..4].copy_from_slice(&bits.to_be_bytes());
		for (i, d) in self.0[5..].iter().map(|b| b ^ b'0').enumerate() {
			if 0 == i & 1 { out[4 + i / 2] |= d << 4; }
			else { out[4 + i / 2] |= d; }
		}
		out
	}
}



/// # To Six-Bit Code.
///
/// Digits map to `0x00..=0x09`, letters to `0x11..=0x2A`.
const fn to_six(b: u8) -> u8 {
	if b.is_ascii_digit() { b - b'0' }
	else { b - b'A' + 0x11 }
}

/// # From Six-Bit Code.
const fn from_six(code: u8) -> Option<u8> {
	match code {
		0x00..=0x09 => Some(b'0' + code),
		0x11..=0x2A => Some(b'A' + code - 0x11),
		_ => None,
	}
}
