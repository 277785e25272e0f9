/*!
# Burnbox: Catalog Numbers
*/

use crate::BurnError;
use std::fmt;
use trimothy::TrimSliceMatches;



#[derive(Debug, Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
/// # Barcode.
///
/// This is the disc's Media Catalog Number, a UPC/EAN barcode stored as
/// thirteen ASCII digits.
///
/// It ends up in three places: the cue sheet (as ASCII), mode-2 Q sub-channel
/// frames (as packed BCD), and the CD-TEXT UPC/EAN pack.
pub struct Barcode([u8; 13]);

impl fmt::Display for Barcode {
	#[allow(unsafe_code)]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// Safety: all values are ASCII digits.
		let s = unsafe { std::str::from_utf8_unchecked(self.0.as_slice()) };
		f.write_str(s)
	}
}

impl TryFrom<&[u8]> for Barcode {
	type Error = BurnError;
	fn try_from(mut src: &[u8]) -> Result<Self, Self::Error> {
		// Remove whitespace and trailing nulls.
		src = src.trim_ascii_start();
		while let [rest @ .., last] = src {
			if *last == 0 || last.is_ascii_whitespace() { src = rest; }
			else { break; }
		}

		// UPC-A is twelve digits; EAN-13 thirteen. Nothing else will fit.
		if ! (12..=13).contains(&src.len()) || ! src.iter().all(u8::is_ascii_digit) {
			return Err(BurnError::Barcode);
		}

		// An all-zero catalog is how drives say "there isn't one".
		if src.iter().all(|&b| b == b'0') { return Err(BurnError::Barcode); }

		let mut maybe = [b'0'; 13];
		maybe[13 - src.len()..].copy_from_slice(src);

		if is_ean13(&maybe) { Ok(Self(maybe)) }
		else { Err(BurnError::Barcode) }
	}
}

impl TryFrom<&str> for Barcode {
	type Error = BurnError;

	#[inline]
	fn try_from(src: &str) -> Result<Self, Self::Error> {
		Self::try_from(src.as_bytes())
	}
}

impl Barcode {
	/// # From Q Sub-Channel.
	///
	/// Decode the thirteen BCD digits packed into bytes `1..8` of a mode-2 Q
	/// frame.
	///
	/// ## Errors
	///
	/// Returns an error if any nibble is not a decimal digit or the result is
	/// not a valid barcode.
	pub fn from_q(q: &[u8]) -> Result<Self, BurnError> {
		let raw = q.get(1..8).ok_or(BurnError::Barcode)?;
		let mut out = [b'0'; 13];
		for (i, digit) in out.iter_mut().enumerate() {
			let byte = raw[i / 2];
			let nibble =
				if 0 == i & 1 { byte >> 4 }
				else { byte & 0x0F };
			if 9 < nibble { return Err(BurnError::Barcode); }
			*digit = b'0' + nibble;
		}

		Self::try_from(out.as_slice())
	}

	#[must_use]
	/// # As Bytes.
	pub const fn as_bytes(&self) -> &[u8; 13] { &self.0 }

	#[must_use]
	/// # To Q Payload.
	///
	/// Pack the digits two-per-byte for a mode-2 Q frame. The fourteenth
	/// nibble is always zero.
	pub fn to_q(&self) -> [u8; 7] {
		let mut out = [0_u8; 7];
		for (i, d) in self.0.iter().map(|b| b ^ b'0').enumerate() {
			if 0 == i & 1 { out[i / 2] |= d << 4; }
			else { out[i / 2] |= d; }
		}
		out
	}

	#[must_use]
	/// # Digit.
	///
	/// Return an individual digit as a number, mostly for testing.
	pub fn digit(&self, idx: usize) -> Option<u8> {
		self.0.get(idx).map(|b| b ^ b'0')
	}
}



/// # Is EAN13?
fn is_ean13(src: &[u8; 13]) -> bool {
	let mut chk = 0;
	let mut total = 0;
	let mut k = 13;
	for num in src.iter().copied().rev() {
		k -= 1;

		// Convert ASCII to decimal. (TryFrom verifies all values are digits.)
		let num = num ^ b'0';

		// The last entry (the first we're checking) is the check digit.
		if k == 12 { chk = num; }
		// Everything else goes into the total.
		else { total += ((k % 2) * 2 + 1) * u32::from(num); }
	}

	(10 - (total % 10)) % 10 == u32::from(chk)
}
