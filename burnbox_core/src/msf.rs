/*!
# Burnbox: Minute/Second/Frame
*/

use crate::{
	bcd,
	bcd2int,
	CD_LEADIN,
	FRAMES_PER_SECOND,
};
use std::{
	fmt,
	ops::{
		Add,
		Sub,
	},
};



/// # Frames Per Minute.
const FRAMES_PER_MINUTE: u32 = FRAMES_PER_SECOND * 60;

/// # ATIP Negative Wrap.
///
/// Lead-in positions reported by ATIP (minutes ≥ 90) are negative addresses
/// folded into the top of the 100-minute range.
const ATIP_WRAP: i32 = 450_000;



#[derive(Debug, Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
/// # Minute/Second/Frame.
///
/// This holds a CD time as a raw frame count, where frame zero corresponds to
/// LBA `-150`, i.e. the very start of the program area's mandatory two-second
/// pause.
///
/// The same type doubles as a duration when built with [`Msf::from_frames`],
/// e.g. for pre-gap lengths and index offsets.
///
/// ```
/// use burnbox_core::Msf;
///
/// let msf = Msf::from_lba(0);
/// assert_eq!(msf.to_string(), "00:02:00");
/// assert_eq!(msf.lba(), 0);
///
/// let msf = Msf::new(1, 0, 0);
/// assert_eq!(msf.frames(), 4500);
/// assert_eq!(msf.lba(), 4350);
/// ```
pub struct Msf(u32);

impl Add for Msf {
	type Output = Self;
	#[inline]
	fn add(self, rhs: Self) -> Self { Self(self.0.saturating_add(rhs.0)) }
}

impl Sub for Msf {
	type Output = Self;
	#[inline]
	fn sub(self, rhs: Self) -> Self { Self(self.0.saturating_sub(rhs.0)) }
}

impl fmt::Display for Msf {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:02}:{:02}:{:02}", Self::min(*self), self.sec(), self.frac())
	}
}

impl Msf {
	#[must_use]
	/// # New (M, S, F).
	///
	/// Seconds and frames are not range-checked; overflowing values simply
	/// carry into the next unit.
	pub const fn new(min: u8, sec: u8, frac: u8) -> Self {
		Self(
			min as u32 * FRAMES_PER_MINUTE +
			sec as u32 * FRAMES_PER_SECOND +
			frac as u32
		)
	}

	#[must_use]
	/// # From Frames.
	pub const fn from_frames(frames: u32) -> Self { Self(frames) }

	#[must_use]
	#[allow(clippy::cast_sign_loss)]
	/// # From LBA.
	///
	/// Addresses below `-150` have no MSF representation and are clamped to
	/// `00:00:00`.
	pub const fn from_lba(lba: i32) -> Self {
		let frames = lba + CD_LEADIN;
		if frames < 0 { Self(0) }
		else { Self(frames as u32) }
	}

	#[must_use]
	/// # From BCD.
	///
	/// Decode three BCD bytes, as found in Q sub-channel and raw TOC entries.
	pub const fn from_bcd(min: u8, sec: u8, frac: u8) -> Self {
		Self::new(bcd2int(min), bcd2int(sec), bcd2int(frac))
	}

	#[must_use]
	#[allow(clippy::cast_possible_wrap)]
	/// # ATIP/Lead-in LBA.
	///
	/// Convert a raw (m, s, f) triple into an address the way drives report
	/// lead-in positions: values at or past minute 90 wrap around to
	/// negative addresses.
	pub const fn lead_in_lba(min: u8, sec: u8, frac: u8) -> i32 {
		let frames = Self::new(min, sec, frac).0 as i32;
		if 90 <= min { frames - ATIP_WRAP - CD_LEADIN }
		else { frames - CD_LEADIN }
	}
}

impl Msf {
	#[must_use]
	/// # Total Frames.
	pub const fn frames(self) -> u32 { self.0 }

	#[must_use]
	#[allow(clippy::cast_possible_wrap)]
	/// # LBA.
	pub const fn lba(self) -> i32 { self.0 as i32 - CD_LEADIN }

	#[must_use]
	#[allow(clippy::cast_possible_truncation)]
	/// # Minutes.
	///
	/// Values above `255` minutes are truncated, but nothing on a CD comes
	/// close.
	pub const fn min(self) -> u8 { (self.0 / FRAMES_PER_MINUTE) as u8 }

	#[must_use]
	#[allow(clippy::cast_possible_truncation)]
	/// # Seconds.
	pub const fn sec(self) -> u8 { ((self.0 / FRAMES_PER_SECOND) % 60) as u8 }

	#[must_use]
	#[allow(clippy::cast_possible_truncation)]
	/// # Frames.
	pub const fn frac(self) -> u8 { (self.0 % FRAMES_PER_SECOND) as u8 }

	#[must_use]
	/// # As BCD Triple.
	pub const fn to_bcd(self) -> [u8; 3] {
		[bcd(self.min()), bcd(self.sec()), bcd(self.frac())]
	}

	#[must_use]
	/// # As Binary Triple.
	pub const fn to_array(self) -> [u8; 3] { [self.min(), self.sec(), self.frac()] }
}
