/*!
# Burnbox: Driver Selection
*/

use crate::HwInfo;
use std::fmt;



include!(concat!(env!("OUT_DIR"), "/drivers.rs"));



#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
/// # Driver Kind.
///
/// The two flavors differ in who synthesizes the sub-channel: the drive
/// (session-at-once) or the host (raw).
pub enum DriverKind {
	#[default]
	/// # Generic MMC (Write Type 2).
	Mmc,

	/// # Generic MMC Raw (Write Type 3).
	MmcRaw,
}

impl fmt::Display for DriverKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl DriverKind {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Mmc => "generic-mmc",
			Self::MmcRaw => "generic-mmc-raw",
		}
	}

	#[must_use]
	/// # From Name.
	pub fn from_name(src: &str) -> Option<Self> {
		match src.trim() {
			"generic-mmc" | "mmc" => Some(Self::Mmc),
			"generic-mmc-raw" | "mmc-raw" | "raw" => Some(Self::MmcRaw),
			_ => None,
		}
	}

	#[must_use]
	/// # Write Type (Page 0x05).
	pub const fn write_type(self) -> u8 {
		match self {
			Self::Mmc => 2,
			Self::MmcRaw => 3,
		}
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
/// # Driver Options.
///
/// An immutable bitmask of per-model quirks, chosen once when the driver is
/// created.
pub struct DriverOptions(u16);

impl DriverOptions {
	/// # The Drive Can Write CD-TEXT.
	pub const CD_TEXT: Self =           Self(0b0000_0000_0000_0001);

	/// # Read the TOC in MSF.
	pub const GET_TOC_GENERIC: Self =   Self(0b0000_0000_0000_0010);

	/// # Never Enable BURN-Proof.
	pub const NO_BURNPROOF: Self =      Self(0b0000_0000_0000_0100);

	/// # Don't Read CD-TEXT.
	pub const NO_CDTEXT_READ: Self =    Self(0b0000_0000_0000_1000);

	/// # Skip Optimum Power Calibration.
	pub const NO_OPC: Self =            Self(0b0000_0000_0001_0000);

	/// # Skip Pre-gap/Index Analysis When Reading.
	pub const NO_PREGAP_READ: Self =    Self(0b0000_0000_0010_0000);

	/// # Sub-Channel Can't Be Read With Audio.
	pub const NO_SUBCHAN_READ: Self =   Self(0b0000_0000_0100_0000);

	/// # Raw PQ Sub-Channel Is BCD.
	pub const PQ_BCD: Self =            Self(0b0000_0000_1000_0000);

	/// # Raw TOC Is BCD.
	pub const RAW_TOC_BCD: Self =       Self(0b0000_0001_0000_0000);

	/// # Raw TOC Is Hex.
	pub const RAW_TOC_HEX: Self =       Self(0b0000_0010_0000_0000);

	/// # Audio Samples Are Read Big Endian.
	pub const SWAP_READ_SAMPLES: Self = Self(0b0000_0100_0000_0000);

	/// # Raw Writes Use PQ16 (Block Type 1).
	pub const USE_PQ: Self =            Self(0b0000_1000_0000_0000);
}

impl DriverOptions {
	#[must_use]
	/// # Empty.
	pub const fn empty() -> Self { Self(0) }

	#[must_use]
	/// # Union.
	pub const fn union(self, other: Self) -> Self { Self(self.0 | other.0) }

	#[must_use]
	/// # Contains?
	pub const fn contains(self, other: Self) -> bool { other.0 == self.0 & other.0 }

	#[must_use]
	/// # Is Empty?
	pub const fn is_empty(self) -> bool { self.0 == 0 }

	#[must_use]
	/// # Names.
	///
	/// Return the names of the set options, for display.
	pub fn names(self) -> Vec<&'static str> {
		[
			(Self::CD_TEXT, "CD_TEXT"),
			(Self::GET_TOC_GENERIC, "GET_TOC_GENERIC"),
			(Self::NO_BURNPROOF, "NO_BURNPROOF"),
			(Self::NO_CDTEXT_READ, "NO_CDTEXT_READ"),
			(Self::NO_OPC, "NO_OPC"),
			(Self::NO_PREGAP_READ, "NO_PREGAP_READ"),
			(Self::NO_SUBCHAN_READ, "NO_SUBCHAN_READ"),
			(Self::PQ_BCD, "PQ_BCD"),
			(Self::RAW_TOC_BCD, "RAW_TOC_BCD"),
			(Self::RAW_TOC_HEX, "RAW_TOC_HEX"),
			(Self::SWAP_READ_SAMPLES, "SWAP_READ_SAMPLES"),
			(Self::USE_PQ, "USE_PQ"),
		]
			.into_iter()
			.filter_map(|(o, n)| self.contains(o).then_some(n))
			.collect()
	}
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Driver Table Entry.
pub(crate) struct DriverEntry {
	pub(crate) vendor: &'static str,
	pub(crate) model: &'static str,
	pub(crate) kind: DriverKind,
	pub(crate) options: DriverOptions,
}

/// # Select Driver.
///
/// Look up the kind and options for a drive. Vendors must match exactly
/// (ignoring case and padding); the longest matching model substring wins,
/// the earliest entry breaking ties.
pub(crate) fn select(hw: &HwInfo) -> (DriverKind, DriverOptions) {
	select_from(&DRIVER_TABLE, hw)
		.map_or((DriverKind::Mmc, DriverOptions::empty()), |e| (e.kind, e.options))
}

/// # Select From Table.
fn select_from<'a>(table: &'a [DriverEntry], hw: &HwInfo) -> Option<&'a DriverEntry> {
	let vendor = hw.vendor.trim().to_ascii_uppercase();
	let model = hw.model.to_ascii_uppercase();

	let mut best: Option<&DriverEntry> = None;
	for e in table {
		if e.vendor == vendor && model.contains(e.model) &&
			best.map_or(true, |b| b.model.len() < e.model.len())
		{
			best.replace(e);
		}
	}
	best
}
