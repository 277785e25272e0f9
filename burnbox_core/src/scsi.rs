/*!
# Burnbox: SCSI Transport
*/

pub(super) mod cdio;
#[cfg(test)] pub(crate) mod mock;

use crate::BurnError;
use std::{
	fmt,
	time::Duration,
};



#[derive(Debug)]
/// # Data Direction.
///
/// This pairs a command with the buffer (if any) it reads into or writes
/// from.
pub enum DataDir<'a> {
	/// # No Data.
	None,

	/// # Device to Host.
	In(&'a mut [u8]),

	/// # Host to Device.
	Out(&'a [u8]),
}

impl DataDir<'_> {
	#[must_use]
	/// # Length.
	pub fn len(&self) -> usize {
		match self {
			Self::None => 0,
			Self::In(b) => b.len(),
			Self::Out(b) => b.len(),
		}
	}

	#[must_use]
	/// # Is Empty?
	pub fn is_empty(&self) -> bool { self.len() == 0 }
}



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Sense Data.
///
/// The key, additional sense code, and qualifier of a failed command.
pub struct Sense {
	/// # Sense Key.
	pub key: u8,

	/// # Additional Sense Code.
	pub asc: u8,

	/// # Additional Sense Code Qualifier.
	pub ascq: u8,
}

impl fmt::Display for Sense {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:X}/{:02X}/{:02X}", self.key, self.asc, self.ascq)
	}
}

impl Sense {
	#[must_use]
	/// # Parse.
	///
	/// Both fixed (`0x70`/`0x71`) and descriptor (`0x72`/`0x73`) formats are
	/// understood.
	pub fn parse(raw: &[u8]) -> Option<Self> {
		match raw.first()? & 0x7F {
			0x70 | 0x71 if 14 <= raw.len() => Some(Self {
				key: raw[2] & 0x0F,
				asc: raw[12],
				ascq: raw[13],
			}),
			0x72 | 0x73 if 4 <= raw.len() => Some(Self {
				key: raw[1] & 0x0F,
				asc: raw[2],
				ascq: raw[3],
			}),
			_ => None,
		}
	}

	#[must_use]
	/// # Long Write in Progress?
	///
	/// The drive's buffer is full; the command should be retried shortly.
	pub const fn is_long_write_in_progress(self) -> bool {
		self.key == 2 && self.asc == 4 && self.ascq == 8
	}

	#[must_use]
	/// # Not Ready?
	pub const fn is_not_ready(self) -> bool { self.key == 2 }

	#[must_use]
	/// # No Medium?
	pub const fn is_no_medium(self) -> bool { self.key == 2 && self.asc == 0x3A }

	#[must_use]
	/// # Unit Attention?
	pub const fn is_unit_attention(self) -> bool { self.key == 6 }
}



#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// # Hardware Info.
pub struct HwInfo {
	/// # Vendor.
	pub vendor: String,

	/// # Model.
	pub model: String,

	/// # Firmware Revision.
	pub revision: String,
}

impl fmt::Display for HwInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.vendor.is_empty() { write!(f, "{} ({})", self.model, self.revision) }
		else { write!(f, "{} {} ({})", self.vendor, self.model, self.revision) }
	}
}



/// # SCSI Transport.
///
/// This is the seam between the MMC driver and the operating system. An
/// implementation sends a single command descriptor block, moving data in
/// the given direction, and reports failures as [`BurnError::Scsi`].
pub trait ScsiTransport {
	/// # Send Command.
	///
	/// ## Errors
	///
	/// Returns [`BurnError::Scsi`] (with sense data, if any) when the command
	/// fails.
	fn send(&mut self, cdb: &[u8], dir: DataDir<'_>) -> Result<(), BurnError>;

	/// # Maximum Transfer (Bytes).
	fn max_transfer(&self) -> usize;

	/// # Command Timeout.
	fn timeout(&self) -> Duration;

	/// # Set Command Timeout.
	fn set_timeout(&mut self, timeout: Duration);

	/// # Hardware Info.
	fn hw_info(&self) -> Option<HwInfo>;
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_sense() {
		let mut fixed = [0_u8; 18];
		fixed[0] = 0x70;
		fixed[2] = 0x02;
		fixed[12] = 0x04;
		fixed[13] = 0x08;
		let sense = Sense::parse(&fixed).expect("Fixed sense failed.");
		assert!(sense.is_long_write_in_progress());
		assert!(sense.is_not_ready());
		assert_eq!(sense.to_string(), "2/04/08");

		let desc = [0x72, 0x06, 0x28, 0x00, 0, 0, 0, 0];
		let sense = Sense::parse(&desc).expect("Descriptor sense failed.");
		assert!(sense.is_unit_attention());
		assert!(! sense.is_not_ready());

		assert_eq!(Sense::parse(&[]), None);
		assert_eq!(Sense::parse(&[0x70, 0, 2]), None, "Truncated.");
		assert_eq!(Sense::parse(&[0x00; 18]), None, "Unknown format.");
	}
}
