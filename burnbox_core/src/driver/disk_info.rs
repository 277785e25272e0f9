/*!
# Burnbox: Disk Info
*/

use crate::{
	BurnError,
	CdrDriver,
	DataDir,
	Msf,
	ScsiTransport,
};
use dactyl::NiceU32;
use std::fmt;



/// # ATIP Speed Codes (x).
const ATIP_SPEEDS: [u16; 8] = [0, 2, 4, 6, 8, 0, 0, 0];



#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
/// # Disk Status.
pub enum DiskStatus {
	#[default]
	/// # Blank.
	Empty,

	/// # Open for Another Session.
	Appendable,

	/// # Closed.
	Complete,

	/// # Something Else.
	Other,
}

impl fmt::Display for DiskStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl DiskStatus {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Empty => "empty",
			Self::Appendable => "appendable",
			Self::Complete => "complete",
			Self::Other => "other",
		}
	}

	/// # From Disc Information (Byte 2).
	const fn from_u8(src: u8) -> Self {
		match src & 0b11 {
			0 => Self::Empty,
			1 => Self::Appendable,
			2 => Self::Complete,
			_ => Self::Other,
		}
	}
}



#[derive(Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
/// # Disk Info.
///
/// A snapshot of the inserted medium. This is re-queried before every
/// session rather than cached.
pub struct DiskInfo {
	/// # Status.
	pub status: DiskStatus,

	/// # Rewritable?
	pub erasable: bool,

	/// # Complete Sessions.
	pub sessions: u8,

	/// # Last Track Number.
	///
	/// For appendable discs, this is the last track of the last complete
	/// session.
	pub last_track: u8,

	/// # Start of the Next Session's Program Area.
	pub this_session_lba: i32,

	/// # Remaining Capacity (Blocks).
	pub capacity: u32,

	/// # Manufacturer ID (ATIP Lead-in Start, Raw MSF).
	pub manufacturer_id: Option<[u8; 3]>,

	/// # Lead-in Start LBA (ATIP).
	pub lead_in_start: Option<i32>,

	/// # Last Possible Lead-out LBA (ATIP).
	pub lead_out_max: Option<i32>,

	/// # Recording Speed Range (Low, High).
	pub speeds: Option<(u16, u16)>,
}

impl fmt::Display for DiskInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "Status:        {}{}", self.status, if self.erasable { " (rewritable)" } else { "" })?;
		writeln!(f, "Sessions:      {}", self.sessions)?;
		writeln!(f, "Last Track:    {}", self.last_track)?;
		writeln!(f, "Next Session:  {}", self.this_session_lba)?;
		write!(
			f,
			"Capacity:      {} blocks ({})",
			NiceU32::from(self.capacity),
			Msf::from_frames(self.capacity),
		)?;
		if let Some([m, s, fr]) = self.manufacturer_id {
			write!(f, "\nManufacturer:  {m:02}:{s:02}:{fr:02}")?;
		}
		if let Some(lba) = self.lead_in_start {
			write!(f, "\nLead-in Start: {lba}")?;
		}
		if let Some((lo, hi)) = self.speeds {
			write!(f, "\nSpeeds:        {lo}x–{hi}x")?;
		}
		Ok(())
	}
}



impl<T: ScsiTransport> CdrDriver<T> {
	/// # Disk Info.
	///
	/// Query READ DISC INFORMATION, the ATIP (if any), and the next writable
	/// address.
	///
	/// ## Errors
	///
	/// Returns an error if the disc information can't be read.
	pub fn disk_info(&mut self) -> Result<DiskInfo, BurnError> {
		let mut buf = [0_u8; 34];
		self.send(&[0x51, 0, 0, 0, 0, 0, 0, 0, 34, 0], DataDir::In(&mut buf))?;

		let status = DiskStatus::from_u8(buf[2]);
		let erasable = 0 != buf[2] & 0b0001_0000;
		let count = buf[4];
		let first_last = buf[5];
		let last_last = buf[6];

		let mut info = DiskInfo {
			status,
			erasable,
			..DiskInfo::default()
		};

		match status {
			DiskStatus::Empty => {},
			DiskStatus::Appendable => {
				info.sessions = count.saturating_sub(1);
				info.last_track = first_last.saturating_sub(1);
			},
			DiskStatus::Complete | DiskStatus::Other => {
				info.sessions = count;
				info.last_track = last_last;
			},
		}

		// The lead-out limit for finalized discs comes from here; the ATIP
		// has the rest.
		if buf[21] != 0xFF {
			info.lead_out_max = Some(Msf::new(buf[21], buf[22], buf[23]).lba())
				.filter(|lba| 0 < *lba);
		}
		self.read_atip(&mut info);

		// The next writable address and free blocks.
		if matches!(status, DiskStatus::Empty | DiskStatus::Appendable) {
			if let Some((nwa, free)) = self.next_writable() {
				info.this_session_lba = nwa;
				info.capacity = free;
			}
			else if let Some(max) = info.lead_out_max {
				info.capacity = u32::try_from(max).unwrap_or_default();
			}
		}

		Ok(info)
	}

	/// # Read ATIP.
	///
	/// Pressed discs don't have one, so failures are quietly ignored.
	fn read_atip(&mut self, info: &mut DiskInfo) {
		let mut buf = [0_u8; 28];
		if self.send(&[0x43, 0x02, 0x04, 0, 0, 0, 0, 0, 28, 0], DataDir::In(&mut buf)).is_err() {
			return;
		}
		if u16::from_be_bytes([buf[0], buf[1]]) < 13 { return; }

		let (m, s, f) = (buf[8], buf[9], buf[10]);
		if m != 0 || s != 0 || f != 0 {
			info.manufacturer_id = Some([m, s, f]);
			info.lead_in_start = Some(Msf::lead_in_lba(m, s, f));
		}

		let (m, s, f) = (buf[12], buf[13], buf[14]);
		if m != 0 && m != 0xFF {
			info.lead_out_max = Some(Msf::new(m, s, f).lba());
		}

		// A1 values are only meaningful for rewritables.
		if 0 != buf[6] & 0b0000_0100 {
			let lo = ATIP_SPEEDS[usize::from((buf[16] >> 4) & 0b111)];
			let hi = ATIP_SPEEDS[usize::from((buf[16] >> 1) & 0b111)];
			if 0 < lo && lo <= hi { info.speeds = Some((lo, hi)); }
		}
	}

	/// # Next Writable Address.
	///
	/// Read the track information for the invisible (next) track, returning
	/// its NWA and free blocks.
	fn next_writable(&mut self) -> Option<(i32, u32)> {
		let mut buf = [0_u8; 36];
		self.send(
			&[0x52, 0x01, 0, 0, 0, 0xFF, 0, 0, 36, 0],
			DataDir::In(&mut buf),
		).ok()?;

		// NWA_V.
		if 0 == buf[7] & 0b0000_0001 { return None; }
		let nwa = i32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]);
		let free = u32::from_be_bytes([buf[16], buf[17], buf[18], buf[19]]);
		Some((nwa, free))
	}
}
