/*!
# Burnbox: Fake Drive

This is a scripted, in-memory SCSI device used to exercise the driver
without hardware.
*/

use crate::{
	BurnError,
	CD_FRAME_SIZE,
	DataDir,
	HwInfo,
	Msf,
	ScsiTransport,
	Sense,
	SubChannel,
};
use std::{
	collections::VecDeque,
	time::Duration,
};



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Recorded Command.
pub(crate) struct Command {
	pub(crate) cdb: Vec<u8>,
	pub(crate) data: Vec<u8>,
}

impl Command {
	/// # Opcode.
	pub(crate) fn op(&self) -> u8 { self.cdb.first().copied().unwrap_or_default() }
}



#[derive(Debug)]
/// # Fake Drive.
pub(crate) struct FakeDrive {
	/// # Every Command Received.
	pub(crate) log: Vec<Command>,

	/// # Canned Responses (CDB Prefix, Data).
	responses: Vec<(Vec<u8>, Vec<u8>)>,

	/// # Pending Failures (Opcode, Sense).
	failures: VecDeque<(u8, Option<Sense>)>,

	/// # Sub-Channel Transitions (Start LBA, Track, Index).
	pub(crate) positions: Vec<(i32, u8, u8)>,

	/// # Current Play Position.
	play: i32,

	/// # Report the Block After the One Played?
	pub(crate) report_next: bool,

	/// # Extra Position Error.
	pub(crate) report_skew: i32,

	/// # Writes (LBA, Blocks).
	pub(crate) writes: Vec<(i32, u16)>,

	/// # Sub-Channel Probes.
	pub(crate) probes: usize,

	pub(crate) max_transfer: usize,
	pub(crate) timeout: Duration,
	pub(crate) hw: Option<HwInfo>,
}

impl Default for FakeDrive {
	fn default() -> Self {
		Self {
			log: Vec::new(),
			responses: Vec::new(),
			failures: VecDeque::new(),
			positions: Vec::new(),
			play: 0,
			report_next: true,
			report_skew: 0,
			writes: Vec::new(),
			probes: 0,
			max_transfer: 64 * 1024,
			timeout: Duration::from_secs(60),
			hw: Some(HwInfo {
				vendor: "FAKE".to_owned(),
				model: "BURNER 9000".to_owned(),
				revision: "1.00".to_owned(),
			}),
		}
	}
}

impl FakeDrive {
	/// # Respond.
	///
	/// Return `data` for any data-in command whose CDB starts with `prefix`.
	/// Later responses take priority.
	pub(crate) fn respond(&mut self, prefix: &[u8], data: &[u8]) {
		self.responses.push((prefix.to_vec(), data.to_vec()));
	}

	/// # Fail.
	///
	/// Fail the next command with this opcode.
	pub(crate) fn fail(&mut self, op: u8, sense: Option<Sense>) {
		self.failures.push_back((op, sense));
	}

	/// # Commands With Opcode.
	pub(crate) fn commands(&self, op: u8) -> impl Iterator<Item=&Command> {
		self.log.iter().filter(move |c| c.op() == op)
	}

	/// # Opcodes, In Order.
	pub(crate) fn ops(&self) -> Vec<u8> { self.log.iter().map(Command::op).collect() }

	/// # Position at LBA.
	fn position(&self, lba: i32) -> (u8, u8) {
		self.positions.iter()
			.rev()
			.find(|(start, _, _)| *start <= lba)
			.map_or((1, 1), |(_, t, i)| (*t, *i))
	}

	/// # Track Start (Index 1).
	fn track_start(&self, track: u8) -> i32 {
		self.positions.iter()
			.find(|(_, t, i)| *t == track && *i == 1)
			.map_or(0, |(s, _, _)| *s)
	}

	/// # Sub-Channel Frame.
	fn subchannel(&self, lba: i32) -> SubChannel {
		let (track, index) = self.position(lba);
		let start = self.track_start(track);
		let rel = Msf::from_frames(lba.abs_diff(start));
		SubChannel::position(0, track, index, rel, Msf::from_lba(lba))
	}
}

impl ScsiTransport for FakeDrive {
	fn send(&mut self, cdb: &[u8], dir: DataDir<'_>) -> Result<(), BurnError> {
		let op = cdb[0];
		self.log.push(Command {
			cdb: cdb.to_vec(),
			data: if let DataDir::Out(b) = &dir { b.to_vec() } else { Vec::new() },
		});

		if self.failures.front().is_some_and(|(o, _)| *o == op) {
			if let Some((_, sense)) = self.failures.pop_front() {
				return Err(BurnError::Scsi { op, sense });
			}
		}

		match (op, dir) {
			// WRITE(10).
			(0x2A, _) => {
				let lba = i32::from_be_bytes([cdb[2], cdb[3], cdb[4], cdb[5]]);
				let len = u16::from_be_bytes([cdb[7], cdb[8]]);
				self.writes.push((lba, len));
			},

			// PLAY AUDIO(10).
			(0x45, _) => {
				self.play = i32::from_be_bytes([cdb[2], cdb[3], cdb[4], cdb[5]]);
			},

			// READ SUB-CHANNEL, current position, LBA addressing.
			(0x42, DataDir::In(buf)) if cdb[3] == 1 => {
				self.probes += 1;
				buf.fill(0);
				let pos = self.play + i32::from(self.report_next) + self.report_skew;
				let (track, index) = self.position(pos);
				let start = self.track_start(track);
				let out = [0, 0x15, 0, 12, 1, 0x10, track, index];
				let len = buf.len().min(8);
				buf[..len].copy_from_slice(&out[..len]);
				if 16 <= buf.len() {
					buf[8..12].copy_from_slice(&pos.to_be_bytes());
					buf[12..16].copy_from_slice(&(pos - start).to_be_bytes());
				}
			},

			// READ CD.
			(0xBE, DataDir::In(buf)) => {
				let lba = i32::from_be_bytes([cdb[2], cdb[3], cdb[4], cdb[5]]);
				let blocks = usize::from(cdb[8]);
				let sub = cdb[10] & 0x07;
				let size = buf.len() / blocks.max(1);
				for (chunk, l) in buf.chunks_exact_mut(size).zip(lba..) {
					// Fill the data with something recognizable.
					let fill = l.to_le_bytes();
					for (k, b) in chunk[..usize::from(CD_FRAME_SIZE)].iter_mut().enumerate() {
						*b = fill[k % 4];
					}

					let s = self.subchannel(l);
					let rest = &mut chunk[usize::from(CD_FRAME_SIZE)..];
					if sub == 1 && rest.len() == 96 { rest.copy_from_slice(&s.to_pw96(None)); }
					else if sub == 2 && rest.len() == 16 { rest.copy_from_slice(&s.to_pq16()); }
				}
			},

			(_, DataDir::In(buf)) => {
				buf.fill(0);
				if let Some((_, data)) = self.responses.iter().rev().find(|(p, _)| cdb.starts_with(p)) {
					let len = buf.len().min(data.len());
					buf[..len].copy_from_slice(&data[..len]);
				}
			},

			_ => {},
		}

		Ok(())
	}

	fn max_transfer(&self) -> usize { self.max_transfer }

	fn timeout(&self) -> Duration { self.timeout }

	fn set_timeout(&mut self, timeout: Duration) { self.timeout = timeout; }

	fn hw_info(&self) -> Option<HwInfo> { self.hw.clone() }
}



/// # Mode Sense(10) Response.
///
/// Wrap a page in an eight-byte header with no block descriptors.
pub(crate) fn sense10(page: &[u8]) -> Vec<u8> {
	let mut out = vec![0_u8; 8];
	out.extend_from_slice(page);
	let [a, b] = u16::try_from(out.len() - 2).unwrap_or_default().to_be_bytes();
	out[0] = a;
	out[1] = b;
	out
}

/// # Blank Write Parameters Page.
///
/// The PS bit is set, as real drives do.
pub(crate) fn page5() -> Vec<u8> {
	let mut page = vec![0_u8; 0x34];
	page[0] = 0x85;
	page[1] = 0x32;
	page
}

/// # Script a Disc.
///
/// Respond to disc information, track information, ATIP and write
/// parameter queries as a recordable disc would. A `status` of zero is an
/// empty disc, one an appendable one (next writable address 20,000).
pub(crate) fn disc(dev: &mut FakeDrive, status: u8, capacity: u32) {
	let mut info = [0_u8; 34];
	info[2] = status;
	info[4] = 2;
	info[5] = 3;
	info[6] = 2;
	info[21..24].copy_from_slice(&[0xFF; 3]);

	let mut track = [0_u8; 36];
	track[7] = 1;
	track[12..16].copy_from_slice(&(if status == 0 { 0_i32 } else { 20_000 }).to_be_bytes());
	track[16..20].copy_from_slice(&capacity.to_be_bytes());

	let mut atip = [0_u8; 28];
	atip[1] = 26;
	atip[8..11].copy_from_slice(&[97, 26, 66]);

	dev.respond(&[0x51], &info);
	dev.respond(&[0x52], &track);
	dev.respond(&[0x43, 0x02, 0x04], &atip);
	dev.respond(&[0x5A, 0x08, 0x05], &sense10(&page5()));
}
