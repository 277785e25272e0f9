/*!
# Burnbox: Log
*/

use crate::BurnError;
use dactyl::NiceElapsed;
use std::{
	io::Write,
	time::Instant,
};
use utc2k::FmtUtc2k;



/// # Low Buffer Threshold (%).
const LOW_FILL: u8 = 20;



/// # Session Log.
///
/// This holds the log-worthy details of a write or read session, printing
/// them en masse at the end.
///
/// Doing it this way, versus printing each line in realtime, keeps the
/// output from colliding with the progress bar.
pub(crate) struct DaoLog {
	session: Option<(&'static str, Instant)>,
	tracks: Vec<(u8, u32, NiceElapsed)>,
	track_start: Option<(u8, u32, Instant)>,
	events: Vec<(i32, DaoLogKind, FmtUtc2k)>,
	min_fill: u8,
}

impl std::fmt::Debug for DaoLog {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DaoLog")
			.field("session", &self.session.map(|(label, _)| label))
			.field("tracks", &self.tracks.len())
			.field("events", &self.events.len())
			.field("min_fill", &self.min_fill)
			.finish_non_exhaustive()
	}
}

impl Drop for DaoLog {
	/// # Final Print Maybe.
	fn drop(&mut self) { self.flush(); }
}

impl DaoLog {
	/// # New Instance.
	pub(crate) const fn new() -> Self {
		Self {
			session: None,
			tracks: Vec::new(),
			track_start: None,
			events: Vec::new(),
			min_fill: 100,
		}
	}

	/// # Start.
	pub(crate) fn start(&mut self, label: &'static str) {
		self.flush();
		self.session.replace((label, Instant::now()));
		self.min_fill = 100;
	}

	/// # Start Track.
	pub(crate) fn track(&mut self, num: u8, blocks: u32) {
		self.end_track();
		self.track_start.replace((num, blocks, Instant::now()));
	}

	/// # End Track.
	pub(crate) fn end_track(&mut self) {
		if let Some((num, blocks, start)) = self.track_start.take() {
			self.tracks.push((num, blocks, NiceElapsed::from(start)));
		}
	}

	/// # Add Error.
	pub(crate) fn add_error(&mut self, lba: i32, err: &BurnError) {
		if self.session.is_some() {
			self.events.push((lba, DaoLogKind::Error(err.to_string()), FmtUtc2k::now()));
		}
	}

	/// # Add Retry.
	pub(crate) fn add_retry(&mut self, lba: i32) {
		if self.session.is_some() {
			self.events.push((lba, DaoLogKind::Retry, FmtUtc2k::now()));
		}
	}

	/// # Record Buffer Fill.
	///
	/// Low readings are logged individually.
	pub(crate) fn fill(&mut self, lba: i32, fill: u8) {
		if self.session.is_none() { return; }
		if fill < self.min_fill { self.min_fill = fill; }
		if fill < LOW_FILL {
			self.events.push((lba, DaoLogKind::LowFill(fill), FmtUtc2k::now()));
		}
	}

	/// # Flush.
	pub(crate) fn flush(&mut self) {
		self.end_track();
		let Some((label, start)) = self.session.take() else { return; };
		let writer = std::io::stdout();
		let mut handle = writer.lock();
		let _res = writeln!(
			&mut handle,
			r"##
## {label}: {}
## Minimum Buffer Fill: {}%
## Events: {}
##",
			NiceElapsed::from(start),
			self.min_fill,
			self.events.len(),
		);

		if ! self.tracks.is_empty() {
			for (num, blocks, elapsed) in self.tracks.drain(..) {
				let _res = writeln!(&mut handle, "{num:02}  {blocks:06}  {elapsed}");
			}
			let _res = writeln!(&mut handle, "##");
		}

		for (lba, kind, time) in self.events.drain(..) {
			let _res = writeln!(&mut handle, "## [{time}] {lba:06} {kind}");
		}

		let _res = handle.flush();
	}
}



#[derive(Debug, Clone)]
/// # Event Kind.
enum DaoLogKind {
	Error(String),
	LowFill(u8),
	Retry,
}

impl std::fmt::Display for DaoLogKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Error(s) => f.write_str(s),
			Self::LowFill(n) => write!(f, "Buffer fill dropped to {n}%."),
			Self::Retry => f.write_str("Long write in progress; retrying."),
		}
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_inactive() {
		// Nothing should be recorded without a session.
		let mut log = DaoLog::new();
		log.fill(0, 5);
		log.add_retry(0);
		log.add_error(0, &BurnError::Killed);
		assert!(log.events.is_empty());
		assert_eq!(log.min_fill, 100);

		log.start("Write");
		log.fill(0, 50);
		log.fill(75, 10);
		log.add_retry(75);
		assert_eq!(log.min_fill, 10);
		assert_eq!(log.events.len(), 2, "Only low fills and retries are events.");

		log.track(1, 300);
		log.track(2, 300);
		log.end_track();
		assert_eq!(log.tracks.len(), 2);

		// Flushing clears everything.
		log.session.take();
		log.events.truncate(0);
		log.tracks.truncate(0);
	}
}
