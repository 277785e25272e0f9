/*!
# Burnbox: Remote Progress

This reporter speaks the machine-readable progress protocol used by GUI
front-ends: every update is a four-byte sync marker followed by a small
fixed-layout struct of little-endian `i32`s.

Encoding happens on the caller's thread, but the actual writing is left to
a helper thread; if the other end stops reading, updates are dropped rather
than stalling the burn.
*/

use crate::{
	BurnError,
	MessageKind,
	Phase,
	Progress,
	Reporter,
};
use crossbeam_channel::Sender;
use serde::Serialize;
use std::{
	fs::File,
	io::Write,
	sync::atomic::{
		AtomicBool,
		AtomicI32,
		Ordering::{
			Acquire,
			Relaxed,
			Release,
		},
	},
	thread::JoinHandle,
};



/// # Sync Marker.
const SYNC: [u8; 4] = [0xFF, 0x00, 0xFF, 0x00];

/// # Queue Size.
const QUEUE: usize = 64;



#[derive(Debug, Clone, Copy, Serialize)]
/// # Write Status Frame.
struct WriteStatus {
	status: i32,
	track: i32,
	total_progress: i32,
	buffer_fill: i32,
}

#[derive(Debug, Clone, Copy, Serialize)]
/// # Read Status Frame.
struct ReadStatus {
	status: i32,
	track: i32,
	track_progress: i32,
}



#[derive(Debug)]
/// # Remote Reporter.
///
/// Write progress frames to a file descriptor (or any other writer).
///
/// Progress values are expressed in tenths of a percent (`0..=1000`).
/// Messages have no place in the protocol and are ignored.
pub struct RemoteReporter {
	tx: Option<Sender<Vec<u8>>>,
	handle: Option<JoinHandle<()>>,
	status: AtomicI32,
	read: AtomicBool,
}

impl Drop for RemoteReporter {
	fn drop(&mut self) {
		// Hang up, then let the writer drain what it has.
		drop(self.tx.take());
		if let Some(handle) = self.handle.take() { let _res = handle.join(); }
	}
}

impl RemoteReporter {
	/// # New.
	///
	/// Send frames to `out` from a background thread.
	pub fn new<W: Write + Send + 'static>(mut out: W) -> Self {
		let (tx, rx) = crossbeam_channel::bounded::<Vec<u8>>(QUEUE);
		let handle = std::thread::spawn(move || {
			for frame in &rx {
				// A reader that went away is the end of the line.
				if out.write_all(&frame).and_then(|()| out.flush()).is_err() { break; }
			}
		});

		Self {
			tx: Some(tx),
			handle: Some(handle),
			status: AtomicI32::new(0),
			read: AtomicBool::new(false),
		}
	}

	/// # From File Descriptor.
	///
	/// Open an inherited file descriptor (e.g. `3`) for writing.
	///
	/// ## Errors
	///
	/// Returns an error if the descriptor can't be opened.
	pub fn from_fd(fd: u16) -> Result<Self, BurnError> {
		let path = format!("/dev/fd/{fd}");
		File::options()
			.append(true)
			.open(&path)
			.map(Self::new)
			.map_err(|_| BurnError::Write(path))
	}

	/// # Send Frame.
	fn send<S: Serialize>(&self, frame: &S) {
		let Some(tx) = self.tx.as_ref() else { return; };
		let Ok(body) = bincode::serialize(frame) else { return; };
		let mut out = Vec::with_capacity(SYNC.len() + body.len());
		out.extend_from_slice(&SYNC);
		out.extend_from_slice(&body);

		// A full queue means the other end is behind; skip it.
		let _res = tx.try_send(out);
	}

	/// # Send Progress.
	fn send_progress(&self, track: i32, permille: i32, buffer_fill: i32) {
		let status = self.status.load(Relaxed);
		if self.read.load(Acquire) {
			self.send(&ReadStatus { status, track, track_progress: permille });
		}
		else {
			self.send(&WriteStatus { status, track, total_progress: permille, buffer_fill });
		}
	}
}

impl Reporter for RemoteReporter {
	fn status(&self, phase: Phase, _total: u32) {
		self.status.store(phase.code(), Relaxed);
		self.read.store(matches!(phase, Phase::Analyze | Phase::Read), Release);
		self.send_progress(0, 0, 0);
	}

	fn progress(&self, progress: Progress) {
		let permille =
			if progress.total == 0 { 0 }
			else {
				u64::from(progress.done.min(progress.total)) * 1000 / u64::from(progress.total)
			};
		self.send_progress(
			i32::from(progress.track),
			i32::try_from(permille).unwrap_or(1000),
			i32::from(progress.buffer_fill),
		);
	}

	fn finished(&self, _code: i32) {}

	fn message(&self, _kind: MessageKind, _text: &str) {}
}



#[cfg(test)]
mod test {
	use super::*;
	use std::sync::{
		Arc,
		Mutex,
	};

	#[derive(Debug, Clone, Default)]
	/// # Shared Output.
	struct Shared(Arc<Mutex<Vec<u8>>>);

	impl Write for Shared {
		fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
			self.0.lock().unwrap().extend_from_slice(buf);
			Ok(buf.len())
		}
		fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
	}

	/// # Decode Frames.
	fn frames(raw: &[u8], fields: usize) -> Vec<Vec<i32>> {
		raw.chunks_exact(4 + fields * 4)
			.map(|c| {
				assert_eq!(c[..4], SYNC, "Missing sync.");
				c[4..].chunks_exact(4)
					.map(|v| i32::from_le_bytes([v[0], v[1], v[2], v[3]]))
					.collect()
			})
			.collect()
	}

	#[test]
	fn t_remote_write() {
		let out = Shared::default();
		let remote = RemoteReporter::new(out.clone());
		remote.status(Phase::Write, 1000);
		remote.progress(Progress {
			track: 2,
			delta: 75,
			done: 250,
			total: 1000,
			buffer_fill: 90,
			drive_fill: None,
		});
		remote.message(MessageKind::Info, "Ignored.");
		remote.finished(0);
		drop(remote);

		let raw = out.0.lock().unwrap().clone();
		assert_eq!(raw.len(), 40, "Two frames of four fields.");
		assert_eq!(frames(&raw, 4), vec![
			vec![Phase::Write.code(), 0, 0, 0],
			vec![Phase::Write.code(), 2, 250, 90],
		]);
	}

	#[test]
	fn t_remote_read() {
		let out = Shared::default();
		let remote = RemoteReporter::new(out.clone());
		remote.status(Phase::Read, 10);
		remote.progress(Progress { track: 1, done: 10, total: 10, ..Progress::default() });
		drop(remote);

		let raw = out.0.lock().unwrap().clone();
		assert_eq!(frames(&raw, 3), vec![
			vec![Phase::Read.code(), 0, 0],
			vec![Phase::Read.code(), 1, 1000],
		]);
	}

	#[test]
	fn t_remote_hangup() {
		/// # Broken Pipe.
		struct Broken;
		impl Write for Broken {
			fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
				Err(std::io::ErrorKind::BrokenPipe.into())
			}
			fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
		}

		// Nothing should block or panic.
		let remote = RemoteReporter::new(Broken);
		for _ in 0..1000 { remote.status(Phase::Write, 0); }
		drop(remote);
	}
}
