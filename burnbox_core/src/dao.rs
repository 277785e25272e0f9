/*!
# Burnbox: Disk-At-Once Writer

This ties everything together: a reader thread pulls track data into the
ring while the calling thread drains it onto the disc, reporting as it
goes.
*/

pub(super) mod remote;
mod ring;
mod source;

use crate::{
	BurnError,
	CdrDriver,
	KillSwitch,
	MessageKind,
	Phase,
	Progress,
	Reporter,
	ScsiTransport,
	Toc,
	TocCheck,
	WriteOptions,
};
use ring::Ring;
use std::ops::{
	Deref,
	DerefMut,
};



/// # Session Guard.
///
/// Abort the session if it goes out of scope unfinished.
struct SessionGuard<'a, T: ScsiTransport> {
	driver: &'a mut CdrDriver<T>,
	armed: bool,
}

impl<T: ScsiTransport> Deref for SessionGuard<'_, T> {
	type Target = CdrDriver<T>;
	fn deref(&self) -> &Self::Target { self.driver }
}

impl<T: ScsiTransport> DerefMut for SessionGuard<'_, T> {
	fn deref_mut(&mut self) -> &mut Self::Target { self.driver }
}

impl<T: ScsiTransport> Drop for SessionGuard<'_, T> {
	fn drop(&mut self) {
		if self.armed { self.driver.abort_dao(); }
	}
}

impl<'a, T: ScsiTransport> SessionGuard<'a, T> {
	/// # New.
	fn new(driver: &'a mut CdrDriver<T>) -> Self {
		Self { driver, armed: true }
	}

	/// # Finish.
	///
	/// Finish the session for real, disarming the guard either way;
	/// `finish_dao` closes the session even when it fails.
	fn finish(mut self) -> Result<(), BurnError> {
		let res = self.driver.finish_dao();
		if res.is_ok() || ! self.driver.in_session() { self.armed = false; }
		res
	}
}



/// # Write Disk.
///
/// Write (or simulate writing) a TOC to the disc in a single
/// disk-at-once session.
///
/// Track data is read on a separate thread into a ring buffer (sized per
/// [`WriteOptions::buffers`]), which is filled completely before the laser
/// turns on. The kill switch is checked between chunks; an abort mid-write
/// will most likely leave the disc unusable.
///
/// ## Errors
///
/// Returns an error if the TOC or disc is unsuitable, a source can't be
/// read, the drive fails, or the operation is aborted.
pub fn write_disk<T, R>(
	driver: &mut CdrDriver<T>,
	toc: &Toc,
	opts: &WriteOptions,
	reporter: &R,
	killed: &KillSwitch,
) -> Result<(), BurnError>
where T: ScsiTransport, R: Reporter + ?Sized {
	if opts.verbose() {
		driver.log.start(if opts.simulate() { "Simulation" } else { "Write" });
	}

	let res = write_session(driver, toc, opts, reporter, killed);
	match &res {
		Ok(()) =>
			if opts.eject() {
				if let Err(e) = driver.eject() { driver.log.add_error(0, &e); }
			},
		Err(BurnError::Killed) => reporter.message(MessageKind::Warning, "The write was aborted."),
		Err(_) => {},
	}

	driver.log.flush();
	reporter.finished(i32::from(res.is_err()));
	res
}

/// # Write Session.
fn write_session<T, R>(
	driver: &mut CdrDriver<T>,
	toc: &Toc,
	opts: &WriteOptions,
	reporter: &R,
	killed: &KillSwitch,
) -> Result<(), BurnError>
where T: ScsiTransport, R: Reporter + ?Sized {
	reporter.status(Phase::Calibrate, 0);
	for check in [toc.check(), driver.check_toc(toc, opts)] {
		if let TocCheck::Warning(msgs) = check {
			for msg in msgs { reporter.message(MessageKind::Warning, &msg); }
		}
	}
	driver.init_dao(toc, opts)?;
	let mut session = SessionGuard::new(driver);

	let ring = Ring::new(opts.buffers());
	let mut started = false;
	let res = std::thread::scope(|s| {
		let reader = s.spawn(|| source::feed(toc, &ring, killed));

		let res = ring.prefill(killed)
			.and_then(|()| {
				started = true;
				write_program(&mut *session, toc, &ring, reporter, killed)
			});

		// Release the reader, however things went.
		ring.stop();
		if reader.join().is_err() { Err(BurnError::Bug("reader thread panicked")) }
		else { res }
	});

	if let Err(e) = res {
		if started && ! opts.simulate() && ! matches!(e, BurnError::Bug(_)) {
			reporter.message(MessageKind::Error, "The disc is probably unusable now.");
		}
		return Err(e);
	}

	reporter.status(Phase::Fixate, 0);
	session.finish()
}

/// # Write Program Area.
///
/// Start the session, then drain the ring onto the disc.
fn write_program<T, R>(
	driver: &mut CdrDriver<T>,
	toc: &Toc,
	ring: &Ring,
	reporter: &R,
	killed: &KillSwitch,
) -> Result<(), BurnError>
where T: ScsiTransport, R: Reporter + ?Sized {
	reporter.status(Phase::LeadIn, 0);
	let mut lba = driver.start_dao()?;

	let total = toc.blocks();
	let mut done = 0;
	let mut current = None;
	reporter.status(Phase::Write, total);

	while let Some(chunk) = ring.pop() {
		let chunk = chunk?;
		if killed.killed() { return Err(BurnError::Killed); }

		let track = toc.tracks().get(chunk.track).ok_or(BurnError::Bug("chunk track out of range"))?;
		let num = u8::try_from(chunk.track + 1).unwrap_or(u8::MAX);
		if current != Some(num) {
			current = Some(num);
			driver.log.track(num, track.blocks());
		}

		driver.write_data(track.mode(), &mut lba, &chunk.data, chunk.blocks)?;
		done += chunk.blocks;

		let buffer_fill = ring.fill();
		driver.log.fill(lba, buffer_fill);
		let drive_fill = driver.buffer_capacity().ok().flatten();
		reporter.progress(Progress {
			track: num,
			delta: chunk.blocks,
			done,
			total,
			buffer_fill,
			drive_fill,
		});

		ring.recycle(chunk.data);
	}

	driver.log.end_track();
	if done == total { Ok(()) }
	else if killed.killed() { Err(BurnError::Killed) }
	else { Err(BurnError::Bug("incomplete program area")) }
}
