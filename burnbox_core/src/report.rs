/*!
# Burnbox: Reporting
*/

use fyi_msg::{
	Msg,
	Progless,
};
use std::fmt;



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Phase.
pub enum Phase {
	/// # Blanking.
	Blank,

	/// # Optimum Power Calibration.
	Calibrate,

	/// # Analyzing (Reading the TOC/Sub-Channel).
	Analyze,

	/// # Reading Track Data.
	Read,

	/// # Writing the Lead-in.
	LeadIn,

	/// # Writing Track Data.
	Write,

	/// # Writing the Lead-out.
	LeadOut,

	/// # Flushing the Cache/Closing the Session.
	Fixate,
}

impl fmt::Display for Phase {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Phase {
	#[must_use]
	/// # As Str.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Blank => "Blanking",
			Self::Calibrate => "Calibrating",
			Self::Analyze => "Analyzing",
			Self::Read => "Reading",
			Self::LeadIn => "Lead-in",
			Self::Write => "Writing",
			Self::LeadOut => "Lead-out",
			Self::Fixate => "Fixating",
		}
	}

	#[must_use]
	/// # Remote Status Code.
	pub const fn code(self) -> i32 {
		match self {
			Self::Blank => 6,
			Self::Calibrate => 5,
			Self::Analyze => 7,
			Self::Read => 8,
			Self::LeadIn => 1,
			Self::Write => 2,
			Self::LeadOut => 3,
			Self::Fixate => 4,
		}
	}
}



#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
/// # Message Kind.
pub enum MessageKind {
	/// # Informational.
	Info,

	/// # Warning.
	Warning,

	/// # Error.
	Error,
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Progress Event.
pub struct Progress {
	/// # Current Track.
	///
	/// This is zero for the lead-in and `0xAA` for the lead-out.
	pub track: u8,

	/// # Blocks Since the Last Event.
	pub delta: u32,

	/// # Blocks Done (Phase Total).
	pub done: u32,

	/// # Blocks (Phase Total).
	pub total: u32,

	/// # Ring Buffer Fill (%).
	pub buffer_fill: u8,

	/// # Drive Buffer Fill (%), If Known.
	pub drive_fill: Option<u8>,
}

impl Progress {
	#[must_use]
	/// # Percent Done.
	pub fn percent(&self) -> u8 {
		if self.total == 0 { 0 }
		else {
			let p = u64::from(self.done.min(self.total)) * 100 / u64::from(self.total);
			u8::try_from(p).unwrap_or(100)
		}
	}
}



/// # Reporter.
///
/// This is the observer through which long-running operations describe what
/// they are doing. Implementations must not block.
pub trait Reporter {
	/// # Phase Change.
	///
	/// `total` is the number of blocks the phase will process, if known.
	fn status(&self, phase: Phase, total: u32);

	/// # Progress.
	fn progress(&self, progress: Progress);

	/// # Finished.
	///
	/// Called once at the very end with the operation's exit code.
	fn finished(&self, code: i32);

	/// # Message.
	fn message(&self, kind: MessageKind, text: &str);
}

impl Reporter for Progless {
	fn status(&self, phase: Phase, total: u32) {
		let _res = self.reset(total.max(1));
		self.set_title(Some(Msg::custom(phase.as_str(), 199, "…")));
	}

	fn progress(&self, progress: Progress) {
		let title =
			if progress.track == 0 || progress.track == crate::CD_LEADOUT_TRACK {
				format!("Buffer {:3}%", progress.buffer_fill)
			}
			else {
				format!("Track {:02}, buffer {:3}%", progress.track, progress.buffer_fill)
			};
		self.set_title(Some(Msg::custom("Progress", 199, &title)));
		self.increment_n(progress.delta);
	}

	fn finished(&self, _code: i32) { self.finish(); }

	fn message(&self, kind: MessageKind, text: &str) {
		match kind {
			MessageKind::Info => Msg::info(text).eprint(),
			MessageKind::Warning => Msg::warning(text).eprint(),
			MessageKind::Error => Msg::error(text).eprint(),
		}
	}
}



#[derive(Debug, Clone, Copy, Default)]
/// # Null Reporter.
///
/// This discards everything.
pub struct NullReporter;

impl Reporter for NullReporter {
	fn status(&self, _phase: Phase, _total: u32) {}
	fn progress(&self, _progress: Progress) {}
	fn finished(&self, _code: i32) {}
	fn message(&self, _kind: MessageKind, _text: &str) {}
}

/// # Pairs.
///
/// Report to two places at once, e.g. the terminal and a remote listener.
impl<A: Reporter, B: Reporter> Reporter for (A, B) {
	fn status(&self, phase: Phase, total: u32) {
		self.0.status(phase, total);
		self.1.status(phase, total);
	}

	fn progress(&self, progress: Progress) {
		self.0.progress(progress);
		self.1.progress(progress);
	}

	fn finished(&self, code: i32) {
		self.0.finished(code);
		self.1.finished(code);
	}

	fn message(&self, kind: MessageKind, text: &str) {
		self.0.message(kind, text);
		self.1.message(kind, text);
	}
}
