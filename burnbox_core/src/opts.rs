/*!
# Burnbox: Options
*/



/// # FLAG: BURN-Proof.
const FLAG_BURNPROOF: u8 = 0b0000_0001;

/// # FLAG: Eject When Done.
const FLAG_EJECT: u8 =     0b0000_0010;

/// # FLAG: Force.
const FLAG_FORCE: u8 =     0b0000_0100;

/// # FLAG: Multi-Session.
const FLAG_MULTI: u8 =     0b0000_1000;

/// # FLAG: Simulate.
const FLAG_SIMULATE: u8 =  0b0001_0000;

/// # FLAG: Verbose.
const FLAG_VERBOSE: u8 =   0b0010_0000;

/// # FLAG: Write CD-TEXT.
const FLAG_CD_TEXT: u8 =   0b0100_0000;

/// # FLAG: Write Default.
const FLAG_WRITE_DEFAULT: u8 = FLAG_BURNPROOF | FLAG_CD_TEXT;

/// # FLAG: Find Index Marks.
const FLAG_INDICES: u8 =   0b0000_0001;

/// # FLAG: Linear Scan.
const FLAG_SCAN: u8 =      0b0000_0010;

/// # FLAG: Sub-Channel Sync.
const FLAG_SYNC: u8 =      0b0000_0100;

/// # FLAG: Verbose (Read).
const FLAG_READ_VERBOSE: u8 = 0b0000_1000;

/// # FLAG: Read Default.
const FLAG_READ_DEFAULT: u8 = FLAG_INDICES;

/// # Minimum Buffers.
const BUFFERS_MIN: u16 = 10;

/// # Maximum Buffers.
const BUFFERS_MAX: u16 = 1000;

/// # Maximum Speed.
const SPEED_MAX: u16 = 72;



macro_rules! with_flag {
	($fn:ident, $flag:ident, $($doc:literal),+ $(,)?) => (
		#[must_use]
		$(
			#[doc = $doc]
		)+
		pub const fn $fn(self, v: bool) -> Self {
			let flags =
				if v { self.flags | $flag }
				else { self.flags & ! $flag };

			Self {
				flags,
				..self
			}
		}
	)
}

macro_rules! get_flag {
	($fn:ident, $flag:ident, $title:literal) => (
		#[must_use]
		#[doc = concat!("# ", $title, "?")]
		pub const fn $fn(&self) -> bool { $flag == self.flags & $flag }
	);
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Write Options.
///
/// Options are set using builder-style methods, like:
///
/// ```
/// use burnbox_core::WriteOptions;
///
/// let opts = WriteOptions::default()
///     .with_speed(8)
///     .with_simulate(true);
///
/// assert_eq!(opts.speed(), 8);
/// assert!(opts.simulate());
/// ```
pub struct WriteOptions {
	speed: u16,
	buffers: u16,
	flags: u8,
}

impl Default for WriteOptions {
	fn default() -> Self {
		Self {
			speed: 0,
			buffers: 32,
			flags: FLAG_WRITE_DEFAULT,
		}
	}
}

/// ## Setters.
impl WriteOptions {
	#[must_use]
	/// # Ring Buffer Chunks.
	///
	/// Each chunk holds one second (75 blocks) of data. More chunks means
	/// more protection against slow sources.
	///
	/// Values are capped to `10..=1000`, with a default of `32`.
	pub const fn with_buffers(self, mut buffers: u16) -> Self {
		if buffers < BUFFERS_MIN { buffers = BUFFERS_MIN; }
		else if BUFFERS_MAX < buffers { buffers = BUFFERS_MAX; }
		Self {
			buffers,
			..self
		}
	}

	with_flag!(
		with_burnproof,
		FLAG_BURNPROOF,
		"# Buffer Underrun Protection.",
		"",
		"When `true`, BURN-Proof (or equivalent) will be enabled if the drive",
		"supports it.",
		"",
		"The default is `true`.",
	);

	with_flag!(
		with_cd_text,
		FLAG_CD_TEXT,
		"# Write CD-TEXT.",
		"",
		"When `true`, CD-TEXT attached to the TOC will be written to the",
		"lead-in, provided the driver can do so.",
		"",
		"The default is `true`.",
	);

	with_flag!(
		with_eject,
		FLAG_EJECT,
		"# Eject When Done.",
		"",
		"The default is `false`.",
	);

	with_flag!(
		with_force,
		FLAG_FORCE,
		"# Force.",
		"",
		"When `true`, TOC warnings and capacity shortfalls are ignored.",
		"",
		"The default is `false`.",
	);

	with_flag!(
		with_multi_session,
		FLAG_MULTI,
		"# Multi-Session.",
		"",
		"When `true`, the disc is left open so more sessions can be added.",
		"",
		"The default is `false`.",
	);

	with_flag!(
		with_simulate,
		FLAG_SIMULATE,
		"# Simulate.",
		"",
		"When `true`, the test-write bit is set and the laser stays off.",
		"",
		"The default is `false`.",
	);

	#[must_use]
	/// # Write Speed.
	///
	/// This is a multiple of 176KB/s. Zero means "as fast as possible".
	///
	/// Values are capped to `0..=72`.
	pub const fn with_speed(self, mut speed: u16) -> Self {
		if SPEED_MAX < speed { speed = SPEED_MAX; }
		Self {
			speed,
			..self
		}
	}

	with_flag!(
		with_verbose,
		FLAG_VERBOSE,
		"# Verbose.",
		"",
		"When `true`, a session log is printed to STDOUT when finished.",
		"",
		"The default is `false`.",
	);
}

/// # Getters.
impl WriteOptions {
	get_flag!(burnproof, FLAG_BURNPROOF, "BURN-Proof");
	get_flag!(cd_text, FLAG_CD_TEXT, "CD-TEXT");
	get_flag!(eject, FLAG_EJECT, "Eject");
	get_flag!(force, FLAG_FORCE, "Force");
	get_flag!(multi_session, FLAG_MULTI, "Multi-Session");
	get_flag!(simulate, FLAG_SIMULATE, "Simulate");
	get_flag!(verbose, FLAG_VERBOSE, "Verbose");

	#[must_use]
	/// # Ring Buffer Chunks.
	pub const fn buffers(&self) -> u16 { self.buffers }

	#[must_use]
	/// # Write Speed.
	pub const fn speed(&self) -> u16 { self.speed }
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Read Options.
pub struct ReadOptions {
	session: u8,
	speed: u16,
	flags: u8,
}

impl Default for ReadOptions {
	fn default() -> Self {
		Self {
			session: 1,
			speed: 0,
			flags: FLAG_READ_DEFAULT,
		}
	}
}

/// ## Setters.
impl ReadOptions {
	with_flag!(
		with_indices,
		FLAG_INDICES,
		"# Find Pre-gaps and Index Marks.",
		"",
		"When `false`, only the TOC positions are used.",
		"",
		"The default is `true`.",
	);

	with_flag!(
		with_scan,
		FLAG_SCAN,
		"# Linear Scan.",
		"",
		"When `true`, index marks are found by decoding the sub-channel of",
		"every block rather than by binary search. This is slow but works",
		"with drives that cannot seek by playing audio.",
		"",
		"The default is `false`.",
	);

	#[must_use]
	/// # Session.
	///
	/// Values are capped to `1..=99`.
	pub const fn with_session(self, mut session: u8) -> Self {
		if session == 0 { session = 1; }
		else if 99 < session { session = 99; }
		Self {
			session,
			..self
		}
	}

	#[must_use]
	/// # Read Speed.
	///
	/// Zero means "as fast as possible".
	pub const fn with_speed(self, mut speed: u16) -> Self {
		if SPEED_MAX < speed { speed = SPEED_MAX; }
		Self {
			speed,
			..self
		}
	}

	with_flag!(
		with_sync,
		FLAG_SYNC,
		"# Sub-Channel Sync.",
		"",
		"When `true`, extracted audio is only accepted if the sub-channel",
		"confirms the drive read from the requested position.",
		"",
		"The default is `false`.",
	);

	with_flag!(
		with_verbose,
		FLAG_READ_VERBOSE,
		"# Verbose.",
		"",
		"When `true`, a session log is printed to STDOUT when finished.",
		"",
		"The default is `false`.",
	);
}

/// # Getters.
impl ReadOptions {
	get_flag!(indices, FLAG_INDICES, "Find Index Marks");
	get_flag!(scan, FLAG_SCAN, "Linear Scan");
	get_flag!(sync, FLAG_SYNC, "Sub-Channel Sync");
	get_flag!(verbose, FLAG_READ_VERBOSE, "Verbose");

	#[must_use]
	/// # Session.
	pub const fn session(&self) -> u8 { self.session }

	#[must_use]
	/// # Read Speed.
	pub const fn speed(&self) -> u16 { self.speed }
}
