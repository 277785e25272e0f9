/*!
# Burnbox: Disc Analysis

This is the read side of the driver: locating pre-gaps and index marks,
pulling the catalog, ISRCs and CD-TEXT, and turning the whole thing back
into a [`Toc`], optionally with an image to go along with it.
*/

use crate::{
	AudioExtractor,
	Barcode,
	BurnError,
	CD_FRAME_SIZE,
	CdRawToc,
	CdrDriver,
	CdText,
	DataDir,
	DriverOptions,
	ExtractReport,
	Isrc,
	KillSwitch,
	MessageKind,
	Phase,
	PQ_SUBCHANNEL_SIZE,
	Progress,
	PW_SUBCHANNEL_SIZE,
	ReadOptions,
	Reporter,
	ScsiTransport,
	sector::{
		sector_mode,
		user_data,
	},
	SubChannel,
	SubTrack,
	Toc,
	TocType,
	Track,
	TrackFlags,
	TrackMode,
	WAVE_SPEC,
};
use std::{
	fs::File,
	io::{
		BufWriter,
		Write,
	},
	path::Path,
};



/// # Blocks Per Read.
const READ_CHUNK: u16 = 24;

/// # Probe Play Length (Blocks).
const PROBE_LEN: u16 = 1;

/// # Highest Index.
const MAX_INDEX: u8 = 99;



#[derive(Debug)]
/// # Track Span.
///
/// Everything learned about one track; the span runs from `pregap_start` to
/// the next track's `pregap_start` (or the lead-out).
struct Span {
	num: u8,
	ctl: u8,
	mode: TrackMode,
	pregap_start: i32,
	start: i32,
	indices: Vec<u32>,
	isrc: Option<Isrc>,
}

#[derive(Debug)]
/// # Session Layout.
struct Layout {
	kind: TocType,
	spans: Vec<Span>,
	leadout: i32,
	catalog: Option<Barcode>,
	cd_text: Option<CdText>,
}

impl Layout {
	/// # Span End.
	fn end(&self, idx: usize) -> i32 {
		self.spans.get(idx + 1).map_or(self.leadout, |s| s.pregap_start)
	}

	/// # Total Blocks.
	fn blocks(&self) -> u32 {
		self.spans.first().map_or(0, |s| self.leadout.abs_diff(s.pregap_start))
	}

	/// # WAV Image?
	///
	/// Only pure audio sessions can be saved as WAV.
	fn is_wav(&self, path: &Path) -> bool {
		matches!(self.kind, TocType::CdDa) &&
		path.extension().is_some_and(|e| e.eq_ignore_ascii_case("wav"))
	}

	/// # To TOC.
	///
	/// Build a TOC whose sub-tracks point, in order, at the (eventual)
	/// image.
	fn to_toc(&self, data_file: &Path) -> Result<Toc, BurnError> {
		let wav = self.is_wav(data_file);
		let mut toc = Toc::new(self.kind);
		let mut offset = 0_u64;

		for (idx, span) in self.spans.iter().enumerate() {
			let blocks = u32::try_from(self.end(idx) - span.pregap_start)
				.map_err(|_| BurnError::Bug("negative track length"))?;
			let len = u64::from(blocks) * u64::from(span.mode.source_block_size());
			let sub =
				if wav {
					let first = u32::try_from(offset / 4)
						.map_err(|_| BurnError::Bug("image too large"))?;
					SubTrack::wav_range(data_file, first, len)
				}
				else { SubTrack::file(data_file, offset, len) };
			offset += len;

			let mut track = Track::new(span.mode)
				.with_pregap(span.start.abs_diff(span.pregap_start))
				.with_flags(TrackFlags::from_ctl(span.ctl))
				.with_isrc(span.isrc)
				.with_subtrack(sub);
			for idx in &span.indices { track = track.with_index(*idx); }
			toc.push_track(track)?;
		}

		toc.set_catalog(self.catalog);
		toc.set_cd_text(self.cd_text.clone());
		Ok(toc)
	}
}



/// # Image Writer.
struct Sink<'a> {
	path: &'a Path,
	out: SinkKind,
}

/// # Image Format.
enum SinkKind {
	Raw(BufWriter<File>),
	Wav(hound::WavWriter<BufWriter<File>>),
}

impl<'a> Sink<'a> {
	/// # Create.
	fn create(path: &'a Path, wav: bool) -> Result<Self, BurnError> {
		let out =
			if wav {
				hound::WavWriter::create(path, WAVE_SPEC).ok().map(SinkKind::Wav)
			}
			else {
				File::create(path).ok().map(|f| SinkKind::Raw(BufWriter::new(f)))
			};

		out.map(|out| Self { path, out }).ok_or_else(|| Self::error(path))
	}

	/// # Write.
	fn write(&mut self, data: &[u8]) -> Result<(), BurnError> {
		match &mut self.out {
			SinkKind::Raw(w) => w.write_all(data).map_err(|_| Self::error(self.path)),
			SinkKind::Wav(w) => {
				// Hound counts left and right separately.
				for sample in data.chunks_exact(2) {
					w.write_sample(i16::from_le_bytes([sample[0], sample[1]]))
						.map_err(|_| Self::error(self.path))?;
				}
				Ok(())
			},
		}
	}

	/// # Finish.
	fn finish(self) -> Result<(), BurnError> {
		let res = match self.out {
			SinkKind::Raw(mut w) => w.flush().is_ok(),
			SinkKind::Wav(w) => w.finalize().is_ok(),
		};
		if res { Ok(()) }
		else { Err(Self::error(self.path)) }
	}

	/// # Error.
	fn error(path: &Path) -> BurnError {
		BurnError::Write(path.to_string_lossy().into_owned())
	}
}



impl<T: ScsiTransport> CdrDriver<T> {
	/// # Play Audio.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails.
	pub fn play_audio(&mut self, lba: i32, len: u16) -> Result<(), BurnError> {
		let [a, b, c, d] = lba.to_be_bytes();
		let [e, f] = len.to_be_bytes();
		self.send(&[0x45, 0, a, b, c, d, 0, e, f, 0], DataDir::None)
	}

	/// # Read Sub-Channel (Current Position).
	///
	/// Return the track, index, and absolute LBA the drive is sitting on.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails or the drive returns something
	/// other than position data.
	pub fn read_sub_channel(&mut self) -> Result<(u8, u8, i32), BurnError> {
		let mut buf = [0_u8; 16];
		self.send(&[0x42, 0, 0x40, 0x01, 0, 0, 0, 0, 16, 0], DataDir::In(&mut buf))?;
		if buf[5] >> 4 == 1 {
			Ok((buf[6], buf[7], i32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]])))
		}
		else { Err(BurnError::SubChannel) }
	}

	/// # Read Catalog.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails. A missing or invalid catalog
	/// number is `None`.
	pub fn read_catalog(&mut self) -> Result<Option<Barcode>, BurnError> {
		let mut buf = [0_u8; 24];
		self.send(&[0x42, 0, 0x40, 0x02, 0, 0, 0, 0, 24, 0], DataDir::In(&mut buf))?;
		if 0 == buf[8] & 0x80 { Ok(None) }
		else { Ok(Barcode::try_from(&buf[9..22]).ok()) }
	}

	/// # Read ISRC.
	///
	/// ## Errors
	///
	/// Returns an error if the command fails. A missing or invalid ISRC is
	/// `None`.
	pub fn read_isrc(&mut self, track: u8) -> Result<Option<Isrc>, BurnError> {
		let mut buf = [0_u8; 24];
		self.send(&[0x42, 0, 0x40, 0x03, 0, 0, track, 0, 24, 0], DataDir::In(&mut buf))?;
		if 0 == buf[8] & 0x80 { Ok(None) }
		else { Ok(Isrc::try_from(&buf[9..21]).ok()) }
	}

	/// # Read CD.
	///
	/// Read `count` raw 2352-byte sectors into `buf`.
	///
	/// ## Errors
	///
	/// Returns an error if the buffer is too small or the command fails.
	pub fn read_cd(&mut self, lba: i32, count: u16, buf: &mut [u8]) -> Result<(), BurnError> {
		let len = usize::from(count) * usize::from(CD_FRAME_SIZE);
		let buf = buf.get_mut(..len).ok_or(BurnError::Bug("short read buffer"))?;
		self.send(&read_cd_cdb(lba, count, 0), DataDir::In(buf))
	}

	/// # Read CD With Sub-Channel.
	///
	/// Like [`CdrDriver::read_cd`], but also return the decoded sub-channel
	/// for each sector, read in packed PQ or raw P-W form depending on what
	/// the drive handles best.
	///
	/// ## Errors
	///
	/// Returns an error if the drive can't read sub-channel data, the buffer
	/// is too small, or the command fails.
	pub fn read_cd_subchannel(&mut self, lba: i32, count: u16, buf: &mut [u8])
	-> Result<Vec<SubChannel>, BurnError> {
		if self.has(DriverOptions::NO_SUBCHAN_READ) {
			return Err(BurnError::Unsupported("sub-channel reads"));
		}

		let frame = usize::from(CD_FRAME_SIZE);
		let buf = buf.get_mut(..usize::from(count) * frame)
			.ok_or(BurnError::Bug("short read buffer"))?;

		let pq = self.has(DriverOptions::USE_PQ);
		let (select, size) =
			if pq { (2, usize::from(PQ_SUBCHANNEL_SIZE)) }
			else { (1, usize::from(PW_SUBCHANNEL_SIZE)) };
		let mut raw = vec![0_u8; usize::from(count) * (frame + size)];
		self.send(&read_cd_cdb(lba, count, select), DataDir::In(&mut raw))?;

		let mut out = Vec::with_capacity(usize::from(count));
		for (src, dst) in raw.chunks_exact(frame + size).zip(buf.chunks_exact_mut(frame)) {
			dst.copy_from_slice(&src[..frame]);
			let sub =
				if pq { src.last_chunk::<16>().map(SubChannel::from_pq16) }
				else { src.last_chunk::<96>().map(SubChannel::from_pw96) };
			out.push(sub.ok_or(BurnError::SubChannel)?);
		}

		Ok(out)
	}

	/// # Find Index.
	///
	/// Binary search `start..end` for the first block at or past
	/// `track`/`index`, seeking by playing the block before each candidate
	/// and asking the drive where it landed. The hit is only accepted if the
	/// block before it is still short of the target.
	///
	/// ## Errors
	///
	/// Returns an error if a probe fails.
	pub fn find_index(&mut self, track: u8, index: u8, start: i32, end: i32)
	-> Result<Option<i32>, BurnError> {
		let target = (track, index);
		let mut lo = start;
		let mut hi = end;
		while lo < hi {
			let mid = lo + ((hi - lo) >> 1);
			if self.probe(mid)? < target { lo = mid + 1; }
			else { hi = mid; }
		}

		if end <= lo || self.probe(lo)? != target { return Ok(None); }
		if start < lo && target <= self.probe(lo - 1)? { return Ok(None); }
		Ok(Some(lo))
	}

	/// # Analyze Track (Search).
	///
	/// Find the start of the pre-gap and any index marks for a track by
	/// binary search. `prev_start` is where the previous track's index 1
	/// sits; `end` is the following track's start (or the lead-out).
	///
	/// Returns the pre-gap start and the index offsets relative to `start`.
	///
	/// ## Errors
	///
	/// Returns an error if a probe fails.
	pub fn analyze_track_search(&mut self, track: u8, prev_start: i32, start: i32, end: i32)
	-> Result<(i32, Vec<u32>), BurnError> {
		let pregap_start =
			if 1 < track && prev_start < start {
				self.find_index(track, 0, prev_start + 1, start)?.unwrap_or(start)
			}
			else { start };

		let mut indices = Vec::new();
		let mut from = start + 1;
		for index in 2..=MAX_INDEX {
			let Some(lba) = self.find_index(track, index, from, end)? else { break; };
			indices.push(lba.abs_diff(start));
			from = lba + 1;
		}

		Ok((pregap_start, indices))
	}

	/// # Analyze Track (Scan).
	///
	/// Same as [`CdrDriver::analyze_track_search`], but by decoding the
	/// sub-channel of every block in turn. Slow, but it doesn't rely on
	/// audio playback.
	///
	/// ## Errors
	///
	/// Returns an error if the drive can't read sub-channel data or a read
	/// fails.
	pub fn analyze_track_scan(&mut self, track: u8, prev_start: i32, start: i32, end: i32)
	-> Result<(i32, Vec<u32>), BurnError> {
		let mut lba =
			if 1 < track && prev_start < start { prev_start + 1 }
			else { start };
		let mut pregap_start = None;
		let mut indices = Vec::new();
		let mut last_index = 1;
		let mut buf = vec![0_u8; usize::from(READ_CHUNK) * usize::from(CD_FRAME_SIZE)];

		'scan: while lba < end {
			let count = chunk_len(lba, end);
			let subs = self.read_cd_subchannel(lba, count, &mut buf)?;
			for (sub, l) in subs.iter().zip(lba..) {
				if ! sub.check_crc() { continue; }
				let (Some(t), Some(i)) = (sub.track(), sub.index()) else { continue; };
				if track < t { break 'scan; }
				if t != track { continue; }

				if i == 0 {
					if l < start && pregap_start.is_none() { pregap_start = Some(l); }
				}
				else if last_index < i && start < l {
					indices.push(l.abs_diff(start));
					last_index = i;
				}
			}
			lba += i32::from(count);
		}

		Ok((pregap_start.unwrap_or(start), indices))
	}

	/// # Read Disk TOC.
	///
	/// Analyze a session and return a TOC describing it, with sub-tracks
	/// pointing at `data_file`. Nothing is extracted; see
	/// [`CdrDriver::read_disk`] for that.
	///
	/// ## Errors
	///
	/// Returns an error if the disc can't be read or the session doesn't
	/// exist.
	pub fn read_disk_toc<R: Reporter + ?Sized>(
		&mut self,
		data_file: &Path,
		opts: &ReadOptions,
		reporter: &R,
	) -> Result<Toc, BurnError> {
		if opts.verbose() { self.log.start("Analysis"); }
		let res = self.read_layout(opts, reporter)
			.and_then(|layout| layout.to_toc(data_file));
		self.log.flush();
		reporter.finished(i32::from(res.is_err()));
		res
	}

	/// # Read Disk.
	///
	/// Analyze a session, then extract it to `data_file`, as raw data or, if
	/// the session is pure audio and the path ends in `.wav`, as a WAV file.
	/// Audio sectors go through `extractor`; data sectors are read directly.
	///
	/// The returned TOC references the image.
	///
	/// ## Errors
	///
	/// Returns an error if the disc can't be read, the image can't be
	/// written, or the operation is aborted.
	pub fn read_disk<E, R>(
		&mut self,
		data_file: &Path,
		opts: &ReadOptions,
		extractor: &mut E,
		reporter: &R,
		killed: &KillSwitch,
	) -> Result<Toc, BurnError>
	where E: AudioExtractor, R: Reporter + ?Sized {
		if opts.verbose() { self.log.start("Read"); }
		let res = self.read_layout(opts, reporter)
			.and_then(|layout| {
				self.extract(&layout, data_file, extractor, reporter, killed)?;
				layout.to_toc(data_file)
			});
		self.log.flush();
		reporter.finished(i32::from(res.is_err()));
		res
	}
}

impl<T: ScsiTransport> CdrDriver<T> {
	/// # Probe.
	///
	/// Return the track and index of block `lba`.
	///
	/// After playing a block, drives report the position of the *next* one,
	/// so playback starts a block early. If the reported position doesn't
	/// line up, the block is played directly for drives that report what
	/// they played instead.
	fn probe(&mut self, lba: i32) -> Result<(u8, u8), BurnError> {
		if 0 < lba {
			self.play_audio(lba - 1, PROBE_LEN)?;
			let (track, index, pos) = self.read_sub_channel()?;
			if pos == lba { return Ok((track, index)); }
		}

		self.play_audio(lba, PROBE_LEN)?;
		let (track, index, pos) = self.read_sub_channel()?;
		if pos == lba { Ok((track, index)) }
		else { Err(BurnError::SubChannel) }
	}

	/// # Session Tracks.
	///
	/// Return the disc type (if known), the tracks (number, control, start),
	/// and the lead-out for a session.
	fn session_tracks(&mut self, session: u8)
	-> Result<(Option<TocType>, Vec<(u8, u8, i32)>, i32), BurnError> {
		match self.get_raw_toc() {
			Ok(raw) => {
				let mut tracks: Vec<(u8, u8, i32)> = raw.iter()
					.filter(|e| e.session == session && e.is_track())
					.map(|e| (e.point, e.ctl(), e.start()))
					.collect();
				tracks.sort_unstable_by_key(|t| t.0);
				tracks.dedup_by_key(|t| t.0);

				let leadout = raw.iter()
					.find(|e| e.session == session && e.is_leadout())
					.map(CdRawToc::start);
				let kind = raw.iter()
					.filter(|e| e.session == session)
					.find_map(CdRawToc::disc_type);

				if let Some(leadout) = leadout {
					if ! tracks.is_empty() { return Ok((kind, tracks, leadout)); }
				}
				if session != 1 { return Err(BurnError::Session(session)); }
			},
			Err(e) => if session != 1 { return Err(e); },
		}

		// The formatted TOC doesn't know about sessions, so can only stand in
		// for the first.
		let toc =
			if self.has(DriverOptions::GET_TOC_GENERIC) { self.get_toc_generic()? }
			else { self.get_toc()? };
		let leadout = toc.iter()
			.find(|e| e.is_leadout())
			.map(|e| e.start)
			.ok_or(BurnError::NoDisc)?;
		let tracks = toc.iter()
			.filter(|e| ! e.is_leadout())
			.map(|e| (e.track, e.ctl(), e.start))
			.collect();

		Ok((None, tracks, leadout))
	}

	/// # Read Layout.
	fn read_layout<R: Reporter + ?Sized>(&mut self, opts: &ReadOptions, reporter: &R)
	-> Result<Layout, BurnError> {
		self.wait_ready()?;
		if 0 != opts.speed() {
			if let Err(e) = self.set_read_speed(opts.speed()) { self.log.add_error(0, &e); }
		}

		let session = opts.session();
		let (kind, tracks, leadout) = self.session_tracks(session)?;

		// Data tracks need a closer look to tell the mode.
		let mut spans = Vec::with_capacity(tracks.len());
		let mut sector = vec![0_u8; usize::from(CD_FRAME_SIZE)];
		for (num, ctl, start) in tracks {
			let mode =
				if 0 == ctl & 0x04 { TrackMode::Audio }
				else {
					let found = self.read_cd(start, 1, &mut sector).ok()
						.and_then(|()| sector_mode(&sector));
					match (found, kind) {
						(Some(2), Some(TocType::CdRom)) => TrackMode::Mode2,
						(Some(2), _) => TrackMode::Mode2FormMix,
						_ => TrackMode::Mode1,
					}
				};
			spans.push(Span {
				num,
				ctl,
				mode,
				pregap_start: start,
				start,
				indices: Vec::new(),
				isrc: None,
			});
		}

		let kind =
			if spans.iter().all(|s| matches!(s.mode, TrackMode::Audio)) { TocType::CdDa }
			else {
				kind.unwrap_or_else(||
					if spans.iter().any(|s| s.mode.is_xa()) { TocType::CdRomXa }
					else { TocType::CdRom }
				)
			};

		// Anything ahead of the first track of the first session is that
		// track's pre-gap.
		if session == 1 {
			if let Some(first) = spans.first_mut() {
				if 0 < first.start { first.pregap_start = 0; }
			}
		}

		if opts.indices() && ! self.has(DriverOptions::NO_PREGAP_READ) {
			self.analyze_spans(&mut spans, leadout, opts.scan(), reporter);
		}

		let catalog = self.read_catalog().ok().flatten();
		for span in &mut spans {
			if matches!(span.mode, TrackMode::Audio) {
				span.isrc = self.read_isrc(span.num).ok().flatten();
			}
		}
		let cd_text =
			if session == 1 { self.read_cd_text().ok().flatten() }
			else { None };

		Ok(Layout { kind, spans, leadout, catalog, cd_text })
	}

	/// # Analyze Spans.
	///
	/// Fill in pre-gaps and index marks for the audio tracks. Failures are
	/// warnings; the TOC positions stand.
	fn analyze_spans<R: Reporter + ?Sized>(
		&mut self,
		spans: &mut [Span],
		leadout: i32,
		scan: bool,
		reporter: &R,
	) {
		let total = u32::try_from(spans.len()).unwrap_or(u32::MAX);
		reporter.status(Phase::Analyze, total);

		for idx in 0..spans.len() {
			let (num, start) = (spans[idx].num, spans[idx].start);
			if matches!(spans[idx].mode, TrackMode::Audio) {
				// Pre-gaps are only looked for after other audio.
				let prev_start = idx.checked_sub(1)
					.and_then(|p| spans.get(p))
					.filter(|p| matches!(p.mode, TrackMode::Audio))
					.map_or(start, |p| p.start);
				let end = spans.get(idx + 1).map_or(leadout, |s| s.start);

				let res =
					if scan { self.analyze_track_scan(num, prev_start, start, end) }
					else { self.analyze_track_search(num, prev_start, start, end) };
				match res {
					Ok((pregap_start, indices)) => {
						if 0 < idx { spans[idx].pregap_start = pregap_start; }
						spans[idx].indices = indices;
					},
					Err(e) => {
						self.log.add_error(start, &e);
						reporter.message(
							MessageKind::Warning,
							&format!("Unable to analyze track #{num:02}: {e}"),
						);
					},
				}
			}

			reporter.progress(Progress {
				track: num,
				delta: 1,
				done: u32::try_from(idx + 1).unwrap_or(u32::MAX),
				total,
				..Progress::default()
			});
		}
	}

	/// # Extract.
	fn extract<E, R>(
		&mut self,
		layout: &Layout,
		data_file: &Path,
		extractor: &mut E,
		reporter: &R,
		killed: &KillSwitch,
	) -> Result<(), BurnError>
	where E: AudioExtractor, R: Reporter + ?Sized {
		let mut sink = Sink::create(data_file, layout.is_wav(data_file))?;
		let swap = self.has(DriverOptions::SWAP_READ_SAMPLES);
		let frame = usize::from(CD_FRAME_SIZE);
		let mut buf = vec![0_u8; usize::from(READ_CHUNK) * frame];
		let mut report = ExtractReport::default();

		let total = layout.blocks();
		let mut done = 0;
		reporter.status(Phase::Read, total);

		for (idx, span) in layout.spans.iter().enumerate() {
			let end = layout.end(idx);
			self.log.track(span.num, end.abs_diff(span.pregap_start));

			let mut lba = span.pregap_start;
			while lba < end {
				if killed.killed() { return Err(BurnError::Killed); }

				let count = chunk_len(lba, end);
				let len = usize::from(count) * frame;
				let res =
					if matches!(span.mode, TrackMode::Audio) {
						extractor.read_audio(self, lba, count, &mut buf).map(|r| {
							report += r;
							if swap {
								for pair in buf[..len].chunks_exact_mut(2) { pair.swap(0, 1); }
							}
						})
					}
					else { self.read_cd(lba, count, &mut buf) };
				if let Err(e) = res {
					self.log.add_error(lba, &e);
					return Err(e);
				}

				for sector in buf[..len].chunks_exact(frame) {
					sink.write(user_data(span.mode, sector))?;
				}

				lba += i32::from(count);
				done += u32::from(count);
				reporter.progress(Progress {
					track: span.num,
					delta: u32::from(count),
					done,
					total,
					..Progress::default()
				});
			}
		}

		self.log.end_track();
		sink.finish()?;

		if ! report.is_clean() {
			reporter.message(
				MessageKind::Warning,
				&format!(
					"{} sector(s) could not be verified; {} read(s) were out of place.",
					report.failures,
					report.desyncs,
				),
			);
		}

		Ok(())
	}
}



/// # READ CD CDB.
///
/// Sync, headers, user data and EDC/ECC, i.e. the whole 2352-byte sector,
/// plus the selected sub-channel.
const fn read_cd_cdb(lba: i32, count: u16, sub: u8) -> [u8; 12] {
	let [a, b, c, d] = lba.to_be_bytes();
	let [e, f] = count.to_be_bytes();
	[0xBE, 0, a, b, c, d, 0, e, f, 0xF8, sub, 0]
}

/// # Chunk Length.
fn chunk_len(lba: i32, end: i32) -> u16 {
	u16::try_from(end.saturating_sub(lba).min(i32::from(READ_CHUNK))).unwrap_or(READ_CHUNK)
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		bcd,
		DriverKind,
		Msf,
		report::record::RecordReporter,
		scsi::mock::FakeDrive,
		SubTrackSource,
		VerifyExtractor,
	};

	/// # Sub-Channel Layout.
	///
	/// Two tracks: the first has an index 2 at 100; the second has a pre-gap
	/// from 300 to 450 and an index 2 at 500. The lead-out is at 650.
	const POSITIONS: [(i32, u8, u8); 5] = [
		(0, 1, 1),
		(100, 1, 2),
		(300, 2, 0),
		(450, 2, 1),
		(500, 2, 2),
	];

	/// # Raw Descriptor (BCD).
	fn desc(point: u8, adr_ctl: u8, lba: i32) -> [u8; 11] {
		let [m, s, f] = Msf::from_lba(lba).to_bcd();
		[1, adr_ctl, 0, point, 0, 0, 0, 0, m, s, f]
	}

	/// # Raw TOC Response.
	fn raw_toc() -> Vec<u8> {
		let entries = [
			[1, 0x10, 0, 0xA0, 0, 0, 0, 0, bcd(1), 0, 0],
			[1, 0x10, 0, 0xA1, 0, 0, 0, 0, bcd(2), 0, 0],
			desc(0xA2, 0x10, 650),
			desc(bcd(1), 0x10, 0),
			desc(bcd(2), 0x10, 450),
		];
		let mut out = vec![0, 0, 1, 1];
		for e in entries { out.extend_from_slice(&e); }
		let [a, b] = u16::try_from(out.len() - 2).unwrap().to_be_bytes();
		out[0] = a;
		out[1] = b;
		out
	}

	fn driver(opts: DriverOptions) -> CdrDriver<FakeDrive> {
		let mut dev = FakeDrive::default();
		dev.positions = POSITIONS.to_vec();
		dev.respond(&[0x43, 0x02, 0x02], &raw_toc());
		CdrDriver::new(dev, DriverKind::Mmc, opts)
	}

	#[test]
	fn t_search() {
		let mut drv = driver(DriverOptions::empty());

		let (pregap, indices) = drv.analyze_track_search(2, 0, 450, 650)
			.expect("Search failed.");
		assert_eq!(pregap, 300, "Pre-gap start.");
		assert_eq!(indices, vec![50], "Index 2 offset.");
		assert!(drv.dev().probes < 60, "Binary search should be quick.");

		let (pregap, indices) = drv.analyze_track_search(1, 0, 0, 450)
			.expect("Search failed.");
		assert_eq!(pregap, 0, "The first track has no searchable pre-gap.");
		assert_eq!(indices, vec![100]);

		// Nothing to find.
		assert_eq!(drv.find_index(2, 9, 451, 650), Ok(None));
		assert_eq!(drv.find_index(2, 1, 460, 460), Ok(None), "Empty range.");
	}

	#[test]
	fn t_search_position() {
		// The drive reports the block after the one played; each probe
		// should therefore play one block early.
		let mut drv = driver(DriverOptions::empty());
		assert!(drv.dev().report_next, "The default drive reports the next block.");
		assert_eq!(drv.find_index(1, 2, 1, 450), Ok(Some(100)), "Off by one.");
		assert_eq!(drv.find_index(2, 0, 1, 450), Ok(Some(300)), "Off by one.");
		assert_eq!(drv.find_index(2, 2, 451, 650), Ok(Some(500)), "Off by one.");
		let played = drv.dev().commands(0x45)
			.map(|c| i32::from_be_bytes([c.cdb[2], c.cdb[3], c.cdb[4], c.cdb[5]]))
			.collect::<Vec<_>>();
		assert!(played.contains(&99), "Index 2 is confirmed by playing 99.");
		assert_eq!(drv.dev().commands(0x45).count(), drv.dev().probes, "One play per probe.");

		// Drives reporting the played block itself take a second read.
		let mut drv = driver(DriverOptions::empty());
		drv.dev_mut().report_next = false;
		assert_eq!(drv.find_index(1, 2, 1, 450), Ok(Some(100)));
		assert_eq!(drv.find_index(2, 2, 451, 650), Ok(Some(500)));
		assert_eq!(drv.dev().commands(0x45).count(), drv.dev().probes);

		// A drive that wanders off is an error.
		let mut drv = driver(DriverOptions::empty());
		drv.dev_mut().report_skew = 5;
		assert_eq!(drv.find_index(1, 2, 1, 450), Err(BurnError::SubChannel));
	}

	#[test]
	fn t_scan() {
		let mut drv = driver(DriverOptions::empty());
		let (pregap, indices) = drv.analyze_track_scan(2, 0, 450, 650)
			.expect("Scan failed.");
		assert_eq!(pregap, 300);
		assert_eq!(indices, vec![50]);
		assert_eq!(drv.dev().probes, 0, "Scanning doesn't play anything.");

		// Packed sub-channel works the same way.
		let mut drv = driver(DriverOptions::USE_PQ);
		let (_, indices) = drv.analyze_track_scan(1, 0, 0, 450).expect("Scan failed.");
		assert_eq!(indices, vec![100]);
		let cmd = drv.dev().commands(0xBE).next().expect("No read.");
		assert_eq!(cmd.cdb[10], 2, "PQ should be requested.");

		// Some drives can't do it at all.
		let mut drv = driver(DriverOptions::NO_SUBCHAN_READ);
		assert_eq!(
			drv.analyze_track_scan(2, 0, 450, 650),
			Err(BurnError::Unsupported("sub-channel reads")),
		);
	}

	#[test]
	fn t_catalog_isrc() {
		let mut drv = driver(DriverOptions::empty());
		assert_eq!(drv.read_catalog(), Ok(None), "MCVAL unset.");

		let mut mcn = vec![0_u8; 24];
		mcn[8] = 0x80;
		mcn[9..22].copy_from_slice(b"4006381333931");
		drv.dev_mut().respond(&[0x42, 0, 0x40, 0x02], &mcn);
		assert_eq!(
			drv.read_catalog().expect("Catalog failed.").map(|b| b.to_string()),
			Some("4006381333931".to_owned()),
		);

		let mut isrc = vec![0_u8; 24];
		isrc[8] = 0x80;
		isrc[9..21].copy_from_slice(b"USRC17607839");
		drv.dev_mut().respond(&[0x42, 0, 0x40, 0x03, 0, 0, 2], &isrc);
		assert_eq!(
			drv.read_isrc(2).expect("ISRC failed.").map(|i| *i.as_bytes()),
			Some(*b"USRC17607839"),
		);
		assert_eq!(drv.read_isrc(1), Ok(None), "Track one has none.");
	}

	#[test]
	fn t_read_disk_toc() {
		let mut drv = driver(DriverOptions::empty());
		let reporter = RecordReporter::default();
		let toc = drv.read_disk_toc(Path::new("disc.bin"), &ReadOptions::default(), &reporter)
			.expect("Analysis failed.");

		assert_eq!(toc.kind(), TocType::CdDa);
		assert_eq!(toc.len(), 2);
		assert_eq!(toc.blocks(), 650);

		let t1 = &toc.tracks()[0];
		assert_eq!(t1.pregap(), 0);
		assert_eq!(t1.blocks(), 300);
		assert_eq!(t1.indices(), &[100]);

		let t2 = &toc.tracks()[1];
		assert_eq!(t2.pregap(), 150);
		assert_eq!(t2.blocks(), 350);
		assert_eq!(t2.indices(), &[50]);
		assert_eq!(
			t2.subtracks()[0].source(),
			&SubTrackSource::File { path: "disc.bin".into(), offset: 300 * 2352, swap: false },
		);

		assert_eq!(toc.track_start(2), Some(450), "Positions should survive the trip.");
		assert_eq!(*reporter.finished.lock().unwrap(), Some(0));

		// Without index analysis, the TOC positions are all there is.
		let mut drv = driver(DriverOptions::NO_PREGAP_READ);
		let toc = drv.read_disk_toc(Path::new("disc.bin"), &ReadOptions::default(), &reporter)
			.expect("Analysis failed.");
		assert_eq!(toc.tracks()[1].pregap(), 0);
		assert_eq!(drv.dev().probes, 0);

		// There is only one session.
		let mut drv = driver(DriverOptions::empty());
		let opts = ReadOptions::default().with_session(2);
		assert_eq!(
			drv.read_disk_toc(Path::new("disc.bin"), &opts, &reporter),
			Err(BurnError::Session(2)),
		);
		assert_eq!(*reporter.finished.lock().unwrap(), Some(1));
	}

	#[test]
	fn t_analysis_warnings() {
		let mut drv = driver(DriverOptions::NO_SUBCHAN_READ);
		let reporter = RecordReporter::default();
		let opts = ReadOptions::default().with_scan(true);
		let toc = drv.read_disk_toc(Path::new("disc.bin"), &opts, &reporter)
			.expect("Analysis failed.");
		assert_eq!(toc.len(), 2, "Failed analysis shouldn't sink the TOC.");

		let messages = reporter.messages.lock().unwrap();
		assert_eq!(messages.len(), 2, "One warning per audio track.");
		assert!(messages.iter().all(|(k, _)| matches!(k, MessageKind::Warning)));
	}

	#[test]
	fn t_read_disk() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let reporter = RecordReporter::default();
		let killed = KillSwitch::default();

		// Raw.
		let dst = dir.path().join("disc.bin");
		let mut drv = driver(DriverOptions::empty());
		let mut ext = VerifyExtractor::default();
		let toc = drv.read_disk(&dst, &ReadOptions::default(), &mut ext, &reporter, &killed)
			.expect("Read failed.");
		assert_eq!(toc.blocks(), 650);

		let raw = std::fs::read(&dst).expect("Missing image.");
		assert_eq!(raw.len(), 650 * 2352);
		let sector = &raw[451 * 2352..452 * 2352];
		assert_eq!(sector[..4], 451_i32.to_le_bytes(), "Sectors should be in order.");

		let phases = reporter.phases.lock().unwrap().clone();
		assert_eq!(phases, vec![Phase::Analyze, Phase::Read]);
		let last = reporter.progress.lock().unwrap().last().copied().expect("No progress.");
		assert_eq!(last.done, 650);
		assert_eq!(last.track, 2);

		// Swapped.
		let dst = dir.path().join("swap.bin");
		let mut drv = driver(DriverOptions::SWAP_READ_SAMPLES);
		drv.read_disk(&dst, &ReadOptions::default(), &mut ext, &reporter, &killed)
			.expect("Read failed.");
		let raw = std::fs::read(&dst).expect("Missing image.");
		let [a, b, c, d] = 451_i32.to_le_bytes();
		assert_eq!(raw[451 * 2352..451 * 2352 + 4], [b, a, d, c]);

		// WAV.
		let dst = dir.path().join("disc.wav");
		let mut drv = driver(DriverOptions::empty());
		let toc = drv.read_disk(&dst, &ReadOptions::default(), &mut ext, &reporter, &killed)
			.expect("Read failed.");
		let wav = hound::WavReader::open(&dst).expect("Bad WAV.");
		assert_eq!(wav.spec(), WAVE_SPEC);
		assert_eq!(wav.duration(), 650 * 588);
		assert_eq!(
			toc.tracks()[1].subtracks()[0].source(),
			&SubTrackSource::Wav { path: dst.clone(), offset: 300 * 588 },
		);

		// Aborted.
		killed.kill();
		let mut drv = driver(DriverOptions::empty());
		assert_eq!(
			drv.read_disk(&dir.path().join("dead.bin"), &ReadOptions::default(), &mut ext, &reporter, &killed),
			Err(BurnError::Killed),
		);
		assert_eq!(*reporter.finished.lock().unwrap(), Some(1));
	}
}
