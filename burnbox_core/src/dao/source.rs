/*!
# Burnbox: Track Sources

This turns a track's sub-tracks into one continuous stream of bytes, and
that stream into write blocks for the ring.
*/

use crate::{
	BurnError,
	KillSwitch,
	sector::to_write_block,
	SubTrack,
	SubTrackSource,
	Toc,
	Track,
	WAVE_SPEC,
};
use super::ring::{
	Chunk,
	CHUNK_BLOCKS,
	Ring,
};
use std::{
	fs::File,
	io::{
		BufReader,
		Read,
		Seek,
		SeekFrom,
	},
	path::Path,
};



/// # Open Sub-Track.
///
/// Return a reader limited to the sub-track's length.
fn open(sub: &SubTrack) -> Result<Box<dyn Read + Send>, BurnError> {
	let len = sub.len();
	match sub.source() {
		SubTrackSource::Zero => Ok(Box::new(std::io::repeat(0).take(len))),
		SubTrackSource::File { path, offset, swap } => {
			let mut file = File::open(path).map_err(|_| read_err(path))?;
			file.seek(SeekFrom::Start(*offset)).map_err(|_| read_err(path))?;
			let file = BufReader::new(file).take(len);
			if *swap { Ok(Box::new(SwapReader::new(file))) }
			else { Ok(Box::new(file)) }
		},
		SubTrackSource::Wav { path, offset } => {
			let mut wav = hound::WavReader::open(path).map_err(|_| read_err(path))?;
			if wav.spec() != WAVE_SPEC {
				return Err(BurnError::WavFormat(path.to_string_lossy().into_owned()));
			}

			// CD audio and WAV PCM share a byte order, so once positioned,
			// the samples can be passed through untouched.
			wav.seek(*offset).map_err(|_| read_err(path))?;
			Ok(Box::new(wav.into_inner().take(len)))
		},
		SubTrackSource::Stdin => Ok(Box::new(std::io::stdin().take(len))),
	}
}

/// # Read Error.
fn read_err(path: &Path) -> BurnError {
	BurnError::Read(path.to_string_lossy().into_owned())
}



/// # Track Reader.
///
/// Read a track's sub-tracks back-to-back, opening each only once the
/// previous one runs dry.
struct TrackReader<'a> {
	subs: std::slice::Iter<'a, SubTrack>,
	current: Option<Box<dyn Read + Send>>,
}

impl<'a> TrackReader<'a> {
	/// # New.
	fn new(track: &'a Track) -> Self {
		Self {
			subs: track.subtracks().iter(),
			current: None,
		}
	}

	/// # Fill.
	///
	/// Fill as much of `buf` as possible, returning the number of bytes
	/// read. Anything short of the full length means the data is
	/// exhausted.
	fn fill(&mut self, buf: &mut [u8]) -> Result<usize, BurnError> {
		let mut done = 0;
		while done < buf.len() {
			if self.current.is_none() {
				match self.subs.next() {
					Some(sub) => { self.current = Some(open(sub)?); },
					None => break,
				}
			}

			let Some(src) = self.current.as_mut() else { break; };
			match src.read(&mut buf[done..]) {
				Ok(0) => { self.current = None; },
				Ok(n) => { done += n; },
				Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {},
				Err(e) => return Err(BurnError::Read(e.to_string())),
			}
		}

		Ok(done)
	}
}



/// # Swapped Reader.
///
/// Swap the bytes of each 16-bit sample on the way through.
struct SwapReader<R: Read> {
	inner: R,
	odd: Option<u8>,
}

impl<R: Read> SwapReader<R> {
	/// # New.
	const fn new(inner: R) -> Self {
		Self { inner, odd: None }
	}
}

impl<R: Read> Read for SwapReader<R> {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		if buf.len() < 2 { return self.inner.read(buf); }

		// Start with any leftover byte from last time.
		let mut len = 0;
		if let Some(b) = self.odd.take() {
			buf[0] = b;
			len = 1;
		}
		len += self.inner.read(&mut buf[len..])?;

		// Hold back a dangling byte until its partner arrives.
		if len % 2 == 1 {
			len -= 1;
			if len == 0 {
				// Nothing more is coming; pass it on as-is.
				let mut tmp = [0_u8; 1];
				if self.inner.read(&mut tmp)? == 0 { return Ok(1); }
				buf[1] = tmp[0];
				len = 2;
			}
			else { self.odd = Some(buf[len]); }
		}

		for pair in buf[..len].chunks_exact_mut(2) { pair.swap(0, 1); }
		Ok(len)
	}
}



/// # Feed the Ring.
///
/// Read every track in order, converting to write blocks and passing full
/// chunks to the writer. Partial trailing blocks are padded with zeroes.
///
/// Errors are passed through the ring too; the writer decides what to do
/// with them.
pub(super) fn feed(toc: &Toc, ring: &Ring, killed: &KillSwitch) {
	/// # Finish on Exit.
	///
	/// The writer blocks on the ring, so it must hear the end even if
	/// this thread panics.
	struct Finish<'a>(&'a Ring);
	impl Drop for Finish<'_> {
		fn drop(&mut self) { self.0.finish(); }
	}

	let _finish = Finish(ring);
	if let Err(e) = feed_tracks(toc, ring, killed) { ring.push(Err(e)); }
}

/// # Feed Tracks.
fn feed_tracks(toc: &Toc, ring: &Ring, killed: &KillSwitch) -> Result<(), BurnError> {
	for (idx, track) in toc.tracks().iter().enumerate() {
		let mode = track.mode();
		let src_size = usize::from(mode.source_block_size());
		let dst_size = usize::from(mode.write_block_size());
		let mut src = vec![0_u8; src_size];
		let mut reader = TrackReader::new(track);

		let mut left = track.blocks();
		while 0 < left {
			if killed.killed() { return Ok(()); }
			let Some(mut data) = ring.take_free() else { return Ok(()); };

			let blocks = left.min(CHUNK_BLOCKS);
			data.clear();
			data.resize(blocks as usize * dst_size, 0);
			for out in data.chunks_exact_mut(dst_size) {
				let n = reader.fill(&mut src)?;
				src[n..].fill(0);
				to_write_block(mode, &src, out);
			}

			ring.push(Ok(Chunk { track: idx, blocks, data }));
			left -= blocks;
		}
	}

	Ok(())
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		TocType,
		TrackMode,
	};
	use std::io::Write;

	#[test]
	fn t_swap() {
		let src: Vec<u8> = (0..9_u8).collect();
		let mut out = Vec::new();
		SwapReader::new(src.as_slice()).read_to_end(&mut out).expect("Read failed.");
		assert_eq!(out, [1, 0, 3, 2, 5, 4, 7, 6, 8], "The odd byte passes through.");

		// Tiny reads shouldn't confuse it.
		let mut reader = SwapReader::new((&[1_u8][..]).chain(&[2_u8][..]));
		let mut out = Vec::new();
		reader.read_to_end(&mut out).expect("Read failed.");
		assert_eq!(out, [2, 1]);
	}

	#[test]
	fn t_track_reader() {
		let mut tmp = tempfile::NamedTempFile::new().expect("Tempfile failed.");
		tmp.write_all(&[9_u8; 100]).expect("Write failed.");
		tmp.write_all(&[7_u8; 100]).expect("Write failed.");
		tmp.flush().expect("Flush failed.");

		let track = Track::new(TrackMode::Audio)
			.with_subtrack(SubTrack::zero(10))
			.with_subtrack(SubTrack::file(tmp.path(), 100, 50))
			.with_subtrack(SubTrack::swapped_file(tmp.path(), 0, 4));

		let mut reader = TrackReader::new(&track);
		let mut buf = [1_u8; 100];
		assert_eq!(reader.fill(&mut buf), Ok(64), "Short data is short.");
		assert!(buf[..10].iter().all(|b| *b == 0));
		assert!(buf[10..60].iter().all(|b| *b == 7));
		assert!(buf[60..64].iter().all(|b| *b == 9));

		// Missing files are read errors.
		let track = Track::new(TrackMode::Audio)
			.with_subtrack(SubTrack::file("/nowhere/nothing.bin", 0, 10));
		assert!(matches!(TrackReader::new(&track).fill(&mut buf), Err(BurnError::Read(_))));
	}

	#[test]
	fn t_feed() {
		let mut toc = Toc::new(TocType::CdRom);
		toc.push_track(
			Track::new(TrackMode::Mode1).with_subtrack(SubTrack::zero(100 * 2048 + 10))
		).expect("Push failed.");
		toc.push_track(
			Track::new(TrackMode::Mode2Form1).with_subtrack(SubTrack::zero(2048))
		).expect("Push failed.");

		let ring = Ring::new(4);
		let killed = KillSwitch::default();
		std::thread::scope(|s| {
			s.spawn(|| feed(&toc, &ring, &killed));

			let mut got = Vec::new();
			while let Some(chunk) = ring.pop() {
				let chunk = chunk.expect("Feed failed.");
				got.push((chunk.track, chunk.blocks, chunk.data.len()));
				ring.recycle(chunk.data);
			}

			assert_eq!(got, vec![
				(0, 75, 75 * 2048),
				(0, 26, 26 * 2048),
				(1, 1, 2336),
			], "Chunks shouldn't cross tracks.");
		});
	}
}
