/*!
# Burnbox: CD-TEXT

CD-TEXT lives in the R-W sub-channels of the lead-in as a loop of 18-byte
packs: a four-byte header, twelve bytes of payload, and a CRC. Up to eight
language blocks can be stored, each with its own set of packs and a trailing
trio of "size info" packs summarizing the lot.
*/

use crate::BurnError;
use crc::{
	Crc,
	CRC_16_GSM,
};
use std::{
	collections::BTreeMap,
	fmt,
};



/// # Pack CRC.
const PACK_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_GSM);

/// # Pack Size.
pub(crate) const PACK_SIZE: usize = 18;

/// # Payload Size.
const PAYLOAD_SIZE: usize = 12;

/// # Maximum Blocks.
const MAX_BLOCKS: usize = 8;

/// # Language: English.
pub const LANGUAGE_ENGLISH: u8 = 0x09;

/// # Tab (Same As Previous).
const TAB: u8 = 0x09;



/// # Helper: CD-TEXT Fields.
macro_rules! fields {
	( $( $k:ident $v:literal $vstr:literal $text:literal ),+ $(,)? ) => (
		#[repr(u8)]
		#[derive(Debug, Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
		/// # CD-TEXT Pack Type.
		pub enum CdTextKind {
			$(
				#[doc = concat!("# ", stringify!($k), ".")]
				$k = $v,
			)+
		}

		impl CdTextKind {
			/// # All Kinds.
			pub const ALL: [Self; 13] = [ $( Self::$k, )+ ];

			#[must_use]
			/// # As Str.
			pub const fn as_str(self) -> &'static str {
				match self {
					$( Self::$k => $vstr, )+
				}
			}

			#[must_use]
			/// # From Pack Type.
			pub const fn from_u8(src: u8) -> Option<Self> {
				match src {
					$( $v => Some(Self::$k), )+
					_ => None,
				}
			}

			#[must_use]
			/// # Is Text?
			///
			/// Return `true` for kinds stored as null-terminated per-track
			/// strings, `false` for the binary ones.
			pub const fn is_text(self) -> bool {
				match self {
					$( Self::$k => $text, )+
				}
			}
		}
	);
}

fields! {
	Title      0x80 "TITLE"      true,
	Performer  0x81 "PERFORMER"  true,
	Songwriter 0x82 "SONGWRITER" true,
	Composer   0x83 "COMPOSER"   true,
	Arranger   0x84 "ARRANGER"   true,
	Message    0x85 "MESSAGE"    true,
	DiscId     0x86 "DISC_ID"    true,
	Genre      0x87 "GENRE"      false,
	TocInfo    0x88 "TOC_INFO"   false,
	TocInfo2   0x89 "TOC_INFO2"  false,
	Closed     0x8D "CLOSED"     true,
	UpcEan     0x8E "UPC_EAN"    true,
	SizeInfo   0x8F "SIZE_INFO"  false,
}

impl fmt::Display for CdTextKind {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		<str as fmt::Display>::fmt(self.as_str(), f)
	}
}



#[derive(Debug, Clone, Default, Eq, PartialEq)]
/// # CD-TEXT.
///
/// This holds between zero and eight language blocks.
///
/// ```
/// use burnbox_core::{CdText, CdTextKind};
///
/// let mut text = CdText::default();
/// let block = text.add_block(0x09).unwrap();
/// block.set(CdTextKind::Title, 0, "Album").unwrap();
/// block.set(CdTextKind::Title, 1, "Song").unwrap();
///
/// let packs = text.encode(1, 1).unwrap();
/// let back = CdText::decode(packs.as_flattened());
/// assert_eq!(back, text);
/// ```
pub struct CdText {
	blocks: Vec<CdTextBlock>,
}

impl CdText {
	/// # Add Block.
	///
	/// ## Errors
	///
	/// Returns an error if there are already eight blocks.
	pub fn add_block(&mut self, language: u8) -> Result<&mut CdTextBlock, BurnError> {
		if self.blocks.len() == MAX_BLOCKS {
			return Err(BurnError::CdText("too many language blocks"));
		}
		self.blocks.push(CdTextBlock::new(language));
		let last = self.blocks.len() - 1;
		Ok(&mut self.blocks[last])
	}

	#[must_use]
	/// # Blocks.
	pub fn blocks(&self) -> &[CdTextBlock] { &self.blocks }

	#[must_use]
	/// # Block.
	pub fn block(&self, idx: usize) -> Option<&CdTextBlock> { self.blocks.get(idx) }

	#[must_use]
	/// # Is Empty?
	pub fn is_empty(&self) -> bool { self.blocks.iter().all(CdTextBlock::is_empty) }
}

impl CdText {
	/// # Encode Packs.
	///
	/// Build the full pack sequence for all blocks, size info included, with
	/// CRCs calculated.
	///
	/// ## Errors
	///
	/// Returns an error if the data does not fit within the 256 available
	/// sequence numbers or the track range is nonsense.
	pub fn encode(&self, first_track: u8, last_track: u8)
	-> Result<Vec<[u8; PACK_SIZE]>, BurnError> {
		if first_track == 0 || last_track < first_track {
			return Err(BurnError::CdText("invalid track range"));
		}

		// Build the text packs for each block, sans sequence numbers.
		let mut raw: Vec<Vec<[u8; PACK_SIZE]>> = Vec::with_capacity(self.blocks.len());
		for (idx, block) in self.blocks.iter().enumerate() {
			#[allow(clippy::cast_possible_truncation)]
			raw.push(block.encode_text(idx as u8, first_track, last_track));
		}

		// Work out the sequence ranges; each block also gets three size packs.
		let mut last_seqs = [0_u8; MAX_BLOCKS];
		let mut seq = 0_usize;
		for (idx, packs) in raw.iter().enumerate() {
			seq += packs.len() + 3;
			last_seqs[idx] = u8::try_from(seq - 1)
				.map_err(|_| BurnError::CdText("too much text"))?;
		}

		// Now put it all together.
		let mut languages = [0_u8; MAX_BLOCKS];
		for (idx, block) in self.blocks.iter().enumerate() { languages[idx] = block.language; }

		let mut out = Vec::with_capacity(seq);
		let mut seq = 0_u8;
		for (idx, packs) in raw.into_iter().enumerate() {
			// Size info payload.
			let mut size = [0_u8; 36];
			size[1] = first_track;
			size[2] = last_track;
			for pack in &packs { size[4 + usize::from(pack[0] & 0x0F)] += 1; }
			size[4 + 0x0F] = 3;
			size[20..28].copy_from_slice(&last_seqs);
			size[28..36].copy_from_slice(&languages);

			#[allow(clippy::cast_possible_truncation)]
			let block_bits = (idx as u8) << 4;
			for mut pack in packs {
				pack[2] = seq;
				finish_pack(&mut pack);
				out.push(pack);
				seq = seq.wrapping_add(1);
			}

			for (i, chunk) in size.chunks_exact(PAYLOAD_SIZE).enumerate() {
				let mut pack = [0_u8; PACK_SIZE];
				pack[0] = CdTextKind::SizeInfo as u8;
				#[allow(clippy::cast_possible_truncation)]
				{ pack[1] = i as u8; }
				pack[2] = seq;
				pack[3] = block_bits;
				pack[4..16].copy_from_slice(chunk);
				finish_pack(&mut pack);
				out.push(pack);
				seq = seq.wrapping_add(1);
			}
		}

		Ok(out)
	}

	#[must_use]
	/// # Decode Packs.
	///
	/// Parse packs as returned by READ TOC format 5 (minus the four-byte
	/// response header). Packs with bad CRCs, binary payloads, or double-byte
	/// text are skipped.
	pub fn decode(raw: &[u8]) -> Self {
		let mut out = Self::default();
		let mut cursors: BTreeMap<(u8, CdTextKind), (u8, Vec<u8>)> = BTreeMap::new();
		let mut languages: BTreeMap<u8, u8> = BTreeMap::new();

		for pack in raw.chunks_exact(PACK_SIZE) {
			if ! check_pack(pack) { continue; }
			let Some(kind) = CdTextKind::from_u8(pack[0]) else { continue; };
			let block_idx = (pack[3] >> 4) & 0x07;

			// Size info only tells us the language.
			if matches!(kind, CdTextKind::SizeInfo) {
				// The language codes start at byte 28 of the combined
				// payload, i.e. byte 4 of the third pack.
				if pack[1] == 2 {
					for (i, lang) in pack[8..16].iter().copied().enumerate() {
						#[allow(clippy::cast_possible_truncation)]
						if lang != 0 { languages.insert(i as u8, lang); }
					}
				}
				continue;
			}

			if ! kind.is_text() || 0 != pack[3] & 0x80 { continue; }

			// Make sure the block exists.
			while out.blocks.len() <= usize::from(block_idx) {
				out.blocks.push(CdTextBlock::new(LANGUAGE_ENGLISH));
			}
			let block = &mut out.blocks[usize::from(block_idx)];

			let (track, buf) = cursors.entry((block_idx, kind)).or_default();
			if buf.is_empty() { *track = pack[1]; }
			for b in pack[4..16].iter().copied() {
				if b == 0 {
					if buf.as_slice() == [TAB] {
						if let Some(prev) = track.checked_sub(1).and_then(|t| block.fields.get(&(kind, t))) {
							let prev = prev.clone();
							block.fields.insert((kind, *track), prev);
						}
					}
					else if ! buf.is_empty() {
						block.fields.insert((kind, *track), std::mem::take(buf));
					}
					buf.truncate(0);
					*track = track.saturating_add(1);
				}
				else { buf.push(b); }
			}
		}

		for (idx, lang) in languages {
			if let Some(block) = out.blocks.get_mut(usize::from(idx)) { block.language = lang; }
		}

		out
	}
}

impl CdText {
	#[must_use]
	/// # R-W Symbols for a Lead-in Block.
	///
	/// Each lead-in sector carries four packs (72 bytes) as 96 six-bit
	/// symbols. The packs are looped for as long as the lead-in runs; `idx`
	/// is the zero-based sector number within it.
	pub fn rw_symbols(packs: &[[u8; PACK_SIZE]], idx: usize) -> [u8; 96] {
		let mut out = [0_u8; 96];
		if packs.is_empty() { return out; }

		let mut bytes = [0_u8; 72];
		for (k, chunk) in bytes.chunks_exact_mut(PACK_SIZE).enumerate() {
			chunk.copy_from_slice(&packs[(idx * 4 + k) % packs.len()]);
		}

		for (src, dst) in bytes.chunks_exact(3).zip(out.chunks_exact_mut(4)) {
			dst[0] = src[0] >> 2;
			dst[1] = ((src[0] & 0x03) << 4) | (src[1] >> 4);
			dst[2] = ((src[1] & 0x0F) << 2) | (src[2] >> 6);
			dst[3] = src[2] & 0x3F;
		}

		out
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # CD-TEXT Language Block.
///
/// Values are keyed by kind and track, with track zero holding album-level
/// information. Text is stored as ISO-8859-1.
pub struct CdTextBlock {
	language: u8,
	fields: BTreeMap<(CdTextKind, u8), Vec<u8>>,
}

impl CdTextBlock {
	/// # New.
	const fn new(language: u8) -> Self {
		Self { language, fields: BTreeMap::new() }
	}

	#[must_use]
	/// # Language Code.
	pub const fn language(&self) -> u8 { self.language }

	#[must_use]
	/// # Is Empty?
	pub fn is_empty(&self) -> bool { self.fields.is_empty() }

	/// # Set Value.
	///
	/// ## Errors
	///
	/// Returns an error for binary kinds, or if the value contains characters
	/// that cannot be represented in ISO-8859-1.
	pub fn set(&mut self, kind: CdTextKind, track: u8, value: &str)
	-> Result<(), BurnError> {
		if ! kind.is_text() { return Err(BurnError::CdText("binary field")); }

		let value = value.trim();
		let mut bytes = Vec::with_capacity(value.len());
		for c in value.chars() {
			let b = u8::try_from(u32::from(c))
				.map_err(|_| BurnError::CdText("non-Latin-1 text"))?;
			if b == 0 { return Err(BurnError::CdText("embedded null")); }
			bytes.push(b);
		}

		if bytes.is_empty() { self.fields.remove(&(kind, track)); }
		else { self.fields.insert((kind, track), bytes); }
		Ok(())
	}

	#[must_use]
	/// # Get Value.
	pub fn get(&self, kind: CdTextKind, track: u8) -> Option<String> {
		self.fields.get(&(kind, track))
			.map(|v| v.iter().copied().map(char::from).collect())
	}

	/// # Iterate Values.
	pub fn iter(&self) -> impl Iterator<Item=(CdTextKind, u8, String)> + '_ {
		self.fields.iter().map(|((k, t), v)| (
			*k,
			*t,
			v.iter().copied().map(char::from).collect(),
		))
	}

	/// # Encode Text Packs.
	///
	/// Sequence numbers and CRCs are filled in by the caller.
	fn encode_text(&self, block: u8, first_track: u8, last_track: u8)
	-> Vec<[u8; PACK_SIZE]> {
		let mut out = Vec::new();
		for kind in CdTextKind::ALL {
			if ! kind.is_text() || ! self.fields.keys().any(|(k, _)| *k == kind) {
				continue;
			}

			// Build the byte stream, noting which track and character
			// position each byte belongs to.
			let mut stream: Vec<(u8, u8, u8)> = Vec::new();
			for track in std::iter::once(0).chain(first_track..=last_track) {
				let value = self.fields.get(&(kind, track)).map_or(&[][..], Vec::as_slice);
				for (pos, b) in value.iter().copied().chain(std::iter::once(0)).enumerate() {
					stream.push((b, track, u8::try_from(pos).unwrap_or(u8::MAX)));
				}
			}

			for chunk in stream.chunks(PAYLOAD_SIZE) {
				let mut pack = [0_u8; PACK_SIZE];
				pack[0] = kind as u8;
				pack[1] = chunk[0].1;
				pack[3] = (block << 4) | chunk[0].2.min(15);
				for (dst, (b, _, _)) in pack[4..16].iter_mut().zip(chunk) { *dst = *b; }
				out.push(pack);
			}
		}
		out
	}
}



/// # Finish Pack (CRC).
fn finish_pack(pack: &mut [u8; PACK_SIZE]) {
	let crc = PACK_CRC.checksum(&pack[..16]);
	pack[16..].copy_from_slice(&crc.to_be_bytes());
}

/// # Check Pack CRC.
fn check_pack(pack: &[u8]) -> bool {
	pack.len() == PACK_SIZE &&
	PACK_CRC.checksum(&pack[..16]).to_be_bytes() == [pack[16], pack[17]]
}



#[cfg(test)]
mod test {
	use super::*;

	fn sample() -> CdText {
		let mut text = CdText::default();
		let block = text.add_block(LANGUAGE_ENGLISH).expect("Block failed.");
		block.set(CdTextKind::Title, 0, "Greatest Hits of the Year").expect("Set failed.");
		block.set(CdTextKind::Performer, 0, "Various").expect("Set failed.");
		block.set(CdTextKind::Title, 1, "Intro").expect("Set failed.");
		block.set(CdTextKind::Title, 2, "A Rather Long Song Title Indeed").expect("Set failed.");
		block.set(CdTextKind::Performer, 2, "Somebody").expect("Set failed.");
		block.set(CdTextKind::Message, 1, "Ünïcödé-ish").expect("Set failed.");

		let block = text.add_block(0x08).expect("Block failed.");
		block.set(CdTextKind::Title, 0, "Beste").expect("Set failed.");
		text
	}

	#[test]
	fn t_roundtrip() {
		let text = sample();
		let packs = text.encode(1, 2).expect("Encode failed.");
		assert!(packs.iter().all(|p| check_pack(p)), "Bad CRCs.");

		// Sequence numbers are continuous.
		for (i, p) in packs.iter().enumerate() {
			assert_eq!(usize::from(p[2]), i, "Sequence gap at {i}.");
		}

		let back = CdText::decode(packs.as_flattened());
		assert_eq!(back, text);
		assert_eq!(back.blocks()[1].language(), 0x08);
		assert_eq!(
			back.blocks()[0].get(CdTextKind::Message, 1).as_deref(),
			Some("Ünïcödé-ish"),
		);
	}

	#[test]
	fn t_size_info() {
		let text = sample();
		let packs = text.encode(1, 2).expect("Encode failed.");

		let size: Vec<u8> = packs.iter()
			.filter(|p| p[0] == 0x8F && p[3] >> 4 == 0)
			.flat_map(|p| p[4..16].to_vec())
			.collect();
		assert_eq!(size.len(), 36);
		assert_eq!(size[1..3], [1, 2], "Track range.");

		// Every block 0 pack type should be counted.
		let block0: Vec<&[u8; PACK_SIZE]> = packs.iter().filter(|p| p[3] >> 4 & 7 == 0).collect();
		let counted: usize = size[4..20].iter().map(|v| usize::from(*v)).sum();
		assert_eq!(counted, block0.len());
		assert_eq!(usize::from(size[20]), block0.len() - 1, "Last sequence for block 0.");
		assert_eq!(size[28..30], [LANGUAGE_ENGLISH, 0x08]);
	}

	#[test]
	fn t_char_pos() {
		let mut text = CdText::default();
		let block = text.add_block(LANGUAGE_ENGLISH).expect("Block failed.");
		block.set(CdTextKind::Title, 0, "ABCDEFGHIJKLMNOPQRSTUVWXYZ").expect("Set failed.");
		block.set(CdTextKind::Title, 1, "x").expect("Set failed.");
		let packs = text.encode(1, 1).expect("Encode failed.");

		// 27 + 2 bytes: three packs.
		assert_eq!(packs[0][1..4], [0, 0, 0]);
		assert_eq!(packs[1][1], 0);
		assert_eq!(packs[1][3], 12, "Second pack starts at char 12.");
		assert_eq!(packs[2][1], 0, "Third pack still starts in the album title.");
		assert_eq!(packs[2][3], 15, "Positions are capped.");
	}

	#[test]
	fn t_rw_symbols() {
		let packs = sample().encode(1, 2).expect("Encode failed.");
		let rw = CdText::rw_symbols(&packs, 0);
		assert!(rw.iter().all(|b| *b < 0x40), "Symbols are six bits.");

		// Reassemble the first pack.
		let mut bytes = Vec::new();
		for s in rw.chunks_exact(4) {
			bytes.push((s[0] << 2) | (s[1] >> 4));
			bytes.push((s[1] << 4) | (s[2] >> 2));
			bytes.push((s[2] << 6) | s[3]);
		}
		assert_eq!(bytes[..18], packs[0]);
		assert_eq!(bytes[54..72], packs[3]);

		// It loops.
		let n = packs.len();
		let rw = CdText::rw_symbols(&packs, n);
		assert_eq!(rw, CdText::rw_symbols(&packs, 0), "Every n blocks should repeat.");
	}

	#[test]
	fn t_limits() {
		let mut text = CdText::default();
		for _ in 0..8 { assert!(text.add_block(LANGUAGE_ENGLISH).is_ok()); }
		assert!(text.add_block(LANGUAGE_ENGLISH).is_err(), "Nine blocks is too many.");

		let block = &mut text.blocks[0];
		assert!(block.set(CdTextKind::Title, 0, "日本").is_err(), "Not Latin-1.");
		assert!(block.set(CdTextKind::TocInfo, 0, "x").is_err(), "Binary.");
	}
}
