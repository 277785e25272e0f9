/*!
# Burnbox: Sector Encoding

Raw writing means sending complete 2352-byte sectors: sync pattern, header,
user data, and, for the data modes that require it, EDC and Reed-Solomon
P/Q parity.

The XA forms are a little special in that everything but the header can be
worked out without knowing the address (the header is zeroed for the ECC
calculation). The DAO reader uses that to turn Form 1 and Form 2 payloads
into 2336-byte "formless" blocks once, up front.
*/

use crate::{
	CD_FORM2_SIZE,
	CD_FRAME_SIZE,
	CD_MODE1_SIZE,
	CD_MODE2_SIZE,
	Msf,
	TrackMode,
};
use crc::{
	Crc,
	CRC_32_CD_ROM_EDC,
};



/// # EDC.
const EDC: Crc<u32> = Crc::<u32>::new(&CRC_32_CD_ROM_EDC);

/// # Sync Pattern.
const SYNC: [u8; 12] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

/// # Form 1 Sub-Header (Data).
const SUBHEADER_FORM1: [u8; 8] = [0, 0, 0x08, 0, 0, 0, 0x08, 0];

/// # Form 2 Sub-Header.
const SUBHEADER_FORM2: [u8; 8] = [0, 0, 0x20, 0, 0, 0, 0x20, 0];

#[allow(clippy::cast_possible_truncation)]
/// # GF(2^8) Forward Table.
///
/// Multiplication by alpha, modulo `x^8 + x^4 + x^3 + x^2 + 1`.
const ECC_F: [u8; 256] = {
	let mut out = [0_u8; 256];
	let mut i = 0;
	while i < 256 {
		let j = (i << 1) ^ (if 0 != i & 0x80 { 0x11D } else { 0 });
		out[i] = j as u8;
		i += 1;
	}
	out
};

#[allow(clippy::cast_possible_truncation)]
/// # GF(2^8) Backward Table.
const ECC_B: [u8; 256] = {
	let mut out = [0_u8; 256];
	let mut i = 0;
	while i < 256 {
		out[i ^ ECC_F[i] as usize] = i as u8;
		i += 1;
	}
	out
};



/// # Encode a Raw Sector.
///
/// Expand one write-format block (see [`TrackMode::write_block_size`]) into a
/// full 2352-byte sector for the given address.
///
/// Audio and the raw modes are copied through untouched.
pub(crate) fn encode_sector(mode: TrackMode, lba: i32, data: &[u8], out: &mut [u8]) {
	let out = &mut out[..usize::from(CD_FRAME_SIZE)];
	match mode {
		TrackMode::Audio | TrackMode::Mode1Raw | TrackMode::Mode2Raw => {
			let len = data.len().min(out.len());
			out[..len].copy_from_slice(&data[..len]);
			out[len..].fill(0);
		},
		TrackMode::Mode1 => {
			write_header(out, lba, 1);
			copy_padded(&mut out[16..2064], data);
			let edc = EDC.checksum(&out[..2064]);
			out[2064..2068].copy_from_slice(&edc.to_le_bytes());
			out[2068..2076].fill(0);
			ecc(out);
		},
		TrackMode::Mode2 |
		TrackMode::Mode2Form1 |
		TrackMode::Mode2Form2 |
		TrackMode::Mode2FormMix => {
			write_header(out, lba, 2);
			copy_padded(&mut out[16..], data);
		},
	}
}

/// # Form 1 Block.
///
/// Wrap 2048 bytes of user data in an XA sub-header, EDC and ECC, producing
/// a 2336-byte formless block.
pub(crate) fn form1_block(data: &[u8], out: &mut [u8]) {
	let mut sector = [0_u8; CD_FRAME_SIZE as usize];
	sector[16..24].copy_from_slice(&SUBHEADER_FORM1);
	copy_padded(&mut sector[24..24 + usize::from(CD_MODE1_SIZE)], data);
	let edc = EDC.checksum(&sector[16..2072]);
	sector[2072..2076].copy_from_slice(&edc.to_le_bytes());

	// The header is zero for the purposes of ECC.
	ecc(&mut sector);
	out[..usize::from(CD_MODE2_SIZE)].copy_from_slice(&sector[16..]);
}

/// # Form 2 Block.
///
/// Wrap 2324 bytes of user data in an XA sub-header and EDC, producing a
/// 2336-byte formless block.
pub(crate) fn form2_block(data: &[u8], out: &mut [u8]) {
	let out = &mut out[..usize::from(CD_MODE2_SIZE)];
	out[..8].copy_from_slice(&SUBHEADER_FORM2);
	copy_padded(&mut out[8..8 + usize::from(CD_FORM2_SIZE)], data);
	let edc = EDC.checksum(&out[..2332]);
	out[2332..].copy_from_slice(&edc.to_le_bytes());
}

/// # Convert Source Block to Write Block.
///
/// Most modes are written as-is; the XA forms are wrapped. `out` must be at
/// least [`TrackMode::write_block_size`] bytes.
pub(crate) fn to_write_block(mode: TrackMode, data: &[u8], out: &mut [u8]) {
	match mode {
		TrackMode::Mode2Form1 => form1_block(data, out),
		TrackMode::Mode2Form2 => form2_block(data, out),
		_ => copy_padded(&mut out[..usize::from(mode.write_block_size())], data),
	}
}

/// # Zero Block.
///
/// Fill `out` with an "empty" write block for the mode. For the XA modes
/// that means a properly wrapped Form 2 (or Form 1) block full of zeroes,
/// for the raw modes a complete sector at `lba`.
pub(crate) fn zero_block(mode: TrackMode, lba: i32, out: &mut [u8]) {
	match mode {
		TrackMode::Audio | TrackMode::Mode1 | TrackMode::Mode2 =>
			out[..usize::from(mode.write_block_size())].fill(0),
		TrackMode::Mode1Raw => encode_sector(TrackMode::Mode1, lba, &[], out),
		TrackMode::Mode2Raw => encode_sector(TrackMode::Mode2, lba, &[], out),
		TrackMode::Mode2Form1 => form1_block(&[], out),
		TrackMode::Mode2Form2 | TrackMode::Mode2FormMix => form2_block(&[], out),
	}
}

/// # User Data.
///
/// Return the part of a raw 2352-byte sector a sub-track of the given mode
/// would supply (see [`TrackMode::source_block_size`]).
pub(crate) fn user_data(mode: TrackMode, sector: &[u8]) -> &[u8] {
	let range = match mode {
		TrackMode::Audio | TrackMode::Mode1Raw | TrackMode::Mode2Raw => 0..2352,
		TrackMode::Mode1 => 16..2064,
		TrackMode::Mode2 | TrackMode::Mode2FormMix => 16..2352,
		TrackMode::Mode2Form1 => 24..2072,
		TrackMode::Mode2Form2 => 24..2348,
	};
	sector.get(range).unwrap_or_default()
}

/// # Sector Header Mode.
///
/// Return the mode byte of a raw data sector, if it has a valid sync
/// pattern.
pub(crate) fn sector_mode(raw: &[u8]) -> Option<u8> {
	if raw.len() < 16 || raw[..12] != SYNC { None }
	else { Some(raw[15]) }
}



/// # Copy Padded.
///
/// Copy as much of `src` as fits, zero-filling the rest.
fn copy_padded(dst: &mut [u8], src: &[u8]) {
	let len = src.len().min(dst.len());
	dst[..len].copy_from_slice(&src[..len]);
	dst[len..].fill(0);
}

/// # Write Sync and Header.
fn write_header(out: &mut [u8], lba: i32, mode: u8) {
	out[..12].copy_from_slice(&SYNC);
	out[12..15].copy_from_slice(&Msf::from_lba(lba).to_bcd());
	out[15] = mode;
}

/// # Compute P and Q Parity.
///
/// The sector must already contain everything from byte 12 through 2075.
fn ecc(sector: &mut [u8]) {
	{
		let (head, tail) = sector.split_at_mut(2076);
		ecc_pass(&head[12..], 86, 24, 2, 86, &mut tail[..172]);
	}
	let (head, tail) = sector.split_at_mut(2248);
	ecc_pass(&head[12..], 52, 43, 86, 88, &mut tail[..104]);
}

/// # ECC Pass.
///
/// Compute one set of RSPC parity (P or Q), treating `src` as a matrix of
/// `major_count × minor_count` symbols.
fn ecc_pass(
	src: &[u8],
	major_count: usize,
	minor_count: usize,
	major_mult: usize,
	minor_inc: usize,
	dst: &mut [u8],
) {
	let size = major_count * minor_count;
	for major in 0..major_count {
		let mut idx = (major >> 1) * major_mult + (major & 1);
		let mut a = 0_u8;
		let mut b = 0_u8;
		for _ in 0..minor_count {
			let t = src[idx];
			idx += minor_inc;
			if idx >= size { idx -= size; }
			a ^= t;
			b ^= t;
			a = ECC_F[usize::from(a)];
		}
		a = ECC_B[usize::from(ECC_F[usize::from(a)] ^ b)];
		dst[major] = a;
		dst[major + major_count] = a ^ b;
	}
}



#[cfg(test)]
mod test {
	use super::*;

	/// # Column XOR.
	///
	/// Every P and Q codeword (data plus both parity bytes) should XOR to
	/// zero.
	fn check_syndrome0(sector: &[u8]) {
		let body = &sector[12..];
		for major in 0..86 {
			let mut x = 0_u8;
			let mut idx = (major >> 1) * 2 + (major & 1);
			for _ in 0..24 {
				x ^= body[idx];
				idx += 86;
				if idx >= 2064 { idx -= 2064; }
			}
			x ^= sector[2076 + major] ^ sector[2076 + major + 86];
			assert_eq!(x, 0, "P column {major} is broken.");
		}
		for major in 0..52 {
			let mut x = 0_u8;
			let mut idx = (major >> 1) * 86 + (major & 1);
			for _ in 0..43 {
				x ^= body[idx];
				idx += 88;
				if idx >= 2236 { idx -= 2236; }
			}
			x ^= sector[2248 + major] ^ sector[2248 + major + 52];
			assert_eq!(x, 0, "Q row {major} is broken.");
		}
	}

	#[test]
	fn t_tables() {
		// Alpha^8 wraps around the primitive polynomial.
		assert_eq!(ECC_F[0x80], 0x1D);
		assert_eq!(ECC_F[0x01], 0x02);
		for i in 0..256 {
			assert_eq!(usize::from(ECC_B[i ^ usize::from(ECC_F[i])]), i, "Backward table mismatch.");
		}
	}

	#[test]
	fn t_mode1() {
		let data: Vec<u8> = (0..2048_u32).map(|v| (v * 7 % 251) as u8).collect();
		let mut out = [0_u8; 2352];
		encode_sector(TrackMode::Mode1, 0, &data, &mut out);

		assert_eq!(out[..12], SYNC);
		assert_eq!(out[12..16], [0x00, 0x02, 0x00, 0x01], "Header should be 00:02:00 mode 1.");
		assert_eq!(out[16..2064], data[..]);
		assert_eq!(
			u32::from_le_bytes([out[2064], out[2065], out[2066], out[2067]]),
			EDC.checksum(&out[..2064]),
		);
		assert!(out[2068..2076].iter().all(|b| *b == 0), "Reserved bytes should be zero.");
		check_syndrome0(&out);

		assert_eq!(sector_mode(&out), Some(1));
		assert_eq!(sector_mode(&[0_u8; 2352]), None);
	}

	#[test]
	fn t_zero_parity() {
		// The code is linear: nothing in, nothing out.
		let mut sector = [0_u8; 2352];
		ecc(&mut sector);
		assert!(sector.iter().all(|b| *b == 0), "Zero data should have zero parity.");
	}

	#[test]
	fn t_form1() {
		let data = [0x5A_u8; 2048];
		let mut block = [0_u8; 2336];
		form1_block(&data, &mut block);
		assert_eq!(block[..8], SUBHEADER_FORM1);
		assert_eq!(block[8..2056], data[..]);

		// Rebuild the sector with a zero header and check the parity.
		let mut sector = [0_u8; 2352];
		sector[16..].copy_from_slice(&block);
		check_syndrome0(&sector);

		// And with a real header for writing.
		let mut raw = [0_u8; 2352];
		encode_sector(TrackMode::Mode2Form1, 1000, &block, &mut raw);
		assert_eq!(sector_mode(&raw), Some(2));
		assert_eq!(raw[16..], block[..]);
	}

	#[test]
	fn t_form2() {
		let mut block = [0xFF_u8; 2336];
		form2_block(&[1, 2, 3], &mut block);
		assert_eq!(block[..8], SUBHEADER_FORM2);
		assert_eq!(block[8..11], [1, 2, 3]);
		assert!(block[11..2332].iter().all(|b| *b == 0), "Data should be zero-padded.");
		assert_eq!(
			u32::from_le_bytes([block[2332], block[2333], block[2334], block[2335]]),
			EDC.checksum(&block[..2332]),
		);
	}

	#[test]
	fn t_zero_block() {
		let mut out = [0xFF_u8; 2352];
		zero_block(TrackMode::Audio, 0, &mut out);
		assert!(out.iter().all(|b| *b == 0));

		zero_block(TrackMode::Mode1Raw, 16, &mut out);
		assert_eq!(out[12..16], [0x00, 0x02, 0x16, 0x01], "Raw zero blocks need headers.");
		check_syndrome0(&out);
	}

	#[test]
	fn t_user_data() {
		let data = [0x33_u8; 2048];
		let mut raw = [0_u8; 2352];
		encode_sector(TrackMode::Mode1, 200, &data, &mut raw);
		assert_eq!(user_data(TrackMode::Mode1, &raw), &data[..]);

		let mut block = [0_u8; 2336];
		form1_block(&data, &mut block);
		encode_sector(TrackMode::Mode2Form1, 200, &block, &mut raw);
		assert_eq!(user_data(TrackMode::Mode2Form1, &raw), &data[..]);
		assert_eq!(user_data(TrackMode::Mode2FormMix, &raw), &block[..]);
		assert_eq!(user_data(TrackMode::Audio, &raw).len(), 2352);
		assert!(user_data(TrackMode::Mode1, &raw[..100]).is_empty(), "Short sectors have nothing.");
	}
}
