/*!
# Burnbox
*/

#![forbid(unsafe_code)]

#![deny(
	clippy::allow_attributes_without_reason,
	clippy::correctness,
	unreachable_pub,
)]

#![warn(
	clippy::complexity,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::style,

	clippy::allow_attributes,
	clippy::clone_on_ref_ptr,
	clippy::create_dir,
	clippy::filetype_is_file,
	clippy::format_push_string,
	clippy::get_unwrap,
	clippy::impl_trait_in_params,
	clippy::lossy_float_literal,
	clippy::missing_assert_message,
	clippy::missing_docs_in_private_items,
	clippy::needless_raw_strings,
	clippy::panic_in_result_fn,
	clippy::pub_without_shorthand,
	clippy::rest_pat_in_fully_bound_structs,
	clippy::semicolon_inside_block,
	clippy::str_to_string,
	clippy::string_to_string,
	clippy::todo,
	clippy::undocumented_unsafe_blocks,
	clippy::unneeded_field_pattern,
	clippy::unseparated_literal_suffix,
	clippy::unwrap_in_result,

	macro_use_extern_crate,
	missing_copy_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

#![expect(clippy::redundant_pub_crate, reason = "Unresolvable.")]



mod cli;

use burnbox_core::{
	BurnError,
	CdioDevice,
	CdrDriver,
	DriverKind,
	KillSwitch,
	Msf,
	RemoteReporter,
	Reporter,
	Toc,
	VerifyExtractor,
	WriteOptions,
};
use cli::{
	Action,
	Settings,
};
use dactyl::NiceU32;
use fyi_msg::{
	fyi_ansi::{
		ansi,
		dim,
	},
	Msg,
	Progless,
};
use oxford_join::JoinFmt;
use std::process::ExitCode;
use utc2k::FmtUtc2k;



/// # A Divider Line.
///
/// This is sliced to fit the drive vendor/model during summary.
const DIVIDER: &str = "----------------------------------------";

/// # Remote Progress File Descriptor.
const REMOTE_FD: u16 = 3;



/// # Main.
///
/// This lets us bubble up startup errors so they can be pretty-printed.
fn main() -> ExitCode {
	match main__() {
		Ok(()) => ExitCode::SUCCESS,
		Err(e @ (BurnError::PrintHelp | BurnError::PrintVersion)) => {
			println!("{e}");
			ExitCode::SUCCESS
		},
		Err(e) => {
			let code = e.exit_code();
			Msg::from(e).eprint();
			ExitCode::from(code)
		},
	}
}

#[inline]
/// # Actual Main.
fn main__() -> Result<(), BurnError> {
	let settings = cli::parse()?;

	let dev = CdioDevice::new(settings.dev.as_ref())?;
	let mut drv = CdrDriver::detect(dev);
	if settings.raw { drv = drv.with_kind(DriverKind::MmcRaw); }
	drive_header(&drv);

	// CTRL+C stops things between chunks rather than mid-command.
	let killed = KillSwitch::default();
	let k2 = killed.clone();
	ctrlc::set_handler(move || { k2.kill(); })
		.map_err(|_| BurnError::Bug("unable to intercept CTRL+C"))?;

	match &settings.action {
		Action::Write(_) => write(&mut drv, &settings, &killed)?,
		Action::Blank(mode) => {
			let reporter = reporter(settings.remote)?;
			drv.blank(*mode, settings.write.simulate(), &*reporter, &killed)?;
			Msg::success("The disc has been blanked.").eprint();
		},
		Action::DiskInfo => { println!("{}", drv.disk_info()?); },
		Action::DriveInfo => drive_info(&mut drv),
		Action::ReadToc => {
			let reporter = reporter(settings.remote)?;
			let toc = drv.read_disk_toc(&settings.output, &settings.read, &*reporter)?;
			print_toc(&toc);
		},
		Action::ReadCd => {
			let reporter = reporter(settings.remote)?;
			let mut extractor = VerifyExtractor::new(settings.read.sync());
			let toc = drv.read_disk(
				&settings.output,
				&settings.read,
				&mut extractor,
				&*reporter,
				&killed,
			)?;
			print_toc(&toc);
			Msg::success(format!("Saved to {}.", settings.output.display())).eprint();
		},
	}

	if killed.killed() { Err(BurnError::Killed) }
	else { Ok(()) }
}

/// # Write (or Simulate).
fn write(drv: &mut CdrDriver<CdioDevice>, settings: &Settings, killed: &KillSwitch)
-> Result<(), BurnError> {
	let toc = settings.write_toc()?;
	let opts = settings.write;
	write_summary(drv, &toc, &opts);

	// One last chance to bail!
	if
		! settings.remote &&
		! Msg::custom("Burnbox", 199, "Ready?").eprompt_with_default(true)
	{
		return Err(BurnError::Killed);
	}

	if opts.verbose() { log_header(drv, &opts); }

	let reporter = reporter(settings.remote)?;
	burnbox_core::write_disk(drv, &toc, &opts, &*reporter, killed)?;

	Msg::success(
		if opts.simulate() { "The simulation completed successfully." }
		else { "The disc has been written." }
	).eprint();
	Ok(())
}

/// # Reporter.
///
/// A progress bar, plus the remote listener if requested.
fn reporter(remote: bool) -> Result<Box<dyn Reporter>, BurnError> {
	let progress = Progless::default();
	if remote {
		let remote = RemoteReporter::from_fd(REMOTE_FD)?;
		Ok(Box::new((progress, remote)))
	}
	else { Ok(Box::new(progress)) }
}



/// # Drive Header.
fn drive_header(drv: &CdrDriver<CdioDevice>) {
	let Some(hw) = drv.hw_info() else { return; };
	let hw = hw.to_string();
	let line = &DIVIDER[..hw.len().min(DIVIDER.len())];
	eprintln!(
		concat!(
			ansi!((dim, cyan) "{line}\n"),
			ansi!((bold, cyan) "{hw}\n"),
			ansi!((dim, cyan) "{line}\n"),
		),
		line=line,
		hw=hw,
	);
}

/// # Drive Info.
fn drive_info(drv: &mut CdrDriver<CdioDevice>) {
	let names = drv.options().names();
	println!("Driver:        {}", drv.kind().as_str());
	if ! names.is_empty() {
		println!("Options:       {}", JoinFmt::new(names.iter(), ", "));
	}

	if let Ok(profile) = drv.current_profile() {
		println!("Profile:       {profile:#06x}");
	}

	match drv.capabilities() {
		Ok(caps) => {
			let yn = |b: bool| if b { "yes" } else { "no" };
			println!("Writes CD-R:   {}", yn(caps.write_cdr));
			println!("Writes CD-RW:  {}", yn(caps.write_cdrw));
			println!("Test Writes:   {}", yn(caps.test_write));
			println!("BURN-Proof:    {}", yn(caps.burnproof));
			println!("C2 Pointers:   {}", yn(caps.c2));
			println!("R-W Reads:     {}", yn(caps.rw_read));
			println!("Max Read:      {}x", caps.max_read_speed);
			println!("Max Write:     {}x", caps.max_write_speed);
			println!("Buffer:        {} KiB", caps.buffer_kb);
		},
		Err(e) => { Msg::warning(e.to_string()).eprint(); },
	}
}

/// # Write Summary.
fn write_summary(drv: &CdrDriver<CdioDevice>, toc: &Toc, opts: &WriteOptions) {
	let total = toc.blocks();
	eprintln!(
		"{} {} track(s), {} blocks ({}), {} driver{}.",
		if opts.simulate() { "Simulating" } else { "Writing" },
		toc.len(),
		NiceU32::from(total),
		Msf::from_frames(total),
		drv.kind().as_str(),
		if opts.multi_session() { ", multi-session" } else { "" },
	);
	for (t, num) in toc.tracks().iter().zip(1_u8..) {
		eprintln!(
			concat!("  {num:02}  {len}", dim!("  (pre-gap {pregap})")),
			num=num,
			len=Msf::from_frames(t.length()),
			pregap=Msf::from_frames(t.pregap()),
		);
	}
	eprintln!();
}

/// # Print TOC.
fn print_toc(toc: &Toc) {
	println!("Type:     {}", toc.kind());
	if let Some(c) = toc.catalog() { println!("Catalog:  {c}"); }
	for (t, num) in toc.tracks().iter().zip(1_u8..) {
		let start = toc.track_start(num).unwrap_or_default();
		print!(
			"Track {num:02}  {:<12} {:>8}  {}",
			t.mode().as_str(),
			start,
			Msf::from_frames(t.length()),
		);
		if 0 != t.pregap() { print!("  pre-gap {}", Msf::from_frames(t.pregap())); }
		if ! t.indices().is_empty() {
			print!("  indices {}", JoinFmt::new(t.indices().iter(), ","));
		}
		if let Some(isrc) = t.isrc() { print!("  {isrc}"); }
		println!();
	}
	println!("Lead-out: {}", toc.leadout());

	// The identifiers only make sense for audio-first layouts.
	if let Ok(ids) = toc.cdtoc() {
		println!("CDDB:     {}", ids.cddb_id());
		println!("AR:       {}", ids.accuraterip_id());
		println!("MB:       {}", ids.musicbrainz_id());
	}
}

/// # Log Header.
///
/// Print a few basic setup details ahead of the session log.
fn log_header(drv: &CdrDriver<CdioDevice>, opts: &WriteOptions) {
	use std::io::Write;

	let writer = std::io::stdout();
	let mut handle = writer.lock();
	let _res = writeln!(
		&mut handle,
		concat!("#####
## Burnbox v", env!("CARGO_PKG_VERSION"), "
## Drive:  {drive}
## Driver: {kind}
## Speed:  {speed}
## Date:   {date}
##
## Tracks are listed as number, blocks, and elapsed time. Events (errors,
## retries, low buffer readings) follow as time, block address, and
## description.
#####"),
		drive=drv.hw_info().map_or_else(String::new, ToString::to_string),
		kind=drv.kind().as_str(),
		speed=if opts.speed() == 0 { "max".to_owned() } else { format!("{}x", opts.speed()) },
		date=FmtUtc2k::now(),
	);
	let _res = handle.flush();
}
