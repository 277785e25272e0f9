/*!
# Burnbox: `libcdio` Transport
*/

use crate::{
	BurnError,
	DataDir,
	HwInfo,
	ScsiTransport,
	Sense,
};
use libcdio_sys::{
	cdio_hwinfo,
	driver_id_t_DRIVER_DEVICE, // The equivalent of "use whatever's best".
	driver_return_code_t_DRIVER_OP_SUCCESS,
	mmc_cdb_t,
};
use std::{
	ffi::{
		CStr,
		CString,
	},
	os::unix::ffi::OsStrExt,
	path::Path,
	sync::Once,
	time::Duration,
};



static LIBCDIO_INIT: Once = Once::new();

/// # Access Mode.
///
/// Writing requires exclusive, read-write pass-through access.
const ACCESS_MODE: &[u8] = b"MMC_RDWR_EXCL\0";

/// # Default Timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// # Maximum Transfer (Bytes).
const MAX_TRANSFER: usize = 64 * 1024;

/// # CDB Length (libcdio).
const MAX_CDB_LEN: usize = 12;

/// # Data Direction: Read.
const DIR_READ: u32 = 0;

/// # Data Direction: Write.
const DIR_WRITE: u32 = 1;

/// # Data Direction: None.
const DIR_NONE: u32 = 2;



#[derive(Debug)]
#[allow(dead_code)] // We just want to make sure dev lives as long as the ptr.
/// # CDIO Device.
///
/// This sends raw MMC commands through `libcdio`'s pass-through interface.
pub struct CdioDevice {
	dev: Option<CString>,
	ptr: *mut libcdio_sys::CdIo_t,
	timeout: Duration,
}

impl Drop for CdioDevice {
	#[allow(unsafe_code)]
	fn drop(&mut self) {
		// Release the C memory!
		if ! self.ptr.is_null() {
			unsafe { libcdio_sys::cdio_destroy(self.ptr); }
		}
	}
}

impl CdioDevice {
	#[allow(unsafe_code)]
	/// # New!
	///
	/// Open a connection with the optical drive at `dev`, or the system
	/// default if `None`.
	///
	/// ## Errors
	///
	/// This will return an error if initialization fails, or if the provided
	/// device path is obviously wrong.
	pub fn new<P>(dev: Option<P>) -> Result<Self, BurnError>
	where P: AsRef<Path> {
		// Make sure the library has been initialized.
		init();

		// Take a look at the desired device.
		let dev = {
			if let Some(dev) = dev {
				let dev = dev.as_ref();
				let original: String = dev.to_string_lossy().into_owned();
				if ! dev.exists() {
					return Err(BurnError::Device(original));
				}
				let dev = CString::new(dev.as_os_str().as_bytes())
					.map_err(|_| BurnError::Device(original))?;
				Some(dev)
			}
			else { None }
		};

		// Connect to it.
		let ptr = unsafe {
			libcdio_sys::cdio_open_am(
				dev.as_ref().map_or_else(std::ptr::null, |v| v.as_ptr()),
				driver_id_t_DRIVER_DEVICE,
				ACCESS_MODE.as_ptr().cast(),
			)
		};

		// NULL is bad.
		if ptr.is_null() {
			Err(BurnError::DeviceOpen(dev.map(|v| v.to_string_lossy().into_owned())))
		}
		else {
			Ok(Self {
				dev,
				ptr,
				timeout: DEFAULT_TIMEOUT,
			})
		}
	}

	#[allow(unsafe_code)]
	/// # Last Sense.
	///
	/// Fetch (and parse) the sense data from the most recent command, if
	/// any.
	fn last_sense(&self) -> Option<Sense> {
		let mut raw: *mut libcdio_sys::cdio_mmc_request_sense_t = std::ptr::null_mut();
		let len = unsafe {
			libcdio_sys::mmc_last_cmd_sense(self.ptr, &mut raw)
		};

		if raw.is_null() { return None; }
		let out = usize::try_from(len).ok()
			.filter(|len| 0 < *len)
			.and_then(|len| {
				let slice = unsafe { std::slice::from_raw_parts(raw.cast::<u8>(), len) };
				Sense::parse(slice)
			});
		unsafe { libcdio_sys::cdio_free(raw.cast()); }
		out
	}
}

impl ScsiTransport for CdioDevice {
	#[allow(unsafe_code)]
	fn send(&mut self, cdb: &[u8], dir: DataDir<'_>) -> Result<(), BurnError> {
		let op = cdb.first().copied().ok_or(BurnError::Bug("empty CDB"))?;
		if MAX_CDB_LEN < cdb.len() { return Err(BurnError::Bug("oversized CDB")); }

		let mut raw = mmc_cdb_t { field: [0; MAX_CDB_LEN] };
		raw.field[..cdb.len()].copy_from_slice(cdb);

		let timeout = u32::try_from(self.timeout.as_millis()).unwrap_or(u32::MAX);
		let (direction, len, buf) = match dir {
			DataDir::None => (DIR_NONE, 0, std::ptr::null_mut()),
			DataDir::In(b) => (DIR_READ, b.len(), b.as_mut_ptr()),
			// The pointer is only read from for writes.
			DataDir::Out(b) => (DIR_WRITE, b.len(), b.as_ptr().cast_mut()),
		};
		let len = u32::try_from(len).map_err(|_| BurnError::Bug("oversized transfer"))?;

		let res = unsafe {
			libcdio_sys::mmc_run_cmd(
				self.ptr,
				timeout,
				&raw,
				direction,
				len,
				buf.cast(),
			)
		};

		if res == driver_return_code_t_DRIVER_OP_SUCCESS { Ok(()) }
		else {
			Err(BurnError::Scsi { op, sense: self.last_sense() })
		}
	}

	fn max_transfer(&self) -> usize { MAX_TRANSFER }

	fn timeout(&self) -> Duration { self.timeout }

	fn set_timeout(&mut self, timeout: Duration) { self.timeout = timeout; }

	#[allow(unsafe_code, clippy::cast_sign_loss)]
	fn hw_info(&self) -> Option<HwInfo> {
		let mut raw = cdio_hwinfo {
			psz_vendor: [0; 9],
			psz_model: [0; 17],
			psz_revision: [0; 5],
		};

		// The return code is a bool, true for good, instead of the usual
		// 0 for good.
		if 1 == unsafe { libcdio_sys::cdio_get_hwinfo(self.ptr, &mut raw) } {
			let vendor = c_field(&raw.psz_vendor.map(|b| b as u8));
			let model = c_field(&raw.psz_model.map(|b| b as u8));
			let revision = c_field(&raw.psz_revision.map(|b| b as u8));

			// Model is required.
			if model.is_empty() { None }
			else { Some(HwInfo { vendor, model, revision }) }
		}
		else { None }
	}
}



#[allow(unsafe_code)]
/// # Initialize `libcdio`.
fn init() {
	LIBCDIO_INIT.call_once(|| unsafe { libcdio_sys::cdio_init(); });
}

/// # Fixed C Field to String.
fn c_field(raw: &[u8]) -> String {
	CStr::from_bytes_until_nul(raw)
		.ok()
		.and_then(|v| v.to_str().ok())
		.map(|s| s.trim().to_owned())
		.unwrap_or_default()
}
