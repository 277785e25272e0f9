/*!
# Burnbox: Kill Switch
*/

use crossbeam_channel::{
	Receiver,
	Sender,
};
use std::sync::{
	Arc,
	Mutex,
	atomic::{
		AtomicBool,
		Ordering::{
			Acquire,
			Release,
		},
	},
};



#[derive(Debug, Clone)]
/// # Kill Switch.
///
/// This is a short-circuit for long-running operations across multiple
/// threads. The DAO writer checks it between chunks, the reader thread before
/// each read.
///
/// The main program's CTRL-C intercept flips it, allowing any in-flight
/// WRITE to finish before the session is aborted.
pub struct KillSwitch(Arc<KillInner>);

#[derive(Debug)]
/// # Shared State.
struct KillInner {
	/// # Dead?
	flag: AtomicBool,

	/// # Signal Sender.
	///
	/// This is dropped on kill, disconnecting every receiver at once.
	tx: Mutex<Option<Sender<()>>>,

	/// # Signal Receiver.
	rx: Receiver<()>,
}

impl Default for KillSwitch {
	fn default() -> Self {
		let (tx, rx) = crossbeam_channel::bounded(0);
		Self(Arc::new(KillInner {
			flag: AtomicBool::new(false),
			tx: Mutex::new(Some(tx)),
			rx,
		}))
	}
}

impl KillSwitch {
	#[inline]
	/// # Kill!
	pub fn kill(&self) {
		self.0.flag.store(true, Release);
		if let Ok(mut tx) = self.0.tx.lock() { drop(tx.take()); }
	}

	#[must_use]
	/// # Dead?
	pub fn killed(&self) -> bool { self.0.flag.load(Acquire) }

	#[must_use]
	/// # Signal.
	///
	/// Nothing is ever sent on this channel; it disconnects when the switch
	/// is flipped, so it can sit in a `select!` alongside real work.
	pub(crate) fn signal(&self) -> &Receiver<()> { &self.0.rx }
}



#[cfg(test)]
mod test {
	use super::*;
	use crossbeam_channel::TryRecvError;

	#[test]
	fn t_killswitch() {
		let killed = KillSwitch::default();
		let other = killed.clone();
		assert!(! killed.killed(), "Should be alive.");
		assert_eq!(killed.signal().try_recv(), Err(TryRecvError::Empty));

		other.kill();
		assert!(killed.killed(), "Clones share state.");
		assert_eq!(
			killed.signal().try_recv(),
			Err(TryRecvError::Disconnected),
			"The signal should fire for every clone.",
		);

		// Killing twice is fine.
		other.kill();
		assert!(killed.signal().recv().is_err());
	}
}
