/*!
# Burnbox: Ring Buffer

A fixed pool of chunk buffers circulates between the reader thread and the
writer: the reader takes empty buffers from the free queue and returns them
full; the writer does the opposite. Neither side allocates once things are
moving, and each blocks only when the other falls behind.
*/

use crate::{
	BurnError,
	CD_FRAME_SIZE,
	KillSwitch,
};
use crossbeam_channel::{
	Receiver,
	select,
	Sender,
};
use std::sync::{
	Mutex,
	atomic::{
		AtomicBool,
		Ordering::{
			Acquire,
			Release,
		},
	},
};



/// # Blocks Per Chunk.
///
/// One second of audio.
pub(super) const CHUNK_BLOCKS: u32 = 75;



#[derive(Debug)]
/// # Filled Chunk.
///
/// Write blocks for a single track; chunks never straddle two.
pub(super) struct Chunk {
	/// # Track Index.
	pub(super) track: usize,

	/// # Block Count.
	pub(super) blocks: u32,

	/// # Write Blocks.
	pub(super) data: Vec<u8>,
}



#[derive(Debug)]
/// # Queue Entry.
enum Slot {
	/// # Data.
	Chunk(Chunk),

	/// # Reader Error.
	Failed(BurnError),

	/// # End of Data.
	Done,
}



#[derive(Debug)]
/// # Ring.
pub(super) struct Ring {
	free_tx: Sender<Vec<u8>>,
	free_rx: Receiver<Vec<u8>>,
	full_tx: Sender<Slot>,
	full_rx: Receiver<Slot>,

	/// # Reader Activity.
	///
	/// The reader drops a token here after every push so a prefilling
	/// writer can recheck the queue.
	ready_tx: Sender<()>,
	ready_rx: Receiver<()>,

	/// # Stop Signal.
	///
	/// Dropped by the writer to release a waiting reader.
	stop_tx: Mutex<Option<Sender<()>>>,
	stop_rx: Receiver<()>,

	/// # First Reader Error.
	error: Mutex<Option<BurnError>>,

	size: usize,

	/// # Reader Finished (Or Failed).
	finished: AtomicBool,

	/// # Writer Saw the End.
	drained: AtomicBool,
}

impl Ring {
	/// # New.
	///
	/// Allocate `size` chunk buffers.
	pub(super) fn new(size: u16) -> Self {
		let size = usize::from(size.max(1));
		let (free_tx, free_rx) = crossbeam_channel::bounded(size);
		let (full_tx, full_rx) = crossbeam_channel::unbounded();
		let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
		let (stop_tx, stop_rx) = crossbeam_channel::bounded(0);
		let bytes = CHUNK_BLOCKS as usize * usize::from(CD_FRAME_SIZE);
		for _ in 0..size {
			let _res = free_tx.send(Vec::with_capacity(bytes));
		}

		Self {
			free_tx,
			free_rx,
			full_tx,
			full_rx,
			ready_tx,
			ready_rx,
			stop_tx: Mutex::new(Some(stop_tx)),
			stop_rx,
			error: Mutex::new(None),
			size,
			finished: AtomicBool::new(false),
			drained: AtomicBool::new(false),
		}
	}

	/// # Take a Free Buffer (Reader).
	///
	/// Block until a buffer is available, or return `None` if the writer
	/// has stopped.
	pub(super) fn take_free(&self) -> Option<Vec<u8>> {
		// A stopped writer wins any tie.
		if self.stop_rx.try_recv().is_err_and(|e| e.is_disconnected()) { return None; }
		select! {
			recv(self.free_rx) -> buf => buf.ok(),
			recv(self.stop_rx) -> _ => None,
		}
	}

	/// # Push a Chunk (Reader).
	///
	/// Errors are queued in order like anything else, but are also kept
	/// aside so a prefill can see them without consuming good data.
	pub(super) fn push(&self, chunk: Result<Chunk, BurnError>) {
		match chunk {
			Ok(chunk) => { let _res = self.full_tx.send(Slot::Chunk(chunk)); },
			Err(e) => {
				if let Ok(mut slot) = self.error.lock() {
					if slot.is_none() { slot.replace(e.clone()); }
				}
				let _res = self.full_tx.send(Slot::Failed(e));
				self.finished.store(true, Release);
			},
		}
		self.wake();
	}

	/// # Reader Finished.
	pub(super) fn finish(&self) {
		let _res = self.full_tx.send(Slot::Done);
		self.finished.store(true, Release);
		self.wake();
	}

	/// # Wake the Writer.
	fn wake(&self) { let _res = self.ready_tx.try_send(()); }

	/// # Pop a Chunk (Writer).
	///
	/// Block until a chunk is available, or return `None` once the reader
	/// has finished and everything has been consumed.
	pub(super) fn pop(&self) -> Option<Result<Chunk, BurnError>> {
		if self.drained.load(Acquire) { return None; }
		match self.full_rx.recv() {
			Ok(Slot::Chunk(chunk)) => Some(Ok(chunk)),
			Ok(Slot::Failed(e)) => Some(Err(e)),
			Ok(Slot::Done) | Err(_) => {
				self.drained.store(true, Release);
				None
			},
		}
	}

	/// # Recycle a Buffer (Writer).
	pub(super) fn recycle(&self, buf: Vec<u8>) {
		let _res = self.free_tx.try_send(buf);
	}

	/// # Writer Stopped.
	///
	/// Release the reader if it's waiting on a buffer.
	pub(super) fn stop(&self) {
		if let Ok(mut tx) = self.stop_tx.lock() { drop(tx.take()); }
	}

	/// # Fill (%).
	pub(super) fn fill(&self) -> u8 {
		let full = self.full_rx.len().min(self.size);
		u8::try_from(full * 100 / self.size).unwrap_or(100)
	}

	/// # Prefill.
	///
	/// Wait for the ring to fill up (or the reader to run out of data)
	/// before any writing begins. Nothing is consumed.
	///
	/// ## Errors
	///
	/// Returns an error if the operation is aborted or the reader has
	/// already failed.
	pub(super) fn prefill(&self, killed: &KillSwitch) -> Result<(), BurnError> {
		loop {
			if killed.killed() { return Err(BurnError::Killed); }
			if self.size <= self.full_rx.len() || self.finished.load(Acquire) { break; }
			select! {
				recv(self.ready_rx) -> _ => {},
				recv(killed.signal()) -> _ => {},
			}
		}

		// Surface reader errors before the laser comes on.
		match self.error.lock().ok().and_then(|e| e.clone()) {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}
}
