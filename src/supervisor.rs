//! The connection supervisor
//!
//! Owns the listening socket and a fixed table of in-flight handler tasks.
//! Slots are reaped through a channel rather than shared atomics: a handler
//! announces its own slot index on completion, and the accept loop drains
//! that channel (non-blockingly) each iteration before looking for a free
//! slot. The lone piece of state actually shared across tasks is the
//! `running` flag, which does need explicit acquire/release ordering.

use std::{
	path::PathBuf,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::Duration,
};

use async_std::{
	channel::{self, Receiver, Sender},
	task::JoinHandle,
};
use log::{info, warn};

use crate::{handler, tcp};

/// Maximum number of simultaneous connections. The 11th concurrent client
/// waits in the OS accept backlog until a slot frees up.
pub const MAX_CONNECTIONS: usize = 10;

/// How long `accept` blocks before the loop re-checks `running`.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

struct Slot {
	handle: Option<JoinHandle<()>>,
}

pub struct Supervisor {
	listener: async_std::net::TcpListener,
	docroot: PathBuf,
	hostname: String,
	port: u16,
	running: Arc<AtomicBool>,
	slots: Vec<Slot>,
	done_tx: Sender<usize>,
	done_rx: Receiver<usize>,
}

impl Supervisor {
	/// Bind the listening socket for `port` and prepare an empty slot table.
	pub fn bind(
		docroot: PathBuf,
		hostname: String,
		port: u16,
		running: Arc<AtomicBool>,
	) -> std::io::Result<Self> {
		let listener = tcp::bind(port)?;
		let (done_tx, done_rx) = channel::unbounded();

		Ok(Self {
			listener,
			docroot,
			hostname,
			port,
			running,
			slots: (0..MAX_CONNECTIONS).map(|_| Slot { handle: None }).collect(),
			done_tx,
			done_rx,
		})
	}

	/// Drain slot-completion notifications without blocking, awaiting each
	/// finished handle so its task is fully joined before the slot reopens.
	async fn reap(&mut self) {
		while let Ok(index) = self.done_rx.try_recv() {
			if let Some(handle) = self.slots[index].handle.take() {
				handle.await;
			}
		}
	}

	fn free_slot(&self) -> Option<usize> {
		self.slots.iter().position(|slot| slot.handle.is_none())
	}

	/// Run the accept loop until `running` is cleared, then cancel every
	/// still-occupied slot and return.
	pub async fn run(mut self) {
		info!("Server running on {}:{}", self.hostname, self.port);

		while self.running.load(Ordering::Acquire) {
			self.reap().await;

			let Some(index) = self.free_slot() else {
				async_std::task::sleep(POLL_INTERVAL).await;
				continue;
			};

			let accepted =
				async_std::future::timeout(POLL_INTERVAL, self.listener.accept()).await;

			let (stream, addr) = match accepted {
				Ok(Ok(pair)) => pair,
				Ok(Err(e)) => {
					warn!("accept error: {e}");
					continue;
				}
				Err(_) => continue,
			};

			info!("accepted connection from {addr}");

			let docroot = self.docroot.clone();
			let hostname = self.hostname.clone();
			let port = self.port;
			let done_tx = self.done_tx.clone();

			let task_handle = async_std::task::spawn(async move {
				handler::handle(stream, &docroot, &hostname, port).await;
				let _ = done_tx.send(index).await;
			});

			self.slots[index].handle = Some(task_handle);
		}

		self.shutdown().await;
	}

	async fn shutdown(&mut self) {
		info!("Stopping the server...");

		for slot in &mut self.slots {
			if let Some(handle) = slot.handle.take() {
				handle.cancel().await;
			}
		}
	}
}
