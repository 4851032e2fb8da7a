//! The request handler: drives one client transaction end-to-end.
//!
//! A transaction is single-shot — read a selector, sanitize it, resolve it
//! against the document root, dispatch to the response builder, and close.
//! No errors propagate past the end of `handle`; failures are logged and
//! the connection is simply closed.

use std::{
	path::{Path, PathBuf},
	time::Duration,
};

use async_std::{io::WriteExt, net::TcpStream};
use futures::AsyncReadExt;
use log::{debug, warn};

use crate::{
	item::NULL_PORT,
	path,
	response::{self, ResponseContext, GOPHERMAP_NAME},
	utils::{FmtAsciiIsh, FmtMaybeAddr},
};

/// A request line longer than this many bytes is rejected with
/// `SelectorTooLong`.
pub const MAX_SELECTOR_LEN: usize = 255;

/// Receive timeout applied to every accepted connection.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(3);

/// Resolve `selector` against `docroot`: join, canonicalize, and verify the
/// result is still a descendant of the (canonicalized) document root. The
/// prefix-truncation `sanitize` already rejects most traversal attempts;
/// this closes the remaining gap against symlinks and platform quirks.
fn resolve(docroot: &Path, selector: &str) -> Option<PathBuf> {
	let target = if selector.is_empty() {
		docroot.to_path_buf()
	} else {
		PathBuf::from(path::join(&[&docroot.to_string_lossy(), selector]))
	};

	let canonical_docroot = docroot.canonicalize().ok()?;
	let canonical_target = target.canonicalize().ok()?;

	canonical_target
		.starts_with(&canonical_docroot)
		.then_some(canonical_target)
}

/// Read up to [`MAX_SELECTOR_LEN`] bytes within [`RECV_TIMEOUT`]. A timeout,
/// read error, or zero-length read is a fatal transaction error (no reply).
async fn read_selector(stream: &mut TcpStream) -> Result<Vec<u8>, ()> {
	let mut buf = vec![0u8; MAX_SELECTOR_LEN];

	match async_std::future::timeout(RECV_TIMEOUT, stream.read(&mut buf)).await {
		Ok(Ok(0)) => {
			warn!("connection closed before sending a selector");
			Err(())
		}
		Ok(Ok(n)) => {
			buf.truncate(n);
			Ok(buf)
		}
		Ok(Err(e)) => {
			warn!("error reading selector: {e}");
			Err(())
		}
		Err(_) => {
			warn!("timed out waiting for a selector");
			Err(())
		}
	}
}

/// Drive one client transaction to completion.
pub async fn handle(mut stream: TcpStream, docroot: &Path, default_host: &str, default_port: u16) {
	let peer = stream.peer_addr();

	let Ok(raw) = read_selector(&mut stream).await else {
		return;
	};

	if raw.len() >= MAX_SELECTOR_LEN {
		let ctx = ResponseContext {
			client_selector: "",
			default_host,
			default_port: NULL_PORT,
		};
		if let Err(e) = response::send_error(
			&mut stream,
			&ctx,
			"Selector string longer than 255 characters",
		)
		.await
		{
			warn!("error replying to oversized selector: {e}");
		}
		let _ = stream.write_all(b".").await;
		return;
	}

	let cut = raw
		.iter()
		.position(|&b| matches!(b, b'\t' | b'\r' | b'\n'))
		.unwrap_or(raw.len());
	let selector_bytes = &raw[..cut];
	let selector_raw = String::from_utf8_lossy(selector_bytes);

	let sanitized = path::sanitize(&selector_raw);
	debug!(
		"selector from {}: {} (raw: {})",
		FmtMaybeAddr(&peer),
		sanitized.selector,
		FmtAsciiIsh(selector_bytes)
	);

	let selector = sanitized.selector;
	let ctx = ResponseContext {
		client_selector: &selector,
		default_host,
		default_port,
	};

	match resolve(docroot, &selector) {
		Some(target) if target.is_dir() => {
			let gophermap = target.join(GOPHERMAP_NAME);
			let result = if gophermap.is_file() {
				response::send_gophermap(&mut stream, &ctx, &gophermap).await
			} else {
				response::send_directory_listing(&mut stream, &ctx, &target, true).await
			};
			if let Err(e) = result {
				warn!("error sending directory response: {e}");
			}
			let _ = stream.write_all(b".").await;
		}
		Some(target) if target.is_file() => {
			if let Err(e) = response::send_file(&mut stream, &target).await {
				warn!("error sending file: {e}");
			}
		}
		_ => {
			if let Err(e) = response::send_error(&mut stream, &ctx, "Selector not found.").await {
				warn!("error replying not-found: {e}");
			}
			let _ = stream.write_all(b".").await;
		}
	}

	debug!("connection with {} closing", FmtMaybeAddr(&peer));
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resolve_rejects_traversal_outside_docroot() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::create_dir(dir.path().join("sub")).unwrap();

		// A selector that already got truncated by `path::sanitize` can
		// never contain "..", but `resolve` is defense in depth: even a
		// path that slips past sanitize (e.g. via a symlink) must not
		// resolve outside the document root.
		assert!(resolve(dir.path(), "sub").is_some());
		assert!(resolve(dir.path(), "missing").is_none());
	}

	#[test]
	fn resolve_of_empty_selector_is_docroot() {
		let dir = tempfile::tempdir().unwrap();
		let resolved = resolve(dir.path(), "").unwrap();
		assert_eq!(resolved, dir.path().canonicalize().unwrap());
	}
}
