//! The response builder: given a connection and a resolved filesystem
//! target, emits the appropriate Gopher response — file bytes, an auto
//! directory listing, or a rendered gophermap.

use std::{
	fmt::{Display, Formatter, Result as FmtResult},
	path::Path,
};

use async_std::io::WriteExt;
use log::warn;

use crate::{
	item::{GopherItem, TYPE_DIRECTORY, TYPE_FILE},
	path,
};

/// Name of the hand-authored menu file that overrides auto-listing for a
/// directory.
pub const GOPHERMAP_NAME: &str = "gophermap";

#[derive(Debug)]
pub enum ResponseError {
	Io(std::io::Error),
	/// A directory listing sent successfully but `count` entries failed to
	/// be read or sent; the listing itself is not aborted.
	PartialListing { count: usize },
}

impl Display for ResponseError {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		match self {
			Self::Io(e) => write!(f, "{e}"),
			Self::PartialListing { count } => {
				write!(f, "{count} director{} failed to send", if *count == 1 { "y entry" } else { "y entries" })
			}
		}
	}
}

impl std::error::Error for ResponseError {}

impl From<std::io::Error> for ResponseError {
	fn from(e: std::io::Error) -> Self {
		Self::Io(e)
	}
}

/// Per-transaction context needed to render entries: the client's original
/// selector (for relative-selector rewriting) and the configured defaults
/// for host/port on auto-generated entries.
pub struct ResponseContext<'a> {
	pub client_selector: &'a str,
	pub default_host: &'a str,
	pub default_port: u16,
}

/// Stream raw bytes of `path` to the client. No framing, no terminator.
pub async fn send_file<W>(writer: &mut W, path: &Path) -> Result<(), ResponseError>
where
	W: async_std::io::Write + Unpin,
{
	let mut file = async_std::fs::File::open(path).await?;
	async_std::io::copy(&mut file, writer).await?;
	Ok(())
}

/// Build the wire line for `item`, rewriting a relative selector to be
/// absolute-from-docroot (prefixed with the client's current selector), and
/// write it out.
pub async fn send_item<W>(
	writer: &mut W,
	ctx: &ResponseContext<'_>,
	mut item: GopherItem,
) -> Result<(), ResponseError>
where
	W: async_std::io::Write + Unpin,
{
	if !ctx.client_selector.is_empty() && !item.selector.is_empty() && !item.selector.starts_with('/') {
		item.selector = path::join(&[ctx.client_selector, &item.selector]);
	}

	match item.serialize() {
		Ok(line) => {
			writer.write_all(line.as_bytes()).await?;
			Ok(())
		}
		Err(e) => {
			warn!("dropping malformed gopher item: {e}");
			Ok(())
		}
	}
}

/// Convenience wrapper: emit an info entry (`'i'`).
pub async fn send_info<W>(
	writer: &mut W,
	ctx: &ResponseContext<'_>,
	message: impl Into<String>,
) -> Result<(), ResponseError>
where
	W: async_std::io::Write + Unpin,
{
	send_item(writer, ctx, GopherItem::info(message)).await
}

/// Convenience wrapper: emit an error entry (`'3'`).
pub async fn send_error<W>(
	writer: &mut W,
	ctx: &ResponseContext<'_>,
	message: impl Into<String>,
) -> Result<(), ResponseError>
where
	W: async_std::io::Write + Unpin,
{
	send_item(writer, ctx, GopherItem::error(message)).await
}

/// Emit an auto directory listing of `path`. If `emit_header`, two info
/// entries precede the listing (`"[<client_selector>]:"`, then blank).
/// Hidden entries (dotfiles, `gophermap`) are skipped. Individual entries
/// that fail to be read are logged and counted, but do not abort the
/// listing; the overall operation fails if any entry failed.
pub async fn send_directory_listing<W>(
	writer: &mut W,
	ctx: &ResponseContext<'_>,
	path: &Path,
	emit_header: bool,
) -> Result<(), ResponseError>
where
	W: async_std::io::Write + Unpin,
{
	use async_std::stream::StreamExt;

	if emit_header {
		send_info(writer, ctx, format!("[{}]:", ctx.client_selector)).await?;
		send_info(writer, ctx, "").await?;
	}

	let mut entries = async_std::fs::read_dir(path).await?;
	let mut failures = 0usize;

	while let Some(entry) = entries.next().await {
		let entry = match entry {
			Ok(entry) => entry,
			Err(e) => {
				warn!("failed to read directory entry: {e}");
				failures += 1;
				continue;
			}
		};

		let name = entry.file_name();
		let name = name.to_string_lossy();

		if name.starts_with('.') || name == GOPHERMAP_NAME {
			continue;
		}

		let metadata = match entry.metadata().await {
			Ok(metadata) => metadata,
			Err(e) => {
				warn!("failed to stat {name}: {e}");
				failures += 1;
				continue;
			}
		};

		let (kind, suffix) = if metadata.is_dir() {
			(TYPE_DIRECTORY, "/")
		} else {
			(TYPE_FILE, " ")
		};

		let item = GopherItem {
			kind,
			name: format!("{name}{suffix}"),
			selector: name.into_owned(),
			hostname: ctx.default_host.to_string(),
			port: ctx.default_port,
		};

		if let Err(e) = send_item(writer, ctx, item).await {
			warn!("failed to send directory entry: {e}");
			failures += 1;
		}
	}

	if failures > 0 {
		return Err(ResponseError::PartialListing { count: failures });
	}

	Ok(())
}

/// Split on CR, LF, or CRLF line endings, unlike `str::lines` which only
/// recognizes LF and CRLF. Gophermaps authored on classic Mac tooling use
/// bare CR.
fn split_lines(contents: &str) -> Vec<&str> {
	let bytes = contents.as_bytes();
	let mut lines = Vec::new();
	let mut start = 0;
	let mut i = 0;

	while i < bytes.len() {
		match bytes[i] {
			b'\r' => {
				lines.push(&contents[start..i]);
				i += 1;
				if bytes.get(i) == Some(&b'\n') {
					i += 1;
				}
				start = i;
			}
			b'\n' => {
				lines.push(&contents[start..i]);
				i += 1;
				start = i;
			}
			_ => i += 1,
		}
	}

	if start < bytes.len() {
		lines.push(&contents[start..]);
	}

	lines
}

/// Render a gophermap file: one entry per line, with the `.`/`*` special
/// directives described in the module-level docs of [`crate::handler`].
pub async fn send_gophermap<W>(
	writer: &mut W,
	ctx: &ResponseContext<'_>,
	gophermap_path: &Path,
) -> Result<(), ResponseError>
where
	W: async_std::io::Write + Unpin,
{
	let contents = async_std::fs::read_to_string(gophermap_path).await?;
	let dir = gophermap_path.parent().unwrap_or_else(|| Path::new("."));

	for line in split_lines(&contents) {
		if !line.contains('\t') {
			if line == "." {
				break;
			} else if line == "*" {
				send_directory_listing(writer, ctx, dir, false).await?;
			} else {
				send_info(writer, ctx, line).await?;
			}
			continue;
		}

		let item = GopherItem::parse(line, ctx.default_host, ctx.default_port);
		send_item(writer, ctx, item).await?;
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use std::io;

	use async_std::io::Write as AsyncWrite;
	use futures::task::{Context, Poll};
	use std::pin::Pin;

	use super::*;

	/// A minimal in-memory `AsyncWrite` for exercising the response
	/// builder without a real socket.
	#[derive(Default)]
	struct RecordingWriter(Vec<u8>);

	impl AsyncWrite for RecordingWriter {
		fn poll_write(
			mut self: Pin<&mut Self>,
			_cx: &mut Context<'_>,
			buf: &[u8],
		) -> Poll<io::Result<usize>> {
			self.0.extend_from_slice(buf);
			Poll::Ready(Ok(buf.len()))
		}

		fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
			Poll::Ready(Ok(()))
		}

		fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
			Poll::Ready(Ok(()))
		}
	}

	fn ctx<'a>(client_selector: &'a str) -> ResponseContext<'a> {
		ResponseContext {
			client_selector,
			default_host: "localhost",
			default_port: 70,
		}
	}

	#[async_std::test]
	async fn send_info_and_error_emit_sentinel_host() {
		let mut w = RecordingWriter::default();
		send_info(&mut w, &ctx(""), "hello").await.unwrap();
		let line = String::from_utf8(w.0).unwrap();
		assert_eq!(line, "ihello\t\tnull.host\t0\r\n");
	}

	#[async_std::test]
	async fn send_item_rewrites_relative_selector() {
		let mut w = RecordingWriter::default();
		let item = GopherItem {
			kind: b'0',
			name: "Intro".to_string(),
			selector: "intro.txt".to_string(),
			hostname: "localhost".to_string(),
			port: 70,
		};
		send_item(&mut w, &ctx("docs"), item).await.unwrap();
		let line = String::from_utf8(w.0).unwrap();
		assert_eq!(line, "0Intro\tdocs/intro.txt\tlocalhost\t70\r\n");
	}

	#[async_std::test]
	async fn send_item_leaves_absolute_selector_alone() {
		let mut w = RecordingWriter::default();
		let item = GopherItem {
			kind: b'1',
			name: "Root".to_string(),
			selector: "/elsewhere".to_string(),
			hostname: "localhost".to_string(),
			port: 70,
		};
		send_item(&mut w, &ctx("docs"), item).await.unwrap();
		let line = String::from_utf8(w.0).unwrap();
		assert_eq!(line, "1Root\t/elsewhere\tlocalhost\t70\r\n");
	}

	#[async_std::test]
	async fn send_file_streams_raw_bytes() {
		let dir = tempfile::tempdir().unwrap();
		let file_path = dir.path().join("hello.txt");
		std::fs::write(&file_path, b"hi\n").unwrap();

		let mut w = RecordingWriter::default();
		send_file(&mut w, &file_path).await.unwrap();
		assert_eq!(w.0, b"hi\n");
	}

	#[async_std::test]
	async fn send_directory_listing_skips_hidden_and_gophermap() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
		std::fs::write(dir.path().join(".secret"), b"s").unwrap();
		std::fs::write(dir.path().join("gophermap"), b"g").unwrap();
		std::fs::create_dir(dir.path().join("sub")).unwrap();

		let mut w = RecordingWriter::default();
		send_directory_listing(&mut w, &ctx("sub"), dir.path(), false)
			.await
			.unwrap();
		let text = String::from_utf8(w.0).unwrap();

		assert!(text.contains("0a.txt \tsub/a.txt\tlocalhost\t70\r\n"));
		assert!(text.contains("1sub/\tsub/sub\tlocalhost\t70\r\n"));
		assert!(!text.contains(".secret"));
		assert!(!text.contains("gophermap"));
	}

	#[async_std::test]
	async fn send_directory_listing_with_header() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("a.txt"), b"a").unwrap();

		let mut w = RecordingWriter::default();
		send_directory_listing(&mut w, &ctx("sub"), dir.path(), true)
			.await
			.unwrap();
		let text = String::from_utf8(w.0).unwrap();
		let mut lines = text.lines();

		assert_eq!(lines.next().unwrap(), "i[sub]:\t\tnull.host\t0");
		assert_eq!(lines.next().unwrap(), "i\t\tnull.host\t0");
	}

	#[async_std::test]
	async fn send_gophermap_inlines_star_and_stops_at_dot() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("readme.txt"), b"hi").unwrap();
		std::fs::write(
			dir.path().join("gophermap"),
			"iWelcome\tfake\t(NULL)\t0\n*\n.\niUnreachable\tfake\t(NULL)\t0\n",
		)
		.unwrap();

		let mut w = RecordingWriter::default();
		send_gophermap(&mut w, &ctx("menu"), &dir.path().join("gophermap"))
			.await
			.unwrap();
		let text = String::from_utf8(w.0).unwrap();

		assert!(text.contains("Welcome"));
		assert!(text.contains("readme.txt"));
		assert!(!text.contains("Unreachable"));
	}

	#[async_std::test]
	async fn send_gophermap_rewrites_relative_selectors() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(
			dir.path().join("gophermap"),
			"0Intro\tintro.txt\tlocalhost\t70\n",
		)
		.unwrap();

		let mut w = RecordingWriter::default();
		send_gophermap(&mut w, &ctx("docs"), &dir.path().join("gophermap"))
			.await
			.unwrap();
		let text = String::from_utf8(w.0).unwrap();

		assert!(text.contains("docs/intro.txt"));
	}

	#[test]
	fn split_lines_accepts_cr_lf_and_crlf() {
		assert_eq!(split_lines("a\rb\nc\r\nd"), vec!["a", "b", "c", "d"]);
		assert_eq!(split_lines("a\r\n"), vec!["a"]);
		assert_eq!(split_lines(""), Vec::<&str>::new());
	}
}
