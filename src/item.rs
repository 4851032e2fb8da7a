//! The Gopher item model ([RFC 1436](https://datatracker.ietf.org/doc/html/rfc1436))
//!
//! One menu entry: a type byte, a display name, a selector the client can
//! send back, and a host/port pair. Info and error entries use the
//! conventional "no host" sentinel (`"null.host"`, port `0`).

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Item type for a plain text file.
pub const TYPE_FILE: u8 = b'0';
/// Item type for a directory (submenu).
pub const TYPE_DIRECTORY: u8 = b'1';
/// Item type for an informational line.
pub const TYPE_INFO: u8 = b'i';
/// Item type for an error line.
pub const TYPE_ERROR: u8 = b'3';

/// Conventional "no host" marker used by info/error entries.
pub const NULL_HOST: &str = "null.host";
/// Conventional "no port" sentinel used by info/error entries. Some
/// historical servers use `1` here; `0` is used instead, matching
/// widespread Gopher client expectations.
pub const NULL_PORT: u16 = 0;

/// A complete serialized menu line, CRLF included, must fit in this many
/// bytes.
pub const MAX_LINE_LEN: usize = 255;

/// Errors that can occur while turning a [`GopherItem`] into its wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
	/// One of `name`, `selector`, `hostname` contains a TAB, CR, or LF.
	ControlCharacter(&'static str),
	/// The serialized line (CRLF included) would exceed [`MAX_LINE_LEN`]
	/// bytes.
	LineTooLong(usize),
}

impl Display for ItemError {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		match self {
			Self::ControlCharacter(field) => {
				write!(f, "item {field} contains a TAB, CR, or LF")
			}
			Self::LineTooLong(len) => {
				write!(f, "serialized item is {len} bytes, exceeding {MAX_LINE_LEN}")
			}
		}
	}
}

impl std::error::Error for ItemError {}

/// One menu entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GopherItem {
	/// The type character. Round-trips byte-for-byte through `parse`/
	/// `serialize` only for ASCII values (0x00-0x7F) — the wire line is
	/// built as a `String`, which can't hold an arbitrary non-UTF-8 byte,
	/// and every type character RFC 1436 defines is ASCII.
	pub kind: u8,
	pub name: String,
	pub selector: String,
	pub hostname: String,
	pub port: u16,
}

impl Default for GopherItem {
	fn default() -> Self {
		Self {
			kind: 0,
			name: String::new(),
			selector: String::new(),
			hostname: NULL_HOST.to_string(),
			port: NULL_PORT,
		}
	}
}

impl GopherItem {
	/// An informational line: no link, sentinel host/port.
	pub fn info(message: impl Into<String>) -> Self {
		Self {
			kind: TYPE_INFO,
			name: message.into(),
			..Self::default()
		}
	}

	/// An error line: no link, sentinel host/port.
	pub fn error(message: impl Into<String>) -> Self {
		Self {
			kind: TYPE_ERROR,
			name: message.into(),
			..Self::default()
		}
	}

	/// Parse one tab-separated gophermap record:
	/// `T<name>\t<selector>\t<hostname>\t<port>`.
	///
	/// Fields beyond the type+name are optional and defaulted in order:
	/// `selector = ""`, `hostname = default_host`, `port = default_port`.
	/// Trailing fields beyond the fourth are ignored. A line whose body has
	/// no TAB at all yields an item with only `kind` set.
	pub fn parse(line: &str, default_host: &str, default_port: u16) -> Self {
		let Some(&first_byte) = line.as_bytes().first() else {
			return Self::default();
		};

		// An ASCII leading byte (the only kind of type character RFC 1436
		// defines) is taken verbatim. A non-ASCII leading character can't be
		// sliced off at byte offset 1 without risking a char-boundary
		// panic, so it's taken as a whole scalar value instead — no longer
		// a byte-faithful passthrough, but it degrades rather than panics.
		let (kind, rest) = if first_byte.is_ascii() {
			(first_byte, &line[1..])
		} else {
			let mut chars = line.chars();
			let first = chars.next().unwrap();
			(first as u8, chars.as_str())
		};

		let Some(tab_pos) = rest.find('\t') else {
			return Self {
				kind,
				hostname: default_host.to_string(),
				port: default_port,
				..Self::default()
			};
		};

		let name = rest[..tab_pos].to_string();
		let mut fields = rest[tab_pos + 1..].split('\t');
		let selector = fields.next().unwrap_or("").to_string();
		let hostname = fields
			.next()
			.map(str::to_string)
			.unwrap_or_else(|| default_host.to_string());
		let port = fields
			.next()
			.and_then(|p| p.trim().parse().ok())
			.unwrap_or(default_port);

		Self {
			kind,
			name,
			selector,
			hostname,
			port,
		}
	}

	/// Serialize to wire form: `<kind><name>\t<selector>\t<hostname>\t<port>\r\n`.
	pub fn serialize(&self) -> Result<String, ItemError> {
		for (field, value) in [
			("name", &self.name),
			("selector", &self.selector),
			("hostname", &self.hostname),
		] {
			if value.bytes().any(|b| matches!(b, b'\t' | b'\r' | b'\n')) {
				return Err(ItemError::ControlCharacter(field));
			}
		}

		let line = format!(
			"{}{}\t{}\t{}\t{}\r\n",
			self.kind as char, self.name, self.selector, self.hostname, self.port
		);

		if line.len() > MAX_LINE_LEN {
			return Err(ItemError::LineTooLong(line.len()));
		}

		Ok(line)
	}
}
