//! Non-protocol-related utilities

use std::{
	fmt::{Debug, Display, Formatter, Result as FmtResult},
	net::SocketAddr,
};

/// Format an ASCII-ish byte string
///
/// Selectors arrive over the wire as raw bytes with no guaranteed encoding;
/// this renders them safely for log messages without assuming UTF-8.
pub struct FmtAsciiIsh<'a>(pub &'a [u8]);

impl Debug for FmtAsciiIsh<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_fmt(format_args!("b\"{self}\""))
	}
}

impl Display for FmtAsciiIsh<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		use std::fmt::Write;

		const ASCII_CONTROL_ESCAPES: &[(u8, &str)] = &[
			(b'\0', "\\0"),
			(b'\t', "\\t"),
			(b'\n', "\\n"),
			(b'\r', "\\r"),
			(b'"', "\\\""),
			(b'\\', "\\\\"),
		];

		for byte in self.0.iter().copied() {
			if let Ok(escaped) = ASCII_CONTROL_ESCAPES.binary_search_by_key(&byte, |&(c, _)| c) {
				f.write_str(ASCII_CONTROL_ESCAPES[escaped].1)?;
			} else if byte.is_ascii_graphic() || byte == b' ' {
				f.write_char(byte as char)?;
			} else {
				f.write_fmt(format_args!("\\x{byte:02x}"))?;
			}
		}

		Ok(())
	}
}

/// Format a socket address, if it's known
pub struct FmtMaybeAddr<'a, E>(pub &'a Result<SocketAddr, E>);

impl<E: Debug> Debug for FmtMaybeAddr<'_, E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		match self.0 {
			Ok(addr) => write!(f, "{addr:?}"),
			Err(err) => write!(f, "{err:?}"),
		}
	}
}

impl<E> Display for FmtMaybeAddr<'_, E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		if let Ok(addr) = self.0 {
			write!(f, "{addr}")
		} else {
			write!(f, "[address unknown]")
		}
	}
}
