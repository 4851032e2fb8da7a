//! Path fragment joining and selector sanitization
//!
//! Gopher selectors are client-supplied, free-form strings. The only
//! security-critical invariant is that a resolved target always lands
//! inside the document root; these helpers enforce that cheaply before a
//! canonicalizing check (see `handler::resolve`) closes the remaining gap.

use std::path::MAIN_SEPARATOR;

/// Join path fragments with exactly one platform separator between
/// fragments that don't already end/begin with one.
///
/// Empty fragments are skipped. No other normalization (no `.`/`..`
/// resolution, no deduplication of interior separators) is performed.
pub fn join(fragments: &[&str]) -> String {
	let mut out = String::new();

	for frag in fragments.iter().copied().filter(|f| !f.is_empty()) {
		if out.is_empty() {
			out.push_str(frag);
			continue;
		}

		let out_has_sep = out.ends_with(MAIN_SEPARATOR);
		let frag_has_sep = frag.starts_with(MAIN_SEPARATOR);

		if out_has_sep && frag_has_sep {
			out.pop();
		} else if !out_has_sep && !frag_has_sep {
			out.push(MAIN_SEPARATOR);
		}

		out.push_str(frag);
	}

	out
}

/// Result of sanitizing a selector: the sanitized value, and whether it
/// differs from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
	pub selector: String,
	pub modified: bool,
}

/// Truncate a selector at the first `".."` substring (refusing everything
/// from that point on), and on platforms whose native separator isn't `/`,
/// rewrite `/` to the native separator.
///
/// The sanitized selector is always a prefix of the input. This is
/// deliberately conservative: a legitimate filename containing two dots in
/// a row (`"a..b"`) is truncated too, trading a rare false positive for a
/// simple, auditable traversal defense. It is the first-line filter only —
/// callers additionally canonicalize the resolved path and verify it stays
/// under the document root.
pub fn sanitize(selector: &str) -> Sanitized {
	let mut modified = false;

	let truncated = match selector.find("..") {
		Some(pos) => {
			modified = true;
			&selector[..pos]
		}
		None => selector,
	};

	let mut result = truncated.to_string();

	if MAIN_SEPARATOR != '/' && result.contains('/') {
		result = result.replace('/', &MAIN_SEPARATOR.to_string());
		modified = true;
	}

	Sanitized {
		selector: result,
		modified,
	}
}
