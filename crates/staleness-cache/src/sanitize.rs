//! Key sanitization: turns arbitrary key segments into safe path components.
//!
//! Every segment is reduced to ASCII alphanumerics and single dashes. Path
//! separators, dots and common joining characters are replaced by a dash,
//! runs of dashes collapse into one, and anything else is dropped. Only the
//! final segment keeps its extension (itself sanitized separately from the
//! stem). The output has to stay byte-for-byte stable, since existing cache
//! trees on disk are addressed by it.

use std::path::{Path, PathBuf};

/// Stand-in for segments that sanitize to nothing.
pub const PLACEHOLDER: &str = "-";

/// Builds the on-disk path for `segments` below `base`.
///
/// The result never escapes `base`: no sanitized component can be empty,
/// `.`/`..`, or contain a separator.
pub fn sanitized_path<S: AsRef<str>>(base: &Path, segments: &[S]) -> PathBuf {
    let last = segments.len().saturating_sub(1);
    let mut path = base.to_path_buf();
    for (i, segment) in segments.iter().enumerate() {
        path.push(sanitize_segment(segment.as_ref(), i == last));
    }
    path
}

/// Sanitizes one key segment.
///
/// With `keep_extension` the extension is split off first and re-attached
/// after both halves have been cleaned; otherwise it is discarded.
pub fn sanitize_segment(segment: &str, keep_extension: bool) -> String {
    let (stem, ext) = split_extension(segment);
    let mut name = base_name(stem);
    if name.is_empty() {
        name = PLACEHOLDER.to_string();
    }
    if keep_extension {
        let ext = base_name(ext.trim_start_matches('.'));
        if !ext.is_empty() {
            name.push('.');
            name.push_str(&ext);
        }
    }
    name
}

/// Splits off the extension of the last path element, dot included.
///
/// `"a.json"` gives `("a", ".json")`; `"bar../"` has no extension because its
/// last element is empty.
fn split_extension(segment: &str) -> (&str, &str) {
    for (i, c) in segment.char_indices().rev() {
        match c {
            '/' => break,
            '.' => return (&segment[..i], &segment[i..]),
            _ => {}
        }
    }
    (segment, "")
}

/// Reduces a string to `[A-Za-z0-9-]` with no repeated dashes. May return an
/// empty string.
fn base_name(input: &str) -> String {
    let separated: String = input
        .chars()
        .map(|c| if c == '.' || c == '/' { '-' } else { c })
        .collect();

    let mut out = String::with_capacity(separated.len());
    for c in flatten_accents(separated.trim_matches(' ')).chars() {
        let c = match c {
            ' ' | '&' | '_' | '=' | '+' | ':' => '-',
            c if c.is_ascii_alphanumeric() || c == '-' => c,
            _ => continue,
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Transliterates common accented Latin letters so that names stay legible
/// once non-ASCII characters are dropped.
fn flatten_accents(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        let replacement = match c {
            'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "A",
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
            'Æ' => "AE",
            'æ' => "ae",
            'Ç' => "C",
            'ç' => "c",
            'È' | 'É' | 'Ê' | 'Ë' => "E",
            'è' | 'é' | 'ê' | 'ë' => "e",
            'Ì' | 'Í' | 'Î' | 'Ï' => "I",
            'ì' | 'í' | 'î' | 'ï' => "i",
            'Ñ' => "N",
            'ñ' => "n",
            'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "O",
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
            'Œ' => "OE",
            'œ' => "oe",
            'Ù' | 'Ú' | 'Û' | 'Ü' => "U",
            'ù' | 'ú' | 'û' | 'ü' => "u",
            'Ý' => "Y",
            'ý' | 'ÿ' => "y",
            'ß' => "ss",
            'Þ' => "Th",
            'þ' => "th",
            'Ð' => "D",
            'ð' => "d",
            _ => {
                out.push(c);
                continue;
            }
        };
        out.push_str(replacement);
    }
    out
}
