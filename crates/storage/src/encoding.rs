use filedrop_protocol::constants::PATH_SEPARATOR;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Everything but RFC 3986 unreserved characters gets escaped.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes a single URL path segment.
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Percent-encodes each segment of an object path, keeping the separators.
///
/// `u1/report #1.pdf` becomes `u1/report%20%231.pdf`.
pub fn encode_object_path(path: &str) -> String {
    path.split(PATH_SEPARATOR)
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}
