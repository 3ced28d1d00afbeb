//! Utility functions for index-entry encoding and id rendering

/// Separator between ids inside an index entry.
pub const SEP: char = '|';

// An empty (or absent) entry decodes to no ids rather than one empty id.
pub fn split_entry(bytes: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(bytes);
    if text.is_empty() {
        return vec![];
    }
    text.split(SEP).map(str::to_string).collect()
}

pub fn join_entry(ids: &[String]) -> Vec<u8> {
    ids.join(&SEP.to_string()).into_bytes()
}

/// Left-pads with zeros up to `width`. Longer input is returned as is.
pub fn zero_pad(value: u64, width: usize) -> String {
    format!("{value:0>width$}")
}
