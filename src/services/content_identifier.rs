use lazy_regex::regex;
use sha2::{Digest, Sha256};

/// Dedup key for a text submission: SHA-256 of the trimmed text.
pub(crate) fn for_text(content: &str) -> String {
    hex::encode(Sha256::digest(content.trim().as_bytes()))
}

/// Dedup key for a file: the host's content hash when it has one, otherwise SHA-256 of the bytes.
pub(crate) fn for_file(content_hash: Option<&str>, content: &[u8]) -> String {
    match content_hash.map(str::trim).filter(|hash| !hash.is_empty()) {
        Some(hash) => hash.to_ascii_lowercase(),
        None => hex::encode(Sha256::digest(content)),
    }
}

pub(crate) fn text_filename(identifier: &str) -> String {
    format!("content_{identifier}")
}

pub(crate) fn strip_tags(html: &str) -> String {
    regex!(r"<[^>]*>").replace_all(html, "").into_owned()
}

pub(crate) fn wrap_no_overflow(content: &str) -> String {
    format!("<div class=\"no-overflow\">{content}</div>")
}
