pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize, hash_comments: bool) -> bool {
    (bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-'))
        || (hash_comments && bytes.get(idx) == Some(&b'#'))
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// True when the quote at `idx` is immediately repeated (an escaped quote).
pub(super) fn is_doubled(bytes: &[u8], idx: usize, quote: u8) -> bool {
    bytes.get(idx + 1) == Some(&quote)
}
