#![allow(dead_code)]

pub mod socket_guard;

/// A body that passes PDF validation: `%PDF-1.4` followed by padding.
pub fn pdf_body(len: usize) -> Vec<u8> {
    let mut body = b"%PDF-1.4\n".to_vec();
    body.resize(len.max(body.len()), b'0');
    body
}
