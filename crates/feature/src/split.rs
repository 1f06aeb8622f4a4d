//! Column cell parsing: split a raw string on a delimiter set, dropping the
//! literal token `"none"`, and attach each surviving token's BKDR hash.

use crate::hash::bkdr_hash;
use smallvec::SmallVec;

/// A parsed token plus its precomputed BKDR hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenHash<'a> {
    pub token: &'a str,
    pub hash: u64,
}

impl<'a> TokenHash<'a> {
    pub fn new(token: &'a str) -> Self {
        TokenHash {
            token,
            hash: bkdr_hash(token.as_bytes()),
        }
    }
}

/// Small-vector of tokens for one cell; most cells hold a single token.
pub type TokenVec<'a> = SmallVec<[TokenHash<'a>; 1]>;

const NONE_LITERAL: &str = "none";

/// Split `s` on any byte in `delims`, dropping empty runs and the literal
/// token `"none"`.
pub fn split_filter<'a>(s: &'a str, delims: &str) -> TokenVec<'a> {
    let mut out = TokenVec::new();
    for piece in s.split(|c| delims.contains(c)) {
        if piece.is_empty() || piece == NONE_LITERAL {
            continue;
        }
        out.push(TokenHash::new(piece));
    }
    out
}
