//! Response framing: error code plus an optional level array (spec.md §4.7).

use crate::error::{QueryError, Result};
use crate::levels::Level;

/// A response frame: `error_code` (0 = OK) followed by a level per query
/// range when OK, or zero response bytes on failure (spec.md §7).
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub error_code: u32,
    pub levels: Vec<Level>,
}

impl Response {
    pub fn ok(levels: Vec<Level>) -> Self {
        Self { error_code: 0, levels }
    }

    pub fn err(error_code: u32) -> Self {
        Self { error_code, levels: Vec::new() }
    }

    /// Map a computed result to its wire response, collapsing any error to
    /// its wire code with no body (spec.md §7: "a header with the error
    /// code and zero response bytes").
    pub fn from_result(result: Result<Vec<Level>>) -> Self {
        match result {
            Ok(levels) => Response::ok(levels),
            Err(e) => Response::err(e.wire_code()),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.levels.iter().map(Level::wire_len).sum::<usize>());
        buf.extend_from_slice(&self.error_code.to_le_bytes());
        for level in &self.levels {
            buf.extend_from_slice(&level.to_bytes());
        }
        buf
    }

    /// Parse a response frame. `covered` must match the variant the
    /// request asked for, since the wire format carries no per-element tag.
    pub fn from_bytes(bytes: &[u8], covered: bool) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(QueryError::InvalidRequest(
                "response frame shorter than the error code field".to_string(),
            ));
        }
        let error_code = u32::from_le_bytes(bytes[..4].try_into().unwrap());
        let body = &bytes[4..];
        if error_code != 0 {
            return Ok(Response::err(error_code));
        }
        let stride = if covered { 12 } else { 8 };
        if body.len() % stride != 0 {
            return Err(QueryError::InvalidRequest(format!(
                "response body length {} is not a multiple of {stride}",
                body.len()
            )));
        }
        let mut levels = Vec::with_capacity(body.len() / stride);
        for chunk in body.chunks_exact(stride) {
            let n_meth = u32::from_le_bytes(chunk[0..4].try_into().unwrap());
            let n_unmeth = u32::from_le_bytes(chunk[4..8].try_into().unwrap());
            let n_covered = if covered {
                Some(u32::from_le_bytes(chunk[8..12].try_into().unwrap()))
            } else {
                None
            };
            levels.push(Level { n_meth, n_unmeth, n_covered });
        }
        Ok(Response { error_code, levels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_response_round_trips_basic_variant() {
        let levels = vec![
            Level { n_meth: 3, n_unmeth: 1, n_covered: None },
            Level { n_meth: 0, n_unmeth: 0, n_covered: None },
        ];
        let resp = Response::ok(levels.clone());
        let bytes = resp.to_bytes();
        let decoded = Response::from_bytes(&bytes, false).unwrap();
        assert_eq!(decoded.levels, levels);
        assert_eq!(decoded.error_code, 0);
    }

    #[test]
    fn ok_response_round_trips_covered_variant() {
        let levels = vec![Level { n_meth: 1, n_unmeth: 2, n_covered: Some(1) }];
        let resp = Response::ok(levels.clone());
        let bytes = resp.to_bytes();
        let decoded = Response::from_bytes(&bytes, true).unwrap();
        assert_eq!(decoded.levels, levels);
    }

    #[test]
    fn error_response_carries_no_body() {
        let resp = Response::err(4);
        let bytes = resp.to_bytes();
        assert_eq!(bytes.len(), 4);
        let decoded = Response::from_bytes(&bytes, false).unwrap();
        assert_eq!(decoded.error_code, 4);
        assert!(decoded.levels.is_empty());
    }

    #[test]
    fn from_result_maps_error_to_wire_code_with_empty_body() {
        let resp = Response::from_result(Err(QueryError::CacheExhausted));
        assert_eq!(resp.error_code, crate::error::WireErrorCode::CacheExhausted as u32);
        assert!(resp.levels.is_empty());
    }
}
