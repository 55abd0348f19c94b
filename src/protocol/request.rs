//! Request header and body decoding (spec.md §4.7).

use crate::error::{QueryError, Result};
use crate::query::QueryContainer;

/// Width of the fixed `accession` field in a request header.
pub const ACCESSION_LEN: usize = 32;

/// The 8-bit request-type enum from spec.md §4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    IntervalsCounts = 0,
    IntervalsCountsCov = 1,
    BinsCounts = 2,
    BinsCountsCov = 3,
}

impl RequestType {
    pub fn is_covered(self) -> bool {
        matches!(self, RequestType::IntervalsCountsCov | RequestType::BinsCountsCov)
    }

    pub fn is_bins(self) -> bool {
        matches!(self, RequestType::BinsCounts | RequestType::BinsCountsCov)
    }

    fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(RequestType::IntervalsCounts),
            1 => Ok(RequestType::IntervalsCountsCov),
            2 => Ok(RequestType::BinsCounts),
            3 => Ok(RequestType::BinsCountsCov),
            other => Err(QueryError::InvalidRequest(format!(
                "unknown request_type byte: {other}"
            ))),
        }
    }
}

/// The fixed-width request header: a 32-byte accession, the client's
/// expected methylome size, and the request type (spec.md §4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub accession: String,
    pub methylome_size: u32,
    pub request_type: RequestType,
}

impl RequestHeader {
    pub const WIRE_LEN: usize = ACCESSION_LEN + 4 + 1;

    pub fn new(accession: &str, methylome_size: u32, request_type: RequestType) -> Result<Self> {
        if accession.len() > ACCESSION_LEN {
            return Err(QueryError::InvalidRequest(format!(
                "accession '{accession}' exceeds {ACCESSION_LEN} bytes"
            )));
        }
        Ok(Self {
            accession: accession.to_string(),
            methylome_size,
            request_type,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::WIRE_LEN] {
        let mut buf = [0u8; Self::WIRE_LEN];
        let name_bytes = self.accession.as_bytes();
        buf[..name_bytes.len()].copy_from_slice(name_bytes);
        buf[ACCESSION_LEN..ACCESSION_LEN + 4].copy_from_slice(&self.methylome_size.to_le_bytes());
        buf[ACCESSION_LEN + 4] = self.request_type as u8;
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::WIRE_LEN {
            return Err(QueryError::InvalidRequest(format!(
                "request header must be {} bytes, got {}",
                Self::WIRE_LEN,
                bytes.len()
            )));
        }
        let raw_accession = &bytes[..ACCESSION_LEN];
        let nul_at = raw_accession.iter().position(|&b| b == 0).unwrap_or(ACCESSION_LEN);
        let accession = std::str::from_utf8(&raw_accession[..nul_at])
            .map_err(|_| QueryError::InvalidRequest("accession is not valid UTF-8".to_string()))?
            .to_string();
        let methylome_size = u32::from_le_bytes(
            bytes[ACCESSION_LEN..ACCESSION_LEN + 4].try_into().unwrap(),
        );
        let request_type = RequestType::from_u8(bytes[ACCESSION_LEN + 4])?;
        Ok(Self {
            accession,
            methylome_size,
            request_type,
        })
    }
}

/// The request body: either a batch of CpG-offset ranges directly, or a
/// bin size the server expands via [`crate::cpg_index::CpgIndex::translate_bins`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Intervals(QueryContainer),
    Bins { bin_size: u32 },
}

impl RequestBody {
    /// Encode the intervals form: `n_intervals` (u32) followed by the
    /// packed `(start, stop)` pairs (spec.md §4.7).
    pub fn encode_intervals(query: &QueryContainer) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + query.size() * 8);
        buf.extend_from_slice(&(query.size() as u32).to_le_bytes());
        buf.extend_from_slice(&query.to_bytes());
        buf
    }

    pub fn encode_bins(bin_size: u32) -> Vec<u8> {
        bin_size.to_le_bytes().to_vec()
    }

    /// Decode a body for `request_type`, dispatching between the intervals
    /// and bins wire forms.
    pub fn decode(request_type: RequestType, bytes: &[u8]) -> Result<Self> {
        if request_type.is_bins() {
            if bytes.len() != 4 {
                return Err(QueryError::InvalidRequest(format!(
                    "bins body must be 4 bytes, got {}",
                    bytes.len()
                )));
            }
            let bin_size = u32::from_le_bytes(bytes.try_into().unwrap());
            Ok(RequestBody::Bins { bin_size })
        } else {
            if bytes.len() < 4 {
                return Err(QueryError::InvalidRequest(
                    "intervals body missing n_intervals prefix".to_string(),
                ));
            }
            let n_intervals = u32::from_le_bytes(bytes[..4].try_into().unwrap()) as usize;
            let rest = &bytes[4..];
            if rest.len() != n_intervals * 8 {
                return Err(QueryError::InvalidRequest(format!(
                    "intervals body declares {n_intervals} ranges but carries {} bytes",
                    rest.len()
                )));
            }
            Ok(RequestBody::Intervals(QueryContainer::from_bytes(rest)?))
        }
    }

    /// Render the `"{n}\n"` textual preamble used ahead of the binary
    /// offsets on a text-framed channel (spec.md §4.7, §8 scenario 5).
    pub fn text_preamble(n_intervals: usize) -> String {
        format!("{n_intervals}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_through_bytes() {
        let header = RequestHeader::new("SRX012345", 6053, RequestType::IntervalsCountsCov).unwrap();
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), RequestHeader::WIRE_LEN);
        let decoded = RequestHeader::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn header_rejects_oversized_accession() {
        let too_long = "x".repeat(ACCESSION_LEN + 1);
        assert!(RequestHeader::new(&too_long, 0, RequestType::IntervalsCounts).is_err());
    }

    #[test]
    fn header_rejects_wrong_length_buffer() {
        assert!(RequestHeader::from_bytes(&[0u8; 10]).is_err());
    }

    #[test]
    fn header_rejects_unknown_request_type_byte() {
        let mut bytes = RequestHeader::new("a", 0, RequestType::IntervalsCounts)
            .unwrap()
            .to_bytes();
        bytes[ACCESSION_LEN + 4] = 0xFF;
        assert!(RequestHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn intervals_body_round_trips_and_matches_spec_scenario_5() {
        let query = QueryContainer::new(vec![(1, 3), (10, 20), (100, 321)]);
        let encoded = RequestBody::encode_intervals(&query);
        assert_eq!(&encoded[..4], &3u32.to_le_bytes());
        let expected_offsets: [u8; 24] = [
            0x01, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x14, 0x00,
            0x00, 0x00, 0x64, 0x00, 0x00, 0x00, 0x41, 0x01, 0x00, 0x00,
        ];
        assert_eq!(&encoded[4..], &expected_offsets);

        let decoded = RequestBody::decode(RequestType::IntervalsCounts, &encoded).unwrap();
        assert_eq!(decoded, RequestBody::Intervals(query));
    }

    #[test]
    fn bins_body_round_trips() {
        let encoded = RequestBody::encode_bins(1000);
        let decoded = RequestBody::decode(RequestType::BinsCounts, &encoded).unwrap();
        assert_eq!(decoded, RequestBody::Bins { bin_size: 1000 });
    }

    #[test]
    fn intervals_body_rejects_length_mismatch() {
        let mut encoded = RequestBody::encode_intervals(&QueryContainer::new(vec![(0, 1)]));
        encoded.truncate(encoded.len() - 1);
        assert!(RequestBody::decode(RequestType::IntervalsCounts, &encoded).is_err());
    }

    #[test]
    fn text_preamble_matches_count() {
        assert_eq!(RequestBody::text_preamble(3), "3\n");
    }
}
