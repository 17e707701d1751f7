//! Read, write and transform seismic time-series records in the
//! MiniSEED v2 and v3 formats.
//!
//! Records are created either by decoding bytes or by assembling a
//! header, identifier and samples; packing computes the CRC32C and
//! unpacking verifies it. MiniSEED v2 support is read only, with a
//! converter to v3.
//!
//! ```no_run
//! use std::io::Write;
//! use mseed::{
//!     DataEncoding, EncodedTimeseries, ExtraHeaders, MSeed3Header, MSeed3Record,
//!     SourceIdentifier,
//! };
//!
//! # fn main() -> Result<(), mseed::MSeedError> {
//! let start = "2014-11-28T12:00:09Z".parse::<chrono::DateTime<chrono::Utc>>()
//!     .map_err(|e| mseed::MSeedError::Unknown(e.to_string()))?;
//! let timeseries = vec![0, 1, -1, 5, 3, -5, 10, -1, 1, 0];
//! let header = MSeed3Header::new(start, DataEncoding::INT32, 10.0, timeseries.len());
//! let mut record = MSeed3Record::new(
//!     header,
//!     SourceIdentifier::from("FDSN:CO_BIRD_00_H_H_Z"),
//!     ExtraHeaders::new(),
//!     EncodedTimeseries::Int32(timeseries),
//! );
//!
//! let outfile = std::fs::File::create("simple.ms3")?;
//! let mut buf_writer = std::io::BufWriter::new(outfile);
//! // writing recalculates the header lengths and the CRC
//! record.write_to(&mut buf_writer)?;
//! buf_writer.flush()?;
//!
//! let infile = std::fs::File::open("simple.ms3")?;
//! let mut buf_reader = std::io::BufReader::new(infile);
//! let records = mseed::read_mseed3(&mut buf_reader)?;
//! println!("read {} records", records.len());
//! # Ok(())
//! # }
//! ```

pub mod convert;
pub mod data_encoding;
pub mod encoded_timeseries;
pub mod extra_headers;
pub mod fdsn_source_identifier;
pub mod header;
pub mod merge;
pub mod mseed2;
pub mod mseed_error;
pub mod record;
pub mod sample_codec;
pub mod seed_time;
pub mod steim1;
pub mod steim2;
pub mod steim_frame_block;

pub use crate::convert::mseed2_to_mseed3;
pub use crate::data_encoding::DataEncoding;
pub use crate::encoded_timeseries::EncodedTimeseries;
pub use crate::extra_headers::{delete_all, get_all, set_all, ExtraHeaders};
pub use crate::fdsn_source_identifier::{
    band_code_candidates, band_code_for_rate, describe_band, describe_source,
    FdsnSourceIdentifier, SourceIdentifier,
};
pub use crate::header::{MSeed3Header, CRC_OFFSET, FIXED_HEADER_SIZE};
pub use crate::merge::{merge_records, MergeOptions, Merger};
pub use crate::mseed2::{
    read_miniseed2, unpack_miniseed2, Blockette, MiniseedHeader, MiniseedRecord,
    MiniseedRecordReader,
};
pub use crate::mseed_error::MSeedError;
pub use crate::record::{read_mseed3, MSeed3Record, MSeed3RecordReader, CASTAGNOLI};
pub use crate::sample_codec::{ByteOrder, Samples};
pub use crate::seed_time::BTime;
