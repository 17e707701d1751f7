use std::string::FromUtf8Error;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MSeedError {
    #[error("IO Error")]
    IOError(#[from] std::io::Error),
    #[error("Insufficient bytes, {0} < {1}")]
    InsufficientBytes(usize, usize),
    #[error("CRC invalid for record: calc:{0:#010X} header:{1:#010X}")]
    CrcInvalid(u32, u32),
    #[error("Text not UTF8")]
    FromUtf8Error(#[from] FromUtf8Error),
    #[error("cannot parse json")]
    JsonError(#[from] serde_json::Error),
    #[error("MSeed3 header must start with MS, (77, 83) but was `{0}{1}`")]
    BadRecordIndicator(u8, u8),
    #[error("MSeed3 header format_version must be 3 but was `{0}`")]
    UnknownFormatVersion(u8),
    #[error("cannot parse {1} in FDSN source identifier `{0}`")]
    IdentifierParse(String, String),
    #[error("no band code for sample rate {0}")]
    BandCode(f64),
    #[error("unknown band code `{0}`")]
    UnknownBandCode(char),
    #[error("unknown source code `{0}`")]
    UnknownSourceCode(char),
    #[error("Unknown data encoding: `{0}`")]
    UnknownEncoding(u8),
    #[error("Expected {0} bytes for {1} samples as encoding type {2} but header has data_length={3} bytes.")]
    DataLength(u32, u32, u8, u32),
    #[error("MSeed2 blockette {0} at offset {1} is malformed")]
    BadBlockette(u16, usize),
    #[error("compression/decompression error: `{0}`")]
    Compression(String),
    #[error("Steim last sample {0} does not match X(n) {1}")]
    SteimIntegrity(i32, i32),
    #[error("difference of {0} needs more than {1} bits")]
    SteimRange(i64, u32),
    #[error("MSeed3 extra header must be object but was `{0}`")]
    ExtraHeaderNotObject(serde_json::Value),
    #[error("MSeed3 extra header parse: `{0}`")]
    ExtraHeaderParse(String),
    #[error("json pointer `{0}` is not valid")]
    EhPointer(String),
    #[error("json pointer `{0}` not found in extra headers")]
    EhPointerNotFound(String),
    #[error("json pointer `{0}` crosses non-container value at `{1}`")]
    PathConflict(String, String),
    #[error("time field out of range: {0}")]
    TimeRange(String),
    #[error("cannot merge records: {0}")]
    Merge(String),
    #[error("MSeed error: `{0}`")]
    Unknown(String),
}
