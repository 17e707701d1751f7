use std::fmt;
use std::fmt::Formatter;

/// Known data payload encoding codes.
/// ```text
/// 0   Text, UTF-8 allowed, use ASCII for maximum portability, no structure defined
/// 1   16-bit integer (two's complement), little endian byte order
/// 3   32-bit integer (two's complement), little endian byte order
/// 4   32-bit floats (IEEE float), little endian byte order
/// 5   64-bit floats (IEEE double), little endian byte order
/// 10  Steim-1 integer compression, big endian byte order
/// 11  Steim-2 integer compression, big endian byte order
/// 19  Steim-3 integer compression, big endian (not in common use in archives)
/// 100 Opaque data - only for use in special scenarios, not intended for archiving
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataEncoding {
    TEXT,
    INT16,
    INT32,
    FLOAT32,
    FLOAT64,
    STEIM1,
    STEIM2,
    STEIM3,
    OPAQUE,
    UNKNOWN(u8),
}

impl DataEncoding {
    /// Creates a DataEncoding based on the input integer
    pub fn from_int(val: u8) -> DataEncoding {
        match val {
            0 => DataEncoding::TEXT,
            1 => DataEncoding::INT16,
            3 => DataEncoding::INT32,
            4 => DataEncoding::FLOAT32,
            5 => DataEncoding::FLOAT64,
            10 => DataEncoding::STEIM1,
            11 => DataEncoding::STEIM2,
            19 => DataEncoding::STEIM3,
            100 => DataEncoding::OPAQUE,
            _ => DataEncoding::UNKNOWN(val),
        }
    }

    /// The integer value, as a u8, of the encoding
    pub fn value(&self) -> u8 {
        match &self {
            DataEncoding::TEXT => 0,
            DataEncoding::INT16 => 1,
            DataEncoding::INT32 => 3,
            DataEncoding::FLOAT32 => 4,
            DataEncoding::FLOAT64 => 5,
            DataEncoding::STEIM1 => 10,
            DataEncoding::STEIM2 => 11,
            DataEncoding::STEIM3 => 19,
            DataEncoding::OPAQUE => 100,
            DataEncoding::UNKNOWN(val) => *val,
        }
    }

    /// Bytes per sample for the fixed-width primitive encodings, None
    /// for text, compressed and opaque payloads.
    pub fn bytes_per_sample(&self) -> Option<u32> {
        match self {
            DataEncoding::INT16 => Some(2),
            DataEncoding::INT32 => Some(4),
            DataEncoding::FLOAT32 => Some(4),
            DataEncoding::FLOAT64 => Some(8),
            _ => None,
        }
    }

    /// True for encodings this library can turn back into samples.
    pub fn can_decompress(&self) -> bool {
        matches!(
            self,
            DataEncoding::TEXT
                | DataEncoding::INT16
                | DataEncoding::INT32
                | DataEncoding::FLOAT32
                | DataEncoding::FLOAT64
                | DataEncoding::STEIM1
                | DataEncoding::STEIM2
        )
    }

    /// True for the fixed-width primitive encodings, 1, 3, 4 and 5.
    pub fn is_primitive(&self) -> bool {
        self.bytes_per_sample().is_some()
    }

    /// True for the Steim differential compression encodings.
    pub fn is_steim(&self) -> bool {
        matches!(
            self,
            DataEncoding::STEIM1 | DataEncoding::STEIM2 | DataEncoding::STEIM3
        )
    }
}

impl fmt::Display for DataEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DataEncoding::TEXT => write!(
                f,
                "Text, UTF-8 allowed, use ASCII for maximum portability, no structure defined"
            ),
            DataEncoding::INT16 => write!(
                f,
                "16-bit integer (two's complement), little endian byte order"
            ),
            DataEncoding::INT32 => write!(
                f,
                "32-bit integer (two's complement), little endian byte order"
            ),
            DataEncoding::FLOAT32 => {
                write!(f, "32-bit floats (IEEE float), little endian byte order")
            }
            DataEncoding::FLOAT64 => {
                write!(f, "64-bit floats (IEEE double), little endian byte order")
            }
            DataEncoding::STEIM1 => write!(f, "Steim-1 integer compression, big endian byte order"),
            DataEncoding::STEIM2 => write!(f, "Steim-2 integer compression, big endian byte order"),
            DataEncoding::STEIM3 => write!(
                f,
                "Steim-3 integer compression, big endian (not in common use in archives)"
            ),
            DataEncoding::OPAQUE => write!(
                f,
                "Opaque data - only for use in special scenarios, not intended for archiving"
            ),
            DataEncoding::UNKNOWN(val) => write!(f, "Unknown encoding: {}", val),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_round_trip() {
        for val in [0_u8, 1, 3, 4, 5, 10, 11, 19, 100, 42] {
            assert_eq!(DataEncoding::from_int(val).value(), val);
        }
    }

    #[test]
    fn primitive_widths() {
        assert_eq!(DataEncoding::INT16.bytes_per_sample(), Some(2));
        assert_eq!(DataEncoding::INT32.bytes_per_sample(), Some(4));
        assert_eq!(DataEncoding::FLOAT32.bytes_per_sample(), Some(4));
        assert_eq!(DataEncoding::FLOAT64.bytes_per_sample(), Some(8));
        assert_eq!(DataEncoding::STEIM1.bytes_per_sample(), None);
        assert_eq!(DataEncoding::TEXT.bytes_per_sample(), None);
    }

    #[test]
    fn steim3_refused() {
        assert!(!DataEncoding::STEIM3.can_decompress());
        assert!(!DataEncoding::OPAQUE.can_decompress());
        assert!(DataEncoding::STEIM2.can_decompress());
    }
}
