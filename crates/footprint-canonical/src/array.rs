//! Self-describing blob codec for homogeneous numeric arrays.
//!
//! Blob layout:
//!
//! - magic `b"FPA"`
//! - dtype code (1 byte)
//! - byte order (`b'<'` little, `b'>'` big)
//! - `ndim` (1 byte), followed by `ndim` big-endian `u64` dimensions
//! - raw element buffer, exactly `item_size * product(shape)` bytes
//!
//! The buffer is stored as given. Byte order is recorded, never converted.

use std::fmt;

use thiserror::Error;

/// Array blob magic bytes.
pub const ARRAY_MAGIC: &[u8; 3] = b"FPA";

/// Errors raised by the array sub-codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArrayError {
    /// Buffer length does not match dtype and shape.
    #[error("buffer holds {actual} bytes, shape {shape:?} of {dtype} needs {expected}")]
    LengthMismatch {
        /// Element type name.
        dtype: &'static str,
        /// Declared shape.
        shape: Vec<u64>,
        /// Bytes required by the shape.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
    /// More dimensions than the one-byte header can describe.
    #[error("array has {0} dimensions, at most 255 are supported")]
    TooManyDimensions(usize),
    /// Element count does not fit in memory.
    #[error("element count overflows for shape {0:?}")]
    ShapeOverflow(Vec<u64>),
    /// Blob header is invalid.
    #[error("invalid array blob: {0}")]
    InvalidBlob(String),
    /// Typed accessor used on an array of another dtype.
    #[error("array of {actual} cannot be read as {requested}")]
    DTypeMismatch {
        /// Requested element type.
        requested: &'static str,
        /// Stored element type.
        actual: &'static str,
    },
}

/// Element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DType {
    /// One byte per element, 0 or 1.
    Bool,
    /// Signed 8-bit.
    I8,
    /// Signed 16-bit.
    I16,
    /// Signed 32-bit.
    I32,
    /// Signed 64-bit.
    I64,
    /// Unsigned 8-bit.
    U8,
    /// Unsigned 16-bit.
    U16,
    /// Unsigned 32-bit.
    U32,
    /// Unsigned 64-bit.
    U64,
    /// binary32.
    F32,
    /// binary64.
    F64,
    /// Two binary32 components.
    C64,
    /// Two binary64 components.
    C128,
}

impl DType {
    const ALL: [DType; 13] = [
        DType::Bool,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::F32,
        DType::F64,
        DType::C64,
        DType::C128,
    ];

    /// Wire code.
    pub fn code(self) -> u8 {
        match self {
            DType::Bool => 0x01,
            DType::I8 => 0x02,
            DType::I16 => 0x03,
            DType::I32 => 0x04,
            DType::I64 => 0x05,
            DType::U8 => 0x06,
            DType::U16 => 0x07,
            DType::U32 => 0x08,
            DType::U64 => 0x09,
            DType::F32 => 0x0A,
            DType::F64 => 0x0B,
            DType::C64 => 0x0C,
            DType::C128 => 0x0D,
        }
    }

    /// Parses a wire code.
    pub fn from_code(code: u8) -> Result<Self, ArrayError> {
        Self::ALL
            .into_iter()
            .find(|dtype| dtype.code() == code)
            .ok_or_else(|| ArrayError::InvalidBlob(format!("unknown dtype code 0x{code:02x}")))
    }

    /// Bytes per element.
    pub fn item_size(self) -> usize {
        match self {
            DType::Bool | DType::I8 | DType::U8 => 1,
            DType::I16 | DType::U16 => 2,
            DType::I32 | DType::U32 | DType::F32 => 4,
            DType::I64 | DType::U64 | DType::F64 | DType::C64 => 8,
            DType::C128 => 16,
        }
    }

    /// Lowercase name (`"f64"`, `"c128"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
            DType::U16 => "u16",
            DType::U32 => "u32",
            DType::U64 => "u64",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::C64 => "c64",
            DType::C128 => "c128",
        }
    }
}

/// Byte order of the element buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ByteOrder {
    /// Little-endian (`<`).
    Little,
    /// Big-endian (`>`).
    Big,
}

impl ByteOrder {
    fn code(self) -> u8 {
        match self {
            ByteOrder::Little => b'<',
            ByteOrder::Big => b'>',
        }
    }

    fn from_code(code: u8) -> Result<Self, ArrayError> {
        match code {
            b'<' => Ok(ByteOrder::Little),
            b'>' => Ok(ByteOrder::Big),
            other => Err(ArrayError::InvalidBlob(format!(
                "unknown byte order 0x{other:02x}"
            ))),
        }
    }
}

/// Multidimensional numeric array held as a raw buffer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NdArray {
    dtype: DType,
    order: ByteOrder,
    shape: Vec<u64>,
    data: Vec<u8>,
}

fn element_count(shape: &[u64]) -> Result<usize, ArrayError> {
    shape.iter().try_fold(1usize, |acc, &dim| {
        usize::try_from(dim)
            .ok()
            .and_then(|dim| acc.checked_mul(dim))
            .ok_or_else(|| ArrayError::ShapeOverflow(shape.to_vec()))
    })
}

impl NdArray {
    /// Wraps a raw buffer, checking its length against dtype and shape.
    pub fn from_raw(
        dtype: DType,
        order: ByteOrder,
        shape: Vec<u64>,
        data: Vec<u8>,
    ) -> Result<Self, ArrayError> {
        if shape.len() > usize::from(u8::MAX) {
            return Err(ArrayError::TooManyDimensions(shape.len()));
        }
        let expected = element_count(&shape)?
            .checked_mul(dtype.item_size())
            .ok_or_else(|| ArrayError::ShapeOverflow(shape.clone()))?;
        if data.len() != expected {
            return Err(ArrayError::LengthMismatch {
                dtype: dtype.name(),
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            dtype,
            order,
            shape,
            data,
        })
    }

    /// Little-endian `f64` array.
    pub fn from_f64(shape: Vec<u64>, values: &[f64]) -> Result<Self, ArrayError> {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_raw(DType::F64, ByteOrder::Little, shape, data)
    }

    /// Little-endian `i64` array.
    pub fn from_i64(shape: Vec<u64>, values: &[i64]) -> Result<Self, ArrayError> {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_raw(DType::I64, ByteOrder::Little, shape, data)
    }

    /// Element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Buffer byte order.
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Dimensions.
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Raw element buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len() / self.dtype.item_size()
    }

    /// True when the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn words(&self, requested: DType) -> Result<impl Iterator<Item = [u8; 8]> + '_, ArrayError> {
        if self.dtype != requested {
            return Err(ArrayError::DTypeMismatch {
                requested: requested.name(),
                actual: self.dtype.name(),
            });
        }
        let order = self.order;
        Ok(self.data.chunks_exact(8).map(move |chunk| {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            if order == ByteOrder::Big {
                word.reverse();
            }
            word
        }))
    }

    /// Reads an `f64` array back into native values.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>, ArrayError> {
        Ok(self.words(DType::F64)?.map(f64::from_le_bytes).collect())
    }

    /// Reads an `i64` array back into native values.
    pub fn to_i64_vec(&self) -> Result<Vec<i64>, ArrayError> {
        Ok(self.words(DType::I64)?.map(i64::from_le_bytes).collect())
    }

    /// Serializes the array into its blob form.
    pub fn to_blob(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(6 + 8 * self.shape.len() + self.data.len());
        blob.extend_from_slice(ARRAY_MAGIC);
        blob.push(self.dtype.code());
        blob.push(self.order.code());
        // from_raw caps the dimension count at u8::MAX
        blob.push(self.shape.len() as u8);
        for dim in &self.shape {
            blob.extend_from_slice(&dim.to_be_bytes());
        }
        blob.extend_from_slice(&self.data);
        blob
    }

    /// Parses a blob produced by [`NdArray::to_blob`].
    pub fn from_blob(blob: &[u8]) -> Result<Self, ArrayError> {
        if blob.len() < 6 {
            return Err(ArrayError::InvalidBlob(format!(
                "header too short: {} bytes",
                blob.len()
            )));
        }
        if &blob[0..3] != ARRAY_MAGIC {
            return Err(ArrayError::InvalidBlob("bad magic".to_string()));
        }
        let dtype = DType::from_code(blob[3])?;
        let order = ByteOrder::from_code(blob[4])?;
        let ndim = usize::from(blob[5]);
        let dims_end = 6 + 8 * ndim;
        if blob.len() < dims_end {
            return Err(ArrayError::InvalidBlob(format!(
                "shape truncated: {ndim} dimensions declared"
            )));
        }
        let shape = blob[6..dims_end]
            .chunks_exact(8)
            .map(|chunk| {
                let mut dim = [0u8; 8];
                dim.copy_from_slice(chunk);
                u64::from_be_bytes(dim)
            })
            .collect();
        Self::from_raw(dtype, order, shape, blob[dims_end..].to_vec())
    }
}

impl fmt::Display for NdArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "array<{}, {:?}>", self.dtype.name(), self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_round_trip() {
        let array = NdArray::from_f64(vec![2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.5]).unwrap();
        let restored = NdArray::from_blob(&array.to_blob()).unwrap();
        assert_eq!(array, restored);
        assert_eq!(restored.to_f64_vec().unwrap()[5], 6.5);
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = NdArray::from_f64(vec![2, 2], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            ArrayError::LengthMismatch {
                expected: 32,
                actual: 24,
                ..
            }
        ));
    }

    #[test]
    fn rejects_bad_magic_and_codes() {
        let mut blob = NdArray::from_i64(vec![1], &[7]).unwrap().to_blob();
        blob[0] = b'X';
        assert!(NdArray::from_blob(&blob).is_err());

        let mut blob = NdArray::from_i64(vec![1], &[7]).unwrap().to_blob();
        blob[3] = 0xEE;
        assert!(NdArray::from_blob(&blob).is_err());
    }

    #[test]
    fn big_endian_buffers_are_read_in_their_own_order() {
        let data = 258i64.to_be_bytes().to_vec();
        let array = NdArray::from_raw(DType::I64, ByteOrder::Big, vec![1], data).unwrap();
        assert_eq!(array.to_i64_vec().unwrap(), vec![258]);
    }

    #[test]
    fn typed_accessor_checks_dtype() {
        let array = NdArray::from_i64(vec![2], &[1, 2]).unwrap();
        assert!(matches!(
            array.to_f64_vec(),
            Err(ArrayError::DTypeMismatch { .. })
        ));
    }

    #[test]
    fn zero_dimensional_array_holds_one_element() {
        let array = NdArray::from_f64(vec![], &[2.5]).unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(NdArray::from_blob(&array.to_blob()).unwrap(), array);
    }
}
