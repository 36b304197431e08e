//! Decoder for single `.npy` array members.
//!
//! Handles format versions 1–3, boolean/integer/float dtypes in either
//! byte order, and C or Fortran layout. Object arrays are rejected: their
//! payload is a Python pickle.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use edumeta_shared::{EduMetaError, Result};

use crate::field::{RawField, Scalar};

const MAGIC: &[u8] = b"\x93NUMPY";

/// Parsed `.npy` header dictionary.
#[derive(Debug, Clone, PartialEq)]
struct Header {
    descr: String,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// Element type decoded from a dtype descriptor such as `<i8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dtype {
    kind: char,
    size: usize,
    big_endian: bool,
}

/// Decode a `.npy` byte buffer into a dense field.
pub(crate) fn parse_npy(name: &str, bytes: &[u8]) -> Result<RawField> {
    let (header, data) = split_header(name, bytes)?;
    let dtype = parse_dtype(name, &header.descr)?;

    let overflow = || EduMetaError::parse(format!("{name}.npy: shape {:?} overflows", header.shape));
    let count = header
        .shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(overflow)?;
    let needed = count.checked_mul(dtype.size).ok_or_else(overflow)?;
    if data.len() < needed {
        return Err(EduMetaError::parse(format!(
            "{name}.npy: truncated data ({} bytes, expected {needed})",
            data.len()
        )));
    }

    let mut values = Vec::with_capacity(count);
    for chunk in data[..needed].chunks_exact(dtype.size) {
        values.push(decode(dtype, chunk).ok_or_else(|| {
            EduMetaError::parse(format!("{name}.npy: unsupported dtype '{}'", header.descr))
        })?);
    }

    if header.fortran_order {
        values = fortran_to_c(&header.shape, values);
    }

    debug!(field = name, dtype = %header.descr, shape = ?header.shape, "decoded npy member");
    Ok(RawField::dense(name, header.shape, values))
}

fn split_header<'a>(name: &str, bytes: &'a [u8]) -> Result<(Header, &'a [u8])> {
    if bytes.len() < 10 || !bytes.starts_with(MAGIC) {
        return Err(EduMetaError::parse(format!("{name}.npy: not a NumPy array file")));
    }

    let major = bytes[6];
    let (header_len, start) = match major {
        1 => (usize::from(u16::from_le_bytes([bytes[8], bytes[9]])), 10),
        2 | 3 if bytes.len() >= 12 => (
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
            12,
        ),
        _ => {
            return Err(EduMetaError::parse(format!(
                "{name}.npy: unsupported format version {major}"
            )));
        }
    };

    let end = start + header_len;
    let raw = bytes
        .get(start..end)
        .ok_or_else(|| EduMetaError::parse(format!("{name}.npy: truncated header")))?;
    let text = String::from_utf8_lossy(raw);
    let header = parse_header(name, &text)?;

    Ok((header, &bytes[end..]))
}

fn parse_header(name: &str, text: &str) -> Result<Header> {
    static DESCR_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"'descr'\s*:\s*'([^']*)'").expect("valid regex")
    });
    static FORTRAN_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"'fortran_order'\s*:\s*(True|False)").expect("valid regex")
    });
    static SHAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"'shape'\s*:\s*\(([^)]*)\)").expect("valid regex")
    });

    let missing = |key: &str| EduMetaError::parse(format!("{name}.npy: header has no usable '{key}'"));

    let descr = DESCR_RE
        .captures(text)
        .map(|c| c[1].to_string())
        .ok_or_else(|| missing("descr"))?;
    let fortran_order = FORTRAN_RE
        .captures(text)
        .map(|c| &c[1] == "True")
        .ok_or_else(|| missing("fortran_order"))?;
    let shape_text = SHAPE_RE
        .captures(text)
        .map(|c| c[1].to_string())
        .ok_or_else(|| missing("shape"))?;

    let shape = shape_text
        .split(',')
        .map(str::trim)
        .filter(|dim| !dim.is_empty())
        .map(|dim| {
            // Older writers emit `3L` for Python 2 longs.
            dim.trim_end_matches('L').parse::<usize>().map_err(|_| {
                EduMetaError::parse(format!("{name}.npy: invalid shape dimension '{dim}'"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Header {
        descr,
        fortran_order,
        shape,
    })
}

fn parse_dtype(name: &str, descr: &str) -> Result<Dtype> {
    let mut chars = descr.chars();
    let order = chars.next().unwrap_or('|');
    let (order, rest) = if matches!(order, '<' | '>' | '|' | '=') {
        (order, chars.as_str())
    } else {
        ('|', descr)
    };

    let mut rest_chars = rest.chars();
    let kind = rest_chars.next().unwrap_or('?');

    if kind == 'O' {
        return Err(EduMetaError::shape(
            name,
            "object arrays (pickled ragged sequences) cannot be decoded; \
             re-export the dataset as JSON with one array per trajectory",
        ));
    }

    let size = rest_chars
        .as_str()
        .parse::<usize>()
        .map_err(|_| EduMetaError::parse(format!("{name}.npy: unsupported dtype '{descr}'")))?;

    if !matches!((kind, size), ('b', 1) | ('i' | 'u', 1 | 2 | 4 | 8) | ('f', 4 | 8)) {
        return Err(EduMetaError::parse(format!(
            "{name}.npy: unsupported dtype '{descr}'"
        )));
    }

    let big_endian = match order {
        '>' => true,
        '=' => cfg!(target_endian = "big"),
        _ => false,
    };

    Ok(Dtype {
        kind,
        size,
        big_endian,
    })
}

macro_rules! read_as {
    ($ty:ty, $chunk:expr, $big:expr) => {{
        let bytes: [u8; std::mem::size_of::<$ty>()] = $chunk.try_into().ok()?;
        if $big {
            <$ty>::from_be_bytes(bytes)
        } else {
            <$ty>::from_le_bytes(bytes)
        }
    }};
}

fn decode(dtype: Dtype, chunk: &[u8]) -> Option<Scalar> {
    let big = dtype.big_endian;
    let scalar = match (dtype.kind, dtype.size) {
        ('b', 1) => Scalar::Int(i64::from(chunk[0] != 0)),
        ('i', 1) => Scalar::Int(i64::from(read_as!(i8, chunk, big))),
        ('i', 2) => Scalar::Int(i64::from(read_as!(i16, chunk, big))),
        ('i', 4) => Scalar::Int(i64::from(read_as!(i32, chunk, big))),
        ('i', 8) => Scalar::Int(read_as!(i64, chunk, big)),
        ('u', 1) => Scalar::Int(i64::from(chunk[0])),
        ('u', 2) => Scalar::Int(i64::from(read_as!(u16, chunk, big))),
        ('u', 4) => Scalar::Int(i64::from(read_as!(u32, chunk, big))),
        ('u', 8) => {
            let v = read_as!(u64, chunk, big);
            i64::try_from(v).map_or(Scalar::Float(v as f64), Scalar::Int)
        }
        ('f', 4) => Scalar::Float(f64::from(read_as!(f32, chunk, big))),
        ('f', 8) => Scalar::Float(read_as!(f64, chunk, big)),
        _ => return None,
    };
    Some(scalar)
}

/// Re-lay column-major values out in row-major order.
fn fortran_to_c(shape: &[usize], values: Vec<Scalar>) -> Vec<Scalar> {
    if shape.len() < 2 || values.is_empty() {
        return values;
    }

    let mut strides = vec![1usize; shape.len()];
    for axis in 1..shape.len() {
        strides[axis] = strides[axis - 1] * shape[axis - 1];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut index = vec![0usize; shape.len()];
    for _ in 0..values.len() {
        let offset: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
        out.push(values[offset]);

        for axis in (0..shape.len()).rev() {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::field::FieldLayout;

    /// Build a version 1.0 `.npy` buffer.
    pub(crate) fn npy_bytes(descr: &str, fortran: bool, shape: &[usize], data: &[u8]) -> Vec<u8> {
        let dims: Vec<String> = shape.iter().map(usize::to_string).collect();
        let shape_text = match dims.len() {
            1 => format!("({},)", dims[0]),
            _ => format!("({})", dims.join(", ")),
        };
        let fortran = if fortran { "True" } else { "False" };
        let mut header =
            format!("{{'descr': '{descr}', 'fortran_order': {fortran}, 'shape': {shape_text}, }}");
        while (MAGIC.len() + 4 + header.len() + 1) % 64 != 0 {
            header.push(' ');
        }
        header.push('\n');

        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(data);
        out
    }

    pub(crate) fn i64_data(values: &[i64]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn values(field: &RawField) -> Vec<Scalar> {
        match &field.layout {
            FieldLayout::Dense { values, .. } => values.clone(),
            FieldLayout::Ragged(_) => panic!("expected dense field"),
        }
    }

    #[test]
    fn parses_c_order_int64() {
        let bytes = npy_bytes("<i8", false, &[2, 3], &i64_data(&[1, 2, 3, 4, 5, 6]));
        let field = parse_npy("question_id", &bytes).unwrap();
        assert_eq!(field.name, "question_id");
        assert_eq!(
            field.layout,
            FieldLayout::Dense {
                shape: vec![2, 3],
                values: (1..=6).map(Scalar::Int).collect(),
            }
        );
    }

    #[test]
    fn fortran_order_is_relaid_row_major() {
        // Logical [[1, 2, 3], [4, 5, 6]] stored column by column.
        let bytes = npy_bytes("<i8", true, &[2, 3], &i64_data(&[1, 4, 2, 5, 3, 6]));
        let field = parse_npy("skill", &bytes).unwrap();
        assert_eq!(values(&field), (1..=6).map(Scalar::Int).collect::<Vec<_>>());
    }

    #[test]
    fn parses_bool_and_float_dtypes() {
        let mask = parse_npy("mask", &npy_bytes("|b1", false, &[3], &[1, 0, 1])).unwrap();
        assert_eq!(values(&mask), vec![Scalar::Int(1), Scalar::Int(0), Scalar::Int(1)]);

        let data: Vec<u8> = [0.5f32, 1.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        let y = parse_npy("y", &npy_bytes("<f4", false, &[2], &data)).unwrap();
        assert_eq!(values(&y), vec![Scalar::Float(0.5), Scalar::Float(1.0)]);
    }

    #[test]
    fn parses_big_endian_int32() {
        let data: Vec<u8> = [7i32, -2].iter().flat_map(|v| v.to_be_bytes()).collect();
        let field = parse_npy("skill", &npy_bytes(">i4", false, &[2], &data)).unwrap();
        assert_eq!(values(&field), vec![Scalar::Int(7), Scalar::Int(-2)]);
    }

    #[test]
    fn object_dtype_is_shape_error() {
        let bytes = npy_bytes("|O", false, &[2], &[0x80, 0x02]);
        let err = parse_npy("question_id", &bytes).unwrap_err();
        assert!(matches!(err, EduMetaError::Shape { .. }));
        assert!(err.to_string().contains("object arrays"));
    }

    #[test]
    fn truncated_data_is_parse_error() {
        let bytes = npy_bytes("<i8", false, &[4], &i64_data(&[1, 2]));
        let err = parse_npy("skill", &bytes).unwrap_err();
        assert!(err.to_string().contains("truncated data"));
    }

    #[test]
    fn oversized_shape_is_parse_error() {
        let bytes = npy_bytes("<i8", false, &[1 << 33, 1 << 33], &[]);
        let err = parse_npy("question_id", &bytes).unwrap_err();
        assert!(matches!(err, EduMetaError::Parse { .. }));
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn rejects_non_npy_bytes() {
        let err = parse_npy("skill", b"PK\x03\x04garbage").unwrap_err();
        assert!(err.to_string().contains("not a NumPy array file"));
    }

    #[test]
    fn fortran_to_c_three_dims() {
        // shape (2, 2, 2), logical value = 4*i + 2*j + k.
        let shape = [2, 2, 2];
        let mut fortran = vec![Scalar::Int(0); 8];
        for i in 0..2 {
            for j in 0..2 {
                for k in 0..2 {
                    fortran[i + 2 * j + 4 * k] = Scalar::Int((4 * i + 2 * j + k) as i64);
                }
            }
        }
        assert_eq!(
            fortran_to_c(&shape, fortran),
            (0..8).map(Scalar::Int).collect::<Vec<_>>()
        );
    }
}
