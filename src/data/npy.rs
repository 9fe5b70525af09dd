//! Reader and writer for NumPy `.npy` arrays of floating-point values.
//!
//! # Layout
//! ```text
//! bytes 0-5:   0x93 'N' 'U' 'M' 'P' 'Y'
//! byte  6:     major version (1, 2 or 3)
//! byte  7:     minor version
//! v1:          bytes 8-9   header length (little-endian u16)
//! v2/v3:       bytes 8-11  header length (little-endian u32)
//! header:      Python dict literal, e.g.
//!              {'descr': '<f8', 'fortran_order': False, 'shape': (4, 65, 65), }
//!              space padded and '\n' terminated so data starts 64-byte aligned
//! data:        prod(shape) values, C order
//! ```
//!
//! Supported dtypes: `f8` and `f4`, either byte order. Fortran-ordered
//! arrays are rejected.
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{HeatNnError, Result};

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// A dense array read from or written to a `.npy` file.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyArray {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Dtype {
    F8 { little: bool },
    F4 { little: bool },
}

impl Dtype {
    fn parse(descr: &str) -> Result<Dtype> {
        let (order, kind) = descr.split_at(1.min(descr.len()));
        let little = match order {
            "<" | "|" | "=" => true,
            ">" => false,
            _ => return Err(HeatNnError::Npy(format!("unsupported dtype '{descr}'"))),
        };
        match kind {
            "f8" => Ok(Dtype::F8 { little }),
            "f4" => Ok(Dtype::F4 { little }),
            _ => Err(HeatNnError::Npy(format!(
                "unsupported dtype '{descr}' (only f4 and f8 are read)"
            ))),
        }
    }

    fn size(&self) -> usize {
        match self {
            Dtype::F8 { .. } => 8,
            Dtype::F4 { .. } => 4,
        }
    }

    fn decode(&self, chunk: &[u8]) -> f64 {
        match *self {
            Dtype::F8 { little } => {
                let mut b = [0u8; 8];
                b.copy_from_slice(chunk);
                if little { f64::from_le_bytes(b) } else { f64::from_be_bytes(b) }
            }
            Dtype::F4 { little } => {
                let mut b = [0u8; 4];
                b.copy_from_slice(chunk);
                (if little { f32::from_le_bytes(b) } else { f32::from_be_bytes(b) }) as f64
            }
        }
    }
}

/// Extracts the quoted or literal value following `'key':` in the header dict.
fn header_value<'a>(header: &'a str, key: &str) -> Result<&'a str> {
    let pattern = format!("'{key}':");
    let start = header
        .find(&pattern)
        .map(|p| p + pattern.len())
        .ok_or_else(|| HeatNnError::Npy(format!("header has no '{key}' entry")))?;
    Ok(header[start..].trim_start())
}

fn parse_header(header: &str) -> Result<(Dtype, Vec<usize>)> {
    let descr_rest = header_value(header, "descr")?;
    let descr = descr_rest
        .strip_prefix('\'')
        .and_then(|s| s.split('\'').next())
        .ok_or_else(|| HeatNnError::Npy("malformed 'descr' entry".into()))?;
    let dtype = Dtype::parse(descr)?;

    let fortran = header_value(header, "fortran_order")?;
    if fortran.starts_with("True") {
        return Err(HeatNnError::Npy("Fortran-ordered arrays are not supported".into()));
    }

    let shape_rest = header_value(header, "shape")?;
    let inner = shape_rest
        .strip_prefix('(')
        .and_then(|s| s.split(')').next())
        .ok_or_else(|| HeatNnError::Npy("malformed 'shape' entry".into()))?;
    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| HeatNnError::Npy(format!("invalid dimension '{s}' in shape")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((dtype, shape))
}

/// Parses `.npy` bytes into an [`NpyArray`].
pub fn parse_npy(bytes: &[u8]) -> Result<NpyArray> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(HeatNnError::Npy("missing \\x93NUMPY magic string".into()));
    }

    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(HeatNnError::Npy("truncated v2 header".into()));
            }
            (u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize, 12)
        }
        v => return Err(HeatNnError::Npy(format!("unsupported format version {v}"))),
    };

    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err(HeatNnError::Npy(format!(
            "header declares {header_len} bytes but file is only {} bytes",
            bytes.len()
        )));
    }
    let header = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| HeatNnError::Npy("header is not valid UTF-8".into()))?;
    let (dtype, shape) = parse_header(header)?;

    let needed = shape
        .iter()
        .try_fold(dtype.size(), |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| HeatNnError::Npy("array size overflows usize".into()))?;
    let payload = &bytes[data_start..];
    if payload.len() < needed {
        return Err(HeatNnError::Npy(format!(
            "shape {shape:?} needs {needed} data bytes, found {}",
            payload.len()
        )));
    }

    let data = payload[..needed].chunks_exact(dtype.size()).map(|c| dtype.decode(c)).collect();
    Ok(NpyArray { shape, data })
}

pub fn read_npy<P: AsRef<Path>>(path: P) -> Result<NpyArray> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| HeatNnError::io(format!("reading {}", path.display()), e))?;
    parse_npy(&bytes).map_err(|e| HeatNnError::Npy(format!("{}: {e}", path.display())))
}

/// Writes `data` with the given shape as a little-endian `f8` v1.0 file.
pub fn write_npy<P: AsRef<Path>>(path: P, shape: &[usize], data: &[f64]) -> Result<()> {
    let path = path.as_ref();
    let count: usize = shape.iter().product();
    if count != data.len() {
        return Err(HeatNnError::Npy(format!(
            "shape {shape:?} holds {count} values but {} were given",
            data.len()
        )));
    }

    let dims = match shape {
        [single] => format!("{single},"),
        _ => shape.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", "),
    };
    let mut header = format!("{{'descr': '<f8', 'fortran_order': False, 'shape': ({dims}), }}");
    // Pad so that magic + version + length + header is a multiple of 64.
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    header.push('\n');

    let mut bytes = Vec::with_capacity(10 + header.len() + 8 * data.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    for v in data {
        bytes.extend_from_slice(&v.to_le_bytes());
    }

    let mut file = fs::File::create(path)
        .map_err(|e| HeatNnError::io(format!("creating {}", path.display()), e))?;
    file.write_all(&bytes)
        .map_err(|e| HeatNnError::io(format!("writing {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v1_file(header: &str, payload: &[u8]) -> Vec<u8> {
        let mut b = MAGIC.to_vec();
        b.extend_from_slice(&[1, 0]);
        b.extend_from_slice(&(header.len() as u16).to_le_bytes());
        b.extend_from_slice(header.as_bytes());
        b.extend_from_slice(payload);
        b
    }

    #[test]
    fn parses_little_endian_f4() {
        let payload: Vec<u8> = [1.5f32, -2.0, 0.25].iter().flat_map(|v| v.to_le_bytes()).collect();
        let bytes = v1_file("{'descr': '<f4', 'fortran_order': False, 'shape': (3,), }\n", &payload);
        let arr = parse_npy(&bytes).unwrap();
        assert_eq!(arr.shape, vec![3]);
        assert_eq!(arr.data, vec![1.5, -2.0, 0.25]);
    }

    #[test]
    fn parses_big_endian_f8() {
        let payload: Vec<u8> = [3.0f64, 4.0].iter().flat_map(|v| v.to_be_bytes()).collect();
        let bytes = v1_file("{'descr': '>f8', 'fortran_order': False, 'shape': (1, 2), }\n", &payload);
        let arr = parse_npy(&bytes).unwrap();
        assert_eq!(arr.shape, vec![1, 2]);
        assert_eq!(arr.data, vec![3.0, 4.0]);
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(parse_npy(b"not an npy file").is_err());
        let fortran = v1_file("{'descr': '<f8', 'fortran_order': True, 'shape': (1,), }\n", &[0; 8]);
        assert!(parse_npy(&fortran).is_err());
        let ints = v1_file("{'descr': '<i8', 'fortran_order': False, 'shape': (1,), }\n", &[0; 8]);
        assert!(parse_npy(&ints).is_err());
        let short = v1_file("{'descr': '<f8', 'fortran_order': False, 'shape': (2,), }\n", &[0; 8]);
        assert!(parse_npy(&short).is_err());
    }

    #[test]
    fn rejects_shapes_that_overflow() {
        let huge = v1_file(
            "{'descr': '<f8', 'fortran_order': False, 'shape': (4294967296, 4294967296, 2), }\n",
            &[0; 8],
        );
        let err = parse_npy(&huge).unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn written_files_are_aligned_and_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field.npy");
        let data: Vec<f64> = (0..6).map(|v| v as f64 * 0.5).collect();
        write_npy(&path, &[2, 3], &data).unwrap();

        let bytes = fs::read(&path).unwrap();
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);

        let arr = read_npy(&path).unwrap();
        assert_eq!(arr.shape, vec![2, 3]);
        assert_eq!(arr.data, data);
    }

    #[test]
    fn write_checks_shape() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_npy(dir.path().join("x.npy"), &[2, 2], &[1.0]).is_err());
    }
}
