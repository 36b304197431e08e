//! Dataset sources: `.npz` archives and JSON documents.
//!
//! Each source exposes its named fields; the format is picked from the
//! file extension by [`open_source`].

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use serde_json::Value;
use tracing::{debug, instrument};
use zip::ZipArchive;
use zip::result::ZipError;

use edumeta_shared::{EduMetaError, Result};

use crate::field::{RawField, Scalar};
use crate::npy::parse_npy;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A container of named interaction fields.
pub trait DatasetSource {
    /// Names of all fields present, sorted.
    fn field_names(&self) -> Vec<String>;

    /// Load one field. Returns `Ok(None)` when the field is absent.
    fn read_field(&mut self, name: &str) -> Result<Option<RawField>>;

    /// Human-readable format name for tracing.
    fn format(&self) -> &str;
}

/// Open a dataset file, choosing the decoder from its extension.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn open_source(path: &Path) -> Result<Box<dyn DatasetSource>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let source: Box<dyn DatasetSource> = match extension.as_deref() {
        Some("npz") => Box::new(NpzSource::open(path)?),
        Some("json") => Box::new(JsonSource::open(path)?),
        _ => {
            return Err(EduMetaError::parse(format!(
                "unsupported dataset format '{}': expected a .npz or .json file",
                path.display()
            )));
        }
    };

    debug!(format = source.format(), fields = ?source.field_names(), "opened dataset");
    Ok(source)
}

// ---------------------------------------------------------------------------
// NPZ
// ---------------------------------------------------------------------------

/// NumPy `.npz` archive; each field is a `<name>.npy` member.
pub struct NpzSource<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl NpzSource<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| EduMetaError::io(path, e))?;
        Self::from_reader(file).map_err(|e| match e {
            EduMetaError::Parse { message } => {
                EduMetaError::parse(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }
}

impl<R: Read + Seek> NpzSource<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| EduMetaError::parse(format!("not a valid npz archive: {e}")))?;
        Ok(Self { archive })
    }
}

impl<R: Read + Seek> DatasetSource for NpzSource<R> {
    fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .archive
            .file_names()
            .filter_map(|n| n.strip_suffix(".npy"))
            .map(String::from)
            .collect();
        names.sort();
        names
    }

    fn read_field(&mut self, name: &str) -> Result<Option<RawField>> {
        let member = format!("{name}.npy");
        let mut file = match self.archive.by_name(&member) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => {
                return Err(EduMetaError::parse(format!("cannot read member '{member}': {e}")));
            }
        };

        let mut bytes = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut bytes)
            .map_err(|e| EduMetaError::parse(format!("cannot read member '{member}': {e}")))?;

        parse_npy(name, &bytes).map(Some)
    }

    fn format(&self) -> &str {
        "npz"
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// JSON object mapping field names to arrays.
///
/// An array of scalars is a dense 1-D field; any other array is ragged,
/// one element per trajectory.
#[derive(Debug, Clone)]
pub struct JsonSource {
    fields: serde_json::Map<String, Value>,
}

impl JsonSource {
    pub fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EduMetaError::io(path, e))?;
        Self::from_json_str(&content)
            .map_err(|e| EduMetaError::parse(format!("{}: {e}", path.display())))
    }

    pub fn from_json_str(content: &str) -> std::result::Result<Self, String> {
        match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(fields)) => Ok(Self { fields }),
            Ok(_) => Err("dataset document must be a JSON object of named fields".into()),
            Err(e) => Err(format!("invalid JSON: {e}")),
        }
    }
}

impl DatasetSource for JsonSource {
    fn field_names(&self) -> Vec<String> {
        // serde_json's default map is ordered by key.
        self.fields.keys().cloned().collect()
    }

    fn read_field(&mut self, name: &str) -> Result<Option<RawField>> {
        let Some(value) = self.fields.get(name) else {
            return Ok(None);
        };

        let Value::Array(elements) = value else {
            return Err(EduMetaError::shape(name, "expected an array of timesteps or trajectories"));
        };

        if elements.iter().any(Value::is_array) {
            return Ok(Some(RawField::ragged(name, elements.clone())));
        }

        let values = elements
            .iter()
            .enumerate()
            .map(|(i, v)| {
                Scalar::from_json(v).ok_or_else(|| {
                    EduMetaError::shape(name, format!("element {i} is not numeric ({v})"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(RawField::dense(name, vec![values.len()], values)))
    }

    fn format(&self) -> &str {
        "json"
    }
}
