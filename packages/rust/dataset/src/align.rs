//! Mask alignment: flattened fields → aligned [`Interactions`].

use tracing::{debug, instrument};

use edumeta_shared::{EduMetaError, Interactions, Result};

use crate::field::{RawField, Scalar};

/// A field after flattening.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatField {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl FlatField {
    pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    fn from_raw(field: &RawField) -> Result<Self> {
        Ok(Self::new(&field.name, field.flatten()?))
    }
}

/// The raw fields of one dataset, as loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInteractionBatch {
    pub question_id: RawField,
    pub knowledge: RawField,
    pub correctness: Option<RawField>,
    pub mask: Option<RawField>,
}

/// Flattened fields, not yet checked for alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatBatch {
    pub question_id: FlatField,
    pub knowledge: FlatField,
    pub correctness: Option<FlatField>,
    pub mask: Option<FlatField>,
}

impl RawInteractionBatch {
    /// Flatten every present field.
    pub fn flatten(&self) -> Result<FlatBatch> {
        Ok(FlatBatch {
            question_id: FlatField::from_raw(&self.question_id)?,
            knowledge: FlatField::from_raw(&self.knowledge)?,
            correctness: self.correctness.as_ref().map(FlatField::from_raw).transpose()?,
            mask: self.mask.as_ref().map(FlatField::from_raw).transpose()?,
        })
    }
}

/// Check lengths, apply the mask and convert to typed columns.
///
/// All supplied fields must share one length. Positions whose mask value
/// is zero are dropped; the remaining order is preserved.
#[instrument(skip_all, fields(len = batch.question_id.values.len(), masked = batch.mask.is_some()))]
pub fn align(batch: &FlatBatch) -> Result<Interactions> {
    let fields: Vec<&FlatField> = [Some(&batch.question_id), Some(&batch.knowledge)]
        .into_iter()
        .chain([batch.correctness.as_ref(), batch.mask.as_ref()])
        .flatten()
        .collect();

    let expected = batch.question_id.values.len();
    if fields.iter().any(|f| f.values.len() != expected) {
        return Err(EduMetaError::Alignment {
            lengths: fields
                .iter()
                .map(|f| (f.name.clone(), f.values.len()))
                .collect(),
        });
    }

    let selected: Vec<usize> = match &batch.mask {
        Some(mask) => mask
            .values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_truthy())
            .map(|(i, _)| i)
            .collect(),
        None => (0..expected).collect(),
    };

    let question_ids = select_ids(&batch.question_id, &selected)?;
    let knowledge_ids = select_ids(&batch.knowledge, &selected)?;
    let correctness = batch
        .correctness
        .as_ref()
        .map(|field| select_labels(field, &selected))
        .transpose()?;

    debug!(
        total = expected,
        valid = selected.len(),
        labelled = correctness.is_some(),
        "aligned interaction fields"
    );

    Ok(Interactions {
        question_ids,
        knowledge_ids,
        correctness,
    })
}

fn select_ids(field: &FlatField, selected: &[usize]) -> Result<Vec<i64>> {
    selected
        .iter()
        .map(|&i| {
            let value = field.values[i];
            value.to_id().ok_or_else(|| {
                EduMetaError::shape(
                    &field.name,
                    format!("element {i} ({}) is not an integer id", value.to_f64()),
                )
            })
        })
        .collect()
}

fn select_labels(field: &FlatField, selected: &[usize]) -> Result<Vec<f64>> {
    selected
        .iter()
        .map(|&i| {
            let value = field.values[i].to_f64();
            if value.is_finite() {
                Ok(value)
            } else {
                Err(EduMetaError::validation(format!(
                    "field '{}' element {i} is not a finite correctness value ({value})",
                    field.name
                )))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(name: &str, values: &[i64]) -> FlatField {
        FlatField::new(name, values.iter().copied().map(Scalar::Int).collect())
    }

    fn batch(q: &[i64], k: &[i64], y: Option<&[i64]>, mask: Option<&[i64]>) -> FlatBatch {
        FlatBatch {
            question_id: ints("question_id", q),
            knowledge: ints("skill", k),
            correctness: y.map(|y| ints("y", y)),
            mask: mask.map(|m| ints("mask", m)),
        }
    }

    #[test]
    fn mask_selects_truthy_positions_in_order() {
        let b = batch(&[1, 2, 3, 4], &[5, 6, 7, 8], Some(&[1, 0, 1, 1][..]), Some(&[1, 0, 2, 1][..]));
        let out = align(&b).unwrap();
        assert_eq!(out.question_ids, vec![1, 3, 4]);
        assert_eq!(out.knowledge_ids, vec![5, 7, 8]);
        assert_eq!(out.correctness, Some(vec![1.0, 1.0, 1.0]));
    }

    #[test]
    fn filtered_length_equals_truthy_count() {
        let mask = [0, 1, 1, 0, 1, 0];
        let b = batch(&[1; 6], &[2; 6], None, Some(&mask[..]));
        let out = align(&b).unwrap();
        assert_eq!(out.len(), mask.iter().filter(|&&m| m != 0).count());
    }

    #[test]
    fn no_mask_passes_everything_through() {
        let b = batch(&[3, 1, 2], &[9, 9, 8], None, None);
        let out = align(&b).unwrap();
        assert_eq!(out.question_ids, vec![3, 1, 2]);
        assert_eq!(out.knowledge_ids, vec![9, 9, 8]);
        assert!(out.correctness.is_none());
    }

    #[test]
    fn mismatched_mask_length_is_alignment_error() {
        let b = batch(&[1, 2, 3], &[1, 2, 3], None, Some(&[1, 1][..]));
        let err = align(&b).unwrap_err();
        match &err {
            EduMetaError::Alignment { lengths } => {
                assert_eq!(
                    lengths,
                    &vec![
                        ("question_id".to_string(), 3),
                        ("skill".to_string(), 3),
                        ("mask".to_string(), 2),
                    ]
                );
            }
            other => panic!("expected alignment error, got {other:?}"),
        }
        assert!(err.to_string().contains("mask=2"));
    }

    #[test]
    fn mismatched_required_fields_fail_without_mask() {
        let b = batch(&[1, 2, 3], &[1, 2], Some(&[1, 0, 1][..]), None);
        assert!(matches!(align(&b), Err(EduMetaError::Alignment { .. })));
    }

    #[test]
    fn float_ids_must_be_integral() {
        let mut b = batch(&[1, 2], &[1, 2], None, None);
        b.question_id = FlatField::new("question_id", vec![Scalar::Float(1.0), Scalar::Float(2.5)]);
        let err = align(&b).unwrap_err();
        assert!(err.to_string().contains("element 1 (2.5) is not an integer id"));
    }

    #[test]
    fn masked_out_garbage_is_ignored() {
        let mut b = batch(&[1, 2], &[1, 2], None, Some(&[1, 0][..]));
        b.question_id = FlatField::new("question_id", vec![Scalar::Int(1), Scalar::Float(f64::NAN)]);
        let out = align(&b).unwrap();
        assert_eq!(out.question_ids, vec![1]);
    }

    #[test]
    fn non_finite_correctness_is_rejected() {
        let mut b = batch(&[1], &[1], Some(&[0][..]), None);
        b.correctness = Some(FlatField::new("y", vec![Scalar::Float(f64::INFINITY)]));
        assert!(matches!(align(&b), Err(EduMetaError::Validation { .. })));
    }
}
