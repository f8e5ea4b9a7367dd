//! QA mask engine.
//!
//! Turns a Landsat-8 QA band into a binary keep/exclude mask. The caller
//! names the criteria to EXCLUDE: a pixel whose QA code matches ANY selected
//! criterion gets mask value 0, every other pixel gets 1. So to drop cloudy
//! pixels, select `CLOUD_YES`.
//!
//! The engine is a pure transform over a 2D `u16` grid. Reading the band out
//! of a georeferenced file and writing the mask back is the caller's job;
//! the 6-element geotransform is carried through untouched so the writer can
//! reattach it.
//!
//! Per-pixel results are memoized by QA code: a scene has millions of pixels
//! but only 65536 possible codes, so each distinct code is evaluated once
//! and every repeat is a table load.

use std::sync::atomic::{AtomicU8, Ordering};

use ndarray::{Array2, ArrayView2, Zip};
use thiserror::Error;
use tracing::debug;

use crate::criteria::{self, Criterion};

/// Errors from mask computation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaskError {
    #[error("unknown QA criterion: {0}")]
    UnknownCriterion(String),
}

/// Affine geotransform coefficients, as returned by GDAL's GetGeoTransform().
/// Opaque to the engine; passed through for the output writer.
pub type GeoTransform = [f64; 6];

/// A computed mask plus the geotransform to attach to the output file.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedBand {
    /// Same dimensions as the input band; 1 = keep, 0 = exclude.
    pub mask: Array2<i16>,
    pub geo_transform: GeoTransform,
}

/// A criterion compiled to integer ops: slice `[bit_start, bit_end)` of the
/// MSB-first 16-bit code equals the pattern iff
/// `(code >> shift) & mask == value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BitTest {
    shift: u32,
    mask: u16,
    value: u16,
}

impl BitTest {
    fn compile(criterion: &Criterion) -> Self {
        let width = criterion.bit_end - criterion.bit_start;
        let value = criterion
            .pattern
            .bytes()
            .fold(0u16, |v, b| (v << 1) | u16::from(b == b'1'));
        BitTest {
            shift: (16 - criterion.bit_end) as u32,
            mask: (1u16 << width) - 1,
            value,
        }
    }

    #[inline]
    fn matches(&self, code: u16) -> bool {
        (code >> self.shift) & self.mask == self.value
    }
}

/// A resolved set of exclusion criteria.
///
/// Resolution happens once, up front: every name is looked up before any
/// pixel is touched, so an unknown name aborts the whole operation with no
/// partial output. Selection has set semantics; duplicates and ordering do
/// not change the result.
#[derive(Debug, Clone)]
pub struct CriteriaSet {
    tests: Vec<BitTest>,
}

impl CriteriaSet {
    /// Look up and compile every named criterion.
    ///
    /// # Errors
    /// [`MaskError::UnknownCriterion`] on the first unrecognized name.
    pub fn resolve<S: AsRef<str>>(names: &[S]) -> Result<Self, MaskError> {
        let mut tests = Vec::with_capacity(names.len());
        for name in names {
            let test = BitTest::compile(criteria::lookup(name.as_ref())?);
            if !tests.contains(&test) {
                tests.push(test);
            }
        }
        Ok(CriteriaSet { tests })
    }

    /// True iff `code` matches at least one selected criterion.
    ///
    /// An empty set never excludes.
    #[inline]
    pub fn is_excluded(&self, code: u16) -> bool {
        self.tests.iter().any(|t| t.matches(code))
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

const CACHE_UNKNOWN: u8 = 0;
const CACHE_KEEP: u8 = 1;
const CACHE_EXCLUDE: u8 = 2;

/// Read-through memo of `is_excluded` over the full `u16` code domain.
///
/// One slot per code. Concurrent lookups are lock-free; racing workers may
/// both evaluate a code, but they store the same result (the predicate is
/// pure), so first-writer-wins is harmless. Scoped to one `compute_mask`
/// call, which pins the criteria set the entries are valid for.
struct MatchCache {
    slots: Vec<AtomicU8>,
}

impl MatchCache {
    fn new() -> Self {
        let slots = (0..=u16::MAX as usize).map(|_| AtomicU8::new(CACHE_UNKNOWN)).collect();
        MatchCache { slots }
    }

    #[inline]
    fn is_excluded(&self, code: u16, set: &CriteriaSet) -> bool {
        let slot = &self.slots[code as usize];
        match slot.load(Ordering::Relaxed) {
            CACHE_KEEP => false,
            CACHE_EXCLUDE => true,
            _ => {
                let excluded = set.is_excluded(code);
                let state = if excluded { CACHE_EXCLUDE } else { CACHE_KEEP };
                slot.store(state, Ordering::Relaxed);
                excluded
            }
        }
    }
}

/// Compute the keep/exclude mask for a QA band.
///
/// Cells are evaluated independently (in parallel across the grid); the
/// output has the same dimensions as `band`, with 0 where any criterion in
/// `criteria` matches and 1 elsewhere. Output is `i16` to match the GTiff
/// Int16 band the reference pipeline writes.
///
/// # Arguments
/// * `band` - 2D view of QA codes, shape (rows, cols)
/// * `criteria` - names of criteria to exclude, e.g. `["CLOUD_YES", "WATER_YES"]`
///
/// # Errors
/// [`MaskError::UnknownCriterion`] if any name is not in the table; no mask
/// is produced.
pub fn compute_mask<S: AsRef<str>>(
    band: ArrayView2<u16>,
    criteria: &[S],
) -> Result<Array2<i16>, MaskError> {
    let set = CriteriaSet::resolve(criteria)?;
    let (rows, cols) = band.dim();
    debug!(rows, cols, selected = set.len(), "computing QA mask");

    let cache = MatchCache::new();
    let mask = Zip::from(band)
        .par_map_collect(|&code| if cache.is_excluded(code, &set) { 0i16 } else { 1i16 });
    Ok(mask)
}

/// [`compute_mask`] plus geotransform pass-through, mirroring the shape of
/// the surrounding read-band / write-mask pipeline.
pub fn qa_mask<S: AsRef<str>>(
    band: ArrayView2<u16>,
    criteria: &[S],
    geo_transform: GeoTransform,
) -> Result<MaskedBand, MaskError> {
    let mask = compute_mask(band, criteria)?;
    Ok(MaskedBand { mask, geo_transform })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::CRITERIA;
    use ndarray::Array2;

    /// Naive reference: slice the 16-character binary representation.
    fn reference_is_excluded(code: u16, names: &[&str]) -> bool {
        let bits = format!("{:016b}", code);
        names.iter().any(|name| {
            let c = criteria::lookup(name).unwrap();
            &bits[c.bit_start..c.bit_end] == c.pattern
        })
    }

    // ========================================================================
    // Per-pixel predicate
    // ========================================================================

    #[test]
    fn test_every_criterion_exhaustive_over_code_domain() {
        for c in CRITERIA {
            let set = CriteriaSet::resolve(&[c.name]).unwrap();
            for code in 0..=u16::MAX {
                assert_eq!(
                    set.is_excluded(code),
                    reference_is_excluded(code, &[c.name]),
                    "criterion {} disagrees at code {}",
                    c.name,
                    code
                );
            }
        }
    }

    #[test]
    fn test_empty_set_never_excludes() {
        let set = CriteriaSet::resolve::<&str>(&[]).unwrap();
        assert!(set.is_empty());
        for code in 0..=u16::MAX {
            assert!(!set.is_excluded(code));
        }
    }

    #[test]
    fn test_union_is_logical_or() {
        let s1 = CriteriaSet::resolve(&["CLOUD_YES", "CIRRUS_MAYBE"]).unwrap();
        let s2 = CriteriaSet::resolve(&["WATER_YES", "DESIGNATEDFILL_YES"]).unwrap();
        let both = CriteriaSet::resolve(&[
            "CLOUD_YES",
            "CIRRUS_MAYBE",
            "WATER_YES",
            "DESIGNATEDFILL_YES",
        ])
        .unwrap();
        for code in 0..=u16::MAX {
            assert_eq!(
                both.is_excluded(code),
                s1.is_excluded(code) || s2.is_excluded(code)
            );
        }
    }

    #[test]
    fn test_duplicates_and_order_irrelevant() {
        let a = CriteriaSet::resolve(&["CLOUD_YES", "WATER_YES", "CLOUD_YES"]).unwrap();
        let b = CriteriaSet::resolve(&["WATER_YES", "CLOUD_YES"]).unwrap();
        assert_eq!(a.len(), 2);
        for code in 0..=u16::MAX {
            assert_eq!(a.is_excluded(code), b.is_excluded(code));
        }
    }

    #[test]
    fn test_cloud_field_literal_codes() {
        // Code 3 = 0000000000000011: CLOUD bits [0,2) read "00".
        let set = CriteriaSet::resolve(&["CLOUD_YES"]).unwrap();
        assert!(!set.is_excluded(3));
        let notdet = CriteriaSet::resolve(&["CLOUD_NOTDETERMINED"]).unwrap();
        assert!(notdet.is_excluded(3));

        // Code 49152 = 1100000000000000: CLOUD bits read "11".
        assert!(set.is_excluded(49152));
    }

    #[test]
    fn test_one_bit_fields() {
        // DESIGNATEDFILL is the least significant bit.
        let fill = CriteriaSet::resolve(&["DESIGNATEDFILL_YES"]).unwrap();
        assert!(fill.is_excluded(1));
        assert!(!fill.is_excluded(0));

        let no_fill = CriteriaSet::resolve(&["DESIGNATEDFILL_NO"]).unwrap();
        assert!(no_fill.is_excluded(0));
        assert!(!no_fill.is_excluded(1));
    }

    #[test]
    fn test_resolve_unknown_name() {
        let err = CriteriaSet::resolve(&["CLOUD_YES", "FOO"]).unwrap_err();
        assert_eq!(err, MaskError::UnknownCriterion("FOO".to_string()));
    }

    // ========================================================================
    // Grid operation
    // ========================================================================

    #[test]
    fn test_compute_mask_dimensions_and_values() {
        let band = Array2::from_shape_fn((7, 5), |(r, c)| ((r * 5 + c) * 2048) as u16);
        let mask = compute_mask(band.view(), &["CLOUD_YES", "WATER_MAYBE"]).unwrap();

        assert_eq!(mask.dim(), (7, 5));
        for &v in mask.iter() {
            assert!(v == 0 || v == 1);
        }
    }

    #[test]
    fn test_compute_mask_cell_matches_predicate() {
        let band = Array2::from_shape_fn((16, 16), |(r, c)| ((r << 12) | (c * 17)) as u16);
        let names = ["CLOUD_YES", "VEGETATION_NO", "WATER_YES"];
        let set = CriteriaSet::resolve(&names).unwrap();
        let mask = compute_mask(band.view(), &names).unwrap();

        for ((r, c), &code) in band.indexed_iter() {
            let expected = if set.is_excluded(code) { 0 } else { 1 };
            assert_eq!(mask[[r, c]], expected, "cell ({}, {}) code {}", r, c, code);
        }
    }

    #[test]
    fn test_compute_mask_is_pure() {
        let band = Array2::from_shape_fn((9, 4), |(r, c)| (r * 7919 + c * 104729) as u16);
        let names = ["CIRRUS_YES", "SNOWICE_MAYBE"];
        let first = compute_mask(band.view(), &names).unwrap();
        let second = compute_mask(band.view(), &names).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_uniform_band_all_excluded_or_all_kept() {
        // Every pixel 1100... matches CLOUD_YES.
        let band = Array2::from_elem((4, 6), 49152u16);
        let all_zero = compute_mask(band.view(), &["CLOUD_YES"]).unwrap();
        assert!(all_zero.iter().all(|&v| v == 0));

        let all_one = compute_mask(band.view(), &["CLOUD_NO"]).unwrap();
        assert!(all_one.iter().all(|&v| v == 1));
    }

    #[test]
    fn test_empty_selection_keeps_everything() {
        let band = Array2::from_shape_fn((3, 3), |(r, c)| (r * 3 + c) as u16);
        let mask = compute_mask(band.view(), &Vec::<String>::new()).unwrap();
        assert!(mask.iter().all(|&v| v == 1));
    }

    #[test]
    fn test_compute_mask_unknown_criterion_aborts() {
        let band = Array2::from_elem((2, 2), 0u16);
        let err = compute_mask(band.view(), &["FOO"]).unwrap_err();
        assert!(matches!(err, MaskError::UnknownCriterion(_)));
    }

    #[test]
    fn test_cache_agrees_with_uncached_predicate() {
        let set = CriteriaSet::resolve(&["CLOUDSHADOW_MAYBE", "DROPPEDFRAME_YES"]).unwrap();
        let cache = MatchCache::new();
        for code in 0..=u16::MAX {
            // Hit each slot twice: once cold, once warm.
            assert_eq!(cache.is_excluded(code, &set), set.is_excluded(code));
            assert_eq!(cache.is_excluded(code, &set), set.is_excluded(code));
        }
    }

    #[test]
    fn test_qa_mask_passes_geotransform_through() {
        let band = Array2::from_elem((2, 3), 49152u16);
        let geo = [471585.0, 30.0, 0.0, 5264715.0, 0.0, -30.0];
        let result = qa_mask(band.view(), &["CLOUD_YES"], geo).unwrap();

        assert_eq!(result.geo_transform, geo);
        assert_eq!(result.mask.dim(), (2, 3));
        assert!(result.mask.iter().all(|&v| v == 0));
    }
}
