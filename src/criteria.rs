//! Landsat-8 QA band bit-field criteria.
//!
//! The QA band stores quality flags as bit-fields packed into a 16-bit
//! unsigned integer per pixel. Bits are numbered MSB-first: bit 0 is the
//! most significant bit of the code, bit 15 the least.
//!
//! ## Bit Layout
//!
//! | Field            | Bits   | Width | Values                                |
//! |------------------|--------|-------|---------------------------------------|
//! | CLOUD            | 0–2    | 2     | NOTDETERMINED, NO, MAYBE, YES         |
//! | CIRRUS           | 2–4    | 2     | NOTDETERMINED, NO, MAYBE, YES         |
//! | SNOWICE          | 4–6    | 2     | NOTDETERMINED, NO, MAYBE, YES         |
//! | VEGETATION       | 6–8    | 2     | NOTDETERMINED, NO, MAYBE, YES         |
//! | CLOUDSHADOW      | 8–10   | 2     | NOTDETERMINED, NO, MAYBE, YES         |
//! | WATER            | 10–12  | 2     | NOTDETERMINED, NO, MAYBE, YES         |
//! | RESERVED         | 12–13  | 1     | NO, YES                               |
//! | TERRAINOCCLUSION | 13–14  | 1     | NO, YES                               |
//! | DROPPEDFRAME     | 14–15  | 1     | NO, YES                               |
//! | DESIGNATEDFILL   | 15–16  | 1     | NO, YES                               |
//!
//! Two-bit fields map NOTDETERMINED/NO/MAYBE/YES to `00`/`01`/`10`/`11`;
//! one-bit fields map NO/YES to `0`/`1`. Each criterion below names one
//! field value, e.g. `CLOUD_YES` matches when bits 0–2 read `11`.

use crate::mask::MaskError;

/// A named bit-field condition over a 16-bit QA code.
///
/// `pattern` is the bit string (MSB-first) that the slice
/// `[bit_start, bit_end)` of the code must equal for the criterion to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Criterion {
    pub name: &'static str,
    /// First bit of the field, inclusive, MSB-first.
    pub bit_start: usize,
    /// One past the last bit of the field, exclusive. At most 16.
    pub bit_end: usize,
    /// Required bit pattern, exactly `bit_end - bit_start` characters of '0'/'1'.
    pub pattern: &'static str,
}

/// The full criterion table. Fixed at compile time, never mutated.
pub static CRITERIA: &[Criterion] = &[
    Criterion { name: "CLOUD_NOTDETERMINED", bit_start: 0, bit_end: 2, pattern: "00" },
    Criterion { name: "CLOUD_NO", bit_start: 0, bit_end: 2, pattern: "01" },
    Criterion { name: "CLOUD_MAYBE", bit_start: 0, bit_end: 2, pattern: "10" },
    Criterion { name: "CLOUD_YES", bit_start: 0, bit_end: 2, pattern: "11" },
    Criterion { name: "CIRRUS_NOTDETERMINED", bit_start: 2, bit_end: 4, pattern: "00" },
    Criterion { name: "CIRRUS_NO", bit_start: 2, bit_end: 4, pattern: "01" },
    Criterion { name: "CIRRUS_MAYBE", bit_start: 2, bit_end: 4, pattern: "10" },
    Criterion { name: "CIRRUS_YES", bit_start: 2, bit_end: 4, pattern: "11" },
    Criterion { name: "SNOWICE_NOTDETERMINED", bit_start: 4, bit_end: 6, pattern: "00" },
    Criterion { name: "SNOWICE_NO", bit_start: 4, bit_end: 6, pattern: "01" },
    Criterion { name: "SNOWICE_MAYBE", bit_start: 4, bit_end: 6, pattern: "10" },
    Criterion { name: "SNOWICE_YES", bit_start: 4, bit_end: 6, pattern: "11" },
    Criterion { name: "VEGETATION_NOTDETERMINED", bit_start: 6, bit_end: 8, pattern: "00" },
    Criterion { name: "VEGETATION_NO", bit_start: 6, bit_end: 8, pattern: "01" },
    Criterion { name: "VEGETATION_MAYBE", bit_start: 6, bit_end: 8, pattern: "10" },
    Criterion { name: "VEGETATION_YES", bit_start: 6, bit_end: 8, pattern: "11" },
    Criterion { name: "CLOUDSHADOW_NOTDETERMINED", bit_start: 8, bit_end: 10, pattern: "00" },
    Criterion { name: "CLOUDSHADOW_NO", bit_start: 8, bit_end: 10, pattern: "01" },
    Criterion { name: "CLOUDSHADOW_MAYBE", bit_start: 8, bit_end: 10, pattern: "10" },
    Criterion { name: "CLOUDSHADOW_YES", bit_start: 8, bit_end: 10, pattern: "11" },
    Criterion { name: "WATER_NOTDETERMINED", bit_start: 10, bit_end: 12, pattern: "00" },
    Criterion { name: "WATER_NO", bit_start: 10, bit_end: 12, pattern: "01" },
    Criterion { name: "WATER_MAYBE", bit_start: 10, bit_end: 12, pattern: "10" },
    Criterion { name: "WATER_YES", bit_start: 10, bit_end: 12, pattern: "11" },
    Criterion { name: "RESERVED_NO", bit_start: 12, bit_end: 13, pattern: "0" },
    Criterion { name: "RESERVED_YES", bit_start: 12, bit_end: 13, pattern: "1" },
    Criterion { name: "TERRAINOCCLUSION_NO", bit_start: 13, bit_end: 14, pattern: "0" },
    Criterion { name: "TERRAINOCCLUSION_YES", bit_start: 13, bit_end: 14, pattern: "1" },
    Criterion { name: "DROPPEDFRAME_NO", bit_start: 14, bit_end: 15, pattern: "0" },
    Criterion { name: "DROPPEDFRAME_YES", bit_start: 14, bit_end: 15, pattern: "1" },
    Criterion { name: "DESIGNATEDFILL_NO", bit_start: 15, bit_end: 16, pattern: "0" },
    Criterion { name: "DESIGNATEDFILL_YES", bit_start: 15, bit_end: 16, pattern: "1" },
];

/// Look up a criterion by name.
///
/// # Errors
/// [`MaskError::UnknownCriterion`] if `name` is not in the table.
pub fn lookup(name: &str) -> Result<&'static Criterion, MaskError> {
    CRITERIA
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| MaskError::UnknownCriterion(name.to_string()))
}

/// Names of all registered criteria, in table order.
pub fn criterion_names() -> Vec<&'static str> {
    CRITERIA.iter().map(|c| c.name).collect()
}
