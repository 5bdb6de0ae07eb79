//! Growth-chart covariate grid
//!
//! Reference growth tables parameterize the weight distribution of each
//! (age, sex) cell with the BCCG/LMS triple (M, S, L): location, scale, and
//! skewness. The table is loaded once, before simulation begins, and treated
//! as an immutable snapshot.

use crate::data::Sex;
use crate::error::PopkinError;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// BCCG (M, S, L) parameters for one (age, sex) grid cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CovariateParams {
    /// Age of the grid cell, in months
    pub age_months: f64,
    pub sex: Sex,
    /// Location (median weight, kg)
    pub m: f64,
    /// Scale (coefficient of variation)
    pub s: f64,
    /// Skewness (Box-Cox power)
    pub l: f64,
}

/// On-the-wire row: sex is coded `1` = male, `2` = female
#[derive(Debug, Deserialize)]
struct GrowthRow {
    age_months: f64,
    sex: u8,
    m: f64,
    s: f64,
    l: f64,
}

/// An immutable growth-chart reference table
///
/// One [`CovariateParams`] record per (age, sex) grid point, in file order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrowthTable {
    cells: Vec<CovariateParams>,
}

impl GrowthTable {
    pub fn new(cells: Vec<CovariateParams>) -> Self {
        GrowthTable { cells }
    }

    pub fn cells(&self) -> &[CovariateParams] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The grid cell whose age is closest to `age_months` for the given sex
    pub fn nearest(&self, age_months: f64, sex: Sex) -> Option<&CovariateParams> {
        self.cells
            .iter()
            .filter(|cell| cell.sex == sex)
            .min_by(|a, b| {
                let da = (a.age_months - age_months).abs();
                let db = (b.age_months - age_months).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

/// Read a growth-chart table from delimited text
///
/// Expects a header row and the columns `age_months, sex, m, s, l`, with
/// sex coded `1` = male and `2` = female.
///
/// # Errors
///
/// Returns [`PopkinError::Csv`] for malformed rows and an invalid-sex-code
/// failure for any coding other than 1 or 2.
pub fn read_growth_table<R: Read>(reader: R) -> Result<GrowthTable, PopkinError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut cells = Vec::new();
    for row_result in csv_reader.deserialize() {
        let row: GrowthRow = row_result?;
        let sex = match row.sex {
            1 => Sex::Male,
            2 => Sex::Female,
            other => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("unknown sex code {} (expected 1 or 2)", other),
                )
                .into())
            }
        };
        cells.push(CovariateParams {
            age_months: row.age_months,
            sex,
            m: row.m,
            s: row.s,
            l: row.l,
        });
    }
    Ok(GrowthTable::new(cells))
}
