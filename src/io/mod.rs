//! CSV batches of matrices and decompositions
//!
//! Input files carry one symmetric matrix per record, as its packed lower triangle
//! under a header row:
//!
//! ```text
//! m00,m10,m11
//! 2.0,0.5,1.0
//! 1.0,0.0,1.0
//! ```
//!
//! Decompositions are written one term per record, tagged with the index of the matrix:
//!
//! ```text
//! matrix,term,weight,o0,o1
//! 0,0,1.5,1,0
//! ```

use std::fmt::Display;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, Writer};
use num_traits::Float;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::decomposition::Decomposition;
use crate::math::{SymmetricMatrix, symmetric_dimension};

/// Failure to read matrices from, or write decompositions to, a CSV stream.
#[derive(Debug, Error)]
pub enum CsvError {
    /// The underlying reader or writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed CSV or an entry that is not a number.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// A record whose length is not `D(D+1)/2`.
    #[error("record {record} has {found} coefficients, expected {expected}")]
    Arity {
        /// Zero-based index of the record, header excluded.
        record: usize,
        /// `D(D+1)/2`.
        expected: usize,
        /// Length of the record.
        found: usize,
    },
    /// Only a header, or nothing at all.
    #[error("CSV file contains no data records")]
    EmptyFile,
}

/// Read a batch of `D × D` matrices from a CSV file with a header row.
pub fn read_matrices<F, P, const D: usize>(path: P) -> Result<Vec<SymmetricMatrix<F, D>>, CsvError>
where
    F: Float + DeserializeOwned,
    P: AsRef<Path>,
{
    let rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    collect(rdr)
}

/// Same as [`read_matrices`], from any reader.
pub fn read_matrices_from<F, R, const D: usize>(reader: R) -> Result<Vec<SymmetricMatrix<F, D>>, CsvError>
where
    F: Float + DeserializeOwned,
    R: Read,
{
    let rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    collect(rdr)
}

fn collect<F, R, const D: usize>(mut rdr: csv::Reader<R>) -> Result<Vec<SymmetricMatrix<F, D>>, CsvError>
where
    F: Float + DeserializeOwned,
    R: Read,
{
    let expected = symmetric_dimension(D);
    let mut matrices = Vec::new();
    for (record, result) in rdr.deserialize::<Vec<F>>().enumerate() {
        let coefficients = result?;
        let m = SymmetricMatrix::from_coefficients(&coefficients)
            .ok_or(CsvError::Arity { record, expected, found: coefficients.len() })?;
        matrices.push(m);
    }

    if matrices.is_empty() {
        return Err(CsvError::EmptyFile);
    }
    Ok(matrices)
}

/// Write decompositions as `matrix,term,weight,o0..o{D-1}` records.
pub fn write_decompositions<F, W, const D: usize>(writer: W, decompositions: &[Decomposition<F, D>]) -> Result<(), CsvError>
where
    F: Float + Display,
    W: Write,
{
    let mut wtr = Writer::from_writer(writer);
    let header: Vec<String> = ["matrix", "term", "weight"]
        .iter()
        .map(|s| s.to_string())
        .chain((0..D).map(|i| format!("o{i}")))
        .collect();
    wtr.write_record(&header)?;

    for (matrix, d) in decompositions.iter().enumerate() {
        for (term, (offset, weight)) in d.terms().enumerate() {
            let row: Vec<String> = [matrix.to_string(), term.to_string(), weight.to_string()]
                .into_iter()
                .chain(offset.iter().map(|c| c.to_string()))
                .collect();
            wtr.write_record(&row)?;
        }
    }
    wtr.flush()?;
    Ok(())
}
