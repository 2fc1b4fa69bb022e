//! # Filing interface
//!
//! Interface to save and to load SOFB objects as whitespace delimited text files.

use std::{
    fmt::Debug,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    num::ParseFloatError,
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub enum FilingError {
    #[error("filing error")]
    IO(#[from] std::io::Error),
    #[error("can't create file {0:?}")]
    Create(#[source] std::io::Error, PathBuf),
    #[error("can't open file {0:?}")]
    Open(#[source] std::io::Error, PathBuf),
    #[error("failed to parse value at line {line}")]
    Parse {
        line: usize,
        #[source]
        source: ParseFloatError,
    },
    #[error("line {line} has {found} columns, expected {expected}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("expected a ({0},{1}) table, found ({2},{3})")]
    Shape(usize, usize, usize, usize),
}

pub type Result<T> = std::result::Result<T, FilingError>;

/// Encoding and decoding
pub trait Codec
where
    Self: Sized,
{
    /// Decodes object from [std::io::BufRead]
    fn decode<R: BufRead>(reader: &mut R) -> Result<Self>;
    /// Encodes object to [std::io::Write]
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()>;
}

impl<T> Filing for T where T: Sized + Codec {}

/// Encoding and decoding to/from [File]
pub trait Filing: Codec {
    /// Decodes object from given path
    fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path> + Debug,
    {
        log::info!("decoding from {path:?}");
        let file =
            File::open(&path).map_err(|e| FilingError::Open(e, path.as_ref().to_path_buf()))?;
        let mut buffer = BufReader::new(file);
        Self::decode(&mut buffer)
    }

    /// Encodes object to given path
    fn to_path<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path> + Debug,
    {
        log::info!("encoding to {path:?}");
        let file =
            File::create(&path).map_err(|e| FilingError::Create(e, path.as_ref().to_path_buf()))?;
        let mut buffer = BufWriter::new(file);
        self.encode(&mut buffer)?;
        buffer.flush()?;
        Ok(())
    }
}

/// Whitespace delimited table of floats
///
/// One row per line, columns separated by any whitespace;
/// empty lines are skipped.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Table {
    rows: Vec<Vec<f64>>,
}

impl Table {
    /// Creates a table from a row-major slice with `ncols` columns
    pub fn from_row_major(data: &[f64], ncols: usize) -> Self {
        Self {
            rows: data.chunks(ncols.max(1)).map(|row| row.to_vec()).collect(),
        }
    }
    /// Creates a single column table
    pub fn column(data: &[f64]) -> Self {
        Self::from_row_major(data, 1)
    }
    /// Returns the number of rows
    pub fn nrows(&self) -> usize {
        self.rows.len()
    }
    /// Returns the number of columns
    pub fn ncols(&self) -> usize {
        self.rows.first().map_or(0, |row| row.len())
    }
    /// Checks the table shape
    pub fn expect_shape(self, nrows: usize, ncols: usize) -> Result<Self> {
        if self.nrows() == nrows && self.ncols() == ncols {
            Ok(self)
        } else {
            Err(FilingError::Shape(nrows, ncols, self.nrows(), self.ncols()))
        }
    }
    /// Returns the table values in row-major order
    pub fn into_row_major(self) -> Vec<f64> {
        self.rows.into_iter().flatten().collect()
    }
}

impl Codec for Table {
    fn decode<R: BufRead>(reader: &mut R) -> Result<Self> {
        let mut rows: Vec<Vec<f64>> = vec![];
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let row = line
                .split_whitespace()
                .map(|x| x.parse::<f64>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|source| FilingError::Parse { line: i + 1, source })?;
            if let Some(first) = rows.first() {
                if first.len() != row.len() {
                    return Err(FilingError::Ragged {
                        line: i + 1,
                        expected: first.len(),
                        found: row.len(),
                    });
                }
            }
            rows.push(row);
        }
        Ok(Self { rows })
    }

    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        for row in &self.rows {
            let line: Vec<String> = row.iter().map(|x| format!("{x:+.17e}")).collect();
            writeln!(writer, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_codec() {
        let table = Table::from_row_major(&[1., -2.5, 3e-7, 4., 5., 6.], 3);
        let mut buffer = vec![];
        table.encode(&mut buffer).unwrap();
        let decoded = Table::decode(&mut buffer.as_slice()).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(decoded.nrows(), 2);
        assert_eq!(decoded.ncols(), 3);
    }

    #[test]
    fn ragged() {
        let text = "1 2 3\n\n4 5\n";
        match Table::decode(&mut text.as_bytes()) {
            Err(FilingError::Ragged {
                line,
                expected,
                found,
            }) => assert_eq!((line, expected, found), (3, 3, 2)),
            other => panic!("expected ragged table error, found {other:?}"),
        }
    }

    #[test]
    fn parse_error() {
        let text = "1 2\n3 x\n";
        assert!(matches!(
            Table::decode(&mut text.as_bytes()),
            Err(FilingError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn shape() {
        let table = Table::column(&[1., 2., 3.]);
        assert!(table.clone().expect_shape(3, 1).is_ok());
        assert!(matches!(
            table.expect_shape(1, 3),
            Err(FilingError::Shape(1, 3, 3, 1))
        ));
    }
}
