//! Numeric reader from binary files.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::Path;

use anyhow::{self, ensure, Context};
use byteorder::ByteOrder;

#[cfg(test)]
#[path = "numeric_tests.rs"]
mod numeric_tests;

/// Trait for plain numeric values that can be decoded from a fixed number of bytes.
pub(crate) trait NumericValue: Sized {
    /// The number of bytes occupied by one value.
    const SIZE: usize;

    /// Decodes one value from exactly [`Self::SIZE`] bytes in byte order `B`.
    fn decode<B: ByteOrder>(buf: &[u8]) -> Self;
}

impl NumericValue for f64 {
    const SIZE: usize = 8;

    fn decode<B: ByteOrder>(buf: &[u8]) -> Self {
        B::read_f64(buf)
    }
}

/// Iterable structure for reading numeric binary files.
pub(crate) struct NumericReader<R: BufRead, B: ByteOrder, T> {
    /// The inner file reader.
    inner: R,

    /// The byte order of the numeric values to be read.
    byte_order: PhantomData<B>,

    /// The type of the numeric values to be read.
    numeric_type: PhantomData<T>,
}

impl<R: BufRead, B: ByteOrder, T: NumericValue> NumericReader<R, B, T> {
    /// Constructs a new numeric binary reader wrapping around a buffered reader.
    ///
    /// # Arguments
    ///
    /// * `inner` - The underlying reader.
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            byte_order: PhantomData,
            numeric_type: PhantomData,
        }
    }

    /// Reads all remaining values and checks that there are exactly `expected` of them.
    ///
    /// # Arguments
    ///
    /// * `expected` - The number of values the source must contain.
    pub(crate) fn collect_exact(self, expected: usize) -> Result<Vec<T>, anyhow::Error> {
        let values = self.collect::<Vec<_>>();
        ensure!(
            values.len() == expected,
            "Expected {expected} numeric value(s), but read {}.",
            values.len()
        );
        Ok(values)
    }
}

impl<B: ByteOrder, T: NumericValue> NumericReader<BufReader<File>, B, T> {
    /// Constructs a new numeric binary reader wrapping around a buffered file reader from a
    /// filename.
    ///
    /// # Arguments
    ///
    /// * `filename` - The path to the file to be read.
    pub(crate) fn from_file<P: AsRef<Path>>(filename: P) -> Result<Self, anyhow::Error> {
        let f = File::open(&filename).with_context(|| {
            format!(
                "Unable to open the numeric binary file `{}`",
                filename.as_ref().display()
            )
        })?;
        Ok(Self::new(BufReader::new(f)))
    }
}

impl<R: BufRead, B: ByteOrder, T: NumericValue> Iterator for NumericReader<R, B, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buff = [0_u8; 16];
        let buff = &mut buff[..T::SIZE];
        self.inner.read_exact(buff).ok()?;
        Some(T::decode::<B>(buff))
    }
}
