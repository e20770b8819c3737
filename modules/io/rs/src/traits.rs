use eyre::Result;
use impl_tools::autoimpl;

/// A trait for writing structured records. Modeled after the `Write` trait in the std.
#[autoimpl(for <T: trait + ?Sized> &mut T, Box<T>)]
pub trait WriteRecord {
    type Record;

    /// Write a single record.
    fn write_record(&mut self, record: &Self::Record) -> Result<()>;

    /// Write a slice of records, stopping at the first failure.
    fn write_records(&mut self, records: &[Self::Record]) -> Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Flush the output.
    fn flush(&mut self) -> Result<()>;
}

/// In-memory sink that keeps every written record.
#[derive(Clone, Debug)]
pub struct VecWriter<R> {
    records: Vec<R>,
}

impl<R> Default for VecWriter<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<R> VecWriter<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }
}

impl<R: Clone> WriteRecord for VecWriter<R> {
    type Record = R;

    fn write_record(&mut self, record: &Self::Record) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_writer() {
        let mut writer = VecWriter::new();
        writer.write_record(&1).unwrap();
        writer.write_records(&[2, 3]).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.records(), [1, 2, 3]);

        let mut boxed: Box<dyn WriteRecord<Record = i32>> = Box::new(VecWriter::new());
        boxed.write_record(&4).unwrap();
    }
}
