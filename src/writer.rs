use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use bstr::BString;
use tabread_core::Delimiter;

use crate::error::{Error, Result};

/// Builds a table writer with various configuration knobs.
#[derive(Debug)]
pub struct WriterBuilder {
    delim: Delimiter,
    comment: Option<u8>,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder { delim: Delimiter::Whitespace, comment: None }
    }
}

impl WriterBuilder {
    /// Create a new builder.
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// The field delimiter model to use when writing.
    ///
    /// The default is `Delimiter::Whitespace`, which emits a single
    /// space between fields.
    pub fn delimiter(&mut self, delim: Delimiter) -> &mut WriterBuilder {
        if let Delimiter::Byte(b) = delim {
            assert!(
                b != b'\n' && b != b'\r',
                "delimiter cannot be a line terminator"
            );
        }
        self.delim = delim;
        self
    }

    /// The comment byte a matching reader would be configured with.
    /// String fields containing it are refused, since the reader would
    /// drop the rest of the line.
    ///
    /// The default is no comment byte.
    pub fn comment(&mut self, comment: Option<u8>) -> &mut WriterBuilder {
        self.comment = comment;
        self
    }

    /// Build a writer from this configuration that writes to `wtr`.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Writer<W> {
        Writer {
            wtr: io::BufWriter::new(wtr),
            delim: self.delim,
            comment: self.comment,
            first_field: true,
        }
    }

    /// Build a writer from this configuration that writes the file at
    /// `path`, creating it or truncating an existing one.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        let path = path.as_ref();
        match File::create(path) {
            Ok(file) => Ok(self.from_writer(file)),
            Err(err) => Err(Error::Open { path: path.to_path_buf(), err }),
        }
    }
}

/// A writer for delimited numeric text, the inverse of
/// [`Reader`](crate::Reader).
///
/// Integers are formatted with `itoa` and doubles with `ryu`, whose
/// shortest round-trip form guarantees that a value written here and
/// read back with a matching configuration compares equal. There is no
/// quoting: a string field that would corrupt the table is refused
/// instead of mangled.
///
/// # Example
///
/// ```
/// use tabread::{Delimiter, WriterBuilder};
///
/// let mut wtr = WriterBuilder::new()
///     .delimiter(Delimiter::Byte(b'\t'))
///     .from_writer(vec![]);
/// wtr.write_str("edge").unwrap();
/// wtr.write_int(17u32).unwrap();
/// wtr.write_float(0.1).unwrap();
/// wtr.end_record().unwrap();
/// assert_eq!(wtr.into_inner().unwrap(), b"edge\t17\t0.1\n");
/// ```
pub struct Writer<W: io::Write> {
    wtr: io::BufWriter<W>,
    delim: Delimiter,
    comment: Option<u8>,
    first_field: bool,
}

impl<W: io::Write> Writer<W> {
    /// Creates a new writer with the default configuration, writing to
    /// `wtr`. The output is buffered automatically.
    pub fn from_writer(wtr: W) -> Writer<W> {
        WriterBuilder::new().from_writer(wtr)
    }

    fn sep(&mut self) -> Result<()> {
        if self.first_field {
            self.first_field = false;
            return Ok(());
        }
        let d = match self.delim {
            Delimiter::Whitespace => b' ',
            Delimiter::Byte(b) => b,
        };
        self.wtr.write_all(&[d]).map_err(Error::Io)
    }

    /// Writes one integer field of any width.
    pub fn write_int<I: itoa::Integer>(&mut self, v: I) -> Result<()> {
        self.sep()?;
        let mut buf = itoa::Buffer::new();
        self.wtr.write_all(buf.format(v).as_bytes()).map_err(Error::Io)
    }

    /// Writes one double field in shortest round-trip form.
    pub fn write_float(&mut self, v: f64) -> Result<()> {
        self.sep()?;
        let mut buf = ryu::Buffer::new();
        self.wtr.write_all(buf.format(v).as_bytes()).map_err(Error::Io)
    }

    /// Writes one string field verbatim.
    ///
    /// A field containing the delimiter, a line terminator or the
    /// comment byte is refused with [`Error::Unwritable`], as is an
    /// empty field in whitespace mode: with no quoting, such a field
    /// could not be read back as written.
    pub fn write_str<S: AsRef<[u8]>>(&mut self, field: S) -> Result<()> {
        let field = field.as_ref();
        if !self.writable(field) {
            return Err(Error::Unwritable { field: BString::from(field) });
        }
        self.sep()?;
        self.wtr.write_all(field).map_err(Error::Io)
    }

    fn writable(&self, field: &[u8]) -> bool {
        if let Delimiter::Whitespace = self.delim {
            if field.is_empty() {
                return false;
            }
        }
        field.iter().all(|&b| {
            b != b'\n'
                && b != b'\r'
                && self.comment != Some(b)
                && match self.delim {
                    Delimiter::Whitespace => b != b' ' && b != b'\t',
                    Delimiter::Byte(d) => b != d,
                }
        })
    }

    /// Ends the current record with a line terminator.
    pub fn end_record(&mut self) -> Result<()> {
        self.wtr.write_all(b"\n").map_err(Error::Io)?;
        self.first_field = true;
        Ok(())
    }

    /// Flushes the underlying buffer.
    pub fn flush(&mut self) -> Result<()> {
        self.wtr.flush().map_err(Error::Io)
    }

    /// Unwraps this writer, flushing it and returning the underlying
    /// writer.
    pub fn into_inner(self) -> Result<W> {
        self.wtr.into_inner().map_err(|err| Error::Io(err.into_error()))
    }
}

impl Writer<Vec<u8>> {
    /// Creates a new writer that writes to an in-memory buffer. At any
    /// time, `as_bytes` can be called to retrieve the cumulative data.
    pub fn from_memory() -> Writer<Vec<u8>> {
        Writer::from_writer(Vec::with_capacity(1024))
    }

    /// Returns the data written so far.
    pub fn as_bytes(&mut self) -> &[u8] {
        match self.wtr.flush() {
            // Writing to a Vec<u8> cannot fail.
            Err(err) => panic!("error flushing to Vec<u8>: {}", err),
            Ok(()) => self.wtr.get_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Writer, WriterBuilder};
    use tabread_core::Delimiter;

    #[test]
    fn whitespace_mode_joins_with_spaces() {
        let mut wtr = Writer::from_memory();
        wtr.write_int(1i32).unwrap();
        wtr.write_int(-2i64).unwrap();
        wtr.write_float(2.5).unwrap();
        wtr.end_record().unwrap();
        assert_eq!(wtr.as_bytes(), b"1 -2 2.5\n");
    }

    #[test]
    fn explicit_delimiter() {
        let mut wtr = WriterBuilder::new()
            .delimiter(Delimiter::Byte(b'\t'))
            .from_writer(vec![]);
        wtr.write_str("a b").unwrap();
        wtr.write_str("").unwrap();
        wtr.write_int(3u16).unwrap();
        wtr.end_record().unwrap();
        assert_eq!(wtr.into_inner().unwrap(), b"a b\t\t3\n");
    }

    #[test]
    fn multiple_records() {
        let mut wtr = Writer::from_memory();
        wtr.write_int(1u8).unwrap();
        wtr.end_record().unwrap();
        wtr.write_int(2u8).unwrap();
        wtr.end_record().unwrap();
        assert_eq!(wtr.as_bytes(), b"1\n2\n");
    }

    #[test]
    fn non_finite_floats_have_spellings() {
        let mut wtr = Writer::from_memory();
        wtr.write_float(f64::INFINITY).unwrap();
        wtr.write_float(f64::NEG_INFINITY).unwrap();
        wtr.write_float(f64::NAN).unwrap();
        wtr.end_record().unwrap();
        assert_eq!(wtr.as_bytes(), b"inf -inf NaN\n");
    }

    #[test]
    fn refuses_corrupting_fields() {
        let mut wtr = Writer::from_memory();
        assert!(wtr.write_str("has space").is_err());
        assert!(wtr.write_str("").is_err());
        assert!(wtr.write_str("line\nbreak").is_err());

        let mut wtr = WriterBuilder::new()
            .delimiter(Delimiter::Byte(b'\t'))
            .comment(Some(b'#'))
            .from_writer(vec![]);
        assert!(wtr.write_str("a\tb").is_err());
        assert!(wtr.write_str("n#te").is_err());
        // Spaces are data under an explicit delimiter.
        assert!(wtr.write_str("a b").is_ok());
    }

    #[test]
    fn refusal_writes_nothing() {
        let mut wtr = Writer::from_memory();
        wtr.write_int(1u8).unwrap();
        assert!(wtr.write_str("bad field\n").is_err());
        wtr.write_int(2u8).unwrap();
        wtr.end_record().unwrap();
        assert_eq!(wtr.as_bytes(), b"1 2\n");
    }
}
