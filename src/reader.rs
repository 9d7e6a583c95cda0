use std::fmt;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use bstr::ByteSlice;
use tabread_core::{Delimiter, ScanError, Scanner, ScannerBuilder};

use crate::error::{code_of, Code, Error, Position, Result};

/// Builds a table reader with various configuration knobs.
///
/// This builder permits specifying the delimiter model, the comment
/// byte, the integer radix and more. Once a [`Reader`] is built, its
/// configuration cannot be changed.
///
/// # Example
///
/// ```
/// use tabread::{Delimiter, ReaderBuilder};
///
/// let mut rdr = ReaderBuilder::new()
///     .delimiter(Delimiter::Byte(b'\t'))
///     .comment(Some(b'#'))
///     .from_reader("# header\n10\t20\n".as_bytes());
/// assert!(rdr.read_line(true).unwrap());
/// assert_eq!(rdr.read_u32().unwrap(), 10);
/// assert_eq!(rdr.read_u32().unwrap(), 20);
/// ```
#[derive(Debug, Default)]
pub struct ReaderBuilder {
    scan: ScannerBuilder,
    name: Option<String>,
}

impl ReaderBuilder {
    /// Create a new builder.
    pub fn new() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    /// The field delimiter model to use.
    ///
    /// The default is `Delimiter::Whitespace`: runs of one or more
    /// spaces or tabs separate fields. With `Delimiter::Byte`, every
    /// occurrence of the byte is significant and two in a row bound an
    /// empty field.
    pub fn delimiter(&mut self, delim: Delimiter) -> &mut ReaderBuilder {
        self.scan.delimiter(delim);
        self
    }

    /// The comment byte. Everything from this byte to the end of a
    /// line is ignored, and a line whose first non-blank byte is the
    /// comment counts as blank for skip purposes.
    ///
    /// The default is no comment byte.
    pub fn comment(&mut self, comment: Option<u8>) -> &mut ReaderBuilder {
        self.scan.comment(comment);
        self
    }

    /// The radix used for integer conversions, in `2..=36`.
    ///
    /// The default is 10.
    pub fn base(&mut self, base: u32) -> &mut ReaderBuilder {
        self.scan.base(base);
        self
    }

    /// Whether unbounded double reads admit NaN and infinity.
    ///
    /// Enabled by default. When disabled, such values fail with
    /// [`Code::NonFinite`]. Bounded double reads always reject NaN.
    pub fn non_finite(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.scan.non_finite(yes);
        self
    }

    /// The name used for this input in diagnostics.
    ///
    /// `from_path` fills this in from the path automatically; inputs
    /// without a name render as `input`.
    pub fn source_name<S: Into<String>>(&mut self, name: S) -> &mut ReaderBuilder {
        self.name = Some(name.into());
        self
    }

    /// Build a reader from this configuration that reads from `rdr`.
    ///
    /// The stream is buffered automatically. Pass `&mut rdr` to keep
    /// ownership of the stream; pass it by value to hand the stream to
    /// the reader, which drops it with itself.
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Reader<R> {
        Reader {
            rdr: io::BufReader::new(rdr),
            scan: self.scan.build(),
            buf: Vec::new(),
            line: 0,
            last: Code::Ok,
            name: self.name.clone(),
        }
    }

    /// Build a reader from this configuration that reads the file at
    /// `path`, owning and eventually closing it.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Reader<File>> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                return Err(Error::Open { path: path.to_path_buf(), err });
            }
        };
        let mut rdr = self.from_reader(file);
        if rdr.name.is_none() {
            rdr.name = Some(path.display().to_string());
        }
        Ok(rdr)
    }
}

/// A streaming reader for delimited numeric text.
///
/// The reader pulls one physical line at a time into an internal
/// buffer that is reused across lines, then converts fields from that
/// line on demand, strictly: malformed trailing content, out-of-range
/// values and absent values each fail with their own [`Code`] instead
/// of being silently truncated or wrapped. Every operation records its
/// code in a register that [`last_error`](Reader::last_error) exposes,
/// together with exact line/position/column coordinates for
/// diagnostics.
///
/// String reads borrow from the line buffer without copying; such a
/// borrow ends before the next `read_line`, which the borrow checker
/// enforces.
///
/// A reader is single-threaded and strictly forward; parallel
/// ingestion takes one reader per thread over disjoint inputs.
///
/// # Example
///
/// ```
/// use tabread::Reader;
///
/// let mut rdr = Reader::from_string("alpha 1 0.5\nbeta 2 0.25\n");
/// let mut total = 0.0;
/// while rdr.read_line(true).unwrap() {
///     let name = rdr.read_str().unwrap().to_vec();
///     let count = rdr.read_u32().unwrap();
///     let weight = rdr.read_f64().unwrap();
///     total += f64::from(count) * weight;
///     assert!(!name.is_empty());
/// }
/// assert_eq!(total, 1.0);
/// ```
pub struct Reader<R> {
    rdr: io::BufReader<R>,
    scan: Scanner,
    buf: Vec<u8>,
    line: u64,
    last: Code,
    name: Option<String>,
}

impl<R: io::Read> Reader<R> {
    /// Creates a new reader from an arbitrary `io::Read`, with the
    /// default configuration.
    ///
    /// The stream is buffered for you automatically. Pass `&mut rdr`
    /// to keep ownership of the stream.
    pub fn from_reader(rdr: R) -> Reader<R> {
        ReaderBuilder::new().from_reader(rdr)
    }
}

impl Reader<File> {
    /// Creates a new reader for the file at the path given, owning and
    /// eventually closing it. The path becomes the diagnostic source
    /// name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader<File>> {
        ReaderBuilder::new().from_path(path)
    }
}

impl Reader<io::Cursor<Vec<u8>>> {
    /// Creates a reader for an in-memory string buffer.
    pub fn from_string<S: Into<String>>(s: S) -> Reader<io::Cursor<Vec<u8>>> {
        Reader::from_bytes(s.into().into_bytes())
    }

    /// Creates a reader for an in-memory buffer of bytes.
    pub fn from_bytes<V: Into<Vec<u8>>>(bytes: V) -> Reader<io::Cursor<Vec<u8>>> {
        Reader::from_reader(io::Cursor::new(bytes.into()))
    }
}

impl<R: io::Read> Reader<R> {
    /// Reads the next physical line into the internal buffer,
    /// discarding whatever remained of the current one.
    ///
    /// Returns `Ok(true)` when a line is loaded and `Ok(false)` at end
    /// of file (the register holds [`Code::Eof`], and further calls
    /// keep returning `Ok(false)`). The line terminator stays in the
    /// buffer; the buffer grows as needed, with no line-length limit.
    ///
    /// With `skip_blank`, lines holding nothing but blanks, or whose
    /// first non-blank byte is the comment marker, are skipped; the
    /// line counter still counts them.
    pub fn read_line(&mut self, skip_blank: bool) -> Result<bool> {
        match self.last {
            Code::Eof => return Ok(false),
            Code::Open | Code::Invalidated => {
                return Err(Error::field(self.last, self.location()));
            }
            _ => {}
        }
        loop {
            self.buf.clear();
            let n = match self.rdr.read_until(b'\n', &mut self.buf) {
                Ok(n) => n,
                Err(err) => {
                    self.last = Code::Read;
                    return Err(Error::Io(err));
                }
            };
            if n == 0 {
                self.last = Code::Eof;
                self.scan.begin_line();
                return Ok(false);
            }
            self.line += 1;
            if !skip_blank || !self.blank_line() {
                break;
            }
        }
        self.scan.begin_line();
        self.last = Code::Ok;
        Ok(true)
    }

    /// Whether the buffered line holds no data. A line of bare
    /// delimiters is not blank: it bounds empty fields.
    fn blank_line(&self) -> bool {
        self.scan.line_is_blank(&self.buf)
    }

    /// Refuses field operations once a terminal code is registered,
    /// without touching the buffer or the register.
    fn guard(&self) -> Result<()> {
        match self.last {
            Code::Eof | Code::Read | Code::Open | Code::Invalidated => {
                Err(Error::field(self.last, self.location()))
            }
            _ => Ok(()),
        }
    }

    fn location(&self) -> Position {
        Position::new(self.line, self.scan.pos(), self.scan.col())
    }

    /// Runs one scan against the current line, recording its outcome
    /// in the register.
    fn scan_field<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Scanner, &[u8]) -> std::result::Result<T, ScanError>,
    {
        self.guard()?;
        match f(&mut self.scan, &self.buf) {
            Ok(v) => {
                self.last = Code::Ok;
                Ok(v)
            }
            Err(err) => {
                let (code, _) = code_of(err);
                self.last = code;
                Err(Error::scan(err, self.location()))
            }
        }
    }

    /// Reads one signed 16-bit integer.
    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_i16_in(i16::MIN, i16::MAX)
    }

    /// Reads one signed 16-bit integer within the inclusive bounds.
    pub fn read_i16_in(&mut self, min: i16, max: i16) -> Result<i16> {
        self.scan_field(|s, line| s.read_i16(line, min, max))
    }

    /// Reads one unsigned 16-bit integer.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_u16_in(0, u16::MAX)
    }

    /// Reads one unsigned 16-bit integer within the inclusive bounds.
    pub fn read_u16_in(&mut self, min: u16, max: u16) -> Result<u16> {
        self.scan_field(|s, line| s.read_u16(line, min, max))
    }

    /// Reads one signed 32-bit integer.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_i32_in(i32::MIN, i32::MAX)
    }

    /// Reads one signed 32-bit integer within the inclusive bounds.
    pub fn read_i32_in(&mut self, min: i32, max: i32) -> Result<i32> {
        self.scan_field(|s, line| s.read_i32(line, min, max))
    }

    /// Reads one unsigned 32-bit integer.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_u32_in(0, u32::MAX)
    }

    /// Reads one unsigned 32-bit integer within the inclusive bounds.
    pub fn read_u32_in(&mut self, min: u32, max: u32) -> Result<u32> {
        self.scan_field(|s, line| s.read_u32(line, min, max))
    }

    /// Reads one signed 64-bit integer.
    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_i64_in(i64::MIN, i64::MAX)
    }

    /// Reads one signed 64-bit integer within the inclusive bounds.
    ///
    /// A value outside the bounds fails with [`Code::Range`]; the
    /// error carries the value clamped to the nearer bound, so the
    /// caller can still use it.
    pub fn read_i64_in(&mut self, min: i64, max: i64) -> Result<i64> {
        self.scan_field(|s, line| s.read_i64(line, min, max))
    }

    /// Reads one unsigned 64-bit integer.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_u64_in(0, u64::MAX)
    }

    /// Reads one unsigned 64-bit integer within the inclusive bounds.
    ///
    /// A leading `-` fails with [`Code::Range`] rather than wrapping
    /// to a large positive value.
    pub fn read_u64_in(&mut self, min: u64, max: u64) -> Result<u64> {
        self.scan_field(|s, line| s.read_u64(line, min, max))
    }

    /// Reads one double. NaN and infinity pass through unless the
    /// reader was configured to reject them.
    pub fn read_f64(&mut self) -> Result<f64> {
        self.scan_field(|s, line| s.read_f64(line))
    }

    /// Reads one double within the inclusive bounds. NaN is rejected
    /// unconditionally, since it cannot be compared against a bound.
    pub fn read_f64_in(&mut self, min: f64, max: f64) -> Result<f64> {
        self.scan_field(|s, line| s.read_f64_in(line, min, max))
    }

    /// Reads one string field as a borrowed view into the line buffer.
    ///
    /// With an explicit delimiter, an empty string between delimiters
    /// is a valid field. The view ends at the delimiter, comment or
    /// line terminator and is never copied; it cannot outlive the next
    /// `read_line`.
    pub fn read_str(&mut self) -> Result<&[u8]> {
        let (start, end) = self.read_str_span()?;
        Ok(&self.buf[start..end])
    }

    pub(crate) fn read_str_span(&mut self) -> Result<(usize, usize)> {
        self.scan_field(|s, line| s.read_str_bounds(line))
    }

    /// Advances over one field without producing a value, for columns
    /// the caller wants to ignore.
    pub fn skip_field(&mut self) -> Result<()> {
        self.scan_field(|s, line| s.skip(line))
    }

    /// Records a failure produced outside the scanner (the generic
    /// conversion layer) and returns the positioned error for it.
    pub(crate) fn fail(&mut self, code: Code) -> Error {
        self.last = code;
        Error::field(code, self.location())
    }

    /// The code recorded by the most recent operation. Reading it has
    /// no side effects, so repeated calls return the same code.
    pub fn last_error(&self) -> Code {
        self.last
    }

    /// The fixed phrase describing the register code.
    pub fn error_text(&self) -> &'static str {
        self.last.describe()
    }

    /// The 1-based number of the current line (0 before the first
    /// read).
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The 0-based byte cursor within the current line.
    pub fn position(&self) -> usize {
        self.scan.pos()
    }

    /// The number of fields fully converted on the current line.
    pub fn column(&self) -> u64 {
        self.scan.col()
    }

    /// The raw bytes of the current line, terminator included. Empty
    /// after end of file.
    pub fn raw_line(&self) -> &[u8] {
        &self.buf
    }

    /// The configured delimiter model.
    pub fn delimiter(&self) -> Delimiter {
        self.scan.delimiter()
    }

    /// The configured comment byte, if any.
    pub fn comment(&self) -> Option<u8> {
        self.scan.comment()
    }

    /// The name used for this input in diagnostics, if any.
    pub fn source_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Writes the formatted diagnostic for the current register to the
    /// given sink:
    /// `<source-name|input> line <L>, position <P> / column <C>:
    /// <description>`.
    pub fn write_error<W: io::Write>(&self, mut wtr: W) -> io::Result<()> {
        match self.name {
            Some(ref name) => write!(wtr, "{} ", name)?,
            None => write!(wtr, "input ")?,
        }
        writeln!(
            wtr,
            "line {}, position {} / column {}: {}",
            self.line,
            self.scan.pos(),
            self.scan.col(),
            self.last.describe()
        )
    }

    /// Unwraps this reader, returning the underlying stream. Buffered
    /// bytes that were read ahead but not consumed are discarded.
    pub fn into_inner(self) -> R {
        self.rdr.into_inner()
    }
}

impl<R> fmt::Debug for Reader<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Reader")
            .field("delimiter", &self.scan.delimiter())
            .field("comment", &self.scan.comment())
            .field("base", &self.scan.base())
            .field("line", &self.line)
            .field("pos", &self.scan.pos())
            .field("col", &self.scan.col())
            .field("last", &self.last)
            .field("name", &self.name)
            .field("buf", &self.buf.as_bstr())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::{Reader, ReaderBuilder};
    use crate::error::Code;
    use tabread_core::Delimiter;

    #[test]
    fn line_counting_and_reset() {
        let mut rdr = Reader::from_string("1 2\n3 4\n");
        assert!(rdr.read_line(true).unwrap());
        assert_eq!(rdr.line(), 1);
        assert_eq!(rdr.read_i64().unwrap(), 1);
        assert_eq!(rdr.column(), 1);
        assert!(rdr.read_line(true).unwrap());
        assert_eq!(rdr.line(), 2);
        assert_eq!(rdr.column(), 0);
        assert_eq!(rdr.position(), 0);
        assert_eq!(rdr.read_i64().unwrap(), 3);
    }

    #[test]
    fn skipped_lines_still_count() {
        let data = "\n   \n# note\n5\n";
        let mut rdr = ReaderBuilder::new()
            .comment(Some(b'#'))
            .from_reader(data.as_bytes());
        assert!(rdr.read_line(true).unwrap());
        assert_eq!(rdr.line(), 4);
        assert_eq!(rdr.read_i64().unwrap(), 5);
    }

    #[test]
    fn blank_lines_kept_on_request() {
        let mut rdr = Reader::from_string("\n7\n");
        assert!(rdr.read_line(false).unwrap());
        assert_eq!(rdr.line(), 1);
        assert_eq!(rdr.read_i64().unwrap_err().code(), Code::Eol);
        assert!(rdr.read_line(false).unwrap());
        assert_eq!(rdr.read_i64().unwrap(), 7);
    }

    #[test]
    fn eof_is_sticky_and_idempotent() {
        let mut rdr = Reader::from_string("1\n");
        assert!(rdr.read_line(true).unwrap());
        assert!(!rdr.read_line(true).unwrap());
        assert_eq!(rdr.last_error(), Code::Eof);
        assert!(!rdr.read_line(true).unwrap());
        assert_eq!(rdr.last_error(), Code::Eof);
        // Field operations refuse without disturbing the register.
        assert_eq!(rdr.read_i64().unwrap_err().code(), Code::Eof);
        assert_eq!(rdr.last_error(), Code::Eof);
        assert!(rdr.raw_line().is_empty());
    }

    #[test]
    fn last_error_reads_are_idempotent() {
        let mut rdr = Reader::from_string("x\n");
        assert!(rdr.read_line(true).unwrap());
        assert!(rdr.read_i64().is_err());
        let code = rdr.last_error();
        assert_eq!(rdr.last_error(), code);
        assert_eq!(rdr.last_error(), code);
        assert_eq!(code, Code::Invalid);
    }

    #[test]
    fn success_clears_the_register() {
        let mut rdr = Reader::from_string("x 5\n");
        assert!(rdr.read_line(true).unwrap());
        assert!(rdr.read_i64().is_err());
        assert_eq!(rdr.last_error(), Code::Invalid);
        rdr.skip_field().unwrap();
        assert_eq!(rdr.last_error(), Code::Ok);
        assert_eq!(rdr.read_i64().unwrap(), 5);
    }

    #[test]
    fn eof_only_at_stream_end() {
        let mut rdr = Reader::from_string("1\n");
        assert!(rdr.read_line(true).unwrap());
        assert_eq!(rdr.read_i64().unwrap(), 1);
        // Line exhaustion and stream exhaustion stay distinct.
        assert_eq!(rdr.read_i64().unwrap_err().code(), Code::Eol);
        assert!(!rdr.read_line(true).unwrap());
        assert_eq!(rdr.read_i64().unwrap_err().code(), Code::Eof);
    }

    #[test]
    fn final_line_without_terminator() {
        let mut rdr = Reader::from_string("1 2");
        assert!(rdr.read_line(true).unwrap());
        assert_eq!(rdr.read_i64().unwrap(), 1);
        assert_eq!(rdr.read_i64().unwrap(), 2);
        assert!(!rdr.read_line(true).unwrap());
    }

    #[test]
    fn crlf_terminators() {
        let mut rdr = ReaderBuilder::new()
            .delimiter(Delimiter::Byte(b','))
            .from_reader("1,2\r\n3,4\r\n".as_bytes());
        assert!(rdr.read_line(true).unwrap());
        assert_eq!(rdr.read_i64().unwrap(), 1);
        assert_eq!(rdr.read_i64().unwrap(), 2);
        assert!(rdr.read_line(true).unwrap());
        assert_eq!(rdr.read_i64().unwrap(), 3);
        assert_eq!(rdr.read_i64().unwrap(), 4);
    }

    #[test]
    fn borrowed_stream() {
        let mut cursor = io::Cursor::new(b"9\n".to_vec());
        {
            let mut rdr = Reader::from_reader(&mut cursor);
            assert!(rdr.read_line(true).unwrap());
            assert_eq!(rdr.read_i64().unwrap(), 9);
        }
        // The caller still owns the stream afterwards.
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn write_error_format() {
        let mut rdr = ReaderBuilder::new()
            .source_name("ledger.tsv")
            .delimiter(Delimiter::Byte(b'\t'))
            .from_reader("10\tx\n".as_bytes());
        assert!(rdr.read_line(true).unwrap());
        assert!(rdr.read_i64().is_ok());
        assert!(rdr.read_i64().is_err());
        let mut out = Vec::new();
        rdr.write_error(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ledger.tsv line 1, position 3 / column 1: invalid value\n"
        );
    }

    #[test]
    fn write_error_unnamed_input() {
        let mut rdr = Reader::from_string("");
        assert!(!rdr.read_line(true).unwrap());
        let mut out = Vec::new();
        rdr.write_error(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "input line 0, position 0 / column 0: end of file\n"
        );
    }

    #[test]
    fn clamped_value_is_usable() {
        let mut rdr = Reader::from_string("150\n");
        assert!(rdr.read_line(true).unwrap());
        let err = rdr.read_i64_in(0, 100).unwrap_err();
        assert_eq!(err.code(), Code::Range);
        assert_eq!(err.clamped().and_then(|c| c.as_int()), Some(100));
    }

    #[test]
    fn raw_line_keeps_terminator() {
        let mut rdr = Reader::from_string("a b\n");
        assert!(rdr.read_line(true).unwrap());
        assert_eq!(rdr.raw_line(), b"a b\n");
    }

    #[test]
    fn str_view_borrows_the_buffer() {
        let mut rdr = Reader::from_string("alpha beta\n");
        assert!(rdr.read_line(true).unwrap());
        assert_eq!(rdr.read_str().unwrap(), b"alpha");
        assert_eq!(rdr.read_str().unwrap(), b"beta");
        assert_eq!(rdr.read_str().unwrap_err().code(), Code::Eol);
    }
}
