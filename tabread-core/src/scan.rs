use core::fmt;

use memchr::memchr3;

use crate::float::float_token;
use crate::int::scan_int;

/// The delimiter model used to split a line into fields.
///
/// The default is `Whitespace`, which treats any run of one or more
/// spaces or tabs as a single separator. An explicit byte makes every
/// occurrence significant, so two delimiters in a row bound an empty
/// field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Delimiter {
    /// A run of one or more spaces or tabs separates fields.
    Whitespace,
    /// The byte given separates fields. It cannot be a line terminator.
    Byte(u8),
}

impl Default for Delimiter {
    fn default() -> Delimiter {
        Delimiter::Whitespace
    }
}

/// The value delivered alongside a `Range` failure, already clamped to
/// the violated bound of the requested conversion. It is always exactly
/// representable in the type the caller asked for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Clamped {
    /// A signed integer bound.
    Int(i64),
    /// An unsigned integer bound.
    UInt(u64),
    /// A float bound.
    Float(f64),
}

impl Clamped {
    /// The bound as a signed integer, if that is what was requested.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Clamped::Int(v) => Some(v),
            _ => None,
        }
    }

    /// The bound as an unsigned integer, if that is what was requested.
    pub fn as_uint(&self) -> Option<u64> {
        match *self {
            Clamped::UInt(v) => Some(v),
            _ => None,
        }
    }

    /// The bound as a float, if that is what was requested.
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Clamped::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Clamped {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Clamped::Int(v) => v.fmt(f),
            Clamped::UInt(v) => v.fmt(f),
            Clamped::Float(v) => v.fmt(f),
        }
    }
}

/// Why a field could not be produced from the current line.
///
/// `Eol` is a benign "no more fields here" signal, distinct from the
/// parse failures; `Range` is recoverable, since it carries a usable
/// clamped value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScanError {
    /// No more fields on this line.
    Eol,
    /// An explicit delimiter with no value in front of it.
    Missing,
    /// The bytes at the cursor do not form a token of the requested
    /// type, or the token is not followed by a valid separator.
    Invalid,
    /// The token parsed but its value violates the inclusive bounds.
    Range(Clamped),
    /// NaN or infinity under a policy that rejects them.
    NonFinite,
}

/// Builds a field scanner with various configuration knobs.
#[derive(Debug, Default)]
pub struct ScannerBuilder {
    scan: Scanner,
}

impl ScannerBuilder {
    /// Create a new builder.
    pub fn new() -> ScannerBuilder {
        ScannerBuilder::default()
    }

    /// Build a scanner from this configuration.
    pub fn build(&self) -> Scanner {
        self.scan.clone()
    }

    /// The field delimiter model.
    ///
    /// The default is `Delimiter::Whitespace`.
    ///
    /// # Panics
    ///
    /// When the delimiter byte is `\n` or `\r`, which always terminate
    /// the line instead.
    pub fn delimiter(&mut self, delim: Delimiter) -> &mut ScannerBuilder {
        if let Delimiter::Byte(b) = delim {
            assert!(
                b != b'\n' && b != b'\r',
                "delimiter cannot be a line terminator"
            );
        }
        self.scan.delim = delim;
        self
    }

    /// The comment byte. Everything from this byte to the end of the
    /// line is ignored.
    ///
    /// The default is no comment byte.
    pub fn comment(&mut self, comment: Option<u8>) -> &mut ScannerBuilder {
        self.scan.comment = comment;
        self
    }

    /// The radix for integer conversions.
    ///
    /// The default is 10.
    ///
    /// # Panics
    ///
    /// When the base is outside `2..=36`.
    pub fn base(&mut self, base: u32) -> &mut ScannerBuilder {
        assert!((2..=36).contains(&base), "integer base must be in 2..=36");
        self.scan.base = base;
        self
    }

    /// Whether unbounded float reads admit NaN and infinity.
    ///
    /// Enabled by default. When disabled, such values fail with
    /// `ScanError::NonFinite`.
    pub fn non_finite(&mut self, yes: bool) -> &mut ScannerBuilder {
        self.scan.non_finite = yes;
        self
    }
}

/// A field scanner over one line of bytes.
///
/// The scanner holds the delimiter configuration plus the per-line
/// cursor and column. It performs no I/O and never copies field data:
/// callers hand it the current line on every read and get values, or
/// byte ranges into that line, back. `begin_line` resets it for the
/// next line.
///
/// Every field read is bracketed by two checks. The pre-check skips
/// leading blanks and classifies what the cursor landed on (end of
/// line, comment, an empty delimited slot). The post-check validates
/// the separator after the consumed token, which is what rejects input
/// like `12abc` instead of silently taking the `12`.
#[derive(Clone, Debug)]
pub struct Scanner {
    delim: Delimiter,
    comment: Option<u8>,
    base: u32,
    non_finite: bool,
    pos: usize,
    col: u64,
    line_done: bool,
}

impl Default for Scanner {
    fn default() -> Scanner {
        Scanner {
            delim: Delimiter::Whitespace,
            comment: None,
            base: 10,
            non_finite: true,
            pos: 0,
            col: 0,
            line_done: false,
        }
    }
}

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

impl Scanner {
    /// Creates a new scanner with the default configuration.
    pub fn new() -> Scanner {
        Scanner::default()
    }

    /// Resets the per-line state for a freshly loaded line.
    pub fn begin_line(&mut self) {
        self.pos = 0;
        self.col = 0;
        self.line_done = false;
    }

    /// The byte cursor within the current line.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The number of fields fully consumed on the current line.
    pub fn col(&self) -> u64 {
        self.col
    }

    /// The configured delimiter model.
    pub fn delimiter(&self) -> Delimiter {
        self.delim
    }

    /// The configured comment byte, if any.
    pub fn comment(&self) -> Option<u8> {
        self.comment
    }

    /// The configured integer radix.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Whether unbounded float reads admit NaN and infinity.
    pub fn non_finite(&self) -> bool {
        self.non_finite
    }

    fn is_eol_byte(&self, b: u8) -> bool {
        b == b'\n' || b == b'\r' || self.comment == Some(b)
    }

    /// Whether `b` is separator whitespace. A blank that doubles as the
    /// explicit delimiter is never skippable: it bounds a field.
    fn is_sep_blank(&self, b: u8) -> bool {
        if let Delimiter::Byte(d) = self.delim {
            if b == d {
                return false;
            }
        }
        is_blank(b)
    }

    fn at_eol(&self, line: &[u8]) -> bool {
        match line.get(self.pos) {
            None => true,
            Some(&b) => self.is_eol_byte(b),
        }
    }

    /// Whether a whole line holds no data: nothing but blanks before
    /// the terminator, or a comment as its first non-blank byte. An
    /// explicit delimiter byte counts as data, since it bounds fields
    /// that are empty but meaningful.
    pub fn line_is_blank(&self, line: &[u8]) -> bool {
        let mut i = 0;
        while i < line.len() && self.is_sep_blank(line[i]) {
            i += 1;
        }
        match line.get(i) {
            None => true,
            Some(&b) => b == b'\n' || b == b'\r' || self.comment == Some(b),
        }
    }

    /// Pre-check: skip leading blanks, then classify what the cursor
    /// landed on. On failure the cursor stays where the blanks ended.
    fn pre_check(&mut self, line: &[u8]) -> Result<(), ScanError> {
        while self.pos < line.len() && self.is_sep_blank(line[self.pos]) {
            self.pos += 1;
        }
        if self.at_eol(line) {
            return Err(ScanError::Eol);
        }
        if let Delimiter::Byte(d) = self.delim {
            if line[self.pos] == d {
                return Err(ScanError::Missing);
            }
        }
        Ok(())
    }

    /// Post-check: advance past the token ending at `end`, then
    /// validate the separator that follows. Success consumes an
    /// explicit delimiter and counts the column.
    fn post_check(&mut self, line: &[u8], end: usize) -> Result<(), ScanError> {
        self.pos = end;
        let mut have_blank = false;
        while self.pos < line.len() && self.is_sep_blank(line[self.pos]) {
            self.pos += 1;
            have_blank = true;
        }
        if self.at_eol(line) {
            self.col += 1;
            self.line_done = true;
            return Ok(());
        }
        match self.delim {
            Delimiter::Whitespace => {
                // Without an explicit delimiter, at least one blank must
                // separate this field from further content.
                if !have_blank {
                    return Err(ScanError::Invalid);
                }
            }
            Delimiter::Byte(d) => {
                if line[self.pos] != d {
                    return Err(ScanError::Invalid);
                }
                self.pos += 1;
            }
        }
        self.col += 1;
        Ok(())
    }

    /// Reads one signed 64-bit integer within the inclusive bounds.
    ///
    /// Out-of-range values fail with `Range` carrying the nearer bound;
    /// the cursor stays at the start of the number.
    pub fn read_i64(&mut self, line: &[u8], min: i64, max: i64) -> Result<i64, ScanError> {
        self.pre_check(line)?;
        let lit = scan_int(&line[self.pos..], self.base);
        if lit.len == 0 {
            return Err(ScanError::Invalid);
        }
        // A saturated magnitude is outside any i64 bound in its sign's
        // direction; widening to i128 covers everything else exactly.
        let wide: i128 = if lit.sat {
            if lit.neg {
                i128::MIN
            } else {
                i128::MAX
            }
        } else if lit.neg {
            -(lit.mag as i128)
        } else {
            lit.mag as i128
        };
        if wide > i128::from(max) {
            return Err(ScanError::Range(Clamped::Int(max)));
        }
        if wide < i128::from(min) {
            return Err(ScanError::Range(Clamped::Int(min)));
        }
        self.post_check(line, self.pos + lit.len)?;
        Ok(wide as i64)
    }

    /// Reads one signed 32-bit integer via the 64-bit engine with
    /// widened bounds; the narrowing is lossless once the bounds hold.
    pub fn read_i32(&mut self, line: &[u8], min: i32, max: i32) -> Result<i32, ScanError> {
        self.read_i64(line, i64::from(min), i64::from(max))
            .map(|v| v as i32)
    }

    /// Reads one signed 16-bit integer via the 32-bit path.
    pub fn read_i16(&mut self, line: &[u8], min: i16, max: i16) -> Result<i16, ScanError> {
        self.read_i32(line, i32::from(min), i32::from(max))
            .map(|v| v as i16)
    }

    /// Reads one unsigned 64-bit integer within the inclusive bounds.
    ///
    /// A leading `-` fails with `Range` clamped to `min` rather than
    /// wrapping to a large positive value; any other lead byte that is
    /// not alphanumeric or `+` fails with `Invalid`.
    pub fn read_u64(&mut self, line: &[u8], min: u64, max: u64) -> Result<u64, ScanError> {
        self.pre_check(line)?;
        let b = line[self.pos];
        if !(b.is_ascii_alphanumeric() || b == b'+') {
            if b == b'-' {
                return Err(ScanError::Range(Clamped::UInt(min)));
            }
            return Err(ScanError::Invalid);
        }
        let lit = scan_int(&line[self.pos..], self.base);
        if lit.len == 0 {
            return Err(ScanError::Invalid);
        }
        if lit.sat || lit.mag > max {
            return Err(ScanError::Range(Clamped::UInt(max)));
        }
        if lit.mag < min {
            return Err(ScanError::Range(Clamped::UInt(min)));
        }
        self.post_check(line, self.pos + lit.len)?;
        Ok(lit.mag)
    }

    /// Reads one unsigned 32-bit integer via the 64-bit engine.
    pub fn read_u32(&mut self, line: &[u8], min: u32, max: u32) -> Result<u32, ScanError> {
        self.read_u64(line, u64::from(min), u64::from(max))
            .map(|v| v as u32)
    }

    /// Reads one unsigned 16-bit integer via the 32-bit path.
    pub fn read_u16(&mut self, line: &[u8], min: u16, max: u16) -> Result<u16, ScanError> {
        self.read_u32(line, u32::from(min), u32::from(max))
            .map(|v| v as u16)
    }

    /// Reads one double. NaN and infinity pass through unless the
    /// scanner was configured to reject them.
    pub fn read_f64(&mut self, line: &[u8]) -> Result<f64, ScanError> {
        let v = self.read_f64_raw(line)?;
        if !self.non_finite && !v.is_finite() {
            return Err(ScanError::NonFinite);
        }
        Ok(v)
    }

    /// Reads one double within the inclusive bounds.
    ///
    /// NaN is rejected unconditionally, since it cannot be compared
    /// against a bound. Unlike the integer paths, the cursor has
    /// already advanced past the token when a value check fails here.
    pub fn read_f64_in(&mut self, line: &[u8], min: f64, max: f64) -> Result<f64, ScanError> {
        let v = self.read_f64_raw(line)?;
        if v.is_nan() {
            return Err(ScanError::NonFinite);
        }
        if v > max {
            return Err(ScanError::Range(Clamped::Float(max)));
        }
        if v < min {
            return Err(ScanError::Range(Clamped::Float(min)));
        }
        Ok(v)
    }

    fn read_f64_raw(&mut self, line: &[u8]) -> Result<f64, ScanError> {
        self.pre_check(line)?;
        let len = float_token(&line[self.pos..]);
        if len == 0 {
            return Err(ScanError::Invalid);
        }
        let tok = &line[self.pos..self.pos + len];
        let v = match core::str::from_utf8(tok) {
            Ok(s) => match s.parse::<f64>() {
                Ok(v) => v,
                Err(_) => return Err(ScanError::Invalid),
            },
            Err(_) => return Err(ScanError::Invalid),
        };
        self.post_check(line, self.pos + len)?;
        Ok(v)
    }

    /// Locates the next string field and returns its `(start, end)`
    /// byte range in `line`.
    ///
    /// With an explicit delimiter, an empty string between delimiters
    /// is a valid field, so there is no `Missing` here; a field that
    /// ends the line without a trailing delimiter latches the line as
    /// done, and the next read fails with `Eol`. In whitespace mode the
    /// pre-check runs first, so an all-blank remainder is `Eol`, never
    /// an empty string.
    pub fn read_str_bounds(&mut self, line: &[u8]) -> Result<(usize, usize), ScanError> {
        match self.delim {
            Delimiter::Byte(d) => {
                if self.line_done {
                    return Err(ScanError::Eol);
                }
                let start = self.pos;
                let end = start + self.token_end(&line[start..]);
                self.pos = end;
                if self.pos < line.len() && line[self.pos] == d {
                    self.pos += 1;
                } else {
                    self.line_done = true;
                }
                self.col += 1;
                Ok((start, end))
            }
            Delimiter::Whitespace => {
                self.pre_check(line)?;
                let start = self.pos;
                let end = start + self.token_end(&line[start..]);
                self.pos = end;
                self.col += 1;
                Ok((start, end))
            }
        }
    }

    /// Advances over one field under the same delimiter rules,
    /// producing no value.
    pub fn skip(&mut self, line: &[u8]) -> Result<(), ScanError> {
        self.read_str_bounds(line).map(|_| ())
    }

    /// The offset of the first byte in `hay` that ends a string token
    /// under the current configuration.
    fn token_end(&self, hay: &[u8]) -> usize {
        match (self.delim, self.comment) {
            (Delimiter::Byte(d), None) => {
                memchr3(d, b'\n', b'\r', hay).unwrap_or_else(|| hay.len())
            }
            (Delimiter::Byte(d), Some(c)) => hay
                .iter()
                .position(|&b| b == d || b == b'\n' || b == b'\r' || b == c)
                .unwrap_or_else(|| hay.len()),
            (Delimiter::Whitespace, comment) => hay
                .iter()
                .position(|&b| is_blank(b) || b == b'\n' || b == b'\r' || comment == Some(b))
                .unwrap_or_else(|| hay.len()),
        }
    }
}
