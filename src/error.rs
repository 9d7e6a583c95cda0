use std::error;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::result;

use bstr::BString;
use tabread_core::{Clamped, ScanError};

/// A type alias for `Result<T, tabread::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// The outcome code of the most recent reader operation.
///
/// Exactly one code holds at any time. The reader keeps the code of its
/// last operation in a register that every operation overwrites
/// (success clears it to `Ok`), so a caller that ignores individual
/// results can still ask what happened afterwards.
///
/// `Eof` and `Eol` are benign: they mark structural exhaustion, not bad
/// data. `Range` is recoverable, since the accompanying error carries a
/// usable clamped value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Code {
    /// No error.
    Ok,
    /// The stream is exhausted.
    Eof,
    /// No more fields on the current line.
    Eol,
    /// An explicit delimiter with no value in front of it.
    Missing,
    /// A malformed token, or a token not followed by a valid separator.
    Invalid,
    /// A numeric value outside the requested inclusive bounds.
    Range,
    /// NaN or infinity under a policy that rejects them.
    NonFinite,
    /// A conversion the requested type does not support.
    Unsupported,
    /// The instance has given up its stream and buffer.
    Invalidated,
    /// Opening a file for reading failed.
    Open,
    /// Reading from the underlying stream failed.
    Read,
}

impl Code {
    /// A fixed, human-readable phrase for this code.
    #[allow(unreachable_patterns)]
    pub fn describe(&self) -> &'static str {
        match *self {
            Code::Ok => "no error",
            Code::Eof => "end of file",
            Code::Eol => "unexpected end of line",
            Code::Missing => "missing value",
            Code::Invalid => "invalid value",
            Code::Range => "overflow or underflow",
            Code::NonFinite => "NaN or infinity read",
            Code::Unsupported => "unsupported conversion requested",
            Code::Invalidated => "invalidated instance",
            Code::Open => "error opening file",
            Code::Read => "error reading input",
            _ => "unknown error",
        }
    }

    /// Returns true for the codes that mark normal structural
    /// exhaustion rather than a failure.
    pub fn is_benign(&self) -> bool {
        match *self {
            Code::Ok | Code::Eof | Code::Eol => true,
            _ => false,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A position in the input, as tracked by the reader.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Position {
    line: u64,
    pos: usize,
    col: u64,
}

impl Position {
    pub(crate) fn new(line: u64, pos: usize, col: u64) -> Position {
        Position { line, pos, col }
    }

    /// The 1-based physical line number (0 before the first line).
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The 0-based byte offset within the line.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The 0-based count of fields fully converted on the line.
    pub fn col(&self) -> u64 {
        self.col
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "line {}, position {} / column {}",
            self.line, self.pos, self.col
        )
    }
}

/// An error that can occur when reading or writing tabular data.
#[derive(Debug)]
pub enum Error {
    /// An I/O error from the underlying stream.
    Io(io::Error),
    /// A file could not be opened.
    Open {
        /// The path that failed to open.
        path: PathBuf,
        /// The underlying I/O error.
        err: io::Error,
    },
    /// A field failed to scan or convert.
    Field {
        /// The code classifying the failure.
        code: Code,
        /// Where the failure happened.
        pos: Position,
        /// For `Code::Range`, the value clamped to the violated bound.
        clamped: Option<Clamped>,
    },
    /// A field that cannot be written without corrupting the table:
    /// it contains the delimiter, a line terminator or the comment
    /// byte, and there is no quoting to protect it.
    Unwritable {
        /// The offending field.
        field: BString,
    },
}

impl Error {
    /// The register code corresponding to this error.
    pub fn code(&self) -> Code {
        match *self {
            Error::Io(_) => Code::Read,
            Error::Open { .. } => Code::Open,
            Error::Field { code, .. } => code,
            Error::Unwritable { .. } => Code::Invalid,
        }
    }

    /// The position of the failing field, if this is a field error.
    pub fn position(&self) -> Option<Position> {
        match *self {
            Error::Field { pos, .. } => Some(pos),
            _ => None,
        }
    }

    /// The clamped result of a range failure, if any.
    pub fn clamped(&self) -> Option<Clamped> {
        match *self {
            Error::Field { clamped, .. } => clamped,
            _ => None,
        }
    }

    pub(crate) fn field(code: Code, pos: Position) -> Error {
        Error::Field { code, pos, clamped: None }
    }

    pub(crate) fn scan(err: ScanError, pos: Position) -> Error {
        let (code, clamped) = code_of(err);
        Error::Field { code, pos, clamped }
    }
}

/// Maps a slice-level scan failure to its register code and clamp.
pub(crate) fn code_of(err: ScanError) -> (Code, Option<Clamped>) {
    match err {
        ScanError::Eol => (Code::Eol, None),
        ScanError::Missing => (Code::Missing, None),
        ScanError::Invalid => (Code::Invalid, None),
        ScanError::Range(c) => (Code::Range, Some(c)),
        ScanError::NonFinite => (Code::NonFinite, None),
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::Open { ref err, .. } => Some(err),
            Error::Field { .. } => None,
            Error::Unwritable { .. } => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => err.fmt(f),
            Error::Open { ref path, ref err } => {
                write!(f, "error opening {}: {}", path.display(), err)
            }
            Error::Field { code, ref pos, clamped } => {
                write!(f, "{}: {}", pos, code.describe())?;
                if let Some(c) = clamped {
                    write!(f, " (clamped to {})", c)?;
                }
                Ok(())
            }
            Error::Unwritable { ref field } => {
                write!(f, "field cannot be written without quoting: {}", field)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Code, Error, Position};
    use tabread_core::{Clamped, ScanError};

    #[test]
    fn describe_is_fixed() {
        assert_eq!(Code::Ok.describe(), "no error");
        assert_eq!(Code::Eof.describe(), "end of file");
        assert_eq!(Code::Range.describe(), "overflow or underflow");
        assert_eq!(Code::Invalidated.describe(), "invalidated instance");
    }

    #[test]
    fn benign_codes() {
        assert!(Code::Ok.is_benign());
        assert!(Code::Eof.is_benign());
        assert!(Code::Eol.is_benign());
        assert!(!Code::Invalid.is_benign());
        assert!(!Code::Range.is_benign());
    }

    #[test]
    fn field_error_display() {
        let err = Error::scan(
            ScanError::Range(Clamped::Int(100)),
            Position::new(3, 7, 2),
        );
        assert_eq!(
            err.to_string(),
            "line 3, position 7 / column 2: overflow or underflow \
             (clamped to 100)"
        );
        assert_eq!(err.code(), Code::Range);
        assert_eq!(err.clamped(), Some(Clamped::Int(100)));
        assert_eq!(err.position().map(|p| p.line()), Some(3));
    }
}
