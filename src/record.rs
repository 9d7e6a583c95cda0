use std::fmt;
use std::io;
use std::str;

use bstr::ByteSlice;

use crate::error::{Code, Result};
use crate::reader::Reader;

/// A single column request for a whole-record read.
///
/// The numeric variants carry inclusive bounds; the shorthand
/// constructors build full-range requests. `Double` obeys the reader's
/// non-finite policy, while `DoubleIn` always rejects NaN. `Skip`
/// consumes a field and produces no value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldSpec {
    /// A signed 16-bit integer within inclusive bounds.
    Int16 {
        /// The smallest admissible value.
        min: i16,
        /// The largest admissible value.
        max: i16,
    },
    /// An unsigned 16-bit integer within inclusive bounds.
    UInt16 {
        /// The smallest admissible value.
        min: u16,
        /// The largest admissible value.
        max: u16,
    },
    /// A signed 32-bit integer within inclusive bounds.
    Int32 {
        /// The smallest admissible value.
        min: i32,
        /// The largest admissible value.
        max: i32,
    },
    /// An unsigned 32-bit integer within inclusive bounds.
    UInt32 {
        /// The smallest admissible value.
        min: u32,
        /// The largest admissible value.
        max: u32,
    },
    /// A signed 64-bit integer within inclusive bounds.
    Int64 {
        /// The smallest admissible value.
        min: i64,
        /// The largest admissible value.
        max: i64,
    },
    /// An unsigned 64-bit integer within inclusive bounds.
    UInt64 {
        /// The smallest admissible value.
        min: u64,
        /// The largest admissible value.
        max: u64,
    },
    /// An unbounded double; the reader's non-finite policy applies.
    Double,
    /// A double within inclusive bounds; NaN is always rejected.
    DoubleIn {
        /// The smallest admissible value.
        min: f64,
        /// The largest admissible value.
        max: f64,
    },
    /// A borrowed string field.
    Str,
    /// A field consumed and discarded.
    Skip,
}

impl FieldSpec {
    /// A full-range signed 16-bit integer.
    pub fn int16() -> FieldSpec {
        FieldSpec::Int16 { min: i16::MIN, max: i16::MAX }
    }

    /// A full-range unsigned 16-bit integer.
    pub fn uint16() -> FieldSpec {
        FieldSpec::UInt16 { min: 0, max: u16::MAX }
    }

    /// A full-range signed 32-bit integer.
    pub fn int32() -> FieldSpec {
        FieldSpec::Int32 { min: i32::MIN, max: i32::MAX }
    }

    /// A full-range unsigned 32-bit integer.
    pub fn uint32() -> FieldSpec {
        FieldSpec::UInt32 { min: 0, max: u32::MAX }
    }

    /// A full-range signed 64-bit integer.
    pub fn int64() -> FieldSpec {
        FieldSpec::Int64 { min: i64::MIN, max: i64::MAX }
    }

    /// A full-range unsigned 64-bit integer.
    pub fn uint64() -> FieldSpec {
        FieldSpec::UInt64 { min: 0, max: u64::MAX }
    }
}

/// One decoded field of a record.
///
/// `Str` borrows from the reader's line buffer and ends before the
/// next `read_line`.
#[derive(Clone, Copy, PartialEq)]
pub enum Value<'a> {
    /// A signed 16-bit integer.
    Int16(i16),
    /// An unsigned 16-bit integer.
    UInt16(u16),
    /// A signed 32-bit integer.
    Int32(i32),
    /// An unsigned 32-bit integer.
    UInt32(u32),
    /// A signed 64-bit integer.
    Int64(i64),
    /// An unsigned 64-bit integer.
    UInt64(u64),
    /// A double.
    Double(f64),
    /// A borrowed string field.
    Str(&'a [u8]),
}

impl<'a> Value<'a> {
    /// The value widened to `i64`, for the signed integer variants.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int16(v) => Some(i64::from(v)),
            Value::Int32(v) => Some(i64::from(v)),
            Value::Int64(v) => Some(v),
            _ => None,
        }
    }

    /// The value widened to `u64`, for the unsigned integer variants.
    pub fn as_uint(&self) -> Option<u64> {
        match *self {
            Value::UInt16(v) => Some(u64::from(v)),
            Value::UInt32(v) => Some(u64::from(v)),
            Value::UInt64(v) => Some(v),
            _ => None,
        }
    }

    /// The double value, if this is one.
    pub fn as_double(&self) -> Option<f64> {
        match *self {
            Value::Double(v) => Some(v),
            _ => None,
        }
    }

    /// The borrowed string bytes, if this is a string field.
    pub fn as_str(&self) -> Option<&'a [u8]> {
        match *self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl<'a> fmt::Debug for Value<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Int16(v) => write!(f, "Int16({:?})", v),
            Value::UInt16(v) => write!(f, "UInt16({:?})", v),
            Value::Int32(v) => write!(f, "Int32({:?})", v),
            Value::UInt32(v) => write!(f, "UInt32({:?})", v),
            Value::Int64(v) => write!(f, "Int64({:?})", v),
            Value::UInt64(v) => write!(f, "UInt64({:?})", v),
            Value::Double(v) => write!(f, "Double({:?})", v),
            Value::Str(s) => write!(f, "Str({:?})", s.as_bstr()),
        }
    }
}

enum Slot {
    Num(Value<'static>),
    Str(usize, usize),
}

impl<R: io::Read> Reader<R> {
    /// Decodes one field per spec, in order, from the currently loaded
    /// line.
    ///
    /// The read is fail-fast: the first field that does not convert
    /// stops the record, the error and the register point at that
    /// field, and no values are returned. `Skip` specs consume a field
    /// without contributing a value.
    ///
    /// # Example
    ///
    /// ```
    /// use tabread::{FieldSpec, Reader, Value};
    ///
    /// let mut rdr = Reader::from_string("7 carrot -2.5\n");
    /// rdr.read_line(true).unwrap();
    /// let record = rdr
    ///     .read_record(&[FieldSpec::uint32(), FieldSpec::Str, FieldSpec::Double])
    ///     .unwrap();
    /// assert_eq!(record[0], Value::UInt32(7));
    /// assert_eq!(record[1].as_str(), Some(&b"carrot"[..]));
    /// assert_eq!(record[2], Value::Double(-2.5));
    /// ```
    pub fn read_record(&mut self, specs: &[FieldSpec]) -> Result<Vec<Value>> {
        let mut slots = Vec::with_capacity(specs.len());
        for spec in specs {
            match *spec {
                FieldSpec::Int16 { min, max } => {
                    slots.push(Slot::Num(Value::Int16(self.read_i16_in(min, max)?)));
                }
                FieldSpec::UInt16 { min, max } => {
                    slots.push(Slot::Num(Value::UInt16(self.read_u16_in(min, max)?)));
                }
                FieldSpec::Int32 { min, max } => {
                    slots.push(Slot::Num(Value::Int32(self.read_i32_in(min, max)?)));
                }
                FieldSpec::UInt32 { min, max } => {
                    slots.push(Slot::Num(Value::UInt32(self.read_u32_in(min, max)?)));
                }
                FieldSpec::Int64 { min, max } => {
                    slots.push(Slot::Num(Value::Int64(self.read_i64_in(min, max)?)));
                }
                FieldSpec::UInt64 { min, max } => {
                    slots.push(Slot::Num(Value::UInt64(self.read_u64_in(min, max)?)));
                }
                FieldSpec::Double => {
                    slots.push(Slot::Num(Value::Double(self.read_f64()?)));
                }
                FieldSpec::DoubleIn { min, max } => {
                    slots.push(Slot::Num(Value::Double(self.read_f64_in(min, max)?)));
                }
                FieldSpec::Str => {
                    let (start, end) = self.read_str_span()?;
                    slots.push(Slot::Str(start, end));
                }
                FieldSpec::Skip => {
                    self.skip_field()?;
                }
            }
        }
        let line = self.raw_line();
        Ok(slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Num(v) => v,
                Slot::Str(start, end) => Value::Str(&line[start..end]),
            })
            .collect())
    }

    /// Reads one field of type `T`; see [`FromField`].
    pub fn read_field<'a, T: FromField<'a>>(&'a mut self) -> Result<T> {
        T::from_field(self)
    }

    /// Reads one field of type `T` within the inclusive bounds given.
    /// For `(f64, f64)` pairs the bounds apply componentwise.
    ///
    /// Types without meaningful bounds (string views) fail with
    /// [`Code::Unsupported`].
    pub fn read_field_in<'a, T: FromField<'a>>(&'a mut self, min: T, max: T) -> Result<T> {
        T::from_field_in(self, min, max)
    }

    /// Reads a longitude/latitude pair bounded to the obvious ranges:
    /// the first value in [-180, 180], the second in [-90, 90].
    pub fn read_coords(&mut self) -> Result<(f64, f64)> {
        self.read_field_in((-180.0, -90.0), (180.0, 90.0))
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for i16 {}
    impl Sealed for u16 {}
    impl Sealed for i32 {}
    impl Sealed for u32 {}
    impl Sealed for i64 {}
    impl Sealed for u64 {}
    impl Sealed for f64 {}
    impl<'a> Sealed for &'a [u8] {}
    impl<'a> Sealed for &'a str {}
    impl Sealed for (f64, f64) {}
}

/// A type that can be decoded from the fields of the current line.
///
/// This is the typed layer behind [`Reader::read_field`] and
/// [`Reader::read_field_in`]. It is implemented for the six integer
/// widths, `f64`, borrowed `&[u8]` and `&str` fields, and `(f64, f64)`
/// pairs (two consecutive doubles). The trait is sealed: the set of
/// conversions is part of the error taxonomy, so downstream types
/// cannot extend it.
pub trait FromField<'a>: Sized + sealed::Sealed {
    /// Decodes one value, using the type's full range.
    #[doc(hidden)]
    fn from_field<R: io::Read>(rdr: &'a mut Reader<R>) -> Result<Self>;

    /// Decodes one value within inclusive bounds.
    #[doc(hidden)]
    fn from_field_in<R: io::Read>(rdr: &'a mut Reader<R>, min: Self, max: Self) -> Result<Self>;
}

macro_rules! from_field_int {
    ($ty:ty, $read:ident, $read_in:ident) => {
        impl<'a> FromField<'a> for $ty {
            fn from_field<R: io::Read>(rdr: &'a mut Reader<R>) -> Result<$ty> {
                rdr.$read()
            }

            fn from_field_in<R: io::Read>(
                rdr: &'a mut Reader<R>,
                min: $ty,
                max: $ty,
            ) -> Result<$ty> {
                rdr.$read_in(min, max)
            }
        }
    };
}

from_field_int!(i16, read_i16, read_i16_in);
from_field_int!(u16, read_u16, read_u16_in);
from_field_int!(i32, read_i32, read_i32_in);
from_field_int!(u32, read_u32, read_u32_in);
from_field_int!(i64, read_i64, read_i64_in);
from_field_int!(u64, read_u64, read_u64_in);
from_field_int!(f64, read_f64, read_f64_in);

impl<'a> FromField<'a> for &'a [u8] {
    fn from_field<R: io::Read>(rdr: &'a mut Reader<R>) -> Result<&'a [u8]> {
        rdr.read_str()
    }

    fn from_field_in<R: io::Read>(
        rdr: &'a mut Reader<R>,
        _min: &'a [u8],
        _max: &'a [u8],
    ) -> Result<&'a [u8]> {
        Err(rdr.fail(Code::Unsupported))
    }
}

impl<'a> FromField<'a> for &'a str {
    fn from_field<R: io::Read>(rdr: &'a mut Reader<R>) -> Result<&'a str> {
        let (start, end) = rdr.read_str_span()?;
        if str::from_utf8(&rdr.raw_line()[start..end]).is_err() {
            return Err(rdr.fail(Code::Invalid));
        }
        // Validated just above.
        str::from_utf8(&rdr.raw_line()[start..end]).map_err(|_| unreachable!())
    }

    fn from_field_in<R: io::Read>(
        rdr: &'a mut Reader<R>,
        _min: &'a str,
        _max: &'a str,
    ) -> Result<&'a str> {
        Err(rdr.fail(Code::Unsupported))
    }
}

impl<'a> FromField<'a> for (f64, f64) {
    fn from_field<R: io::Read>(rdr: &'a mut Reader<R>) -> Result<(f64, f64)> {
        let x = rdr.read_f64()?;
        let y = rdr.read_f64()?;
        Ok((x, y))
    }

    fn from_field_in<R: io::Read>(
        rdr: &'a mut Reader<R>,
        min: (f64, f64),
        max: (f64, f64),
    ) -> Result<(f64, f64)> {
        let x = rdr.read_f64_in(min.0, max.0)?;
        let y = rdr.read_f64_in(min.1, max.1)?;
        Ok((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldSpec, Value};
    use crate::error::Code;
    use crate::reader::{Reader, ReaderBuilder};
    use tabread_core::Delimiter;

    fn tabbed(data: &str) -> Reader<std::io::Cursor<Vec<u8>>> {
        ReaderBuilder::new()
            .delimiter(Delimiter::Byte(b'\t'))
            .from_reader(std::io::Cursor::new(data.as_bytes().to_vec()))
    }

    #[test]
    fn record_happy_path() {
        let mut rdr = tabbed("10\t-1\t500\n");
        assert!(rdr.read_line(true).unwrap());
        let rec = rdr
            .read_record(&[
                FieldSpec::uint32(),
                FieldSpec::int32(),
                FieldSpec::int64(),
            ])
            .unwrap();
        assert_eq!(
            rec,
            vec![Value::UInt32(10), Value::Int32(-1), Value::Int64(500)]
        );
    }

    #[test]
    fn record_fail_fast_localizes() {
        let mut rdr = tabbed("10\tbad\t500\n");
        assert!(rdr.read_line(true).unwrap());
        let err = rdr
            .read_record(&[
                FieldSpec::uint32(),
                FieldSpec::int32(),
                FieldSpec::int64(),
            ])
            .unwrap_err();
        assert_eq!(err.code(), Code::Invalid);
        // One field converted before the failure.
        assert_eq!(err.position().map(|p| p.col()), Some(1));
        assert_eq!(rdr.last_error(), Code::Invalid);
    }

    #[test]
    fn record_skip_produces_no_value() {
        let mut rdr = tabbed("1\tnoise\t2\n");
        assert!(rdr.read_line(true).unwrap());
        let rec = rdr
            .read_record(&[FieldSpec::int64(), FieldSpec::Skip, FieldSpec::int64()])
            .unwrap();
        assert_eq!(rec, vec![Value::Int64(1), Value::Int64(2)]);
    }

    #[test]
    fn record_strings_borrow_the_line() {
        let mut rdr = tabbed("a\t\tc\n");
        assert!(rdr.read_line(true).unwrap());
        let rec = rdr
            .read_record(&[FieldSpec::Str, FieldSpec::Str, FieldSpec::Str])
            .unwrap();
        assert_eq!(rec[0].as_str(), Some(&b"a"[..]));
        assert_eq!(rec[1].as_str(), Some(&b""[..]));
        assert_eq!(rec[2].as_str(), Some(&b"c"[..]));
    }

    #[test]
    fn record_bounded_specs() {
        let mut rdr = tabbed("5\t0.5\n");
        assert!(rdr.read_line(true).unwrap());
        let rec = rdr
            .read_record(&[
                FieldSpec::Int32 { min: 0, max: 10 },
                FieldSpec::DoubleIn { min: 0.0, max: 1.0 },
            ])
            .unwrap();
        assert_eq!(rec, vec![Value::Int32(5), Value::Double(0.5)]);

        let mut rdr = tabbed("15\t0.5\n");
        assert!(rdr.read_line(true).unwrap());
        let err = rdr
            .read_record(&[
                FieldSpec::Int32 { min: 0, max: 10 },
                FieldSpec::DoubleIn { min: 0.0, max: 1.0 },
            ])
            .unwrap_err();
        assert_eq!(err.code(), Code::Range);
        assert_eq!(err.clamped().and_then(|c| c.as_int()), Some(10));
    }

    #[test]
    fn generic_reads() {
        let mut rdr = Reader::from_string("7 -3 2.5 word\n");
        assert!(rdr.read_line(true).unwrap());
        assert_eq!(rdr.read_field::<u32>().unwrap(), 7);
        assert_eq!(rdr.read_field::<i64>().unwrap(), -3);
        assert_eq!(rdr.read_field::<f64>().unwrap(), 2.5);
        assert_eq!(rdr.read_field::<&str>().unwrap(), "word");
    }

    #[test]
    fn generic_bounded_read() {
        let mut rdr = Reader::from_string("42\n");
        assert!(rdr.read_line(true).unwrap());
        assert_eq!(rdr.read_field_in::<u32>(0, 100).unwrap(), 42);
    }

    #[test]
    fn bounded_strings_are_unsupported() {
        let mut rdr = Reader::from_string("a\n");
        assert!(rdr.read_line(true).unwrap());
        let err = rdr.read_field_in::<&[u8]>(b"a", b"z").unwrap_err();
        assert_eq!(err.code(), Code::Unsupported);
        assert_eq!(rdr.last_error(), Code::Unsupported);
    }

    #[test]
    fn coordinate_pairs() {
        let mut rdr = Reader::from_string("12.5 45.0\n200.0 10.0\n");
        assert!(rdr.read_line(true).unwrap());
        assert_eq!(rdr.read_coords().unwrap(), (12.5, 45.0));
        assert!(rdr.read_line(true).unwrap());
        let err = rdr.read_coords().unwrap_err();
        assert_eq!(err.code(), Code::Range);
    }

    #[test]
    fn value_accessors() {
        assert_eq!(Value::Int16(-4).as_int(), Some(-4));
        assert_eq!(Value::UInt64(9).as_uint(), Some(9));
        assert_eq!(Value::Double(1.5).as_double(), Some(1.5));
        assert_eq!(Value::Int16(-4).as_uint(), None);
        assert_eq!(Value::Str(b"x").as_str(), Some(&b"x"[..]));
    }

    #[test]
    fn value_debug_renders_strings() {
        let v = Value::Str(b"abc");
        assert_eq!(format!("{:?}", v), "Str(\"abc\")");
    }
}
