/*!
The `tabread` crate reads delimited numeric text (TSV, CSV-like, or
whitespace-aligned tables) from a byte stream and converts fields to
typed values with strict validation, giving each failure a precise,
distinguishable cause. Where permissive scanning interfaces silently
truncate `12abc` to `12` or wrap `-1` to a huge unsigned value, this
reader classifies: malformed token, missing value, out-of-range value
(with the clamped bound still delivered), disallowed NaN/infinity, end
of line, end of file.

Reading is strictly forward and line-by-line: pull a line with
[`Reader::read_line`], then convert its fields in order, either one by
one (`read_u32`, `read_f64_in`, `read_str`, ...), generically
([`Reader::read_field`]), or as a whole fail-fast record
([`Reader::read_record`]). Every operation records its outcome code and
exact line/position/column coordinates, so a bad byte in a gigabyte of
input produces a one-line diagnostic pointing straight at it.

Fields are separated by runs of blanks by default, or by one explicit
byte ([`Delimiter::Byte`]), in which case empty fields exist and are
meaningful for strings. There is no support for quoting; inputs needing
RFC 4180 quoting are out of scope.

The slice-level engine lives in the `tabread-core` crate; this crate
adds streams, the reusable line buffer and positioned errors.

# Example

Summing a tab-separated ledger while refusing malformed rows:

```
use tabread::{Delimiter, ReaderBuilder};

let data = "\
## id    amount
1\t250
2\t-125
3\t400
";
let mut rdr = ReaderBuilder::new()
    .delimiter(Delimiter::Byte(b'\t'))
    .comment(Some(b'#'))
    .from_reader(data.as_bytes());

let mut total = 0i64;
while rdr.read_line(true)? {
    let _id = rdr.read_u32()?;
    total += rdr.read_i64()?;
}
assert_eq!(total, 525);
# Ok::<(), tabread::Error>(())
```
*/

pub use tabread_core::{Clamped, Delimiter};

pub use crate::error::{Code, Error, Position, Result};
pub use crate::reader::{Reader, ReaderBuilder};
pub use crate::record::{FieldSpec, FromField, Value};
pub use crate::writer::{Writer, WriterBuilder};

mod error;
mod reader;
mod record;
mod writer;
