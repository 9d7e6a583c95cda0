/*!
`tabread-core` provides the slice-level engine behind the `tabread`
crate: a field scanner over one line of bytes, with a dual delimiter
model (an explicit byte, or runs of blanks) and strict bounds-checked
numeric decoding that gives every failure a distinguishable cause.

This crate performs no I/O and allocates nothing. Callers own the line
buffer and hand each line to the [`Scanner`], which tracks a cursor and
a column within it and returns typed values or byte ranges back into
the caller's line. Most users want the `tabread` crate instead, which
adds streams, line buffering and positioned errors on top of this one.

# Example

```
use tabread_core::{Delimiter, ScannerBuilder};

let mut scan = ScannerBuilder::new()
    .delimiter(Delimiter::Byte(b'\t'))
    .build();
let line = b"10\t-1\t500\n";
assert_eq!(scan.read_u32(line, 0, u32::MAX), Ok(10));
assert_eq!(scan.read_i32(line, i32::MIN, i32::MAX), Ok(-1));
assert_eq!(scan.read_i64(line, i64::MIN, i64::MAX), Ok(500));
```
*/

pub use crate::scan::{Clamped, Delimiter, ScanError, Scanner, ScannerBuilder};

mod float;
mod int;
mod scan;
