#![allow(unused)]

pub use pretty_assertions::{assert_eq, assert_ne, assert_str_eq};
use std::cmp::{max, min};

fn write_byte_row(
    f: &mut dyn std::io::Write,
    offset: usize,
    bytes_per_row: usize,
    bytes: &[u8],
) -> std::io::Result<()> {
    write!(f, "{offset:08X}")?;

    for (index, byte) in bytes.iter().enumerate() {
        if index % 8 == 0 {
            write!(f, " ")?;
        }

        write!(f, " {byte:02X}")?;
    }

    let bytes_per_row = max(bytes_per_row, bytes.len());
    for index in bytes.len()..bytes_per_row {
        if index % 8 == 0 {
            write!(f, " ")?;
        }

        write!(f, "   ")?;
    }

    writeln!(f)
}

fn write_byte_rows(
    f: &mut dyn std::io::Write,
    center_offset: usize,
    additional_rows: usize,
    bytes_per_row: usize,
    bytes: &[u8],
) -> std::io::Result<()> {
    let center_row_num = center_offset / bytes_per_row;
    let start_row = center_row_num - min(center_row_num, additional_rows);
    // Partial rows at the end count as a full row
    let last_row = min(
        center_row_num + additional_rows + 1,
        bytes.len() / bytes_per_row + 1,
    );

    for row in start_row..last_row {
        let offset_start = row * bytes_per_row;
        let offset_end = min(bytes.len(), offset_start + bytes_per_row);
        if offset_start >= offset_end {
            break;
        }

        write_byte_row(
            f,
            offset_start,
            bytes_per_row,
            &bytes[offset_start..offset_end],
        )?;
    }

    Ok(())
}

/// Compare two byte buffers, printing a hex dump around the first difference.
///
/// Offsets are grouped in 8 byte words, the width of a relative pointer.
pub fn assert_bytes_eq(a: &[u8], b: &[u8], context: &str) {
    const WIDTH: usize = 16;
    const EXTRA_ROWS: usize = 4;

    let Some(index) = (0..max(a.len(), b.len())).find(|index| a.get(*index) != b.get(*index))
    else {
        return;
    };

    let mut a_bytes_buf = Vec::new();
    write_byte_rows(&mut a_bytes_buf, index, EXTRA_ROWS, WIDTH, a).unwrap();
    let str_a = String::from_utf8(a_bytes_buf).unwrap();

    let mut b_bytes_buf = Vec::new();
    write_byte_rows(&mut b_bytes_buf, index, EXTRA_ROWS, WIDTH, b).unwrap();
    let str_b = String::from_utf8(b_bytes_buf).unwrap();

    eprintln!("{context}: first difference at offset {index:#X}");
    assert_str_eq!(str_a, str_b);
    // Equal dumps with different lengths
    assert_eq!(a.len(), b.len(), "{context}");
}

#[test]
fn byte_rows() {
    let bytes: Vec<u8> = (0..20).collect();
    let mut buf = Vec::new();
    write_byte_rows(&mut buf, 0, 1, 16, &bytes).unwrap();
    let dump = String::from_utf8(buf).unwrap();
    let mut lines = dump.lines().map(str::trim_end);
    assert_eq!(
        lines.next(),
        Some("00000000  00 01 02 03 04 05 06 07  08 09 0A 0B 0C 0D 0E 0F")
    );
    assert_eq!(lines.next(), Some("00000010  10 11 12 13"));
    assert_eq!(lines.next(), None);

    assert_bytes_eq(&bytes, &bytes, "identical");
}
