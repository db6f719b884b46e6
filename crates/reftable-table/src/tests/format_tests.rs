use crate::format::{read_footer, Footer, TABLE_MAGIC};
use std::io::Cursor;

#[test]
fn footer_round_trips_through_write_and_read() {
    let footer = Footer {
        hash_format_id: 0x7368_6131,
        min_update_index: 3,
        max_update_index: 9,
        ref_count: 2,
        log_count: 1,
        bloom_offset: 10,
        ref_index_offset: 20,
        log_index_offset: 30,
    };

    let mut buf = Vec::new();
    footer.write_to(&mut buf).unwrap();

    let mut cursor = Cursor::new(buf);
    let parsed = read_footer(&mut cursor).unwrap();
    assert_eq!(parsed, footer);
}

#[test]
fn read_footer_rejects_wrong_magic() {
    let mut buf = vec![0u8; crate::format::FOOTER_BYTES as usize];
    let len = buf.len();
    buf[len - 4..].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
    let mut cursor = Cursor::new(buf);
    let err = read_footer(&mut cursor).unwrap_err();
    assert!(err.to_string().contains("magic"));
}

#[test]
fn read_footer_rejects_truncated_file() {
    let mut cursor = Cursor::new(vec![0u8; 4]);
    assert!(read_footer(&mut cursor).is_err());
}

#[test]
fn magic_is_ascii_rtb1() {
    assert_eq!(&TABLE_MAGIC.to_le_bytes(), b"1BTR");
}
