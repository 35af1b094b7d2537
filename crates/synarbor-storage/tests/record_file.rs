//! Record files written to disk and read back

use synarbor_storage::{eclrec, CellId, ConnTypeId, EclRecord, StorageError};
use tempfile::tempdir;

fn records(n: u32) -> Vec<EclRecord> {
    (0..n)
        .map(|i| EclRecord::new(i * 7, CellId::new(i / 3), (i as i16) * 100 - 500, ConnTypeId::new(1 + (i % 2) as u16)))
        .collect()
}

#[test]
fn save_and_load_preserves_order_and_fields() -> Result<(), StorageError> {
    let tmp = tempdir()?;
    let path = tmp.path().join("nested").join("net.ecl");

    let written = records(25);
    eclrec::save(&path, &written)?;
    let read = eclrec::load(&path)?;

    assert_eq!(read, written);
    assert_eq!(read[4].target_cell(), CellId::new(1));
    assert_eq!(read[4].conntype_id(), ConnTypeId::new(1));
    Ok(())
}

#[test]
fn empty_file_is_valid() -> Result<(), StorageError> {
    let tmp = tempdir()?;
    let path = tmp.path().join("empty.ecl");
    eclrec::save(&path, &[])?;
    assert!(eclrec::load(&path)?.is_empty());
    Ok(())
}

#[test]
fn truncated_file_is_rejected() -> Result<(), StorageError> {
    let tmp = tempdir()?;
    let path = tmp.path().join("short.ecl");
    let image = eclrec::encode_records(&records(3));
    std::fs::write(&path, &image[..image.len() - 5])?;

    let err = eclrec::load(&path).unwrap_err();
    assert!(matches!(err, StorageError::InvalidFormat { .. }), "unexpected error: {}", err);
    Ok(())
}

#[test]
fn foreign_file_is_rejected() -> Result<(), StorageError> {
    let tmp = tempdir()?;
    let path = tmp.path().join("foreign.bin");
    std::fs::write(&path, b"VCSR\x00\x00\x00\x01")?;
    assert!(matches!(
        eclrec::load(&path),
        Err(StorageError::InvalidMagic { .. })
    ));
    Ok(())
}
