use super::*;
use tempfile::TempDir;

/// The ECMA standard public key
const ECMA_KEY: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0];

/// A PE32 image with headers only: no sections and no CLI header
fn native_image() -> Vec<u8> {
    let mut image = vec![0u8; 0x40];
    image[0..2].copy_from_slice(b"MZ");
    image[0x3c..0x40].copy_from_slice(&0x40u32.to_le_bytes());

    image.extend_from_slice(b"PE\0\0");
    image.extend_from_slice(&0x014cu16.to_le_bytes()); // i386
    image.extend_from_slice(&0u16.to_le_bytes()); // sections
    image.extend_from_slice(&[0u8; 12]);
    image.extend_from_slice(&224u16.to_le_bytes()); // optional header size
    image.extend_from_slice(&0x0102u16.to_le_bytes());

    let mut optional = vec![0u8; 224];
    optional[0..2].copy_from_slice(&0x010bu16.to_le_bytes());
    optional[32..36].copy_from_slice(&0x1000u32.to_le_bytes()); // section alignment
    optional[36..40].copy_from_slice(&0x200u32.to_le_bytes()); // file alignment
    optional[56..60].copy_from_slice(&0x1000u32.to_le_bytes()); // image size
    optional[60..64].copy_from_slice(&0x200u32.to_le_bytes()); // headers size
    optional[92..96].copy_from_slice(&16u32.to_le_bytes()); // data directories
    image.extend_from_slice(&optional);
    image.resize(0x200, 0);
    image
}

#[test]
fn test_public_key_token_of_ecma_key() {
    assert_eq!(public_key_token(&ECMA_KEY), "b77a5c561934e089");
}

#[test]
fn test_unsigned_neutral_row() {
    let identity = identity_from_row("Foo", [1, 2, 3, 4567], None, None);
    assert_eq!(identity.name, "Foo");
    assert_eq!(identity.version, "1.2.3.4567");
    assert_eq!(identity.culture, None);
    assert_eq!(identity.public_key_token, None);
    assert_eq!(
        identity.full_name(),
        "Foo, Version=1.2.3.4567, Culture=neutral, PublicKeyToken=null"
    );
}

#[test]
fn test_signed_row_with_culture() {
    let identity = identity_from_row("Foo.resources", [4, 0, 0, 0], Some("de-DE"), Some(&ECMA_KEY));
    assert_eq!(
        identity.full_name(),
        "Foo.resources, Version=4.0.0.0, Culture=de-DE, PublicKeyToken=b77a5c561934e089"
    );
}

#[test]
fn test_empty_culture_and_key_are_neutral_and_unsigned() {
    let identity = identity_from_row("Foo", [1, 0, 0, 0], Some(""), Some(&[]));
    assert_eq!(identity.culture, None);
    assert_eq!(identity.public_key_token, None);
}

#[test]
fn test_non_pe_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("FakeAssembly.dll");
    std::fs::write(&path, b"this is not an assembly").unwrap();
    assert!(read_identity(&path).is_err());

    assert!(matches!(
        read_identity(&temp.path().join("Missing.dll")),
        Err(MetadataError::Io { .. })
    ));
    assert!(identity_from_image(Vec::new()).is_err());
}

#[test]
fn test_native_image_has_no_identity() {
    assert!(identity_from_image(native_image()).is_err());
}

#[test]
fn test_truncated_image_is_rejected() {
    let mut image = native_image();
    image.truncate(0x50);
    assert!(identity_from_image(image).is_err());
}
