use bunfs_extract::{locate, ExecutableImage, ExtractError, GraphConfig, HostFormat};

use crate::common::{coff_with, elf_with, fat_macho, host_with_section, index_and_addon, macho_with};
use object::BinaryFormat;

fn located_payload(image: &ExecutableImage) -> Vec<u8> {
    let span = locate(image).expect("locate section");
    image.slice(span.range()).expect("span inside image").to_vec()
}

#[test]
fn finds_section_in_each_host_format() {
    let payload = index_and_addon().build().unwrap();
    let hosts = [
        (elf_with(&payload), HostFormat::Elf),
        (macho_with(&payload), HostFormat::MachO),
        (coff_with(&payload), HostFormat::Coff),
    ];
    for (bytes, format) in hosts {
        let image = ExecutableImage::from_bytes(bytes);
        let span = locate(&image).unwrap();
        assert_eq!(span.format, format);
        assert_eq!(span.size, payload.len() as u64);
        assert_eq!(located_payload(&image), payload, "{format}");

        let graph = bunfs_extract::extract_image(&image, &GraphConfig::default()).unwrap();
        let paths: Vec<_> = graph.modules.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, ["index.js", "addon.node"], "{format}");
    }
}

#[test]
fn missing_section_is_container_not_found() {
    let image = ExecutableImage::from_bytes(host_with_section(
        BinaryFormat::Elf,
        b"",
        b".rodata",
        b"---- Bun! ----",
    ));
    let err = locate(&image).unwrap_err();
    assert!(err.is_container_missing());
    assert!(matches!(
        err,
        ExtractError::ContainerNotFound {
            format: HostFormat::Elf,
            ..
        }
    ));
}

#[test]
fn macho_section_must_sit_in_bun_segment() {
    let payload = index_and_addon().build().unwrap();
    let image = ExecutableImage::from_bytes(host_with_section(
        BinaryFormat::MachO,
        b"__DATA",
        b"__bun",
        &payload,
    ));
    assert!(locate(&image).unwrap_err().is_container_missing());
}

#[test]
fn universal_binary_searches_every_slice() {
    let payload = index_and_addon().build().unwrap();
    let plain = host_with_section(BinaryFormat::MachO, b"__DATA", b"__data", &[0; 32]);
    let carrying = macho_with(&payload);
    let fat = fat_macho(&[plain, carrying]);

    let image = ExecutableImage::from_bytes(fat);
    let span = locate(&image).unwrap();
    assert_eq!(span.format, HostFormat::MachO);
    assert!(span.offset > 4096, "offset {} is not image-relative", span.offset);
    assert_eq!(located_payload(&image), payload);
}

#[test]
fn unrecognised_bytes_are_malformed() {
    let image = ExecutableImage::from_bytes(b"#!/bin/sh\necho not an executable\n".to_vec());
    let err = locate(&image).unwrap_err();
    assert!(matches!(err, ExtractError::MalformedExecutable(_)));
    assert!(!err.is_container_missing());
}
