use bunfs_extract::graph::builder::{ContainerBuilder, ModuleEntry};
use bunfs_extract::graph::{parse_footer, Loader};
use bunfs_extract::{extract_file, locate, ExecutableImage, ExtractConfig, ExtractError, Stage};

use crate::common::{elf_with, index_and_addon, patch_u32, write_temp};

fn run(host: &[u8]) -> bunfs_extract::Result<bunfs_extract::ModuleGraph> {
    let file = write_temp(host);
    extract_file(&ExtractConfig::new(file.path()))
}

#[test]
fn truncated_trailer_is_rejected() {
    let mut payload = index_and_addon().build().unwrap();
    payload.pop();
    let host = elf_with(&payload);

    let span = locate(&ExecutableImage::from_bytes(host.clone())).unwrap();
    let err = run(&host).unwrap_err();
    match err {
        ExtractError::BadTrailer { offset, .. } => assert_eq!(offset, span.end() - 16),
        other => panic!("expected BadTrailer, got {other:?}"),
    }
}

#[test]
fn overflowing_content_pointer_aborts_whole_run() {
    let host = elf_with(&index_and_addon().build().unwrap());
    let image = ExecutableImage::from_bytes(host.clone());
    let span = locate(&image).unwrap();
    let footer = parse_footer(&image, &span).unwrap();

    // Length half of the second record's contents pointer.
    let at = (span.offset + footer.metadata_region.offset) as usize
        + footer.layout.record_size()
        + 12;
    let mut host = host;
    patch_u32(&mut host, at, u32::MAX);

    let err = run(&host).unwrap_err();
    assert!(matches!(err, ExtractError::CorruptDescriptor { index: 1, .. }));
    assert_eq!(err.stage(), Stage::Index);
}

#[test]
fn unknown_loader_tag_is_corrupt() {
    let payload = ContainerBuilder::new()
        .module(ModuleEntry::new("a.js", b"1".to_vec(), Loader::Js))
        .module(ModuleEntry::new("b.bin", vec![0], Loader::File).with_loader_tag(200))
        .build()
        .unwrap();
    let err = run(&elf_with(&payload)).unwrap_err();
    assert!(matches!(err, ExtractError::CorruptDescriptor { index: 1, .. }));
}

#[test]
fn byte_count_past_section_start_is_corrupt_footer() {
    let payload = index_and_addon().build().unwrap();
    let mut host = elf_with(&payload);
    let span = locate(&ExecutableImage::from_bytes(host.clone())).unwrap();
    let footer_at = (span.end() - 48) as usize;
    host[footer_at..footer_at + 8].copy_from_slice(&(span.size * 2).to_le_bytes());

    let err = run(&host).unwrap_err();
    assert!(matches!(err, ExtractError::CorruptFooter(_)));
}

#[test]
fn non_utf8_path_is_reported() {
    let payload = ContainerBuilder::new()
        .module(ModuleEntry::new_raw_path(vec![b'a', 0xff, b'b'], b"x".to_vec(), Loader::Js))
        .build()
        .unwrap();
    let err = run(&elf_with(&payload)).unwrap_err();
    assert!(matches!(err, ExtractError::InvalidPathEncoding { index: 0, .. }));
    assert_eq!(err.stage(), Stage::Extract);
}

#[test]
fn leading_junk_and_section_tail_are_ignored() {
    let payload = index_and_addon()
        .leading_bytes(b"padding before the data region".to_vec())
        .build()
        .unwrap();
    let graph = run(&elf_with(&payload)).unwrap();
    assert_eq!(graph.modules.len(), 2);
    assert_eq!(graph.footer.data_region.offset, 30);
}
