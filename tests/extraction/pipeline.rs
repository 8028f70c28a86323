use bunfs_extract::graph::builder::{ContainerBuilder, ModuleEntry};
use bunfs_extract::graph::{DescriptorLayout, Loader};
use bunfs_extract::output::{write_graph, WriteOptions, MANIFEST_FILE};
use bunfs_extract::{extract_file, ExtractConfig, ModuleClass};
use std::fs;

use crate::common::{elf_with, index_and_addon, macho_with, write_temp};

#[test]
fn entry_script_and_addon_from_disk() {
    let file = write_temp(&elf_with(&index_and_addon().build().unwrap()));
    let graph = extract_file(&ExtractConfig::new(file.path())).unwrap();

    assert_eq!(graph.modules.len(), 2);
    let script = &graph.modules[0];
    assert_eq!(script.path, "index.js");
    assert_eq!(&script.content[..], b"console.log(1)");
    assert_eq!(script.kind, ModuleClass::Text);
    assert!(script.stripped_prefix);

    let addon = &graph.modules[1];
    assert_eq!(addon.path, "addon.node");
    assert_eq!(&addon.content[..], &[0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(addon.kind, ModuleClass::Binary);
}

#[test]
fn text_only_drops_binaries() {
    let file = write_temp(&macho_with(&index_and_addon().build().unwrap()));
    let config = ExtractConfig::new(file.path()).with_skip_binary_modules(true);
    let graph = extract_file(&config).unwrap();

    let paths: Vec<_> = graph.modules.iter().map(|m| m.path.as_str()).collect();
    assert_eq!(paths, ["index.js"]);
    // Footer still reports everything the container holds.
    assert_eq!(graph.footer.module_count, 2);
}

#[test]
fn modules_come_back_in_index_order() {
    let mut builder = ContainerBuilder::new();
    let mut expected = Vec::new();
    for i in 0..100 {
        let path = format!("/$bunfs/root/chunk-{i:03}.js");
        let body = format!("export const n = {i};").into_bytes();
        builder = builder.module(ModuleEntry::new(path.clone(), body.clone(), Loader::Js));
        expected.push((path, body));
    }
    // 100 modules crosses the default fan-out threshold.
    let file = write_temp(&elf_with(&builder.build().unwrap()));
    let graph = extract_file(&ExtractConfig::new(file.path())).unwrap();

    assert_eq!(graph.modules.len(), expected.len());
    for (i, (module, (path, body))) in graph.modules.iter().zip(&expected).enumerate() {
        assert_eq!(module.index, i);
        assert_eq!(&module.path, path);
        assert_eq!(&module.content[..], &body[..]);
    }
}

#[test]
fn older_layouts_decode_through_the_host() {
    for layout in [
        DescriptorLayout::V1,
        DescriptorLayout::V1Aligned,
        DescriptorLayout::V2,
    ] {
        let payload = index_and_addon().layout(layout).build().unwrap();
        let file = write_temp(&elf_with(&payload));
        let graph = extract_file(&ExtractConfig::new(file.path())).unwrap();
        assert_eq!(graph.footer.layout, layout);
        assert_eq!(&graph.modules[0].content[..], b"console.log(1)");
    }
}

#[test]
fn nine_narrow_records_are_not_read_as_seven_wide_ones() {
    let mut builder = ContainerBuilder::new().layout(DescriptorLayout::V1);
    for i in 0..9 {
        builder = builder.module(ModuleEntry::new(format!("m{i}.js"), vec![b'a' + i], Loader::Js));
    }
    // 9 * 28 = 252 = 7 * 36
    let file = write_temp(&elf_with(&builder.build().unwrap()));
    let graph = extract_file(&ExtractConfig::new(file.path())).unwrap();

    assert_eq!(graph.footer.layout, DescriptorLayout::V1);
    assert_eq!(graph.modules.len(), 9);
    assert_eq!(graph.modules[8].path, "m8.js");
    assert_eq!(&graph.modules[8].content[..], b"i");
}

#[test]
fn config_file_limits_are_applied() {
    let file = write_temp(&elf_with(&index_and_addon().build().unwrap()));
    let json = r#"{ "io": { "max_file_size": 16 } }"#;
    let mut config = ExtractConfig::from_json_str(json).unwrap();
    config.source_path = file.path().to_path_buf();

    let err = extract_file(&config).unwrap_err();
    assert_eq!(err.stage(), bunfs_extract::Stage::Read);
}

#[test]
fn writes_extracted_tree() {
    let payload = ContainerBuilder::new()
        .module(ModuleEntry::new(
            "/$bunfs/root/cli",
            b"#!/usr/bin/env bun\nmain()".to_vec(),
            Loader::Js,
        ))
        .module(ModuleEntry::new(
            "/$bunfs/root/vendor/rg.node",
            vec![0x7f, b'E', b'L', b'F'],
            Loader::File,
        ))
        .build()
        .unwrap();
    let file = write_temp(&elf_with(&payload));
    let graph = extract_file(&ExtractConfig::new(file.path())).unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("2.0.1");
    let manifest = write_graph(&graph, &out, &WriteOptions::default()).unwrap();

    assert_eq!(fs::read(out.join("cli.js")).unwrap(), b"#!/usr/bin/env bun\nmain()");
    assert_eq!(fs::read(out.join("vendor/rg.node")).unwrap(), [0x7f, b'E', b'L', b'F']);
    assert!(out.join(MANIFEST_FILE).exists());
    assert_eq!(manifest.modules[1].kind, ModuleClass::Binary);
    assert_eq!(manifest.format, "ELF");
}
