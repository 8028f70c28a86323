#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = bunfs_extract::ModuleGraph::from_section(data.to_vec(), &Default::default());
});
