#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let image = bunfs_extract::ExecutableImage::from_bytes(data.to_vec());
    let _ = bunfs_extract::extract_image(&image, &Default::default());
});
