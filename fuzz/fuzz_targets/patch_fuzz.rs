#![no_main]
use deltapack::pipeline::{self, PipelineOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary artifacts must fault, never panic.
    let opts = PipelineOptions::default();
    let _ = pipeline::patch_bytes(&[], data, &opts);

    // Also fuzz with a non-empty old buffer.
    if data.len() >= 2 {
        let split = data.len() / 2;
        let (old, artifact) = data.split_at(split);
        let _ = pipeline::patch_bytes(old, artifact, &opts);
    }
});
