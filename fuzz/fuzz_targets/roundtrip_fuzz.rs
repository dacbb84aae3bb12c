#![no_main]
use deltapack::envelope::EnvelopeOptions;
use deltapack::pipeline::{self, PipelineOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks the split point and the level.
    let control = data[0];
    let payload = &data[1..];
    let split = (control as usize * payload.len()) / 255;
    let (old, new) = payload.split_at(split);

    let opts = PipelineOptions {
        envelope: EnvelopeOptions {
            level: i32::from(control % 9) + 1,
            checksum: control & 1 == 0,
        },
        ..Default::default()
    };

    let (artifact, _) = pipeline::diff_bytes(old, new, &opts).unwrap();
    let (rebuilt, _) = pipeline::patch_bytes(old, &artifact, &opts).unwrap();
    assert_eq!(rebuilt, new);
});
