use deltapack::pipeline::{PipelineOptions, diff_file, patch_file};
use std::io::{Seek, Write};
use tempfile::NamedTempFile;

#[test]
#[ignore = "large-buffer test is opt-in due runtime and memory requirements"]
fn large_sparse_file_roundtrip() {
    const SIZE: u64 = 256 * 1024 * 1024;

    let mut old = NamedTempFile::new().unwrap();
    let mut new = NamedTempFile::new().unwrap();
    let dif = NamedTempFile::new().unwrap();
    let output = NamedTempFile::new().unwrap();

    // Sparse files of equal size with a few deterministic mutations.
    old.as_file_mut().set_len(SIZE).unwrap();
    new.as_file_mut().set_len(SIZE).unwrap();

    old.as_file_mut()
        .seek(std::io::SeekFrom::Start(64 * 1024))
        .unwrap();
    old.as_file_mut().write_all(b"baseline-block").unwrap();

    new.as_file_mut()
        .seek(std::io::SeekFrom::Start(64 * 1024))
        .unwrap();
    new.as_file_mut().write_all(b"mutated-block!").unwrap();
    new.as_file_mut()
        .seek(std::io::SeekFrom::Start(SIZE / 2))
        .unwrap();
    new.as_file_mut().write_all(b"middle-chunk").unwrap();

    let opts = PipelineOptions::default();
    let enc = diff_file(old.path(), new.path(), dif.path(), &opts).unwrap();
    assert_eq!(enc.new_size, SIZE);
    assert!(enc.artifact_size < 64 * 1024, "artifact {}", enc.artifact_size);

    let dec = patch_file(old.path(), dif.path(), output.path(), &opts).unwrap();
    assert_eq!(dec.new_size, SIZE);
    assert_eq!(
        std::fs::read(output.path()).unwrap(),
        std::fs::read(new.path()).unwrap()
    );
}

#[test]
fn edge_case_matrix() {
    let cases: Vec<(&[u8], &[u8])> = vec![
        (b"", b""),
        (b"", b"x"),
        (b"x", b""),
        (b"\0\0\0\0\0", b"\0\0\0\0\0"),
        (b"\0\0\0\0\0", b"\0\0\0\0\x01"),
        (b"AAAABBBBCCCC", b"AAAABBBBDDDD"),
    ];

    let opts = PipelineOptions::default();
    for (old, new) in cases {
        let old_file = NamedTempFile::new().unwrap();
        let new_file = NamedTempFile::new().unwrap();
        let dif = NamedTempFile::new().unwrap();
        let output = NamedTempFile::new().unwrap();
        std::fs::write(old_file.path(), old).unwrap();
        std::fs::write(new_file.path(), new).unwrap();

        diff_file(old_file.path(), new_file.path(), dif.path(), &opts).unwrap();
        patch_file(old_file.path(), dif.path(), output.path(), &opts).unwrap();
        assert_eq!(std::fs::read(output.path()).unwrap(), new, "old={old:?}");
    }
}
