use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;
use vzip::archive::{ArchiveReader, ArchiveWriter};
use vzip::compress::{collect_frames, Codec, CompressOptions, ZlibCodec};
use vzip::workers::run_parallel_compression;
use vzip::ArchiverError;

// ---------- helpers ----------

/// A small PPM-like frame: header plus a gradient that shifts with `seed`.
fn frame_bytes(seed: usize, pixels: usize) -> Vec<u8> {
    let mut buf = format!("P6\n{pixels} 1\n255\n").into_bytes();
    for p in 0..pixels {
        let v = ((p / 8 + seed * 3) % 251) as u8;
        buf.extend_from_slice(&[v, v.wrapping_add(seed as u8), 255 - v]);
    }
    buf
}

fn create_frames(dir: &Path, n: usize) -> Vec<PathBuf> {
    fs::create_dir_all(dir).unwrap();
    (0..n)
        .map(|i| {
            let p = dir.join(format!("frame_{i:03}.ppm"));
            fs::write(&p, frame_bytes(i, 300 + i * 7)).unwrap();
            p
        })
        .collect()
}

fn run_with(dir: &Path, out: &Path, threads: usize) -> Vec<u8> {
    let mut opts = CompressOptions::new(dir, out);
    opts.threads = threads;
    run_parallel_compression(&opts, &ZlibCodec::default()).unwrap();
    fs::read(out).unwrap()
}

fn records(path: &Path) -> Vec<Vec<u8>> {
    ArchiveReader::open(path)
        .unwrap()
        .map(|r| r.unwrap().payload)
        .collect()
}

/// Single-threaded reference: compress sorted frames one by one.
fn serial_archive(dir: &Path) -> Vec<u8> {
    let codec = ZlibCodec::default();
    let mut w = ArchiveWriter::new(Vec::new());
    for (i, p) in collect_frames(dir, "ppm").unwrap().iter().enumerate() {
        let data = codec.compress(&fs::read(p).unwrap()).unwrap();
        w.write_record(i, &data).unwrap();
    }
    w.finish().unwrap()
}

/// Counts calls so tests can observe whether any worker ran.
struct CountingCodec {
    inner: ZlibCodec,
    calls: AtomicUsize,
}

impl Codec for CountingCodec {
    fn compress(&self, input: &[u8]) -> io::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compress(input)
    }

    fn decompress(&self, input: &[u8]) -> io::Result<Vec<u8>> {
        self.inner.decompress(input)
    }
}

// ---------- properties ----------

#[test]
fn repeated_runs_are_byte_identical() {
    let src = tempdir().unwrap();
    create_frames(src.path(), 12);
    let out = tempdir().unwrap();

    let a = run_with(src.path(), &out.path().join("a.vzip"), 4);
    let b = run_with(src.path(), &out.path().join("b.vzip"), 4);
    assert_eq!(a, b);
}

#[test]
fn archive_does_not_depend_on_pool_size() {
    let src = tempdir().unwrap();
    create_frames(src.path(), 25);
    let out = tempdir().unwrap();

    let reference = serial_archive(src.path());
    for threads in [1, 2, 3, 8, 16] {
        let bytes = run_with(src.path(), &out.path().join(format!("t{threads}.vzip")), threads);
        assert_eq!(bytes, reference, "pool size {threads} changed the archive");
    }
}

#[test]
fn records_follow_sorted_filename_order() {
    let src = tempdir().unwrap();
    let mut names: Vec<String> = ["b.ppm", "A.ppm", "c10.ppm", "c2.ppm", "a.ppm", "zz.ppm"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    // creation order must not matter
    names.shuffle(&mut StdRng::seed_from_u64(42));
    for (i, name) in names.iter().enumerate() {
        fs::write(src.path().join(name), frame_bytes(i, 200)).unwrap();
    }

    let out = tempdir().unwrap();
    let archive = out.path().join("order.vzip");
    run_with(src.path(), &archive, 3);

    let mut sorted = names.clone();
    sorted.sort();
    let codec = ZlibCodec::default();
    let recs = records(&archive);
    assert_eq!(recs.len(), sorted.len());
    for (rec, name) in recs.iter().zip(&sorted) {
        assert_eq!(codec.decompress(rec).unwrap(), fs::read(src.path().join(name)).unwrap(), "{name}");
    }
}

#[test]
fn every_record_round_trips() {
    let src = tempdir().unwrap();
    let frames = create_frames(src.path(), 9);
    // one incompressible frame
    let mut noise = vec![0u8; 4096];
    StdRng::seed_from_u64(7).fill(&mut noise[..]);
    fs::write(src.path().join("frame_999.ppm"), &noise).unwrap();

    let out = tempdir().unwrap();
    let archive = out.path().join("rt.vzip");
    run_with(src.path(), &archive, 4);

    let codec = ZlibCodec::default();
    let recs = records(&archive);
    assert_eq!(recs.len(), 10);
    for (rec, path) in recs.iter().zip(&frames) {
        assert_eq!(codec.decompress(rec).unwrap(), fs::read(path).unwrap());
    }
    assert_eq!(codec.decompress(&recs[9]).unwrap(), noise);
}

#[test]
fn capacity_boundary() {
    let src = tempdir().unwrap();
    create_frames(src.path(), 5);
    let out = tempdir().unwrap();

    let mut opts = CompressOptions::new(src.path(), out.path().join("ok.vzip"));
    opts.max_files = 5;
    opts.threads = 2;
    let report = run_parallel_compression(&opts, &ZlibCodec::default()).unwrap();
    assert_eq!(report.records_written, 5);

    fs::write(src.path().join("frame_005.ppm"), frame_bytes(5, 10)).unwrap();
    let codec = CountingCodec { inner: ZlibCodec::default(), calls: AtomicUsize::new(0) };
    opts.output = out.path().join("over.vzip");
    let err = run_parallel_compression(&opts, &codec).unwrap_err();
    assert!(matches!(err, ArchiverError::TooManyFiles { found: 6, max: 5 }));
    assert_eq!(codec.calls.load(Ordering::SeqCst), 0, "no job may start after a setup failure");
    assert!(!opts.output.exists());
}

#[test]
fn two_frame_scenario() {
    let src = tempdir().unwrap();
    let pattern_a: Vec<u8> = (0..1000).map(|i| b"ABCD"[i % 4]).collect();
    let pattern_b: Vec<u8> = (0..1000).map(|i| (i / 10) as u8).collect();
    fs::write(src.path().join("frame_001.ppm"), &pattern_a).unwrap();
    fs::write(src.path().join("frame_002.ppm"), &pattern_b).unwrap();

    let out = tempdir().unwrap();
    let archive = out.path().join("video.vzip");
    let mut opts = CompressOptions::new(src.path(), &archive);
    opts.threads = 4;
    let report = run_parallel_compression(&opts, &ZlibCodec::default()).unwrap();

    let codec = ZlibCodec::default();
    let recs = records(&archive);
    assert_eq!(recs.len(), 2);
    assert_eq!(codec.decompress(&recs[0]).unwrap(), pattern_a);
    assert_eq!(codec.decompress(&recs[1]).unwrap(), pattern_b);
    assert_eq!(report.total_input_bytes, 2000);
    assert!(report.compression_rate().unwrap() > 0.0);
    assert!(report.summary_line().starts_with("Compression rate: "));

    // four workers, two jobs: the idle ones simply claim nothing
    assert_eq!(report.workers.len(), 4);
    assert_eq!(report.workers.iter().map(|w| w.jobs).sum::<usize>(), 2);
}

#[test]
fn empty_directory_writes_empty_archive() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("readme.txt"), b"not a frame").unwrap();
    let out = tempdir().unwrap();
    let archive = out.path().join("empty.vzip");

    let report = run_parallel_compression(&CompressOptions::new(src.path(), &archive), &ZlibCodec::default()).unwrap();
    assert_eq!(report.frames_found, 0);
    assert_eq!(report.records_written, 0);
    assert_eq!(report.compression_rate(), None);
    assert_eq!(report.summary_line(), "Compression rate: n/a (no input bytes)");
    assert_eq!(fs::read(&archive).unwrap().len(), 0);
}

#[test]
fn totals_match_archive_contents() {
    let src = tempdir().unwrap();
    let frames = create_frames(src.path(), 7);
    let out = tempdir().unwrap();
    let archive = out.path().join("totals.vzip");

    let mut opts = CompressOptions::new(src.path(), &archive);
    opts.verify = true;
    let report = run_parallel_compression(&opts, &ZlibCodec::default()).unwrap();

    let input: u64 = frames.iter().map(|p| fs::metadata(p).unwrap().len()).sum();
    let payload: u64 = records(&archive).iter().map(|r| r.len() as u64).sum();
    assert!(report.verified);
    assert_eq!(report.total_input_bytes, input);
    assert_eq!(report.total_output_bytes, payload);
    assert_eq!(fs::metadata(&archive).unwrap().len(), payload + 4 * 7);
}
