use super::*;
use crate::source::MemorySource;

use flume::Sender;
use std::{
    sync::atomic::AtomicUsize,
    thread,
    time::{Duration, Instant},
};

const GATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Wraps another source, counting calls and recording when it is dropped.
struct Probe<S> {
    inner: S,
    calls: Arc<AtomicUsize>,
    dropped: Arc<AtomicBool>,
    /// Decodes of blocks at or after this sample wait for one message each.
    gate: Option<(u64, Receiver<()>)>,
    delay: Option<Duration>,
    fail_from: Option<u64>,
    panic_from: Option<u64>,
}

impl<S: AudioSource> Probe<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Arc::default(),
            dropped: Arc::default(),
            gate: None,
            delay: None,
            fail_from: None,
            panic_from: None,
        }
    }

    fn gated_from(mut self, sample: u64) -> (Self, Sender<()>) {
        let (tx, rx) = flume::unbounded();
        self.gate = Some((sample, rx));
        (self, tx)
    }
}

impl<S: AudioSource> AudioSource for Probe<S> {
    fn format(&self) -> AudioFormat {
        self.inner.format()
    }

    fn decode(&mut self, buf: &mut [u8], start: u64, count: u64) -> Result<(), DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some((from, rx)) = &self.gate {
            if start >= *from {
                rx.recv_timeout(GATE_TIMEOUT)
                    .map_err(|e| DecodeError::Fail(Box::new(e)))?;
            }
        }
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        if self.fail_from.map_or(false, |from| start >= from) {
            return Err(DecodeError::Fail("bad packet".into()));
        }
        if self.panic_from.map_or(false, |from| start >= from) {
            panic!("decoder blew up");
        }

        self.inner.decode(buf, start, count)
    }
}

impl<S> Drop for Probe<S> {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

fn pattern_source(sample_count: usize, bytes_per_sample: usize, channels: usize) -> MemorySource {
    let data = utils::make_pattern(sample_count, bytes_per_sample * channels);
    MemorySource::new(data, bytes_per_sample, channels, 48_000, false)
}

fn small_blocks() -> Config {
    Config::default().block_bits(10)
}

fn read(cache: &BlockCache, start: u64, count: u64) -> Vec<u8> {
    let mut buf = vec![0xAA; count as usize * cache.format().frame_bytes()];
    cache.fill_buffer(&mut buf, start, count);
    buf
}

/// Blocks until the fill thread reports how it ended.
fn wait_for_end(cache: &BlockCache) -> FillStatus {
    let rx = cache.subscribe();
    loop {
        match rx.recv_timeout(GATE_TIMEOUT) {
            Ok(FillEvent::BlockReady { .. }) => continue,
            Ok(_) => return cache.status(),
            Err(e) => panic!("fill never finished: {e:?}"),
        }
    }
}

fn wait_for_samples(cache: &BlockCache, samples: u64) {
    let deadline = Instant::now() + GATE_TIMEOUT;
    while cache.decoded_samples() < samples {
        assert!(Instant::now() < deadline, "fill never reached sample {samples}");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn decode_boundary_splits_read_into_data_and_silence() {
    let (src, gate) = Probe::new(pattern_source(2_000_000, 2, 2)).gated_from(1_048_576);
    let cache = BlockCache::new(src).unwrap();
    assert_eq!(cache.layout().samples_per_block, 1_048_576);
    assert_eq!(cache.layout().block_count, 2);

    wait_for_samples(&cache, 1_048_576);
    assert_eq!(cache.decoded_samples(), 1_048_576);
    assert!(matches!(cache.status(), FillStatus::Filling));

    // Real data up to sample 1_048_576 (76 samples), silence after.
    let out = read(&cache, 1_048_500, 200);
    assert_eq!(out.len(), 800);
    assert_eq!(&out[..304], &utils::pattern_range(1_048_500, 76, 4)[..]);
    assert!(out[304..].iter().all(|b| *b == 0));

    gate.send(()).unwrap();
    assert!(matches!(wait_for_end(&cache), FillStatus::Complete));

    let out = read(&cache, 1_048_500, 200);
    assert_eq!(out, utils::pattern_range(1_048_500, 200, 4));
}

#[test]
fn reads_match_source_across_block_boundaries() {
    // 24-bit stereo: 170 samples per 1KiB block.
    let cache = BlockCache::with_config(pattern_source(5_000, 3, 2), &small_blocks()).unwrap();
    assert!(matches!(wait_for_end(&cache), FillStatus::Complete));
    assert!(cache.is_complete());
    assert_eq!(cache.layout().samples_per_block, 170);

    for (start, count) in [(0, 5_000), (169, 2), (100, 700), (4_900, 100), (3_400, 1)] {
        assert_eq!(
            read(&cache, start, count),
            utils::pattern_range(start as usize, count as usize, 6),
            "mismatch reading {count} samples from {start}"
        );
    }
}

#[test]
fn reads_past_end_are_silent() {
    let cache = BlockCache::with_config(pattern_source(1_000, 2, 1), &small_blocks()).unwrap();
    wait_for_end(&cache);

    let out = read(&cache, 990, 20);
    assert_eq!(&out[..20], &utils::pattern_range(990, 10, 2)[..]);
    assert!(out[20..].iter().all(|b| *b == 0));

    assert!(read(&cache, 5_000, 10).iter().all(|b| *b == 0));
    assert!(read(&cache, 0, 0).is_empty());
}

#[test]
fn repeated_reads_are_identical_once_decoded() {
    let (src, gate) = Probe::new(pattern_source(2_000, 2, 2)).gated_from(0);
    let cache = BlockCache::with_config(src, &small_blocks()).unwrap();

    assert!(read(&cache, 300, 400).iter().all(|b| *b == 0));

    for _ in 0..cache.layout().block_count {
        gate.send(()).unwrap();
    }
    wait_for_end(&cache);

    let first = read(&cache, 300, 400);
    let second = read(&cache, 300, 400);
    assert_eq!(first, second);
    assert_eq!(first, utils::pattern_range(300, 400, 4));
}

#[test]
fn concurrent_readers_see_a_published_prefix() {
    let mut src = Probe::new(pattern_source(20_000, 2, 2));
    src.delay = Some(Duration::from_micros(200));
    let cache = BlockCache::with_config(src, &small_blocks()).unwrap();
    let frame = 4;

    thread::scope(|s| {
        for reader in 0..8u64 {
            let cache = &cache;
            s.spawn(move || {
                for round in 0..200u64 {
                    let start = (reader * 977 + round * 131) % 19_000;
                    let count = 1 + (round * 37 + reader) % 900;

                    let before = cache.decoded_samples();
                    let out = read(cache, start, count);
                    let after = cache.decoded_samples();

                    let expected = utils::pattern_range(start as usize, count as usize, frame);
                    let real = out
                        .chunks(frame)
                        .zip(expected.chunks(frame))
                        .take_while(|(a, b)| a == b)
                        .count() as u64;

                    // Everything below `before` must be real; nothing at or
                    // past `after` may be; everything past the real prefix
                    // must be silence.
                    let real_end = start + real;
                    assert!(real_end >= before.clamp(start, start + count));
                    assert!(real_end <= after.max(start));
                    assert!(out[real as usize * frame..].iter().all(|b| *b == 0));
                }
            });
        }
    });

    wait_for_end(&cache);
    assert_eq!(read(&cache, 0, 20_000), utils::pattern_range(0, 20_000, frame));
}

#[test]
fn decode_failure_stops_progress() {
    let mut src = Probe::new(pattern_source(1_000, 2, 2));
    src.fail_from = Some(512);
    let calls = src.calls.clone();
    let cache = BlockCache::with_config(src, &small_blocks()).unwrap();

    match wait_for_end(&cache) {
        FillStatus::Failed(e) => assert!(matches!(*e, DecodeError::Fail(_))),
        other => panic!("expected failure, got {other:?}"),
    }

    assert_eq!(cache.decoded_samples(), 512);
    assert!(!cache.is_complete());
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let out = read(&cache, 500, 100);
    assert_eq!(&out[..48], &utils::pattern_range(500, 12, 4)[..]);
    assert!(out[48..].iter().all(|b| *b == 0));
}

#[test]
fn panicking_source_is_contained() {
    let mut src = Probe::new(pattern_source(1_000, 2, 2));
    src.panic_from = Some(256);
    let cache = BlockCache::with_config(src, &small_blocks()).unwrap();

    match wait_for_end(&cache) {
        FillStatus::Failed(e) => assert!(matches!(*e, DecodeError::Panicked)),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(cache.decoded_samples(), 256);
}

#[test]
fn drop_mid_fill_cancels_and_joins() {
    let mut src = Probe::new(pattern_source(100 * 256, 2, 2));
    src.delay = Some(Duration::from_millis(20));
    let calls = src.calls.clone();
    let dropped = src.dropped.clone();

    let cache = BlockCache::with_config(src, &small_blocks()).unwrap();
    let rx = cache.subscribe();
    wait_for_samples(&cache, 256);

    drop(cache);

    // The worker has exited (and dropped the source) before `drop` returns.
    assert!(dropped.load(Ordering::SeqCst));
    let made = calls.load(Ordering::SeqCst);
    assert!(made < 100);

    thread::sleep(Duration::from_millis(50));
    assert_eq!(calls.load(Ordering::SeqCst), made);

    let last = rx.iter().last();
    assert!(matches!(last, Some(FillEvent::Cancelled)));
}

#[test]
fn memory_limit_is_out_of_memory() {
    let src = Probe::new(pattern_source(2_000, 2, 2));
    let calls = src.calls.clone();
    let dropped = src.dropped.clone();

    let err = BlockCache::with_config(src, &Config::default().memory_limit(Some(4_000)))
        .unwrap_err();

    assert!(err.is_out_of_memory());
    assert!(matches!(err, CacheError::OutOfMemory {
        requested: Some(8_000)
    }));
    assert!(dropped.load(Ordering::SeqCst));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

struct Unreadable(AudioFormat);

impl Unreadable {
    fn new(sample_count: u64, bytes_per_sample: usize, channels: usize) -> Self {
        Self(AudioFormat {
            sample_count,
            bytes_per_sample,
            channels,
            sample_rate: 48_000,
            float: false,
        })
    }
}

impl AudioSource for Unreadable {
    fn format(&self) -> AudioFormat {
        self.0
    }

    fn decode(&mut self, _buf: &mut [u8], _start: u64, _count: u64) -> Result<(), DecodeError> {
        unreachable!("no worker may start for an uncacheable stream")
    }
}

#[test]
fn unaddressable_stream_is_out_of_memory() {
    let err = BlockCache::new(Unreadable::new(u64::MAX / 2, 4, 2)).unwrap_err();

    assert!(err.is_out_of_memory());
    assert!(matches!(err, CacheError::OutOfMemory { requested: None }));
}

#[test]
fn huge_single_byte_stream_is_out_of_memory() {
    let err = BlockCache::new(Unreadable::new(u64::MAX, 1, 1)).unwrap_err();

    assert!(err.is_out_of_memory());
}

#[test]
fn overflowing_sample_width_is_rejected() {
    let err = BlockCache::new(Unreadable::new(16, usize::MAX, 2)).unwrap_err();

    assert!(err.is_out_of_memory());
}

#[test]
fn empty_stream_completes_immediately() {
    let cache = BlockCache::new(pattern_source(0, 2, 2)).unwrap();

    assert!(matches!(wait_for_end(&cache), FillStatus::Complete));
    assert!(cache.is_complete());
    assert_eq!(cache.memory_usage(), 0);
    assert!(read(&cache, 0, 16).iter().all(|b| *b == 0));
}

#[test]
fn late_subscriber_learns_outcome() {
    let cache = BlockCache::with_config(pattern_source(600, 2, 2), &small_blocks()).unwrap();
    wait_for_end(&cache);

    let rx = cache.subscribe();
    assert!(matches!(rx.recv(), Ok(FillEvent::Complete)));
    assert!(rx.recv().is_err());
}

#[test]
fn cache_can_feed_another_cache() {
    let inner = BlockCache::with_config(pattern_source(3_000, 2, 2), &small_blocks()).unwrap();
    wait_for_end(&inner);

    let outer = BlockCache::with_config(inner, &Config::default().block_bits(12)).unwrap();
    assert!(matches!(wait_for_end(&outer), FillStatus::Complete));

    assert_eq!(read(&outer, 0, 3_000), utils::pattern_range(0, 3_000, 4));
}

#[test]
fn fill_thread_is_named() {
    let (tx, rx) = flume::bounded(1);

    struct NameSource(Sender<Option<String>>);
    impl AudioSource for NameSource {
        fn format(&self) -> AudioFormat {
            AudioFormat {
                sample_count: 1,
                bytes_per_sample: 1,
                channels: 1,
                sample_rate: 8_000,
                float: false,
            }
        }

        fn decode(&mut self, _buf: &mut [u8], _start: u64, _count: u64) -> Result<(), DecodeError> {
            let _ = self.0.send(thread::current().name().map(String::from));
            Ok(())
        }
    }

    let cache =
        BlockCache::with_config(NameSource(tx), &Config::default().thread_name("waveform")).unwrap();
    assert_eq!(rx.recv_timeout(GATE_TIMEOUT).unwrap().as_deref(), Some("waveform"));
    drop(cache);
}
