use std::thread;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use fiff::stream::{CancelToken, Wait, live};
use fiff::{Error, StreamConfig, Tag};

#[test]
fn blocked_reader_wakes_on_data() {
    let (writer, mut reader) = live::channel(StreamConfig::default());
    let producer = thread::spawn(move || {
        let mut encoded = BytesMut::new();
        Tag::floats(7, &[1.5, 2.5])
            .encode(StreamConfig::default().byte_order, &mut encoded)
            .unwrap();
        for chunk in encoded.chunks(5) {
            thread::sleep(Duration::from_millis(5));
            writer.write_bytes(chunk).unwrap();
        }
        writer
    });

    let tag = reader
        .read_rt_tag(&Wait::timeout(Duration::from_secs(5)))
        .unwrap();
    assert_eq!(tag.kind(), 7);
    assert_eq!(tag.as_floats(), Some(&[1.5, 2.5][..]));
    drop(producer.join().unwrap());
}

#[test]
fn silent_source_times_out() {
    let (_writer, mut reader) = live::channel(StreamConfig::default());
    let start = Instant::now();
    let result = reader.read_rt_tag(&Wait::timeout(Duration::from_millis(120)));
    assert!(matches!(result, Err(Error::Timeout { needed: 16 })));
    assert!(start.elapsed() >= Duration::from_millis(120));
}

#[test]
fn configured_wait_bounds_the_read() {
    let config = StreamConfig {
        wait_timeout: Some(Duration::from_millis(60)),
        ..StreamConfig::default()
    };
    let (writer, mut reader) = live::channel(config);
    let wait = reader.default_wait();
    assert_eq!(wait.timeout, Some(Duration::from_millis(60)));

    let start = Instant::now();
    assert!(matches!(reader.read_rt_tag(&wait), Err(Error::Timeout { needed: 16 })));
    assert!(start.elapsed() >= Duration::from_millis(60));

    writer.write_tag(&Tag::int(1, 5)).unwrap();
    assert_eq!(reader.read_rt_tag(&wait).unwrap().to_int(), Some(5));
}

#[test]
fn cancel_from_another_thread() {
    let (_writer, mut reader) = live::channel(StreamConfig::default());
    let token = CancelToken::new();
    let remote = token.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        remote.cancel();
    });

    let result = reader.read_rt_tag(&Wait::forever().with_cancel(token));
    assert!(matches!(result, Err(Error::Cancelled)));
    canceller.join().unwrap();
}

#[test]
fn tags_arrive_in_order_then_close() {
    let (writer, mut reader) = live::channel(StreamConfig::default());
    for value in 0..3 {
        writer.write_tag(&Tag::int(100 + value, value)).unwrap();
    }
    drop(writer);

    let wait = Wait::timeout(Duration::from_secs(1));
    for value in 0..3 {
        assert_eq!(reader.read_rt_tag(&wait).unwrap().to_int(), Some(value));
    }
    assert!(matches!(reader.read_rt_tag(&wait), Err(Error::Closed)));
    assert!(reader.try_read_tag().unwrap().is_none());
}
