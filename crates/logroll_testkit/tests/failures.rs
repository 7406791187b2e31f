//! Failure injection and close semantics.

use logroll_core::{LogError, RotatingWriter};
use logroll_testkit::prelude::*;
use std::io::{self, Write};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn failed_rename_reaches_the_triggering_writer() {
    let dir = LogDir::new();
    let renamer = Arc::new(FailingRenamer::always());
    let writer = RotatingWriter::open_with_renamer(dir.config(4), renamer.clone()).unwrap();

    writer.write(b"abcd").unwrap();
    let err = writer.write(b"e").unwrap_err();

    assert!(matches!(err, LogError::Rotation { .. }));
    assert!(err.to_string().contains("injected rename failure"));
    assert_eq!(renamer.attempts(), 1);
    assert_eq!(writer.rotations(), 0);
    assert_eq!(dir.read_live(), b"abcd");
    assert!(dir.archives().is_empty());
}

#[test]
fn writer_stays_failed_after_a_failed_rotation() {
    let dir = LogDir::new();
    let renamer = Arc::new(FailingRenamer::always());
    let writer = RotatingWriter::open_with_renamer(dir.config(4), renamer.clone()).unwrap();

    writer.write(b"abcd").unwrap();
    assert!(writer.write(b"e").is_err());

    for _ in 0..3 {
        assert!(matches!(writer.write(b"f"), Err(LogError::RotationFailed)));
    }
    assert_eq!(renamer.attempts(), 1);
}

#[test]
fn racing_writers_see_one_detailed_error() {
    let dir = LogDir::new();
    let renamer = Arc::new(FailingRenamer::always());
    let writer = Arc::new(
        RotatingWriter::open_with_renamer(dir.config(8), renamer.clone()).unwrap(),
    );
    writer.write(b"12345678").unwrap();

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let writer = Arc::clone(&writer);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                writer.write(b"x").unwrap_err()
            })
        })
        .collect();
    let errors: Vec<LogError> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let detailed = errors
        .iter()
        .filter(|e| matches!(e, LogError::Rotation { .. }))
        .count();
    let generic = errors
        .iter()
        .filter(|e| matches!(e, LogError::RotationFailed))
        .count();
    assert_eq!(detailed, 1);
    assert_eq!(generic, threads - 1);
    assert_eq!(renamer.attempts(), 1);
}

#[test]
fn close_returns_after_a_failed_rotation() {
    let dir = LogDir::new();
    let writer = Arc::new(
        RotatingWriter::open_with_renamer(dir.config(4), Arc::new(FailingRenamer::always()))
            .unwrap(),
    );
    writer.write(b"abcd").unwrap();
    assert!(writer.write(b"e").unwrap_err().is_rotation());

    let (done_tx, done_rx) = mpsc::channel();
    let closer = Arc::clone(&writer);
    thread::spawn(move || {
        let _ = done_tx.send(closer.close());
    });

    let closed = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("close did not return");
    assert!(closed.is_ok());
    assert!(writer.is_closed());
    assert!(matches!(writer.write(b"f"), Err(LogError::Closed)));
    writer.close().unwrap();
}

#[test]
fn inline_archive_failure_keeps_the_rotation() {
    let dir = LogDir::new();
    let renamer = Arc::new(DiscardingRenamer::new());
    let writer = RotatingWriter::open_with_renamer(dir.config(4), renamer.clone()).unwrap();

    writer.write(b"abcd").unwrap();
    let err = writer.write(b"e").unwrap_err();

    assert!(matches!(err, LogError::Rotation { .. }));
    assert!(err.to_string().contains("archiving"));
    assert_eq!(renamer.calls(), 1);
    assert_eq!(writer.rotations(), 1);

    writer.write(b"fg").unwrap();
    assert_eq!(dir.read_live(), b"fg");
    assert!(dir.archives().is_empty());
    assert!(dir
        .entries()
        .iter()
        .all(|name| !name.ends_with(".zip.tmp")));
}

#[test]
fn rotations_stop_when_renames_start_failing() {
    let dir = LogDir::new();
    let writer =
        RotatingWriter::open_with_renamer(dir.config(4), Arc::new(FailingRenamer::after(1)))
            .unwrap();

    writer.write(b"aaaa").unwrap();
    writer.write(b"bbbb").unwrap();
    assert_eq!(writer.rotations(), 1);

    assert!(writer.write(b"cccc").unwrap_err().is_rotation());
    assert_eq!(dir.archives().len(), 1);
    assert_eq!(dir.read_live(), b"bbbb");
}

#[test]
fn close_rejects_every_later_write() {
    let dir = LogDir::new();
    let writer = dir.shared_writer(64);
    writer.write(b"first line\n").unwrap();

    writer.close().unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let writer = Arc::clone(&writer);
            thread::spawn(move || matches!(writer.write(b"late\n"), Err(LogError::Closed)))
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(dir.read_live(), b"first line\n");
}

#[test]
fn close_after_rotation_closes_the_current_file() {
    let dir = LogDir::new();
    let writer = dir.writer(4);
    writer.write(b"aaaa").unwrap();
    writer.write(b"bb").unwrap();
    assert_eq!(writer.rotations(), 1);

    writer.close().unwrap();
    writer.close().unwrap();

    assert!(matches!(writer.write(b"c"), Err(LogError::Closed)));
    assert_eq!(dir.read_live(), b"bb");
}

#[test]
fn io_write_adapters() {
    let dir = LogDir::new();
    let writer = dir.writer(1 << 20);

    let mut sink = &writer;
    io::copy(&mut &b"copied through io::copy\n"[..], &mut sink).unwrap();
    writeln!(sink, "and writeln").unwrap();
    assert_eq!(dir.read_live(), b"copied through io::copy\nand writeln\n");

    writer.close().unwrap();
    let err = sink.write_all(b"closed").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
}

#[test]
fn open_reports_unusable_paths() {
    let dir = LogDir::new();
    let inside_missing = dir.path().join("missing").join("x.log");
    let err = RotatingWriter::open(dir.config(10).path(inside_missing)).unwrap_err();
    assert!(matches!(err, LogError::Storage(_)));
}
