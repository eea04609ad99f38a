//! End-to-end transfer over the loopback interface.
//!
//! Server and client run in separate threads on real UDP sockets with an
//! OS-assigned port, exercising the full stack: file loading, wire codec,
//! window engine, sequencer, catalog matching and the result log.

use std::fs;
use std::path::PathBuf;
use std::thread;

use bytes::Bytes;

use gbnft_engine::{
    Channel, ChannelConfig, ChannelError, EngineConfig, Receiver, Sender, SystemClock, UdpChannel,
};
use gbnft_files::{Catalog, CatalogMatcher, FileBlob, MatchLog};

/// Deterministic loss: swallow the first `drops_left` DATA frames, pass
/// everything else (ACKs, TERM, retransmissions) through untouched.
struct DroppyChannel {
    inner: UdpChannel,
    drops_left: u32,
}

impl Channel for DroppyChannel {
    fn send(&mut self, frame: &[u8]) -> Result<usize, ChannelError> {
        if self.drops_left > 0
            && gbnft_wire::decode_header(frame).is_ok_and(|h| h.is_data())
        {
            self.drops_left -= 1;
            return Ok(frame.len());
        }
        self.inner.send(frame)
    }

    fn recv(
        &mut self,
        timeout: Option<std::time::Duration>,
    ) -> Result<Option<Bytes>, ChannelError> {
        self.inner.recv(timeout)
    }
}

struct Scratch {
    root: PathBuf,
}

impl Scratch {
    fn new(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!("gbnft-e2e-{tag}-{}", std::process::id()));
        fs::remove_dir_all(&root).ok();
        fs::create_dir_all(&root).unwrap();
        Self { root }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        fs::remove_dir_all(&self.root).ok();
    }
}

#[test]
fn ten_files_zero_loss_produce_ten_ordered_log_lines() {
    let scratch = Scratch::new("clean");

    // Ten outbound files; the catalog knows the first nine under reference
    // names, the tenth is a stranger.
    let outbound_dir = scratch.path("outbound");
    let catalog_dir = scratch.path("catalog");
    fs::create_dir_all(&outbound_dir).unwrap();
    fs::create_dir_all(&catalog_dir).unwrap();

    let mut files = Vec::new();
    for i in 0..10u32 {
        let name = format!("send-{i:02}.pgm");
        let content = format!("payload of file number {i}");
        let path = outbound_dir.join(&name);
        fs::write(&path, &content).unwrap();
        files.push(FileBlob::read(&path).unwrap().into());
        if i < 9 {
            fs::write(catalog_dir.join(format!("ref-{i:02}.pgm")), &content).unwrap();
        }
    }

    let output_file = scratch.path("result.txt");

    // Server side: ephemeral port, learned before the client starts.
    let server_channel = UdpChannel::bind(0, ChannelConfig::default()).unwrap();
    let port = server_channel.local_addr().unwrap().port();
    let catalog = Catalog::load_dir(&catalog_dir).unwrap();
    let log = MatchLog::create(&output_file).unwrap();

    let server = thread::spawn(move || {
        let mut matcher = CatalogMatcher::new(catalog, log);
        Receiver::new(server_channel)
            .run(&mut matcher)
            .expect("server session")
    });

    let client = thread::spawn(move || {
        let channel =
            UdpChannel::connect("127.0.0.1", port, ChannelConfig::default()).expect("connect");
        Sender::new(files, channel, SystemClock, EngineConfig::default())
            .run()
            .expect("client run")
    });

    let sender_report = client.join().unwrap();
    let receiver_report = server.join().unwrap();

    assert_eq!(sender_report.files_sent, 10);
    assert_eq!(receiver_report.files_delivered, 10);

    let text = fs::read_to_string(&output_file).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 10, "one log line per delivered file");
    for (i, line) in lines.iter().enumerate() {
        let expected = if i < 9 {
            format!("send-{i:02}.pgm ref-{i:02}.pgm")
        } else {
            format!("send-{i:02}.pgm UNKNOWN")
        };
        assert_eq!(*line, expected, "line {i} out of order or mismatched");
    }
}

#[test]
fn dropped_data_frames_are_recovered_by_retransmission() {
    let scratch = Scratch::new("lossy");

    let outbound_dir = scratch.path("outbound");
    let catalog_dir = scratch.path("catalog");
    fs::create_dir_all(&outbound_dir).unwrap();
    fs::create_dir_all(&catalog_dir).unwrap();

    let mut files = Vec::new();
    for i in 0..5u32 {
        let name = format!("f{i}.bin");
        let content = vec![i as u8; 64];
        fs::write(outbound_dir.join(&name), &content).unwrap();
        fs::write(catalog_dir.join(&name), &content).unwrap();
        files.push(gbnft_engine::OutboundFile {
            name,
            bytes: Bytes::from(content),
        });
    }

    let output_file = scratch.path("result.txt");
    let server_channel = UdpChannel::bind(0, ChannelConfig::default()).unwrap();
    let port = server_channel.local_addr().unwrap().port();
    let catalog = Catalog::load_dir(&catalog_dir).unwrap();
    let log = MatchLog::create(&output_file).unwrap();

    let server = thread::spawn(move || {
        let mut matcher = CatalogMatcher::new(catalog, log);
        Receiver::new(server_channel)
            .run(&mut matcher)
            .expect("server session")
    });

    let client = thread::spawn(move || {
        // Swallow the first two DATA frames; a short timeout keeps the
        // retransmission cycle fast.
        let channel = DroppyChannel {
            inner: UdpChannel::connect("127.0.0.1", port, ChannelConfig::default())
                .expect("connect"),
            drops_left: 2,
        };
        let config = EngineConfig {
            timeout: std::time::Duration::from_millis(100),
            ..Default::default()
        };
        Sender::new(files, channel, SystemClock, config)
            .run()
            .expect("client run")
    });

    let sender_report = client.join().unwrap();
    let receiver_report = server.join().unwrap();

    assert_eq!(receiver_report.files_delivered, 5);
    assert!(sender_report.retransmissions > 0, "loss must force resends");

    let text = fs::read_to_string(&output_file).unwrap();
    assert_eq!(text.lines().count(), 5);
    for line in text.lines() {
        assert!(!line.ends_with("UNKNOWN"), "all files are in the catalog");
    }
}
