//! End-to-end session test against a scripted node on a real socket.

use std::fs;
use std::io::{BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use fcpmon_core::test_utils::RecordingObserver;
use fcpmon_core::{FetchOptions, ProgressState, Session, SessionConfig, TcpConnection};
use protocol::{Message, MessageReader};

struct ScriptedNode {
    reader: MessageReader<BufReader<TcpStream>>,
    stream: TcpStream,
}

impl ScriptedNode {
    fn accept(listener: &TcpListener) -> Self {
        let (stream, _) = listener.accept().expect("client connects");
        let reader = MessageReader::new(BufReader::new(
            stream.try_clone().expect("clone read half"),
        ));
        Self { reader, stream }
    }

    fn expect(&mut self, name: &str) -> Message {
        let message = self
            .reader
            .read_message()
            .expect("read from client")
            .expect("client still connected");
        assert_eq!(message.name(), name);
        message
    }

    fn send(&mut self, message: &Message) {
        self.stream
            .write_all(message.to_wire_string().as_bytes())
            .expect("write to client");
        self.stream.flush().expect("flush to client");
    }
}

#[test]
fn full_session_handshake_probe_and_download() {
    let downloads = tempfile::tempdir().expect("tempdir");
    let directory = downloads.path().to_str().expect("utf8 path").to_owned();
    let read_probe = downloads.path().join("dda-read-probe");
    let write_probe = downloads.path().join("dda-write-probe");
    fs::write(&read_probe, "node says hello").expect("seed read probe");

    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let node_directory = directory.clone();
    let node_read_probe = read_probe.clone();
    let node_write_probe = write_probe.clone();
    let node = thread::spawn(move || {
        let mut node = ScriptedNode::accept(&listener);

        let hello = node.expect("ClientHello");
        assert_eq!(hello.get("Name"), Some("mon-test"));
        assert_eq!(hello.get("ExpectedVersion"), Some("2.0"));
        node.send(&Message::new("NodeHello").field("FCPVersion", "2.0"));

        node.expect("WatchGlobal");

        let request = node.expect("TestDDARequest");
        assert_eq!(request.get("Directory"), Some(node_directory.as_str()));
        assert_eq!(request.get("WantWriteDirectory"), Some("true"));
        node.send(
            &Message::new("TestDDAReply")
                .field("Directory", node_directory.clone())
                .field("ReadFilename", node_read_probe.to_str().expect("utf8"))
                .field("WriteFilename", node_write_probe.to_str().expect("utf8"))
                .field("ContentToWrite", "prove-write-access"),
        );

        let response = node.expect("TestDDAResponse");
        assert_eq!(response.get("ReadContent"), Some("node says hello"));
        assert_eq!(
            fs::read_to_string(&node_write_probe).expect("probe written"),
            "prove-write-access"
        );
        node.send(&Message::new("TestDDAComplete").field("Directory", node_directory.clone()));

        // The deferred fetch is released only now.
        let fetch = node.expect("ClientGet");
        assert_eq!(fetch.get("URI"), Some("KSK@sample/readme.txt"));
        let identifier = fetch.get("Identifier").expect("identifier").to_owned();
        node.send(
            &Message::new("SimpleProgress")
                .field("Identifier", identifier.clone())
                .field("Total", "8")
                .field("Required", "8")
                .field("Succeeded", "8")
                .field("Failed", "0")
                .field("FinalizedTotal", "true"),
        );
        node.send(&Message::new("DataFound").field("Identifier", identifier));
    });

    let mut connection = TcpConnection::connect(addr, "mon-test").expect("connect");
    let mut session = Session::new(SessionConfig {
        client_name: "mon-test".to_owned(),
        fetch_options: FetchOptions::default(),
    });
    let mut observer = RecordingObserver::new();

    connection
        .send(&Message::new("WatchGlobal"))
        .expect("watch global");
    session
        .enable_directory(&mut connection, &directory)
        .expect("enable directory");
    let identifiers = session
        .fetch(&mut connection, &["KSK@sample/readme.txt".to_owned()])
        .expect("fetch");
    assert_eq!(identifiers, vec!["mon-test-readme.txt"]);

    session.run(&mut connection, &mut observer).expect("run");
    node.join().expect("node script completes");

    // The handshake deleted its write probe and left the read probe alone.
    assert!(!write_probe.exists());
    assert!(read_probe.exists());

    assert_eq!(observer.progress.len(), 1);
    let (snapshot, state) = &observer.progress[0];
    assert_eq!(state, &ProgressState::Running);
    assert_eq!(snapshot.succeeded(), 8);
    assert!(snapshot.finalized_total());

    assert_eq!(observer.labels(), vec!["downloaded"]);
    assert!(!session.is_waited_for("mon-test-readme.txt"));
}
