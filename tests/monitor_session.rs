//! Drives the `fcpmon` binary end to end against a scripted node.

use std::io::{BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::process::Command;
use std::thread;

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
fn fcpmon_downloads_a_uri_through_the_full_handshake() {
    let downloads = tempfile::tempdir().expect("tempdir");
    let directory = downloads.path().to_str().expect("utf8 path").to_owned();
    let write_probe = downloads.path().join("dda-probe");

    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();

    let node_directory = directory.clone();
    let node_write_probe = write_probe.clone();
    let node = thread::spawn(move || {
        let mut node = ScriptedNode::accept(&listener);

        let hello = node.expect("ClientHello");
        assert_eq!(hello.get("Name"), Some("fcpmon"));
        node.send(&Message::new("NodeHello").field("FCPVersion", "2.0"));

        node.expect("WatchGlobal");

        node.expect("TestDDARequest");
        node.send(
            &Message::new("TestDDAReply")
                .field("Directory", node_directory.clone())
                .field("WriteFilename", node_write_probe.to_str().expect("utf8"))
                .field("ContentToWrite", "probe"),
        );
        node.expect("TestDDAResponse");
        node.send(&Message::new("TestDDAComplete").field("Directory", node_directory));

        let fetch = node.expect("ClientGet");
        assert_eq!(fetch.get("URI"), Some("KSK@sample/readme.txt"));
        let identifier = fetch.get("Identifier").expect("identifier").to_owned();
        node.send(
            &Message::new("SimpleProgress")
                .field("Identifier", identifier.clone())
                .field("Total", "4")
                .field("Required", "4")
                .field("Succeeded", "2")
                .field("Failed", "0")
                .field("FinalizedTotal", "true"),
        );
        node.send(&Message::new("DataFound").field("Identifier", identifier));
    });

    let output = Command::new(env!("CARGO_BIN_EXE_fcpmon"))
        .args([
            "--port",
            &port.to_string(),
            "--download-dir",
            &directory,
            "KSK@sample/readme.txt",
        ])
        .output()
        .expect("run fcpmon");
    node.join().expect("node script completes");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).expect("stdout is UTF-8");
    assert!(stdout.contains("downloaded"), "missing success line: {stdout}");
    assert!(stdout.contains("fcpmon-readme.txt"));
    // The handshake's write probe was cleaned up before exit.
    assert!(!write_probe.exists());
}
