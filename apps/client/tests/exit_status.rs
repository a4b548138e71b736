//! Process-level checks of the client's exit statuses.

use std::process::{Command, Output, Stdio};

fn client(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_facewire-client"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .output()
        .unwrap()
}

#[test]
fn missing_port_is_usage() {
    let output = client(&[]);
    assert_eq!(output.status.code(), Some(17));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Usage: facewire-client port"));
}

#[test]
fn missing_input_file() {
    let output = client(&["1", "--detectfilename", "/nonexistent/facewire/in.jpg"]);
    assert_eq!(output.status.code(), Some(20));
}

#[test]
fn refused_connection() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port().to_string()
    };
    let output = client(&[&port]);
    assert_eq!(output.status.code(), Some(4));
    assert_eq!(
        String::from_utf8_lossy(&output.stderr),
        format!("facewire-client: cannot connect to the server on port \"{port}\"\n")
    );
}
