//! The line-oriented TCP server.
//!
//! A client writes one request line; the server replies with the response
//! text followed by a sentinel empty line. Requests on one connection are
//! strictly serialized; concurrent connections are serialized against the
//! registry by the handler's readers-writer lock.

use crate::handler::Handler;
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use tracing::{error, info};

/// Frame a reply: response text, newline-terminated, then an empty line.
pub fn frame_reply(reply: &str) -> String {
    let mut out = reply.to_string();
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
    out
}

fn serve_connection(handler: Arc<Handler>, stream: TcpStream) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "?".to_string());
    info!("connection from {peer}");
    let mut writer = match stream.try_clone() {
        Ok(w) => w,
        Err(e) => {
            error!("cannot clone stream for {peer}: {e}");
            return;
        }
    };
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        info!("received message: {line}");
        let reply = handler.handle(&line);
        if writer.write_all(frame_reply(&reply).as_bytes()).is_err() {
            // Client went away; anything uncommitted was already rolled
            // back inside the handler.
            break;
        }
        let _ = writer.flush();
    }
    info!("close client {peer}");
}

/// Bind and serve forever.
pub fn run_server(handler: Arc<Handler>, host: &str, port: u16) -> Result<()> {
    let listener = TcpListener::bind((host, port))
        .with_context(|| format!("binding NRM server to {host}:{port}"))?;
    info!("NRM server is listening on {host}:{port}");
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let handler = handler.clone();
                thread::spawn(move || serve_connection(handler, stream));
            }
            Err(e) => error!("accept failed: {e}"),
        }
    }
    Ok(())
}
