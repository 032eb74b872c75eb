use std::{
    io::{self, Write},
    net::SocketAddr,
};

use parking_lot::Mutex;
use spark_client::{Endpoint, TransactionListener};

const RULE: &str = "------------";

/// 把每个生命周期步骤与事务结果写成人类可读的控制台转录。
///
/// 写出失败只记录告警，不会影响客户端。
pub struct ConsoleListener<W> {
    endpoint: Endpoint,
    out: Mutex<W>,
}

impl ConsoleListener<io::Stdout> {
    pub fn stdout(endpoint: Endpoint) -> Self {
        Self::new(endpoint, io::stdout())
    }
}

impl<W: Write + Send + 'static> ConsoleListener<W> {
    pub fn new(endpoint: Endpoint, out: W) -> Self {
        Self {
            endpoint,
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn print(&self, write: impl FnOnce(&mut W) -> io::Result<()>) {
        let mut out = self.out.lock();
        if let Err(error) = write(&mut *out).and_then(|()| out.flush()) {
            tracing::warn!(%error, "failed to write console transcript");
        }
    }
}

impl<W: Write + Send + 'static> TransactionListener for ConsoleListener<W> {
    fn on_start(&self) {
        self.print(|out| {
            writeln!(out, "{RULE}")?;
            writeln!(out, "Opening connection to {}", self.endpoint)?;
            writeln!(out, "{RULE}")
        });
    }

    fn on_connect(&self, peer: SocketAddr) {
        tracing::info!(endpoint = %self.endpoint, %peer, "connected");
    }

    fn on_send(&self, request: &str) {
        tracing::debug!(bytes = request.len(), "request handed to transport");
    }

    fn on_request(&self, request: &str, response: Option<&str>, success: bool) {
        self.print(|out| {
            writeln!(out)?;
            writeln!(out, "{RULE}")?;
            writeln!(out, "Sending message {request}")?;
            writeln!(out, "{RULE}")?;
            if success {
                writeln!(out, "Sent message successfully")?;
            } else {
                writeln!(out, "Failed sending message")?;
            }
            match response {
                Some(response) => writeln!(out, "Received response: {response}"),
                None => writeln!(out, "Received no response"),
            }
        });
    }

    fn on_stop(&self) {
        self.print(|out| {
            writeln!(out, "{RULE}")?;
            writeln!(out, "Closing connection")?;
            writeln!(out, "{RULE}")
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(drive: impl FnOnce(&ConsoleListener<Vec<u8>>)) -> String {
        let endpoint = Endpoint::new("localhost", 9000).expect("合法端点");
        let listener = ConsoleListener::new(endpoint, Vec::new());
        drive(&listener);
        String::from_utf8(listener.into_inner()).expect("转录应为 UTF-8")
    }

    #[test]
    fn prints_full_session() {
        let text = transcript(|listener| {
            listener.on_start();
            listener.on_send("PING");
            listener.on_request("PING", Some("PONG"), true);
            listener.on_stop();
        });
        assert_eq!(
            text,
            "------------\n\
             Opening connection to localhost:9000\n\
             ------------\n\
             \n\
             ------------\n\
             Sending message PING\n\
             ------------\n\
             Sent message successfully\n\
             Received response: PONG\n\
             ------------\n\
             Closing connection\n\
             ------------\n"
        );
    }

    #[test]
    fn prints_failure_without_response() {
        let text = transcript(|listener| listener.on_request("HELLO", None, false));
        assert!(text.contains("Failed sending message\nReceived no response\n"));
    }
}
