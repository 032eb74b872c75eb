//! `spark-client` 命令行入口。
//!
//! 只负责进程级装配：解析参数、安装日志、叠加配置，然后驱动
//! `connect → request × N → close`；事务转录由 [`console::ConsoleListener`] 打印。

mod args;
mod console;
mod logging;
mod settings;

use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use spark_client::{Endpoint, TcpClient};

use crate::{args::Args, console::ConsoleListener};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(error) = logging::install(args.verbose) {
        eprintln!("warning: {error:#}");
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "spark-client failed");
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = settings::resolve(&args)?;
    let endpoint = Endpoint::new(args.host.clone(), args.port)?;
    let listener = Arc::new(ConsoleListener::stdout(endpoint.clone()));
    let client = TcpClient::with_config(endpoint.clone(), config, listener)?;

    if let Err(error) = client.connect().await {
        client.close().await;
        return Err(error).with_context(|| format!("could not open connection to {endpoint}"));
    }

    send_all(&client, &args.messages).await
}

/// 逐条发送请求，无论成败都先关闭客户端再返回。
async fn send_all(client: &TcpClient, messages: &[String]) -> anyhow::Result<()> {
    let result = exchange(client, messages).await;
    client.close().await;
    result
}

async fn exchange(client: &TcpClient, messages: &[String]) -> anyhow::Result<()> {
    for message in messages {
        let outcome = client
            .request(message.as_str())
            .await
            .with_context(|| format!("could not send message {message}"))?;
        tracing::debug!(
            request = %outcome.request,
            success = outcome.success,
            resolution = %outcome.resolution,
            "transaction finished"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io, time::Duration};

    use parking_lot::Mutex;
    use spark_client::ClientState;
    use tokio::{io::AsyncReadExt, net::TcpListener, sync::oneshot};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_request_still_closes_before_reporting() -> anyhow::Result<()> {
        let server = TcpListener::bind("127.0.0.1:0").await?;
        let port = server.local_addr()?.port();
        let (read_tx, read_rx) = oneshot::channel();
        tokio::spawn(async move {
            let Ok((mut stream, _)) = server.accept().await else {
                return;
            };
            let mut buf = [0_u8; 64];
            if matches!(stream.read(&mut buf).await, Ok(read) if read > 0) {
                let _ = read_tx.send(());
            }
            // 不回复，等待客户端关闭。
            let _ = stream.read(&mut buf).await;
        });

        let endpoint = Endpoint::new("127.0.0.1", port)?;
        let out = SharedBuffer::default();
        let listener = Arc::new(ConsoleListener::new(endpoint.clone(), out.clone()));
        let client = Arc::new(TcpClient::new(endpoint.host(), port, listener)?);
        client.connect().await?;

        let holder = {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                client
                    .request_with_timeout("HOLD", Duration::from_secs(30))
                    .await
            })
        };
        read_rx.await?;

        // 槽已被占用，第一条消息即失败。
        let result = send_all(&client, &["PING".to_owned()]).await;

        let error = result.expect_err("在途事务期间的请求应失败");
        assert!(format!("{error:#}").contains("could not send message PING"));
        assert_eq!(client.state(), ClientState::Closed);
        assert!(out.text().contains("Closing connection\n"));

        let held = holder.await??;
        assert_eq!(held.resolution, spark_client::Resolution::Closed);
        Ok(())
    }
}
