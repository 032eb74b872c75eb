//! 配置叠加：默认值 ← TOML 文件 ← 命令行参数。
//!
//! 文件示例：
//!
//! ```toml
//! response_timeout_ms = 2000
//! connect_timeout_ms = 10000
//! charset = "utf-8"
//! framing = "line"
//! max_line_length = 4096
//!
//! [socket]
//! keepalive = true
//! nodelay = true
//! linger_ms = 500
//! ```

use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use spark_client::{Charset, ClientConfig, Framing, TcpSocketConfig};

use crate::args::Args;

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub response_timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub close_timeout_ms: Option<u64>,
    pub charset: Option<String>,
    pub framing: Option<String>,
    pub max_line_length: Option<usize>,
    pub read_buffer_size: Option<usize>,
    pub socket: SocketSection,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SocketSection {
    pub keepalive: Option<bool>,
    pub nodelay: Option<bool>,
    pub linger_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// 把文件中出现的字段覆盖到 `config` 上。
    pub fn apply(&self, mut config: ClientConfig) -> anyhow::Result<ClientConfig> {
        if let Some(ms) = self.response_timeout_ms {
            config = config.with_response_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.connect_timeout_ms {
            config = config.with_connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.close_timeout_ms {
            config = config.with_close_timeout(Duration::from_millis(ms));
        }
        if let Some(name) = &self.charset {
            config = config.with_charset(name.parse::<Charset>()?);
        }
        if let Some(name) = &self.framing {
            config = config.with_framing(name.parse::<Framing>()?);
        }
        if let Some(size) = self.read_buffer_size {
            config = config.with_read_buffer_size(size);
        }
        let socket = self.socket.apply(config.socket().clone());
        Ok(config.with_socket(socket))
    }
}

impl SocketSection {
    fn apply(&self, mut socket: TcpSocketConfig) -> TcpSocketConfig {
        if let Some(keepalive) = self.keepalive {
            socket = socket.with_keepalive(keepalive);
        }
        if let Some(nodelay) = self.nodelay {
            socket = socket.with_nodelay(nodelay);
        }
        if let Some(ms) = self.linger_ms {
            socket = socket.with_linger(Some(Duration::from_millis(ms)));
        }
        socket
    }
}

/// 计算最终的客户端配置。
pub fn resolve(args: &Args) -> anyhow::Result<ClientConfig> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let mut config = file.apply(ClientConfig::default())?;

    if let Some(ms) = args.timeout_ms {
        config = config.with_response_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = args.connect_timeout_ms {
        config = config.with_connect_timeout(Duration::from_millis(ms));
    }
    if let Some(charset) = args.charset {
        config = config.with_charset(charset);
    }
    if let Some(framing) = args.framing {
        config = config.with_framing(framing);
    }
    // 行预算只在最终选择了行分帧时生效。
    if let (Framing::Line { .. }, Some(max_length)) = (config.framing(), file.max_line_length) {
        config = config.with_framing(Framing::Line { max_length });
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["spark-client", "localhost", "9000", "PING"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("参数合法")
    }

    #[test]
    fn parses_every_field() {
        let file = FileConfig::parse(
            r#"
            response_timeout_ms = 2000
            charset = "latin-1"
            framing = "line"
            max_line_length = 64

            [socket]
            keepalive = false
            linger_ms = 250
            "#,
        )
        .expect("配置合法");
        assert_eq!(file.response_timeout_ms, Some(2000));
        assert_eq!(file.socket.keepalive, Some(false));

        let config = file.apply(ClientConfig::default()).expect("字段可解析");
        assert_eq!(config.response_timeout(), Duration::from_secs(2));
        assert_eq!(config.charset(), Charset::Latin1);
        assert!(!config.socket().keepalive());
        assert_eq!(config.socket().linger(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_names() {
        assert!(FileConfig::parse("retries = 3").is_err());
        let bad = FileConfig::parse(r#"charset = "ebcdic""#).expect("语法合法");
        assert!(bad.apply(ClientConfig::default()).is_err());
    }

    #[test]
    fn flags_override_file_values() {
        let path = std::env::temp_dir().join(format!(
            "spark-client-settings-{}.toml",
            std::process::id()
        ));
        fs::write(
            &path,
            "response_timeout_ms = 9000\nframing = \"chunk\"\nmax_line_length = 32\n",
        )
        .expect("写入临时配置");
        let path_arg = path.to_string_lossy().into_owned();

        let config = resolve(&args(&["--config", &path_arg, "--timeout-ms", "1500", "--framing", "line"]))
            .expect("配置可解析");
        let _ = fs::remove_file(&path);

        assert_eq!(config.response_timeout(), Duration::from_millis(1500));
        assert_eq!(config.framing(), Framing::Line { max_length: 32 });
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let error = resolve(&args(&["--config", "/nonexistent/spark-client.toml"]))
            .expect_err("文件不存在");
        assert!(format!("{error:#}").contains("/nonexistent/spark-client.toml"));
    }
}
