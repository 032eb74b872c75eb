use std::path::PathBuf;

use clap::{ArgAction, Parser};
use spark_client::{Charset, Framing};

/// Send text requests to a TCP server and print every transaction.
#[derive(Debug, Parser)]
#[command(name = "spark-client", author, version, about)]
pub struct Args {
    /// Server host name or IP address.
    pub host: String,

    /// Server port.
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Messages to send, one transaction each, in order.
    #[arg(required = true)]
    pub messages: Vec<String>,

    /// How long to wait for each response, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Upper bound for resolving and connecting, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub connect_timeout_ms: Option<u64>,

    /// Payload charset: utf-8 or latin-1.
    #[arg(long)]
    pub charset: Option<Charset>,

    /// Response framing: chunk (one response per read) or line.
    #[arg(long)]
    pub framing: Option<Framing>,

    /// TOML file with client settings; flags take precedence.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace). RUST_LOG wins when set.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
