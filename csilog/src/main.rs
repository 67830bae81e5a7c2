use std::{path::PathBuf, pin::pin};

use clap::{Parser, ValueEnum};
use csi::{
    diag::{TracingSink, WarnOnce},
    header::{RateWidth, BFEE_NOTIF},
    matrix::SUBCARRIERS,
    Options,
};
use futures::StreamExt;
use tracing::{debug, info, instrument};
use tracing_subscriber::EnvFilter;

use read::{read_records, LogSource, Pacer};

mod read;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Rate {
    /// 8-bit rate field, 20-byte header.
    Narrow,
    /// 16-bit rate_n_flags, 21-byte header.
    Wide,
}

impl From<Rate> for RateWidth {
    fn from(value: Rate) -> Self {
        match value {
            Rate::Narrow => RateWidth::Narrow,
            Rate::Wide => RateWidth::Wide,
        }
    }
}

/// Decode Intel 5300 CSI capture logs.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Capture log, or `-` to read from stdin.
    log: PathBuf,
    /// Width of the rate field at the end of each header.
    #[arg(long, value_enum, default_value_t = Rate::Wide)]
    rate_width: Rate,
    /// Replay entries at the pace they were captured.
    #[arg(long)]
    realtime: bool,
    /// Only print the size and notification code of each record.
    #[arg(long)]
    headers_only: bool,
    /// Channel the capture was made on. Prints the subcarrier frequency
    /// range of every entry.
    #[arg(long)]
    channel: Option<u8>,
}

#[instrument(skip_all, fields(log = %args.log.display()))]
async fn run(args: Args) -> anyhow::Result<()> {
    let opts = Options {
        rate_width: args.rate_width.into(),
        ..Default::default()
    };

    let source = if args.log.as_os_str() == "-" {
        LogSource::Stdin(tokio::io::stdin())
    } else {
        LogSource::File(tokio::fs::File::open(&args.log).await?)
    };

    let mut records = pin!(read_records(source));
    let mut sink = WarnOnce::new(TracingSink);
    let mut pacer = Pacer::new();
    let mut total = 0;
    let mut correct = 0;

    while let Some(record) = records.next().await {
        let record = record?;
        let code = record[0];
        total += 1;

        if args.headers_only {
            println!("entry size={}, code={code:#X}", record.len());
            continue;
        }

        if code != BFEE_NOTIF {
            debug!(code, "skipping non-CSI record");
            continue;
        }

        let entry = csi::decode_entry(&record, &opts, &mut sink);

        if let (true, Some(header)) = (args.realtime, &entry.header) {
            pacer.wait(header.timestamp_low).await;
        }

        if entry.is_correct() {
            correct += 1;
        }

        print!("{entry}");
        if let Some(freqs) = args.channel.and_then(|ch| entry.subcarrier_freqs(ch)) {
            println!(
                "\tsubcarriers [MHz]: {:.4} .. {:.4}",
                freqs[0] / 1e6,
                freqs[SUBCARRIERS - 1] / 1e6
            );
        }
        println!();
    }

    info!(total, correct, "finished reading log");

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    run(Args::parse()).await
}
