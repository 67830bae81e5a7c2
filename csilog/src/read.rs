use std::{
    io,
    pin::{pin, Pin},
    time::Duration,
};

use async_stream::try_stream;
use csi::log::{check_record, record_len, PREFIX_LEN};
use futures::Stream;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    time::Instant,
};

/// Read the raw records of a capture log.
pub fn read_records(reader: impl AsyncRead) -> impl Stream<Item = anyhow::Result<Vec<u8>>> {
    try_stream! {
        let mut reader = pin!(reader);

        loop {
            let mut prefix = [0; PREFIX_LEN];
            match read_full(&mut reader, &mut prefix).await? {
                0 => break,
                PREFIX_LEN => {}
                got => Err(csi::Error::NotEnoughBytes { needed: PREFIX_LEN, got })?,
            }

            let len = record_len(prefix)?;
            let mut record = vec![0; len];
            let got = read_full(&mut reader, &mut record).await?;
            check_record(len, got)?;

            yield record;
        }
    }
}

/// Like [`AsyncReadExt::read_exact`], but returns the number of bytes read
/// when the input ends early.
async fn read_full(reader: &mut (impl AsyncRead + Unpin), buf: &mut [u8]) -> io::Result<usize> {
    let mut n = 0;

    while n < buf.len() {
        match reader.read(&mut buf[n..]).await? {
            0 => break,
            read => n += read,
        }
    }

    Ok(n)
}

/// Delays entries to the pace at which they were captured, going by the
/// NIC's 1 MHz clock.
pub struct Pacer {
    start: Instant,
    last: Option<u32>,
    elapsed: Duration,
}

impl Pacer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            last: None,
            elapsed: Duration::ZERO,
        }
    }

    pub async fn wait(&mut self, timestamp_low: u32) {
        if let Some(last) = self.last {
            // the clock wraps around every ~72 minutes
            self.elapsed += Duration::from_micros(timestamp_low.wrapping_sub(last) as u64);
        }
        self.last = Some(timestamp_low);

        tokio::time::sleep_until(self.start + self.elapsed).await;
    }
}

pub enum LogSource {
    Stdin(tokio::io::Stdin),
    File(tokio::fs::File),
}

impl AsyncRead for LogSource {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            LogSource::Stdin(r) => Pin::new(r).poll_read(cx, buf),
            LogSource::File(f) => Pin::new(f).poll_read(cx, buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use csi::{
        header::{CsiHeader, RateWidth},
        matrix::calc_len,
        Error, Options,
    };
    use futures::StreamExt;

    use super::{read_records, Pacer};

    fn record(b: &[u8]) -> Vec<u8> {
        let mut out = (b.len() as u16).to_be_bytes().to_vec();
        out.extend_from_slice(b);
        out
    }

    fn record_error(res: &anyhow::Result<Vec<u8>>) -> Option<&Error> {
        res.as_ref().err().and_then(|err| err.downcast_ref())
    }

    #[tokio::test]
    async fn records() {
        let log: &[u8] = &[0x00, 0x01, 0xbb, 0x00, 0x02, 0xc1, 0x01];
        let records = read_records(log).collect::<Vec<_>>().await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].as_ref().unwrap(), &[0xbb]);
        assert_eq!(records[1].as_ref().unwrap(), &[0xc1, 0x01]);
    }

    #[tokio::test]
    async fn decode_logged_entries() {
        let mut log = vec![];
        for bfee_count in 0..3 {
            let mut header = CsiHeader::new(2, 3);
            header.bfee_count = bfee_count;
            header.rssi = [30, 31, 0];

            let mut entry = header.to_bytes(RateWidth::Wide);
            entry.extend(vec![0x11; calc_len(2, 3)]);
            log.extend(record(&entry));
        }

        let opts = Options {
            rate_width: RateWidth::Wide,
            ..Default::default()
        };

        let counts = read_records(log.as_slice())
            .map(|record| {
                let entry = csi::decode_entry(&record.unwrap(), &opts, &mut ());
                assert!(entry.is_correct(), "{:?}", entry.error());
                entry.header.unwrap().bfee_count
            })
            .collect::<Vec<_>>()
            .await;

        assert_eq!(counts, [0, 1, 2]);
    }

    #[tokio::test]
    async fn bad_length_ends_stream() {
        let mut log = record(&[0xbb]);
        log.extend([0x00, 0x00]);
        log.extend(record(&[0xbb]));

        let records = read_records(log.as_slice()).collect::<Vec<_>>().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].as_ref().unwrap(), &[0xbb]);
        assert_eq!(record_error(&records[1]), Some(&Error::ZeroLength));

        let log: &[u8] = &[0x10, 0x01, 0xbb];
        let records = read_records(log).collect::<Vec<_>>().await;
        assert_eq!(records.len(), 1);
        assert_eq!(record_error(&records[0]), Some(&Error::Oversized(4097)));
    }

    #[tokio::test]
    async fn truncated_record() {
        let mut log = record(&[0xbb; 10]);
        log.truncate(8);

        let records = read_records(log.as_slice()).collect::<Vec<_>>().await;
        assert_eq!(records.len(), 1);
        assert_eq!(
            record_error(&records[0]),
            Some(&Error::NotEnoughBytes { needed: 10, got: 6 })
        );

        let log: &[u8] = &[0x00];
        let records = read_records(log).collect::<Vec<_>>().await;
        assert_eq!(
            record_error(&records[0]),
            Some(&Error::NotEnoughBytes { needed: 2, got: 1 })
        );
    }

    #[tokio::test]
    async fn pacer_handles_wraparound() {
        let mut pacer = Pacer::new();

        pacer.wait(u32::MAX - 499).await;
        pacer.wait(500).await;

        assert_eq!(pacer.elapsed, Duration::from_micros(1000));
        assert!(pacer.start.elapsed() >= pacer.elapsed);
    }
}
