//! LOD encoding off the render timeline.
//!
//! The cache hands an [`EncodeJob`] (a snapshot of the level-0 grid) to an
//! encoder. [`InlineEncoder`] does the work immediately; [`TokioEncoder`] runs
//! it on the blocking pool and the results are drained at the start of a frame.

use std::sync::Arc;

use bytes::Bytes;
use codec::{CodecError, ColorIndex, LodLevel, encode_level};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::coords::SectorCoord;

/// One level to encode from a grid snapshot.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub sector: SectorCoord,
    pub level: LodLevel,
    /// Sector generation the snapshot was taken at.
    pub generation: u64,
    pub cells: Arc<[ColorIndex]>,
}

impl EncodeJob {
    pub fn run(self) -> EncodedLod {
        let result = encode_level(&self.cells, self.level);
        EncodedLod {
            sector: self.sector,
            level: self.level,
            generation: self.generation,
            result,
        }
    }
}

/// Output of an [`EncodeJob`].
#[derive(Debug, Clone)]
pub struct EncodedLod {
    pub sector: SectorCoord,
    pub level: LodLevel,
    pub generation: u64,
    pub result: Result<Bytes, CodecError>,
}

/// Outcome of a submission.
#[derive(Debug)]
pub enum Submitted {
    Ready(EncodedLod),
    Pending,
}

/// Offload collaborator for downsample + encode work.
pub trait LodEncoder: Send {
    fn submit(&mut self, job: EncodeJob) -> Submitted;

    /// Completed jobs since the last call. Must not block.
    fn poll_completed(&mut self) -> Vec<EncodedLod>;

    /// Jobs submitted but not yet returned by `poll_completed`.
    fn pending(&self) -> usize {
        0
    }
}

/// Encodes on the calling thread.
#[derive(Debug, Default)]
pub struct InlineEncoder;

impl LodEncoder for InlineEncoder {
    fn submit(&mut self, job: EncodeJob) -> Submitted {
        Submitted::Ready(job.run())
    }

    fn poll_completed(&mut self) -> Vec<EncodedLod> {
        Vec::new()
    }
}

/// Encodes on tokio's blocking pool.
#[derive(Debug)]
pub struct TokioEncoder {
    handle: Handle,
    tx: mpsc::UnboundedSender<EncodedLod>,
    rx: mpsc::UnboundedReceiver<EncodedLod>,
    pending: usize,
}

impl TokioEncoder {
    pub fn new(handle: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            handle,
            tx,
            rx,
            pending: 0,
        }
    }
}

impl LodEncoder for TokioEncoder {
    fn submit(&mut self, job: EncodeJob) -> Submitted {
        let tx = self.tx.clone();
        self.pending += 1;
        self.handle.spawn_blocking(move || {
            // The receiver lives as long as the encoder; a closed channel just
            // means nobody wants the result any more.
            let _ = tx.send(job.run());
        });
        Submitted::Pending
    }

    fn poll_completed(&mut self) -> Vec<EncodedLod> {
        let mut done = Vec::new();
        while let Ok(encoded) = self.rx.try_recv() {
            done.push(encoded);
        }
        self.pending = self.pending.saturating_sub(done.len());
        done
    }

    fn pending(&self) -> usize {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::{SECTOR_CELLS, decode_level};
    use std::time::Duration;

    fn job(level: LodLevel) -> EncodeJob {
        let mut cells = vec![0u8; SECTOR_CELLS];
        cells[..1024].fill(5);
        EncodeJob {
            sector: SectorCoord::new(2, -1),
            level,
            generation: 7,
            cells: cells.into(),
        }
    }

    #[test]
    fn test_inline_encoder_is_ready_immediately() {
        let mut encoder = InlineEncoder;
        let Submitted::Ready(encoded) = encoder.submit(job(LodLevel::L2)) else {
            panic!("inline encoder must complete synchronously");
        };
        assert_eq!(encoded.generation, 7);
        let cells = decode_level(&encoded.result.unwrap(), LodLevel::L2).unwrap();
        assert_eq!(cells.len(), LodLevel::L2.cells());
        assert!(encoder.poll_completed().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tokio_encoder_completes_off_thread() {
        let mut encoder = TokioEncoder::new(Handle::current());
        assert!(matches!(encoder.submit(job(LodLevel::L1)), Submitted::Pending));
        assert!(matches!(encoder.submit(job(LodLevel::L3)), Submitted::Pending));
        assert_eq!(encoder.pending(), 2);

        let mut done = Vec::new();
        for _ in 0..200 {
            done.extend(encoder.poll_completed());
            if done.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(done.len(), 2);
        assert_eq!(encoder.pending(), 0);
        for encoded in done {
            assert_eq!(encoded.sector, SectorCoord::new(2, -1));
            assert!(encoded.result.is_ok());
        }
    }
}
