//! Pipelines - move records from a source into a sink
//!
//! [`pump`] runs both ends on the calling thread. [`pump_pipelined`] moves
//! the source onto a scoped thread and hands records over a bounded
//! channel, so reading and writing overlap while memory stays bounded by the
//! channel capacity.

use std::thread;
use crossbeam::channel::{bounded, Receiver};
use crate::Result;
use crate::stream::{NodeRecord, RecordSink, RecordSource};

/// Copy every record from `source` into `sink`, then finish the sink.
/// Returns the number of records moved.
pub fn pump<S, K>(mut source: S, sink: &mut K) -> Result<usize>
where
    S: RecordSource,
    K: RecordSink + ?Sized,
{
    let mut count = 0;
    while let Some(record) = source.next_record()? {
        sink.write_record(record)?;
        count += 1;
    }
    sink.finish()?;
    tracing::debug!("Pumped {} records", count);
    Ok(count)
}

/// Like [`pump`], with the source running on its own thread.
///
/// If the sink fails, the channel closes and the producer stops at its next
/// send. A source error is forwarded through the channel and returned.
pub fn pump_pipelined<S, K>(source: S, sink: &mut K, capacity: usize) -> Result<usize>
where
    S: RecordSource + Send,
    K: RecordSink + ?Sized,
{
    let (tx, rx) = bounded::<Result<NodeRecord>>(capacity.max(1));

    thread::scope(|scope| {
        let producer = scope.spawn(move || {
            let mut source = source;
            loop {
                let item = match source.next_record() {
                    Ok(Some(record)) => Ok(record),
                    Ok(None) => break,
                    Err(e) => Err(e),
                };
                let failed = item.is_err();
                if tx.send(item).is_err() || failed {
                    break;
                }
            }
        });

        let result = drain(rx, sink);
        if let Err(panic) = producer.join() {
            std::panic::resume_unwind(panic);
        }
        result
    })
}

fn drain<K: RecordSink + ?Sized>(rx: Receiver<Result<NodeRecord>>, sink: &mut K) -> Result<usize> {
    let mut count = 0;
    for item in rx {
        sink.write_record(item?)?;
        count += 1;
    }
    sink.finish()?;
    tracing::debug!("Pumped {} records through the pipeline", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::decode::ResolutionMode;
    use crate::encode::Encoder;
    use crate::model;

    fn sample() -> crate::Graph {
        let mut g = model::sample_graph(model::registry().unwrap()).unwrap();
        g.link(ResolutionMode::Strict).unwrap();
        g
    }

    /// Fails on the n-th record
    struct FailingSink {
        seen: usize,
        fail_at: usize,
    }

    impl RecordSink for FailingSink {
        fn write_record(&mut self, _record: NodeRecord) -> Result<()> {
            self.seen += 1;
            if self.seen == self.fail_at {
                return Err(Error::Document("sink full".into()));
            }
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            Ok(())
        }
    }

    /// Pops records off a list, then errors
    struct FailingSource {
        records: Vec<NodeRecord>,
    }

    impl RecordSource for FailingSource {
        fn next_record(&mut self) -> Result<Option<NodeRecord>> {
            match self.records.pop() {
                Some(record) => Ok(Some(record)),
                None => Err(Error::Document("source broke".into())),
            }
        }
    }

    #[test]
    fn test_pipelined_matches_sequential() {
        let g = sample();
        let mut sequential: Vec<NodeRecord> = Vec::new();
        let a = pump(Encoder::new(&g), &mut sequential).unwrap();
        let mut pipelined: Vec<NodeRecord> = Vec::new();
        let b = pump_pipelined(Encoder::new(&g), &mut pipelined, 2).unwrap();
        assert_eq!(a, b);
        assert_eq!(sequential, pipelined);
    }

    #[test]
    fn test_sink_failure_stops_producer() {
        let g = sample();
        let mut sink = FailingSink { seen: 0, fail_at: 2 };
        // capacity 1 keeps the producer blocked on send until the sink bails
        let err = pump_pipelined(Encoder::new(&g), &mut sink, 1).unwrap_err();
        assert!(err.to_string().contains("sink full"));
        assert_eq!(sink.seen, 2);
    }

    #[test]
    fn test_source_failure_propagates() {
        let g = sample();
        let mut records = Encoder::new(&g).collect_records().unwrap();
        records.truncate(3);
        let mut sink: Vec<NodeRecord> = Vec::new();
        let err = pump_pipelined(FailingSource { records }, &mut sink, 4).unwrap_err();
        assert!(err.to_string().contains("source broke"));
        assert_eq!(sink.len(), 3);
    }
}
