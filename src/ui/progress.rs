use crate::stream::{NodeRecord, RecordSink};
use crate::ui::output::palette;
use crate::ui::Icons;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if console::Term::stderr().is_term() {
            let pb = ProgressBar::new_spinner();
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.to_string());
        Self { pb }
    }

    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    pub fn finish_with_message(&self, msg: &str) {
        self.pb.finish_with_message(msg.to_string());
    }

    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }
}

/// Record sink wrapper that counts records on a spinner
pub struct ProgressSink<K: RecordSink> {
    inner: K,
    pb: ProgressBar,
    label: String,
}

impl<K: RecordSink> ProgressSink<K> {
    pub fn new(inner: K, label: &str) -> Self {
        let pb = if console::Term::stderr().is_term() {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} {pos} records ({per_sec})") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(label.to_string());
        Self {
            inner,
            pb,
            label: label.to_string(),
        }
    }

    pub fn count(&self) -> u64 {
        self.pb.position()
    }

    pub fn into_inner(self) -> K {
        self.inner
    }

    pub fn finish_with_summary(&self, duration: Duration) {
        self.pb.finish_and_clear();
        println!(
            "{} {}",
            Icons::CHECK.style(palette().ok),
            format!("{}: {} records in {}", self.label, self.count(), HumanDuration(duration))
                .style(palette().ok)
        );
    }
}

impl<K: RecordSink> RecordSink for ProgressSink<K> {
    fn write_record(&mut self, record: NodeRecord) -> crate::Result<()> {
        self.inner.write_record(record)?;
        self.pb.inc(1);
        Ok(())
    }

    fn finish(&mut self) -> crate::Result<()> {
        self.inner.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::ResolutionMode;
    use crate::encode::Encoder;
    use crate::model;
    use crate::pipeline::pump;

    #[test]
    fn test_progress_sink_counts_and_forwards() {
        let mut g = model::sample_graph(model::registry().unwrap()).unwrap();
        g.link(ResolutionMode::Strict).unwrap();
        let mut sink = ProgressSink::new(Vec::<NodeRecord>::new(), "Copying");
        let moved = pump(Encoder::new(&g), &mut sink).unwrap();
        assert_eq!(sink.count(), moved as u64);
        assert_eq!(sink.into_inner().len(), g.len());
    }
}
