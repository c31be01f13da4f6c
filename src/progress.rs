use indicatif::{style::TemplateError, ProgressBar, ProgressStyle};
use poles::{Record, RecordSource, SourceError};

/// Ticks a progress bar for every record read from the wrapped source.
///
/// Every rewind starts a new pass and resets the bar.
pub struct Progress<S> {
    inner: S,
    bar: ProgressBar,
}

impl<S: RecordSource> Progress<S> {
    pub fn new(inner: S) -> Result<Self, TemplateError> {
        let bar = ProgressBar::new(inner.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
                .progress_chars("##-"),
        );
        Ok(Self { inner, bar })
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl<S: RecordSource> RecordSource for Progress<S> {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        let record = self.inner.next_record()?;
        if let Some(record) = &record {
            self.bar.inc(1);
            self.bar.set_message(record.descriptor.clone());
        }
        Ok(record)
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.inner.rewind()?;
        self.bar.reset();
        Ok(())
    }
}
