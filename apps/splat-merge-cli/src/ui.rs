use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use splat_merge::MergeMessage;

/// One tick per input, with log lines printed above the bar.
pub struct MergeProgress {
    bar: ProgressBar,
}

impl MergeProgress {
    pub fn new(inputs: usize, logger: env_logger::Logger) -> anyhow::Result<Self> {
        let multi = MultiProgress::new();
        let level = logger.filter();
        LogWrapper::new(multi.clone(), logger).try_init()?;
        log::set_max_level(level);

        let bar = multi.add(ProgressBar::new(inputs as u64));
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )?
            .progress_chars("#>-"),
        );
        Ok(Self { bar })
    }

    pub fn update(&self, message: &MergeMessage<'_>) {
        match message {
            MergeMessage::Loaded { path, points } => {
                self.bar.inc(1);
                self.bar
                    .set_message(format!("{points} points from {}", path.display()));
            }
            MergeMessage::Skipped { path } => {
                self.bar.inc(1);
                self.bar.set_message(format!("skipped {}", path.display()));
            }
            MergeMessage::Saving { path, points } => {
                self.bar
                    .set_message(format!("saving {points} points to {}", path.display()));
            }
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
