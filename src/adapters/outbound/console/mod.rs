/// Console adapters for progress and the end-of-run summary
mod progress_reporter;
mod summary;

pub use progress_reporter::StderrProgressReporter;
pub use summary::SummaryFormatter;
