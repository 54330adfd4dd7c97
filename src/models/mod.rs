mod activity;
mod classification;

pub use activity::{
    ActivityBatch, ActivityEvent, ActivitySource, BatchOutcome, GoogleContext, YouTubeContext,
};
pub use classification::{Category, Classification, ClassificationSource};
