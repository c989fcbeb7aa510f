pub mod publish;

pub use publish::{PublishOutcome, PublishService};
