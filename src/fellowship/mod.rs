pub mod bumper;

pub use bumper::FellowshipBumper;

use tracing::instrument;

use crate::chain::ChainView;
use crate::error::AppResult;
use crate::execution::{Sender, SubmissionReport};

/// Member bumps, then the salary cycle; params are read once for both
#[instrument(skip_all)]
pub async fn bump_fellowship(view: ChainView<'_>, sender: &Sender) -> AppResult<SubmissionReport> {
    let bumper = FellowshipBumper::load(view).await?;

    let mut report = bumper.bump_members(sender).await?;
    report.merge(&bumper.bump_salary_cycle(sender).await?);
    Ok(report)
}
