use std::io::Write;

use tracing::instrument;

use crate::cli::ShowArgs;
use crate::client::{AppContext, CliResult};
use crate::output::render_snapshot;

#[instrument(name = "cli.show", skip_all)]
pub(crate) async fn handle_show(
    ctx: &AppContext,
    args: ShowArgs,
    out: &mut impl Write,
) -> CliResult<()> {
    let store = ctx.hydrate().await?;
    render_snapshot(out, &store.snapshot(), args.format)
}
