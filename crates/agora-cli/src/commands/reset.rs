use std::io::Write;

use tracing::instrument;

use crate::client::{AppContext, CliResult};
use crate::output::write_line;

#[instrument(name = "cli.reset", skip_all)]
pub(crate) async fn handle_reset(ctx: &AppContext, out: &mut impl Write) -> CliResult<()> {
    let store = ctx.hydrate().await?;
    if !store.reset_to_defaults() {
        return write_line(out, "Preferences already match defaults.");
    }
    store.save().await?;
    write_line(out, "Preferences reset to defaults.")
}
