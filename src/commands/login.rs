use std::io::Write;

use tracing::{debug, warn};

use super::CommandContext;
use crate::error::{BimoError, BimoResult};
use crate::login::DeviceLoginPoller;

/// `bimo login`: device-code flow, then persist token and gateway URL.
pub async fn run(ctx: &CommandContext, out: &mut impl Write, open_browser: bool) -> BimoResult<()> {
    let gateway = ctx.anonymous_gateway()?;
    let poller = DeviceLoginPoller::new(&gateway);
    let session = poller.start().await?;

    let base = gateway.base_url();
    writeln!(
        out,
        "To authenticate, a browser will open to: {}",
        session.verification_url(base)
    )
    .map_err(BimoError::Output)?;
    writeln!(out, "Enter code: {}", session.user_code).map_err(BimoError::Output)?;
    out.flush().map_err(BimoError::Output)?;

    if open_browser {
        let url = session.browser_url(base);
        if let Err(err) = webbrowser::open(&url) {
            warn!(error = %err, "Could not open a browser; visit the URL above");
        }
    }

    let token = poller
        .poll_until_complete(&session, || {
            // Progress output is cosmetic.
            let _ = write!(out, ".").and_then(|_| out.flush());
        })
        .await?;

    ctx.session_store.save(Some(&token), Some(base))?;
    debug!(path = %ctx.session_store.path().display(), "Stored login token");
    writeln!(out, "Login successful.").map_err(BimoError::Output)?;
    Ok(())
}
