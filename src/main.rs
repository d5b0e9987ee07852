use anyhow::Context;

use epoll_responder::config::Config;
use epoll_responder::server::EventLoop;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::default();

    let mut event_loop = EventLoop::bind(cfg).context("Failed to start web server")?;
    tracing::info!(
        "Web server started. Listening on port {}...",
        event_loop.local_addr().port()
    );

    event_loop.run()?;

    Ok(())
}
