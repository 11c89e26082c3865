//! Ctrl-C handling for the streaming commands

use std::time::Duration;
use u2fzero_core::custom::CancelToken;

/// Exit status used when a second interrupt forces termination
const FORCED_EXIT: i32 = 130;

/// How long the running loop gets to finish its transfer after the first
/// interrupt; longer than one device read timeout
const GRACE: Duration = Duration::from_millis(1500);

/// Start a watcher thread that cancels the returned token on Ctrl-C
///
/// The first interrupt asks the running loop to stop after its current
/// transfer. If the loop has not returned within [`GRACE`] (for example
/// because it is blocked on stdin), `summary` is called and the process
/// exits with status 0. A second interrupt calls `summary` and exits
/// immediately with status 130.
pub fn watch<F>(summary: F) -> std::io::Result<CancelToken>
where
    F: Fn() + Send + 'static,
{
    let cancel = CancelToken::new();
    let flag = cancel.clone();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                log::info!("Interrupted, stopping after the current transfer");
                flag.cancel();

                match tokio::time::timeout(GRACE, tokio::signal::ctrl_c()).await {
                    Ok(_) => {
                        eprintln!("Interrupted again, exiting");
                        summary();
                        std::process::exit(FORCED_EXIT);
                    }
                    Err(_) => {
                        log::debug!("Still busy after {:?}, exiting", GRACE);
                        summary();
                        std::process::exit(0);
                    }
                }
            })
        })?;

    Ok(cancel)
}
