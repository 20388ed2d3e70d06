//! putn-run: runs the `generated.wasm` installed beside this executable.
//!
//! The module may print integers through `env::js_putn`, one per line on
//! stdout. Logs and the failure diagnostic go to stderr.
//!
//! Exit status: 0 on success; 2 load, 3 link, 4 resolve, 5 invoke failure.
//!
//! Usage:
//!   putn-run

use putn_host::HostImports;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> ExitCode {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .compact()
        .init();

    match putn_host::run_installed(HostImports::stdout()) {
        Ok(completion) => {
            info!(
                host_calls = completion.host_calls,
                peak_memory_bytes = completion.peak_memory_bytes,
                "Entry point returned"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(stage = %e.stage(), "{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
