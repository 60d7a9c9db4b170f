mod app;

use tracing::error;

fn main() {
    if let Err(err) = app::bootstrap::run() {
        error!(error = %err, "startup_failed");
        std::process::exit(1);
    }
}
