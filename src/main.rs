//! Landing CMS - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    if let Err(e) = landing_cms::run().await {
        tracing::error!("Server stopped: {}", e);
        eprintln!("landing-cms: {}", e);
        std::process::exit(1);
    }
}
