/// wasmify CLI
///
/// Compiles a TypeScript module exporting typed functions into a Wasm
/// component with a synthesized WIT world.
use tracing_subscriber::EnvFilter;
use wasmify_core::cli;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
