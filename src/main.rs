#[tokio::main]
async fn main() {
    if let Err(err) = octopus_mcp::mcp::server::run_stdio().await {
        eprintln!("octopus-mcp: {}", err);
        std::process::exit(1);
    }
}
