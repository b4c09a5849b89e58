use stratus_cli::display::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = stratus_cli::run().await {
        print_error(&format!("Error: {}", e));
        std::process::exit(1);
    }
}
