use std::process::exit;

#[tokio::main]
async fn main() {
    if let Err(e) = red_light::start().await {
        log::error!("{}", e);
        eprintln!("red-light: {}", e);
        exit(1);
    }
}
