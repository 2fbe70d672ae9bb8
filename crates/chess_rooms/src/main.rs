#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lib_chess_rooms::init().await
}
