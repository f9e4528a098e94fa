#[tokio::main]
async fn main() {
    qa_portal::start_server().await;
}
