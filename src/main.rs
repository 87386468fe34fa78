use leaf_model_service::pipeline::Variant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    leaf_model_service::run(Variant::Plain).await
}
