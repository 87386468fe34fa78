use leaf_model_service::pipeline::Variant;

// Same service, but uploads are re-encoded as size-bounded JPEGs.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    leaf_model_service::run(Variant::Compressed).await
}
