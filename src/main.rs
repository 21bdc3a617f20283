#[actix_web::main]
async fn main() {
    if let Err(err) = datatables_service::run().await {
        eprintln!("datatables-service failed: {}", err);
        std::process::exit(1);
    }
}
