use tokio::net::TcpListener;
use tracing::info;

use todo_sync::config::MockServerConfig;
use todo_sync::logging;
use todo_sync::mock::{self, MockState, repository};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    logging::init("todo_sync=debug");

    let config = MockServerConfig::new_from_env()?;

    let pool = repository::connect(&config.database_url).await?;
    let state = MockState { db: pool };

    let app = mock::router(state);

    info!("listening on http://{}", config.addr);

    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
