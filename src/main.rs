//! AI Learning Path Generation Service - Backend Server

use learning_agent::api::run_server;
use learning_agent::config::AgentConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    println!("╔══════════════════════════════════════════╗");
    println!("║   AI Learning Path Agent - Backend       ║");
    println!("╚══════════════════════════════════════════╝");

    let config = AgentConfig::from_env();
    run_server(config).await
}
