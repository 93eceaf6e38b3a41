use log::info;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use DerivadaWeb::config::ServerConfig;
use DerivadaWeb::server::app;

#[tokio::main]
async fn main() {
    let config = ServerConfig::from_env();
    TermLogger::init(
        config.log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("logger already initialized");

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|error| panic!("cannot listen on {}: {}", address, error));
    info!("Derivación paso a paso en http://{}", address);
    axum::serve(listener, app())
        .await
        .expect("server terminated unexpectedly");
}
