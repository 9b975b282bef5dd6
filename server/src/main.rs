//! Trivia lobby server.
//!
//! Run with: cargo run --bin trivia-lobby-server -- --port 3000

use clap::Parser;
use tracing_subscriber::EnvFilter;
use trivia_lobby_server::Server;

#[derive(Parser, Debug)]
#[command(name = "trivia-lobby-server")]
#[command(about = "Real-time lobby server for shared trivia boards")]
struct Args {
    #[arg(long, env = "TRIVIA_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(short, long, env = "TRIVIA_PORT", default_value_t = 3000)]
    port: u16,

    /// Origins allowed to connect. Any origin when empty.
    #[arg(long = "allow-origin", env = "TRIVIA_ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,

    #[arg(long, env = "TRIVIA_CODE_LENGTH", default_value_t = 6)]
    code_length: usize,

    #[arg(long, env = "TRIVIA_MAX_CODE_ATTEMPTS", default_value_t = 16)]
    max_code_attempts: usize,

    /// Largest inbound WebSocket frame in bytes (read buffer).
    #[arg(long, env = "TRIVIA_MAX_FRAME_SIZE", default_value_t = 64 * 1024)]
    max_frame_size: usize,

    /// Messages buffered per connection (write buffer).
    #[arg(long, env = "TRIVIA_OUTBOUND_BUFFER", default_value_t = 64)]
    outbound_buffer: usize,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    println!("Starting trivia lobby server...");
    println!("  HTTP: http://{}:{}", args.host, args.port);
    println!();
    println!("Endpoints:");
    println!("  POST /createlobby           - Create lobby (body: {{\"gameRows\": [...], \"creatorNickname\": \"name\"}})");
    println!("  GET  /lobbies/{{code}}        - Lobby board and roster");
    println!("  GET  /joinlobby             - WebSocket, send code or {{\"code\", \"nickname\"}}");
    println!("  GET  /lobbies/{{code}}/join   - WebSocket, joins on connect (?nickname=...)");
    println!();

    let server = Server::builder()
        .http_addr(format!("{}:{}", args.host, args.port))
        .allowed_origins(args.allowed_origins)
        .code_length(args.code_length)
        .max_code_attempts(args.max_code_attempts)
        .max_frame_size(args.max_frame_size)
        .outbound_buffer(args.outbound_buffer)
        .build()?;

    server.run().await?;

    Ok(())
}
