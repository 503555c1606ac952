use clap::Parser;
use client::input::InputManager;
use client::network::Client;
use client::rendering::Renderer;
use log::info;
use std::io::Write;
use tokio::io::AsyncBufRead;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server URL to connect to
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8080")]
    server: String,

    /// Display name; asked for when missing
    #[arg(short = 'n', long)]
    name: Option<String>,
}

/// Asks for a name until a non-blank line arrives. None when input ends.
async fn prompt_name<R, W>(
    input: &mut InputManager<R>,
    renderer: &mut Renderer<W>,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    renderer.notice("Enter your name:")?;
    input.next_line().await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let mut input = InputManager::stdin();
    let mut renderer = Renderer::stdout();

    let mut name = match args.name {
        Some(name) => name,
        None => match prompt_name(&mut input, &mut renderer).await? {
            Some(name) => name,
            None => return Ok(()),
        },
    };

    loop {
        info!("Connecting to {} as {}", args.server, name);
        let client = Client::connect(&args.server, &name).await?;
        let end = client.run(&mut input, &mut renderer).await?;

        if !end.should_retry_name() {
            renderer.notice(&format!("Disconnected: {}", end.reason))?;
            break;
        }

        match prompt_name(&mut input, &mut renderer).await? {
            Some(next) => name = next,
            None => break,
        }
    }

    Ok(())
}
