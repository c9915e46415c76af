use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use filedepot::cli::{ClientCommand, ClientOpts};
use filedepot::Client;

fn main() -> Result<()> {
    let opts = ClientOpts::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    rt.block_on(run(opts))
}

async fn run(opts: ClientOpts) -> Result<()> {
    let mut client = Client::connect(&opts.server)
        .await
        .with_context(|| format!("Failed to connect to {}", opts.server))?;

    if let (Some(user), Some(password)) = (&opts.user, &opts.password) {
        let welcome = client.login(user, password).await.context("Login failed")?;
        println!("{welcome}");
    }

    match &opts.command {
        ClientCommand::List => {
            for name in client.list().await? {
                println!("{name}");
            }
        }
        ClientCommand::Upload { name } => {
            let bytes = client
                .upload(&opts.dir, name)
                .await
                .with_context(|| format!("Upload of {name} failed"))?;
            println!("Uploaded {name} ({bytes} bytes)");
        }
        ClientCommand::Download { name } => {
            std::fs::create_dir_all(&opts.dir)
                .with_context(|| format!("Failed to create {}", opts.dir.display()))?;
            let bytes = client
                .download(name, &opts.dir)
                .await
                .with_context(|| format!("Download of {name} failed"))?;
            println!("Downloaded {name} ({bytes} bytes)");
        }
        ClientCommand::Delete { name } => {
            println!("{}", client.delete(name).await?);
        }
    }

    client.exit().await?;
    Ok(())
}
