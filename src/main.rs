//! Starts the demo backends and the reverse proxy in front of them.
//!
//! Without `--config` the classic topology is used: backends on 3000, 4000
//! and 5000, and a proxy on 6000 routing `/a`, `/b` and `/c` to them.
//!
//! ```text
//! curl http://127.0.0.1:6000/a
//! curl -X POST http://127.0.0.1:3000 -H 'Content-Length: 5' -d hello
//! ```

use bare_web::{
    bind, Config, Error, Handled, Handler, Method, Request, ResponseWriter, ReverseProxy,
    RouteTable, Server, StatusCode,
};
use clap::Parser;
use std::{
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
};
use tokio::io::AsyncWrite;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(version, about = "Minimal HTTP/1.1 backends behind a path-routing reverse proxy")]
struct Args {
    /// TOML file describing backends, proxy routes and limits
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// IPv4 address every listener binds to
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    host: Ipv4Addr,
}

/// GET answers with the greeting, POST echoes the body back with `201 Created`.
struct Greeting {
    text: String,
}

impl Handler for Greeting {
    async fn handle<W>(&self, resp: &mut ResponseWriter<'_, W>, req: &Request) -> Handled
    where
        W: AsyncWrite + Unpin + Send,
    {
        resp.header("Content-Type", "text/plain");

        match req.method() {
            Method::Get => {
                resp.status(StatusCode::Ok).write(self.text.as_bytes()).await?;
            }
            Method::Post => {
                let Some(body) = req.body() else {
                    return Err(Error::handler("POST without a body"));
                };
                resp.status(StatusCode::Created).write(body.as_bytes()).await?;
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bare_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    tracing::info!(
        backends = config.backends.len(),
        routes = config.proxy.routes.len(),
        proxy_port = config.proxy.port,
        "configuration loaded"
    );

    for backend in &config.backends {
        let listener = bind(
            SocketAddr::from((args.host, backend.port)),
            &config.server,
        )?;
        let server = Server::builder()
            .listener(listener)
            .handler(Greeting {
                text: backend.greeting.clone(),
            })
            .connection_limits(config.connection.clone())
            .build();

        tokio::spawn(server.launch());
    }

    let listener = bind(SocketAddr::from((args.host, config.proxy.port)), &config.server)?;
    let proxy = Server::builder()
        .listener(listener)
        .handler(ReverseProxy::new(RouteTable::from_config(&config.proxy)))
        .connection_limits(config.connection.clone())
        .build();

    tokio::spawn(proxy.launch());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    Ok(())
}
