use bare_web::{
    bind, limits::ServerLimits, Handled, Handler, Method, Request, ResponseWriter, ReverseProxy,
    RouteTable, Server, StatusCode,
};
use std::net::SocketAddr;
use tokio::{
    io::{AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};

struct Backend(&'static str);

impl Handler for Backend {
    async fn handle<W>(&self, resp: &mut ResponseWriter<'_, W>, req: &Request) -> Handled
    where
        W: AsyncWrite + Unpin + Send,
    {
        match req.method() {
            Method::Get => resp.status(StatusCode::Ok).write(self.0.as_bytes()).await?,
            Method::Post => {
                let echo = format!("{}:{}", self.0, req.body().unwrap_or_default());
                resp.status(StatusCode::Created).write(echo.as_bytes()).await?
            }
        };
        Ok(())
    }
}

async fn spawn<H: Handler>(handler: H) -> SocketAddr {
    let listener = bind("127.0.0.1:0".parse().unwrap(), &ServerLimits::default()).unwrap();
    let addr = listener.local_addr().unwrap();

    let server = Server::builder().listener(listener).handler(handler).build();
    tokio::spawn(server.launch());
    addr
}

async fn send(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut out = String::new();
    stream.read_to_string(&mut out).await.unwrap();
    out
}

async fn topology() -> (SocketAddr, SocketAddr) {
    let a = spawn(Backend("alpha")).await;
    let b = spawn(Backend("beta")).await;
    let routes = RouteTable::new().route("/a", a).route("/b", b);

    (spawn(ReverseProxy::new(routes)).await, a)
}

#[tokio::test]
async fn backend_direct() {
    let (_, a) = topology().await;

    let out = send(a, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert_eq!(out, "HTTP/1.1 200 OK\r\n\r\n\r\nalpha\r\n");
}

#[tokio::test]
async fn proxy_relays_backend_body() {
    let (proxy, _) = topology().await;

    #[rustfmt::skip]
    let cases: [(&[u8], &str); 3] = [
        (b"GET /a HTTP/1.1\r\nHost: x\r\n\r\n", "alpha"),
        (b"GET /b HTTP/1.1\r\n\r\n",            "beta"),
        (
            b"POST /a HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello",
            "alpha:hello",
        ),
    ];

    for (request, body) in cases {
        let out = send(proxy, request).await;
        assert_eq!(out, format!("HTTP/1.1 200 OK\r\n\r\n\r\n{body}\r\n"));
    }
}

#[tokio::test]
async fn proxy_unknown_path() {
    let (proxy, _) = topology().await;

    let out = send(proxy, b"GET /zzz HTTP/1.1\r\n\r\n").await;
    assert_eq!(out, "HTTP/1.1 404 Not Found\r\n\r\n\r\npath not found: /zzz\r\n");
}

#[tokio::test]
async fn proxy_rejects_malformed_request() {
    let (proxy, _) = topology().await;

    #[rustfmt::skip]
    let cases: [(&[u8], &str); 3] = [
        (b"DELETE /a HTTP/1.1\r\n\r\n",              "501 Not Implemented"),
        (b"GET /a HTTP/1.0\r\n\r\n",                 "400 Bad Request"),
        (b"POST /a HTTP/1.1\r\nHost: x\r\n\r\nbody", "411 Length Required"),
    ];

    for (request, status) in cases {
        let out = send(proxy, request).await;
        assert!(out.starts_with(&format!("HTTP/1.1 {status}\r\n")), "{out}");
    }
}
