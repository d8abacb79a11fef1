use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use wirehttp::{EchoService, Router, Server, ServerConfig};

fn start_echo() -> String {
    let service = EchoService::bind("127.0.0.1:0").unwrap();
    let addr = service.local_addr();
    service.spawn().unwrap();
    format!("ws://{addr}")
}

#[tokio::test]
async fn text_is_echoed_with_prefix() {
    let (mut ws, _) = connect_async(start_echo()).await.unwrap();

    ws.send(Message::text("hello")).await.unwrap();
    let reply = ws.next().await.unwrap().unwrap();
    assert_eq!(reply, Message::text("Echo: hello"));

    ws.send(Message::text("")).await.unwrap();
    let reply = ws.next().await.unwrap().unwrap();
    assert_eq!(reply, Message::text("Echo: "));

    ws.close(None).await.unwrap();
}

#[tokio::test]
async fn binary_is_echoed_with_prefix() {
    let (mut ws, _) = connect_async(start_echo()).await.unwrap();

    ws.send(Message::binary(vec![0xde, 0xad])).await.unwrap();
    let reply = ws.next().await.unwrap().unwrap();
    assert_eq!(reply.into_data().to_vec(), b"Echo: \xde\xad".to_vec());
}

#[tokio::test]
async fn sessions_are_independent() {
    let url = start_echo();
    let (mut first, _) = connect_async(url.as_str()).await.unwrap();
    let (mut second, _) = connect_async(url.as_str()).await.unwrap();

    first.send(Message::text("one")).await.unwrap();
    second.send(Message::text("two")).await.unwrap();

    assert_eq!(second.next().await.unwrap().unwrap(), Message::text("Echo: two"));
    assert_eq!(first.next().await.unwrap().unwrap(), Message::text("Echo: one"));

    // A client that vanishes without a close frame does not stop the service.
    drop(first);
    second.send(Message::text("still here")).await.unwrap();
    assert_eq!(
        second.next().await.unwrap().unwrap(),
        Message::text("Echo: still here")
    );
}

#[tokio::test]
async fn server_starts_echo_on_next_port() {
    let config = ServerConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
        ..ServerConfig::default()
    };
    // The port after an OS-assigned one may already be taken, so try a few.
    let server = (0..20)
        .find_map(|_| Server::bind(&config, Router::new()).ok())
        .expect("no OS-assigned port had a free successor in 20 attempts");
    let http = server.local_addr();
    let echo = server.echo_addr().unwrap();
    assert_eq!(echo.port(), http.port() + 1);

    let shutdown = server.shutdown_handle();
    let handle = std::thread::spawn(move || server.run());

    let (mut ws, _) = connect_async(format!("ws://{echo}")).await.unwrap();
    ws.send(Message::text("ping")).await.unwrap();
    assert_eq!(ws.next().await.unwrap().unwrap(), Message::text("Echo: ping"));

    shutdown.trigger();
    tokio::task::spawn_blocking(move || handle.join().unwrap())
        .await
        .unwrap()
        .unwrap();
}
