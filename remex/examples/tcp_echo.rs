//! A TCP echo server. Connect with `nc 127.0.0.1 2333` and every line
//! you type comes back.

use remex::net::TcpListener;

#[remex::main]
async fn main() {
    let listener = TcpListener::bind("127.0.0.1:2333").expect("bind failed");
    println!("listening on {}", listener.local_addr().expect("local addr"));

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                eprintln!("accept failed: {err}");
                break;
            }
        };

        println!("connected: {peer}");

        remex::spawn(async move {
            let mut buf = [0u8; 1024];

            loop {
                let n = match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };

                if stream.write_all(&buf[..n]).await.is_err() {
                    break;
                }
            }

            println!("disconnected: {peer}");
        });
    }
}
