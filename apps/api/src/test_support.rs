//! Helpers shared by tests across modules.

pub mod test_server {
    use std::net::SocketAddr;

    use axum::Router;

    /// Serves `router` on an ephemeral localhost port for the lifetime of the test runtime.
    pub async fn spawn(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }
}
