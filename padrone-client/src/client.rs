//! Typed master server operations.

use crate::config::ClientConfig;
use crate::engine::{ApiResponse, RequestEngine};
use crate::transport::{HyperTransport, Transport};
use hyper::StatusCode;
use padrone_core::protocol::{
    HostRegistrationRequest, JoinRequest, JoinResponse, PingRequest, PlayerInfo,
    PlayerSessionInfo, RemoteHost, ReportLeaveRequest, UnregisterHostRequest,
};
use padrone_core::wire::encode_endpoint;
use padrone_core::{AuthToken, ClientResult, ClientSessionId, HttpMethod};
use std::net::SocketAddr;
use urlencoding::encode;

/// Client for the Padrone master server.
///
/// Calls are futures that must be driven from a single thread (a
/// current-thread runtime or a `LocalSet`); the client is not `Sync`.
pub struct PadroneClient<T: Transport = HyperTransport> {
    engine: RequestEngine<T>,
    app_version: String,
}

impl PadroneClient<HyperTransport> {
    /// Create a client that talks HTTP/1.1 to the configured server.
    pub fn new(
        config: ClientConfig,
        token_provider: impl Fn() -> AuthToken + 'static,
    ) -> ClientResult<Self> {
        Self::with_transport(config, token_provider, |_| HyperTransport::new())
    }
}

impl<T: Transport> PadroneClient<T> {
    /// Create a client whose pool is filled from `factory`.
    pub fn with_transport(
        config: ClientConfig,
        token_provider: impl Fn() -> AuthToken + 'static,
        factory: impl FnMut(HttpMethod) -> T,
    ) -> ClientResult<Self> {
        let engine = RequestEngine::new(&config, Box::new(token_provider), factory)?;
        Ok(Self {
            engine,
            app_version: config.app_version,
        })
    }

    pub fn engine(&self) -> &RequestEngine<T> {
        &self.engine
    }

    pub async fn register_host(&self, registration: &HostRegistrationRequest) -> ClientResult<StatusCode> {
        self.engine.post_status("register-host", Some(registration)).await
    }

    pub async fn unregister_host(&self, external_endpoint: SocketAddr) -> ClientResult<StatusCode> {
        let request = UnregisterHostRequest { external_endpoint };
        self.engine.post_status("unregister-host", Some(&request)).await
    }

    /// List hosts running this client's game version.
    pub async fn list_hosts(&self, hide_full: bool, limit: u32) -> ClientResult<ApiResponse<Vec<RemoteHost>>> {
        let endpoint = format!(
            "list-hosts?version={}&hideFull={}&limit={}",
            encode(&self.app_version),
            hide_full,
            limit
        );
        self.engine.get(&endpoint).await
    }

    /// Look up the player behind a session connecting to a host.
    pub async fn player_info(
        &self,
        host_endpoint: SocketAddr,
        session_id: &ClientSessionId,
    ) -> ClientResult<ApiResponse<PlayerSessionInfo>> {
        let endpoint = format!(
            "player-info?hostEndpoint={}&sessionId={}",
            encode(&encode_endpoint(&host_endpoint)),
            encode(session_id.as_str())
        );
        self.engine.get(&endpoint).await
    }

    /// Host heartbeat.
    pub async fn ping(
        &self,
        host_endpoint: SocketAddr,
        connected_clients: &[ClientSessionId],
    ) -> ClientResult<StatusCode> {
        let request = PingRequest {
            host_endpoint,
            connected_clients: connected_clients.to_vec(),
        };
        self.engine.post_status("ping", Some(&request)).await
    }

    pub async fn health_check(&self) -> ClientResult<StatusCode> {
        self.engine.get_status("health-check").await
    }

    /// The authenticated player.
    pub async fn me(&self) -> ClientResult<ApiResponse<PlayerInfo>> {
        self.engine.get("me").await
    }

    pub async fn join(
        &self,
        host_endpoint: SocketAddr,
        password: Option<&str>,
    ) -> ClientResult<ApiResponse<JoinResponse>> {
        let request = JoinRequest {
            host_endpoint,
            password: password.map(str::to_string),
        };
        self.engine.post("join", Some(&request)).await
    }

    pub async fn leave(&self) -> ClientResult<StatusCode> {
        self.engine.post_status::<()>("leave", None).await
    }

    /// Report, as a host, that a session left.
    pub async fn report_leave(
        &self,
        host_endpoint: SocketAddr,
        session_id: &ClientSessionId,
    ) -> ClientResult<StatusCode> {
        let request = ReportLeaveRequest {
            host_endpoint,
            session_id: session_id.clone(),
        };
        self.engine.post_status("report-leave", Some(&request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{StubServer, StubTransport};
    use padrone_core::{ClientError, ClientSecret, PeerInfo};
    use serde_json::{json, Value};
    use std::rc::Rc;

    fn client(server: &Rc<StubServer>) -> PadroneClient<StubTransport> {
        PadroneClient::with_transport(
            ClientConfig::new("http://master.test", "1.0 beta"),
            || AuthToken::oculus("1234", "nonce"),
            server.factory(),
        )
        .unwrap()
    }

    fn host_json(name: &str, port: u16) -> Value {
        json!({
            "name": name,
            "hostedBy": "someone",
            "peerInfo": {
                "external": format!("203.0.113.7:{}", port),
                "internal": format!("192.168.1.2:{}", port)
            },
            "isPasswordProtected": false,
            "onlineSince": "2024-05-01T08:30:00Z",
            "distanceInKm": 120.0,
            "country": "DE",
            "version": "1.0 beta",
            "playerCount": 2,
            "maxPlayers": 4
        })
    }

    fn body_json(request: &crate::transport::testing::RecordedRequest) -> Value {
        serde_json::from_slice(&request.body).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_hosts_decodes_in_order() {
        let server = StubServer::new();
        let hosts = json!([host_json("first", 7000), host_json("second", 7001)]);
        server.respond(200, &hosts.to_string());
        let client = client(&server);

        let response = client.list_hosts(true, 10).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        let hosts = response.body.unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].name, "first");
        assert_eq!(hosts[1].name, "second");
        assert_eq!(hosts[1].peer_info.external, "203.0.113.7:7001".parse().unwrap());

        let requests = server.requests();
        let request = &requests[0];
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(
            request.url,
            "http://master.test/app/list-hosts?version=1.0%20beta&hideFull=true&limit=10"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_hosts_server_error_is_not_decoded() {
        let server = StubServer::new();
        server.respond(500, "internal error");
        let client = client(&server);

        let response = client.list_hosts(true, 10).await.unwrap();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_player_info_query() {
        let server = StubServer::new();
        server.respond(
            200,
            &json!({
                "sessionId": "s-1",
                "secret": "x",
                "playerInfo": {"name": "p", "avatarUrl": "http://a/p.png", "isAdmin": false, "isDeveloper": true}
            })
            .to_string(),
        );
        let client = client(&server);

        let response = client
            .player_info(
                SocketAddr::new("::1".parse().unwrap(), 7777),
                &ClientSessionId::new("s 1"),
            )
            .await
            .unwrap();
        let info = response.body.unwrap();
        assert_eq!(info.session_id, ClientSessionId::new("s-1"));
        assert_eq!(info.secret, ClientSecret::new("x"));
        assert!(info.player_info.is_developer);

        assert_eq!(
            server.requests()[0].url,
            "http://master.test/app/player-info?hostEndpoint=%3A%3A1%3A7777&sessionId=s%201"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_sends_password_and_decodes_response() {
        let server = StubServer::new();
        server.respond(200, r#"{"sessionId":"abc","secret":"def"}"#);
        server.respond(403, "");
        let client = client(&server);
        let host: SocketAddr = "203.0.113.7:7777".parse().unwrap();

        let joined = client.join(host, Some("pw")).await.unwrap();
        let joined = joined.body.unwrap();
        assert_eq!(joined.session_id.as_str(), "abc");
        assert_eq!(joined.secret.as_str(), "def");

        let refused = client.join(host, None).await.unwrap();
        assert_eq!(refused.status, StatusCode::FORBIDDEN);
        assert!(refused.body.is_none());

        let requests = server.requests();
        assert_eq!(requests[0].url, "http://master.test/app/join");
        assert_eq!(
            body_json(&requests[0]),
            json!({"hostEndpoint": "203.0.113.7:7777", "password": "pw"})
        );
        assert_eq!(
            body_json(&requests[1]),
            json!({"hostEndpoint": "203.0.113.7:7777", "password": null})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_endpoint_in_response_is_decode_error() {
        let server = StubServer::new();
        let mut host = host_json("broken", 7000);
        host["peerInfo"]["external"] = json!("203.0.113.7");
        server.respond(200, &json!([host]).to_string());
        let client = client(&server);

        let err = client.list_hosts(false, 5).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
        assert!(err.to_string().contains("has no port"));
        assert_eq!(client.engine().pool().available(HttpMethod::Get), 16);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_malformed_response_is_decode_error() {
        let server = StubServer::new();
        server.respond(200, r#"{"sessionId":5,"secret":"def"}"#);
        let client = client(&server);

        let err = client
            .join("203.0.113.7:7777".parse().unwrap(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_lifecycle_bodies() {
        let server = StubServer::new();
        for _ in 0..4 {
            server.respond(200, "");
        }
        let client = client(&server);
        let peer = PeerInfo {
            external: "203.0.113.7:7777".parse().unwrap(),
            internal: "10.0.0.5:7777".parse().unwrap(),
        };

        let registration = HostRegistrationRequest {
            host_name: "Lobby".to_string(),
            peer_info: peer,
            password: Some("pw".to_string()),
            is_private: true,
            version: "1.0 beta".to_string(),
            max_players: 6,
        };
        assert_eq!(client.register_host(&registration).await.unwrap(), StatusCode::OK);
        assert_eq!(
            client
                .ping(peer.external, &[ClientSessionId::new("a"), ClientSessionId::new("b")])
                .await
                .unwrap(),
            StatusCode::OK
        );
        assert_eq!(
            client
                .report_leave(peer.external, &ClientSessionId::new("a"))
                .await
                .unwrap(),
            StatusCode::OK
        );
        assert_eq!(client.unregister_host(peer.external).await.unwrap(), StatusCode::OK);

        let requests = server.requests();
        let paths: Vec<&str> = requests
            .iter()
            .map(|r| r.url.trim_start_matches("http://master.test/app/"))
            .collect();
        assert_eq!(paths, vec!["register-host", "ping", "report-leave", "unregister-host"]);
        assert!(requests.iter().all(|r| r.method == HttpMethod::Post));

        assert_eq!(body_json(&requests[0])["peerInfo"]["internal"], "10.0.0.5:7777");
        assert_eq!(
            body_json(&requests[1]),
            json!({"hostEndpoint": "203.0.113.7:7777", "connectedClients": ["a", "b"]})
        );
        assert_eq!(
            body_json(&requests[2]),
            json!({"hostEndpoint": "203.0.113.7:7777", "sessionId": "a"})
        );
        assert_eq!(
            body_json(&requests[3]),
            json!({"externalEndpoint": "203.0.113.7:7777"})
        );
    }

    #[test]
    fn test_https_url_is_rejected_at_construction() {
        let result = PadroneClient::new(ClientConfig::new("https://127.0.0.1:9", "1.0"), || {
            AuthToken::admin("a", "b")
        });
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_content_reaches_caller_as_status() {
        let server = StubServer::new();
        server.respond(204, "");
        server.respond(204, "");
        let client = client(&server);

        let me = client.me().await.unwrap();
        assert_eq!(me.status, StatusCode::NO_CONTENT);
        assert!(me.body.is_none());

        let hosts = client.list_hosts(false, 5).await.unwrap();
        assert_eq!(hosts.status, StatusCode::NO_CONTENT);
        assert!(hosts.body.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_me_health_check_and_leave() {
        let server = StubServer::new();
        server.respond(
            200,
            r#"{"name":"ada","avatarUrl":"","isAdmin":true,"isDeveloper":false}"#,
        );
        server.respond(200, "");
        server.respond(200, "");
        let client = client(&server);

        let me = client.me().await.unwrap().body.unwrap();
        assert_eq!(me.name, "ada");
        assert!(me.is_admin);
        assert_eq!(client.health_check().await.unwrap(), StatusCode::OK);
        assert_eq!(client.leave().await.unwrap(), StatusCode::OK);

        let requests = server.requests();
        assert_eq!(requests[0].url, "http://master.test/app/me");
        assert_eq!(requests[1].url, "http://master.test/app/health-check");
        assert_eq!(requests[2].url, "http://master.test/app/leave");
        assert_eq!(requests[2].method, HttpMethod::Post);
        assert!(requests[2].body.is_empty());
        assert_eq!(
            requests[2].header("X-Padrone-Auth"),
            Some(AuthToken::oculus("1234", "nonce").as_base64())
        );
    }
}
