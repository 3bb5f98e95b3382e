//! In-memory cluster used by the integration tests.
//!
//! Members speak the binary protocol over `tokio::io::duplex` pipes handed
//! out by [`MockConnector`]. Authentication, ping, the cluster view listener
//! and map entry listeners are answered like a real member would; any other
//! request type gets a ping response unless a reply was scripted for it.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use hazelcast_client::{ClientConfig, ClientConfigBuilder, Connector, HazelcastClient};
use hazelcast_client::connection::BoxedStream;
use hazelcast_core::protocol::codecs::client_authentication::{
    self, AuthenticationResponse, AuthenticationStatus,
};
use hazelcast_core::protocol::codecs::map_entry_listener::{self, EntryEventBody};
use hazelcast_core::protocol::codecs::{
    client_add_cluster_view_listener, client_ping, error, Address, MemberInfo, MemberVersion,
};
use hazelcast_core::protocol::{
    builtin, ClientMessageCodec, CLIENT_ADD_CLUSTER_VIEW_LISTENER, CLIENT_AUTHENTICATION,
    CLIENT_BINARY_PROTOCOL, PARTITION_ID_ANY, REQUEST_HEADER_SIZE,
};
use hazelcast_core::{ClientMessage, Frame, HazelcastError, Result, ServerError};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const CLUSTER_NAME: &str = "dev";
pub const PARTITION_COUNT: i32 = 271;
pub const BASE_PORT: u16 = 5701;

/// Message type of the generic operation the tests invoke.
pub const TEST_OPERATION: i32 = 0x0D_0100;

/// Builds a generic request members answer with an empty response.
pub fn operation(retryable: bool) -> ClientMessage {
    let mut message = ClientMessage::new_request(
        TEST_OPERATION,
        PARTITION_ID_ANY,
        builtin::initial_content(REQUEST_HEADER_SIZE),
    );
    message.set_retryable(retryable);
    message
}

/// Builds a retryable generic request carrying `payload_size` extra bytes.
pub fn large_operation(payload_size: usize) -> ClientMessage {
    let mut message = operation(true);
    message.add_frame(Frame::with_content(vec![0u8; payload_size]));
    message
}

/// Scripted answer to the next request of one message type.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond with this message.
    Message(ClientMessage),
    /// Respond with an error response.
    Error(ServerError),
    /// Never respond.
    Silent,
    /// Close the connection the request arrived on.
    Disconnect,
}

/// A request as seen by a member.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub member: Uuid,
    pub session: u64,
    pub message_type: i32,
    pub correlation_id: i64,
    pub partition_id: i32,
}

#[derive(Debug, Clone)]
struct MockMember {
    uuid: Uuid,
    socket: SocketAddr,
}

impl MockMember {
    fn info(&self) -> MemberInfo {
        MemberInfo {
            uuid: self.uuid,
            address: Address::new(self.socket.ip().to_string(), self.socket.port()),
            lite_member: false,
            attributes: HashMap::new(),
            version: MemberVersion::default(),
        }
    }
}

struct Session {
    id: u64,
    member: Uuid,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    closed: CancellationToken,
    stalled: CancellationToken,
    cluster_view: Mutex<Option<i64>>,
}

impl Session {
    fn send(&self, message: ClientMessage) {
        let _ = self.outbound.send(message);
    }

    fn reply(&self, mut message: ClientMessage, correlation_id: i64) {
        message.set_correlation_id(correlation_id);
        self.send(message);
    }
}

#[derive(Debug, Clone)]
struct MapRegistration {
    session: u64,
    map_name: String,
    correlation_id: i64,
}

struct State {
    cluster_id: Mutex<Uuid>,
    members: Mutex<Vec<MockMember>>,
    member_list_version: AtomicI32,
    partition_version: AtomicI32,
    credentials: Mutex<Option<(String, String)>>,
    replies: Mutex<HashMap<i32, VecDeque<Reply>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    sessions: Mutex<Vec<Arc<Session>>>,
    map_registrations: Mutex<HashMap<Uuid, MapRegistration>>,
    refusing: AtomicBool,
    next_session: AtomicU64,
}

/// A cluster of in-memory members.
#[derive(Clone)]
pub struct MockCluster {
    state: Arc<State>,
}

impl MockCluster {
    /// Starts a cluster with `member_count` members.
    pub fn start(member_count: usize) -> Self {
        let members = (0..member_count)
            .map(|i| MockMember {
                uuid: Uuid::new_v4(),
                socket: SocketAddr::from(([127, 0, 0, 1], BASE_PORT + i as u16)),
            })
            .collect();

        Self {
            state: Arc::new(State {
                cluster_id: Mutex::new(Uuid::new_v4()),
                members: Mutex::new(members),
                member_list_version: AtomicI32::new(1),
                partition_version: AtomicI32::new(1),
                credentials: Mutex::new(None),
                replies: Mutex::new(HashMap::new()),
                requests: Mutex::new(Vec::new()),
                sessions: Mutex::new(Vec::new()),
                map_registrations: Mutex::new(HashMap::new()),
                refusing: AtomicBool::new(false),
                next_session: AtomicU64::new(1),
            }),
        }
    }

    /// Returns a connector that opens pipes to this cluster's members.
    pub fn connector(&self) -> Arc<dyn Connector> {
        Arc::new(MockConnector {
            state: Arc::clone(&self.state),
        })
    }

    /// Returns a config builder pointing at the first member, with short
    /// timeouts.
    pub fn config(&self) -> ClientConfigBuilder {
        ClientConfig::builder()
            .cluster_name(CLUSTER_NAME)
            .add_address(self.addresses()[0])
            .network(|n| {
                n.connection_timeout(Duration::from_secs(2))
                    .heartbeat_interval(Duration::from_secs(1))
                    .heartbeat_timeout(Duration::from_secs(30))
            })
            .retry(|r| {
                r.initial_backoff(Duration::from_millis(20))
                    .max_backoff(Duration::from_millis(100))
                    .cluster_connect_timeout(Duration::from_secs(5))
            })
            .invocation(|i| {
                i.invocation_timeout(Duration::from_secs(5))
                    .retry_pause(Duration::from_millis(10))
                    .max_retry_pause(Duration::from_millis(50))
            })
    }

    /// Connects a client built from `config`.
    pub async fn client(&self, config: ClientConfig) -> HazelcastClient {
        HazelcastClient::with_connector(config, self.connector())
            .await
            .expect("failed to start client")
    }

    /// Requires these credentials from now on.
    pub fn require_credentials(&self, username: &str, password: &str) {
        *lock(&self.state.credentials) = Some((username.to_string(), password.to_string()));
    }

    pub fn addresses(&self) -> Vec<SocketAddr> {
        lock(&self.state.members).iter().map(|m| m.socket).collect()
    }

    pub fn member_uuids(&self) -> Vec<Uuid> {
        lock(&self.state.members).iter().map(|m| m.uuid).collect()
    }

    pub fn cluster_id(&self) -> Uuid {
        *lock(&self.state.cluster_id)
    }

    /// Owner of `partition_id` in the partition table the members push.
    pub fn partition_owner(&self, partition_id: i32) -> Uuid {
        let members = lock(&self.state.members);
        members[partition_id as usize % members.len()].uuid
    }

    /// Queues `reply` for the next request of `message_type`.
    pub fn script(&self, message_type: i32, reply: Reply) {
        lock(&self.state.replies)
            .entry(message_type)
            .or_default()
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    pub fn requests_of(&self, message_type: i32) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.message_type == message_type)
            .collect()
    }

    pub fn request_count(&self, message_type: i32) -> usize {
        self.requests_of(message_type).len()
    }

    /// Number of open client connections across all members.
    pub fn session_count(&self) -> usize {
        lock(&self.state.sessions).len()
    }

    /// Members with at least one open client connection.
    pub fn connected_members(&self) -> Vec<Uuid> {
        let mut members: Vec<Uuid> = lock(&self.state.sessions).iter().map(|s| s.member).collect();
        members.sort();
        members.dedup();
        members
    }

    /// Number of map listener registrations currently held by members.
    pub fn map_registration_count(&self) -> usize {
        lock(&self.state.map_registrations).len()
    }

    /// Makes connection attempts fail (or succeed again).
    pub fn refuse_connections(&self, refuse: bool) {
        self.state.refusing.store(refuse, Ordering::SeqCst);
    }

    /// Makes members stop reading from their open connections while keeping
    /// them open. Writes from the client back up once the pipe is full.
    pub fn stop_reading(&self) {
        let sessions: Vec<Arc<Session>> = lock(&self.state.sessions).clone();
        for session in sessions {
            session.stalled.cancel();
        }
    }

    /// Closes every client connection. Members forget the listener
    /// registrations made on them.
    pub fn drop_connections(&self) {
        let sessions: Vec<Arc<Session>> = lock(&self.state.sessions).clone();
        for session in sessions {
            session.closed.cancel();
        }
    }

    /// Closes the connections to one member.
    pub fn drop_member_connections(&self, member: Uuid) {
        let sessions: Vec<Arc<Session>> = lock(&self.state.sessions)
            .iter()
            .filter(|s| s.member == member)
            .cloned()
            .collect();
        for session in sessions {
            session.closed.cancel();
        }
    }

    /// Replaces the cluster with a fresh one at the same addresses: new
    /// cluster id, new member uuids, versions starting over. Open
    /// connections are closed.
    pub fn restart_as_new_cluster(&self) {
        *lock(&self.state.cluster_id) = Uuid::new_v4();
        for member in lock(&self.state.members).iter_mut() {
            member.uuid = Uuid::new_v4();
        }
        self.state.member_list_version.store(1, Ordering::SeqCst);
        self.state.partition_version.store(1, Ordering::SeqCst);
        self.drop_connections();
    }

    /// Adds a member and pushes the new member list.
    pub fn add_member(&self) -> Uuid {
        let uuid = Uuid::new_v4();
        {
            let mut members = lock(&self.state.members);
            let port = BASE_PORT + members.len() as u16;
            members.push(MockMember {
                uuid,
                socket: SocketAddr::from(([127, 0, 0, 1], port)),
            });
        }
        self.state.member_list_version.fetch_add(1, Ordering::SeqCst);
        self.push_cluster_view();
        uuid
    }

    /// Removes a member, closes its connections and pushes the new member
    /// list.
    pub fn remove_member(&self, uuid: Uuid) {
        lock(&self.state.members).retain(|m| m.uuid != uuid);
        self.drop_member_connections(uuid);
        self.state.member_list_version.fetch_add(1, Ordering::SeqCst);
        self.state.partition_version.fetch_add(1, Ordering::SeqCst);
        self.push_cluster_view();
    }

    /// Sends the current member list and partition table to every cluster
    /// view registration.
    pub fn push_cluster_view(&self) {
        let sessions: Vec<Arc<Session>> = lock(&self.state.sessions).clone();
        for session in sessions {
            if let Some(correlation_id) = *lock(&session.cluster_view) {
                self.state.send_cluster_view(&session, correlation_id);
            }
        }
    }

    /// Pushes an entry event to every registration for `map_name`. Returns
    /// how many registrations received it.
    pub fn push_entry_event(&self, map_name: &str, body: &EntryEventBody) -> usize {
        let registrations: Vec<MapRegistration> = lock(&self.state.map_registrations)
            .values()
            .filter(|r| r.map_name == map_name)
            .cloned()
            .collect();
        let sessions: Vec<Arc<Session>> = lock(&self.state.sessions).clone();

        let mut sent = 0;
        for registration in registrations {
            if let Some(session) = sessions.iter().find(|s| s.id == registration.session) {
                session.send(map_entry_listener::encode_entry_event(
                    registration.correlation_id,
                    body,
                ));
                sent += 1;
            }
        }
        sent
    }
}

impl State {
    fn next_reply(&self, message_type: i32) -> Option<Reply> {
        lock(&self.replies)
            .get_mut(&message_type)
            .and_then(VecDeque::pop_front)
    }

    fn member(&self, uuid: Uuid) -> Option<MockMember> {
        lock(&self.members).iter().find(|m| m.uuid == uuid).cloned()
    }

    fn send_cluster_view(&self, session: &Session, correlation_id: i64) {
        let members = lock(&self.members).clone();
        let infos: Vec<MemberInfo> = members.iter().map(MockMember::info).collect();
        let mut owners: Vec<(Uuid, Vec<i32>)> = members.iter().map(|m| (m.uuid, Vec::new())).collect();
        if !owners.is_empty() {
            let count = owners.len();
            for partition_id in 0..PARTITION_COUNT {
                owners[partition_id as usize % count].1.push(partition_id);
            }
        }

        session.reply(
            client_add_cluster_view_listener::encode_members_view_event(
                self.member_list_version.load(Ordering::SeqCst),
                &infos,
            ),
            correlation_id,
        );
        session.reply(
            client_add_cluster_view_listener::encode_partitions_view_event(
                self.partition_version.load(Ordering::SeqCst),
                &owners,
            ),
            correlation_id,
        );
    }

    fn handle(&self, session: &Session, message: ClientMessage) {
        let message_type = message.message_type().unwrap_or(-1);
        let correlation_id = message.correlation_id().unwrap_or(0);
        lock(&self.requests).push(RecordedRequest {
            member: session.member,
            session: session.id,
            message_type,
            correlation_id,
            partition_id: message.partition_id().unwrap_or(-1),
        });

        if message_type != CLIENT_AUTHENTICATION {
            if let Some(reply) = self.next_reply(message_type) {
                match reply {
                    Reply::Message(response) => session.reply(response, correlation_id),
                    Reply::Error(server_error) => {
                        session.reply(error::encode(&server_error), correlation_id)
                    }
                    Reply::Silent => {}
                    Reply::Disconnect => session.closed.cancel(),
                }
                return;
            }
        }

        match message_type {
            CLIENT_AUTHENTICATION => self.authenticate(session, &message, correlation_id),
            CLIENT_ADD_CLUSTER_VIEW_LISTENER => {
                *lock(&session.cluster_view) = Some(correlation_id);
                session.reply(client_add_cluster_view_listener::encode_response(), correlation_id);
                self.send_cluster_view(session, correlation_id);
            }
            map_entry_listener::MAP_ADD_ENTRY_LISTENER => {
                let Ok(request) = map_entry_listener::decode_add_request(&message) else {
                    session.closed.cancel();
                    return;
                };
                let registration_id = Uuid::new_v4();
                lock(&self.map_registrations).insert(
                    registration_id,
                    MapRegistration {
                        session: session.id,
                        map_name: request.name,
                        correlation_id,
                    },
                );
                session.reply(
                    map_entry_listener::encode_add_response(registration_id),
                    correlation_id,
                );
            }
            map_entry_listener::MAP_REMOVE_ENTRY_LISTENER => {
                let Ok((_, registration_id)) = map_entry_listener::decode_remove_request(&message)
                else {
                    session.closed.cancel();
                    return;
                };
                let removed = lock(&self.map_registrations).remove(&registration_id).is_some();
                session.reply(map_entry_listener::encode_remove_response(removed), correlation_id);
            }
            _ => session.reply(client_ping::encode_response(), correlation_id),
        }
    }

    fn authenticate(&self, session: &Session, message: &ClientMessage, correlation_id: i64) {
        let Ok(request) = client_authentication::decode_request(message) else {
            session.closed.cancel();
            return;
        };

        let credentials_ok = match &*lock(&self.credentials) {
            Some((username, password)) => {
                request.username.as_deref() == Some(username.as_str())
                    && request.password.as_deref() == Some(password.as_str())
            }
            None => true,
        };
        let status = if request.cluster_name != CLUSTER_NAME || !credentials_ok {
            AuthenticationStatus::CredentialsFailed
        } else {
            AuthenticationStatus::Authenticated
        };

        let member = self.member(session.member);
        let response = AuthenticationResponse {
            status,
            address: member
                .as_ref()
                .map(|m| Address::new(m.socket.ip().to_string(), m.socket.port())),
            member_uuid: Some(session.member),
            serialization_version: request.serialization_version,
            server_version: "5.3.0".to_string(),
            partition_count: PARTITION_COUNT,
            cluster_id: Some(*lock(&self.cluster_id)),
            failover_supported: false,
        };
        session.reply(client_authentication::encode_response(&response), correlation_id);
    }
}

/// Opens in-memory pipes to mock members.
pub struct MockConnector {
    state: Arc<State>,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, address: SocketAddr) -> Result<BoxedStream> {
        if self.state.refusing.load(Ordering::SeqCst) {
            return Err(HazelcastError::Connection(format!("{} refused", address)));
        }
        let member = lock(&self.state.members)
            .iter()
            .find(|m| m.socket == address)
            .map(|m| m.uuid)
            .ok_or_else(|| HazelcastError::Connection(format!("no member at {}", address)))?;

        let (client, server) = tokio::io::duplex(256 * 1024);
        tokio::spawn(serve(Arc::clone(&self.state), member, server));
        Ok(Box::new(client))
    }
}

async fn serve(state: Arc<State>, member: Uuid, mut stream: tokio::io::DuplexStream) {
    let mut preamble = [0u8; 3];
    if stream.read_exact(&mut preamble).await.is_err() || &preamble != CLIENT_BINARY_PROTOCOL {
        return;
    }

    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ClientMessage>();
    let session = Arc::new(Session {
        id: state.next_session.fetch_add(1, Ordering::SeqCst),
        member,
        outbound,
        closed: CancellationToken::new(),
        stalled: CancellationToken::new(),
        cluster_view: Mutex::new(None),
    });
    lock(&state.sessions).push(Arc::clone(&session));

    let (mut sink, mut source) = Framed::new(stream, ClientMessageCodec::new()).split();
    let closed = session.closed.clone();
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                message = outbound_rx.recv() => match message {
                    Some(message) => {
                        if sink.send(message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = closed.cancelled() => break,
            }
        }
    });

    loop {
        tokio::select! {
            biased;
            _ = session.closed.cancelled() => break,
            _ = session.stalled.cancelled() => {
                session.closed.cancelled().await;
                break;
            }
            next = source.next() => match next {
                Some(Ok(message)) => state.handle(&session, message),
                _ => break,
            },
        }
    }

    session.closed.cancel();
    let _ = writer.await;
    drop(source);
    lock(&state.sessions).retain(|s| s.id != session.id);
    lock(&state.map_registrations).retain(|_, r| r.session != session.id);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Polls `condition` until it holds or `timeout` passes.
pub async fn eventually<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Awaits `future`, failing the test if it takes longer than `timeout`.
pub async fn within<F, T>(timeout: Duration, future: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, future)
        .await
        .expect("operation did not finish in time")
}

/// Installs a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
