//! In-process broadcast hub for a single binary-choice poll.
//!
//! The hub owns the vote store and the registry of connected observers behind
//! a single event-processing task: every connection event (connect, vote,
//! results request, disconnect, tally query) is a command on one queue,
//! handled strictly in arrival order. Nothing else ever touches the store or
//! the registry, so no locking is needed.
//!
//! Fan-out is best-effort: each observer has a bounded event queue and
//! delivery uses `try_send`, so one slow or dead connection drops its own
//! frames instead of delaying anyone else.
use slab::Slab;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::{mpsc, oneshot};

pub mod tally;
pub mod votes;

pub use tally::{Ballot, Tally};
pub use votes::{VoteStore, Voter};

pub type Result<T> = std::result::Result<T, HubError>;

#[derive(thiserror::Error, Debug)]
pub enum HubError {
    #[error("poll hub is not running")]
    Closed,
}

/// Notification sent to vote attempts from connections with no identity.
pub const SIGN_IN_REQUIRED: &str = "you must be signed in to vote";

const COMMAND_QUEUE_CAPACITY: usize = 256;
const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 32;

/// Event delivered to a connected observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    /// Current tally snapshot: sent to a connection when it opens or asks,
    /// and broadcast to everyone after every accepted vote.
    Results(Tally),
    /// Per-connection error notification, delivered to the originator only.
    Error(String),
}

enum Command {
    Connect {
        voter: Option<Voter>,
        ready: oneshot::Sender<(usize, mpsc::Receiver<HubEvent>)>,
    },
    Vote {
        member_id: usize,
        raw_value: String,
    },
    Results {
        member_id: usize,
    },
    Query {
        reply: oneshot::Sender<Tally>,
    },
    Disconnect {
        member_id: usize,
    },
}

/// Cloneable handle to the hub task.
///
/// ```
/// use livepoll_hub::{HubEvent, PollHub, Voter};
///
/// let rt = tokio::runtime::Runtime::new().expect("rt");
/// rt.block_on(async {
///     let hub = PollHub::spawn();
///     let mut conn = hub
///         .connect(Some(Voter::new("u1", "Ada")))
///         .await
///         .expect("connect");
///     // The first event on any new connection is the current tally.
///     assert!(matches!(conn.recv().await, Some(HubEvent::Results(_))));
///     conn.submit_vote("yes").await;
///     let tally = hub.tally().await.expect("tally");
///     assert_eq!((tally.yes, tally.no), (1, 0));
/// });
/// ```
#[derive(Debug, Clone)]
pub struct PollHub {
    commands: mpsc::Sender<Command>,
}

impl PollHub {
    /// Spawn the hub task with the default per-connection event capacity.
    pub fn spawn() -> Self {
        Self::spawn_with_event_capacity(DEFAULT_EVENT_QUEUE_CAPACITY)
    }

    /// Spawn with an explicit per-connection event queue capacity. When a
    /// connection's queue is full, further deliveries to it are dropped.
    pub fn spawn_with_event_capacity(event_capacity: usize) -> Self {
        let (commands, receiver) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        tokio::spawn(run_hub(receiver, event_capacity.max(1)));
        Self { commands }
    }

    /// Register a connection, identified or anonymous. The connection's
    /// identity is fixed for its whole lifetime; signing in requires a
    /// reconnect. The current tally is queued to the new connection before
    /// this returns.
    pub async fn connect(&self, voter: Option<Voter>) -> Result<Connection> {
        let (ready, handshake) = oneshot::channel();
        self.commands
            .send(Command::Connect { voter, ready })
            .await
            .map_err(|_| HubError::Closed)?;
        let (member_id, events) = handshake.await.map_err(|_| HubError::Closed)?;
        Ok(Connection {
            member_id,
            events,
            commands: self.commands.clone(),
        })
    }

    /// Current tally, computed by the hub task. Because commands are handled
    /// in arrival order, the reply reflects every vote submitted before the
    /// call.
    pub async fn tally(&self) -> Result<Tally> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Query { reply })
            .await
            .map_err(|_| HubError::Closed)?;
        response.await.map_err(|_| HubError::Closed)
    }
}

/// A registered observer. Dropping it unregisters the connection; votes it
/// already recorded keep counting.
#[derive(Debug)]
pub struct Connection {
    member_id: usize,
    events: mpsc::Receiver<HubEvent>,
    commands: mpsc::Sender<Command>,
}

impl Connection {
    /// Next event for this connection, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<HubEvent> {
        self.events.recv().await
    }

    pub fn try_recv(&mut self) -> std::result::Result<HubEvent, TryRecvError> {
        self.events.try_recv()
    }

    /// Submit a raw vote token.
    ///
    /// Tokens other than `"yes"`/`"no"` are dropped without feedback. An
    /// anonymous connection gets [`HubEvent::Error`] back and the store is
    /// left untouched. A valid vote from an identified connection overwrites
    /// that voter's prior ballot and broadcasts the new tally to everyone.
    pub async fn submit_vote(&self, raw_value: &str) {
        let _ = self
            .commands
            .send(Command::Vote {
                member_id: self.member_id,
                raw_value: raw_value.to_string(),
            })
            .await;
    }

    /// Ask for the current tally; the reply arrives as an event on this
    /// connection only.
    pub async fn request_results(&self) {
        let _ = self
            .commands
            .send(Command::Results {
                member_id: self.member_id,
            })
            .await;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Best effort: if the command queue is full the hub reaps this
        // member anyway when a broadcast hits its closed event queue.
        let _ = self.commands.try_send(Command::Disconnect {
            member_id: self.member_id,
        });
    }
}

struct Member {
    voter: Option<Voter>,
    sender: mpsc::Sender<HubEvent>,
}

async fn run_hub(mut commands: mpsc::Receiver<Command>, event_capacity: usize) {
    let mut members: Slab<Member> = Slab::new();
    let mut store = VoteStore::new();

    while let Some(command) = commands.recv().await {
        match command {
            Command::Connect { voter, ready } => {
                let (sender, events) = mpsc::channel(event_capacity);
                let member_id = members.insert(Member { voter, sender });
                let (yes, no) = store.counts();
                send_to(&mut members, member_id, HubEvent::Results(Tally::compute(yes, no)));
                if ready.send((member_id, events)).is_err() {
                    // Caller vanished mid-handshake; nothing will ever read
                    // the queue we just filled.
                    if members.contains(member_id) {
                        members.remove(member_id);
                    }
                }
                metrics::gauge!("livepoll_connections").set(members.len() as f64);
            }
            Command::Vote {
                member_id,
                raw_value,
            } => {
                let Some(ballot) = Ballot::parse(&raw_value) else {
                    // Unknown tokens are a deliberate silent no-op.
                    continue;
                };
                let Some(member) = members.get(member_id) else {
                    continue;
                };
                match member.voter.clone() {
                    None => {
                        metrics::counter!("livepoll_votes_rejected_total").increment(1);
                        send_to(
                            &mut members,
                            member_id,
                            HubEvent::Error(SIGN_IN_REQUIRED.to_string()),
                        );
                    }
                    Some(voter) => {
                        store.record(voter.id, ballot);
                        metrics::counter!("livepoll_votes_recorded_total").increment(1);
                        let (yes, no) = store.counts();
                        broadcast(&mut members, Tally::compute(yes, no));
                    }
                }
            }
            Command::Results { member_id } => {
                let (yes, no) = store.counts();
                send_to(&mut members, member_id, HubEvent::Results(Tally::compute(yes, no)));
            }
            Command::Query { reply } => {
                let (yes, no) = store.counts();
                let _ = reply.send(Tally::compute(yes, no));
            }
            Command::Disconnect { member_id } => {
                if members.contains(member_id) {
                    members.remove(member_id);
                    metrics::gauge!("livepoll_connections").set(members.len() as f64);
                }
            }
        }
    }
}

/// Deliver one event to one member. A full queue drops the event; a closed
/// queue unregisters the member.
fn send_to(members: &mut Slab<Member>, member_id: usize, event: HubEvent) {
    let Some(member) = members.get(member_id) else {
        return;
    };
    match member.sender.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            metrics::counter!("livepoll_events_dropped_total").increment(1);
        }
        Err(TrySendError::Closed(_)) => {
            members.remove(member_id);
            metrics::gauge!("livepoll_connections").set(members.len() as f64);
        }
    }
}

/// Push a tally to every registered member. Delivery is independent per
/// member: a full or closed queue never aborts delivery to the others.
fn broadcast(members: &mut Slab<Member>, tally: Tally) {
    let mut closed = Vec::new();
    for (member_id, member) in members.iter() {
        match member.sender.try_send(HubEvent::Results(tally)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                metrics::counter!("livepoll_events_dropped_total").increment(1);
            }
            Err(TrySendError::Closed(_)) => closed.push(member_id),
        }
    }
    if !closed.is_empty() {
        for member_id in closed {
            members.remove(member_id);
        }
        metrics::gauge!("livepoll_connections").set(members.len() as f64);
    }
}
