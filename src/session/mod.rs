pub mod controller;
pub mod debounce;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::common::{SessionContext, SessionEvent, UiCommand, UserProfile};
use crate::network::{HistorySource, TransportFactory};

pub use controller::ChatSession;
pub use state::{AdminPresence, ConnectionStatus, MessageLog, SessionPhase};

/// Wakes the view after the session queues an event for it.
pub type Repaint = Box<dyn Fn() + Send>;

/// The UI's side of a running session.
///
/// `events` is unbounded: the view mirrors the message log and must see
/// every append, even while it is not being drawn.
pub struct SessionLink {
    pub user: UserProfile,
    pub commands: mpsc::Sender<UiCommand>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// Mounts a session for the signed-in user and runs it in the background.
///
/// Without a user nothing is opened, fetched or emitted and `None` comes back.
pub fn start(
    context: Option<SessionContext>,
    transport: &dyn TransportFactory,
    history: Arc<dyn HistorySource>,
    typing_idle: Duration,
    repaint: Repaint,
) -> Option<SessionLink> {
    let Some(context) = context else {
        log::info!("No signed-in user; chat widget stays hidden");
        return None;
    };

    let (mut session, link) = ChatSession::new(context, typing_idle, repaint);
    session.mount(transport, history.as_ref());
    tokio::spawn(session.run());
    Some(link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TransportCommand;
    use crate::error::ChatResult;
    use crate::network::TransportHandle;
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        opens: AtomicUsize,
    }

    impl TransportFactory for CountingTransport {
        fn open(&self, _token: &str) -> TransportHandle {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let (commands, _) = mpsc::channel::<TransportCommand>(1);
            let (_, events) = mpsc::channel(1);
            TransportHandle { commands, events }
        }
    }

    #[derive(Default)]
    struct CountingHistory {
        calls: AtomicUsize,
    }

    impl HistorySource for CountingHistory {
        fn fetch(
            &self,
            _token: &str,
        ) -> BoxFuture<'static, ChatResult<Vec<crate::common::ChatMessage>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok(Vec::new())).boxed()
        }
    }

    #[tokio::test]
    async fn no_user_means_no_connection_and_no_fetch() {
        let transport = CountingTransport::default();
        let history = Arc::new(CountingHistory::default());

        let link = start(
            None,
            &transport,
            history.clone(),
            Duration::from_secs(2),
            Box::new(|| {}),
        );

        assert!(link.is_none());
        assert_eq!(transport.opens.load(Ordering::SeqCst), 0);
        assert_eq!(history.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn signed_in_user_gets_a_running_session() {
        let transport = CountingTransport::default();
        let history = Arc::new(CountingHistory::default());
        let context = SessionContext {
            token: "t".into(),
            user: UserProfile {
                id: "u1".into(),
                name: "Lan".into(),
            },
        };

        let mut link = start(
            Some(context),
            &transport,
            history.clone(),
            Duration::from_secs(2),
            Box::new(|| {}),
        )
        .expect("session should start");

        assert_eq!(link.user.id, "u1");
        assert_eq!(transport.opens.load(Ordering::SeqCst), 1);
        assert_eq!(history.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            link.events.recv().await,
            Some(SessionEvent::PhaseChanged(SessionPhase::Connecting))
        );
    }
}
