use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::common::{
    ChatMessage, SenderRole, SessionContext, SessionEvent, TransportCommand, TransportEvent,
    UiCommand,
};
use crate::error::{ChatError, ChatResult};
use crate::network::codec::{ClientEvent, JoinRoom, ServerEvent, TypingSignal};
use crate::network::{HistorySource, TransportFactory, TransportHandle};

use super::{Repaint, SessionLink};
use super::debounce::TypingDebounce;
use super::state::{AdminPresence, SessionPhase, SessionState};

const CHANNEL_CAPACITY: usize = 100;

type HistoryReply = oneshot::Receiver<ChatResult<Vec<ChatMessage>>>;

/// One customer's live-chat session, from mount to close.
///
/// Runs as a single task: UI intent, transport events, the history reply and
/// the typing timer are all handled on the same loop, so there is no shared
/// state to lock.
pub struct ChatSession {
    id: Uuid,
    context: SessionContext,
    role: SenderRole,
    state: SessionState,
    typing: TypingDebounce,
    transport: Option<TransportHandle>,
    history: Option<HistoryReply>,
    ui_commands: mpsc::Receiver<UiCommand>,
    view: mpsc::UnboundedSender<SessionEvent>,
    repaint: Repaint,
}

impl ChatSession {
    pub fn new(
        context: SessionContext,
        typing_idle: Duration,
        repaint: Repaint,
    ) -> (Self, SessionLink) {
        let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let link = SessionLink {
            user: context.user.clone(),
            commands: command_tx,
            events: event_rx,
        };
        let session = Self {
            id: Uuid::new_v4(),
            context,
            role: SenderRole::Customer,
            state: SessionState::default(),
            typing: TypingDebounce::new(typing_idle),
            transport: None,
            history: None,
            ui_commands: command_rx,
            view: event_tx,
            repaint,
        };
        (session, link)
    }

    /// `Idle -> Connecting`: opens the transport and requests history.
    pub fn mount(&mut self, transport: &dyn TransportFactory, history: &dyn HistorySource) {
        if self.state.phase != SessionPhase::Idle {
            log::warn!("Session {} mounted twice; ignoring", self.id);
            return;
        }

        log::info!(
            "Mounting chat session {} for user {}",
            self.id,
            self.context.user.id
        );
        self.transport = Some(transport.open(&self.context.token));
        self.set_phase(SessionPhase::Connecting);
        self.load_history(history);
    }

    /// Drives the session until it is closed and hands back its final state.
    pub async fn run(mut self) -> SessionState {
        while self.is_live() {
            tokio::select! {
                command = self.ui_commands.recv() => match command {
                    Some(command) => self.handle_ui_command(command),
                    None => {
                        log::info!("Session {} lost its view; unmounting", self.id);
                        self.close();
                    }
                },
                event = next_transport_event(&mut self.transport) => match event {
                    Some(event) => self.handle_transport_event(event),
                    None => self.transport_gone(),
                },
                reply = next_history_reply(&mut self.history) => self.apply_history(reply),
                _ = self.typing.expired() => self.typing_idle(),
            }
        }

        log::info!("Chat session {} closed", self.id);
        self.state
    }

    fn is_live(&self) -> bool {
        !self.state.phase.is_closed()
    }

    fn handle_ui_command(&mut self, command: UiCommand) {
        match command {
            UiCommand::InputChanged(text) => self.handle_typing(text),
            UiCommand::Send => self.send_message(),
            UiCommand::Close => self.close(),
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        if !self.is_live() {
            return;
        }

        match event {
            TransportEvent::Connected => self.on_connected(),
            TransportEvent::Disconnected => self.on_disconnected(),
            TransportEvent::Server(ServerEvent::NewMessage(message))
            | TransportEvent::Server(ServerEvent::MessageSent(message)) => self.append(message),
            TransportEvent::Server(ServerEvent::MessageError(rejected)) => {
                log::warn!("Message rejected by server: {}", rejected.error);
                self.notify(SessionEvent::Alert(rejected.error));
            }
            TransportEvent::Server(ServerEvent::UserTyping(signal)) => {
                self.receive_remote_typing(signal.is_typing, signal.sender_role)
            }
            TransportEvent::Server(ServerEvent::AdminStatus(status)) => {
                self.receive_presence(status.is_online)
            }
        }
    }

    fn load_history(&mut self, history: &dyn HistorySource) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = history.fetch(&self.context.token);
        let session_id = self.id;

        tokio::spawn(async move {
            let result = request.await;
            if reply_tx.send(result).is_err() {
                log::debug!("Session {session_id} closed before its history arrived; dropping it");
            }
        });
        self.history = Some(reply_rx);
    }

    fn apply_history(&mut self, reply: ChatResult<Vec<ChatMessage>>) {
        if !self.is_live() {
            log::debug!("Ignoring history for closed session {}", self.id);
            return;
        }

        match reply {
            Ok(messages) => {
                let count = messages.len();
                if self.state.messages.merge_history(messages.clone()) {
                    log::info!("Loaded {count} history messages");
                    self.notify(SessionEvent::HistoryLoaded(messages));
                }
            }
            Err(err) => log::warn!("Chat history unavailable, continuing without it: {err}"),
        }
    }

    fn on_connected(&mut self) {
        self.set_phase(SessionPhase::Connected);
        self.emit(ClientEvent::JoinChat(JoinRoom {
            user_id: self.context.user.id.clone(),
            role: self.role,
            user_name: self.context.user.name.clone(),
        }));
    }

    fn on_disconnected(&mut self) {
        if matches!(
            self.state.phase,
            SessionPhase::Connecting | SessionPhase::Connected
        ) {
            self.typing.cancel();
            self.state.local_typing = false;
            self.set_remote_typing(false);
            self.set_phase(SessionPhase::Disconnected);
        }
    }

    fn transport_gone(&mut self) {
        log::error!("Chat transport for session {} stopped", self.id);
        self.transport = None;
        self.on_disconnected();
    }

    fn handle_typing(&mut self, text: String) {
        if !self.is_live() {
            return;
        }

        self.state.input_text = text;
        if !self.state.is_connected() {
            return;
        }

        if !self.state.local_typing {
            self.state.local_typing = true;
            self.emit_typing(true);
        }
        self.typing.restart();
    }

    fn typing_idle(&mut self) {
        if self.state.local_typing {
            self.state.local_typing = false;
            self.emit_typing(false);
        }
    }

    /// Emits the composer text. The message itself only shows up once the
    /// server echoes it back as `message_sent` or `new_message`.
    fn send_message(&mut self) {
        if !self.is_live() {
            return;
        }

        let text = self.state.input_text.trim();
        if text.is_empty() {
            return;
        }
        if !self.state.is_connected() {
            log::debug!("Not connected; send ignored");
            return;
        }

        let outgoing = ChatMessage {
            message: text.to_string(),
            sender_id: self.context.user.id.clone(),
            sender_role: self.role,
            recipient_id: None,
            created_at: None,
        };
        self.emit(ClientEvent::SendMessage(outgoing));

        self.state.input_text.clear();
        self.notify(SessionEvent::InputCleared);

        self.typing.cancel();
        self.state.local_typing = false;
        self.emit_typing(false);
    }

    fn receive_remote_typing(&mut self, is_typing: bool, role: SenderRole) {
        if role != self.role.counterpart() {
            return;
        }
        self.set_remote_typing(is_typing);
    }

    fn receive_presence(&mut self, is_online: bool) {
        let presence = AdminPresence::from_online(is_online);
        if self.state.admin_presence != presence {
            self.state.admin_presence = presence;
            self.notify(SessionEvent::AdminPresence(presence));
        }
    }

    fn append(&mut self, message: ChatMessage) {
        self.state.messages.append(message.clone());
        self.notify(SessionEvent::MessageAppended(message));
    }

    /// `* -> Closed`. Terminal.
    fn close(&mut self) {
        if !self.is_live() {
            return;
        }

        self.typing.cancel();
        self.state.local_typing = false;
        self.history = None;
        if let Some(transport) = self.transport.take() {
            if let Err(err) = transport.commands.try_send(TransportCommand::Close) {
                log::debug!("Transport already gone on close: {err}");
            }
        }
        self.set_phase(SessionPhase::Closed);
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.state.phase == phase {
            return;
        }
        log::debug!(
            "Session {}: {:?} -> {:?}",
            self.id,
            self.state.phase,
            phase
        );
        self.state.phase = phase;
        self.notify(SessionEvent::PhaseChanged(phase));
    }

    fn set_remote_typing(&mut self, is_typing: bool) {
        if self.state.remote_typing != is_typing {
            self.state.remote_typing = is_typing;
            self.notify(SessionEvent::RemoteTyping(is_typing));
        }
    }

    fn emit_typing(&self, is_typing: bool) {
        self.emit(ClientEvent::Typing(TypingSignal {
            sender_role: self.role,
            is_typing,
        }));
    }

    fn emit(&self, event: ClientEvent) {
        let Some(transport) = self.transport.as_ref() else {
            log::debug!("No transport; dropping {event:?}");
            return;
        };
        if let Err(err) = transport.commands.try_send(TransportCommand::Emit(event)) {
            log::warn!("Failed to hand event to transport: {err}");
        }
    }

    fn notify(&self, event: SessionEvent) {
        match self.view.send(event) {
            Ok(()) => (self.repaint)(),
            Err(err) => log::debug!("View is gone; dropping {:?}", err.0),
        }
    }
}

async fn next_transport_event(transport: &mut Option<TransportHandle>) -> Option<TransportEvent> {
    match transport.as_mut() {
        Some(handle) => handle.events.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_history_reply(slot: &mut Option<HistoryReply>) -> ChatResult<Vec<ChatMessage>> {
    match slot.as_mut() {
        Some(reply) => {
            let result = reply.await.unwrap_or(Err(ChatError::HistoryAborted));
            *slot = None;
            result
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::UserProfile;
    use crate::network::codec::{AdminStatus, MessageRejected};
    use crate::ui::state::AppState;
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::task::JoinHandle;
    use tokio::time::sleep;

    const IDLE: Duration = Duration::from_millis(2000);

    /// Test-side ends of a fake transport.
    struct Remote {
        commands: mpsc::Receiver<TransportCommand>,
        events: mpsc::Sender<TransportEvent>,
    }

    impl Remote {
        fn drain(&mut self) -> Vec<TransportCommand> {
            let mut drained = Vec::new();
            while let Ok(command) = self.commands.try_recv() {
                drained.push(command);
            }
            drained
        }

        async fn deliver(&self, event: TransportEvent) {
            self.events.send(event).await.unwrap();
            settle().await;
        }
    }

    #[derive(Default)]
    struct FakeTransport {
        opens: AtomicUsize,
        remote: Mutex<Option<Remote>>,
    }

    impl FakeTransport {
        fn take_remote(&self) -> Remote {
            self.remote.lock().unwrap().take().expect("transport was not opened")
        }
    }

    impl TransportFactory for FakeTransport {
        fn open(&self, _token: &str) -> TransportHandle {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
            let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
            *self.remote.lock().unwrap() = Some(Remote {
                commands: command_rx,
                events: event_tx,
            });
            TransportHandle {
                commands: command_tx,
                events: event_rx,
            }
        }
    }

    struct FakeHistory {
        calls: AtomicUsize,
        reply: Mutex<Option<BoxFuture<'static, ChatResult<Vec<ChatMessage>>>>>,
    }

    impl FakeHistory {
        fn ready(result: ChatResult<Vec<ChatMessage>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply: Mutex::new(Some(futures::future::ready(result).boxed())),
            }
        }

        fn deferred() -> (Self, oneshot::Sender<ChatResult<Vec<ChatMessage>>>) {
            let (tx, rx) = oneshot::channel();
            let reply = rx.map(|result| result.unwrap_or(Err(ChatError::HistoryAborted)));
            let history = Self {
                calls: AtomicUsize::new(0),
                reply: Mutex::new(Some(reply.boxed())),
            };
            (history, tx)
        }
    }

    impl HistorySource for FakeHistory {
        fn fetch(&self, token: &str) -> BoxFuture<'static, ChatResult<Vec<ChatMessage>>> {
            assert_eq!(token, "token-1");
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| futures::future::pending().boxed())
        }
    }

    fn context() -> SessionContext {
        SessionContext {
            token: "token-1".into(),
            user: UserProfile {
                id: "u1".into(),
                name: "Lan".into(),
            },
        }
    }

    fn admin_says(text: &str) -> ChatMessage {
        ChatMessage {
            message: text.into(),
            sender_id: "a1".into(),
            sender_role: SenderRole::Admin,
            recipient_id: Some("u1".into()),
            created_at: None,
        }
    }

    /// Lets the session task work through everything already queued.
    async fn settle() {
        sleep(Duration::from_millis(1)).await;
    }

    fn spawn_session(
        history: &FakeHistory,
    ) -> (SessionLink, Remote, JoinHandle<SessionState>, FakeTransport) {
        let transport = FakeTransport::default();
        let (mut session, link) = ChatSession::new(context(), IDLE, Box::new(|| {}));
        session.mount(&transport, history);
        let remote = transport.take_remote();
        let task = tokio::spawn(session.run());
        (link, remote, task, transport)
    }

    fn typing_flags(commands: &[TransportCommand]) -> Vec<bool> {
        commands
            .iter()
            .filter_map(|command| match command {
                TransportCommand::Emit(ClientEvent::Typing(signal)) => Some(signal.is_typing),
                _ => None,
            })
            .collect()
    }

    fn sent_messages(commands: &[TransportCommand]) -> Vec<String> {
        commands
            .iter()
            .filter_map(|command| match command {
                TransportCommand::Emit(ClientEvent::SendMessage(message)) => {
                    Some(message.message.clone())
                }
                _ => None,
            })
            .collect()
    }

    fn drain_view(link: &mut SessionLink) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = link.events.try_recv() {
            events.push(event);
        }
        events
    }

    async fn type_text(link: &SessionLink, text: &str) {
        link.commands
            .send(UiCommand::InputChanged(text.into()))
            .await
            .unwrap();
        settle().await;
    }

    async fn close(link: &SessionLink, task: JoinHandle<SessionState>) -> SessionState {
        link.commands.send(UiCommand::Close).await.unwrap();
        task.await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn connect_joins_room_and_shows_live_message() {
        let history = FakeHistory::ready(Ok(Vec::new()));
        let (mut link, mut remote, task, transport) = spawn_session(&history);

        remote.deliver(TransportEvent::Connected).await;

        assert_eq!(transport.opens.load(Ordering::SeqCst), 1);
        assert_eq!(history.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            remote.drain(),
            vec![TransportCommand::Emit(ClientEvent::JoinChat(JoinRoom {
                user_id: "u1".into(),
                role: SenderRole::Customer,
                user_name: "Lan".into(),
            }))]
        );

        let incoming: ChatMessage = serde_json::from_value(serde_json::json!({
            "message": "hi",
            "sender_type": "admin",
            "createdAt": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        remote
            .deliver(TransportEvent::Server(ServerEvent::NewMessage(
                incoming.clone(),
            )))
            .await;

        let events = drain_view(&mut link);
        assert!(events.contains(&SessionEvent::PhaseChanged(SessionPhase::Connected)));
        assert_eq!(
            events.last(),
            Some(&SessionEvent::MessageAppended(incoming.clone()))
        );

        let state = close(&link, task).await;
        assert_eq!(state.messages.entries(), [incoming]);
    }

    #[tokio::test(start_paused = true)]
    async fn keystrokes_within_window_emit_one_start_and_one_stop() {
        let history = FakeHistory::ready(Ok(Vec::new()));
        let (link, mut remote, task, _transport) = spawn_session(&history);
        remote.deliver(TransportEvent::Connected).await;
        remote.drain();

        for text in ["a", "ab", "abc"] {
            type_text(&link, text).await;
            sleep(Duration::from_millis(99)).await;
        }
        assert_eq!(typing_flags(&remote.drain()), [true]);

        // Timer restarted at "abc"; it must not have fired 1800ms later.
        sleep(Duration::from_millis(1800)).await;
        assert!(typing_flags(&remote.drain()).is_empty());

        sleep(Duration::from_millis(200)).await;
        assert_eq!(typing_flags(&remote.drain()), [false]);

        sleep(Duration::from_secs(10)).await;
        assert!(remote.drain().is_empty());

        type_text(&link, "abcd").await;
        assert_eq!(typing_flags(&remote.drain()), [true]);

        close(&link, task).await;
    }

    #[tokio::test(start_paused = true)]
    async fn blank_or_offline_sends_emit_nothing() {
        let history = FakeHistory::ready(Ok(Vec::new()));
        let (link, mut remote, task, _transport) = spawn_session(&history);

        // Still connecting.
        type_text(&link, "hello").await;
        link.commands.send(UiCommand::Send).await.unwrap();
        settle().await;
        assert!(remote.drain().is_empty());

        remote.deliver(TransportEvent::Connected).await;
        remote.drain();

        type_text(&link, "   \t ").await;
        link.commands.send(UiCommand::Send).await.unwrap();
        settle().await;
        assert!(sent_messages(&remote.drain()).is_empty());

        remote
            .deliver(TransportEvent::Server(ServerEvent::NewMessage(admin_says(
                "still there?",
            ))))
            .await;
        remote.deliver(TransportEvent::Disconnected).await;
        type_text(&link, "yes").await;
        link.commands.send(UiCommand::Send).await.unwrap();
        settle().await;
        assert!(remote.drain().is_empty());

        let state = close(&link, task).await;
        assert_eq!(state.messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn send_waits_for_server_echo() {
        let history = FakeHistory::ready(Ok(Vec::new()));
        let (mut link, mut remote, task, _transport) = spawn_session(&history);
        remote.deliver(TransportEvent::Connected).await;
        remote.drain();
        drain_view(&mut link);

        type_text(&link, "  where is my order?  ").await;
        link.commands.send(UiCommand::Send).await.unwrap();
        settle().await;

        let commands = remote.drain();
        assert_eq!(sent_messages(&commands), ["where is my order?"]);
        assert_eq!(typing_flags(&commands), [true, false]);
        match &commands[1] {
            TransportCommand::Emit(ClientEvent::SendMessage(message)) => {
                assert_eq!(message.sender_id, "u1");
                assert_eq!(message.sender_role, SenderRole::Customer);
                assert_eq!(message.recipient_id, None);
            }
            other => panic!("expected send_message, got {other:?}"),
        }
        assert_eq!(drain_view(&mut link), [SessionEvent::InputCleared]);

        // The cancelled debounce must not produce a second stop signal.
        sleep(IDLE * 2).await;
        assert!(remote.drain().is_empty());

        let echo = ChatMessage {
            message: "where is my order?".into(),
            sender_id: "u1".into(),
            sender_role: SenderRole::Customer,
            recipient_id: None,
            created_at: None,
        };
        remote
            .deliver(TransportEvent::Server(ServerEvent::MessageSent(echo.clone())))
            .await;

        let state = close(&link, task).await;
        assert_eq!(state.messages.entries(), [echo]);
        assert!(state.input_text.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_send_alerts_without_appending() {
        let history = FakeHistory::ready(Ok(vec![admin_says("welcome")]));
        let (mut link, mut remote, task, _transport) = spawn_session(&history);
        remote.deliver(TransportEvent::Connected).await;
        type_text(&link, "hello").await;
        link.commands.send(UiCommand::Send).await.unwrap();
        settle().await;
        remote.drain();
        drain_view(&mut link);

        remote
            .deliver(TransportEvent::Server(ServerEvent::MessageError(
                MessageRejected {
                    error: "Chat is closed for today".into(),
                },
            )))
            .await;

        assert_eq!(
            drain_view(&mut link),
            [SessionEvent::Alert("Chat is closed for today".into())]
        );
        assert!(remote.drain().is_empty());

        let state = close(&link, task).await;
        assert_eq!(state.messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn history_goes_before_messages_that_beat_it() {
        let (history, reply) = FakeHistory::deferred();
        let (mut link, remote, task, _transport) = spawn_session(&history);
        remote.deliver(TransportEvent::Connected).await;
        remote
            .deliver(TransportEvent::Server(ServerEvent::NewMessage(admin_says(
                "live",
            ))))
            .await;

        reply
            .send(Ok(vec![admin_says("old-1"), admin_says("old-2")]))
            .unwrap();
        settle().await;

        let events = drain_view(&mut link);
        assert!(matches!(events.last(), Some(SessionEvent::HistoryLoaded(h)) if h.len() == 2));

        let state = close(&link, task).await;
        let texts: Vec<_> = state
            .messages
            .entries()
            .iter()
            .map(|m| m.message.as_str())
            .collect();
        assert_eq!(texts, ["old-1", "old-2", "live"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_history_degrades_silently() {
        let history = FakeHistory::ready(Err(ChatError::HistoryAborted));
        let (mut link, mut remote, task, _transport) = spawn_session(&history);
        remote.deliver(TransportEvent::Connected).await;
        remote.drain();

        let events = drain_view(&mut link);
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, SessionEvent::Alert(_) | SessionEvent::HistoryLoaded(_)))
        );

        type_text(&link, "hi").await;
        link.commands.send(UiCommand::Send).await.unwrap();
        settle().await;
        assert_eq!(sent_messages(&remote.drain()), ["hi"]);

        let state = close(&link, task).await;
        assert!(state.messages.is_empty());
        assert_eq!(history.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_during_history_fetch_ignores_late_reply() {
        let (history, reply) = FakeHistory::deferred();
        let (mut link, mut remote, task, _transport) = spawn_session(&history);

        let state = close(&link, task).await;
        assert_eq!(state.phase, SessionPhase::Closed);
        assert_eq!(remote.drain(), [TransportCommand::Close]);

        reply.send(Ok(vec![admin_says("too late")])).unwrap();
        settle().await;

        let events = drain_view(&mut link);
        assert_eq!(
            events.last(),
            Some(&SessionEvent::PhaseChanged(SessionPhase::Closed))
        );
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, SessionEvent::HistoryLoaded(_)))
        );
        assert!(link.events.recv().await.is_none());
        assert!(state.messages.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn only_admin_typing_is_shown() {
        let history = FakeHistory::ready(Ok(Vec::new()));
        let (mut link, remote, task, _transport) = spawn_session(&history);
        remote.deliver(TransportEvent::Connected).await;
        drain_view(&mut link);

        let typing = |role, is_typing| {
            TransportEvent::Server(ServerEvent::UserTyping(TypingSignal {
                sender_role: role,
                is_typing,
            }))
        };
        remote.deliver(typing(SenderRole::Customer, true)).await;
        assert!(drain_view(&mut link).is_empty());

        remote.deliver(typing(SenderRole::Admin, true)).await;
        assert_eq!(drain_view(&mut link), [SessionEvent::RemoteTyping(true)]);

        remote.deliver(typing(SenderRole::Admin, false)).await;
        assert_eq!(drain_view(&mut link), [SessionEvent::RemoteTyping(false)]);

        let state = close(&link, task).await;
        assert!(!state.remote_typing);
    }

    #[tokio::test(start_paused = true)]
    async fn presence_follows_admin_status() {
        let history = FakeHistory::ready(Ok(Vec::new()));
        let (mut link, remote, task, _transport) = spawn_session(&history);
        remote.deliver(TransportEvent::Connected).await;
        drain_view(&mut link);

        let status = |is_online| {
            TransportEvent::Server(ServerEvent::AdminStatus(AdminStatus { is_online }))
        };
        remote.deliver(status(true)).await;
        assert_eq!(
            drain_view(&mut link),
            [SessionEvent::AdminPresence(AdminPresence::Online)]
        );

        remote.deliver(status(false)).await;
        let state = close(&link, task).await;
        assert_eq!(state.admin_presence, AdminPresence::Offline);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_rejoins_and_keeps_messages() {
        let history = FakeHistory::ready(Ok(Vec::new()));
        let (mut link, mut remote, task, _transport) = spawn_session(&history);
        remote.deliver(TransportEvent::Connected).await;
        remote
            .deliver(TransportEvent::Server(ServerEvent::NewMessage(admin_says(
                "hello",
            ))))
            .await;
        type_text(&link, "typing before drop").await;
        remote.drain();

        remote.deliver(TransportEvent::Disconnected).await;
        // Local typing was reset on disconnect, so its timer stays silent.
        sleep(IDLE * 2).await;
        assert!(remote.drain().is_empty());

        remote.deliver(TransportEvent::Connected).await;
        assert!(matches!(
            remote.drain().as_slice(),
            [TransportCommand::Emit(ClientEvent::JoinChat(_))]
        ));

        let phases: Vec<_> = drain_view(&mut link)
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::PhaseChanged(phase) => Some(phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            [
                SessionPhase::Connecting,
                SessionPhase::Connected,
                SessionPhase::Disconnected,
                SessionPhase::Connected
            ]
        );

        let state = close(&link, task).await;
        assert_eq!(state.messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_view_closes_the_transport() {
        let history = FakeHistory::ready(Ok(Vec::new()));
        let (link, mut remote, task, _transport) = spawn_session(&history);
        remote.deliver(TransportEvent::Connected).await;
        type_text(&link, "bye").await;
        remote.drain();

        drop(link);
        let state = task.await.unwrap();

        assert_eq!(state.phase, SessionPhase::Closed);
        assert_eq!(remote.drain(), [TransportCommand::Close]);

        // Closed is terminal: the pending typing timer was released too.
        sleep(IDLE * 2).await;
        assert!(remote.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_task_ending_marks_session_disconnected() {
        let history = FakeHistory::ready(Ok(Vec::new()));
        let (mut link, remote, task, _transport) = spawn_session(&history);
        remote.deliver(TransportEvent::Connected).await;
        drain_view(&mut link);

        drop(remote);
        settle().await;

        assert_eq!(
            drain_view(&mut link),
            [SessionEvent::PhaseChanged(SessionPhase::Disconnected)]
        );
        close(&link, task).await;
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_view_still_mirrors_every_message() {
        let history = FakeHistory::ready(Ok(Vec::new()));
        let transport = FakeTransport::default();
        let repaints = Arc::new(AtomicUsize::new(0));
        let counter = repaints.clone();
        let (mut session, mut link) = ChatSession::new(
            context(),
            IDLE,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        session.mount(&transport, &history);
        let remote = transport.take_remote();
        let task = tokio::spawn(session.run());

        // The view does not drain anything while these arrive.
        remote.deliver(TransportEvent::Connected).await;
        for n in 0..150 {
            remote
                .deliver(TransportEvent::Server(ServerEvent::NewMessage(admin_says(
                    &format!("msg-{n}"),
                ))))
                .await;
        }

        let mut mirror = AppState::new(link.user.clone());
        let events = drain_view(&mut link);
        assert_eq!(repaints.load(Ordering::SeqCst), events.len());
        for event in events {
            mirror.apply(event);
        }
        assert_eq!(mirror.phase, SessionPhase::Connected);

        let state = close(&link, task).await;
        assert_eq!(state.messages.len(), 150);
        assert_eq!(mirror.messages.entries(), state.messages.entries());
    }
}
