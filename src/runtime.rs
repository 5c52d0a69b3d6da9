//! Event loop that drives a [`Session`].
//!
//! Every producer (transport, speech adapters, the user's input task) writes
//! into one queue. The runtime takes events off that queue one at a time, feeds
//! them to the session, hands the resulting effects to the UI projection and
//! executes the commands against the adapters.

use crate::client::{Channel, TransportEvent};
use crate::session::{Command, ConnectionState, Session, SessionEvent, Transition, UserAction, VoiceMode};
use crate::speech::{SpeechInput, SpeechOutput};
use crate::ui::UiProjection;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(2);

pub struct Runtime<C, I, O, U> {
    session: Session,
    channel: C,
    input: I,
    output: O,
    ui: U,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
    voice_idle_timeout: Option<Duration>,
    reconnect_delay: Option<Duration>,
    close_grace: Duration,
}

impl<C, I, O, U> Runtime<C, I, O, U>
where
    C: Channel,
    I: SpeechInput,
    O: SpeechOutput,
    U: UiProjection,
{
    /// `events_tx` must be a sender for `events_rx`. Adapters get their own
    /// clones of it.
    pub fn new(
        channel: C,
        input: I,
        output: O,
        ui: U,
        events_tx: mpsc::Sender<SessionEvent>,
        events_rx: mpsc::Receiver<SessionEvent>,
    ) -> Self {
        Self {
            session: Session::new(),
            channel,
            input,
            output,
            ui,
            events_tx,
            events_rx,
            voice_idle_timeout: None,
            reconnect_delay: None,
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    /// Switches voice mode off after this long without speech activity.
    pub fn with_voice_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.voice_idle_timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    /// Queues a reconnect this long after every disconnect.
    pub fn with_reconnect_delay(mut self, delay: Option<Duration>) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// How long to wait for the channel to report `Closed` after quitting.
    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs until the user quits. Returns the final session state.
    pub async fn run(mut self) -> Session {
        let transition = self.session.start();
        self.apply(transition).await;

        let mut idle_deadline: Option<Instant> = None;

        loop {
            let event = tokio::select! {
                event = self.events_rx.recv() => match event {
                    Some(event) => event,
                    None => {
                        tracing::warn!("event queue closed");
                        break;
                    }
                },
                _ = sleep_until(idle_deadline) => SessionEvent::VoiceIdleTimeout,
            };
            tracing::debug!("event: {:?}", event);

            let quitting = matches!(event, SessionEvent::User(UserAction::Quit));
            let is_activity = matches!(
                event,
                SessionEvent::Recognition(_) | SessionEvent::Synthesis(_) | SessionEvent::User(_)
            );
            let attempt_ended = matches!(event, SessionEvent::Transport(TransportEvent::Closed));
            let was_voice = self.session.voice_mode();

            let transition = self.session.handle(event);
            self.apply(transition).await;

            if quitting {
                self.wait_for_close().await;
                break;
            }

            // `Closed` is the last event of an attempt, `Errored` comes before it.
            if attempt_ended && self.closed() {
                self.schedule_reconnect();
            }

            idle_deadline = match (self.voice_idle_timeout, self.session.voice_mode()) {
                (Some(timeout), VoiceMode::Active) if is_activity || was_voice == VoiceMode::Idle => {
                    Some(Instant::now() + timeout)
                }
                (Some(_), VoiceMode::Active) => idle_deadline,
                _ => None,
            };
        }

        tracing::info!("session loop finished");
        self.session
    }

    fn closed(&self) -> bool {
        self.session.connection_state() == ConnectionState::Closed
    }

    async fn apply(&mut self, transition: Transition) {
        for effect in &transition.effects {
            self.ui.apply(&self.session, effect);
        }
        for command in transition.commands {
            self.execute(command).await;
        }
    }

    async fn execute(&mut self, command: Command) {
        tracing::debug!("command: {:?}", command);
        match command {
            Command::Connect => self.channel.connect().await,
            Command::Close => self.channel.close().await,
            Command::Send(message) => self.channel.send(message).await,
            Command::StartRecognition => self.input.start().await,
            Command::StopRecognition => self.input.stop().await,
            Command::Speak { text, language } => self.output.speak(text, language).await,
            Command::CancelSpeech => self.output.cancel().await,
        }
    }

    fn schedule_reconnect(&self) {
        let Some(delay) = self.reconnect_delay else {
            return;
        };
        tracing::info!("reconnecting in {:?}", delay);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = events.send(UserAction::Reconnect.into()).await {
                tracing::debug!("failed to queue reconnect: {}", e);
            }
        });
    }

    // Lets the channel finish its close handshake. Other events are dropped.
    async fn wait_for_close(&mut self) {
        if self.closed() {
            return;
        }
        let deadline = Instant::now() + self.close_grace;
        loop {
            match tokio::time::timeout_at(deadline, self.events_rx.recv()).await {
                Ok(Some(SessionEvent::Transport(TransportEvent::Closed))) => {
                    let transition = self.session.handle(TransportEvent::Closed.into());
                    for effect in &transition.effects {
                        self.ui.apply(&self.session, effect);
                    }
                    return;
                }
                Ok(Some(event)) => tracing::trace!("dropping event while closing: {:?}", event),
                Ok(None) => return,
                Err(_) => {
                    tracing::warn!("channel did not close within {:?}", self.close_grace);
                    return;
                }
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
