use crate::app::{
    AppCommand, AppEvent, Dispatcher, Form, FormKey, SharedContext, StageTag, TaskEvent,
    TaskSignal, TextField,
};
use crate::domain::{Settings, SettingsInput, validate_settings};
use crate::infra::ClientHandle;
use crossterm::event::KeyCode;
use std::time::Duration;
use tracing::{debug, info};

/// How long "connected!" stays on screen before the menu takes over.
pub const CONNECTED_DISPLAY_DELAY: Duration = Duration::from_millis(500);

pub const SETTINGS_FIELD_LABELS: [&str; 5] = [
    "Auth Header",
    "Private Key",
    "Public Key",
    "Open Orders Address",
    "Project",
];

#[derive(Clone, Debug)]
pub struct SettingsStage {
    generation: u64,
    pub form: Form,
    pub status: Option<String>,
    pub error: Option<String>,
    pub connecting: bool,
}

impl SettingsStage {
    pub fn new(settings: &Settings) -> Self {
        let input = SettingsInput::from_settings(settings);
        let form = Form::new(vec![
            TextField::new("auth header").with_value(&input.auth_header),
            TextField::new("base58 private key (optional)")
                .masked('*')
                .with_value(&input.private_key),
            TextField::new("base58 public key").with_value(&input.public_key),
            TextField::new("base58 open orders address").with_value(&input.open_orders_address),
            TextField::new("P_JUPITER | P_RAYDIUM | P_SERUM | P_ALL | P_OPENBOOK")
                .with_value(&input.project),
        ]);
        Self {
            generation: 0,
            form,
            status: None,
            error: None,
            connecting: false,
        }
    }

    pub fn input(&self) -> SettingsInput {
        let value = |index: usize| {
            self.form
                .fields
                .get(index)
                .map(|field| field.value().to_string())
                .unwrap_or_default()
        };
        SettingsInput {
            auth_header: value(0),
            private_key: value(1),
            public_key: value(2),
            open_orders_address: value(3),
            project: value(4),
        }
    }

    pub fn init(&mut self) -> AppCommand {
        self.generation += 1;
        self.form.focus = 0;
        self.status = None;
        self.error = None;
        self.connecting = false;
        AppCommand::BlinkCursor
    }

    pub fn update(
        mut self,
        ctx: &mut SharedContext,
        dispatcher: &Dispatcher,
        event: &AppEvent,
    ) -> (StageTag, Self, AppCommand) {
        match event {
            AppEvent::Key(key) if !self.connecting => {
                if key.code == KeyCode::Esc && !ctx.settings.needs_init() {
                    return (StageTag::Menu, self, AppCommand::None);
                }
                match self.form.handle_key(key) {
                    FormKey::Submit => self.submit(ctx, dispatcher),
                    FormKey::Edited => self.error = None,
                    FormKey::Moved | FormKey::Ignored => {}
                }
                (StageTag::Settings, self, AppCommand::None)
            }
            AppEvent::Task(task) => self.on_task(ctx, task),
            AppEvent::Key(_) | AppEvent::Resize { .. } | AppEvent::Fatal(_) => {
                (StageTag::Settings, self, AppCommand::None)
            }
        }
    }

    fn submit(&mut self, ctx: &mut SharedContext, dispatcher: &Dispatcher) {
        let settings = match validate_settings(&self.input()) {
            Ok(settings) => settings,
            Err(error) => {
                debug!(field = error.field_index(), %error, "settings rejected");
                self.error = Some(error.to_string());
                return;
            }
        };

        ctx.settings = settings.clone();
        ctx.client = None;
        self.generation += 1;
        self.error = None;
        self.status = None;
        self.connecting = true;

        let connector = ctx.connector.clone();
        let generation = self.generation;
        let sender = dispatcher.clone();
        let send = move |signal: TaskSignal| {
            sender.dispatch(AppEvent::Task(TaskEvent {
                stage: StageTag::Settings,
                generation,
                signal,
            }))
        };
        dispatcher.spawn(async move {
            send(TaskSignal::Status("connecting...".to_string()));
            let connected =
                tokio::task::spawn_blocking(move || connector.connect(&settings)).await;
            match connected {
                Ok(Ok(client)) => {
                    send(TaskSignal::Connected(ClientHandle(client)));
                    tokio::time::sleep(CONNECTED_DISPLAY_DELAY).await;
                    send(TaskSignal::Advance);
                }
                Ok(Err(error)) => {
                    send(TaskSignal::ConnectFailed(error.to_string()));
                }
                Err(error) => {
                    send(TaskSignal::ConnectFailed(error.to_string()));
                }
            }
        });
    }

    fn on_task(mut self, ctx: &mut SharedContext, task: &TaskEvent) -> (StageTag, Self, AppCommand) {
        if task.generation != self.generation {
            debug!(
                generation = task.generation,
                current = self.generation,
                "discarding stale connect event"
            );
            return (StageTag::Settings, self, AppCommand::None);
        }

        match &task.signal {
            TaskSignal::Status(status) => {
                self.status = Some(status.clone());
                (StageTag::Settings, self, AppCommand::None)
            }
            TaskSignal::ConnectFailed(error) => {
                info!(%error, "connect failed");
                self.connecting = false;
                self.status = None;
                self.error = Some(error.clone());
                (StageTag::Settings, self, AppCommand::None)
            }
            TaskSignal::Connected(client) => {
                info!("connected");
                ctx.client = Some(client.clone());
                self.status = Some("connected!".to_string());
                let command = AppCommand::SaveSettings(ctx.settings.clone());
                (StageTag::Settings, self, command)
            }
            TaskSignal::Advance => {
                self.connecting = false;
                (StageTag::Menu, self, AppCommand::None)
            }
            TaskSignal::Tick | TaskSignal::QueryLoaded { .. } | TaskSignal::QueryFailed(_) => {
                (StageTag::Settings, self, AppCommand::None)
            }
        }
    }
}
